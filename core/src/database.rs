use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::appwrite::{BackendError, Collections, DocumentStore, unique_id};
use crate::models::{NewRecord, Record};

/// Typed CRUD over a [`DocumentStore`], one collection per record kind.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
}

impl RecordService {
    pub fn new(store: Arc<dyn DocumentStore>, collections: Collections) -> Self {
        Self { store, collections }
    }

    fn collection<R: Record>(&self) -> &str {
        self.collections.for_kind(R::KIND)
    }

    /// Store `record` for `user_id` under a freshly generated id.
    pub async fn create<N: NewRecord>(
        &self,
        record: &N,
        user_id: &str,
    ) -> Result<N::Record, BackendError> {
        let kind = <N::Record as Record>::KIND;
        let mut data = serde_json::to_value(record)?;
        if let Value::Object(ref mut fields) = data {
            fields.insert("userId".to_string(), Value::String(user_id.to_string()));
        }

        let doc = self
            .store
            .create_document(self.collection::<N::Record>(), &unique_id(), data)
            .await
            .inspect_err(|e| tracing::error!(%kind, error = %e, "failed to create record"))?;
        let created: N::Record = serde_json::from_value(doc)
            .inspect_err(|e| tracing::error!(%kind, error = %e, "created record is malformed"))?;
        tracing::debug!(%kind, id = created.id(), "record created");
        Ok(created)
    }

    /// All records of kind `R` owned by `user_id`, newest first.
    pub async fn list<R: Record>(&self, user_id: &str) -> Result<Vec<R>, BackendError> {
        let kind = R::KIND;
        let docs = self
            .store
            .list_documents(self.collection::<R>(), user_id)
            .await
            .inspect_err(|e| tracing::error!(%kind, error = %e, "failed to list records"))?;
        let records = docs
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<R>, _>>()
            .inspect_err(|e| tracing::error!(%kind, error = %e, "stored record is malformed"))?;
        Ok(records)
    }

    /// Apply a partial update; `patch` must serialize to an object.
    pub async fn update<R: Record, P: Serialize + Sync + ?Sized>(
        &self,
        id: &str,
        patch: &P,
    ) -> Result<R, BackendError> {
        let kind = R::KIND;
        let data = serde_json::to_value(patch)?;
        let doc = self
            .store
            .update_document(self.collection::<R>(), id, data)
            .await
            .inspect_err(|e| tracing::error!(%kind, id, error = %e, "failed to update record"))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn delete<R: Record>(&self, id: &str) -> Result<(), BackendError> {
        let kind = R::KIND;
        self.store
            .delete_document(self.collection::<R>(), id)
            .await
            .inspect_err(|e| tracing::error!(%kind, id, error = %e, "failed to delete record"))?;
        tracing::debug!(%kind, id, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appwrite::MemoryStore;
    use crate::models::{ExerciseRecord, FoodRecord, MealType, NewExerciseRecord, NewFoodRecord};
    use chrono::NaiveDate;
    use serde_json::json;

    fn service() -> (Arc<MemoryStore>, RecordService) {
        let store = Arc::new(MemoryStore::new());
        let service = RecordService::new(store.clone(), Collections::default());
        (store, service)
    }

    fn run(day: u32) -> NewExerciseRecord {
        NewExerciseRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            exercise_type: "running".to_string(),
            duration: 30,
            calories: 250,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_tags_owner_and_uses_kind_collection() {
        let (store, service) = service();
        let created = service.create(&run(15), "u1").await.unwrap();
        assert_eq!(created.id.len(), 32);
        assert_eq!(created.exercise_type, "running");
        assert_eq!(store.len("exercise-records"), 1);
        assert_eq!(store.len("food-records"), 0);

        let raw = store.list_documents("exercise-records", "u1").await.unwrap();
        assert_eq!(raw[0]["userId"], "u1");
    }

    #[tokio::test]
    async fn test_list_only_returns_own_records() {
        let (_, service) = service();
        service.create(&run(14), "u1").await.unwrap();
        service.create(&run(15), "u2").await.unwrap();
        let second = service.create(&run(16), "u1").await.unwrap();

        let mine: Vec<ExerciseRecord> = service.list("u1").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_, service) = service();
        let food = service
            .create(
                &NewFoodRecord {
                    date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                    meal: MealType::Lunch,
                    name: "Salad".to_string(),
                    calories: 300,
                    weight: None,
                    notes: None,
                },
                "u1",
            )
            .await
            .unwrap();

        let updated: FoodRecord = service
            .update(&food.id, &json!({"calories": 350}))
            .await
            .unwrap();
        assert_eq!(updated.calories, 350);
        assert_eq!(updated.name, "Salad");

        service.delete::<FoodRecord>(&food.id).await.unwrap();
        let err = service.delete::<FoodRecord>(&food.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_document_is_decode_error() {
        let (store, service) = service();
        store
            .create_document("exercise-records", "bad", json!({"userId": "u1", "date": "nope"}))
            .await
            .unwrap();
        let err = service.list::<ExerciseRecord>("u1").await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
