//! Client-side mirror of one user's health records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::appwrite::{BackendError, User};
use crate::database::RecordService;
use crate::models::{
    ExerciseRecord, FoodRecord, HealthData, NewRecord, Record, RecordKind, SleepRecord,
    WeightRecord,
};

pub struct Tracker {
    records: RecordService,
    user: RwLock<Option<User>>,
    data: RwLock<HealthData>,
    loading: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Tracker {
    pub fn new(records: RecordService) -> Self {
        Self {
            records,
            user: RwLock::new(None),
            data: RwLock::new(HealthData::default()),
            loading: AtomicBool::new(false),
        }
    }

    /// A tracker bound to `user` without loading anything yet.
    pub fn with_user(records: RecordService, user: User) -> Self {
        let tracker = Self::new(records);
        *write(&tracker.user) = Some(user);
        tracker
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        read(&self.user).clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// A copy of the current records.
    #[must_use]
    pub fn snapshot(&self) -> HealthData {
        read(&self.data).clone()
    }

    /// Switch users. Signing in loads everything; signing out clears it.
    pub async fn set_user(&self, user: Option<User>) -> Result<(), BackendError> {
        let signed_in = user.is_some();
        *write(&self.user) = user;
        if signed_in {
            self.refresh().await
        } else {
            *write(&self.data) = HealthData::default();
            Ok(())
        }
    }

    /// Reload all four kinds for the current user. No-op when signed out.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        let Some(user) = self.user() else {
            return Ok(());
        };

        self.loading.store(true, Ordering::SeqCst);
        let result = tokio::try_join!(
            self.records.list::<ExerciseRecord>(&user.id),
            self.records.list::<FoodRecord>(&user.id),
            self.records.list::<SleepRecord>(&user.id),
            self.records.list::<WeightRecord>(&user.id),
        );
        self.loading.store(false, Ordering::SeqCst);

        let (exercise, food, sleep, weight) =
            result.inspect_err(|e| tracing::error!(error = %e, "failed to load health data"))?;

        // The user may have changed while the lists were in flight.
        if self.user().is_some_and(|u| u.id == user.id) {
            let data = HealthData {
                exercise,
                food,
                sleep,
                weight,
            };
            tracing::debug!(
                user = %user.id,
                exercise = data.exercise.len(),
                food = data.food.len(),
                sleep = data.sleep.len(),
                weight = data.weight.len(),
                "health data loaded"
            );
            *write(&self.data) = data;
        }
        Ok(())
    }

    /// Store a new record and put it at the front of its list.
    pub async fn add<N: NewRecord>(&self, record: N) -> Result<N::Record, BackendError> {
        let user = self.user().ok_or(BackendError::NotAuthenticated)?;
        let created = self.records.create(&record, &user.id).await?;
        <N::Record as Record>::records_mut(&mut write(&self.data)).insert(0, created.clone());
        Ok(created)
    }

    pub async fn delete<R: Record>(&self, id: &str) -> Result<(), BackendError> {
        self.records.delete::<R>(id).await?;
        R::records_mut(&mut write(&self.data)).retain(|r| r.id() != id);
        Ok(())
    }

    /// [`Tracker::delete`] for a kind chosen at runtime.
    pub async fn delete_kind(&self, kind: RecordKind, id: &str) -> Result<(), BackendError> {
        match kind {
            RecordKind::Exercise => self.delete::<ExerciseRecord>(id).await,
            RecordKind::Food => self.delete::<FoodRecord>(id).await,
            RecordKind::Sleep => self.delete::<SleepRecord>(id).await,
            RecordKind::Weight => self.delete::<WeightRecord>(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appwrite::{Collections, DocumentStore, MemoryStore};
    use crate::models::{NewSleepRecord, NewWeightRecord, SleepQuality};
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Arc;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            email_verification: true,
            registration: None,
        }
    }

    fn tracker() -> (Arc<MemoryStore>, Tracker) {
        let store = Arc::new(MemoryStore::new());
        let service = RecordService::new(store.clone(), Collections::default());
        (store, Tracker::new(service))
    }

    fn weigh_in(kg: f64) -> NewWeightRecord {
        NewWeightRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            weight: kg,
            body_fat: None,
            muscle: None,
        }
    }

    #[tokio::test]
    async fn test_add_requires_user() {
        let (store, tracker) = tracker();
        let err = tracker.add(weigh_in(70.0)).await.unwrap_err();
        assert!(matches!(err, BackendError::NotAuthenticated));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_prepends_to_local_state() {
        let (_, tracker) = tracker();
        tracker.set_user(Some(user("u1"))).await.unwrap();
        let first = tracker.add(weigh_in(70.0)).await.unwrap();
        let second = tracker.add(weigh_in(69.5)).await.unwrap();

        let data = tracker.snapshot();
        assert_eq!(data.weight.len(), 2);
        assert_eq!(data.weight[0].id, second.id);
        assert_eq!(data.weight[1].id, first.id);
        assert!(data.exercise.is_empty());
    }

    #[tokio::test]
    async fn test_set_user_loads_and_clears() {
        let (store, tracker) = tracker();
        let service = RecordService::new(store.clone(), Collections::default());
        service.create(&weigh_in(71.0), "u1").await.unwrap();
        service
            .create(
                &NewSleepRecord {
                    date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                    bedtime: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                    wake_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                    duration: 8.0,
                    quality: SleepQuality::default(),
                    notes: None,
                },
                "u1",
            )
            .await
            .unwrap();
        service.create(&weigh_in(90.0), "u2").await.unwrap();

        tracker.set_user(Some(user("u1"))).await.unwrap();
        let data = tracker.snapshot();
        assert_eq!(data.weight.len(), 1);
        assert_eq!(data.sleep.len(), 1);
        assert!(!tracker.is_loading());

        tracker.set_user(None).await.unwrap();
        assert!(tracker.snapshot().is_empty());
        assert!(tracker.user().is_none());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_state() {
        let (store, tracker) = tracker();
        tracker.set_user(Some(user("u1"))).await.unwrap();
        tracker.add(weigh_in(70.0)).await.unwrap();

        store.set_offline(true);
        let err = tracker.refresh().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable));
        assert_eq!(tracker.snapshot().weight.len(), 1);
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_failed_add_leaves_state_unchanged() {
        let (store, tracker) = tracker();
        tracker.set_user(Some(user("u1"))).await.unwrap();
        store.set_offline(true);
        assert!(tracker.add(weigh_in(70.0)).await.is_err());
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_locally_and_remotely() {
        let (store, tracker) = tracker();
        tracker.set_user(Some(user("u1"))).await.unwrap();
        let kept = tracker.add(weigh_in(70.0)).await.unwrap();
        let gone = tracker.add(weigh_in(69.0)).await.unwrap();

        tracker.delete_kind(RecordKind::Weight, &gone.id).await.unwrap();
        let data = tracker.snapshot();
        assert_eq!(data.weight.len(), 1);
        assert_eq!(data.weight[0].id, kept.id);
        assert_eq!(store.len("weight-records"), 1);

        let err = tracker.delete::<WeightRecord>(&gone.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(tracker.snapshot().weight.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_user_is_noop() {
        let (store, tracker) = tracker();
        store
            .create_document("weight-records", "w1", serde_json::json!({"userId": "u1"}))
            .await
            .unwrap();
        tracker.refresh().await.unwrap();
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_with_user_binds_without_loading() {
        let (store, _) = tracker();
        let service = RecordService::new(store.clone(), Collections::default());
        service.create(&weigh_in(70.0), "u1").await.unwrap();

        let tracker = Tracker::with_user(service, user("u1"));
        assert!(tracker.snapshot().is_empty());
        tracker.refresh().await.unwrap();
        assert_eq!(tracker.snapshot().weight.len(), 1);
    }
}
