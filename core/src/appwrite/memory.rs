use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{BackendError, DocumentStore};

/// In-process [`DocumentStore`] with the same ordering and ownership
/// filtering as the hosted backend.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    sequence: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`BackendError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored documents in `collection`, across all users.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(Vec::is_empty)
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable)
        } else {
            Ok(())
        }
    }
}

fn not_found(document_id: &str) -> BackendError {
    BackendError::Api {
        status: 404,
        kind: "document_not_found".to_string(),
        message: format!("Document '{document_id}' could not be found"),
    }
}

fn document_id(doc: &Value) -> Option<&str> {
    doc.get("$id").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        self.check_online()?;
        let Value::Object(mut fields) = data else {
            return Err(BackendError::Api {
                status: 400,
                kind: "document_invalid_structure".to_string(),
                message: "Document data must be an object".to_string(),
            });
        };

        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| self::document_id(d) == Some(document_id)) {
            return Err(BackendError::Api {
                status: 409,
                kind: "document_already_exists".to_string(),
                message: format!("Document '{document_id}' already exists"),
            });
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        fields.insert("$id".to_string(), Value::String(document_id.to_string()));
        fields.insert("$collectionId".to_string(), Value::String(collection.to_string()));
        fields.insert("$sequence".to_string(), Value::from(seq));
        let doc = Value::Object(fields);
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn list_documents(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, BackendError> {
        self.check_online()?;
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .rev()
                    .filter(|d| d.get("userId").and_then(Value::as_str) == Some(user_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        self.check_online()?;
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|d| self::document_id(d) == Some(document_id))
            })
            .ok_or_else(|| not_found(document_id))?;

        if let (Value::Object(target), Value::Object(patch)) = (&mut *doc, data) {
            for (key, value) in patch {
                if !key.starts_with('$') {
                    target.insert(key, value);
                }
            }
        }
        Ok(doc.clone())
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError> {
        self.check_online()?;
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(document_id))?;
        let before = docs.len();
        docs.retain(|d| self::document_id(d) != Some(document_id));
        if docs.len() == before {
            return Err(not_found(document_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_is_newest_first_and_scoped_to_user() {
        let store = MemoryStore::new();
        store
            .create_document("c", "a", json!({"userId": "u1", "n": 1}))
            .await
            .unwrap();
        store
            .create_document("c", "b", json!({"userId": "u2", "n": 2}))
            .await
            .unwrap();
        store
            .create_document("c", "c", json!({"userId": "u1", "n": 3}))
            .await
            .unwrap();

        let docs = store.list_documents("c", "u1").await.unwrap();
        let ids: Vec<_> = docs.iter().filter_map(document_id).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(store.list_documents("other", "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = MemoryStore::new();
        store.create_document("c", "a", json!({})).await.unwrap();
        let err = store.create_document("c", "a", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .create_document("c", "a", json!({"userId": "u1", "calories": 100}))
            .await
            .unwrap();
        let doc = store
            .update_document("c", "a", json!({"calories": 150, "$id": "hijack"}))
            .await
            .unwrap();
        assert_eq!(doc["calories"], 150);
        assert_eq!(doc["$id"], "a");
        assert_eq!(doc["userId"], "u1");
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let store = MemoryStore::new();
        store.create_document("c", "a", json!({})).await.unwrap();
        store.delete_document("c", "a").await.unwrap();
        assert_eq!(store.len("c"), 0);
        assert!(store.is_empty());
        assert!(store.delete_document("c", "a").await.unwrap_err().is_not_found());
        assert!(store.update_document("c", "a", json!({})).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.list_documents("c", "u1").await.unwrap_err(),
            BackendError::Unavailable
        ));
        store.set_offline(false);
        assert!(store.list_documents("c", "u1").await.is_ok());
    }
}
