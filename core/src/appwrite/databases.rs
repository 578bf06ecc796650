use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppwriteClient, BackendError, Query};

/// Documents fetched per list request.
pub const PAGE_SIZE: u32 = 100;

/// Document storage scoped to one database.
///
/// Documents are raw JSON objects carrying the backend's `$id` alongside
/// their fields.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError>;

    /// All documents owned by `user_id`, newest first.
    async fn list_documents(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, BackendError>;

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError>;

    async fn delete_document(&self, collection: &str, document_id: &str)
    -> Result<(), BackendError>;
}

/// One page of a list response. `total` is ignored: the backend caps it, so
/// paging stops on a short page instead.
#[derive(Deserialize)]
struct DocumentList {
    documents: Vec<Value>,
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        let body = json!({ "documentId": document_id, "data": data });
        self.send(
            self.request(Method::POST, &self.collection_path(collection))
                .json(&body),
        )
        .await
    }

    async fn list_documents(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, BackendError> {
        let path = self.collection_path(collection);
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut queries = vec![
                Query::equal("userId", user_id),
                Query::order_desc("$createdAt"),
                Query::limit(PAGE_SIZE),
            ];
            if let Some(ref id) = cursor {
                queries.push(Query::cursor_after(id));
            }
            let params: Vec<(&str, String)> = queries
                .iter()
                .map(|q| ("queries[]", q.to_string()))
                .collect();

            let page: DocumentList = self
                .send(self.request(Method::GET, &path).query(&params))
                .await?;
            let fetched = page.documents.len();
            cursor = page
                .documents
                .last()
                .and_then(|d| d.get("$id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            documents.extend(page.documents);

            if fetched < PAGE_SIZE as usize || cursor.is_none() {
                break;
            }
            tracing::debug!(collection, fetched = documents.len(), "fetching next page");
        }

        Ok(documents)
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        let path = format!("{}/{document_id}", self.collection_path(collection));
        self.send(
            self.request(Method::PATCH, &path)
                .json(&json!({ "data": data })),
        )
        .await
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError> {
        let path = format!("{}/{document_id}", self.collection_path(collection));
        self.send_empty(self.request(Method::DELETE, &path)).await
    }
}
