//! REST client for the hosted Appwrite backend.
//!
//! Account calls live in [`account`], document storage in [`databases`].

mod account;
mod databases;
mod error;
mod memory;
mod query;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RecordKind;

pub use account::{Session, User};
pub use databases::{DocumentStore, PAGE_SIZE};
pub use error::BackendError;
pub use memory::MemoryStore;
pub use query::Query;

pub const DEFAULT_ENDPOINT: &str = "https://fra.cloud.appwrite.io/v1";
pub const DEFAULT_PROJECT_ID: &str = "20250524112500";
pub const DEFAULT_DATABASE_ID: &str = "health-records-db";

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collections: Collections,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for AppwriteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            collections: Collections::default(),
            timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

/// Collection ids, one per record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub exercise_records: String,
    pub food_records: String,
    pub sleep_records: String,
    pub weight_records: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            exercise_records: "exercise-records".to_string(),
            food_records: "food-records".to_string(),
            sleep_records: "sleep-records".to_string(),
            weight_records: "weight-records".to_string(),
        }
    }
}

impl Collections {
    #[must_use]
    pub fn for_kind(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Exercise => &self.exercise_records,
            RecordKind::Food => &self.food_records,
            RecordKind::Sleep => &self.sleep_records,
            RecordKind::Weight => &self.weight_records,
        }
    }
}

/// A fresh 32-character document or user id.
#[must_use]
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Appwrite REST client. Clones share the HTTP pool and the session.
#[derive(Clone)]
pub struct AppwriteClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: AppwriteConfig,
    session: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
}

impl AppwriteClient {
    pub fn new(config: AppwriteConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(format!(
                "healthlog/{} (health tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                session: RwLock::new(None),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppwriteConfig {
        &self.inner.config
    }

    /// The current session secret, if signed in.
    #[must_use]
    pub fn session_secret(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_session(&self, secret: Option<String>) {
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = secret;
    }

    fn cookie_name(&self) -> String {
        format!("a_session_{}", self.inner.config.project_id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.config.endpoint.trim_end_matches('/'))
    }

    pub(crate) fn collection_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{collection}/documents",
            self.inner.config.database_id
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .inner
            .http
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.inner.config.project_id);
        if let Some(secret) = self.session_secret() {
            req = req.header(COOKIE, format!("{}={secret}", self.cookie_name()));
        }
        req
    }

    /// Send and map transport failures and non-2xx statuses to [`BackendError`].
    async fn execute(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let resp = req.send().await.map_err(BackendError::from_transport)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let (message, kind) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(e) => (e.message, e.kind),
            Err(_) => (body, String::new()),
        };
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized(message));
        }
        Err(BackendError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = self.execute(req).await?;
        decode(resp).await
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), BackendError> {
        self.execute(req).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    let bytes = resp.bytes().await.map_err(BackendError::from_transport)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Find the session cookie in `Set-Cookie`, then in `X-Fallback-Cookies`.
fn session_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for value in headers.get_all(SET_COOKIE) {
        let Ok(cookie) = value.to_str() else {
            continue;
        };
        let pair = cookie.split(';').next().unwrap_or_default();
        if let Some((name, secret)) = pair.split_once('=') {
            if name.trim() == cookie_name && !secret.is_empty() {
                return Some(secret.trim().to_string());
            }
        }
    }

    let fallback = headers.get(FALLBACK_COOKIES_HEADER)?.to_str().ok()?;
    let cookies: std::collections::HashMap<String, String> =
        serde_json::from_str(fallback).ok()?;
    cookies.get(cookie_name).filter(|s| !s.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_collections_for_kind() {
        let c = Collections::default();
        assert_eq!(c.for_kind(RecordKind::Exercise), "exercise-records");
        assert_eq!(c.for_kind(RecordKind::Weight), "weight-records");
    }

    #[test]
    fn test_unique_id_shape() {
        let id = unique_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, unique_id());
    }

    #[test]
    fn test_url_joins_trailing_slash() {
        let client = AppwriteClient::new(AppwriteConfig {
            endpoint: "https://example.test/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url("/account"), "https://example.test/v1/account");
        assert_eq!(
            client.collection_path("food-records"),
            "/databases/health-records-db/collections/food-records/documents"
        );
    }

    #[test]
    fn test_session_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("a_session_p1_legacy=old; path=/"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("a_session_p1=abc123; path=/; httponly"),
        );
        assert_eq!(
            session_from_headers(&headers, "a_session_p1").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_session_from_fallback_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FALLBACK_COOKIES_HEADER,
            HeaderValue::from_static(r#"{"a_session_p1":"fallback"}"#),
        );
        assert_eq!(
            session_from_headers(&headers, "a_session_p1").as_deref(),
            Some("fallback")
        );
        assert!(session_from_headers(&HeaderMap::new(), "a_session_p1").is_none());
    }

    #[test]
    fn test_set_session_shared_between_clones() {
        let client = AppwriteClient::new(AppwriteConfig::default()).unwrap();
        let clone = client.clone();
        client.set_session(Some("s3cret".to_string()));
        assert_eq!(clone.session_secret().as_deref(), Some("s3cret"));
        clone.set_session(None);
        assert!(client.session_secret().is_none());
    }
}
