use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AppwriteClient, BackendError, decode, session_from_headers};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "$id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub expire: String,
    #[serde(default, skip_serializing)]
    pub secret: String,
}

impl AppwriteClient {
    pub async fn get_account(&self) -> Result<User, BackendError> {
        self.send(self.request(Method::GET, "/account")).await
    }

    pub async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let body = json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        });
        self.send(self.request(Method::POST, "/account").json(&body))
            .await
    }

    /// Sign in and keep the session secret for subsequent requests.
    pub async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password });
        let resp = self
            .execute(
                self.request(Method::POST, "/account/sessions/email")
                    .json(&body),
            )
            .await?;
        let from_headers = session_from_headers(resp.headers(), &self.cookie_name());
        let session: Session = decode(resp).await?;

        let secret = Some(session.secret.clone())
            .filter(|s| !s.is_empty())
            .or(from_headers);
        if secret.is_none() {
            tracing::warn!("session created but no session secret was returned");
        }
        self.set_session(secret);
        Ok(session)
    }

    pub async fn delete_current_session(&self) -> Result<(), BackendError> {
        self.send_empty(self.request(Method::DELETE, "/account/sessions/current"))
            .await?;
        self.set_session(None);
        Ok(())
    }

    /// Email a verification link pointing at `url`.
    pub async fn create_verification(&self, url: &str) -> Result<(), BackendError> {
        self.send_empty(
            self.request(Method::POST, "/account/verification")
                .json(&json!({ "url": url })),
        )
        .await
    }

    /// Email a password recovery link pointing at `url`.
    pub async fn create_recovery(&self, email: &str, url: &str) -> Result<(), BackendError> {
        self.send_empty(
            self.request(Method::POST, "/account/recovery")
                .json(&json!({ "email": email, "url": url })),
        )
        .await
    }
}
