use serde::{Deserialize, Serialize};

use crate::appwrite::{AppwriteClient, BackendError, Session, User, unique_id};

/// Where verification and recovery emails link back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub verification_url: String,
    pub recovery_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            verification_url: "http://localhost:3000/verify".to_string(),
            recovery_url: "http://localhost:3000/reset-password".to_string(),
        }
    }
}

/// Account lifecycle on top of [`AppwriteClient`].
#[derive(Clone)]
pub struct AuthService {
    client: AppwriteClient,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(client: AppwriteClient, config: AuthConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn client(&self) -> &AppwriteClient {
        &self.client
    }

    /// The signed-in user, or `None` when there is no valid session.
    pub async fn current_user(&self) -> Option<User> {
        match self.client.get_account().await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "no active session");
                None
            }
        }
    }

    /// Create an account and sign straight in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let user = self
            .client
            .create_account(&unique_id(), email, password, name)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "registration failed"))?;
        self.login(email, password).await?;
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = self
            .client
            .create_email_session(email, password)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "login failed"))?;
        tracing::debug!(user = %session.user_id, "signed in");
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), BackendError> {
        self.client
            .delete_current_session()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "logout failed"))
    }

    pub async fn send_email_verification(&self) -> Result<(), BackendError> {
        self.client
            .create_verification(&self.config.verification_url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to send verification email"))
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        self.client
            .create_recovery(email, &self.config.recovery_url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to send recovery email"))
    }
}
