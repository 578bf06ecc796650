use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Backend error {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unavailable
        } else {
            Self::Request(err)
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// True when the caller has no valid session.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::Unauthorized(_))
    }
}
