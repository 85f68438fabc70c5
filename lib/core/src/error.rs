use std::time::Duration;
use thiserror::Error;

use crate::user::UserId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Preferences not set for user {0}")]
    PreferencesNotSet(UserId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("External service timed out after {0:?}")]
    ExternalServiceTimeout(Duration),

    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    #[error("External service not configured")]
    NotConfigured,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid field registry: {0}")]
    InvalidRegistry(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Upstream failures are recovered by the local fallback path.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::ExternalService(_)
                | Error::ExternalServiceTimeout(_)
                | Error::MalformedPayload(_)
                | Error::NotConfigured
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
