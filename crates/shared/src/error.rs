use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body returned by the transfer service on non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}

/// Raised when raw form input cannot be coerced into a wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Recipient ID is required")]
    MissingRecipient,
    #[error("Recipient ID must be a whole number, got '{0}'")]
    InvalidRecipient(String),
    #[error("Amount is required")]
    MissingAmount,
    #[error("Amount must be a number, got '{0}'")]
    InvalidAmount(String),
    #[error("Amount must be positive")]
    NonPositiveAmount,
}
