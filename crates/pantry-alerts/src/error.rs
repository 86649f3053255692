use pantry_core::PantryError;
use thiserror::Error;

/// Errors surfaced by the alert pipeline to its caller.
///
/// Transport problems are not here: the sender folds them into a failed
/// [`crate::SendResult`].
#[derive(Debug, Error)]
pub enum AlertError {
    /// Malformed window size, recipient or date. The pipeline did not run.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The inventory query failed. Fatal for this run only.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Another alert run is in flight.
    #[error("an alert run is already in progress")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AlertError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AlertError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AlertError::InvalidParameter { .. } => "INVALID_PARAMETER",
            AlertError::Storage(_) => "STORAGE_FAILURE",
            AlertError::Busy => "BUSY",
            AlertError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<PantryError> for AlertError {
    fn from(e: PantryError) -> Self {
        match e {
            PantryError::InvalidParameter { name, reason } => {
                AlertError::InvalidParameter { name, reason }
            }
            PantryError::Database(msg) => AlertError::Storage(msg),
            other => AlertError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlertError>;
