use thiserror::Error;

#[derive(Debug, Error)]
pub enum PantryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(String),
}

impl PantryError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PantryError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Short error code string sent to clients in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PantryError::Config(_) => "CONFIG_ERROR",
            PantryError::InvalidParameter { .. } => "INVALID_PARAMETER",
            PantryError::NotFound { .. } => "NOT_FOUND",
            PantryError::Database(_) => "STORAGE_FAILURE",
        }
    }
}

pub type Result<T> = std::result::Result<T, PantryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PantryError::invalid("days_ahead", "negative").code(), "INVALID_PARAMETER");
        assert_eq!(
            PantryError::NotFound { entity: "food", id: 1 }.code(),
            "NOT_FOUND"
        );
        assert_eq!(PantryError::Database("locked".into()).code(), "STORAGE_FAILURE");
        assert_eq!(PantryError::Config("bad".into()).code(), "CONFIG_ERROR");
    }
}
