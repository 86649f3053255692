use pantry_core::PantryError;
use thiserror::Error;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A food references a category id that does not exist.
    #[error("category does not exist: {0}")]
    UnknownCategory(i64),

    /// The category is still referenced by foods and cannot be deleted.
    #[error("category {id} is still referenced by {foods} food(s)")]
    CategoryInUse { id: i64, foods: i64 },

    /// Request data failed validation before reaching the database.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;

impl From<InventoryError> for PantryError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::NotFound { entity, id } => PantryError::NotFound { entity, id },
            InventoryError::UnknownCategory(id) => {
                PantryError::invalid("category_id", format!("category {id} does not exist"))
            }
            InventoryError::InvalidInput(reason) => PantryError::invalid("body", reason),
            other => PantryError::Database(other.to_string()),
        }
    }
}
