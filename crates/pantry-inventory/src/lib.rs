pub mod db;
pub mod error;
pub mod manager;
pub mod store;
pub mod types;

pub use error::InventoryError;
pub use manager::InventoryManager;
pub use store::InventoryDb;
pub use types::{FoodInput, CategoryInput, Page, PageRequest};
