//! `pantry-core`: configuration, errors and domain types shared by every
//! Pantry crate.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use error::{PantryError, Result};
pub use store::ItemStore;
pub use types::{Category, Food};
