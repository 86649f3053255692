pub mod alerts;
pub mod categories;
pub mod error;
pub mod foods;
pub mod health;
