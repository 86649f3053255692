use chrono::NaiveDate;
use pantry_core::{Food, ItemStore, PantryError};
use tracing::debug;

use crate::db;
use crate::manager::foods_in_date_range;

/// Path-based storage handle for the alert pipeline.
///
/// Every query opens its own connection and closes it when the call returns,
/// so no session is ever shared between two alert runs.
#[derive(Debug, Clone)]
pub struct InventoryDb {
    path: String,
}

impl InventoryDb {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ItemStore for InventoryDb {
    fn query_items_in_date_range(
        &self,
        low: NaiveDate,
        high: NaiveDate,
    ) -> pantry_core::Result<Vec<Food>> {
        let conn = db::open(&self.path).map_err(PantryError::from)?;
        debug!(path = %self.path, "storage session opened");
        let foods = foods_in_date_range(&conn, low, high).map_err(PantryError::from)?;
        // `conn` drops here, and on the early returns above.
        Ok(foods)
    }
}
