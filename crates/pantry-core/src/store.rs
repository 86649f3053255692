use chrono::NaiveDate;

use crate::error::Result;
use crate::types::Food;

/// Read-only view of the inventory used by the alerting pipeline.
///
/// Implementations acquire their storage session per call and release it
/// before returning, on every exit path.
pub trait ItemStore: Send + Sync {
    /// All items with `low <= admission_date <= high`. No ordering guarantee.
    fn query_items_in_date_range(&self, low: NaiveDate, high: NaiveDate) -> Result<Vec<Food>>;
}
