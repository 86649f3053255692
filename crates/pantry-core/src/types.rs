use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Food category. Owned independently of the foods that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A single inventory item.
///
/// `category` is the resolved `category_id` reference; it is `None` only when
/// the row points at a category that no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    /// Calendar date without a time component. Never null.
    pub admission_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Food {
    /// Category name, or `"uncategorized"` when the reference is unresolved.
    pub fn category_name(&self) -> &str {
        self.category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("uncategorized")
    }
}
