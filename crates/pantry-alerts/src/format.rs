use chrono::{Days, NaiveDate};
use pantry_core::Food;
use serde::{Deserialize, Serialize};

/// Coarse urgency classification derived from days until expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    Warning,
    Info,
}

impl Urgency {
    /// First match wins: `<= 1` critical, `<= 2` warning, otherwise info.
    pub fn from_days(days_until_expiry: i64) -> Self {
        if days_until_expiry <= 1 {
            Urgency::Critical
        } else if days_until_expiry <= 2 {
            Urgency::Warning
        } else {
            Urgency::Info
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Urgency::Critical => "critical",
            Urgency::Warning => "warning",
            Urgency::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// One item of an alert. Built per run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    pub id: i64,
    pub name: String,
    pub admission_date: NaiveDate,
    pub expiry_date: NaiveDate,
    /// Negative when the expiry date has already passed.
    pub days_until_expiry: i64,
    pub urgency: Urgency,
    pub category: String,
}

/// Structured alert handed to the renderer and sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub today: NaiveDate,
    pub total: usize,
    /// Items with `days_until_expiry <= 1`.
    pub critical: Vec<AlertItem>,
    /// Every item, most urgent first.
    pub items: Vec<AlertItem>,
    pub subject: String,
}

impl AlertPayload {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn critical_count(&self) -> usize {
        self.critical.len()
    }
}

/// Build the alert for `items` as seen on `today`. Pure.
pub fn format_alert(items: &[Food], today: NaiveDate) -> AlertPayload {
    format_alert_with_shelf_life(items, today, 0)
}

/// As [`format_alert`], with expiry at `admission_date + shelf_life_days`.
pub fn format_alert_with_shelf_life(
    items: &[Food],
    today: NaiveDate,
    shelf_life_days: u32,
) -> AlertPayload {
    let mut rows: Vec<AlertItem> = items
        .iter()
        .map(|food| {
            let expiry_date = food
                .admission_date
                .checked_add_days(Days::new(shelf_life_days as u64))
                .unwrap_or(NaiveDate::MAX);
            let days_until_expiry = (expiry_date - today).num_days();
            AlertItem {
                id: food.id,
                name: food.name.clone(),
                admission_date: food.admission_date,
                expiry_date,
                days_until_expiry,
                urgency: Urgency::from_days(days_until_expiry),
                category: food.category_name().to_string(),
            }
        })
        .collect();
    rows.sort_by_key(|r| (r.days_until_expiry, r.id));

    let critical: Vec<AlertItem> = rows
        .iter()
        .filter(|r| r.urgency == Urgency::Critical)
        .cloned()
        .collect();

    AlertPayload {
        today,
        total: rows.len(),
        subject: format!("{} food item(s) close to expiry", rows.len()),
        critical,
        items: rows,
    }
}
