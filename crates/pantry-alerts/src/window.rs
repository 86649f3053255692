use chrono::{Days, NaiveDate};
use pantry_core::config::DAYS_LOOKBACK;
use pantry_core::{Food, ItemStore};
use serde::Serialize;
use tracing::info;

use crate::error::{AlertError, Result};

/// Date window an item's expiry date must fall in to be reported.
///
/// `past_cutoff = today - days_lookback`, `future_cutoff = today + days_ahead`,
/// both inclusive. Both offsets are unsigned so `past_cutoff <= future_cutoff`
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpiryWindow {
    pub today: NaiveDate,
    pub days_ahead: u32,
    pub days_lookback: u32,
    /// Days added to `admission_date` to get the expiry date.
    pub shelf_life_days: u32,
    pub past_cutoff: NaiveDate,
    pub future_cutoff: NaiveDate,
}

impl ExpiryWindow {
    /// Build a window. `days_ahead` must be a non-negative integer.
    pub fn new(today: NaiveDate, days_ahead: i64) -> Result<Self> {
        let days_ahead = u32::try_from(days_ahead).map_err(|_| {
            AlertError::invalid(
                "days_ahead",
                format!("must be a non-negative integer, got {days_ahead}"),
            )
        })?;
        let past_cutoff = today
            .checked_sub_days(Days::new(DAYS_LOOKBACK as u64))
            .ok_or_else(|| AlertError::invalid("today", "date out of range"))?;
        let future_cutoff = today
            .checked_add_days(Days::new(days_ahead as u64))
            .ok_or_else(|| AlertError::invalid("days_ahead", "window end out of range"))?;
        Ok(Self {
            today,
            days_ahead,
            days_lookback: DAYS_LOOKBACK,
            shelf_life_days: 0,
            past_cutoff,
            future_cutoff,
        })
    }

    pub fn with_shelf_life(mut self, days: u32) -> Self {
        self.shelf_life_days = days;
        self
    }

    /// Expiry date of an item admitted on `admission_date`.
    pub fn expiry_date(&self, admission_date: NaiveDate) -> Option<NaiveDate> {
        admission_date.checked_add_days(Days::new(self.shelf_life_days as u64))
    }

    /// Admission-date range to request from storage.
    pub fn admission_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let shift = Days::new(self.shelf_life_days as u64);
        Some((
            self.past_cutoff.checked_sub_days(shift)?,
            self.future_cutoff.checked_sub_days(shift)?,
        ))
    }

    pub fn contains(&self, admission_date: NaiveDate) -> bool {
        self.expiry_date(admission_date)
            .is_some_and(|d| self.past_cutoff <= d && d <= self.future_cutoff)
    }
}

/// Coerce a raw `days_ahead` value, falling back to `default` when absent.
pub fn parse_days_ahead(raw: Option<&str>, default: u32) -> Result<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default as i64),
        Some(s) => {
            let n: i64 = s.parse().map_err(|_| {
                AlertError::invalid("days_ahead", format!("not an integer: {s:?}"))
            })?;
            if n < 0 {
                return Err(AlertError::invalid(
                    "days_ahead",
                    format!("must be non-negative, got {n}"),
                ));
            }
            Ok(n)
        }
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(name: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AlertError::invalid(name, format!("{raw:?}: {e}")))
}

/// Items whose expiry date falls inside `window`, in storage order.
///
/// Read-only against `store`.
pub fn find_near_expiry(store: &dyn ItemStore, window: &ExpiryWindow) -> Result<Vec<Food>> {
    let (low, high) = window
        .admission_range()
        .ok_or_else(|| AlertError::invalid("shelf_life_days", "window start out of range"))?;
    let mut foods = store.query_items_in_date_range(low, high)?;
    foods.retain(|f| window.contains(f.admission_date));
    info!(
        count = foods.len(),
        days_ahead = window.days_ahead,
        past_cutoff = %window.past_cutoff,
        future_cutoff = %window.future_cutoff,
        "near-expiry items found"
    );
    Ok(foods)
}
