//! Query-time expiry status.
//!
//! Nothing here is persisted: days remaining depend on the day the ledger
//! is looked at.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::add_days;
use crate::Batch;

/// Signed number of days from `today` until `exp_at`.
///
/// Negative values mean the batch has already expired.
#[must_use]
pub fn days_remaining(exp_at: NaiveDate, today: NaiveDate) -> i64 {
    (exp_at - today).num_days()
}

/// A batch enriched with its expiry status relative to a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    /// The underlying batch.
    #[serde(flatten)]
    pub batch: Batch,
    /// `exp_at - today`, in days.
    pub days_remaining: i64,
    /// `days_remaining < 0`.
    pub expired: bool,
}

impl BatchStatus {
    /// Compute the status of `batch` as seen on `today`.
    #[must_use]
    pub fn new(batch: Batch, today: NaiveDate) -> Self {
        let days_remaining = days_remaining(batch.exp_at, today);
        Self {
            batch,
            days_remaining,
            expired: days_remaining < 0,
        }
    }
}

/// Inclusive range of expiry dates `[today, today + days]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window.
    pub end: NaiveDate,
}

impl ExpiryWindow {
    /// The window of the next `days` days starting at `today`.
    ///
    /// Returns `None` for negative `days` or when the end date is out of range.
    #[must_use]
    pub fn next_days(today: NaiveDate, days: i64) -> Option<Self> {
        if days < 0 {
            return None;
        }
        add_days(today, days).map(|end| Self { start: today, end })
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
