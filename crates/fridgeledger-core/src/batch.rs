//! Batch and shelf-life record types.
//!
//! A [`Batch`] is one stocked quantity of a named item. The ledger never
//! merges batches: two cartons of milk bought on different days are two
//! batches, each with its own expiry date. Reads always return batches in
//! canonical order, see [`Batch::canonical_key`].

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Identifier of a stored batch. Assigned by the store, never reused.
pub type BatchId = i64;

/// Provenance of a batch's expiry date.
///
/// Only `Default` expiries are rewritten when the shelf-life default for
/// the batch's name changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpSource {
    /// Set explicitly (expiry days or expiry date given by the caller).
    User,
    /// Inferred from the shelf-life default of the batch's name.
    #[default]
    Default,
}

impl ExpSource {
    /// The storage representation (`"user"` or `"default"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Default => "default",
        }
    }
}

impl FromStr for ExpSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "default" => Ok(Self::Default),
            _ => Err(format!("unknown expiry source: {s}")),
        }
    }
}

impl fmt::Display for ExpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stocked quantity record.
///
/// # Examples
///
/// ```
/// use fridgeledger_core::{Batch, ExpSource};
/// use chrono::NaiveDate;
///
/// let in_at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let exp_at = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
/// let batch = Batch::new(1, "milk", 2.0, in_at, exp_at, ExpSource::User);
///
/// assert_eq!(batch.name, "milk");
/// assert_eq!(batch.canonical_key(), (exp_at, in_at, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique, monotonically assigned id.
    pub id: BatchId,
    /// Item name, case-sensitive as stored.
    pub name: String,
    /// Remaining quantity, never negative.
    pub quantity: f64,
    /// Display unit chosen by the caller (no conversion is performed).
    pub unit: Option<String>,
    /// Arrival date.
    pub in_at: NaiveDate,
    /// Expiry date.
    pub exp_at: NaiveDate,
    /// Where `exp_at` came from.
    pub exp_source: ExpSource,
    /// When the batch was written.
    pub created_at: DateTime<FixedOffset>,
    /// When the batch was last modified.
    pub updated_at: DateTime<FixedOffset>,
}

impl Batch {
    /// Create a batch with epoch timestamps and no unit.
    ///
    /// Stores assign real timestamps; this constructor is meant for
    /// planning and tests.
    #[must_use]
    pub fn new(
        id: BatchId,
        name: impl Into<String>,
        quantity: f64,
        in_at: NaiveDate,
        exp_at: NaiveDate,
        exp_source: ExpSource,
    ) -> Self {
        let epoch = DateTime::<FixedOffset>::default();
        Self {
            id,
            name: name.into(),
            quantity,
            unit: None,
            in_at,
            exp_at,
            exp_source,
            created_at: epoch,
            updated_at: epoch,
        }
    }

    /// Set the display unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// The `(exp_at, in_at, id)` key that defines canonical order.
    ///
    /// Canonical order is both the display order of every ledger view and
    /// the order in which consumption depletes batches.
    #[must_use]
    pub const fn canonical_key(&self) -> (NaiveDate, NaiveDate, BatchId) {
        (self.exp_at, self.in_at, self.id)
    }

    /// Compare two batches by canonical order.
    #[must_use]
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        self.canonical_key().cmp(&other.canonical_key())
    }

    /// Sort batches into canonical order.
    pub fn sort_canonical(batches: &mut [Self]) {
        batches.sort_by(Self::cmp_canonical);
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.id, self.name, self.quantity)?;
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        write!(
            f,
            " (in {}, expires {} [{}])",
            self.in_at, self.exp_at, self.exp_source
        )
    }
}

/// Input for adding a batch.
///
/// Dates are raw text and go through the date normalizer. Expiry
/// resolution priority is `exp_days` > `exp_at` > the shelf-life default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    /// Item name.
    pub name: String,
    /// Quantity to stock.
    pub quantity: f64,
    /// Display unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Arrival date text; today when absent.
    #[serde(default)]
    pub in_at: Option<String>,
    /// Days from arrival until expiry.
    #[serde(default)]
    pub exp_days: Option<i64>,
    /// Explicit expiry date text.
    #[serde(default)]
    pub exp_at: Option<String>,
}

impl NewBatch {
    /// Start a new batch description.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            ..Self::default()
        }
    }

    /// Set the display unit.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the arrival date text.
    #[must_use]
    pub fn in_at(mut self, in_at: impl Into<String>) -> Self {
        self.in_at = Some(in_at.into());
        self
    }

    /// Set the expiry as a number of days after arrival.
    #[must_use]
    pub const fn exp_days(mut self, days: i64) -> Self {
        self.exp_days = Some(days);
        self
    }

    /// Set the expiry date text.
    #[must_use]
    pub fn exp_at(mut self, exp_at: impl Into<String>) -> Self {
        self.exp_at = Some(exp_at.into());
        self
    }
}

/// Default shelf life for an item name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfLifeDefault {
    /// Item name (unique key).
    pub name: String,
    /// Days from arrival until expiry, always positive.
    pub days: u32,
    /// When the default was first registered.
    pub created_at: DateTime<FixedOffset>,
    /// When the default was last written.
    pub updated_at: DateTime<FixedOffset>,
}

/// Audit row written for every batch touched by a discard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteRecord {
    /// Row id in the waste log.
    pub id: i64,
    /// The batch the quantity was taken from. The batch may no longer exist.
    pub batch_id: BatchId,
    /// Item name.
    pub name: String,
    /// Quantity thrown away from this batch.
    pub quantity: f64,
    /// Display unit of the batch.
    pub unit: Option<String>,
    /// Expiry date of the batch when it was discarded.
    pub exp_at: NaiveDate,
    /// When the discard happened.
    pub discarded_at: DateTime<FixedOffset>,
}
