//! Core types for fridgeledger
//!
//! This crate provides the storage-independent pieces of the fridge ledger:
//!
//! - [`Batch`] - One stocked quantity with its own arrival and expiry dates
//! - [`ExpSource`] - Whether an expiry was set by the user or inferred from a default
//! - [`ShelfLifeDefault`] - Per-name default number of days until expiry
//! - [`normalize_date`] - Lenient date parsing into a local calendar date
//! - [`plan_depletion`] - The FIFO consumption/discard walk over canonical batches
//! - [`BatchStatus`] - Query-time expiry enrichment (days remaining, expired flag)
//!
//! # Example
//!
//! ```
//! use fridgeledger_core::{plan_depletion, Batch, ExpSource};
//! use chrono::NaiveDate;
//!
//! let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let batches = vec![
//!     Batch::new(1, "milk", 2.0, date(1), date(4), ExpSource::User),
//!     Batch::new(2, "milk", 1.0, date(2), date(9), ExpSource::Default),
//! ];
//!
//! let outcome = plan_depletion(&batches, 2.5);
//! assert_eq!(outcome.unfulfilled, 0.0);
//! assert!(outcome.details[0].deleted);
//! assert_eq!(outcome.details[1].consumed, 0.5);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod date;
pub mod expiry;
pub mod fifo;

pub use batch::{Batch, BatchId, ExpSource, NewBatch, ShelfLifeDefault, WasteRecord};
pub use date::{
    add_days, format_date, in_storage_range, normalize_date, now_in, parse_date, today_in,
    InvalidDateFormat, STORAGE_YEARS,
};
pub use expiry::{days_remaining, BatchStatus, ExpiryWindow};
pub use fifo::{plan_depletion, ConsumedLot, ConsumptionOutcome, QUANTITY_EPSILON};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use chrono_tz::Tz;
