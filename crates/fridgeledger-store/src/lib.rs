//! SQLite-backed fridge inventory ledger.
//!
//! This crate persists batches and shelf-life defaults and implements the
//! ledger operations on top of [`fridgeledger_core`]:
//!
//! - adding batches with expiry inferred from per-name defaults
//! - cascading expiry recalculation when a default changes
//! - FIFO consumption and discard (with a waste log)
//! - canonical-order listings and expiry queries
//!
//! A [`Store`] owns its connection. Mutating operations take `&mut self`
//! and run inside one transaction each.
//!
//! # Example
//!
//! ```
//! use fridgeledger_core::{NewBatch, Tz};
//! use fridgeledger_store::Store;
//!
//! let mut store = Store::open_in_memory(Tz::Asia__Shanghai)?;
//! store.add(&NewBatch::new("milk", 2.0).in_at("2024-01-01").exp_days(3))?;
//! store.add(&NewBatch::new("milk", 1.0).in_at("2024-01-02"))?;
//!
//! let outcome = store.consume("milk", 2.5)?;
//! assert_eq!(outcome.unfulfilled, 0.0);
//! assert_eq!(store.list()?[0].quantity, 0.5);
//! # Ok::<(), fridgeledger_store::LedgerError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod batches;
mod codec;
mod depletion;
mod error;
mod schema;
mod shelf_life;

pub use batches::{BatchSelector, ExpiryChange, SelectionMode};
pub use error::{ErrorKind, LedgerError, Result};

use chrono::{NaiveDate, SecondsFormat};
use fridgeledger_core::{now_in, today_in, Tz};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Shelf life registered for a name the first time it is stocked without
/// an explicit expiry.
pub const DEFAULT_SHELF_LIFE_DAYS: u32 = 7;

/// Longest shelf life accepted, in days (about a century).
pub const MAX_SHELF_LIFE_DAYS: u32 = 36_500;

/// The inventory ledger.
///
/// Schema:
/// - `shelf_life_defaults`: (name TEXT PRIMARY KEY, days INTEGER, timestamps)
/// - `inventory`: one row per batch, dates stored as `YYYY-MM-DD`
/// - `waste_logs`: one row per batch touched by a discard
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    tz: Tz,
    fallback_days: u32,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a ledger database at `path`.
    ///
    /// Creates missing parent directories, initializes the schema and
    /// rewrites legacy date values to `YYYY-MM-DD`.
    pub fn open(path: impl AsRef<Path>, tz: Tz) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LedgerError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        debug!(path = %path.display(), %tz, "opened ledger database");
        Self::init(conn, tz, Some(path))
    }

    /// Open a private in-memory ledger.
    pub fn open_in_memory(tz: Tz) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, tz, None)
    }

    fn init(conn: Connection, tz: Tz, path: Option<PathBuf>) -> Result<Self> {
        let mut store = Self {
            conn,
            tz,
            fallback_days: DEFAULT_SHELF_LIFE_DAYS,
            path,
        };
        schema::create_tables(&store.conn)?;
        store.normalize_legacy_dates()?;
        Ok(store)
    }

    /// Use `days` instead of [`DEFAULT_SHELF_LIFE_DAYS`] when a name has no
    /// registered shelf life yet.
    pub fn with_fallback_shelf_life(mut self, days: u32) -> Result<Self> {
        self.fallback_days = shelf_life::validate_days(days)?;
        Ok(self)
    }

    /// Rewrite every batch whose stored dates are not plain `YYYY-MM-DD`.
    ///
    /// Runs automatically on open. Returns the number of rows rewritten;
    /// once normalized, further runs rewrite nothing.
    pub fn normalize_legacy_dates(&mut self) -> Result<usize> {
        let rewritten = schema::normalize_legacy_dates(&mut self.conn, self.tz)?;
        if rewritten > 0 {
            warn!(rows = rewritten, "normalized legacy date values");
        }
        Ok(rewritten)
    }

    /// The timezone dates are resolved in.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// The database file, or `None` for an in-memory ledger.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Today's date in the ledger's timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        today_in(self.tz)
    }

    /// Timestamp text for `created_at`/`updated_at` columns.
    fn now(&self) -> String {
        now_in(self.tz).to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}
