//! Batch records: adding, listing, expiry queries and expiry corrections.

use chrono::NaiveDate;
use fridgeledger_core::{
    add_days, format_date, normalize_date, Batch, BatchId, BatchStatus, ExpSource, ExpiryWindow,
    NewBatch,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::codec::{batch_from_row, BATCH_COLUMNS, CANONICAL_ORDER};
use crate::error::{validate_date, validate_name, validate_quantity};
use crate::shelf_life::{select_default_days, upsert_default};
use crate::{LedgerError, Result, Store};

/// Which of a name's batches an expiry correction applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every batch of the name.
    #[default]
    All,
    /// The first batch in canonical order.
    Earliest,
    /// The last batch in canonical order.
    Latest,
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            _ => Err(format!("unknown selection mode: {s}")),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Earliest => write!(f, "earliest"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Target of an expiry correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSelector {
    /// A single batch.
    Id(BatchId),
    /// Batches of a name, picked from canonical order.
    Name {
        /// Item name.
        name: String,
        /// Which batches to pick.
        mode: SelectionMode,
    },
}

/// New expiry for a correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryChange {
    /// Days after each batch's own arrival date.
    Days(i64),
    /// An absolute date (raw text, normalized before use).
    Date(String),
}

/// [`ExpiryChange`] with the date text already parsed.
#[derive(Clone, Copy)]
enum NewExpiry {
    After(i64),
    On(NaiveDate),
}

pub(crate) fn select_batch(conn: &Connection, id: BatchId) -> rusqlite::Result<Option<Batch>> {
    conn.query_row(
        &format!("SELECT {BATCH_COLUMNS} FROM inventory WHERE id = ?1"),
        params![id],
        batch_from_row,
    )
    .optional()
}

pub(crate) fn select_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Vec<Batch>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BATCH_COLUMNS} FROM inventory WHERE name = ?1 {CANONICAL_ORDER}"
    ))?;
    let rows = stmt.query_map(params![name], batch_from_row)?;
    rows.collect()
}

/// `in_at + days`, rejected unless it keeps the `YYYY-MM-DD` storage form.
pub(crate) fn expiry_after(in_at: NaiveDate, days: i64) -> Result<NaiveDate> {
    add_days(in_at, days)
        .ok_or_else(|| LedgerError::invalid(format!("{days} days after {in_at} is out of range")))
        .and_then(validate_date)
}

impl Store {
    /// Stock a new batch.
    ///
    /// `in_at` defaults to today. The expiry is taken from `exp_days`
    /// (relative to `in_at`) if given, else from `exp_at`, and both mark
    /// the batch as [`ExpSource::User`]. Otherwise the name's shelf-life
    /// default is used, registering the fallback default first when the
    /// name has none, and the batch is marked [`ExpSource::Default`].
    pub fn add(&mut self, new: &NewBatch) -> Result<Batch> {
        let name = validate_name(&new.name)?;
        let quantity = validate_quantity(new.quantity)?;
        let in_at = validate_date(normalize_date(new.in_at.as_deref(), self.tz)?)?;

        let explicit = match (new.exp_days, new.exp_at.as_deref()) {
            (Some(days), _) => Some(expiry_after(in_at, days)?),
            (None, Some(text)) => Some(validate_date(normalize_date(Some(text), self.tz)?)?),
            (None, None) => None,
        };

        let now = self.now();
        let fallback_days = self.fallback_days;
        let tx = self.conn.transaction()?;

        let (exp_at, exp_source) = match explicit {
            Some(exp_at) => (exp_at, ExpSource::User),
            None => {
                let days = match select_default_days(&tx, name)? {
                    Some(days) => days,
                    None => {
                        debug!(name, days = fallback_days, "registering fallback shelf life");
                        upsert_default(&tx, name, fallback_days, &now)?;
                        fallback_days
                    }
                };
                (expiry_after(in_at, i64::from(days))?, ExpSource::Default)
            }
        };

        tx.execute(
            "INSERT INTO inventory(name, quantity, unit, in_at, exp_at, exp_source, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                name,
                quantity,
                new.unit,
                format_date(in_at),
                format_date(exp_at),
                exp_source.as_str(),
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        let batch = select_batch(&tx, id)?.ok_or(LedgerError::NotFound { id })?;
        tx.commit()?;

        info!(id, name, quantity, %exp_at, %exp_source, "batch added");
        Ok(batch)
    }

    /// Look up one batch.
    pub fn get(&self, id: BatchId) -> Result<Option<Batch>> {
        Ok(select_batch(&self.conn, id)?)
    }

    /// Every batch, in canonical order.
    pub fn list(&self) -> Result<Vec<Batch>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BATCH_COLUMNS} FROM inventory {CANONICAL_ORDER}"))?;
        let rows = stmt.query_map([], batch_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Batches of one name, in canonical order.
    pub fn list_by_name(&self, name: &str) -> Result<Vec<Batch>> {
        Ok(select_by_name(&self.conn, name)?)
    }

    /// Every batch with its expiry status as of `today`.
    pub fn query(&self, today: NaiveDate) -> Result<Vec<BatchStatus>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|batch| BatchStatus::new(batch, today))
            .collect())
    }

    /// Batches expiring in `[today, today + days]`, in canonical order.
    pub fn expiring_within(&self, today: NaiveDate, days: i64) -> Result<Vec<Batch>> {
        let window = ExpiryWindow::next_days(today, days)
            .ok_or_else(|| LedgerError::invalid(format!("invalid expiry window: {days} days")))?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BATCH_COLUMNS} FROM inventory WHERE exp_at >= ?1 AND exp_at <= ?2 {CANONICAL_ORDER}"
        ))?;
        let rows = stmt.query_map(
            params![format_date(window.start), format_date(window.end)],
            batch_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Correct the expiry of existing batches.
    ///
    /// Every updated batch becomes [`ExpSource::User`], whatever its prior
    /// source, so later shelf-life changes no longer touch it. Returns the
    /// number of batches updated; an unknown name updates nothing, an
    /// unknown id is [`LedgerError::NotFound`].
    pub fn update_expiry(&mut self, selector: &BatchSelector, change: &ExpiryChange) -> Result<usize> {
        if let BatchSelector::Name { name, .. } = selector {
            validate_name(name)?;
        }
        let new_expiry = match change {
            ExpiryChange::Days(days) => NewExpiry::After(*days),
            ExpiryChange::Date(text) => {
                NewExpiry::On(validate_date(normalize_date(Some(text), self.tz)?)?)
            }
        };

        let now = self.now();
        let tx = self.conn.transaction()?;

        let targets = match selector {
            BatchSelector::Id(id) => {
                vec![select_batch(&tx, *id)?.ok_or(LedgerError::NotFound { id: *id })?]
            }
            BatchSelector::Name { name, mode } => {
                let mut rows = select_by_name(&tx, name)?;
                match mode {
                    SelectionMode::All => rows,
                    SelectionMode::Earliest => {
                        rows.truncate(1);
                        rows
                    }
                    SelectionMode::Latest => rows.pop().into_iter().collect(),
                }
            }
        };

        let mut updated = 0;
        for batch in &targets {
            let exp_at = match new_expiry {
                NewExpiry::After(days) => expiry_after(batch.in_at, days)?,
                NewExpiry::On(date) => date,
            };
            debug!(id = batch.id, from = %batch.exp_at, to = %exp_at, "updating expiry");
            updated += tx.execute(
                "UPDATE inventory SET exp_at = ?1, exp_source = ?2, updated_at = ?3 WHERE id = ?4",
                params![format_date(exp_at), ExpSource::User.as_str(), now, batch.id],
            )?;
        }

        tx.commit()?;
        info!(updated, "expiry updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fridgeledger_core::Tz;

    fn store() -> Store {
        Store::open_in_memory(Tz::Asia__Shanghai).unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_add_with_exp_days_is_user() {
        let mut store = store();
        let batch = store
            .add(&NewBatch::new("milk", 2.0).unit("L").in_at("2024-01-01").exp_days(3))
            .unwrap();

        assert_eq!(batch.exp_at, date(1, 4));
        assert_eq!(batch.exp_source, ExpSource::User);
        assert_eq!(batch.unit.as_deref(), Some("L"));
        // No default is registered for explicit expiries.
        assert_eq!(store.default_days("milk").unwrap(), None);
    }

    #[test]
    fn test_exp_days_wins_over_exp_at() {
        let mut store = store();
        let batch = store
            .add(
                &NewBatch::new("milk", 1.0)
                    .in_at("2024-01-01")
                    .exp_days(2)
                    .exp_at("2024-02-01"),
            )
            .unwrap();
        assert_eq!(batch.exp_at, date(1, 3));
    }

    #[test]
    fn test_add_with_exp_at_text() {
        let mut store = store();
        let batch = store
            .add(&NewBatch::new("tofu", 1.0).in_at("2024-01-01").exp_at("2024-01-06T12:00:00"))
            .unwrap();
        assert_eq!(batch.exp_at, date(1, 6));
        assert_eq!(batch.exp_source, ExpSource::User);
    }

    #[test]
    fn test_add_registers_fallback_default() {
        let mut store = store();
        let batch = store.add(&NewBatch::new("milk", 1.0).in_at("2024-01-02")).unwrap();

        assert_eq!(batch.exp_at, date(1, 9));
        assert_eq!(batch.exp_source, ExpSource::Default);
        assert_eq!(store.default_days("milk").unwrap(), Some(7));
    }

    #[test]
    fn test_add_uses_registered_default() {
        let mut store = store();
        store.upsert_default_days("cheese", 30).unwrap();
        let batch = store.add(&NewBatch::new("cheese", 1.0).in_at("2024-01-01")).unwrap();
        assert_eq!(batch.exp_at, date(1, 31));
    }

    #[test]
    fn test_custom_fallback() {
        let mut store = store().with_fallback_shelf_life(3).unwrap();
        let batch = store.add(&NewBatch::new("fish", 1.0).in_at("2024-01-01")).unwrap();
        assert_eq!(batch.exp_at, date(1, 4));
        assert!(Store::open_in_memory(Tz::Asia__Shanghai)
            .unwrap()
            .with_fallback_shelf_life(0)
            .is_err());
    }

    #[test]
    fn test_add_defaults_in_at_to_today() {
        let mut store = store();
        let batch = store.add(&NewBatch::new("milk", 1.0).exp_days(1)).unwrap();
        assert_eq!(batch.in_at, store.today());
    }

    #[test]
    fn test_add_rejects_bad_input_without_writing() {
        let mut store = store();
        assert!(matches!(
            store.add(&NewBatch::new("", 1.0)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.add(&NewBatch::new("milk", -1.0)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.add(&NewBatch::new("milk", 1.0).in_at("whenever")),
            Err(LedgerError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            store.add(&NewBatch::new("milk", 1.0).exp_days(i64::MAX)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.default_days("milk").unwrap(), None);
    }

    #[test]
    fn test_add_rejects_dates_past_9999() {
        let mut store = store();
        assert!(matches!(
            store.add(&NewBatch::new("egg", 1.0).in_at("2024-01-01").exp_days(3_000_000)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.add(&NewBatch::new("egg", 1.0).exp_at("+10237-09-21")),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.add(&NewBatch::new("egg", 1.0).in_at("9999-12-31")),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(store.list().unwrap().is_empty());

        let last = store
            .add(&NewBatch::new("egg", 1.0).in_at("9999-12-01").exp_days(30))
            .unwrap();
        let soon = store
            .add(&NewBatch::new("egg", 1.0).in_at("2024-01-01").exp_days(1))
            .unwrap();
        let ids: Vec<_> = store.list().unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![soon.id, last.id]);
        assert_eq!(store.consume("egg", 2.0).unwrap().unfulfilled, 0.0);
    }

    #[test]
    fn test_update_expiry_rejects_dates_past_9999() {
        let mut store = store();
        let batch = store
            .add(&NewBatch::new("egg", 1.0).in_at("2024-01-01").exp_days(3))
            .unwrap();
        let id = BatchSelector::Id(batch.id);
        assert!(matches!(
            store.update_expiry(&id, &ExpiryChange::Days(3_000_000)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.update_expiry(&id, &ExpiryChange::Date("+10000-01-01".to_string())),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.get(batch.id).unwrap().unwrap(), batch);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = store();
        let a = store.add(&NewBatch::new("a", 1.0).exp_days(1)).unwrap();
        let b = store.add(&NewBatch::new("b", 1.0).exp_days(1)).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_list_canonical_order() {
        let mut store = store();
        let late = store
            .add(&NewBatch::new("egg", 1.0).in_at("2024-01-01").exp_at("2024-01-20"))
            .unwrap();
        let early_second = store
            .add(&NewBatch::new("egg", 1.0).in_at("2024-01-03").exp_at("2024-01-10"))
            .unwrap();
        let early_first = store
            .add(&NewBatch::new("egg", 1.0).in_at("2024-01-02").exp_at("2024-01-10"))
            .unwrap();
        let other = store
            .add(&NewBatch::new("ham", 1.0).in_at("2024-01-01").exp_at("2024-01-15"))
            .unwrap();

        let ids: Vec<_> = store.list().unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![early_first.id, early_second.id, other.id, late.id]);

        let eggs: Vec<_> = store.list_by_name("egg").unwrap().iter().map(|b| b.id).collect();
        assert_eq!(eggs, vec![early_first.id, early_second.id, late.id]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut store = store();
        store.add(&NewBatch::new("Milk", 1.0).exp_days(1)).unwrap();
        assert!(store.list_by_name("milk").unwrap().is_empty());
    }

    #[test]
    fn test_expiring_within_inclusive() {
        let mut store = store();
        for exp in ["2024-01-09", "2024-01-10", "2024-01-13", "2024-01-14"] {
            store
                .add(&NewBatch::new("milk", 1.0).in_at("2024-01-01").exp_at(exp))
                .unwrap();
        }
        let hits: Vec<_> = store
            .expiring_within(date(1, 10), 3)
            .unwrap()
            .iter()
            .map(|b| b.exp_at)
            .collect();
        assert_eq!(hits, vec![date(1, 10), date(1, 13)]);

        assert!(matches!(
            store.expiring_within(date(1, 10), -1),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_query_enriches() {
        let mut store = store();
        store
            .add(&NewBatch::new("milk", 1.0).in_at("2024-01-01").exp_at("2024-01-05"))
            .unwrap();
        let status = &store.query(date(1, 7)).unwrap()[0];
        assert_eq!(status.days_remaining, -2);
        assert!(status.expired);
    }

    #[test]
    fn test_update_expiry_by_id() {
        let mut store = store();
        let batch = store.add(&NewBatch::new("milk", 1.0).in_at("2024-01-01")).unwrap();
        assert_eq!(batch.exp_source, ExpSource::Default);

        let n = store
            .update_expiry(&BatchSelector::Id(batch.id), &ExpiryChange::Days(2))
            .unwrap();
        assert_eq!(n, 1);

        let updated = store.get(batch.id).unwrap().unwrap();
        assert_eq!(updated.exp_at, date(1, 3));
        assert_eq!(updated.exp_source, ExpSource::User);
    }

    #[test]
    fn test_update_expiry_unknown_id() {
        let mut store = store();
        let err = store
            .update_expiry(&BatchSelector::Id(42), &ExpiryChange::Days(2))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { id: 42 }));
    }

    #[test]
    fn test_update_expiry_unknown_name_is_zero() {
        let mut store = store();
        let selector = BatchSelector::Name {
            name: "caviar".to_string(),
            mode: SelectionMode::All,
        };
        assert_eq!(
            store
                .update_expiry(&selector, &ExpiryChange::Date("2024-05-01".to_string()))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_update_expiry_modes() {
        let mut store = store();
        for (in_at, exp) in [("2024-01-01", "2024-01-05"), ("2024-01-02", "2024-01-06"), ("2024-01-03", "2024-01-07")] {
            store
                .add(&NewBatch::new("egg", 1.0).in_at(in_at).exp_at(exp))
                .unwrap();
        }
        let by_name = |mode| BatchSelector::Name {
            name: "egg".to_string(),
            mode,
        };

        // Pushes the earliest batch to the end of canonical order.
        store
            .update_expiry(&by_name(SelectionMode::Earliest), &ExpiryChange::Date("2024-02-01".into()))
            .unwrap();
        let exps: Vec<_> = store.list_by_name("egg").unwrap().iter().map(|b| b.exp_at).collect();
        assert_eq!(exps, vec![date(1, 6), date(1, 7), date(2, 1)]);

        store
            .update_expiry(&by_name(SelectionMode::Latest), &ExpiryChange::Days(10))
            .unwrap();
        let latest = store.list_by_name("egg").unwrap().pop().unwrap();
        // The latest batch was stocked on 2024-01-01.
        assert_eq!(latest.exp_at, date(1, 11));

        let n = store
            .update_expiry(&by_name(SelectionMode::All), &ExpiryChange::Days(1))
            .unwrap();
        assert_eq!(n, 3);
        assert!(store
            .list_by_name("egg")
            .unwrap()
            .iter()
            .all(|b| b.exp_at == b.in_at.succ_opt().unwrap()));
    }

    #[test]
    fn test_update_expiry_bad_date_changes_nothing() {
        let mut store = store();
        let batch = store
            .add(&NewBatch::new("milk", 1.0).in_at("2024-01-01").exp_days(3))
            .unwrap();
        let err = store
            .update_expiry(&BatchSelector::Id(batch.id), &ExpiryChange::Date("soonish".into()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDateFormat(_)));
        assert_eq!(store.get(batch.id).unwrap().unwrap(), batch);
    }

    #[test]
    fn test_selection_mode_parse() {
        assert_eq!("Earliest".parse::<SelectionMode>(), Ok(SelectionMode::Earliest));
        assert!("newest".parse::<SelectionMode>().is_err());
        assert_eq!(SelectionMode::default(), SelectionMode::All);
    }
}
