//! Shelf-life default table.
//!
//! Changing a default cascades to every batch of that name whose expiry
//! was inferred from the default. Batches with a user-set expiry are left
//! alone.

use fridgeledger_core::{format_date, ShelfLifeDefault};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::batches::expiry_after;
use crate::codec::{date_column, shelf_life_from_row};
use crate::error::validate_name;
use crate::{LedgerError, Result, Store, MAX_SHELF_LIFE_DAYS};

const UPSERT_DEFAULT: &str = "
    INSERT INTO shelf_life_defaults(name, days, created_at, updated_at)
    VALUES(?1, ?2, ?3, ?3)
    ON CONFLICT(name) DO UPDATE SET days = excluded.days, updated_at = excluded.updated_at
";

pub(crate) fn select_default_days(conn: &Connection, name: &str) -> rusqlite::Result<Option<u32>> {
    conn.query_row(
        "SELECT days FROM shelf_life_defaults WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

pub(crate) fn upsert_default(
    conn: &Connection,
    name: &str,
    days: u32,
    now: &str,
) -> rusqlite::Result<()> {
    conn.execute(UPSERT_DEFAULT, params![name, days, now])?;
    Ok(())
}

pub(crate) fn validate_days(days: u32) -> Result<u32> {
    if days == 0 || days > MAX_SHELF_LIFE_DAYS {
        return Err(LedgerError::invalid(format!(
            "shelf life must be between 1 and {MAX_SHELF_LIFE_DAYS} days, got {days}"
        )));
    }
    Ok(days)
}

impl Store {
    /// Default shelf life registered for `name`, if any.
    pub fn default_days(&self, name: &str) -> Result<Option<u32>> {
        Ok(select_default_days(&self.conn, name)?)
    }

    /// The full default record for `name`, if any.
    pub fn shelf_life(&self, name: &str) -> Result<Option<ShelfLifeDefault>> {
        let record = self
            .conn
            .query_row(
                "SELECT name, days, created_at, updated_at FROM shelf_life_defaults WHERE name = ?1",
                params![name],
                shelf_life_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// All registered defaults, ordered by name.
    pub fn list_shelf_lives(&self) -> Result<Vec<ShelfLifeDefault>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, days, created_at, updated_at FROM shelf_life_defaults ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], shelf_life_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Insert or overwrite the default for `name` without touching batches.
    ///
    /// Repeating the same call only moves `updated_at`.
    pub fn upsert_default_days(&mut self, name: &str, days: u32) -> Result<()> {
        validate_name(name)?;
        validate_days(days)?;
        upsert_default(&self.conn, name, days, &self.now())?;
        Ok(())
    }

    /// Set the default for `name` and recompute every default-sourced batch.
    ///
    /// Each batch of `name` with `exp_source = default` gets
    /// `exp_at = in_at + days` and a new `updated_at`. Returns the number of
    /// batches recalculated. Both steps commit together or not at all.
    pub fn set_shelf_life(&mut self, name: &str, days: u32) -> Result<usize> {
        validate_name(name)?;
        validate_days(days)?;
        let now = self.now();

        let tx = self.conn.transaction()?;
        upsert_default(&tx, name, days, &now)?;

        let targets: Vec<(i64, chrono::NaiveDate)> = {
            let mut stmt = tx.prepare(
                "SELECT id, in_at FROM inventory WHERE name = ?1 AND exp_source = 'default' ORDER BY id",
            )?;
            let rows = stmt.query_map(params![name], |row| Ok((row.get(0)?, date_column(row, 1)?)))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        for (id, in_at) in &targets {
            let exp_at = expiry_after(*in_at, i64::from(days))?;
            debug!(id, %in_at, %exp_at, "recalculating default expiry");
            tx.execute(
                "UPDATE inventory SET exp_at = ?1, updated_at = ?2 WHERE id = ?3",
                params![format_date(exp_at), now, id],
            )?;
        }

        tx.commit()?;
        info!(name, days, updated = targets.len(), "shelf life set");
        Ok(targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fridgeledger_core::Tz;

    fn store() -> Store {
        Store::open_in_memory(Tz::Asia__Shanghai).unwrap()
    }

    #[test]
    fn test_default_days_absent() {
        assert_eq!(store().default_days("milk").unwrap(), None);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut store = store();
        store.upsert_default_days("milk", 5).unwrap();
        store.upsert_default_days("milk", 9).unwrap();
        assert_eq!(store.default_days("milk").unwrap(), Some(9));
        assert_eq!(store.list_shelf_lives().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_repeat_keeps_created_at() {
        let mut store = store();
        store.upsert_default_days("milk", 5).unwrap();
        let first = store.shelf_life("milk").unwrap().unwrap();
        store.upsert_default_days("milk", 5).unwrap();
        let second = store.shelf_life("milk").unwrap().unwrap();

        assert_eq!(first.name, second.name);
        assert_eq!(first.days, second.days);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn test_days_beyond_max_rejected() {
        let mut store = store();
        store.upsert_default_days("salt", MAX_SHELF_LIFE_DAYS).unwrap();
        assert!(matches!(
            store.upsert_default_days("honey", MAX_SHELF_LIFE_DAYS + 1),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.set_shelf_life("honey", u32::MAX),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.default_days("honey").unwrap(), None);
        assert!(Store::open_in_memory(Tz::Asia__Shanghai)
            .unwrap()
            .with_fallback_shelf_life(MAX_SHELF_LIFE_DAYS + 1)
            .is_err());
    }

    #[test]
    fn test_zero_days_rejected() {
        let mut store = store();
        assert!(matches!(
            store.upsert_default_days("milk", 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.set_shelf_life("milk", 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.default_days("milk").unwrap(), None);
    }

    #[test]
    fn test_set_shelf_life_without_batches() {
        let mut store = store();
        assert_eq!(store.set_shelf_life("cheese", 30).unwrap(), 0);
        assert_eq!(store.default_days("cheese").unwrap(), Some(30));
    }

    #[test]
    fn test_list_sorted_by_name() {
        let mut store = store();
        store.upsert_default_days("yogurt", 14).unwrap();
        store.upsert_default_days("butter", 60).unwrap();
        let names: Vec<_> = store
            .list_shelf_lives()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["butter", "yogurt"]);
    }
}
