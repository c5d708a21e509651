//! Schema creation and legacy-date normalization.

use fridgeledger_core::{format_date, parse_date, Tz};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::validate_date;
use crate::Result;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS shelf_life_defaults(
        name TEXT PRIMARY KEY,
        days INTEGER NOT NULL CHECK(days > 0),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS inventory(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        quantity REAL NOT NULL CHECK(quantity >= 0),
        unit TEXT,
        in_at TEXT NOT NULL,
        exp_at TEXT NOT NULL,
        exp_source TEXT NOT NULL CHECK(exp_source IN ('user','default')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_inventory_name ON inventory(name);
    CREATE INDEX IF NOT EXISTS idx_inventory_exp ON inventory(exp_at);

    CREATE TABLE IF NOT EXISTS waste_logs(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        batch_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        quantity REAL NOT NULL CHECK(quantity >= 0),
        unit TEXT,
        exp_at TEXT NOT NULL,
        discarded_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_waste_logs_name ON waste_logs(name);
";

/// Rows whose dates still carry a time part or any non-canonical shape.
const LEGACY_ROWS: &str = "
    SELECT id, in_at, exp_at FROM inventory
    WHERE length(in_at) != 10 OR length(exp_at) != 10
       OR instr(in_at, 'T') > 0 OR instr(exp_at, 'T') > 0
       OR instr(in_at, ' ') > 0 OR instr(exp_at, ' ') > 0
";

pub(crate) fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub(crate) fn normalize_legacy_dates(conn: &mut Connection, tz: Tz) -> Result<usize> {
    let tx = conn.transaction()?;

    let rows: Vec<(i64, String, String)> = {
        let mut stmt = tx.prepare(LEGACY_ROWS)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    for (id, in_at, exp_at) in &rows {
        let new_in = format_date(validate_date(parse_date(in_at, tz)?)?);
        let new_exp = format_date(validate_date(parse_date(exp_at, tz)?)?);
        debug!(id, %in_at, %exp_at, %new_in, %new_exp, "normalizing legacy dates");
        tx.execute(
            "UPDATE inventory SET in_at = ?1, exp_at = ?2 WHERE id = ?3",
            params![new_in, new_exp, id],
        )?;
    }

    tx.commit()?;
    Ok(rows.len())
}
