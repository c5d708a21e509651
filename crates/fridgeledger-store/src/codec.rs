//! Row decoding.
//!
//! Dates are stored as `YYYY-MM-DD` text and timestamps as RFC 3339 text.
//! Values that fail to decode surface as
//! [`rusqlite::Error::FromSqlConversionFailure`] for the offending column.

use chrono::{DateTime, FixedOffset, NaiveDate};
use fridgeledger_core::date::DATE_FORMAT;
use fridgeledger_core::{Batch, ExpSource, ShelfLifeDefault, WasteRecord};
use rusqlite::types::Type;
use rusqlite::Row;

/// Column list matching [`batch_from_row`].
pub(crate) const BATCH_COLUMNS: &str =
    "id, name, quantity, unit, in_at, exp_at, exp_source, created_at, updated_at";

/// Canonical ledger order.
pub(crate) const CANONICAL_ORDER: &str = "ORDER BY exp_at ASC, in_at ASC, id ASC";

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<DateTime<FixedOffset>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text).map_err(|e| conversion_error(idx, e))
}

fn source_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ExpSource> {
    let text: String = row.get(idx)?;
    text.parse::<ExpSource>().map_err(|message| {
        conversion_error(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, message),
        )
    })
}

pub(crate) fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        id: row.get(0)?,
        name: row.get(1)?,
        quantity: row.get(2)?,
        unit: row.get(3)?,
        in_at: date_column(row, 4)?,
        exp_at: date_column(row, 5)?,
        exp_source: source_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
    })
}

pub(crate) fn shelf_life_from_row(row: &Row<'_>) -> rusqlite::Result<ShelfLifeDefault> {
    Ok(ShelfLifeDefault {
        name: row.get(0)?,
        days: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
        updated_at: timestamp_column(row, 3)?,
    })
}

pub(crate) fn waste_from_row(row: &Row<'_>) -> rusqlite::Result<WasteRecord> {
    Ok(WasteRecord {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        exp_at: date_column(row, 5)?,
        discarded_at: timestamp_column(row, 6)?,
    })
}
