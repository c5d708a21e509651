//! Applying FIFO depletions: consume and discard.

use fridgeledger_core::{format_date, plan_depletion, ConsumptionOutcome, WasteRecord};
use rusqlite::params;
use tracing::{debug, info, warn};

use crate::batches::select_by_name;
use crate::codec::waste_from_row;
use crate::error::{validate_name, validate_quantity};
use crate::{Result, Store};

/// Why stock is being taken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depletion {
    Consume,
    Discard,
}

impl Depletion {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Consume => "consume",
            Self::Discard => "discard",
        }
    }
}

impl Store {
    /// Eat `quantity` of `name`, earliest-expiring batches first.
    ///
    /// Running short is not an error; the outcome's `unfulfilled` says how
    /// much was missing.
    pub fn consume(&mut self, name: &str, quantity: f64) -> Result<ConsumptionOutcome> {
        self.deplete(name, quantity, Depletion::Consume)
    }

    /// Throw away `quantity` of `name`, earliest-expiring batches first.
    ///
    /// Same walk as [`Store::consume`], plus one waste-log row per batch
    /// touched.
    pub fn discard(&mut self, name: &str, quantity: f64) -> Result<ConsumptionOutcome> {
        self.deplete(name, quantity, Depletion::Discard)
    }

    /// The waste log, oldest first, optionally restricted to one name.
    pub fn waste_log(&self, name: Option<&str>) -> Result<Vec<WasteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, batch_id, name, quantity, unit, exp_at, discarded_at FROM waste_logs
             WHERE ?1 IS NULL OR name = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![name], waste_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn deplete(&mut self, name: &str, requested: f64, kind: Depletion) -> Result<ConsumptionOutcome> {
        validate_name(name)?;
        validate_quantity(requested)?;
        let now = self.now();

        let tx = self.conn.transaction()?;
        let stock = select_by_name(&tx, name)?;
        let outcome = plan_depletion(&stock, requested);

        // `details` is a prefix of `stock`, in the same order.
        for (lot, batch) in outcome.details.iter().zip(&stock) {
            if lot.deleted {
                tx.execute("DELETE FROM inventory WHERE id = ?1", params![batch.id])?;
            } else {
                tx.execute(
                    "UPDATE inventory SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
                    params![batch.quantity - lot.consumed, now, batch.id],
                )?;
            }

            if kind == Depletion::Discard {
                tx.execute(
                    "INSERT INTO waste_logs(batch_id, name, quantity, unit, exp_at, discarded_at)
                     VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        batch.id,
                        batch.name,
                        lot.consumed,
                        batch.unit,
                        format_date(batch.exp_at),
                        now
                    ],
                )?;
            }

            debug!(
                action = kind.as_str(),
                id = batch.id,
                consumed = lot.consumed,
                deleted = lot.deleted,
                "depleted batch"
            );
        }

        tx.commit()?;

        if outcome.is_satisfied() {
            info!(action = kind.as_str(), name, requested, "stock depleted");
        } else {
            warn!(
                action = kind.as_str(),
                name,
                requested,
                unfulfilled = outcome.unfulfilled,
                "not enough stock"
            );
        }
        Ok(outcome)
    }
}
