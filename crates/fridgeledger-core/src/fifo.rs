//! FIFO depletion of batches.
//!
//! Consumption and discard share one greedy walk: batches are visited in
//! canonical order (earliest expiry first) and each is either emptied
//! completely or reduced by whatever is still owed. The walk stops as soon
//! as nothing is owed, so batches after the stopping point are never
//! inspected.
//!
//! [`plan_depletion`] only computes the outcome. Applying it (deleting and
//! updating rows) is the store's job, which relies on the fact that
//! `outcome.details` is a prefix of the input slice, in the same order.

use serde::{Deserialize, Serialize};

use crate::{Batch, BatchId};

/// Tolerance for treating a batch as fully consumed.
///
/// A batch holding `0.30000000000000004` when `0.3` is requested is
/// deleted rather than left with a dust remainder.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// What happened to one batch during a depletion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumedLot {
    /// The batch touched.
    pub batch_id: BatchId,
    /// Quantity taken from it.
    pub consumed: f64,
    /// Whether the batch was emptied and removed.
    pub deleted: bool,
}

/// Result of a consume or discard request.
///
/// A shortfall is not an error: it is reported through `unfulfilled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionOutcome {
    /// Quantity asked for.
    pub requested: f64,
    /// Quantity that could not be taken from stock (zero when satisfied).
    pub unfulfilled: f64,
    /// Touched batches, in the order they were visited.
    pub details: Vec<ConsumedLot>,
}

impl ConsumptionOutcome {
    /// Total quantity actually taken from stock.
    #[must_use]
    pub fn fulfilled(&self) -> f64 {
        self.details.iter().map(|lot| lot.consumed).sum()
    }

    /// Whether the full request was covered.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.unfulfilled <= 0.0
    }

    /// Ids of batches that were emptied.
    pub fn deleted_ids(&self) -> impl Iterator<Item = BatchId> + '_ {
        self.details
            .iter()
            .filter(|lot| lot.deleted)
            .map(|lot| lot.batch_id)
    }
}

/// Walk `batches` oldest-expiry-first and take `requested` from them.
///
/// `batches` must already be in canonical order and all belong to the same
/// item; the walk never reorders or looks ahead. A non-positive
/// `requested` touches nothing.
///
/// A visited batch is deleted when its quantity is within
/// [`QUANTITY_EPSILON`] of what is still owed (or less); the recorded
/// consumption is then the batch's full quantity. Otherwise the batch is
/// reduced by the amount still owed and the walk ends.
#[must_use]
pub fn plan_depletion(batches: &[Batch], requested: f64) -> ConsumptionOutcome {
    debug_assert!(
        batches.windows(2).all(|w| w[0].canonical_key() <= w[1].canonical_key()),
        "batches must be in canonical order"
    );

    let mut remaining = requested;
    let mut details = Vec::new();

    for batch in batches {
        if remaining <= 0.0 {
            break;
        }

        if batch.quantity <= remaining + QUANTITY_EPSILON {
            details.push(ConsumedLot {
                batch_id: batch.id,
                consumed: batch.quantity,
                deleted: true,
            });
            remaining -= batch.quantity;
        } else {
            details.push(ConsumedLot {
                batch_id: batch.id,
                consumed: remaining,
                deleted: false,
            });
            remaining = 0.0;
        }
    }

    ConsumptionOutcome {
        requested,
        unfulfilled: remaining.max(0.0),
        details,
    }
}
