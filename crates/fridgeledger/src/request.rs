//! Typed request/response surface over the ledger.
//!
//! A [`Request`] is the JSON payload an agent tool sends, tagged by
//! `"action"`:
//!
//! ```json
//! {"action": "consume", "name": "milk", "quantity": 2.5}
//! ```
//!
//! [`execute`] runs one request against a [`Store`] and returns a
//! [`Response`]; [`Reply`] wraps either outcome in the `"status"` envelope
//! callers print.

use chrono::NaiveDate;
use fridgeledger_core::{
    Batch, BatchId, BatchStatus, ConsumptionOutcome, NewBatch, ShelfLifeDefault, WasteRecord,
};
use fridgeledger_store::{
    BatchSelector, ErrorKind, ExpiryChange, LedgerError, SelectionMode, Store,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One ledger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Stock a new batch.
    Add(NewBatch),
    /// Eat some of an item, earliest expiry first.
    Consume {
        /// Item name.
        name: String,
        /// Amount to take out.
        quantity: f64,
    },
    /// Throw some of an item away, earliest expiry first.
    Discard {
        /// Item name.
        name: String,
        /// Amount to take out.
        quantity: f64,
    },
    /// Every batch with its days remaining.
    Query,
    /// Batches expiring between today and `n_days` from now.
    Expiring {
        /// Window length in days.
        n_days: i64,
    },
    /// Change a name's shelf-life default and recompute inferred expiries.
    SetShelfLife {
        /// Item name.
        name: String,
        /// New shelf life in days.
        exp_days: u32,
    },
    /// Correct the expiry of one batch or of some batches of a name.
    UpdateExpiry(UpdateExpiry),
    /// The discard log.
    Waste {
        /// Restrict to one item name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// All registered shelf-life defaults.
    ShelfLives,
}

/// Payload of [`Request::UpdateExpiry`].
///
/// `id` wins over `name`, and `exp_days` wins over `exp_at`, when both
/// are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateExpiry {
    /// A single batch to correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BatchId>,
    /// Item name whose batches to correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Which of the name's batches to correct.
    #[serde(default)]
    pub mode: SelectionMode,
    /// New expiry, in days after each batch's arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_days: Option<i64>,
    /// New expiry, as a date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_at: Option<String>,
}

impl UpdateExpiry {
    /// Resolve the target and new expiry, rejecting incomplete payloads.
    pub fn resolve(&self) -> Result<(BatchSelector, ExpiryChange), LedgerError> {
        let selector = match (self.id, &self.name) {
            (Some(id), _) => BatchSelector::Id(id),
            (None, Some(name)) => BatchSelector::Name {
                name: name.clone(),
                mode: self.mode,
            },
            (None, None) => {
                return Err(LedgerError::InvalidArgument(
                    "update_expiry needs an id or a name".to_string(),
                ))
            }
        };

        let change = match (self.exp_days, &self.exp_at) {
            (Some(days), _) => ExpiryChange::Days(days),
            (None, Some(date)) => ExpiryChange::Date(date.clone()),
            (None, None) => {
                return Err(LedgerError::InvalidArgument(
                    "update_expiry needs exp_days or exp_at".to_string(),
                ))
            }
        };

        Ok((selector, change))
    }
}

impl Request {
    /// Decode a JSON request.
    ///
    /// Unknown actions and missing or mistyped fields are
    /// [`LedgerError::InvalidArgument`].
    pub fn from_json(text: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(text)
            .map_err(|e| LedgerError::InvalidArgument(format!("malformed request: {e}")))
    }

    /// The action name, as it appears in the `"action"` field.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Consume { .. } => "consume",
            Self::Discard { .. } => "discard",
            Self::Query => "query",
            Self::Expiring { .. } => "expiring",
            Self::SetShelfLife { .. } => "set_shelf_life",
            Self::UpdateExpiry(_) => "update_expiry",
            Self::Waste { .. } => "waste",
            Self::ShelfLives => "shelf_lives",
        }
    }
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// The stored batch, for `add`.
    Added(Batch),
    /// What a `consume` or `discard` took out.
    Depleted {
        /// Per-batch breakdown.
        result: ConsumptionOutcome,
    },
    /// Every batch with its days remaining, for `query`.
    Stock {
        /// Batches in canonical order.
        items: Vec<BatchStatus>,
    },
    /// Batches inside the window, for `expiring`.
    Expiring {
        /// Batches in canonical order.
        items: Vec<Batch>,
    },
    /// How many batches a `set_shelf_life` or `update_expiry` changed.
    Updated {
        /// Number of batches rewritten.
        updated_item_count: usize,
    },
    /// The discard log.
    Waste {
        /// Waste records, oldest first.
        records: Vec<WasteRecord>,
    },
    /// Registered shelf-life defaults.
    ShelfLives {
        /// Defaults ordered by name.
        defaults: Vec<ShelfLifeDefault>,
    },
}

/// Run one request. `today` anchors `query` and `expiring`.
pub fn execute(
    store: &mut Store,
    request: Request,
    today: NaiveDate,
) -> Result<Response, LedgerError> {
    debug!(action = request.action(), "executing request");

    let response = match request {
        Request::Add(new) => Response::Added(store.add(&new)?),
        Request::Consume { name, quantity } => Response::Depleted {
            result: store.consume(&name, quantity)?,
        },
        Request::Discard { name, quantity } => Response::Depleted {
            result: store.discard(&name, quantity)?,
        },
        Request::Query => Response::Stock {
            items: store.query(today)?,
        },
        Request::Expiring { n_days } => Response::Expiring {
            items: store.expiring_within(today, n_days)?,
        },
        Request::SetShelfLife { name, exp_days } => Response::Updated {
            updated_item_count: store.set_shelf_life(&name, exp_days)?,
        },
        Request::UpdateExpiry(update) => {
            let (selector, change) = update.resolve()?;
            Response::Updated {
                updated_item_count: store.update_expiry(&selector, &change)?,
            }
        }
        Request::Waste { name } => Response::Waste {
            records: store.waste_log(name.as_deref())?,
        },
        Request::ShelfLives => Response::ShelfLives {
            defaults: store.list_shelf_lives()?,
        },
    };

    Ok(response)
}

/// A [`Response`] or an error, in the `"status"` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    /// The request succeeded.
    Ok(Response),
    /// The request failed and changed nothing.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
}

impl Reply {
    /// Whether this reply reports success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl From<Result<Response, LedgerError>> for Reply {
    fn from(result: Result<Response, LedgerError>) -> Self {
        match result {
            Ok(response) => Self::Ok(response),
            Err(e) => Self::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
