//! Ledger errors.

use chrono::NaiveDate;
use fridgeledger_core::{in_storage_range, BatchId, InvalidDateFormat};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by ledger operations.
///
/// Arguments are validated before anything is written, and every mutating
/// operation runs in a single transaction, so an error never leaves a
/// partial change behind.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A required field is missing, empty, negative or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Date text could not be parsed by any stage of the normalizer.
    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDateFormat),

    /// An update targeted a batch id that does not exist.
    #[error("batch {id} not found")]
    NotFound {
        /// The missing batch id.
        id: BatchId,
    },

    /// The database rejected or failed an operation.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The directory holding the database could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The error category reported to callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidDateFormat(_) => ErrorKind::InvalidDateFormat,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) | Self::CreateDirectory { .. } => ErrorKind::StorageFailure,
        }
    }
}

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`LedgerError::InvalidArgument`].
    InvalidArgument,
    /// See [`LedgerError::InvalidDateFormat`].
    InvalidDateFormat,
    /// See [`LedgerError::NotFound`].
    NotFound,
    /// Any persistence problem.
    StorageFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidDateFormat => "invalid_date_format",
            Self::NotFound => "not_found",
            Self::StorageFailure => "storage_failure",
        };
        f.write_str(s)
    }
}

/// Result alias for ledger operations.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

pub(crate) fn validate_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(LedgerError::invalid("name must not be empty"));
    }
    Ok(name)
}

pub(crate) fn validate_date(date: NaiveDate) -> Result<NaiveDate> {
    if !in_storage_range(date) {
        return Err(LedgerError::invalid(format!(
            "date {date} is outside years 0000-9999"
        )));
    }
    Ok(date)
}

pub(crate) fn validate_quantity(quantity: f64) -> Result<f64> {
    if !quantity.is_finite() {
        return Err(LedgerError::invalid(format!(
            "quantity must be a finite number, got {quantity}"
        )));
    }
    if quantity < 0.0 {
        return Err(LedgerError::invalid(format!(
            "quantity must not be negative, got {quantity}"
        )));
    }
    Ok(quantity)
}
