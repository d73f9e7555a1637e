// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the RowLite SDK
//!
//! Every error can report the SQLSTATE and vendor code of the failure it
//! wraps, so callers can branch on `"01000"` or `"HY010"` without matching
//! on the core error variants.

use rowlite::exec::error::SQLSTATE_GENERAL;
use rowlite::{BatchUpdateError, ConfigError, ExecutionError};
use thiserror::Error;

/// Errors surfaced by the SDK
#[derive(Debug, Error)]
pub enum Error {
    /// A statement, cursor or connection operation failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// One or more items of a batch failed; the others kept their effects
    #[error(transparent)]
    Batch(#[from] BatchUpdateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A column value could not be converted to the requested Rust type
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl Error {
    pub fn sql_state(&self) -> &'static str {
        match self {
            Error::Execution(err) => err.sql_state(),
            Error::Batch(err) => err.sql_state(),
            _ => SQLSTATE_GENERAL,
        }
    }

    pub fn vendor_code(&self) -> i32 {
        match self {
            Error::Execution(err) => err.vendor_code(),
            _ => 0,
        }
    }

    /// Per-item update counts of a failed batch
    pub fn update_counts(&self) -> Option<&[i64]> {
        match self {
            Error::Batch(err) => Some(err.update_counts()),
            _ => None,
        }
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Error::Execution(err) if err.is_lock_timeout())
    }
}

/// Result type used throughout the SDK
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_state_passthrough() {
        let err: Error = ExecutionError::ConnectionClosed.into();
        assert_eq!(err.sql_state(), "HY010");
        assert_eq!(err.vendor_code(), 0);
        assert!(err.update_counts().is_none());

        let err = Error::TypeConversion("'x' is not an integer".into());
        assert_eq!(err.sql_state(), "01000");
        assert!(!err.is_lock_timeout());
    }
}
