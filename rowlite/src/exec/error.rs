// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types
//!
//! Every error maps to a SQLSTATE: `HY010` for operations on a closed
//! statement or connection, `01000` for everything else. The vendor code is
//! always `0`.

use crate::exec::batch::BatchUpdateError;
use crate::storage::StorageError;
use crate::txn::lock::LockError;
use thiserror::Error;

/// General warning, used for every recoverable engine error
pub const SQLSTATE_GENERAL: &str = "01000";

/// Function sequence error: the statement or connection is closed
pub const SQLSTATE_FUNCTION_SEQUENCE: &str = "HY010";

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Expression evaluation error: {0}")]
    ExpressionError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Lock timeout: {resource} is held by another connection (waited {waited_ms} ms)")]
    LockTimeout { resource: String, waited_ms: u64 },

    #[error("Lock conflict with own connection: {0} is already locked shared")]
    SelfConflict(String),

    #[error("Savepoint is not valid in the current transaction")]
    StaleSavepoint,

    #[error("Savepoint not found: {0}")]
    SavepointNotFound(String),

    #[error("No current row")]
    NoCurrentRow,

    #[error("Row was deleted: {0}")]
    RowDeleted(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Result set is not updatable")]
    NotUpdatable,

    #[error("Result set is no longer valid: {0}")]
    CursorInvalidated(String),

    #[error("Result set is closed")]
    ResultSetClosed,

    #[error("Generated keys were not requested")]
    GeneratedKeysNotRequested,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Statement is closed")]
    StatementClosed,

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("{0}")]
    BatchUpdate(Box<BatchUpdateError>),
}

impl ExecutionError {
    /// Five-character SQLSTATE class for this error
    pub fn sql_state(&self) -> &'static str {
        match self {
            ExecutionError::StatementClosed | ExecutionError::ConnectionClosed => {
                SQLSTATE_FUNCTION_SEQUENCE
            }
            _ => SQLSTATE_GENERAL,
        }
    }

    /// Vendor-specific error code; the engine does not define any
    pub fn vendor_code(&self) -> i32 {
        0
    }

    /// Whether the error came from waiting on another connection's lock
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, ExecutionError::LockTimeout { .. })
    }
}

impl From<StorageError> for ExecutionError {
    fn from(error: StorageError) -> Self {
        ExecutionError::StorageError(error.to_string())
    }
}

impl From<LockError> for ExecutionError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Timeout {
                resource,
                waited_ms,
            } => ExecutionError::LockTimeout {
                resource,
                waited_ms,
            },
            LockError::SelfConflict { resource } => ExecutionError::SelfConflict(resource),
        }
    }
}

impl From<BatchUpdateError> for ExecutionError {
    fn from(error: BatchUpdateError) -> Self {
        ExecutionError::BatchUpdate(Box::new(error))
    }
}
