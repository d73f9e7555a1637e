// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution engine
//!
//! This module provides:
//! - Prepared [`Command`]s with parameter binding and batch execution
//! - The executor that runs DDL, DML and queries under the connection's locks
//! - Scrollable, updatable result [`Cursor`]s over re-readable row sources
//! - Expression evaluation with SQL three-valued logic

pub mod batch;
pub mod command;
pub mod context;
pub mod cursor;
pub(crate) mod dml;
pub mod error;
pub(crate) mod executor;
pub mod expr;
pub mod row_source;

pub use batch::{BatchUpdateError, EXECUTE_FAILED};
pub use command::Command;
pub use context::{Concurrency, CursorType, GeneratedKeys, StatementContext};
pub use cursor::{Cursor, CursorPosition, RowState};
pub use error::ExecutionError;
pub use row_source::ColumnInfo;
