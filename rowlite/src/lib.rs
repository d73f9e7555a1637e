// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RowLite - An embedded, transactional SQL engine
//!
//! RowLite runs in-process and keeps its tables in memory. Many connections
//! can work on the same database concurrently; a process-wide lock table and
//! per-connection transaction logs keep what each of them sees consistent
//! with its isolation level.
//!
//! # Features
//!
//! - **Transactions**: atomic commit and rollback, savepoints, auto-commit
//! - **Isolation Levels**: READ UNCOMMITTED through SERIALIZABLE
//! - **Locking**: shared/exclusive locks on schemas, tables and rows with a
//!   bounded wait
//! - **Cursors**: scrollable, updatable result sets that re-read their rows
//! - **Batches**: independent execution of many parameter sets
//!
//! # Usage
//!
//! ```no_run
//! use rowlite::{Command, Database, StatementContext};
//!
//! let db = Database::in_memory();
//! let conn = db.connect();
//! let ctx = StatementContext::default();
//!
//! Command::prepare("CREATE TABLE t (id INTEGER, name VARCHAR(20))")?
//!     .execute(&conn, &ctx)?;
//! Command::prepare("INSERT INTO t VALUES (1, 'one')")?.execute(&conn, &ctx)?;
//!
//! let mut query = Command::prepare("SELECT name FROM t WHERE id = ?")?;
//! query.bind_parameter(1, 1.into(), None)?;
//! query.execute(&conn, &ctx)?;
//! if let Some(cursor) = query.result_cursor() {
//!     while cursor.next()? {
//!         println!("{}", cursor.get(1)?);
//!     }
//! }
//! # Ok::<(), rowlite::ExecutionError>(())
//! ```

pub mod config;
pub mod coordinator;

pub mod ast;
pub mod exec;
pub mod session;
pub mod storage;
pub mod txn;

pub use config::{ConfigError, DatabaseConfig};
pub use coordinator::Database;
pub use exec::{
    BatchUpdateError, ColumnInfo, Command, Concurrency, Cursor, CursorPosition, CursorType,
    ExecutionError, GeneratedKeys, RowState, StatementContext, EXECUTE_FAILED,
};
pub use session::{ConnectionContext, Savepoint};
pub use storage::{DataType, Value};
pub use txn::IsolationLevel;

/// RowLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RowLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
