// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RowLite SDK - High-level Rust API for RowLite
//!
//! This crate puts a JDBC-style surface on top of RowLite's core API:
//! connections, statements, prepared statements, scrollable and updatable
//! result sets, and transaction guards.
//!
//! # Quick Start
//!
//! ```no_run
//! use rowlite_sdk::{Database, Error};
//!
//! # fn main() -> Result<(), Error> {
//! let db = Database::open_in_memory();
//! let conn = db.connect();
//!
//! let mut stmt = conn.create_statement()?;
//! stmt.execute_update("CREATE TABLE people (id INTEGER PRIMARY KEY, name VARCHAR(40))")?;
//! stmt.execute_update("INSERT INTO people VALUES (1, 'Alice'), (2, 'Bob')")?;
//!
//! let mut rs = stmt.execute_query("SELECT name FROM people ORDER BY id")?;
//! while rs.next()? {
//!     println!("Name: {:?}", rs.get_string("name")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Application Code (Your Rust App)      │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  RowLite SDK (this crate)               │
//! │  - Database / Connection                │
//! │  - Statement / PreparedStatement        │
//! │  - ResultSet (typed access)             │
//! │  - Transaction (RAII guard)             │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  RowLite Core (rowlite crate)           │
//! │  - Command / Cursor                     │
//! │  - Transaction log and lock table       │
//! │  - In-memory storage                    │
//! └─────────────────────────────────────────┘
//! ```

// Re-export core types for convenience
pub use rowlite::{
    Concurrency, CursorPosition, CursorType, DataType, DatabaseConfig, GeneratedKeys,
    IsolationLevel, Savepoint, Value, EXECUTE_FAILED, VERSION,
};

/// Split a script into statements at top-level semicolons
pub use rowlite::ast::split_statements;

// SDK modules
pub mod connection;
pub mod error;
pub mod result;
pub mod statement;
pub mod transaction;

// Re-export main types for convenience
pub use connection::{Connection, Database};
pub use error::{Error, Result};
pub use result::{ColumnIndex, ResultSet};
pub use statement::{PreparedStatement, Statement};
pub use transaction::{DropBehavior, Transaction};
