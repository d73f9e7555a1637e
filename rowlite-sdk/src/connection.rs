// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database handle and connections
//!
//! This module provides the main entry points for working with RowLite. It
//! follows the JDBC shape: a [`Database`] hands out [`Connection`]s, and a
//! connection creates statements and controls its transaction.

use crate::error::Result;
use crate::statement::{PreparedStatement, Statement};
use crate::transaction::Transaction;
use log::warn;
use rowlite::{
    Concurrency, ConnectionContext, CursorType, DatabaseConfig, GeneratedKeys, IsolationLevel,
    Savepoint, StatementContext,
};
use std::sync::Arc;

/// Main entry point for RowLite database operations
///
/// The database lives in memory for as long as the handle (or any connection
/// made from it) is alive. Cloning the handle shares the same database.
///
/// # Examples
///
/// ```no_run
/// use rowlite_sdk::Database;
///
/// # fn main() -> Result<(), rowlite_sdk::Error> {
/// let db = Database::open_in_memory();
/// let conn = db.connect();
///
/// let mut stmt = conn.create_statement()?;
/// stmt.execute_update("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<rowlite::Database>,
}

impl Database {
    /// Open an empty in-memory database with the default configuration
    pub fn open_in_memory() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        Database {
            inner: rowlite::Database::new(config),
        }
    }

    /// Open a database configured from the `ROWLITE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(DatabaseConfig::from_env()?))
    }

    /// Open a new connection with the database's default settings
    pub fn connect(&self) -> Connection {
        Connection {
            inner: self.inner.connect(),
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.inner.table_names()
    }

    pub fn open_connection_count(&self) -> usize {
        self.inner.open_connection_count()
    }

    /// Access to the core database for operations the SDK does not cover
    pub fn core(&self) -> &Arc<rowlite::Database> {
        &self.inner
    }
}

/// A connection to a RowLite database
///
/// Each connection has its own transaction, auto-commit flag and isolation
/// level. The connection is closed when dropped; an open transaction is
/// rolled back.
#[derive(Debug)]
pub struct Connection {
    inner: Arc<ConnectionContext>,
}

impl Connection {
    pub fn id(&self) -> String {
        self.inner.id().to_string()
    }

    /// Create a forward-only, read-only statement
    pub fn create_statement(&self) -> Result<Statement> {
        self.create_statement_with(CursorType::ForwardOnly, Concurrency::ReadOnly)
    }

    /// Create a statement whose result sets have the given capabilities
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rowlite_sdk::{Concurrency, CursorType, Database};
    /// # let db = Database::open_in_memory();
    /// # let conn = db.connect();
    /// let mut stmt = conn.create_statement_with(CursorType::ScrollSensitive, Concurrency::Updatable)?;
    /// let mut rs = stmt.execute_query("SELECT * FROM accounts")?;
    /// if rs.last()? {
    ///     rs.update_long("balance", 0)?;
    ///     rs.update_row()?;
    /// }
    /// # Ok::<(), rowlite_sdk::Error>(())
    /// ```
    pub fn create_statement_with(
        &self,
        cursor_type: CursorType,
        concurrency: Concurrency,
    ) -> Result<Statement> {
        self.ensure_open()?;
        Ok(Statement::new(
            self.inner.clone(),
            StatementContext::new(cursor_type, concurrency),
        ))
    }

    /// Prepare a statement with `?` parameters
    pub fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement> {
        self.ensure_open()?;
        PreparedStatement::new(self.inner.clone(), sql, StatementContext::default())
    }

    /// Prepare an insert that reports the generated keys it produced
    pub fn prepare_statement_with_keys(
        &self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<PreparedStatement> {
        self.ensure_open()?;
        PreparedStatement::new(
            self.inner.clone(),
            sql,
            StatementContext::default().with_generated_keys(keys),
        )
    }

    /// Prepare a statement whose result sets have the given capabilities
    pub fn prepare_statement_with(
        &self,
        sql: &str,
        cursor_type: CursorType,
        concurrency: Concurrency,
    ) -> Result<PreparedStatement> {
        self.ensure_open()?;
        PreparedStatement::new(
            self.inner.clone(),
            sql,
            StatementContext::new(cursor_type, concurrency),
        )
    }

    /// Any change of the flag commits the open transaction first
    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        Ok(self.inner.set_auto_commit(auto_commit)?)
    }

    pub fn auto_commit(&self) -> bool {
        self.inner.auto_commit()
    }

    pub fn commit(&self) -> Result<()> {
        Ok(self.inner.commit()?)
    }

    pub fn rollback(&self) -> Result<()> {
        Ok(self.inner.rollback()?)
    }

    /// Mark the current point of the transaction
    pub fn set_savepoint(&self, name: Option<&str>) -> Result<Savepoint> {
        Ok(self.inner.set_savepoint(name)?)
    }

    /// Undo everything done after `savepoint`; the savepoint stays usable
    pub fn rollback_to(&self, savepoint: &Savepoint) -> Result<()> {
        Ok(self.inner.rollback_to(savepoint)?)
    }

    pub fn release_savepoint(&self, savepoint: Savepoint) -> Result<()> {
        Ok(self.inner.release_savepoint(savepoint)?)
    }

    pub fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<()> {
        Ok(self.inner.set_isolation_level(level)?)
    }

    pub fn transaction_isolation(&self) -> IsolationLevel {
        self.inner.isolation_level()
    }

    /// Number of changes in the open transaction
    pub fn pending_changes(&self) -> usize {
        self.inner.pending_changes()
    }

    /// Begin a transaction guard
    ///
    /// Auto-commit is switched off for the lifetime of the guard and restored
    /// afterwards. The guard rolls back when dropped unless committed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rowlite_sdk::Database;
    /// # let db = Database::open_in_memory();
    /// # let conn = db.connect();
    /// let tx = conn.transaction()?;
    /// tx.execute("UPDATE accounts SET balance = balance - 10 WHERE id = 1")?;
    /// tx.execute("UPDATE accounts SET balance = balance + 10 WHERE id = 2")?;
    /// tx.commit()?;
    /// # Ok::<(), rowlite_sdk::Error>(())
    /// ```
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self)
    }

    /// Close the connection, rolling back an open transaction
    pub fn close(&self) -> Result<()> {
        Ok(self.inner.close()?)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(rowlite::ExecutionError::ConnectionClosed.into());
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.inner.is_closed() {
            return;
        }
        if let Err(e) = self.inner.close() {
            warn!("Failed to close connection {} on drop: {}", self.inner.id(), e);
        }
    }
}
