// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction guard
//!
//! This module provides transaction support following the rusqlite pattern:
//! - Transactions automatically roll back when dropped (unless committed)
//! - RAII ensures no forgotten rollbacks
//! - Explicit commit() required to persist changes

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::result::ResultSet;
use crate::statement::PreparedStatement;
use log::{debug, warn};
use rowlite::Savepoint;

/// An open transaction on a [`Connection`]
///
/// Beginning a transaction switches the connection's auto-commit off; it is
/// restored once the transaction is finished.
///
/// # Examples
///
/// ```no_run
/// # use rowlite_sdk::Database;
/// # let db = Database::open_in_memory();
/// # let conn = db.connect();
/// // Transaction with explicit commit
/// let tx = conn.transaction()?;
/// tx.execute("INSERT INTO t VALUES (1)")?;
/// tx.commit()?;
///
/// // Transaction that rolls back (dropped without commit)
/// {
///     let tx = conn.transaction()?;
///     tx.execute("INSERT INTO t VALUES (2)")?;
/// }
/// # Ok::<(), rowlite_sdk::Error>(())
/// ```
pub struct Transaction<'conn> {
    connection: &'conn Connection,
    restore_auto_commit: bool,
    finished: bool,
    drop_behavior: DropBehavior,
}

/// Behavior when a transaction is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropBehavior {
    /// Rollback the transaction when dropped (default)
    Rollback,
    /// Commit the transaction when dropped
    Commit,
    /// Panic if the transaction is dropped without explicit commit/rollback
    Panic,
    /// Leave the transaction open on the connection
    Ignore,
}

impl<'conn> Transaction<'conn> {
    pub(crate) fn begin(connection: &'conn Connection) -> Result<Self> {
        if connection.pending_changes() > 0 {
            return Err(Error::Transaction(
                "connection already has an open transaction".to_string(),
            ));
        }
        let restore_auto_commit = connection.auto_commit();
        connection.set_auto_commit(false)?;
        debug!("Transaction started on connection {}", connection.id());
        Ok(Transaction {
            connection,
            restore_auto_commit,
            finished: false,
            drop_behavior: DropBehavior::Rollback,
        })
    }

    /// Execute DML or DDL inside the transaction
    pub fn execute(&self, sql: &str) -> Result<i64> {
        self.connection.create_statement()?.execute_update(sql)
    }

    /// Run a query inside the transaction
    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        self.connection.create_statement()?.execute_query(sql)
    }

    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        self.connection.prepare_statement(sql)
    }

    pub fn savepoint(&self, name: Option<&str>) -> Result<Savepoint> {
        self.connection.set_savepoint(name)
    }

    pub fn rollback_to(&self, savepoint: &Savepoint) -> Result<()> {
        self.connection.rollback_to(savepoint)
    }

    pub fn connection(&self) -> &Connection {
        self.connection
    }

    pub fn set_drop_behavior(&mut self, behavior: DropBehavior) {
        self.drop_behavior = behavior;
    }

    pub fn drop_behavior(&self) -> DropBehavior {
        self.drop_behavior
    }

    pub fn commit(mut self) -> Result<()> {
        self.finish(true)
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finish(false)
    }

    fn finish(&mut self, commit: bool) -> Result<()> {
        if self.finished {
            return Err(Error::Transaction("Transaction already finished".to_string()));
        }
        self.finished = true;
        if commit {
            self.connection.commit()?;
        } else {
            self.connection.rollback()?;
        }
        if self.restore_auto_commit {
            self.connection.set_auto_commit(true)?;
        }
        Ok(())
    }
}

impl<'conn> Drop for Transaction<'conn> {
    fn drop(&mut self) {
        if self.finished || self.connection.is_closed() {
            return;
        }
        match self.drop_behavior {
            DropBehavior::Rollback => {
                if let Err(e) = self.finish(false) {
                    warn!("Failed to rollback transaction on drop: {}", e);
                }
            }
            DropBehavior::Commit => {
                if let Err(e) = self.finish(true) {
                    warn!("Failed to commit transaction on drop: {}", e);
                }
            }
            DropBehavior::Panic => {
                if !std::thread::panicking() {
                    panic!("Transaction dropped without explicit commit or rollback");
                }
            }
            DropBehavior::Ignore => {}
        }
    }
}
