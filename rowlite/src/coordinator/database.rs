// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database - shared storage, lock table and connection bookkeeping

use crate::config::DatabaseConfig;
use crate::session::connection::ConnectionContext;
use crate::storage::StorageManager;
use crate::txn::lock::LockTable;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An embedded in-memory database
///
/// Every connection opened from the same `Database` sees the same tables and
/// contends on the same lock table.
pub struct Database {
    config: DatabaseConfig,
    storage: Arc<StorageManager>,
    locks: Arc<LockTable>,
    open_connections: Arc<AtomicUsize>,
}

impl Database {
    /// Create a database with the given configuration
    ///
    /// # Example
    /// ```no_run
    /// use rowlite::{Command, Database, DatabaseConfig, StatementContext};
    ///
    /// let db = Database::new(DatabaseConfig::default());
    /// let conn = db.connect();
    ///
    /// let mut create = Command::prepare("CREATE TABLE t (id INTEGER PRIMARY KEY)")
    ///     .expect("Failed to parse statement");
    /// create
    ///     .execute(&conn, &StatementContext::default())
    ///     .expect("Failed to create table");
    /// ```
    pub fn new(config: DatabaseConfig) -> Arc<Self> {
        info!(
            "Opening database (lock wait {} ms, isolation {}, auto-commit {})",
            config.lock_wait_timeout_ms,
            config.default_isolation.as_str(),
            config.default_auto_commit
        );
        Arc::new(Self {
            config,
            storage: Arc::new(StorageManager::new()),
            locks: Arc::new(LockTable::new()),
            open_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a database with default settings
    pub fn in_memory() -> Arc<Self> {
        Self::new(DatabaseConfig::default())
    }

    /// Open a new connection with the configured isolation and auto-commit
    pub fn connect(&self) -> Arc<ConnectionContext> {
        Arc::new(ConnectionContext::new(
            self.storage.clone(),
            self.locks.clone(),
            &self.config,
            self.open_connections.clone(),
        ))
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.locks
    }

    /// Connections opened and not yet closed
    pub fn open_connection_count(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.storage.table_names()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("tables", &self.storage.table_names().len())
            .field("open_connections", &self.open_connection_count())
            .finish()
    }
}
