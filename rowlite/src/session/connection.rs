// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection context
//!
//! Each connection owns one transaction log, guarded together with the
//! isolation level, auto-commit flag, transaction generation and named
//! savepoints by a single mutex. Statement execution, commit, rollback and
//! savepoint operations all run while holding it, so they are serialized per
//! connection. Only lock acquisition waits on other connections.

use crate::config::DatabaseConfig;
use crate::exec::error::ExecutionError;
use crate::session::savepoint::{Savepoint, SavepointMark};
use crate::storage::StorageManager;
use crate::txn::change::{Change, ReadLockChange};
use crate::txn::isolation::{IsolationLevel, IsolationPolicy};
use crate::txn::lock::{LockHandle, LockMode, LockTable, ResourceId};
use crate::txn::log::TransactionLog;
use crate::txn::state::ConnectionId;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mutable per-connection transaction state
#[derive(Debug)]
pub struct ConnectionState {
    /// `None` once the connection is closed
    log: Option<TransactionLog>,
    isolation: IsolationLevel,
    auto_commit: bool,
    /// Advanced whenever a transaction ends
    generation: u64,
    /// Advanced whenever entries are undone inside the transaction
    partial_rollbacks: u64,
    transaction_started: DateTime<Utc>,
    named_savepoints: HashMap<String, SavepointMark>,
    next_savepoint_id: u64,
}

impl ConnectionState {
    fn new(isolation: IsolationLevel, auto_commit: bool) -> Self {
        Self {
            log: Some(TransactionLog::new()),
            isolation,
            auto_commit,
            generation: 0,
            partial_rollbacks: 0,
            transaction_started: Utc::now(),
            named_savepoints: HashMap::new(),
            next_savepoint_id: 1,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.log.is_none()
    }

    fn log_mut(&mut self) -> Result<&mut TransactionLog, ExecutionError> {
        self.log.as_mut().ok_or(ExecutionError::ConnectionClosed)
    }

    fn end_transaction(&mut self) {
        self.generation += 1;
        self.transaction_started = Utc::now();
        self.named_savepoints.clear();
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn commit(&mut self) -> Result<(), ExecutionError> {
        let result = self.log_mut()?.commit();
        self.end_transaction();
        result
    }

    pub fn rollback(&mut self) -> Result<(), ExecutionError> {
        let result = self.log_mut()?.rollback();
        self.end_transaction();
        result
    }

    /// Changing the flag commits the open transaction first
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::ConnectionClosed);
        }
        if auto_commit != self.auto_commit {
            self.commit()?;
            self.auto_commit = auto_commit;
        }
        Ok(())
    }

    pub fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::ConnectionClosed);
        }
        self.isolation = level;
        Ok(())
    }

    pub fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint, ExecutionError> {
        let mark = SavepointMark {
            log_index: self.log_mut()?.len(),
            generation: self.generation,
        };
        let id = self.next_savepoint_id;
        self.next_savepoint_id += 1;
        if let Some(name) = name {
            self.named_savepoints.insert(name.to_ascii_lowercase(), mark);
        }
        Ok(Savepoint::new(id, name.map(str::to_string), mark))
    }

    pub fn rollback_to(&mut self, savepoint: &Savepoint) -> Result<(), ExecutionError> {
        self.rollback_to_mark(savepoint.mark())
    }

    fn rollback_to_mark(&mut self, mark: SavepointMark) -> Result<(), ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::ConnectionClosed);
        }
        if mark.generation != self.generation {
            return Err(ExecutionError::StaleSavepoint);
        }
        self.named_savepoints
            .retain(|_, other| other.log_index <= mark.log_index);
        self.partial_rollbacks += 1;
        self.log_mut()?.rollback_to(mark.log_index)
    }

    pub fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<(), ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::ConnectionClosed);
        }
        if savepoint.generation() != self.generation {
            return Err(ExecutionError::StaleSavepoint);
        }
        if let Some(name) = savepoint.name() {
            self.named_savepoints.remove(&name.to_ascii_lowercase());
        }
        Ok(())
    }

    fn named(&self, name: &str) -> Result<SavepointMark, ExecutionError> {
        self.named_savepoints
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| ExecutionError::SavepointNotFound(name.to_string()))
    }

    pub fn rollback_to_named(&mut self, name: &str) -> Result<(), ExecutionError> {
        let mark = self.named(name)?;
        self.rollback_to_mark(mark)
    }

    pub fn release_named(&mut self, name: &str) -> Result<(), ExecutionError> {
        self.named(name)?;
        self.named_savepoints.remove(&name.to_ascii_lowercase());
        Ok(())
    }

    /// Roll back and mark closed. Closing twice is a no-op.
    fn close(&mut self) -> Result<bool, ExecutionError> {
        match self.log.take() {
            Some(mut log) => {
                let result = log.rollback();
                self.end_transaction();
                result.map(|_| true)
            }
            None => Ok(false),
        }
    }
}

/// One client connection
pub struct ConnectionContext {
    id: ConnectionId,
    storage: Arc<StorageManager>,
    locks: Arc<LockTable>,
    lock_wait: Duration,
    state: Mutex<ConnectionState>,
    open_connections: Arc<AtomicUsize>,
}

impl std::fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("id", &self.id)
            .field("lock_wait", &self.lock_wait)
            .finish()
    }
}

impl ConnectionContext {
    pub(crate) fn new(
        storage: Arc<StorageManager>,
        locks: Arc<LockTable>,
        config: &DatabaseConfig,
        open_connections: Arc<AtomicUsize>,
    ) -> Self {
        open_connections.fetch_add(1, Ordering::SeqCst);
        let id = ConnectionId::new();
        debug!("Opened connection {}", id);
        Self {
            id,
            storage,
            locks,
            lock_wait: config.lock_wait_timeout(),
            state: Mutex::new(ConnectionState::new(
                config.default_isolation,
                config.default_auto_commit,
            )),
            open_connections,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        self.lock_wait
    }

    pub fn commit(&self) -> Result<(), ExecutionError> {
        info!("Connection {} commit", self.id);
        self.state.lock().commit()
    }

    pub fn rollback(&self) -> Result<(), ExecutionError> {
        info!("Connection {} rollback", self.id);
        self.state.lock().rollback()
    }

    /// Create a savepoint at the current end of the log
    pub fn set_savepoint(&self, name: Option<&str>) -> Result<Savepoint, ExecutionError> {
        self.state.lock().set_savepoint(name)
    }

    /// Undo everything logged after `savepoint`; the savepoint stays usable
    pub fn rollback_to(&self, savepoint: &Savepoint) -> Result<(), ExecutionError> {
        self.state.lock().rollback_to(savepoint)
    }

    pub fn release_savepoint(&self, savepoint: Savepoint) -> Result<(), ExecutionError> {
        self.state.lock().release_savepoint(savepoint)
    }

    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<(), ExecutionError> {
        self.state.lock().set_auto_commit(auto_commit)
    }

    pub fn auto_commit(&self) -> bool {
        self.state.lock().auto_commit()
    }

    pub fn set_isolation_level(&self, level: IsolationLevel) -> Result<(), ExecutionError> {
        self.state.lock().set_isolation(level)
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.state.lock().isolation()
    }

    /// Roll back the open transaction and close the connection
    pub fn close(&self) -> Result<(), ExecutionError> {
        let closed = self.state.lock().close();
        if let Ok(true) | Err(_) = closed {
            self.open_connections.fetch_sub(1, Ordering::SeqCst);
            debug!("Closed connection {}", self.id);
        }
        closed.map(|_| ())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    pub fn transaction_started_at(&self) -> DateTime<Utc> {
        self.state.lock().transaction_started
    }

    /// Entries in the transaction log, including held read locks
    pub fn pending_changes(&self) -> usize {
        self.state
            .lock()
            .log
            .as_ref()
            .map(TransactionLog::len)
            .unwrap_or(0)
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation()
    }

    /// Lock the connection state for one operation
    pub(crate) fn scope(&self) -> Result<TransactionScope<'_>, ExecutionError> {
        let state = self.state.lock();
        if state.is_closed() {
            return Err(ExecutionError::ConnectionClosed);
        }
        Ok(TransactionScope {
            connection: self,
            state,
        })
    }
}

impl Drop for ConnectionContext {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("Implicit rollback of connection {} failed: {}", self.id, err);
        }
    }
}

/// Exclusive access to a connection's transaction state for one operation
pub(crate) struct TransactionScope<'a> {
    connection: &'a ConnectionContext,
    state: MutexGuard<'a, ConnectionState>,
}

impl<'a> TransactionScope<'a> {
    pub fn owner(&self) -> ConnectionId {
        self.connection.id
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.connection.storage
    }

    pub fn locks(&self) -> &Arc<LockTable> {
        &self.connection.locks
    }

    pub fn state(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    pub fn policy(&self) -> IsolationPolicy {
        IsolationPolicy::new(self.state.isolation, self.state.auto_commit)
    }

    pub fn auto_commit(&self) -> bool {
        self.state.auto_commit
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Changes whenever locks held for the transaction may have been given back
    pub fn lock_epoch(&self) -> (u64, u64) {
        (self.state.generation, self.state.partial_rollbacks)
    }

    /// Acquire a lock for this connection within the wait budget
    pub fn lock(&self, resource: ResourceId, mode: LockMode) -> Result<LockHandle, ExecutionError> {
        Ok(self
            .connection
            .locks
            .acquire(self.owner(), resource, mode, self.connection.lock_wait)?)
    }

    pub fn release(&self, handle: LockHandle) {
        self.connection.locks.release(handle);
    }

    /// Keep a read lock until the transaction ends
    pub fn hold(&mut self, handle: LockHandle) -> Result<(), ExecutionError> {
        let change = ReadLockChange::new(handle, self.connection.locks.clone());
        self.append(Box::new(change))
    }

    pub fn append(&mut self, change: Box<dyn Change>) -> Result<(), ExecutionError> {
        match self.state.log.as_mut() {
            Some(log) => {
                log.append(change);
                Ok(())
            }
            None => {
                change.release_lock();
                Err(ExecutionError::ConnectionClosed)
            }
        }
    }

    /// Current log length, used as a statement mark
    pub fn mark(&self) -> usize {
        self.state.log.as_ref().map(TransactionLog::len).unwrap_or(0)
    }

    /// Undo everything a failed statement logged after `mark`
    pub fn rollback_to_mark(&mut self, mark: usize) {
        let state = &mut *self.state;
        if let Some(log) = state.log.as_mut() {
            if log.len() > mark {
                state.partial_rollbacks += 1;
            }
            if let Err(err) = log.rollback_to(mark) {
                warn!("Statement rollback failed: {}", err);
            }
        }
    }

    pub fn discard_for_resource(&mut self, table: &str) -> usize {
        self.state.partial_rollbacks += 1;
        self.state
            .log
            .as_mut()
            .map(|log| log.discard_for_resource(table))
            .unwrap_or(0)
    }

    /// Commit when the connection is in auto-commit mode
    pub fn finish_statement(&mut self) -> Result<(), ExecutionError> {
        if self.state.auto_commit && !self.state.is_closed() {
            self.state.commit()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::RowId;

    fn connection(locks: &Arc<LockTable>) -> ConnectionContext {
        ConnectionContext::new(
            Arc::new(StorageManager::new()),
            locks.clone(),
            &DatabaseConfig::default().with_auto_commit(false),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn hold_row(conn: &ConnectionContext, row: u64) {
        let mut scope = conn.scope().unwrap();
        let handle = scope
            .lock(ResourceId::row("t", RowId(row)), LockMode::Shared)
            .unwrap();
        scope.hold(handle).unwrap();
    }

    #[test]
    fn test_commit_advances_generation_and_releases() {
        let locks = Arc::new(LockTable::new());
        let conn = connection(&locks);
        hold_row(&conn, 1);
        assert_eq!(conn.pending_changes(), 1);
        let started = conn.transaction_started_at();

        conn.commit().unwrap();
        assert_eq!(conn.generation(), 1);
        assert_eq!(conn.pending_changes(), 0);
        assert!(locks.is_empty());
        assert!(conn.transaction_started_at() >= started);
    }

    #[test]
    fn test_savepoint_rollback_keeps_earlier_entries() {
        let locks = Arc::new(LockTable::new());
        let conn = connection(&locks);
        hold_row(&conn, 1);
        let sp = conn.set_savepoint(Some("sp")).unwrap();
        hold_row(&conn, 2);
        hold_row(&conn, 3);

        conn.rollback_to(&sp).unwrap();
        assert_eq!(conn.pending_changes(), 1);
        assert_eq!(locks.held_by(conn.id()), 1);

        // Still usable within the same transaction
        hold_row(&conn, 4);
        conn.rollback_to(&sp).unwrap();
        assert_eq!(conn.pending_changes(), 1);
        conn.release_savepoint(sp).unwrap();
    }

    #[test]
    fn test_stale_savepoint_is_rejected() {
        let locks = Arc::new(LockTable::new());
        let conn = connection(&locks);
        let sp = conn.set_savepoint(None).unwrap();
        conn.commit().unwrap();
        hold_row(&conn, 1);

        assert!(matches!(
            conn.rollback_to(&sp),
            Err(ExecutionError::StaleSavepoint)
        ));
        assert_eq!(conn.pending_changes(), 1);
        assert!(matches!(
            conn.release_savepoint(sp),
            Err(ExecutionError::StaleSavepoint)
        ));
    }

    #[test]
    fn test_named_savepoints() {
        let locks = Arc::new(LockTable::new());
        let conn = connection(&locks);
        conn.set_savepoint(Some("A")).unwrap();
        hold_row(&conn, 1);
        {
            let mut scope = conn.scope().unwrap();
            scope.state().rollback_to_named("a").unwrap();
            assert!(matches!(
                scope.state().release_named("missing"),
                Err(ExecutionError::SavepointNotFound(_))
            ));
            scope.state().release_named("a").unwrap();
        }
        assert_eq!(conn.pending_changes(), 0);
    }

    #[test]
    fn test_set_auto_commit_commits_on_change() {
        let locks = Arc::new(LockTable::new());
        let conn = connection(&locks);
        hold_row(&conn, 1);
        conn.set_auto_commit(false).unwrap();
        assert_eq!(conn.pending_changes(), 1);
        conn.set_auto_commit(true).unwrap();
        assert_eq!(conn.pending_changes(), 0);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_close_rolls_back_and_rejects_further_work() {
        let locks = Arc::new(LockTable::new());
        let open = Arc::new(AtomicUsize::new(0));
        let conn = ConnectionContext::new(
            Arc::new(StorageManager::new()),
            locks.clone(),
            &DatabaseConfig::default(),
            open.clone(),
        );
        assert_eq!(open.load(Ordering::SeqCst), 1);
        hold_row(&conn, 1);

        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(locks.is_empty());
        assert_eq!(open.load(Ordering::SeqCst), 0);
        assert!(matches!(conn.commit(), Err(ExecutionError::ConnectionClosed)));
        assert!(matches!(conn.scope(), Err(ExecutionError::ConnectionClosed)));

        drop(conn);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }
}
