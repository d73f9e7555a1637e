// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logged changes
//!
//! A [`Change`] is one reversible unit of work that already holds its lock
//! when it is appended to a transaction log. The log drives it through
//! `commit` or `rollback` and finally `release_lock`, which consumes the
//! boxed change so the lock can only be given back once.

use crate::exec::error::ExecutionError;
use crate::storage::table::Table;
use crate::storage::types::RowId;
use crate::txn::lock::{LockHandle, LockTable, ResourceId};
use crate::txn::state::{ChangeId, ConnectionId};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// A reversible unit of work owned by a transaction log
pub trait Change: Send + fmt::Debug {
    /// The locked resource this change is bound to
    fn resource(&self) -> &ResourceId;

    /// Make the change durable. Must be idempotent.
    fn commit(&mut self) -> Result<(), ExecutionError>;

    /// Undo exactly this change, independent of other changes on the same row
    fn rollback(&mut self) -> Result<(), ExecutionError>;

    /// Give the lock back
    fn release_lock(self: Box<Self>);
}

/// Kind of row modification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEdit {
    Insert,
    Update,
    Delete,
}

/// A staged row version plus the exclusive row lock protecting it
pub struct RowChange {
    id: ChangeId,
    edit: RowEdit,
    owner: ConnectionId,
    table: Arc<Table>,
    row_id: RowId,
    lock: LockHandle,
    locks: Arc<LockTable>,
}

impl RowChange {
    pub fn new(
        id: ChangeId,
        edit: RowEdit,
        table: Arc<Table>,
        row_id: RowId,
        lock: LockHandle,
        locks: Arc<LockTable>,
    ) -> Self {
        Self {
            id,
            edit,
            owner: lock.owner(),
            table,
            row_id,
            lock,
            locks,
        }
    }

    pub fn edit(&self) -> RowEdit {
        self.edit
    }

    pub fn row_id(&self) -> RowId {
        self.row_id
    }
}

impl fmt::Debug for RowChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowChange")
            .field("id", &self.id)
            .field("edit", &self.edit)
            .field("table", &self.table.name())
            .field("row_id", &self.row_id)
            .finish()
    }
}

impl Change for RowChange {
    fn resource(&self) -> &ResourceId {
        self.lock.resource()
    }

    fn commit(&mut self) -> Result<(), ExecutionError> {
        debug!("Committing {:?} {} of {}", self.edit, self.row_id, self.table.name());
        self.table.commit_row(self.owner, self.row_id)?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ExecutionError> {
        debug!("Rolling back {:?} {} of {}", self.edit, self.row_id, self.table.name());
        self.table.rollback_row(self.owner, self.row_id, self.id);
        Ok(())
    }

    fn release_lock(self: Box<Self>) {
        let RowChange { lock, locks, .. } = *self;
        locks.release(lock);
    }
}

/// A read lock held until the transaction ends; commit and rollback do nothing
pub struct ReadLockChange {
    lock: LockHandle,
    locks: Arc<LockTable>,
}

impl ReadLockChange {
    pub fn new(lock: LockHandle, locks: Arc<LockTable>) -> Self {
        Self { lock, locks }
    }
}

impl fmt::Debug for ReadLockChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadLockChange")
            .field("resource", self.lock.resource())
            .field("mode", &self.lock.mode())
            .finish()
    }
}

impl Change for ReadLockChange {
    fn resource(&self) -> &ResourceId {
        self.lock.resource()
    }

    fn commit(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn release_lock(self: Box<Self>) {
        let ReadLockChange { lock, locks } = *self;
        locks.release(lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{ColumnDef, DataType, TableSchema};
    use crate::storage::value::Value;
    use crate::storage::RowRead;
    use crate::txn::lock::LockMode;

    #[test]
    fn test_row_change_lifecycle() {
        let locks = Arc::new(LockTable::new());
        let table = Arc::new(Table::new(TableSchema::new(
            "t",
            vec![ColumnDef::new("a", DataType::Integer)],
        )));
        let owner = ConnectionId::new();
        let row_id = table.allocate_row_id();
        let lock = locks
            .try_acquire(owner, ResourceId::row("t", row_id), LockMode::Exclusive)
            .unwrap();
        let id = ChangeId::next();
        table
            .stage_insert(owner, id, row_id, vec![Value::Integer(1)])
            .unwrap();

        let mut change: Box<dyn Change> = Box::new(RowChange::new(
            id,
            RowEdit::Insert,
            table.clone(),
            row_id,
            lock,
            locks.clone(),
        ));
        assert_eq!(change.resource().table_name(), "t");
        change.commit().unwrap();
        change.commit().unwrap();
        change.release_lock();

        assert!(locks.is_empty());
        assert!(matches!(
            table.visible_row(row_id, ConnectionId::new(), false),
            RowRead::Row(_)
        ));
    }

    #[test]
    fn test_read_lock_change_releases() {
        let locks = Arc::new(LockTable::new());
        let owner = ConnectionId::new();
        let lock = locks
            .try_acquire(owner, ResourceId::schema("t"), LockMode::Shared)
            .unwrap();
        let mut change: Box<dyn Change> = Box::new(ReadLockChange::new(lock, locks.clone()));
        change.rollback().unwrap();
        change.release_lock();
        assert!(locks.is_empty());
    }
}
