// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Process-wide lock table
//!
//! Resources form a small hierarchy per table:
//!
//! ```text
//! Schema(t)        structure of t (DDL vs. readers that pin the layout)
//! Table(t)         all rows of t
//! Row(t, id)       one row slot
//! ```
//!
//! Shared/shared is compatible across owners, exclusive conflicts with
//! everything held by another owner. A row request also checks the table
//! scope: an exclusive row lock waits for another owner's shared table lock,
//! and any row lock waits for another owner's exclusive table lock. A table
//! request checks the rows of other owners the same way.
//!
//! Requests by the owner that already holds the resource are granted, except
//! an exclusive request on a `Schema` or `Table` scope the owner holds shared.
//! Such a self-conflict could never be resolved by waiting and fails at once.
//!
//! Waiting is bounded by the caller's budget; on expiry nothing is granted.

use crate::storage::types::RowId;
use crate::txn::state::ConnectionId;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lock modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    fn compatible_with(self, other: LockMode) -> bool {
        self == LockMode::Shared && other == LockMode::Shared
    }
}

/// Scope inside one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockScope {
    Schema,
    Table,
    Row(RowId),
}

/// A lockable resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    table: String,
    scope: LockScope,
}

impl ResourceId {
    pub fn schema(table: &str) -> Self {
        Self::new(table, LockScope::Schema)
    }

    pub fn table(table: &str) -> Self {
        Self::new(table, LockScope::Table)
    }

    pub fn row(table: &str, row_id: RowId) -> Self {
        Self::new(table, LockScope::Row(row_id))
    }

    fn new(table: &str, scope: LockScope) -> Self {
        Self {
            table: table.to_ascii_lowercase(),
            scope,
        }
    }

    /// Lower-cased table name this resource belongs to
    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn scope(&self) -> LockScope {
        self.scope
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            LockScope::Schema => write!(f, "schema of {}", self.table),
            LockScope::Table => write!(f, "table {}", self.table),
            LockScope::Row(id) => write!(f, "row {} of {}", id, self.table),
        }
    }
}

/// Lock acquisition errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockError {
    #[error("Lock timeout: {resource} is held by another connection (waited {waited_ms} ms)")]
    Timeout { resource: String, waited_ms: u64 },

    #[error("Self-conflict: {resource} is already locked shared by this connection")]
    SelfConflict { resource: String },
}

/// Proof of a granted lock. Not clonable; [`LockTable::release`] consumes it.
#[derive(Debug)]
pub struct LockHandle {
    id: u64,
    owner: ConnectionId,
    resource: ResourceId,
    mode: LockMode,
}

impl LockHandle {
    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

#[derive(Debug, Clone, Copy)]
struct Grant {
    id: u64,
    owner: ConnectionId,
    mode: LockMode,
}

#[derive(Debug, Default)]
struct TableLocks {
    schema: Vec<Grant>,
    table: Vec<Grant>,
    rows: HashMap<RowId, Vec<Grant>>,
}

impl TableLocks {
    fn is_empty(&self) -> bool {
        self.schema.is_empty() && self.table.is_empty() && self.rows.is_empty()
    }

    fn grants_mut(&mut self, scope: LockScope) -> &mut Vec<Grant> {
        match scope {
            LockScope::Schema => &mut self.schema,
            LockScope::Table => &mut self.table,
            LockScope::Row(id) => self.rows.entry(id).or_default(),
        }
    }

    fn conflict(&self, owner: ConnectionId, scope: LockScope, mode: LockMode) -> Conflict {
        let direct: &[Grant] = match scope {
            LockScope::Schema => &self.schema,
            LockScope::Table => &self.table,
            LockScope::Row(id) => self.rows.get(&id).map(Vec::as_slice).unwrap_or(&[]),
        };

        let mut blocker = None;
        for grant in direct.iter().filter(|g| !g.mode.compatible_with(mode)) {
            if grant.owner != owner {
                blocker.get_or_insert(grant.owner);
            } else if mode == LockMode::Exclusive
                && grant.mode == LockMode::Shared
                && !matches!(scope, LockScope::Row(_))
            {
                return Conflict::SelfConflict;
            }
        }
        if let Some(owner) = blocker {
            return Conflict::Blocked(owner);
        }

        let foreign = |grant: &&Grant| grant.owner != owner && !grant.mode.compatible_with(mode);
        let hierarchical = match scope {
            LockScope::Schema => None,
            LockScope::Row(_) => self.table.iter().find(foreign),
            LockScope::Table => self.rows.values().flatten().find(foreign),
        };
        match hierarchical {
            Some(grant) => Conflict::Blocked(grant.owner),
            None => Conflict::None,
        }
    }
}

enum Conflict {
    None,
    SelfConflict,
    Blocked(ConnectionId),
}

/// The lock table shared by every connection of a database
#[derive(Debug, Default)]
pub struct LockTable {
    tables: Mutex<HashMap<String, TableLocks>>,
    released: Condvar,
    next_id: AtomicU64,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `resource` in `mode`, waiting at most `timeout` for other
    /// owners to release conflicting locks.
    pub fn acquire(
        &self,
        owner: ConnectionId,
        resource: ResourceId,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<LockHandle, LockError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut tables = self.tables.lock();
        loop {
            let conflict = tables
                .get(&resource.table)
                .map(|locks| locks.conflict(owner, resource.scope, mode))
                .unwrap_or(Conflict::None);

            match conflict {
                Conflict::None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    tables
                        .entry(resource.table.clone())
                        .or_default()
                        .grants_mut(resource.scope)
                        .push(Grant { id, owner, mode });
                    debug!("{} granted {:?} lock on {}", owner, mode, resource);
                    return Ok(LockHandle {
                        id,
                        owner,
                        resource,
                        mode,
                    });
                }
                Conflict::SelfConflict => {
                    debug!("{} self-conflict on {}", owner, resource);
                    return Err(LockError::SelfConflict {
                        resource: resource.to_string(),
                    });
                }
                Conflict::Blocked(blocker) => {
                    if Instant::now() >= deadline {
                        let waited_ms = started.elapsed().as_millis() as u64;
                        warn!(
                            "{} timed out after {} ms waiting for {:?} lock on {} held by {}",
                            owner, waited_ms, mode, resource, blocker
                        );
                        return Err(LockError::Timeout {
                            resource: resource.to_string(),
                            waited_ms,
                        });
                    }
                    debug!("{} waits for {} on {}", owner, blocker, resource);
                    self.released.wait_until(&mut tables, deadline);
                }
            }
        }
    }

    /// Acquire without waiting
    pub fn try_acquire(
        &self,
        owner: ConnectionId,
        resource: ResourceId,
        mode: LockMode,
    ) -> Result<LockHandle, LockError> {
        self.acquire(owner, resource, mode, Duration::ZERO)
    }

    /// Release a granted lock and wake waiters
    pub fn release(&self, handle: LockHandle) {
        let mut tables = self.tables.lock();
        if let Some(locks) = tables.get_mut(&handle.resource.table) {
            let grants = locks.grants_mut(handle.resource.scope);
            grants.retain(|g| g.id != handle.id);
            if let LockScope::Row(row_id) = handle.resource.scope {
                if locks.rows.get(&row_id).is_some_and(Vec::is_empty) {
                    locks.rows.remove(&row_id);
                }
            }
            if locks.is_empty() {
                tables.remove(&handle.resource.table);
            }
        }
        drop(tables);
        debug!("{} released {:?} lock on {}", handle.owner, handle.mode, handle.resource);
        self.released.notify_all();
    }

    /// Number of grants currently held by `owner`
    pub fn held_by(&self, owner: ConnectionId) -> usize {
        self.tables
            .lock()
            .values()
            .map(|locks| {
                locks
                    .schema
                    .iter()
                    .chain(locks.table.iter())
                    .chain(locks.rows.values().flatten())
                    .filter(|g| g.owner == owner)
                    .count()
            })
            .sum()
    }

    /// Total number of grants
    pub fn len(&self) -> usize {
        self.tables
            .lock()
            .values()
            .map(|locks| {
                locks.schema.len()
                    + locks.table.len()
                    + locks.rows.values().map(Vec::len).sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }
}
