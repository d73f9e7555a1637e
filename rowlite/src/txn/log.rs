// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction log of pending changes
//!
//! The log owns every [`Change`] of the current transaction in append order.
//! Commit runs in two passes so no lock is released before every change is
//! durable. A failed commit escalates to a full rollback. Rollback to a log
//! index walks back from the tail and leaves earlier entries (and their locks)
//! untouched.

use super::change::Change;
use crate::exec::error::ExecutionError;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Pending,
    Committed,
}

#[derive(Debug)]
struct LogEntry {
    change: Box<dyn Change>,
    state: EntryState,
}

/// Summary of a log for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLogStats {
    pub entries: usize,
    pub tables: usize,
}

/// Ordered list of the current transaction's changes
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: Vec<LogEntry>,
}

impl TransactionLog {
    /// Create a new empty transaction log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change that already holds its lock
    pub fn append(&mut self, change: Box<dyn Change>) {
        debug!("Log append #{}: {:?}", self.entries.len(), change);
        self.entries.push(LogEntry {
            change,
            state: EntryState::Pending,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit every change, then release every lock. On the first commit
    /// failure the whole log is rolled back and that error is returned.
    pub fn commit(&mut self) -> Result<(), ExecutionError> {
        let count = self.entries.len();
        for index in 0..count {
            let entry = &mut self.entries[index];
            if let Err(err) = entry.change.commit() {
                warn!("Commit of log entry #{} failed, rolling back: {}", index, err);
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback after failed commit reported: {}", rollback_err);
                }
                return Err(err);
            }
            entry.state = EntryState::Committed;
        }
        for entry in self.entries.drain(..) {
            entry.change.release_lock();
        }
        if count > 0 {
            info!("Committed {} changes", count);
        }
        Ok(())
    }

    /// Roll back every change front to back, releasing each lock. Entries that
    /// already committed are only released. Every lock is released even when
    /// a rollback fails; the first failure is returned.
    pub fn rollback(&mut self) -> Result<(), ExecutionError> {
        let count = self.entries.len();
        let mut first_error = None;
        for entry in self.entries.drain(..) {
            let LogEntry { mut change, state } = entry;
            if state == EntryState::Pending {
                if let Err(err) = change.rollback() {
                    warn!("Rollback of {:?} failed: {}", change, err);
                    first_error.get_or_insert(err);
                }
            }
            change.release_lock();
        }
        if count > 0 {
            info!("Rolled back {} changes", count);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Undo entries at `index` and above, newest first, and truncate
    pub fn rollback_to(&mut self, index: usize) -> Result<(), ExecutionError> {
        let mut first_error = None;
        let mut undone = 0;
        while self.entries.len() > index {
            let Some(LogEntry { mut change, .. }) = self.entries.pop() else {
                break;
            };
            if let Err(err) = change.rollback() {
                warn!("Rollback of {:?} failed: {}", change, err);
                first_error.get_or_insert(err);
            }
            change.release_lock();
            undone += 1;
        }
        if undone > 0 {
            debug!("Rolled back {} changes to log index {}", undone, index);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Roll back and remove every change bound to `table`; other entries keep
    /// their order. Returns the number of removed entries.
    pub fn discard_for_resource(&mut self, table: &str) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.entries.len() {
            if !self.entries[index]
                .change
                .resource()
                .table_name()
                .eq_ignore_ascii_case(table)
            {
                index += 1;
                continue;
            }
            let LogEntry { mut change, .. } = self.entries.remove(index);
            if let Err(err) = change.rollback() {
                warn!("Discarding {:?} failed: {}", change, err);
            }
            change.release_lock();
            removed += 1;
        }
        if removed > 0 {
            debug!("Discarded {} changes bound to {}", removed, table);
        }
        removed
    }

    pub fn stats(&self) -> TransactionLogStats {
        let mut tables: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.change.resource().table_name())
            .collect();
        tables.sort_unstable();
        tables.dedup();
        TransactionLogStats {
            entries: self.entries.len(),
            tables: tables.len(),
        }
    }
}
