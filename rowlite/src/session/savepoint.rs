// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Savepoints
//!
//! A savepoint remembers a transaction log position together with the
//! connection's transaction generation. Once the transaction ends the
//! generation moves on and the savepoint can no longer be used.

use std::fmt;

/// Log position and generation a savepoint refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SavepointMark {
    pub log_index: usize,
    pub generation: u64,
}

/// A point inside the current transaction that can be rolled back to
#[derive(Debug, PartialEq, Eq)]
pub struct Savepoint {
    id: u64,
    name: Option<String>,
    mark: SavepointMark,
}

impl Savepoint {
    pub(crate) fn new(id: u64, name: Option<String>, mark: SavepointMark) -> Self {
        Self { id, name, mark }
    }

    /// Connection-local id of the savepoint
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of log entries that survive a rollback to this savepoint
    pub fn log_index(&self) -> usize {
        self.mark.log_index
    }

    pub fn generation(&self) -> u64 {
        self.mark.generation
    }

    pub(crate) fn mark(&self) -> SavepointMark {
        self.mark
    }
}

impl fmt::Display for Savepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "savepoint {}", name),
            None => write!(f, "savepoint #{}", self.id),
        }
    }
}
