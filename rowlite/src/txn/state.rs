// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identities used by transaction bookkeeping
//!
//! A [`ConnectionId`] owns locks and pending row versions; a [`ChangeId`]
//! tags each pending version so it can be rolled back on its own.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Unique identifier for a connection, used as the lock owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random connection id
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn_{}", self.0.simple())
    }
}

static NEXT_CHANGE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a single logged change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeId(u64);

impl ChangeId {
    /// Allocate the next change id (process-wide, monotonic)
    pub fn next() -> Self {
        ChangeId(NEXT_CHANGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "change_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_ids_are_monotonic() {
        let a = ChangeId::next();
        let b = ChangeId::next();
        assert!(b > a);
    }

    #[test]
    fn test_connection_ids_are_distinct() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
        assert!(ConnectionId::new().to_string().starts_with("conn_"));
    }
}
