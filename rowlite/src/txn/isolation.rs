// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction isolation level management
//!
//! This module defines isolation levels and the read-locking policy each one
//! implies for statements and cursor fetches.

use serde::{Deserialize, Serialize};

/// Transaction isolation levels as defined in SQL standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// READ UNCOMMITTED - Allows dirty reads, non-repeatable reads, and phantom reads
    ReadUncommitted,
    /// READ COMMITTED - Prevents dirty reads, but allows non-repeatable reads and phantom reads
    ReadCommitted,
    /// REPEATABLE READ - Prevents dirty reads and non-repeatable reads, but allows phantom reads
    RepeatableRead,
    /// SERIALIZABLE - Prevents dirty reads, non-repeatable reads, and phantom reads
    Serializable,
}

impl IsolationLevel {
    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    /// Readers see rows other connections have not committed
    pub fn allows_dirty_reads(&self) -> bool {
        matches!(self, IsolationLevel::ReadUncommitted)
    }

    /// A row read twice may change in between; read locks end with the row
    pub fn allows_non_repeatable_reads(&self) -> bool {
        self.allows_dirty_reads() || matches!(self, IsolationLevel::ReadCommitted)
    }

    /// Rows may appear between two scans; only row locks are taken
    pub fn allows_phantom_reads(&self) -> bool {
        !matches!(self, IsolationLevel::Serializable)
    }
}

impl Default for IsolationLevel {
    /// The default isolation level for new connections
    fn default() -> Self {
        IsolationLevel::ReadCommitted
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" | "READ-UNCOMMITTED" => {
                Ok(IsolationLevel::ReadUncommitted)
            }
            "READ COMMITTED" | "READ_COMMITTED" | "READ-COMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLE-READ" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(format!("Unknown isolation level: {}", s)),
        }
    }
}

/// How long read locks live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLockDuration {
    /// No read locks at all
    None,
    /// Acquired while a row is produced and released right after
    Transient,
    /// Kept in the transaction log until commit or rollback
    Transaction,
}

/// What a reader locks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadGranularity {
    Row,
    Table,
}

/// Read-locking rules derived from an isolation level and the auto-commit flag
///
/// In auto-commit mode each statement is its own transaction, so locks that
/// would otherwise be held to transaction end only last for the statement and
/// later cursor fetches fall back to transient locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationPolicy {
    level: IsolationLevel,
    auto_commit: bool,
}

impl IsolationPolicy {
    pub fn new(level: IsolationLevel, auto_commit: bool) -> Self {
        Self { level, auto_commit }
    }

    pub fn level(&self) -> IsolationLevel {
        self.level
    }

    /// Readers see the newest version of every row, committed or not
    pub fn dirty_reads(&self) -> bool {
        self.level.allows_dirty_reads()
    }

    /// Lock duration while a statement executes
    pub fn statement_locks(&self) -> ReadLockDuration {
        if self.level.allows_dirty_reads() {
            ReadLockDuration::None
        } else if self.level.allows_non_repeatable_reads() {
            ReadLockDuration::Transient
        } else {
            ReadLockDuration::Transaction
        }
    }

    /// Lock duration for cursor fetches after the statement returned
    pub fn fetch_locks(&self) -> ReadLockDuration {
        match self.statement_locks() {
            ReadLockDuration::Transaction if self.auto_commit => ReadLockDuration::Transient,
            other => other,
        }
    }

    pub fn granularity(&self) -> ReadGranularity {
        if self.level.allows_phantom_reads() {
            ReadGranularity::Row
        } else {
            ReadGranularity::Table
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_properties() {
        assert!(IsolationLevel::ReadUncommitted.allows_dirty_reads());
        assert!(!IsolationLevel::ReadCommitted.allows_dirty_reads());

        assert!(IsolationLevel::ReadCommitted.allows_non_repeatable_reads());
        assert!(!IsolationLevel::RepeatableRead.allows_non_repeatable_reads());

        assert!(IsolationLevel::RepeatableRead.allows_phantom_reads());
        assert!(!IsolationLevel::Serializable.allows_phantom_reads());
    }

    #[test]
    fn test_isolation_level_parsing() {
        assert_eq!(
            "READ COMMITTED".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "serializable".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
    }

    #[test]
    fn test_policy_follows_level_anomalies() {
        for level in [
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ] {
            let policy = IsolationPolicy::new(level, false);
            assert_eq!(
                policy.statement_locks() == ReadLockDuration::Transaction,
                !level.allows_non_repeatable_reads()
            );
            assert_eq!(
                policy.granularity() == ReadGranularity::Table,
                !level.allows_phantom_reads()
            );
        }
    }

    #[test]
    fn test_policy_lock_durations() {
        let rc = IsolationPolicy::new(IsolationLevel::ReadCommitted, false);
        assert_eq!(rc.statement_locks(), ReadLockDuration::Transient);
        assert_eq!(rc.fetch_locks(), ReadLockDuration::Transient);

        let rr = IsolationPolicy::new(IsolationLevel::RepeatableRead, false);
        assert_eq!(rr.fetch_locks(), ReadLockDuration::Transaction);
        assert_eq!(rr.granularity(), ReadGranularity::Row);

        let rr_auto = IsolationPolicy::new(IsolationLevel::RepeatableRead, true);
        assert_eq!(rr_auto.statement_locks(), ReadLockDuration::Transaction);
        assert_eq!(rr_auto.fetch_locks(), ReadLockDuration::Transient);

        let ser = IsolationPolicy::new(IsolationLevel::Serializable, false);
        assert_eq!(ser.granularity(), ReadGranularity::Table);

        let ru = IsolationPolicy::new(IsolationLevel::ReadUncommitted, false);
        assert!(ru.dirty_reads());
        assert_eq!(ru.statement_locks(), ReadLockDuration::None);
    }
}
