// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management
//!
//! # Components
//! - [`lock::LockTable`]: process-wide shared/exclusive locks on schema, table
//!   and row resources with bounded waits
//! - [`change::Change`]: one reversible unit of work holding its lock
//! - [`log::TransactionLog`]: ordered changes of one connection with the
//!   two-pass commit and the rollback protocols
//! - [`isolation::IsolationPolicy`]: read-lock duration and granularity per
//!   isolation level

pub mod change;
pub mod isolation;
pub mod lock;
pub mod log;
pub mod state;

pub use change::{Change, ReadLockChange, RowChange, RowEdit};
pub use isolation::{IsolationLevel, IsolationPolicy, ReadGranularity, ReadLockDuration};
pub use lock::{LockError, LockHandle, LockMode, LockScope, LockTable, ResourceId};
pub use log::{TransactionLog, TransactionLogStats};
pub use state::{ChangeId, ConnectionId};
