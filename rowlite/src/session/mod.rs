// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection contexts and savepoints

pub mod connection;
pub mod savepoint;

pub use connection::{ConnectionContext, ConnectionState};
pub use savepoint::Savepoint;
