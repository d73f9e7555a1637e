// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database coordinator - the entry point that owns shared engine state
//!
//! The [`Database`] owns the table catalog and the process-wide lock table and
//! hands out connections that share them.

pub mod database;

pub use database::Database;
