// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory row storage
//!
//! This module provides:
//! - Value type system for table cells
//! - Table schemas and column types with coercion
//! - Tables whose row slots carry committed and pending versions
//! - The storage manager catalog

pub mod storage_manager;
pub mod table;
pub mod types;
pub mod value;

pub use storage_manager::StorageManager;
pub use table::{RowRead, Table};
pub use types::{ColumnDef, DataType, Row, RowId, StorageError, TableSchema};
pub use value::Value;
