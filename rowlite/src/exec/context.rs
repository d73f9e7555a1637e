// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution context: what kind of result a statement should produce

use serde::{Deserialize, Serialize};

/// Scrolling capability of a result cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorType {
    /// Only `next()` is supported
    #[default]
    ForwardOnly,
    /// Every positioning call; rows are re-read when positioned on
    ScrollSensitive,
}

/// Whether a result cursor may modify the rows it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Which generated values an insert should report back
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeneratedKeys {
    #[default]
    None,
    /// Identity columns, falling back to the primary key, then every column
    Auto,
    ColumnNames(Vec<String>),
    /// One-based column positions
    ColumnIndexes(Vec<usize>),
}

impl GeneratedKeys {
    pub fn is_requested(&self) -> bool {
        !matches!(self, GeneratedKeys::None)
    }
}

/// Options a statement is executed with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatementContext {
    pub cursor_type: CursorType,
    pub concurrency: Concurrency,
    pub generated_keys: GeneratedKeys,
}

impl StatementContext {
    pub fn new(cursor_type: CursorType, concurrency: Concurrency) -> Self {
        Self {
            cursor_type,
            concurrency,
            generated_keys: GeneratedKeys::None,
        }
    }

    pub fn scrollable_updatable() -> Self {
        Self::new(CursorType::ScrollSensitive, Concurrency::Updatable)
    }

    pub fn with_generated_keys(mut self, keys: GeneratedKeys) -> Self {
        self.generated_keys = keys;
        self
    }
}
