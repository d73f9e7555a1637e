// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage Manager - catalog of in-memory tables
//!
//! Tables are looked up case-insensitively. Dropping a table removes it from
//! the catalog and marks the shared [`Table`] as dropped, so changes that still
//! reference it fail on commit instead of writing into a detached table.

use crate::storage::table::Table;
use crate::storage::types::{StorageError, TableSchema};
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage manager that owns every table of a database
#[derive(Debug, Default)]
pub struct StorageManager {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

fn catalog_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from a validated schema
    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<Table>, StorageError> {
        schema.validate()?;
        let key = catalog_key(&schema.name);
        let mut tables = self.tables.write();
        if tables.contains_key(&key) {
            return Err(StorageError::TableExists(schema.name));
        }
        info!("Creating table {} ({} columns)", schema.name, schema.columns.len());
        let table = Arc::new(Table::new(schema));
        tables.insert(key, table.clone());
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>, StorageError> {
        self.tables
            .read()
            .get(&catalog_key(name))
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Remove a table from the catalog and mark it dropped
    pub fn drop_table(&self, name: &str) -> Result<Arc<Table>, StorageError> {
        let table = self
            .tables
            .write()
            .remove(&catalog_key(name))
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        table.mark_dropped();
        info!("Dropped table {}", table.name());
        Ok(table)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .values()
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        debug!("Catalog holds {} tables", names.len());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{ColumnDef, DataType};

    fn schema(name: &str) -> TableSchema {
        TableSchema::new(name, vec![ColumnDef::new("a", DataType::Integer)])
    }

    #[test]
    fn test_create_get_drop() {
        let storage = StorageManager::new();
        storage.create_table(schema("Orders")).unwrap();
        assert!(storage.get_table("orders").is_ok());
        assert!(matches!(
            storage.create_table(schema("ORDERS")),
            Err(StorageError::TableExists(_))
        ));

        let dropped = storage.drop_table("orders").unwrap();
        assert!(dropped.is_dropped());
        assert!(matches!(
            storage.get_table("Orders"),
            Err(StorageError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_table_names_sorted() {
        let storage = StorageManager::new();
        storage.create_table(schema("b")).unwrap();
        storage.create_table(schema("a")).unwrap();
        assert_eq!(storage.table_names(), vec!["a", "b"]);
    }
}
