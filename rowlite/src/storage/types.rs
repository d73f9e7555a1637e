// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Core storage types: schemas, columns, row identities and storage errors

use crate::storage::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error types for storage operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table was dropped: {0}")]
    TableDropped(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Column already exists: {table}.{column}")]
    ColumnExists { table: String, column: String },

    #[error("Row not found: {table} row {row_id}")]
    RowNotFound { table: String, row_id: RowId },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Stable identity of a row slot inside one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One stored row, in schema column order
pub type Row = Vec<Value>;

/// Declared column types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    BigInt,
    Double,
    Varchar(Option<u32>),
    Boolean,
}

impl DataType {
    /// Resolve a SQL type name (case-insensitive)
    pub fn from_sql_name(name: &str, length: Option<u32>) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "SMALLINT" | "TINYINT" | "COUNTER" => Some(DataType::Integer),
            "BIGINT" | "LONG" => Some(DataType::BigInt),
            "DOUBLE" | "FLOAT" | "REAL" | "DECIMAL" | "NUMERIC" => Some(DataType::Double),
            "VARCHAR" | "CHAR" | "TEXT" | "NVARCHAR" | "NCHAR" | "STRING" => {
                Some(DataType::Varchar(length))
            }
            "BOOLEAN" | "BOOL" | "BIT" => Some(DataType::Boolean),
            _ => None,
        }
    }

    /// Apply this type to a value. NULL passes through unchanged.
    pub fn coerce(&self, value: Value) -> Result<Value, StorageError> {
        if value.is_null() {
            return Ok(value);
        }
        let mismatch = |value: &Value| {
            StorageError::TypeMismatch(format!(
                "cannot convert {} '{}' to {}",
                value.type_name(),
                value,
                self
            ))
        };
        match self {
            DataType::Integer => {
                let n = value.as_integer().ok_or_else(|| mismatch(&value))?;
                if i32::try_from(n).is_err() {
                    return Err(StorageError::TypeMismatch(format!(
                        "value {} out of range for INTEGER",
                        n
                    )));
                }
                Ok(Value::Integer(n))
            }
            DataType::BigInt => value
                .as_integer()
                .map(Value::Integer)
                .ok_or_else(|| mismatch(&value)),
            DataType::Double => value
                .as_double()
                .map(Value::Double)
                .ok_or_else(|| mismatch(&value)),
            DataType::Boolean => value
                .as_boolean()
                .map(Value::Boolean)
                .ok_or_else(|| mismatch(&value)),
            DataType::Varchar(limit) => {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                if let Some(limit) = limit {
                    if text.chars().count() > *limit as usize {
                        return Err(StorageError::TypeMismatch(format!(
                            "string of length {} exceeds VARCHAR({})",
                            text.chars().count(),
                            limit
                        )));
                    }
                }
                Ok(Value::String(text))
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    /// Auto-increment column, filled from the table's identity counter
    pub identity: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            identity: false,
            primary_key: false,
            unique: false,
            not_null: false,
        }
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Values in this column must be distinct among live rows
    pub fn is_unique_key(&self) -> bool {
        self.primary_key || self.unique
    }
}

/// Table layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Like [`column_index`](Self::column_index) but reports a storage error
    pub fn require_column(&self, name: &str) -> Result<usize, StorageError> {
        self.column_index(name)
            .ok_or_else(|| StorageError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn identity_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.identity)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn primary_key_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    /// Check the layout itself: distinct names and at most one primary key
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.columns.is_empty() {
            return Err(StorageError::InvalidOperation(format!(
                "table {} must have at least one column",
                self.name
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(StorageError::ColumnExists {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        if self.primary_key_columns().len() > 1 {
            return Err(StorageError::ConstraintViolation(format!(
                "table {} declares more than one primary key",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_applies_column_type() {
        assert_eq!(
            DataType::Integer.coerce(Value::from("12")).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            DataType::Double.coerce(Value::Integer(3)).unwrap(),
            Value::Double(3.0)
        );
        assert_eq!(
            DataType::Varchar(None).coerce(Value::Integer(5)).unwrap(),
            Value::from("5")
        );
        assert_eq!(DataType::Integer.coerce(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_coerce_rejects_bad_values() {
        assert!(DataType::Integer.coerce(Value::from("abc")).is_err());
        assert!(DataType::Integer.coerce(Value::Integer(i64::MAX)).is_err());
        assert!(DataType::Varchar(Some(2)).coerce(Value::from("abc")).is_err());
    }

    #[test]
    fn test_schema_validation() {
        let schema = TableSchema::new(
            "t",
            vec![
                ColumnDef::new("a", DataType::Integer).primary_key(),
                ColumnDef::new("b", DataType::Integer).primary_key(),
            ],
        );
        assert!(matches!(
            schema.validate(),
            Err(StorageError::ConstraintViolation(_))
        ));

        let schema = TableSchema::new(
            "t",
            vec![
                ColumnDef::new("a", DataType::Integer),
                ColumnDef::new("A", DataType::Double),
            ],
        );
        assert!(matches!(
            schema.validate(),
            Err(StorageError::ColumnExists { .. })
        ));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::from_sql_name("varchar", Some(10)), Some(DataType::Varchar(Some(10))));
        assert_eq!(DataType::from_sql_name("COUNTER", None), Some(DataType::Integer));
        assert_eq!(DataType::from_sql_name("blob", None), None);
    }
}
