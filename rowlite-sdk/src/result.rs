// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result sets with typed access
//!
//! [`ResultSet`] wraps a core cursor and adds typed getters and updaters that
//! take a column either by 1-based index or by label, plus serde
//! deserialization of whole rows.

use crate::error::{Error, Result};
use rowlite::{ColumnInfo, Cursor, CursorPosition, CursorType, Value};
use serde::de::DeserializeOwned;
use std::cell::Cell;

/// A column reference: 1-based index or column label
pub trait ColumnIndex {
    fn column_index(&self, cursor: &Cursor) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn column_index(&self, _cursor: &Cursor) -> Result<usize> {
        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn column_index(&self, cursor: &Cursor) -> Result<usize> {
        Ok(cursor.find_column(self)?)
    }
}

impl ColumnIndex for String {
    fn column_index(&self, cursor: &Cursor) -> Result<usize> {
        Ok(cursor.find_column(self)?)
    }
}

/// Rows of a query, read through a positioned cursor
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
/// # use rowlite_sdk::Database;
///
/// #[derive(Deserialize)]
/// struct Account {
///     id: i64,
///     balance: Option<i64>,
/// }
///
/// # fn main() -> Result<(), rowlite_sdk::Error> {
/// # let db = Database::open_in_memory();
/// # let conn = db.connect();
/// let mut stmt = conn.create_statement()?;
/// let mut rs = stmt.execute_query("SELECT id, balance FROM accounts")?;
/// while rs.next()? {
///     let account: Account = rs.deserialize_row()?;
///     println!("{} -> {:?}", account.id, account.balance);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResultSet {
    cursor: Cursor,
    was_null: Cell<bool>,
}

impl ResultSet {
    pub(crate) fn new(cursor: Cursor) -> Self {
        ResultSet {
            cursor,
            was_null: Cell::new(false),
        }
    }

    /// The underlying core cursor
    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    // Navigation

    pub fn next(&mut self) -> Result<bool> {
        Ok(self.cursor.next()?)
    }

    pub fn previous(&mut self) -> Result<bool> {
        Ok(self.cursor.previous()?)
    }

    pub fn first(&mut self) -> Result<bool> {
        Ok(self.cursor.first()?)
    }

    pub fn last(&mut self) -> Result<bool> {
        Ok(self.cursor.last()?)
    }

    pub fn absolute(&mut self, row: i64) -> Result<bool> {
        Ok(self.cursor.absolute(row)?)
    }

    pub fn relative(&mut self, rows: i64) -> Result<bool> {
        Ok(self.cursor.relative(rows)?)
    }

    pub fn before_first(&mut self) -> Result<()> {
        Ok(self.cursor.before_first()?)
    }

    pub fn after_last(&mut self) -> Result<()> {
        Ok(self.cursor.after_last()?)
    }

    pub fn is_before_first(&self) -> bool {
        self.cursor.is_before_first()
    }

    pub fn is_on_row(&self) -> bool {
        self.cursor.is_on_row()
    }

    pub fn is_after_last(&self) -> bool {
        self.cursor.is_after_last()
    }

    pub fn is_first(&self) -> bool {
        self.cursor.is_first()
    }

    pub fn is_last(&self) -> bool {
        self.cursor.is_last()
    }

    /// Current 1-based row number, `0` when not on a row
    pub fn row(&self) -> usize {
        self.cursor.row_number()
    }

    pub fn position(&self) -> CursorPosition {
        self.cursor.position()
    }

    pub fn row_count(&self) -> usize {
        self.cursor.len()
    }

    // Metadata

    pub fn columns(&self) -> &[ColumnInfo] {
        self.cursor.columns()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.cursor.columns().iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.cursor.columns().len()
    }

    /// 1-based index of the column labelled `label`
    pub fn find_column(&self, label: &str) -> Result<usize> {
        Ok(self.cursor.find_column(label)?)
    }

    pub fn cursor_type(&self) -> CursorType {
        self.cursor.cursor_type()
    }

    pub fn is_updatable(&self) -> bool {
        self.cursor.is_updatable()
    }

    // Getters

    /// Raw value of a column; records whether it was NULL
    pub fn get_value<C: ColumnIndex>(&self, column: C) -> Result<Value> {
        let index = column.column_index(&self.cursor)?;
        let value = self.cursor.get(index)?;
        self.was_null.set(value.is_null());
        Ok(value)
    }

    /// Whether the last getter read a NULL
    pub fn was_null(&self) -> bool {
        self.was_null.get()
    }

    /// Text form of the value, `None` for NULL
    pub fn get_string<C: ColumnIndex>(&self, column: C) -> Result<Option<String>> {
        let value = self.get_value(column)?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Integer value; NULL reads as `0`
    pub fn get_long<C: ColumnIndex>(&self, column: C) -> Result<i64> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(0);
        }
        value
            .as_integer()
            .ok_or_else(|| conversion_error(&value, "BIGINT"))
    }

    /// Integer value that fits 32 bits; NULL reads as `0`
    pub fn get_int<C: ColumnIndex>(&self, column: C) -> Result<i32> {
        let n = self.get_long(column)?;
        i32::try_from(n).map_err(|_| Error::TypeConversion(format!("{} out of range for INTEGER", n)))
    }

    /// Floating-point value; NULL reads as `0.0`
    pub fn get_double<C: ColumnIndex>(&self, column: C) -> Result<f64> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(0.0);
        }
        value
            .as_double()
            .ok_or_else(|| conversion_error(&value, "DOUBLE"))
    }

    /// Boolean value; NULL reads as `false`
    pub fn get_bool<C: ColumnIndex>(&self, column: C) -> Result<bool> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(false);
        }
        value
            .as_boolean()
            .ok_or_else(|| conversion_error(&value, "BOOLEAN"))
    }

    /// Every value of the current row
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.cursor.values()?)
    }

    /// Deserialize the current row into `T`, keyed by column label
    pub fn deserialize_row<T: DeserializeOwned>(&self) -> Result<T> {
        let values = self.cursor.values()?;
        let object = self
            .cursor
            .columns()
            .iter()
            .zip(values.iter())
            .map(|(column, value)| (column.name.clone(), value_to_json(value)))
            .collect::<serde_json::Map<_, _>>();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }

    /// Deserialize every row from the current position to the end
    pub fn deserialize_rows<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while self.next()? {
            rows.push(self.deserialize_row()?);
        }
        Ok(rows)
    }

    /// First column of the first row
    pub fn scalar<T: DeserializeOwned>(&mut self) -> Result<T> {
        if !self.next()? {
            return Err(Error::NotFound("No rows returned".to_string()));
        }
        let value = self.get_value(1usize)?;
        Ok(serde_json::from_value(value_to_json(&value))?)
    }

    // Row state

    pub fn row_inserted(&self) -> Result<bool> {
        Ok(self.cursor.row_state()?.inserted)
    }

    pub fn row_updated(&self) -> Result<bool> {
        Ok(self.cursor.row_state()?.updated)
    }

    pub fn row_deleted(&self) -> Result<bool> {
        Ok(self.cursor.row_state()?.deleted)
    }

    // Updaters

    pub fn update_value<C: ColumnIndex>(&mut self, column: C, value: Value) -> Result<()> {
        let index = column.column_index(&self.cursor)?;
        Ok(self.cursor.update_value(index, value)?)
    }

    pub fn update_string<C: ColumnIndex>(&mut self, column: C, value: &str) -> Result<()> {
        self.update_value(column, value.into())
    }

    pub fn update_int<C: ColumnIndex>(&mut self, column: C, value: i32) -> Result<()> {
        self.update_value(column, value.into())
    }

    pub fn update_long<C: ColumnIndex>(&mut self, column: C, value: i64) -> Result<()> {
        self.update_value(column, value.into())
    }

    pub fn update_double<C: ColumnIndex>(&mut self, column: C, value: f64) -> Result<()> {
        self.update_value(column, value.into())
    }

    pub fn update_bool<C: ColumnIndex>(&mut self, column: C, value: bool) -> Result<()> {
        self.update_value(column, value.into())
    }

    pub fn update_null<C: ColumnIndex>(&mut self, column: C) -> Result<()> {
        self.update_value(column, Value::Null)
    }

    pub fn update_row(&mut self) -> Result<()> {
        Ok(self.cursor.update_row()?)
    }

    pub fn insert_row(&mut self) -> Result<()> {
        Ok(self.cursor.insert_row()?)
    }

    pub fn delete_row(&mut self) -> Result<()> {
        Ok(self.cursor.delete_row()?)
    }

    pub fn refresh_row(&mut self) -> Result<()> {
        Ok(self.cursor.refresh_row()?)
    }

    pub fn cancel_row_updates(&mut self) -> Result<()> {
        Ok(self.cursor.cancel_row_updates()?)
    }

    pub fn move_to_insert_row(&mut self) -> Result<()> {
        Ok(self.cursor.move_to_insert_row()?)
    }

    pub fn move_to_current_row(&mut self) -> Result<()> {
        Ok(self.cursor.move_to_current_row()?)
    }

    pub fn close(&mut self) {
        self.cursor.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }
}

fn conversion_error(value: &Value, target: &str) -> Error {
    Error::TypeConversion(format!(
        "cannot read {} '{}' as {}",
        value.type_name(),
        value,
        target
    ))
}

/// Convert a RowLite value to a serde_json value
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::from(*n),
        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion() {
        assert_eq!(value_to_json(&Value::Integer(42)), serde_json::json!(42));
        assert_eq!(value_to_json(&Value::Double(f64::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(&Value::from("a")), serde_json::json!("a"));
    }
}
