// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result cursor
//!
//! A cursor is positioned before the first row, on a row (1-based), after the
//! last row, or on the insert row. Rows of a table scan are re-read from
//! storage each time the cursor lands on them, so a scroll-sensitive cursor
//! sees the current state of its rows under the connection's isolation level.
//!
//! Updatable cursors buffer column edits. The buffer belongs to the row it was
//! filled on and is dropped by any call that moves the cursor. `update_row`,
//! `insert_row` and `delete_row` each run as one statement of the owning
//! connection and commit in auto-commit mode.

use crate::exec::context::{Concurrency, CursorType, StatementContext};
use crate::exec::dml;
use crate::exec::error::ExecutionError;
use crate::exec::row_source::{ColumnInfo, FetchedRow, RowSource};
use crate::session::connection::{ConnectionContext, TransactionScope};
use crate::storage::{Row, Value};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a cursor is positioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorPosition {
    BeforeFirst,
    /// 1-based row number
    OnRow(usize),
    AfterLast,
    InsertRow,
}

/// What the cursor itself did to a row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowState {
    pub inserted: bool,
    /// Never set: updates are seen in place
    pub updated: bool,
    pub deleted: bool,
}

pub struct Cursor {
    connection: Arc<ConnectionContext>,
    source: RowSource,
    cursor_type: CursorType,
    updatable: bool,
    position: CursorPosition,
    /// Position to return to when leaving the insert row
    resume: CursorPosition,
    current: Option<FetchedRow>,
    row_states: Vec<RowState>,
    /// Pending column values keyed by 0-based result column
    edit_buffer: BTreeMap<usize, Value>,
    closed: bool,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("connection", &self.connection.id())
            .field("cursor_type", &self.cursor_type)
            .field("updatable", &self.updatable)
            .field("position", &self.position)
            .field("rows", &self.source.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Cursor {
    pub(crate) fn new(
        connection: Arc<ConnectionContext>,
        source: RowSource,
        context: &StatementContext,
    ) -> Self {
        let mut updatable = context.concurrency == Concurrency::Updatable;
        if updatable && source.table_scan().is_none() {
            warn!("Computed result set requested as updatable, downgraded to read-only");
            updatable = false;
        }
        let row_states = vec![RowState::default(); source.len()];
        Self {
            connection,
            source,
            cursor_type: context.cursor_type,
            updatable,
            position: CursorPosition::BeforeFirst,
            resume: CursorPosition::BeforeFirst,
            current: None,
            row_states,
            edit_buffer: BTreeMap::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResultSetClosed);
        }
        Ok(())
    }

    fn ensure_scrollable(&self, operation: &str) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        if self.cursor_type == CursorType::ForwardOnly {
            return Err(ExecutionError::UnsupportedOperation(format!(
                "{} on a forward-only result set",
                operation
            )));
        }
        Ok(())
    }

    fn ensure_updatable(&self) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        if !self.updatable {
            return Err(ExecutionError::NotUpdatable);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Positioning
    // -----------------------------------------------------------------------

    /// Number of rows the cursor ranges over
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    /// Current 1-based row number, `0` when not on a row
    pub fn row_number(&self) -> usize {
        match self.position {
            CursorPosition::OnRow(n) => n,
            _ => 0,
        }
    }

    /// Position index where BEFORE_FIRST is 0 and AFTER_LAST is `len + 1`
    fn index_of(&self, position: CursorPosition) -> i64 {
        match position {
            CursorPosition::BeforeFirst => 0,
            CursorPosition::OnRow(n) => n as i64,
            CursorPosition::AfterLast => self.len() as i64 + 1,
            CursorPosition::InsertRow => self.index_of(self.resume),
        }
    }

    fn clamp(&self, index: i64) -> CursorPosition {
        if index <= 0 {
            CursorPosition::BeforeFirst
        } else if index > self.len() as i64 {
            CursorPosition::AfterLast
        } else {
            CursorPosition::OnRow(index as usize)
        }
    }

    /// Move to `target`, reading the row when it is one. On failure the
    /// cursor keeps its previous position and buffer.
    fn move_to(&mut self, target: CursorPosition) -> Result<bool, ExecutionError> {
        let current = match target {
            CursorPosition::OnRow(n) => {
                let connection = self.connection.clone();
                let mut scope = connection.scope()?;
                let fetched = self.source.fetch(&mut scope, n - 1)?;
                if fetched == FetchedRow::Vanished {
                    self.row_states[n - 1].deleted = true;
                }
                Some(fetched)
            }
            _ => None,
        };
        if !self.edit_buffer.is_empty() {
            debug!("Discarding {} buffered column edits", self.edit_buffer.len());
            self.edit_buffer.clear();
        }
        self.position = target;
        self.current = current;
        Ok(matches!(target, CursorPosition::OnRow(_)))
    }

    /// The insert row stands in for the position it was entered from
    fn effective_position(&self) -> CursorPosition {
        match self.position {
            CursorPosition::InsertRow => self.resume,
            other => other,
        }
    }

    pub fn next(&mut self) -> Result<bool, ExecutionError> {
        self.ensure_open()?;
        let position = self.effective_position();
        if position == CursorPosition::AfterLast {
            return self.move_to(CursorPosition::AfterLast);
        }
        let target = self.clamp(self.index_of(position) + 1);
        self.move_to(target)
    }

    pub fn previous(&mut self) -> Result<bool, ExecutionError> {
        self.ensure_scrollable("previous")?;
        let position = self.effective_position();
        if position == CursorPosition::BeforeFirst {
            return self.move_to(CursorPosition::BeforeFirst);
        }
        let target = self.clamp(self.index_of(position) - 1);
        self.move_to(target)
    }

    pub fn first(&mut self) -> Result<bool, ExecutionError> {
        self.ensure_scrollable("first")?;
        if self.is_empty() {
            return self.move_to(CursorPosition::BeforeFirst);
        }
        self.move_to(CursorPosition::OnRow(1))
    }

    pub fn last(&mut self) -> Result<bool, ExecutionError> {
        self.ensure_scrollable("last")?;
        if self.is_empty() {
            return self.move_to(CursorPosition::AfterLast);
        }
        self.move_to(CursorPosition::OnRow(self.len()))
    }

    /// Jump to row `row`; negative values count from the end
    pub fn absolute(&mut self, row: i64) -> Result<bool, ExecutionError> {
        self.ensure_scrollable("absolute")?;
        let target = match row {
            0 => {
                return Err(ExecutionError::InvalidArgument(
                    "absolute row number must not be 0".into(),
                ))
            }
            row if row > 0 => self.clamp(row),
            row => self.clamp(self.len() as i64 + row + 1),
        };
        self.move_to(target)
    }

    pub fn relative(&mut self, rows: i64) -> Result<bool, ExecutionError> {
        self.ensure_scrollable("relative")?;
        let target = self.clamp(self.index_of(self.position).saturating_add(rows));
        self.move_to(target)
    }

    pub fn before_first(&mut self) -> Result<(), ExecutionError> {
        self.ensure_scrollable("before_first")?;
        self.move_to(CursorPosition::BeforeFirst).map(|_| ())
    }

    pub fn after_last(&mut self) -> Result<(), ExecutionError> {
        self.ensure_scrollable("after_last")?;
        self.move_to(CursorPosition::AfterLast).map(|_| ())
    }

    pub fn is_before_first(&self) -> bool {
        self.effective_position() == CursorPosition::BeforeFirst
    }

    pub fn is_on_row(&self) -> bool {
        matches!(self.effective_position(), CursorPosition::OnRow(_))
    }

    pub fn is_after_last(&self) -> bool {
        self.effective_position() == CursorPosition::AfterLast
    }

    pub fn is_first(&self) -> bool {
        self.position == CursorPosition::OnRow(1)
    }

    pub fn is_last(&self) -> bool {
        !self.is_empty() && self.position == CursorPosition::OnRow(self.len())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    pub fn columns(&self) -> &[ColumnInfo] {
        self.source.columns()
    }

    /// 1-based index of the column labelled `label`
    pub fn find_column(&self, label: &str) -> Result<usize, ExecutionError> {
        self.ensure_open()?;
        self.columns()
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(label))
            .map(|i| i + 1)
            .ok_or_else(|| ExecutionError::InvalidArgument(format!("no column labelled {}", label)))
    }

    fn column_slot(&self, column: usize) -> Result<usize, ExecutionError> {
        if column == 0 || column > self.columns().len() {
            return Err(ExecutionError::InvalidArgument(format!(
                "column index {} out of range 1..{}",
                column,
                self.columns().len()
            )));
        }
        Ok(column - 1)
    }

    fn current_row(&self) -> Result<&Row, ExecutionError> {
        match (&self.position, &self.current) {
            (CursorPosition::OnRow(n), Some(FetchedRow::Row(row))) => {
                if self.row_states[n - 1].deleted {
                    Err(ExecutionError::RowDeleted(format!("row {}", n)))
                } else {
                    Ok(row)
                }
            }
            (CursorPosition::OnRow(n), _) => Err(ExecutionError::RowDeleted(format!("row {}", n))),
            _ => Err(ExecutionError::NoCurrentRow),
        }
    }

    /// Value of a 1-based column, including edits buffered for the row
    pub fn get(&self, column: usize) -> Result<Value, ExecutionError> {
        self.ensure_open()?;
        let slot = self.column_slot(column)?;
        if let Some(value) = self.edit_buffer.get(&slot) {
            return Ok(value.clone());
        }
        if self.position == CursorPosition::InsertRow {
            return Ok(Value::Null);
        }
        Ok(self.current_row()?.get(slot).cloned().unwrap_or_default())
    }

    /// Every value of the current row
    pub fn values(&self) -> Result<Row, ExecutionError> {
        (1..=self.columns().len()).map(|c| self.get(c)).collect()
    }

    pub fn row_state(&self) -> Result<RowState, ExecutionError> {
        self.ensure_open()?;
        match self.position {
            CursorPosition::OnRow(n) => Ok(self.row_states[n - 1]),
            _ => Err(ExecutionError::NoCurrentRow),
        }
    }

    pub fn cursor_type(&self) -> CursorType {
        self.cursor_type
    }

    pub fn is_updatable(&self) -> bool {
        self.updatable
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.edit_buffer.is_empty()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Buffer a new value for a 1-based column of the current or insert row
    pub fn update_value(&mut self, column: usize, value: Value) -> Result<(), ExecutionError> {
        self.ensure_updatable()?;
        let slot = self.column_slot(column)?;
        if self.position != CursorPosition::InsertRow {
            self.current_row()?;
        }
        if self.columns()[slot].table_column.is_none() {
            return Err(ExecutionError::NotUpdatable);
        }
        self.edit_buffer.insert(slot, value);
        Ok(())
    }

    pub fn cancel_row_updates(&mut self) -> Result<(), ExecutionError> {
        self.ensure_updatable()?;
        if self.position == CursorPosition::InsertRow {
            return Err(ExecutionError::InvalidState(
                "cannot cancel updates on the insert row".into(),
            ));
        }
        self.edit_buffer.clear();
        Ok(())
    }

    pub fn move_to_insert_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_scrollable("move_to_insert_row")?;
        self.ensure_updatable()?;
        if self.position != CursorPosition::InsertRow {
            self.resume = self.position;
        }
        self.move_to(CursorPosition::InsertRow).map(|_| ())
    }

    pub fn move_to_current_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_scrollable("move_to_current_row")?;
        self.ensure_updatable()?;
        if self.position == CursorPosition::InsertRow {
            self.move_to(self.resume)?;
        }
        Ok(())
    }

    /// Re-read the current row, dropping buffered edits
    pub fn refresh_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_scrollable("refresh_row")?;
        match self.position {
            CursorPosition::OnRow(n) => self.move_to(CursorPosition::OnRow(n)).map(|_| ()),
            _ => Err(ExecutionError::NoCurrentRow),
        }
    }

    /// Table assignments for the buffered edits
    fn buffered_assignments(&self) -> Vec<(usize, Value)> {
        self.edit_buffer
            .iter()
            .filter_map(|(slot, value)| {
                self.columns()[*slot]
                    .table_column
                    .map(|column| (column, value.clone()))
            })
            .collect()
    }

    /// Run one cursor write as a statement of the owning connection
    fn run_statement<T, F>(&mut self, write: F) -> Result<T, ExecutionError>
    where
        F: FnOnce(&mut TransactionScope<'_>, &mut RowSource) -> Result<T, ExecutionError>,
    {
        let connection = self.connection.clone();
        let mut scope = connection.scope()?;
        let mark = scope.mark();
        match write(&mut scope, &mut self.source) {
            Ok(value) => {
                scope.finish_statement()?;
                Ok(value)
            }
            Err(err) => {
                scope.rollback_to_mark(mark);
                Err(err)
            }
        }
    }

    /// Insert the buffered row and return to the position held before
    pub fn insert_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_updatable()?;
        if self.position != CursorPosition::InsertRow {
            return Err(ExecutionError::InvalidState("not on the insert row".into()));
        }
        let assignments = self.buffered_assignments();
        let row_id = self.run_statement(|scope, source| {
            let scan = source
                .table_scan_mut()
                .ok_or(ExecutionError::NotUpdatable)?;
            scan.check_valid()?;
            let table = scan.table().clone();
            let (row_id, _) = dml::insert_row(scope, &table, assignments)?;
            Ok(row_id)
        })?;
        if let Some(scan) = self.source.table_scan_mut() {
            scan.push_row(row_id);
        }
        self.row_states.push(RowState {
            inserted: true,
            ..RowState::default()
        });
        self.edit_buffer.clear();
        debug!("Cursor inserted {} as row {}", row_id, self.len());
        self.move_to(self.resume).map(|_| ())
    }

    /// Write the buffered edits to the current row
    pub fn update_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_updatable()?;
        let CursorPosition::OnRow(n) = self.position else {
            return Err(ExecutionError::NoCurrentRow);
        };
        self.current_row()?;
        if self.edit_buffer.is_empty() {
            return Ok(());
        }
        let assignments = self.buffered_assignments();
        let updated = self.run_statement(|scope, source| {
            let scan = source
                .table_scan_mut()
                .ok_or(ExecutionError::NotUpdatable)?;
            scan.check_valid()?;
            let table = scan.table().clone();
            let row_id = scan
                .row_id(n - 1)
                .ok_or(ExecutionError::NoCurrentRow)?;
            dml::update_row(scope, &table, row_id, |current| {
                let mut replacement = current.clone();
                for (column, value) in assignments {
                    replacement[column] = table.coerce_value(column, value)?;
                }
                Ok(Some(replacement))
            })
        })?;
        if !updated {
            self.row_states[n - 1].deleted = true;
            self.current = Some(FetchedRow::Vanished);
            return Err(ExecutionError::RowDeleted(format!("row {}", n)));
        }
        self.edit_buffer.clear();
        self.move_to(CursorPosition::OnRow(n)).map(|_| ())
    }

    /// Delete the current row; the cursor stays on it
    pub fn delete_row(&mut self) -> Result<(), ExecutionError> {
        self.ensure_updatable()?;
        let CursorPosition::OnRow(n) = self.position else {
            return Err(ExecutionError::NoCurrentRow);
        };
        self.current_row()?;
        let deleted = self.run_statement(|scope, source| {
            let scan = source
                .table_scan_mut()
                .ok_or(ExecutionError::NotUpdatable)?;
            scan.check_valid()?;
            let table = scan.table().clone();
            let row_id = scan
                .row_id(n - 1)
                .ok_or(ExecutionError::NoCurrentRow)?;
            dml::delete_row(scope, &table, row_id, |_| Ok(true))
        })?;
        self.row_states[n - 1].deleted = true;
        self.current = Some(FetchedRow::Vanished);
        self.edit_buffer.clear();
        if !deleted {
            return Err(ExecutionError::RowDeleted(format!("row {}", n)));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.edit_buffer.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::exec::row_source::MaterializedRows;
    use crate::storage::StorageManager;
    use crate::txn::lock::LockTable;
    use std::sync::atomic::AtomicUsize;

    fn connection() -> Arc<ConnectionContext> {
        Arc::new(ConnectionContext::new(
            Arc::new(StorageManager::new()),
            Arc::new(LockTable::new()),
            &DatabaseConfig::default(),
            Arc::new(AtomicUsize::new(0)),
        ))
    }

    fn cursor(rows: i64, cursor_type: CursorType) -> Cursor {
        let source = RowSource::Materialized(MaterializedRows::new(
            vec![ColumnInfo::computed("n")],
            (1..=rows).map(|n| vec![Value::Integer(n)]).collect(),
        ));
        Cursor::new(
            connection(),
            source,
            &StatementContext::new(cursor_type, Concurrency::ReadOnly),
        )
    }

    #[test]
    fn test_next_walks_to_after_last() {
        let mut cursor = cursor(2, CursorType::ForwardOnly);
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get(1).unwrap(), Value::Integer(1));
        assert!(cursor.next().unwrap());
        assert!(cursor.is_last());
        assert!(!cursor.next().unwrap());
        assert_eq!(cursor.position(), CursorPosition::AfterLast);
        assert!(!cursor.next().unwrap());
        assert!(matches!(cursor.get(1), Err(ExecutionError::NoCurrentRow)));
    }

    #[test]
    fn test_forward_only_rejects_scrolling() {
        let mut cursor = cursor(3, CursorType::ForwardOnly);
        assert!(matches!(
            cursor.previous(),
            Err(ExecutionError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            cursor.absolute(1),
            Err(ExecutionError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            cursor.refresh_row(),
            Err(ExecutionError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_absolute_and_relative() {
        let mut cursor = cursor(5, CursorType::ScrollSensitive);
        assert!(cursor.absolute(-1).unwrap());
        assert_eq!(cursor.row_number(), 5);
        assert!(cursor.relative(-2).unwrap());
        assert_eq!(cursor.get(1).unwrap(), Value::Integer(3));
        assert!(cursor.relative(0).unwrap());
        assert_eq!(cursor.row_number(), 3);
        assert!(!cursor.absolute(6).unwrap());
        assert_eq!(cursor.position(), CursorPosition::AfterLast);
        assert!(!cursor.absolute(-6).unwrap());
        assert_eq!(cursor.position(), CursorPosition::BeforeFirst);
        assert!(matches!(
            cursor.absolute(0),
            Err(ExecutionError::InvalidArgument(_))
        ));

        cursor.after_last().unwrap();
        assert!(cursor.relative(-1).unwrap());
        assert_eq!(cursor.row_number(), 5);
        cursor.before_first().unwrap();
        assert!(cursor.relative(2).unwrap());
        assert_eq!(cursor.row_number(), 2);
    }

    #[test]
    fn test_empty_result_positions() {
        let mut cursor = cursor(0, CursorType::ScrollSensitive);
        assert!(!cursor.first().unwrap());
        assert_eq!(cursor.position(), CursorPosition::BeforeFirst);
        assert!(!cursor.last().unwrap());
        assert_eq!(cursor.position(), CursorPosition::AfterLast);
        assert!(matches!(cursor.get(1), Err(ExecutionError::NoCurrentRow)));
        assert!(cursor.is_after_last());
        assert!(!cursor.is_before_first());
        assert!(!cursor.is_on_row());
    }

    #[test]
    fn test_materialized_cursor_is_read_only() {
        let source = RowSource::Materialized(MaterializedRows::new(
            vec![ColumnInfo::computed("n")],
            vec![vec![Value::Integer(1)]],
        ));
        let mut cursor = Cursor::new(
            connection(),
            source,
            &StatementContext::scrollable_updatable(),
        );
        assert!(!cursor.is_updatable());
        cursor.next().unwrap();
        assert!(matches!(
            cursor.update_value(1, Value::Integer(2)),
            Err(ExecutionError::NotUpdatable)
        ));
    }

    #[test]
    fn test_closed_cursor() {
        let mut cursor = cursor(1, CursorType::ScrollSensitive);
        cursor.close();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next(), Err(ExecutionError::ResultSetClosed)));
        assert!(matches!(cursor.get(1), Err(ExecutionError::ResultSetClosed)));
    }
}
