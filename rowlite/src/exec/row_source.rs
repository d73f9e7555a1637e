// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row sources behind result cursors
//!
//! A [`TableScan`] remembers the identities of the rows a query selected and
//! re-reads each one from the table whenever the cursor is positioned on it,
//! under the read locks the isolation policy asks for. Grouped, aggregated
//! and computed results are materialized once into [`MaterializedRows`].

use crate::exec::error::ExecutionError;
use crate::session::connection::TransactionScope;
use crate::storage::{DataType, Row, RowId, RowRead, Table};
use crate::txn::isolation::{ReadGranularity, ReadLockDuration};
use crate::txn::lock::{LockHandle, LockMode, LockScope, ResourceId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Description of one result column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Label: alias, column name or expression text
    pub name: String,
    /// Declared type when the column comes straight from a table
    pub data_type: Option<DataType>,
    /// Position in the underlying table for updatable columns
    pub table_column: Option<usize>,
}

impl ColumnInfo {
    pub fn computed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            table_column: None,
        }
    }
}

/// Outcome of re-reading one row
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedRow {
    Row(Row),
    /// The row is no longer visible (deleted, or its insert rolled back)
    Vanished,
}

/// Read locks a reader holds on one table within one transaction
///
/// Locks kept for the transaction are remembered so every row is locked only
/// once; the memory is dropped whenever the connection's lock epoch moves.
#[derive(Debug)]
pub(crate) struct ReadLocks {
    table: String,
    epoch: Option<(u64, u64)>,
    schema_held: bool,
    table_held: bool,
    rows_held: HashSet<RowId>,
}

impl ReadLocks {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            epoch: None,
            schema_held: false,
            table_held: false,
            rows_held: HashSet::new(),
        }
    }

    fn sync(&mut self, scope: &TransactionScope<'_>) {
        let epoch = scope.lock_epoch();
        if self.epoch != Some(epoch) {
            self.epoch = Some(epoch);
            self.schema_held = false;
            self.table_held = false;
            self.rows_held.clear();
        }
    }

    /// Take the schema (and for table granularity the table) lock before any
    /// row is read. Transient locks are returned for [`ReadLocks::finish`].
    pub fn begin(
        &mut self,
        scope: &mut TransactionScope<'_>,
        duration: ReadLockDuration,
        granularity: ReadGranularity,
    ) -> Result<Vec<LockHandle>, ExecutionError> {
        self.sync(scope);
        let mut transient = Vec::new();
        let mut wanted = vec![ResourceId::schema(&self.table)];
        if granularity == ReadGranularity::Table {
            wanted.push(ResourceId::table(&self.table));
        }
        match duration {
            ReadLockDuration::None => {}
            ReadLockDuration::Transient => {
                for resource in wanted {
                    match scope.lock(resource, LockMode::Shared) {
                        Ok(handle) => transient.push(handle),
                        Err(err) => {
                            self.finish(scope, transient);
                            return Err(err);
                        }
                    }
                }
            }
            ReadLockDuration::Transaction => {
                for resource in wanted {
                    let is_schema = matches!(resource.scope(), LockScope::Schema);
                    let held = if is_schema {
                        self.schema_held
                    } else {
                        self.table_held
                    };
                    if held {
                        continue;
                    }
                    let handle = scope.lock(resource, LockMode::Shared)?;
                    scope.hold(handle)?;
                    if is_schema {
                        self.schema_held = true;
                    } else {
                        self.table_held = true;
                    }
                }
            }
        }
        Ok(transient)
    }

    pub fn finish(&self, scope: &TransactionScope<'_>, transient: Vec<LockHandle>) {
        for handle in transient {
            scope.release(handle);
        }
    }

    /// Read one row the way the isolation policy allows. `None` means the row
    /// is not visible to this connection.
    pub fn read_row(
        &mut self,
        scope: &mut TransactionScope<'_>,
        table: &Table,
        row_id: RowId,
        duration: ReadLockDuration,
        granularity: ReadGranularity,
    ) -> Result<Option<Row>, ExecutionError> {
        let owner = scope.owner();
        if duration == ReadLockDuration::None {
            return Ok(table.visible_row(row_id, owner, true).into_row());
        }
        self.sync(scope);

        let peek = table.visible_row(row_id, owner, false);
        let keep_row_lock = duration == ReadLockDuration::Transaction
            && granularity == ReadGranularity::Row;
        match peek {
            RowRead::Absent => Ok(None),
            RowRead::Row(row) if !keep_row_lock => Ok(Some(row)),
            RowRead::Row(_) | RowRead::ForeignPending => {
                if keep_row_lock && self.rows_held.contains(&row_id) {
                    return Ok(table.visible_row(row_id, owner, false).into_row());
                }
                // Waits for a writer holding the row exclusively
                let handle = scope.lock(ResourceId::row(&self.table, row_id), LockMode::Shared)?;
                let row = table.visible_row(row_id, owner, false).into_row();
                if keep_row_lock {
                    scope.hold(handle)?;
                    self.rows_held.insert(row_id);
                } else {
                    scope.release(handle);
                }
                Ok(row)
            }
        }
    }
}

/// Rows of one table, identified by row id and re-read on every fetch
#[derive(Debug)]
pub struct TableScan {
    table: Arc<Table>,
    schema_version: u64,
    row_ids: Vec<RowId>,
    projection: Vec<usize>,
    columns: Vec<ColumnInfo>,
    read_locks: ReadLocks,
}

impl TableScan {
    pub(crate) fn new(
        table: Arc<Table>,
        schema_version: u64,
        row_ids: Vec<RowId>,
        projection: Vec<usize>,
        columns: Vec<ColumnInfo>,
        read_locks: ReadLocks,
    ) -> Self {
        Self {
            table,
            schema_version,
            row_ids,
            projection,
            columns,
            read_locks,
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn row_id(&self, index: usize) -> Option<RowId> {
        self.row_ids.get(index).copied()
    }

    /// Append a row inserted through the cursor
    pub(crate) fn push_row(&mut self, row_id: RowId) {
        self.row_ids.push(row_id);
    }

    /// Fail if the table was dropped or restructured since the query ran
    pub fn check_valid(&self) -> Result<(), ExecutionError> {
        if self.table.is_dropped() {
            return Err(ExecutionError::CursorInvalidated(format!(
                "table {} was dropped",
                self.table.name()
            )));
        }
        if self.table.schema_version() != self.schema_version {
            return Err(ExecutionError::CursorInvalidated(format!(
                "table {} was altered",
                self.table.name()
            )));
        }
        Ok(())
    }

    fn fetch(
        &mut self,
        scope: &mut TransactionScope<'_>,
        index: usize,
    ) -> Result<FetchedRow, ExecutionError> {
        self.check_valid()?;
        let row_id = self.row_id(index).ok_or_else(|| {
            ExecutionError::InvalidArgument(format!("row index {} out of range", index + 1))
        })?;
        let policy = scope.policy();
        let duration = policy.fetch_locks();
        let granularity = policy.granularity();

        let transient = self.read_locks.begin(scope, duration, granularity)?;
        let result = self
            .read_locks
            .read_row(scope, &self.table, row_id, duration, granularity);
        self.read_locks.finish(scope, transient);

        match result? {
            Some(row) => Ok(FetchedRow::Row(
                self.projection
                    .iter()
                    .map(|i| row.get(*i).cloned().unwrap_or_default())
                    .collect(),
            )),
            None => {
                debug!("Row {} of {} vanished", row_id, self.table.name());
                Ok(FetchedRow::Vanished)
            }
        }
    }
}

/// Rows computed once at execution time
#[derive(Debug, Clone)]
pub struct MaterializedRows {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl MaterializedRows {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

/// Where a cursor's rows come from
#[derive(Debug)]
pub enum RowSource {
    Table(TableScan),
    Materialized(MaterializedRows),
}

impl RowSource {
    pub fn columns(&self) -> &[ColumnInfo] {
        match self {
            RowSource::Table(scan) => &scan.columns,
            RowSource::Materialized(rows) => &rows.columns,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowSource::Table(scan) => scan.row_ids.len(),
            RowSource::Materialized(rows) => rows.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce the row at zero-based `index`
    pub(crate) fn fetch(
        &mut self,
        scope: &mut TransactionScope<'_>,
        index: usize,
    ) -> Result<FetchedRow, ExecutionError> {
        match self {
            RowSource::Table(scan) => scan.fetch(scope, index),
            RowSource::Materialized(rows) => rows
                .rows
                .get(index)
                .cloned()
                .map(FetchedRow::Row)
                .ok_or_else(|| {
                    ExecutionError::InvalidArgument(format!("row index {} out of range", index + 1))
                }),
        }
    }

    pub fn table_scan(&self) -> Option<&TableScan> {
        match self {
            RowSource::Table(scan) => Some(scan),
            RowSource::Materialized(_) => None,
        }
    }

    pub(crate) fn table_scan_mut(&mut self) -> Option<&mut TableScan> {
        match self {
            RowSource::Table(scan) => Some(scan),
            RowSource::Materialized(_) => None,
        }
    }
}
