// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row writes shared by statements and updatable cursors
//!
//! Every write takes the row's exclusive lock first, stages a new version in
//! the table and appends a [`RowChange`] owning the lock to the transaction
//! log. The lock is only handed back through the log.

use crate::exec::error::ExecutionError;
use crate::session::connection::TransactionScope;
use crate::storage::{Row, RowId, RowRead, Table, Value};
use crate::txn::change::{RowChange, RowEdit};
use crate::txn::lock::{LockMode, ResourceId};
use crate::txn::state::ChangeId;
use log::debug;
use std::sync::Arc;

fn row_lock(table: &Table, row_id: RowId) -> ResourceId {
    ResourceId::row(table.name(), row_id)
}

/// Insert a row built from `(column index, value)` assignments
pub(crate) fn insert_row(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    assignments: Vec<(usize, Value)>,
) -> Result<(RowId, Row), ExecutionError> {
    let row = table.build_row(assignments)?;
    let row_id = table.allocate_row_id();
    let lock = scope.lock(row_lock(table, row_id), LockMode::Exclusive)?;
    let change = ChangeId::next();
    if let Err(err) = table.stage_insert(scope.owner(), change, row_id, row.clone()) {
        scope.release(lock);
        return Err(err.into());
    }
    debug!("Staged insert of {} into {}", row_id, table.name());
    let locks = scope.locks().clone();
    scope.append(Box::new(RowChange::new(
        change,
        RowEdit::Insert,
        table.clone(),
        row_id,
        lock,
        locks,
    )))?;
    Ok((row_id, row))
}

/// Replace the row computed by `update` from the current version. Returns
/// `false` when the row is no longer visible or `update` declines.
pub(crate) fn update_row<F>(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    row_id: RowId,
    update: F,
) -> Result<bool, ExecutionError>
where
    F: FnOnce(&Row) -> Result<Option<Row>, ExecutionError>,
{
    let lock = scope.lock(row_lock(table, row_id), LockMode::Exclusive)?;
    let current = match table.visible_row(row_id, scope.owner(), false) {
        RowRead::Row(row) => row,
        RowRead::Absent | RowRead::ForeignPending => {
            scope.release(lock);
            return Ok(false);
        }
    };
    let replacement = match update(&current) {
        Ok(Some(row)) => row,
        Ok(None) => {
            scope.release(lock);
            return Ok(false);
        }
        Err(err) => {
            scope.release(lock);
            return Err(err);
        }
    };
    let change = ChangeId::next();
    if let Err(err) = table.stage_update(scope.owner(), change, row_id, replacement) {
        scope.release(lock);
        return Err(err.into());
    }
    debug!("Staged update of {} in {}", row_id, table.name());
    let locks = scope.locks().clone();
    scope.append(Box::new(RowChange::new(
        change,
        RowEdit::Update,
        table.clone(),
        row_id,
        lock,
        locks,
    )))?;
    Ok(true)
}

/// Delete the row if `predicate` accepts its current version
pub(crate) fn delete_row<F>(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    row_id: RowId,
    predicate: F,
) -> Result<bool, ExecutionError>
where
    F: FnOnce(&Row) -> Result<bool, ExecutionError>,
{
    let lock = scope.lock(row_lock(table, row_id), LockMode::Exclusive)?;
    let keep = match table.visible_row(row_id, scope.owner(), false) {
        RowRead::Row(row) => predicate(&row).map(|matched| !matched),
        RowRead::Absent | RowRead::ForeignPending => Ok(true),
    };
    match keep {
        Ok(false) => {}
        Ok(true) => {
            scope.release(lock);
            return Ok(false);
        }
        Err(err) => {
            scope.release(lock);
            return Err(err);
        }
    }
    let change = ChangeId::next();
    if let Err(err) = table.stage_delete(scope.owner(), change, row_id) {
        scope.release(lock);
        return Err(err.into());
    }
    debug!("Staged delete of {} from {}", row_id, table.name());
    let locks = scope.locks().clone();
    scope.append(Box::new(RowChange::new(
        change,
        RowEdit::Delete,
        table.clone(),
        row_id,
        lock,
        locks,
    )))?;
    Ok(true)
}
