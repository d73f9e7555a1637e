// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory table with per-row version stacks
//!
//! Every row slot keeps its last committed version plus a stack of pending
//! versions written by the single connection currently holding the row's
//! exclusive lock. Each pending version is tagged with the [`ChangeId`] that
//! produced it, so a change can be rolled back wherever it sits in the stack
//! and rollbacks may run in any order.

use crate::storage::types::{ColumnDef, Row, RowId, StorageError, TableSchema};
use crate::storage::value::Value;
use crate::txn::state::{ChangeId, ConnectionId};
use parking_lot::RwLock;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a reader sees when it looks at one row slot
#[derive(Debug, Clone, PartialEq)]
pub enum RowRead {
    /// No visible version (never existed, deleted, or another connection's
    /// uncommitted insert)
    Absent,
    Row(Row),
    /// Another connection has a pending update or delete on a committed row
    ForeignPending,
}

impl RowRead {
    pub fn into_row(self) -> Option<Row> {
        match self {
            RowRead::Row(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct PendingVersions {
    owner: ConnectionId,
    /// `None` marks a pending delete
    versions: Vec<(ChangeId, Option<Row>)>,
}

#[derive(Debug, Default)]
struct RowSlot {
    committed: Option<Row>,
    pending: Option<PendingVersions>,
}

impl RowSlot {
    /// Newest version regardless of owner
    fn latest(&self) -> Option<&Row> {
        match &self.pending {
            Some(pending) => pending.versions.last().and_then(|(_, row)| row.as_ref()),
            None => self.committed.as_ref(),
        }
    }

    fn read(&self, viewer: ConnectionId, dirty: bool) -> RowRead {
        match &self.pending {
            Some(pending) if pending.owner == viewer || dirty => self
                .latest()
                .cloned()
                .map(RowRead::Row)
                .unwrap_or(RowRead::Absent),
            Some(_) => match self.committed {
                Some(_) => RowRead::ForeignPending,
                None => RowRead::Absent,
            },
            None => self
                .committed
                .clone()
                .map(RowRead::Row)
                .unwrap_or(RowRead::Absent),
        }
    }

    fn is_empty(&self) -> bool {
        self.committed.is_none() && self.pending.is_none()
    }

    fn versions_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.committed.iter_mut().chain(
            self.pending
                .iter_mut()
                .flat_map(|p| p.versions.iter_mut().filter_map(|(_, row)| row.as_mut())),
        )
    }
}

#[derive(Debug)]
struct TableData {
    schema: TableSchema,
    schema_version: u64,
    slots: BTreeMap<RowId, RowSlot>,
    next_row_id: u64,
    next_identity: i64,
}

impl TableData {
    fn check_constraints(&self, row: &Row, exclude: Option<RowId>) -> Result<(), StorageError> {
        if row.len() != self.schema.columns.len() {
            return Err(StorageError::InvalidOperation(format!(
                "row has {} values but table {} has {} columns",
                row.len(),
                self.schema.name,
                self.schema.columns.len()
            )));
        }
        for (index, column) in self.schema.columns.iter().enumerate() {
            let value = &row[index];
            if column.not_null && value.is_null() {
                return Err(StorageError::ConstraintViolation(format!(
                    "column {}.{} may not be NULL",
                    self.schema.name, column.name
                )));
            }
            if !column.is_unique_key() || value.is_null() {
                continue;
            }
            let duplicate = self
                .slots
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .any(|(_, slot)| {
                    [slot.latest(), slot.committed.as_ref()]
                        .into_iter()
                        .flatten()
                        .any(|other| other[index].compare(value) == Some(CmpOrdering::Equal))
                });
            if duplicate {
                return Err(StorageError::ConstraintViolation(format!(
                    "duplicate value '{}' for unique column {}.{}",
                    value, self.schema.name, column.name
                )));
            }
        }
        Ok(())
    }

    fn slot_for_write(
        &mut self,
        owner: ConnectionId,
        row_id: RowId,
    ) -> Result<&mut RowSlot, StorageError> {
        let table = self.schema.name.clone();
        let slot = self
            .slots
            .get_mut(&row_id)
            .ok_or(StorageError::RowNotFound { table: table.clone(), row_id })?;
        if let Some(pending) = &slot.pending {
            if pending.owner != owner {
                return Err(StorageError::InvalidOperation(format!(
                    "row {} of {} has pending changes of another connection",
                    row_id, table
                )));
            }
        }
        if slot.latest().is_none() {
            return Err(StorageError::RowNotFound { table, row_id });
        }
        Ok(slot)
    }
}

/// A table: schema plus row slots
#[derive(Debug)]
pub struct Table {
    name: String,
    data: RwLock<TableData>,
    dropped: AtomicBool,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            name: schema.name.clone(),
            data: RwLock::new(TableData {
                schema,
                schema_version: 1,
                slots: BTreeMap::new(),
                next_row_id: 1,
                next_identity: 1,
            }),
            dropped: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> TableSchema {
        self.data.read().schema.clone()
    }

    /// Bumped by every structural change
    pub fn schema_version(&self) -> u64 {
        self.data.read().schema_version
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
    }

    /// All slot ids in storage order, including slots invisible to some readers
    pub fn row_ids(&self) -> Vec<RowId> {
        self.data.read().slots.keys().copied().collect()
    }

    /// Read a row as seen by `viewer`. With `dirty` the newest version of any
    /// owner is returned.
    pub fn visible_row(&self, row_id: RowId, viewer: ConnectionId, dirty: bool) -> RowRead {
        self.data
            .read()
            .slots
            .get(&row_id)
            .map(|slot| slot.read(viewer, dirty))
            .unwrap_or(RowRead::Absent)
    }

    /// Snapshot of committed rows, ignoring pending versions
    pub fn committed_rows(&self) -> Vec<(RowId, Row)> {
        self.data
            .read()
            .slots
            .iter()
            .filter_map(|(id, slot)| slot.committed.clone().map(|row| (*id, row)))
            .collect()
    }

    /// Number of committed rows
    pub fn row_count(&self) -> usize {
        self.data
            .read()
            .slots
            .values()
            .filter(|slot| slot.committed.is_some())
            .count()
    }

    /// Build a full row from column assignments: values are coerced to the
    /// column types, unassigned identity columns draw from the identity counter
    /// and other unassigned columns are NULL.
    pub fn build_row(&self, assignments: Vec<(usize, Value)>) -> Result<Row, StorageError> {
        let mut data = self.data.write();
        let mut row: Vec<Option<Value>> = vec![None; data.schema.columns.len()];
        for (index, value) in assignments {
            let column = data.schema.columns.get(index).ok_or_else(|| {
                StorageError::InvalidOperation(format!(
                    "column index {} out of range for {}",
                    index, self.name
                ))
            })?;
            row[index] = Some(column.data_type.coerce(value)?);
        }

        let mut built = Vec::with_capacity(row.len());
        for (index, value) in row.into_iter().enumerate() {
            let identity = data.schema.columns[index].identity;
            let value = match value {
                Some(Value::Null) | None if identity => {
                    let next = data.next_identity;
                    data.next_identity += 1;
                    Value::Integer(next)
                }
                Some(value) => {
                    if identity {
                        if let Some(n) = value.as_integer() {
                            data.next_identity = data.next_identity.max(n + 1);
                        }
                    }
                    value
                }
                None => Value::Null,
            };
            built.push(value);
        }
        Ok(built)
    }

    /// Coerce a replacement value for one column
    pub fn coerce_value(&self, index: usize, value: Value) -> Result<Value, StorageError> {
        let data = self.data.read();
        let column = data.schema.columns.get(index).ok_or_else(|| {
            StorageError::InvalidOperation(format!(
                "column index {} out of range for {}",
                index, self.name
            ))
        })?;
        column.data_type.coerce(value)
    }

    pub fn allocate_row_id(&self) -> RowId {
        let mut data = self.data.write();
        let id = RowId(data.next_row_id);
        data.next_row_id += 1;
        id
    }

    fn ensure_live(&self) -> Result<(), StorageError> {
        if self.is_dropped() {
            return Err(StorageError::TableDropped(self.name.clone()));
        }
        Ok(())
    }

    pub fn stage_insert(
        &self,
        owner: ConnectionId,
        change: ChangeId,
        row_id: RowId,
        row: Row,
    ) -> Result<(), StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        if data.slots.contains_key(&row_id) {
            return Err(StorageError::InvalidOperation(format!(
                "row {} of {} already exists",
                row_id, self.name
            )));
        }
        data.check_constraints(&row, None)?;
        data.slots.insert(
            row_id,
            RowSlot {
                committed: None,
                pending: Some(PendingVersions {
                    owner,
                    versions: vec![(change, Some(row))],
                }),
            },
        );
        Ok(())
    }

    /// Push a new pending version; returns the version it replaces
    pub fn stage_update(
        &self,
        owner: ConnectionId,
        change: ChangeId,
        row_id: RowId,
        row: Row,
    ) -> Result<Row, StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        data.check_constraints(&row, Some(row_id))?;
        let slot = data.slot_for_write(owner, row_id)?;
        let previous = slot.latest().cloned().unwrap_or_default();
        slot.pending
            .get_or_insert_with(|| PendingVersions {
                owner,
                versions: Vec::new(),
            })
            .versions
            .push((change, Some(row)));
        Ok(previous)
    }

    /// Push a pending delete; returns the deleted version
    pub fn stage_delete(
        &self,
        owner: ConnectionId,
        change: ChangeId,
        row_id: RowId,
    ) -> Result<Row, StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        let slot = data.slot_for_write(owner, row_id)?;
        let previous = slot.latest().cloned().unwrap_or_default();
        slot.pending
            .get_or_insert_with(|| PendingVersions {
                owner,
                versions: Vec::new(),
            })
            .versions
            .push((change, None));
        Ok(previous)
    }

    /// Promote the owner's newest pending version to committed. Calling it
    /// again for the same row is a no-op.
    pub fn commit_row(&self, owner: ConnectionId, row_id: RowId) -> Result<(), StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        let Some(slot) = data.slots.get_mut(&row_id) else {
            return Ok(());
        };
        match slot.pending.take() {
            Some(pending) if pending.owner == owner => {
                slot.committed = pending.versions.into_iter().last().and_then(|(_, row)| row);
            }
            other => slot.pending = other,
        }
        if slot.is_empty() {
            data.slots.remove(&row_id);
        }
        Ok(())
    }

    /// Remove exactly the version produced by `change`
    pub fn rollback_row(&self, owner: ConnectionId, row_id: RowId, change: ChangeId) {
        let mut data = self.data.write();
        let Some(slot) = data.slots.get_mut(&row_id) else {
            return;
        };
        if let Some(pending) = slot.pending.as_mut() {
            if pending.owner == owner {
                pending.versions.retain(|(id, _)| *id != change);
                if pending.versions.is_empty() {
                    slot.pending = None;
                }
            }
        }
        if slot.is_empty() {
            data.slots.remove(&row_id);
        }
    }

    /// Append a column; existing versions get NULL or the next identity value
    pub fn add_column(&self, column: ColumnDef) -> Result<(), StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        if data.schema.column_index(&column.name).is_some() {
            return Err(StorageError::ColumnExists {
                table: self.name.clone(),
                column: column.name,
            });
        }
        if column.primary_key && data.schema.has_primary_key() {
            return Err(StorageError::ConstraintViolation(format!(
                "table {} already has a primary key",
                self.name
            )));
        }
        if column.not_null && !column.identity && !data.slots.is_empty() {
            return Err(StorageError::ConstraintViolation(format!(
                "cannot add NOT NULL column {} to non-empty table {}",
                column.name, self.name
            )));
        }

        let identity = column.identity;
        let mut next_identity = data.next_identity;
        for slot in data.slots.values_mut() {
            let value = if identity {
                next_identity += 1;
                Value::Integer(next_identity - 1)
            } else {
                Value::Null
            };
            for version in slot.versions_mut() {
                version.push(value.clone());
            }
        }
        data.next_identity = next_identity;
        data.schema.columns.push(column);
        data.schema_version += 1;
        Ok(())
    }

    pub fn drop_column(&self, name: &str) -> Result<(), StorageError> {
        self.ensure_live()?;
        let mut data = self.data.write();
        let index = data.schema.require_column(name)?;
        if data.schema.columns.len() == 1 {
            return Err(StorageError::InvalidOperation(format!(
                "cannot drop the only column of {}",
                self.name
            )));
        }
        for slot in data.slots.values_mut() {
            for version in slot.versions_mut() {
                version.remove(index);
            }
        }
        data.schema.columns.remove(index);
        data.schema_version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::DataType;

    fn table() -> Table {
        Table::new(TableSchema::new(
            "t",
            vec![
                ColumnDef::new("id", DataType::Integer).identity().primary_key(),
                ColumnDef::new("v", DataType::Varchar(None)),
            ],
        ))
    }

    fn insert(table: &Table, owner: ConnectionId, v: &str) -> (RowId, ChangeId) {
        let row = table.build_row(vec![(1, Value::from(v))]).unwrap();
        let id = table.allocate_row_id();
        let change = ChangeId::next();
        table.stage_insert(owner, change, id, row).unwrap();
        (id, change)
    }

    #[test]
    fn test_identity_fill() {
        let t = table();
        let a = t.build_row(vec![(1, Value::from("a"))]).unwrap();
        let b = t.build_row(vec![(0, Value::Integer(10))]).unwrap();
        let c = t.build_row(vec![]).unwrap();
        assert_eq!(a[0], Value::Integer(1));
        assert_eq!(b[0], Value::Integer(10));
        assert_eq!(c[0], Value::Integer(11));
        assert_eq!(c[1], Value::Null);
    }

    #[test]
    fn test_uncommitted_insert_visibility() {
        let t = table();
        let writer = ConnectionId::new();
        let reader = ConnectionId::new();
        let (id, _) = insert(&t, writer, "a");

        assert!(matches!(t.visible_row(id, writer, false), RowRead::Row(_)));
        assert_eq!(t.visible_row(id, reader, false), RowRead::Absent);
        assert!(matches!(t.visible_row(id, reader, true), RowRead::Row(_)));

        t.commit_row(writer, id).unwrap();
        assert!(matches!(t.visible_row(id, reader, false), RowRead::Row(_)));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_pending_update_is_foreign_to_others() {
        let t = table();
        let writer = ConnectionId::new();
        let reader = ConnectionId::new();
        let (id, _) = insert(&t, writer, "a");
        t.commit_row(writer, id).unwrap();

        let mut row = t.visible_row(id, writer, false).into_row().unwrap();
        row[1] = Value::from("b");
        t.stage_update(writer, ChangeId::next(), id, row).unwrap();

        assert_eq!(t.visible_row(id, reader, false), RowRead::ForeignPending);
        assert_eq!(
            t.visible_row(id, reader, true).into_row().unwrap()[1],
            Value::from("b")
        );
    }

    #[test]
    fn test_rollback_is_order_independent() {
        let t = table();
        let owner = ConnectionId::new();
        let (id, insert_change) = insert(&t, owner, "a");

        let mut row = t.visible_row(id, owner, false).into_row().unwrap();
        row[1] = Value::from("b");
        let update_change = ChangeId::next();
        t.stage_update(owner, update_change, id, row).unwrap();

        // Front-to-back: the insert goes first, the update still sits on top
        t.rollback_row(owner, id, insert_change);
        assert!(matches!(t.visible_row(id, owner, false), RowRead::Row(_)));
        t.rollback_row(owner, id, update_change);
        assert_eq!(t.visible_row(id, owner, false), RowRead::Absent);
        assert!(t.row_ids().is_empty());
    }

    #[test]
    fn test_commit_promotes_top_and_is_idempotent() {
        let t = table();
        let owner = ConnectionId::new();
        let (id, _) = insert(&t, owner, "a");
        t.stage_delete(owner, ChangeId::next(), id).unwrap();

        t.commit_row(owner, id).unwrap();
        t.commit_row(owner, id).unwrap();
        assert!(t.row_ids().is_empty());
    }

    #[test]
    fn test_unique_violation() {
        let t = table();
        let owner = ConnectionId::new();
        let row = t.build_row(vec![(0, Value::Integer(1))]).unwrap();
        let id = t.allocate_row_id();
        t.stage_insert(owner, ChangeId::next(), id, row.clone()).unwrap();

        let other = t.allocate_row_id();
        let err = t.stage_insert(owner, ChangeId::next(), other, row).unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
    }

    #[test]
    fn test_add_and_drop_column_bump_version() {
        let t = table();
        let owner = ConnectionId::new();
        let (id, _) = insert(&t, owner, "a");
        t.commit_row(owner, id).unwrap();

        let before = t.schema_version();
        t.add_column(ColumnDef::new("extra", DataType::Integer)).unwrap();
        assert_eq!(t.schema_version(), before + 1);
        assert_eq!(t.committed_rows()[0].1.len(), 3);

        t.drop_column("v").unwrap();
        assert_eq!(t.schema().column_names(), vec!["id", "extra"]);
        assert_eq!(t.committed_rows()[0].1.len(), 2);

        let err = t
            .add_column(ColumnDef::new("k", DataType::Integer).primary_key())
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
    }

    #[test]
    fn test_commit_on_dropped_table_fails() {
        let t = table();
        let owner = ConnectionId::new();
        let (id, _) = insert(&t, owner, "a");
        t.mark_dropped();
        assert!(matches!(
            t.commit_row(owner, id),
            Err(StorageError::TableDropped(_))
        ));
    }
}
