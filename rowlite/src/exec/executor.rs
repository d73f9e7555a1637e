// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement executor
//!
//! Runs one parsed statement inside a [`TransactionScope`]. Every statement
//! other than transaction control runs under a log mark: if it fails, the log
//! is rolled back to the mark so the statement leaves no partial effect. On
//! success the scope commits when the connection is in auto-commit mode.
//!
//! DDL is not logged. It runs under exclusive schema and table locks that are
//! released as soon as the structural change is done.

use crate::ast::{
    AlterAction, CreateTable, DeleteStatement, Expression, InsertSource, InsertStatement,
    SelectItems, SelectStatement, Statement, TransactionStatement, UpdateStatement,
};
use crate::exec::context::{GeneratedKeys, StatementContext};
use crate::exec::dml;
use crate::exec::error::ExecutionError;
use crate::exec::expr::Evaluator;
use crate::exec::row_source::{
    ColumnInfo, FetchedRow, MaterializedRows, ReadLocks, RowSource, TableScan,
};
use crate::session::connection::TransactionScope;
use crate::storage::{Row, RowId, RowRead, Table, TableSchema, Value};
use crate::txn::isolation::{ReadGranularity, ReadLockDuration};
use crate::txn::lock::{LockMode, ResourceId};
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// What a statement produced
#[derive(Debug)]
pub(crate) enum StatementOutcome {
    Rows(RowSource),
    Updated {
        count: i64,
        generated_keys: Option<MaterializedRows>,
    },
}

impl StatementOutcome {
    fn count(count: i64) -> Self {
        StatementOutcome::Updated {
            count,
            generated_keys: None,
        }
    }
}

/// Execute a statement as one atomic operation of the connection
pub(crate) fn execute_statement(
    scope: &mut TransactionScope<'_>,
    statement: &Statement,
    parameters: &[Value],
    context: &StatementContext,
    max_rows: usize,
) -> Result<StatementOutcome, ExecutionError> {
    if let Statement::Transaction(control) = statement {
        execute_transaction(scope, control)?;
        return Ok(StatementOutcome::count(0));
    }

    let mark = scope.mark();
    let result = match statement {
        Statement::Select(select) => {
            run_query(scope, select, parameters, max_rows).map(StatementOutcome::Rows)
        }
        Statement::Insert(insert) => execute_insert(scope, insert, parameters, context),
        Statement::Update(update) => {
            execute_update(scope, update, parameters).map(StatementOutcome::count)
        }
        Statement::Delete(delete) => {
            execute_delete(scope, delete, parameters).map(StatementOutcome::count)
        }
        Statement::CreateTable(create) => {
            create_table(scope, create).map(|_| StatementOutcome::count(0))
        }
        Statement::DropTable { table } => {
            drop_table(scope, table).map(|_| StatementOutcome::count(0))
        }
        Statement::AlterTable { table, action } => {
            alter_table(scope, table, action).map(|_| StatementOutcome::count(0))
        }
        Statement::Transaction(_) => unreachable!("handled above"),
    };

    match result {
        Ok(outcome) => {
            scope.finish_statement()?;
            Ok(outcome)
        }
        Err(err) => {
            debug!("Statement failed, rolling back to log index {}: {}", mark, err);
            scope.rollback_to_mark(mark);
            Err(err)
        }
    }
}

fn execute_transaction(
    scope: &mut TransactionScope<'_>,
    statement: &TransactionStatement,
) -> Result<(), ExecutionError> {
    let state = scope.state();
    match statement {
        TransactionStatement::Commit => state.commit(),
        TransactionStatement::Rollback => state.rollback(),
        TransactionStatement::Savepoint(name) => {
            state.set_savepoint(Some(name.as_str())).map(|_| ())
        }
        TransactionStatement::RollbackToSavepoint(name) => state.rollback_to_named(name),
        TransactionStatement::ReleaseSavepoint(name) => state.release_named(name),
        TransactionStatement::SetAutoCommit(auto_commit) => state.set_auto_commit(*auto_commit),
        TransactionStatement::SetIsolationLevel(level) => state.set_isolation(*level),
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

fn with_ddl_locks<'a, T, F>(
    scope: &mut TransactionScope<'a>,
    table: &str,
    action: F,
) -> Result<T, ExecutionError>
where
    F: FnOnce(&mut TransactionScope<'a>) -> Result<T, ExecutionError>,
{
    let schema_lock = scope.lock(ResourceId::schema(table), LockMode::Exclusive)?;
    let table_lock = match scope.lock(ResourceId::table(table), LockMode::Exclusive) {
        Ok(handle) => handle,
        Err(err) => {
            scope.release(schema_lock);
            return Err(err);
        }
    };
    let result = action(scope);
    scope.release(table_lock);
    scope.release(schema_lock);
    result
}

fn create_table(scope: &mut TransactionScope<'_>, create: &CreateTable) -> Result<(), ExecutionError> {
    let schema = TableSchema::new(create.table.clone(), create.columns.clone());
    with_ddl_locks(scope, &create.table, |scope| {
        scope.storage().create_table(schema)?;
        Ok(())
    })
}

fn drop_table(scope: &mut TransactionScope<'_>, table: &str) -> Result<(), ExecutionError> {
    let name = scope.storage().get_table(table)?.name().to_string();
    with_ddl_locks(scope, &name, |scope| {
        scope.storage().drop_table(&name)?;
        let discarded = scope.discard_for_resource(&name);
        if discarded > 0 {
            info!("Discarded {} pending changes of dropped table {}", discarded, name);
        }
        Ok(())
    })
}

fn alter_table(
    scope: &mut TransactionScope<'_>,
    table: &str,
    action: &AlterAction,
) -> Result<(), ExecutionError> {
    let table = scope.storage().get_table(table)?;
    with_ddl_locks(scope, table.name(), |_| {
        match action {
            AlterAction::AddColumn(column) => table.add_column(column.clone())?,
            AlterAction::DropColumn(name) => table.drop_column(name)?,
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Rows of one table that passed the filter
struct Scan {
    table: Arc<Table>,
    schema: TableSchema,
    schema_version: u64,
    rows: Vec<(RowId, Row)>,
    read_locks: ReadLocks,
}

fn scan_table(
    scope: &mut TransactionScope<'_>,
    table: &str,
    filter: Option<&Expression>,
    parameters: &[Value],
) -> Result<Scan, ExecutionError> {
    let table = scope.storage().get_table(table)?;
    let policy = scope.policy();
    let duration = policy.statement_locks();
    let granularity = policy.granularity();

    let mut read_locks = ReadLocks::new(table.name());
    let transient = read_locks.begin(scope, duration, granularity)?;
    let schema = table.schema();
    let schema_version = table.schema_version();
    let rows = collect_rows(
        scope,
        &table,
        &schema,
        &mut read_locks,
        filter,
        parameters,
        duration,
        granularity,
    );
    read_locks.finish(scope, transient);

    Ok(Scan {
        table,
        schema,
        schema_version,
        rows: rows?,
        read_locks,
    })
}

#[allow(clippy::too_many_arguments)]
fn collect_rows(
    scope: &mut TransactionScope<'_>,
    table: &Table,
    schema: &TableSchema,
    read_locks: &mut ReadLocks,
    filter: Option<&Expression>,
    parameters: &[Value],
    duration: ReadLockDuration,
    granularity: ReadGranularity,
) -> Result<Vec<(RowId, Row)>, ExecutionError> {
    if let Some(filter) = filter {
        check_columns(filter, schema)?;
    }
    let evaluator = Evaluator::new(schema, parameters);
    let mut rows = Vec::new();
    for row_id in table.row_ids() {
        let Some(row) = read_locks.read_row(scope, table, row_id, duration, granularity)? else {
            continue;
        };
        if evaluator.matches(filter, &row)? {
            rows.push((row_id, row));
        }
    }
    Ok(rows)
}

/// Reject references to columns the table does not have
fn check_columns(expression: &Expression, schema: &TableSchema) -> Result<(), ExecutionError> {
    match expression {
        Expression::Column(name) => {
            schema.require_column(name)?;
        }
        Expression::Unary { operand, .. } | Expression::IsNull { operand, .. } => {
            check_columns(operand, schema)?
        }
        Expression::Binary { left, right, .. } => {
            check_columns(left, schema)?;
            check_columns(right, schema)?;
        }
        Expression::Aggregate {
            argument: Some(argument),
            ..
        } => check_columns(argument, schema)?,
        Expression::Aggregate { argument: None, .. }
        | Expression::Literal(_)
        | Expression::Parameter(_) => {}
    }
    Ok(())
}

fn effective_limit(top: Option<u64>, max_rows: usize) -> Option<usize> {
    let top = top.map(|n| usize::try_from(n).unwrap_or(usize::MAX));
    match (top, max_rows) {
        (Some(top), 0) => Some(top),
        (Some(top), max) => Some(top.min(max)),
        (None, 0) => None,
        (None, max) => Some(max),
    }
}

/// ORDER BY keys with select-list aliases and ordinals resolved
fn order_keys(select: &SelectStatement, schema: &TableSchema) -> Vec<(Expression, bool)> {
    select
        .order_by
        .iter()
        .map(|item| {
            let resolved = match (&item.expression, &select.items) {
                (Expression::Column(name), SelectItems::Explicit(items)) => items
                    .iter()
                    .find(|i| {
                        i.alias
                            .as_deref()
                            .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
                    })
                    .map(|i| i.expression.clone()),
                (Expression::Literal(Value::Integer(n)), SelectItems::Explicit(items)) => {
                    usize::try_from(*n)
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| items.get(i))
                        .map(|i| i.expression.clone())
                }
                (Expression::Literal(Value::Integer(n)), SelectItems::Wildcard) => {
                    usize::try_from(*n)
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| schema.columns.get(i))
                        .map(|c| Expression::Column(c.name.clone()))
                }
                _ => None,
            };
            (resolved.unwrap_or_else(|| item.expression.clone()), item.descending)
        })
        .collect()
}

fn compare_keys(a: &[Value], b: &[Value], descending: &[bool]) -> Ordering {
    for ((x, y), desc) in a.iter().zip(b).zip(descending) {
        let ordering = x.sort_cmp(y);
        if ordering != Ordering::Equal {
            return if *desc { ordering.reverse() } else { ordering };
        }
    }
    Ordering::Equal
}

/// Sort items by precomputed keys, keeping the original order for ties
fn sort_by_keys<T>(items: Vec<(Vec<Value>, T)>, descending: &[bool]) -> Vec<T> {
    let mut items = items;
    items.sort_by(|(a, _), (b, _)| compare_keys(a, b, descending));
    items.into_iter().map(|(_, item)| item).collect()
}

/// Projection of plain column references, if the select list is one
fn plain_projection(
    select: &SelectStatement,
    schema: &TableSchema,
) -> Result<Option<(Vec<usize>, Vec<ColumnInfo>)>, ExecutionError> {
    let table_column = |index: usize, label: String| ColumnInfo {
        name: label,
        data_type: Some(schema.columns[index].data_type.clone()),
        table_column: Some(index),
    };
    match &select.items {
        SelectItems::Wildcard => {
            let projection: Vec<usize> = (0..schema.columns.len()).collect();
            let columns = projection
                .iter()
                .map(|i| table_column(*i, schema.columns[*i].name.clone()))
                .collect();
            Ok(Some((projection, columns)))
        }
        SelectItems::Explicit(items) => {
            let mut projection = Vec::with_capacity(items.len());
            let mut columns = Vec::with_capacity(items.len());
            for item in items {
                let Expression::Column(name) = &item.expression else {
                    return Ok(None);
                };
                let index = schema.require_column(name)?;
                let label = item
                    .alias
                    .clone()
                    .unwrap_or_else(|| schema.columns[index].name.clone());
                projection.push(index);
                columns.push(table_column(index, label));
            }
            Ok(Some((projection, columns)))
        }
    }
}

/// Run a SELECT and describe its result rows
pub(crate) fn run_query(
    scope: &mut TransactionScope<'_>,
    select: &SelectStatement,
    parameters: &[Value],
    max_rows: usize,
) -> Result<RowSource, ExecutionError> {
    let scan = scan_table(scope, &select.from, select.where_clause.as_ref(), parameters)?;
    let limit = effective_limit(select.top, max_rows);
    let keys = order_keys(select, &scan.schema);
    for (expression, _) in &keys {
        check_columns(expression, &scan.schema)?;
    }
    let descending: Vec<bool> = keys.iter().map(|(_, desc)| *desc).collect();
    debug!(
        "Query on {} matched {} rows",
        scan.table.name(),
        scan.rows.len()
    );

    if select.is_grouped() {
        return grouped_rows(select, scan, parameters, &keys, &descending, limit)
            .map(RowSource::Materialized);
    }

    let evaluator = Evaluator::new(&scan.schema, parameters);
    let mut keyed = Vec::with_capacity(scan.rows.len());
    for (row_id, row) in &scan.rows {
        let key = keys
            .iter()
            .map(|(expression, _)| evaluator.evaluate(expression, row))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.push((key, (*row_id, row)));
    }
    let mut ordered = sort_by_keys(keyed, &descending);
    if let Some(limit) = limit {
        ordered.truncate(limit);
    }

    if let Some((projection, columns)) = plain_projection(select, &scan.schema)? {
        let row_ids = ordered.iter().map(|(row_id, _)| *row_id).collect();
        return Ok(RowSource::Table(TableScan::new(
            scan.table.clone(),
            scan.schema_version,
            row_ids,
            projection,
            columns,
            scan.read_locks,
        )));
    }

    let SelectItems::Explicit(items) = &select.items else {
        return Err(ExecutionError::InvalidState(
            "wildcard projection is always plain".into(),
        ));
    };
    for item in items {
        check_columns(&item.expression, &scan.schema)?;
    }
    let columns = items.iter().map(|i| ColumnInfo::computed(i.label())).collect();
    let mut rows = Vec::with_capacity(ordered.len());
    for (_, row) in ordered {
        rows.push(
            items
                .iter()
                .map(|item| evaluator.evaluate(&item.expression, row))
                .collect::<Result<Row, _>>()?,
        );
    }
    Ok(RowSource::Materialized(MaterializedRows::new(columns, rows)))
}

fn grouped_rows(
    select: &SelectStatement,
    scan: Scan,
    parameters: &[Value],
    keys: &[(Expression, bool)],
    descending: &[bool],
    limit: Option<usize>,
) -> Result<MaterializedRows, ExecutionError> {
    let SelectItems::Explicit(items) = &select.items else {
        return Err(ExecutionError::UnsupportedOperation(
            "SELECT * cannot be combined with GROUP BY or aggregates".into(),
        ));
    };
    for expression in items
        .iter()
        .map(|i| &i.expression)
        .chain(&select.group_by)
        .chain(&select.having)
    {
        check_columns(expression, &scan.schema)?;
    }
    let evaluator = Evaluator::new(&scan.schema, parameters);

    let mut groups: Vec<Vec<Row>> = Vec::new();
    if select.group_by.is_empty() {
        groups.push(scan.rows.into_iter().map(|(_, row)| row).collect());
    } else {
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        for (_, row) in scan.rows {
            let key = select
                .group_by
                .iter()
                .map(|expression| evaluator.evaluate(expression, &row))
                .collect::<Result<Vec<_>, _>>()?;
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }
    }

    let mut keyed = Vec::with_capacity(groups.len());
    for rows in &groups {
        if let Some(having) = &select.having {
            if !evaluator.evaluate_group(having, rows)?.is_truthy() {
                continue;
            }
        }
        let output = items
            .iter()
            .map(|item| evaluator.evaluate_group(&item.expression, rows))
            .collect::<Result<Row, _>>()?;
        let key = keys
            .iter()
            .map(|(expression, _)| evaluator.evaluate_group(expression, rows))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.push((key, output));
    }
    let mut rows = sort_by_keys(keyed, descending);
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    let columns = items.iter().map(|i| ColumnInfo::computed(i.label())).collect();
    Ok(MaterializedRows::new(columns, rows))
}

/// Produce every row of a source, skipping rows that vanished
fn materialize(
    scope: &mut TransactionScope<'_>,
    source: &mut RowSource,
) -> Result<Vec<Row>, ExecutionError> {
    let mut rows = Vec::with_capacity(source.len());
    for index in 0..source.len() {
        if let FetchedRow::Row(row) = source.fetch(scope, index)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

/// Schema lock writers hold while a statement runs
fn writer_lock_duration(scope: &TransactionScope<'_>) -> ReadLockDuration {
    match scope.policy().statement_locks() {
        ReadLockDuration::None => ReadLockDuration::Transient,
        other => other,
    }
}

fn execute_insert(
    scope: &mut TransactionScope<'_>,
    insert: &InsertStatement,
    parameters: &[Value],
    context: &StatementContext,
) -> Result<StatementOutcome, ExecutionError> {
    let table = scope.storage().get_table(&insert.table)?;

    // The source query takes its own read locks
    let source_rows = match &insert.source {
        InsertSource::Values(rows) => {
            let evaluator = Evaluator::constant(parameters);
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|expression| evaluator.evaluate(expression, &[]))
                        .collect::<Result<Row, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        InsertSource::Select(select) => {
            let mut source = run_query(scope, select, parameters, 0)?;
            materialize(scope, &mut source)?
        }
    };

    let duration = writer_lock_duration(scope);
    let mut read_locks = ReadLocks::new(table.name());
    let transient = read_locks.begin(scope, duration, ReadGranularity::Row)?;
    let result = insert_rows(scope, &table, insert, source_rows);
    read_locks.finish(scope, transient);
    let inserted = result?;

    let count = inserted.len() as i64;
    info!("Inserted {} rows into {}", count, table.name());
    let generated_keys = if context.generated_keys.is_requested() {
        Some(generated_keys(&table.schema(), &context.generated_keys, &inserted)?)
    } else {
        None
    };
    Ok(StatementOutcome::Updated {
        count,
        generated_keys,
    })
}

fn insert_rows(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    insert: &InsertStatement,
    source_rows: Vec<Row>,
) -> Result<Vec<Row>, ExecutionError> {
    let schema = table.schema();
    let targets = match &insert.columns {
        Some(names) => names
            .iter()
            .map(|name| schema.require_column(name))
            .collect::<Result<Vec<_>, _>>()?,
        None => (0..schema.columns.len()).collect(),
    };

    let mut inserted = Vec::with_capacity(source_rows.len());
    for values in source_rows {
        if values.len() != targets.len() {
            return Err(ExecutionError::InvalidArgument(format!(
                "INSERT into {} has {} values for {} columns",
                table.name(),
                values.len(),
                targets.len()
            )));
        }
        let assignments = targets.iter().copied().zip(values).collect();
        let (_, row) = dml::insert_row(scope, table, assignments)?;
        inserted.push(row);
    }
    Ok(inserted)
}

/// Columns reported as generated keys for a table
pub(crate) fn generated_key_columns(
    schema: &TableSchema,
    request: &GeneratedKeys,
) -> Result<Vec<usize>, ExecutionError> {
    match request {
        GeneratedKeys::None => Err(ExecutionError::GeneratedKeysNotRequested),
        GeneratedKeys::Auto => {
            let identity = schema.identity_columns();
            if !identity.is_empty() {
                return Ok(identity);
            }
            let primary_key = schema.primary_key_columns();
            if !primary_key.is_empty() {
                return Ok(primary_key);
            }
            Ok((0..schema.columns.len()).collect())
        }
        GeneratedKeys::ColumnNames(names) => names
            .iter()
            .map(|name| schema.require_column(name).map_err(ExecutionError::from))
            .collect(),
        GeneratedKeys::ColumnIndexes(indexes) => indexes
            .iter()
            .map(|index| {
                index
                    .checked_sub(1)
                    .filter(|i| *i < schema.columns.len())
                    .ok_or_else(|| {
                        ExecutionError::InvalidArgument(format!(
                            "column index {} out of range for {}",
                            index, schema.name
                        ))
                    })
            })
            .collect(),
    }
}

fn generated_keys(
    schema: &TableSchema,
    request: &GeneratedKeys,
    inserted: &[Row],
) -> Result<MaterializedRows, ExecutionError> {
    let key_columns = generated_key_columns(schema, request)?;
    let columns = key_columns
        .iter()
        .map(|i| ColumnInfo {
            name: schema.columns[*i].name.clone(),
            data_type: Some(schema.columns[*i].data_type.clone()),
            table_column: None,
        })
        .collect();
    let rows = inserted
        .iter()
        .map(|row| key_columns.iter().map(|i| row[*i].clone()).collect())
        .collect();
    Ok(MaterializedRows::new(columns, rows))
}

fn execute_update(
    scope: &mut TransactionScope<'_>,
    update: &UpdateStatement,
    parameters: &[Value],
) -> Result<i64, ExecutionError> {
    let table = scope.storage().get_table(&update.table)?;
    let duration = writer_lock_duration(scope);
    let mut read_locks = ReadLocks::new(table.name());
    let transient = read_locks.begin(scope, duration, ReadGranularity::Row)?;
    let result = update_rows(scope, &table, update, parameters);
    read_locks.finish(scope, transient);
    let count = result?;
    info!("Updated {} rows of {}", count, table.name());
    Ok(count)
}

fn update_rows(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    update: &UpdateStatement,
    parameters: &[Value],
) -> Result<i64, ExecutionError> {
    let schema = table.schema();
    let filter = update.where_clause.as_ref();
    if let Some(filter) = filter {
        check_columns(filter, &schema)?;
    }
    let mut assignments = Vec::with_capacity(update.assignments.len());
    for (column, expression) in &update.assignments {
        check_columns(expression, &schema)?;
        assignments.push((schema.require_column(column)?, expression));
    }
    let evaluator = Evaluator::new(&schema, parameters);

    let mut count = 0;
    for row_id in table.row_ids() {
        match table.visible_row(row_id, scope.owner(), false) {
            RowRead::Absent => continue,
            RowRead::Row(row) if !evaluator.matches(filter, &row)? => continue,
            _ => {}
        }
        let updated = dml::update_row(scope, table, row_id, |current| {
            if !evaluator.matches(filter, current)? {
                return Ok(None);
            }
            let mut replacement = current.clone();
            for (index, expression) in &assignments {
                let value = evaluator.evaluate(expression, current)?;
                replacement[*index] = table.coerce_value(*index, value)?;
            }
            Ok(Some(replacement))
        })?;
        if updated {
            count += 1;
        }
    }
    Ok(count)
}

fn execute_delete(
    scope: &mut TransactionScope<'_>,
    delete: &DeleteStatement,
    parameters: &[Value],
) -> Result<i64, ExecutionError> {
    let table = scope.storage().get_table(&delete.table)?;
    let duration = writer_lock_duration(scope);
    let mut read_locks = ReadLocks::new(table.name());
    let transient = read_locks.begin(scope, duration, ReadGranularity::Row)?;
    let result = delete_rows(scope, &table, delete, parameters);
    read_locks.finish(scope, transient);
    let count = result?;
    info!("Deleted {} rows from {}", count, table.name());
    Ok(count)
}

fn delete_rows(
    scope: &mut TransactionScope<'_>,
    table: &Arc<Table>,
    delete: &DeleteStatement,
    parameters: &[Value],
) -> Result<i64, ExecutionError> {
    let schema = table.schema();
    let filter = delete.where_clause.as_ref();
    if let Some(filter) = filter {
        check_columns(filter, &schema)?;
    }
    let evaluator = Evaluator::new(&schema, parameters);

    let mut count = 0;
    for row_id in table.row_ids() {
        match table.visible_row(row_id, scope.owner(), false) {
            RowRead::Absent => continue,
            RowRead::Row(row) if !evaluator.matches(filter, &row)? => continue,
            _ => {}
        }
        if dml::delete_row(scope, table, row_id, |current| evaluator.matches(filter, current))? {
            count += 1;
        }
    }
    Ok(count)
}
