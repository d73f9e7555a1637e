// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statements and prepared statements
//!
//! A [`Statement`] runs SQL text given at execution time; a
//! [`PreparedStatement`] is parsed once and re-executed with new parameter
//! values. Both keep the outcome of their last execution (a result set or an
//! update count) until the next execution or `close()`.

use crate::error::{Error, Result};
use crate::result::ResultSet;
use log::debug;
use rowlite::{
    Command, ConnectionContext, DataType, ExecutionError, GeneratedKeys, StatementContext, Value,
};
use std::sync::Arc;

/// Statement executing ad-hoc SQL text
///
/// # Examples
///
/// ```no_run
/// # use rowlite_sdk::Database;
/// # let db = Database::open_in_memory();
/// # let conn = db.connect();
/// let mut stmt = conn.create_statement()?;
/// stmt.add_batch("INSERT INTO t VALUES (1)");
/// stmt.add_batch("INSERT INTO t VALUES (2)");
/// let counts = stmt.execute_batch()?;
/// assert_eq!(counts, vec![1, 1]);
/// # Ok::<(), rowlite_sdk::Error>(())
/// ```
#[derive(Debug)]
pub struct Statement {
    connection: Arc<ConnectionContext>,
    context: StatementContext,
    command: Option<Command>,
    batch: Vec<String>,
    max_rows: usize,
    closed: bool,
}

impl Statement {
    pub(crate) fn new(connection: Arc<ConnectionContext>, context: StatementContext) -> Self {
        Statement {
            connection,
            context,
            command: None,
            batch: Vec::new(),
            max_rows: 0,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ExecutionError::StatementClosed.into());
        }
        Ok(())
    }

    fn run(&mut self, sql: &str, context: &StatementContext) -> Result<bool> {
        self.ensure_open()?;
        if let Some(mut previous) = self.command.take() {
            previous.close_results();
        }
        let mut command = Command::prepare(sql)?;
        command.set_max_rows(self.max_rows);
        let has_result = command.execute(&self.connection, context)?;
        self.command = Some(command);
        Ok(has_result)
    }

    /// Execute any statement. Returns `true` when it produced a result set.
    pub fn execute(&mut self, sql: &str) -> Result<bool> {
        let context = self.context.clone();
        self.run(sql, &context)
    }

    /// Execute a query and return its result set
    pub fn execute_query(&mut self, sql: &str) -> Result<ResultSet> {
        if !self.execute(sql)? {
            return Err(ExecutionError::InvalidState(format!(
                "statement did not produce a result set: {}",
                sql
            ))
            .into());
        }
        self.result_set()
            .ok_or_else(|| Error::NotFound("result set".into()))
    }

    /// Execute DML or DDL and return the number of affected rows
    pub fn execute_update(&mut self, sql: &str) -> Result<i64> {
        let context = self.context.clone();
        self.update(sql, &context)
    }

    /// Execute an insert and keep the keys it generated for
    /// [`generated_keys`](Self::generated_keys)
    pub fn execute_update_with_keys(&mut self, sql: &str, keys: GeneratedKeys) -> Result<i64> {
        let context = self.context.clone().with_generated_keys(keys);
        self.update(sql, &context)
    }

    fn update(&mut self, sql: &str, context: &StatementContext) -> Result<i64> {
        if self.run(sql, context)? {
            if let Some(command) = self.command.as_mut() {
                command.close_results();
            }
            return Err(ExecutionError::InvalidState(format!(
                "statement produced a result set: {}",
                sql
            ))
            .into());
        }
        Ok(self.update_count().unwrap_or(0))
    }

    /// Take the result set of the last execution
    pub fn result_set(&mut self) -> Option<ResultSet> {
        self.command
            .as_mut()
            .and_then(|command| command.take_result_cursor())
            .map(ResultSet::new)
    }

    /// Update count of the last execution, `None` after a query
    pub fn update_count(&self) -> Option<i64> {
        self.command.as_ref().and_then(|command| command.update_count())
    }

    /// Advance past the current outcome; a statement has only one
    pub fn more_results(&mut self) -> bool {
        match self.command.as_mut() {
            Some(command) => command.has_more_results(),
            None => false,
        }
    }

    /// Keys generated by the last `execute_update_with_keys`
    pub fn generated_keys(&mut self) -> Result<ResultSet> {
        self.ensure_open()?;
        let command = self
            .command
            .as_mut()
            .ok_or(ExecutionError::GeneratedKeysNotRequested)?;
        Ok(ResultSet::new(command.generated_keys()?))
    }

    pub fn add_batch(&mut self, sql: &str) {
        self.batch.push(sql.to_string());
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Run every queued statement; the queue is emptied either way
    pub fn execute_batch(&mut self) -> Result<Vec<i64>> {
        self.ensure_open()?;
        let statements = std::mem::take(&mut self.batch);
        debug!("Statement batch of {} items", statements.len());
        Ok(Command::execute_sql_batch(
            &self.connection,
            &self.context,
            statements,
        )?)
    }

    /// Limit on rows of future result sets, `0` for no limit
    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn close(&mut self) {
        if let Some(mut command) = self.command.take() {
            command.close_results();
        }
        self.batch.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Pre-parsed statement with `?` parameters
///
/// # Examples
///
/// ```no_run
/// # use rowlite_sdk::Database;
/// # let db = Database::open_in_memory();
/// # let conn = db.connect();
/// let mut insert = conn.prepare_statement("INSERT INTO accounts VALUES (?, ?, ?)")?;
/// for (id, name) in [(1, "alice"), (2, "bob")] {
///     insert.set_int(1, id)?;
///     insert.set_string(2, name)?;
///     insert.set_long(3, 100)?;
///     insert.add_batch()?;
/// }
/// insert.execute_batch()?;
/// # Ok::<(), rowlite_sdk::Error>(())
/// ```
#[derive(Debug)]
pub struct PreparedStatement {
    connection: Arc<ConnectionContext>,
    context: StatementContext,
    command: Command,
    batch: Vec<Vec<Value>>,
    closed: bool,
}

impl PreparedStatement {
    pub(crate) fn new(
        connection: Arc<ConnectionContext>,
        sql: &str,
        context: StatementContext,
    ) -> Result<Self> {
        Ok(PreparedStatement {
            connection,
            context,
            command: Command::prepare(sql)?,
            batch: Vec::new(),
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ExecutionError::StatementClosed.into());
        }
        Ok(())
    }

    pub fn sql(&self) -> &str {
        self.command.sql()
    }

    pub fn parameter_count(&self) -> usize {
        self.command.parameter_count()
    }

    fn bind(&mut self, index: usize, value: Value, hint: Option<&DataType>) -> Result<()> {
        self.ensure_open()?;
        Ok(self.command.bind_parameter(index, value, hint)?)
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.bind(index, value.into(), Some(&DataType::Integer))
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<()> {
        self.bind(index, value.into(), Some(&DataType::BigInt))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.bind(index, value.into(), Some(&DataType::Double))
    }

    pub fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.bind(index, value.into(), None)
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.bind(index, value.into(), Some(&DataType::Boolean))
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.bind(index, Value::Null, None)
    }

    /// Bind a value as is, without conversion
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        self.bind(index, value, None)
    }

    pub fn clear_parameters(&mut self) {
        self.command.clear_parameters();
    }

    pub fn execute(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.command.execute(&self.connection, &self.context)?)
    }

    pub fn execute_query(&mut self) -> Result<ResultSet> {
        if !self.execute()? {
            return Err(ExecutionError::InvalidState(format!(
                "statement did not produce a result set: {}",
                self.command.sql()
            ))
            .into());
        }
        self.result_set()
            .ok_or_else(|| Error::NotFound("result set".into()))
    }

    pub fn execute_update(&mut self) -> Result<i64> {
        self.ensure_open()?;
        Ok(self.command.execute_update(&self.connection, &self.context)?)
    }

    pub fn result_set(&mut self) -> Option<ResultSet> {
        self.command.take_result_cursor().map(ResultSet::new)
    }

    pub fn update_count(&self) -> Option<i64> {
        self.command.update_count()
    }

    pub fn generated_keys(&mut self) -> Result<ResultSet> {
        self.ensure_open()?;
        Ok(ResultSet::new(self.command.generated_keys()?))
    }

    /// Queue the currently bound parameter values
    pub fn add_batch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.batch.push(self.command.bound_parameters()?);
        Ok(())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Execute once per queued parameter set; the queue is emptied either way
    pub fn execute_batch(&mut self) -> Result<Vec<i64>> {
        self.ensure_open()?;
        let sets = std::mem::take(&mut self.batch);
        Ok(self
            .command
            .execute_batch(&self.connection, &self.context, sets)?)
    }

    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.command.set_max_rows(max_rows);
    }

    pub fn close(&mut self) {
        self.command.close_results();
        self.batch.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
