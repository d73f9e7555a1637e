// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Prepared commands
//!
//! A [`Command`] is a parsed statement together with its bound parameters and
//! the outcome of its last execution: either a result [`Cursor`] or an update
//! count (plus generated keys for inserts that asked for them). Executing the
//! command again replaces the previous outcome.

use crate::ast::{parse_statement, ParserError, Statement};
use crate::exec::batch::{run_batch, BatchUpdateError};
use crate::exec::context::{Concurrency, CursorType, StatementContext};
use crate::exec::cursor::Cursor;
use crate::exec::error::ExecutionError;
use crate::exec::executor::{execute_statement, StatementOutcome};
use crate::exec::row_source::{MaterializedRows, RowSource};
use crate::session::connection::ConnectionContext;
use crate::storage::{DataType, Value};
use log::debug;
use std::sync::Arc;

impl From<ParserError> for ExecutionError {
    fn from(error: ParserError) -> Self {
        ExecutionError::SyntaxError(error.to_string())
    }
}

/// A parsed statement ready to run on a connection
#[derive(Debug)]
pub struct Command {
    sql: String,
    statement: Statement,
    parameters: Vec<Option<Value>>,
    max_rows: usize,
    result: Option<Cursor>,
    update_count: Option<i64>,
    keys_requested: bool,
    generated_keys: Option<Cursor>,
}

impl Command {
    /// Parse `sql` into a command
    pub fn prepare(sql: &str) -> Result<Self, ExecutionError> {
        let parsed = parse_statement(sql)?;
        debug!(
            "Prepared statement with {} parameters: {}",
            parsed.parameter_count, sql
        );
        Ok(Self {
            sql: sql.to_string(),
            statement: parsed.statement,
            parameters: vec![None; parsed.parameter_count],
            max_rows: 0,
            result: None,
            update_count: None,
            keys_requested: false,
            generated_keys: None,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the statement produces a result set
    pub fn is_query(&self) -> bool {
        matches!(self.statement, Statement::Select(_))
    }

    /// Bind the 1-based parameter `index`, coercing to `type_hint` if given
    pub fn bind_parameter(
        &mut self,
        index: usize,
        value: Value,
        type_hint: Option<&DataType>,
    ) -> Result<(), ExecutionError> {
        if index == 0 || index > self.parameters.len() {
            return Err(ExecutionError::ParameterError(format!(
                "parameter index {} out of range 1..{}",
                index,
                self.parameters.len()
            )));
        }
        let value = match type_hint {
            Some(data_type) => data_type.coerce(value)?,
            None => value,
        };
        self.parameters[index - 1] = Some(value);
        Ok(())
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.iter_mut().for_each(|p| *p = None);
    }

    /// Limit result cursors to `max_rows` rows; `0` means no limit
    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Current parameter values, failing if any is unbound
    pub fn bound_parameters(&self) -> Result<Vec<Value>, ExecutionError> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, value)| {
                value.clone().ok_or_else(|| {
                    ExecutionError::ParameterError(format!("parameter {} is not bound", i + 1))
                })
            })
            .collect()
    }

    /// Drop the outcome of the previous execution
    pub fn close_results(&mut self) {
        if let Some(mut cursor) = self.result.take() {
            cursor.close();
        }
        if let Some(mut keys) = self.generated_keys.take() {
            keys.close();
        }
        self.update_count = None;
        self.keys_requested = false;
    }

    /// Run the command. Returns `true` when it produced a result cursor.
    pub fn execute(
        &mut self,
        connection: &Arc<ConnectionContext>,
        context: &StatementContext,
    ) -> Result<bool, ExecutionError> {
        self.close_results();
        let parameters = self.bound_parameters()?;
        debug!("Connection {} executing: {}", connection.id(), self.sql);

        let outcome = {
            let mut scope = connection.scope()?;
            execute_statement(
                &mut scope,
                &self.statement,
                &parameters,
                context,
                self.max_rows,
            )?
        };

        match outcome {
            StatementOutcome::Rows(source) => {
                self.result = Some(Cursor::new(connection.clone(), source, context));
                Ok(true)
            }
            StatementOutcome::Updated {
                count,
                generated_keys,
            } => {
                self.update_count = Some(count);
                if context.generated_keys.is_requested() {
                    let keys = generated_keys
                        .unwrap_or_else(|| MaterializedRows::new(Vec::new(), Vec::new()));
                    self.keys_requested = true;
                    self.generated_keys = Some(Cursor::new(
                        connection.clone(),
                        RowSource::Materialized(keys),
                        &StatementContext::new(CursorType::ScrollSensitive, Concurrency::ReadOnly),
                    ));
                }
                Ok(false)
            }
        }
    }

    /// Cursor of the last execution, if it produced one
    pub fn result_cursor(&mut self) -> Option<&mut Cursor> {
        self.result.as_mut()
    }

    pub fn take_result_cursor(&mut self) -> Option<Cursor> {
        self.result.take()
    }

    /// Row count of the last execution, `None` if it produced a cursor
    pub fn update_count(&self) -> Option<i64> {
        self.update_count
    }

    /// Move past the current outcome. A command has a single outcome, so this
    /// closes it and returns `false`.
    pub fn has_more_results(&mut self) -> bool {
        if let Some(mut cursor) = self.result.take() {
            cursor.close();
        }
        self.update_count = None;
        false
    }

    /// Keys generated by the last insert
    pub fn generated_keys(&mut self) -> Result<Cursor, ExecutionError> {
        if !self.keys_requested {
            return Err(ExecutionError::GeneratedKeysNotRequested);
        }
        self.generated_keys.take().ok_or_else(|| {
            ExecutionError::InvalidState("generated keys were already retrieved".into())
        })
    }

    /// Run the command once per parameter set
    pub fn execute_batch(
        &mut self,
        connection: &Arc<ConnectionContext>,
        context: &StatementContext,
        parameter_sets: Vec<Vec<Value>>,
    ) -> Result<Vec<i64>, BatchUpdateError> {
        debug!(
            "Executing batch of {} parameter sets: {}",
            parameter_sets.len(),
            self.sql
        );
        run_batch(parameter_sets, |values| {
            if values.len() != self.parameters.len() {
                return Err(ExecutionError::ParameterError(format!(
                    "batch item has {} values for {} parameters",
                    values.len(),
                    self.parameters.len()
                )));
            }
            self.parameters = values.into_iter().map(Some).collect();
            self.execute_update(connection, context)
        })
    }

    /// Execute and return the update count, rejecting result sets
    pub fn execute_update(
        &mut self,
        connection: &Arc<ConnectionContext>,
        context: &StatementContext,
    ) -> Result<i64, ExecutionError> {
        if self.execute(connection, context)? {
            self.close_results();
            return Err(ExecutionError::InvalidState(format!(
                "statement produced a result set: {}",
                self.sql
            )));
        }
        Ok(self.update_count.unwrap_or(0))
    }

    /// Run unrelated SQL statements as one batch
    pub fn execute_sql_batch(
        connection: &Arc<ConnectionContext>,
        context: &StatementContext,
        statements: Vec<String>,
    ) -> Result<Vec<i64>, BatchUpdateError> {
        debug!("Executing batch of {} statements", statements.len());
        run_batch(statements, |sql| {
            Command::prepare(&sql)?.execute_update(connection, context)
        })
    }
}
