// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression evaluation
//!
//! Expressions are evaluated either against one row of a table or against a
//! group of rows. Comparisons and boolean operators follow SQL three-valued
//! logic: NULL is "unknown" and only a `TRUE` filter keeps a row.

use crate::ast::{AggregateFunction, BinaryOperator, Expression, UnaryOperator};
use crate::exec::error::ExecutionError;
use crate::storage::{Row, TableSchema, Value};
use std::cmp::Ordering;

/// Evaluates expressions with a fixed set of bound parameters
pub struct Evaluator<'a> {
    schema: Option<&'a TableSchema>,
    parameters: &'a [Value],
}

impl<'a> Evaluator<'a> {
    pub fn new(schema: &'a TableSchema, parameters: &'a [Value]) -> Self {
        Self {
            schema: Some(schema),
            parameters,
        }
    }

    /// Evaluator for expressions that may not reference columns
    pub fn constant(parameters: &'a [Value]) -> Self {
        Self {
            schema: None,
            parameters,
        }
    }

    fn column(&self, name: &str, row: &[Value]) -> Result<Value, ExecutionError> {
        let schema = self.schema.ok_or_else(|| {
            ExecutionError::ExpressionError(format!("column {} is not allowed here", name))
        })?;
        let index = schema.require_column(name)?;
        Ok(row.get(index).cloned().unwrap_or(Value::Null))
    }

    fn parameter(&self, index: usize) -> Result<Value, ExecutionError> {
        self.parameters
            .get(index)
            .cloned()
            .ok_or_else(|| ExecutionError::ParameterError(format!("parameter {} is not bound", index + 1)))
    }

    /// Evaluate against a single row
    pub fn evaluate(&self, expression: &Expression, row: &[Value]) -> Result<Value, ExecutionError> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(index) => self.parameter(*index),
            Expression::Column(name) => self.column(name, row),
            Expression::Unary { operator, operand } => {
                unary(*operator, self.evaluate(operand, row)?)
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => binary(
                self.evaluate(left, row)?,
                *operator,
                self.evaluate(right, row)?,
            ),
            Expression::IsNull { operand, negated } => {
                let is_null = self.evaluate(operand, row)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            Expression::Aggregate { function, .. } => Err(ExecutionError::ExpressionError(
                format!("aggregate {} is not allowed here", function.as_str()),
            )),
        }
    }

    /// Evaluate against a group: aggregates fold over every row, plain
    /// columns take the value of the group's first row.
    pub fn evaluate_group(
        &self,
        expression: &Expression,
        rows: &[Row],
    ) -> Result<Value, ExecutionError> {
        match expression {
            Expression::Aggregate { function, argument } => {
                self.aggregate(*function, argument.as_deref(), rows)
            }
            Expression::Column(name) => match rows.first() {
                Some(row) => self.column(name, row),
                None => Ok(Value::Null),
            },
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(index) => self.parameter(*index),
            Expression::Unary { operator, operand } => {
                unary(*operator, self.evaluate_group(operand, rows)?)
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => binary(
                self.evaluate_group(left, rows)?,
                *operator,
                self.evaluate_group(right, rows)?,
            ),
            Expression::IsNull { operand, negated } => {
                let is_null = self.evaluate_group(operand, rows)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
        }
    }

    /// Whether `row` passes an optional filter
    pub fn matches(&self, filter: Option<&Expression>, row: &[Value]) -> Result<bool, ExecutionError> {
        match filter {
            Some(filter) => Ok(self.evaluate(filter, row)?.is_truthy()),
            None => Ok(true),
        }
    }

    fn aggregate(
        &self,
        function: AggregateFunction,
        argument: Option<&Expression>,
        rows: &[Row],
    ) -> Result<Value, ExecutionError> {
        let Some(argument) = argument else {
            return Ok(Value::Integer(rows.len() as i64));
        };
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let value = self.evaluate(argument, row)?;
            if !value.is_null() {
                values.push(value);
            }
        }
        match function {
            AggregateFunction::Count => Ok(Value::Integer(values.len() as i64)),
            AggregateFunction::Sum => sum(&values),
            AggregateFunction::Avg => {
                if values.is_empty() {
                    return Ok(Value::Null);
                }
                let total = values.iter().try_fold(0.0, |acc, v| {
                    v.as_double()
                        .map(|d| acc + d)
                        .ok_or_else(|| type_error("AVG", v))
                })?;
                Ok(Value::Double(total / values.len() as f64))
            }
            AggregateFunction::Min => Ok(extreme(values, Ordering::Less)),
            AggregateFunction::Max => Ok(extreme(values, Ordering::Greater)),
        }
    }
}

fn type_error(operation: &str, value: &Value) -> ExecutionError {
    ExecutionError::TypeError(format!(
        "{} is not defined for {} value '{}'",
        operation,
        value.type_name(),
        value
    ))
}

fn sum(values: &[Value]) -> Result<Value, ExecutionError> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    if values.iter().all(|v| matches!(v, Value::Integer(_))) {
        let mut total: i64 = 0;
        for value in values {
            if let Value::Integer(n) = value {
                total = total
                    .checked_add(*n)
                    .ok_or_else(|| ExecutionError::ExpressionError("SUM overflow".into()))?;
            }
        }
        return Ok(Value::Integer(total));
    }
    let mut total = 0.0;
    for value in values {
        total += value.as_double().ok_or_else(|| type_error("SUM", value))?;
    }
    Ok(Value::Double(total))
}

fn extreme(values: Vec<Value>, keep: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, candidate| {
            if candidate.sort_cmp(&best) == keep {
                candidate
            } else {
                best
            }
        })
        .unwrap_or(Value::Null)
}

fn unary(operator: UnaryOperator, value: Value) -> Result<Value, ExecutionError> {
    match (operator, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Minus, Value::Integer(n)) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| ExecutionError::ExpressionError("integer overflow".into())),
        (UnaryOperator::Minus, Value::Double(n)) => Ok(Value::Double(-n)),
        (UnaryOperator::Not, value) => Err(type_error("NOT", &value)),
        (UnaryOperator::Minus, value) => Err(type_error("-", &value)),
    }
}

fn truth(value: &Value) -> Result<Option<bool>, ExecutionError> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(type_error("boolean logic", other)),
    }
}

fn from_truth(value: Option<bool>) -> Value {
    value.map(Value::Boolean).unwrap_or(Value::Null)
}

fn binary(left: Value, operator: BinaryOperator, right: Value) -> Result<Value, ExecutionError> {
    match operator {
        BinaryOperator::And => {
            let result = match (truth(&left)?, truth(&right)?) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            Ok(from_truth(result))
        }
        BinaryOperator::Or => {
            let result = match (truth(&left)?, truth(&right)?) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            };
            Ok(from_truth(result))
        }
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let Some(ordering) = left.compare(&right) else {
                return Ok(Value::Null);
            };
            let result = match operator {
                BinaryOperator::Equal => ordering == Ordering::Equal,
                BinaryOperator::NotEqual => ordering != Ordering::Equal,
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }
        BinaryOperator::Concat => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::String(format!("{}{}", left, right)))
        }
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide => arithmetic(left, operator, right),
    }
}

fn arithmetic(left: Value, operator: BinaryOperator, right: Value) -> Result<Value, ExecutionError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        let result = match operator {
            BinaryOperator::Add => a.checked_add(b),
            BinaryOperator::Subtract => a.checked_sub(b),
            BinaryOperator::Multiply => a.checked_mul(b),
            _ => {
                if b == 0 {
                    return Err(ExecutionError::ExpressionError("division by zero".into()));
                }
                a.checked_div(b)
            }
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| ExecutionError::ExpressionError("integer overflow".into()));
    }

    let symbol = operator.as_str();
    let a = left.as_double().ok_or_else(|| type_error(symbol, &left))?;
    let b = right.as_double().ok_or_else(|| type_error(symbol, &right))?;
    let result = match operator {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        _ => {
            if b == 0.0 {
                return Err(ExecutionError::ExpressionError("division by zero".into()));
            }
            a / b
        }
    };
    Ok(Value::Double(result))
}
