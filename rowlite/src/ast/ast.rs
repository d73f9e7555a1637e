// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract Syntax Tree (AST) structures for SQL statements

use crate::storage::{ColumnDef, Value};
use crate::txn::isolation::IsolationLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level statement types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable { table: String },
    AlterTable { table: String, action: AlterAction },
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
    Transaction(TransactionStatement),
}

/// CREATE TABLE name (column, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    /// Explicit column list; `None` means every column in schema order
    pub columns: Option<Vec<String>>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(Vec<Vec<Expression>>),
    Select(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<(String, Expression)>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Expression>,
}

/// SELECT [TOP n] items FROM table [WHERE] [GROUP BY] [HAVING] [ORDER BY]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub top: Option<u64>,
    pub items: SelectItems,
    pub from: String,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderItem>,
}

impl SelectStatement {
    /// Aggregates or GROUP BY turn the result into one row per group
    pub fn is_grouped(&self) -> bool {
        if !self.group_by.is_empty() || self.having.is_some() {
            return true;
        }
        match &self.items {
            SelectItems::Wildcard => false,
            SelectItems::Explicit(items) => items.iter().any(|i| i.expression.contains_aggregate()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItems {
    Wildcard,
    Explicit(Vec<SelectItem>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl SelectItem {
    /// Column label: the alias, else the expression text
    pub fn label(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expression.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: Expression,
    pub descending: bool,
}

/// Statements routed to the connection's transaction state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionStatement {
    Commit,
    Rollback,
    Savepoint(String),
    RollbackToSavepoint(String),
    ReleaseSavepoint(String),
    SetAutoCommit(bool),
    SetIsolationLevel(IsolationLevel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Concat => "||",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            "AVG" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
        }
    }
}

/// Scalar and aggregate expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Value),
    /// Zero-based positional parameter
    Parameter(usize),
    Column(String),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    IsNull {
        operand: Box<Expression>,
        negated: bool,
    },
    /// `argument: None` is `COUNT(*)`
    Aggregate {
        function: AggregateFunction,
        argument: Option<Box<Expression>>,
    },
}

impl Expression {
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate { .. } => true,
            Expression::Unary { operand, .. } | Expression::IsNull { operand, .. } => {
                operand.contains_aggregate()
            }
            Expression::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::Literal(_) | Expression::Parameter(_) | Expression::Column(_) => false,
        }
    }

    /// Visit this expression and every sub-expression
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Expression)) {
        visit(self);
        match self {
            Expression::Unary { operand, .. } | Expression::IsNull { operand, .. } => {
                operand.walk_mut(visit)
            }
            Expression::Binary { left, right, .. } => {
                left.walk_mut(visit);
                right.walk_mut(visit);
            }
            Expression::Aggregate {
                argument: Some(argument),
                ..
            } => argument.walk_mut(visit),
            _ => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Parameter(_) => write!(f, "?"),
            Expression::Column(name) => write!(f, "{}", name),
            Expression::Unary {
                operator: UnaryOperator::Minus,
                operand,
            } => write!(f, "-{}", operand),
            Expression::Unary {
                operator: UnaryOperator::Not,
                operand,
            } => write!(f, "NOT {}", operand),
            Expression::Binary {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator.as_str(), right),
            Expression::IsNull { operand, negated } => {
                write!(f, "{} IS {}NULL", operand, if *negated { "NOT " } else { "" })
            }
            Expression::Aggregate { function, argument } => match argument {
                Some(argument) => write!(f, "{}({})", function.as_str(), argument),
                None => write!(f, "{}(*)", function.as_str()),
            },
        }
    }
}

impl Statement {
    /// Visit every expression of the statement
    pub fn walk_expressions_mut(&mut self, visit: &mut dyn FnMut(&mut Expression)) {
        match self {
            Statement::Insert(insert) => match &mut insert.source {
                InsertSource::Values(rows) => {
                    for expression in rows.iter_mut().flatten() {
                        expression.walk_mut(visit);
                    }
                }
                InsertSource::Select(select) => select.walk_expressions_mut(visit),
            },
            Statement::Update(update) => {
                for (_, expression) in &mut update.assignments {
                    expression.walk_mut(visit);
                }
                if let Some(filter) = &mut update.where_clause {
                    filter.walk_mut(visit);
                }
            }
            Statement::Delete(delete) => {
                if let Some(filter) = &mut delete.where_clause {
                    filter.walk_mut(visit);
                }
            }
            Statement::Select(select) => select.walk_expressions_mut(visit),
            Statement::CreateTable(_)
            | Statement::DropTable { .. }
            | Statement::AlterTable { .. }
            | Statement::Transaction(_) => {}
        }
    }

    /// Statements that change data or structure
    pub fn is_update(&self) -> bool {
        !matches!(self, Statement::Select(_) | Statement::Transaction(_))
    }
}

impl SelectStatement {
    fn walk_expressions_mut(&mut self, visit: &mut dyn FnMut(&mut Expression)) {
        if let SelectItems::Explicit(items) = &mut self.items {
            for item in items {
                item.expression.walk_mut(visit);
            }
        }
        if let Some(filter) = &mut self.where_clause {
            filter.walk_mut(visit);
        }
        for expression in &mut self.group_by {
            expression.walk_mut(visit);
        }
        if let Some(having) = &mut self.having {
            having.walk_mut(visit);
        }
        for item in &mut self.order_by {
            item.expression.walk_mut(visit);
        }
    }
}
