// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the SQL dialect using nom parsers over the token stream

use log::debug;
use nom::{
    branch::alt,
    combinator::{cut, map, map_opt, opt, value, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::lexer::{tokenize, Token};
use crate::storage::{ColumnDef, DataType, Value};
use crate::txn::isolation::IsolationLevel;

/// Parser error type
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("Lexer error: {0}")]
    LexerError(String),
    #[error("Unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("Unexpected end of statement")]
    UnexpectedEnd,
}

/// A parsed statement and the number of `?` markers it contains
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub statement: Statement,
    pub parameter_count: usize,
}

/// Words that can never be bare identifiers or aliases
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "INSERT", "INTO", "VALUES",
        "UPDATE", "SET", "DELETE", "CREATE", "DROP", "ALTER", "TABLE", "AND", "OR", "NOT", "NULL",
        "IS", "AS", "ASC", "DESC", "TOP", "ADD", "COLUMN", "PRIMARY", "KEY", "UNIQUE", "COMMIT",
        "ROLLBACK", "SAVEPOINT", "RELEASE", "TO", "TRUE", "FALSE",
    ]
    .into_iter()
    .collect()
});

type TokenResult<'a, T> = IResult<&'a [Token], T>;

fn fail(tokens: &[Token]) -> nom::Err<nom::error::Error<&[Token]>> {
    nom::Err::Error(nom::error::Error::new(tokens, nom::error::ErrorKind::Tag))
}

/// Match one token of the same kind as `expected`
fn expect_token(expected: Token) -> impl Fn(&[Token]) -> TokenResult<'_, Token> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
            Ok((&tokens[1..], token.clone()))
        }
        _ => Err(fail(tokens)),
    }
}

/// Match a keyword, case-insensitively
fn keyword(word: &'static str) -> impl Fn(&[Token]) -> TokenResult<'_, ()> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token) if token.is_keyword(word) => Ok((&tokens[1..], ())),
        _ => Err(fail(tokens)),
    }
}

fn identifier(tokens: &[Token]) -> TokenResult<'_, String> {
    match tokens.first() {
        Some(Token::Identifier(name)) if !RESERVED.contains(name.to_ascii_uppercase().as_str()) => {
            Ok((&tokens[1..], name.clone()))
        }
        Some(Token::QuotedIdentifier(name)) => Ok((&tokens[1..], name.clone())),
        _ => Err(fail(tokens)),
    }
}

fn integer(tokens: &[Token]) -> TokenResult<'_, i64> {
    match tokens.first() {
        Some(Token::Integer(n)) => Ok((&tokens[1..], *n)),
        _ => Err(fail(tokens)),
    }
}

fn comma_list<'a, T, F>(item: F) -> impl FnMut(&'a [Token]) -> TokenResult<'a, Vec<T>>
where
    F: FnMut(&'a [Token]) -> TokenResult<'a, T>,
{
    separated_list1(expect_token(Token::Comma), item)
}

fn parenthesized<'a, T, F>(inner: F) -> impl FnMut(&'a [Token]) -> TokenResult<'a, T>
where
    F: FnMut(&'a [Token]) -> TokenResult<'a, T>,
{
    delimited(
        expect_token(Token::LeftParen),
        inner,
        expect_token(Token::RightParen),
    )
}

fn statement(tokens: &[Token]) -> TokenResult<'_, Statement> {
    alt((
        map(select_statement, Statement::Select),
        map(insert_statement, Statement::Insert),
        map(update_statement, Statement::Update),
        map(delete_statement, Statement::Delete),
        map(create_table, Statement::CreateTable),
        drop_table,
        alter_table,
        map(transaction_statement, Statement::Transaction),
    ))(tokens)
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

enum TableElement {
    Column(ColumnDef),
    PrimaryKey(Vec<String>),
}

fn create_table(tokens: &[Token]) -> TokenResult<'_, CreateTable> {
    map(
        preceded(
            keyword("CREATE"),
            cut(tuple((
                keyword("TABLE"),
                identifier,
                parenthesized(comma_list(table_element)),
            ))),
        ),
        |(_, table, elements)| {
            let mut columns = Vec::new();
            let mut key_columns = Vec::new();
            for element in elements {
                match element {
                    TableElement::Column(column) => columns.push(column),
                    TableElement::PrimaryKey(names) => key_columns.extend(names),
                }
            }
            for column in &mut columns {
                if key_columns.iter().any(|k| k.eq_ignore_ascii_case(&column.name)) {
                    column.primary_key = true;
                    column.not_null = true;
                }
            }
            CreateTable { table, columns }
        },
    )(tokens)
}

fn table_element(tokens: &[Token]) -> TokenResult<'_, TableElement> {
    alt((
        map(
            preceded(
                pair(keyword("PRIMARY"), keyword("KEY")),
                parenthesized(comma_list(identifier)),
            ),
            TableElement::PrimaryKey,
        ),
        map(column_definition, TableElement::Column),
    ))(tokens)
}

#[derive(Clone, Copy)]
enum ColumnConstraint {
    Identity,
    PrimaryKey,
    Unique,
    NotNull,
    Nullable,
}

fn column_definition(tokens: &[Token]) -> TokenResult<'_, ColumnDef> {
    map(
        tuple((identifier, data_type, many0(column_constraint))),
        |(name, (data_type, counter), constraints)| {
            let mut column = ColumnDef::new(name, data_type);
            if counter {
                column = column.identity();
            }
            for constraint in constraints {
                column = match constraint {
                    ColumnConstraint::Identity => column.identity(),
                    ColumnConstraint::PrimaryKey => column.primary_key(),
                    ColumnConstraint::Unique => column.unique(),
                    ColumnConstraint::NotNull => column.not_null(),
                    ColumnConstraint::Nullable => column,
                };
            }
            column
        },
    )(tokens)
}

/// Type name with optional `(length)`; the flag marks `COUNTER`
fn data_type(tokens: &[Token]) -> TokenResult<'_, (DataType, bool)> {
    map_opt(
        pair(
            expect_token(Token::Identifier(String::new())),
            opt(parenthesized(integer)),
        ),
        |(name, length)| {
            let Token::Identifier(name) = name else {
                return None;
            };
            let length = length.and_then(|n| u32::try_from(n).ok());
            DataType::from_sql_name(&name, length)
                .map(|data_type| (data_type, name.eq_ignore_ascii_case("COUNTER")))
        },
    )(tokens)
}

fn column_constraint(tokens: &[Token]) -> TokenResult<'_, ColumnConstraint> {
    alt((
        value(ColumnConstraint::Identity, keyword("IDENTITY")),
        value(ColumnConstraint::Identity, keyword("AUTO_INCREMENT")),
        value(
            ColumnConstraint::PrimaryKey,
            pair(keyword("PRIMARY"), keyword("KEY")),
        ),
        value(ColumnConstraint::Unique, keyword("UNIQUE")),
        value(ColumnConstraint::NotNull, pair(keyword("NOT"), keyword("NULL"))),
        value(ColumnConstraint::Nullable, keyword("NULL")),
    ))(tokens)
}

fn drop_table(tokens: &[Token]) -> TokenResult<'_, Statement> {
    map(
        preceded(keyword("DROP"), cut(preceded(keyword("TABLE"), identifier))),
        |table| Statement::DropTable { table },
    )(tokens)
}

fn alter_table(tokens: &[Token]) -> TokenResult<'_, Statement> {
    map(
        preceded(
            keyword("ALTER"),
            cut(tuple((
                keyword("TABLE"),
                identifier,
                alt((
                    map(
                        preceded(
                            pair(keyword("ADD"), opt(keyword("COLUMN"))),
                            column_definition,
                        ),
                        AlterAction::AddColumn,
                    ),
                    map(
                        preceded(pair(keyword("DROP"), opt(keyword("COLUMN"))), identifier),
                        AlterAction::DropColumn,
                    ),
                )),
            ))),
        ),
        |(_, table, action)| Statement::AlterTable { table, action },
    )(tokens)
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

fn insert_statement(tokens: &[Token]) -> TokenResult<'_, InsertStatement> {
    map(
        preceded(
            keyword("INSERT"),
            cut(tuple((
                keyword("INTO"),
                identifier,
                opt(parenthesized(comma_list(identifier))),
                alt((
                    map(
                        preceded(
                            keyword("VALUES"),
                            comma_list(parenthesized(comma_list(expression))),
                        ),
                        InsertSource::Values,
                    ),
                    map(select_statement, |select| InsertSource::Select(Box::new(select))),
                )),
            ))),
        ),
        |(_, table, columns, source)| InsertStatement {
            table,
            columns,
            source,
        },
    )(tokens)
}

fn update_statement(tokens: &[Token]) -> TokenResult<'_, UpdateStatement> {
    map(
        preceded(
            keyword("UPDATE"),
            cut(tuple((
                identifier,
                keyword("SET"),
                comma_list(map(
                    tuple((column_name, expect_token(Token::Equal), expression)),
                    |(column, _, value)| (column, value),
                )),
                opt(preceded(keyword("WHERE"), expression)),
            ))),
        ),
        |(table, _, assignments, where_clause)| UpdateStatement {
            table,
            assignments,
            where_clause,
        },
    )(tokens)
}

fn delete_statement(tokens: &[Token]) -> TokenResult<'_, DeleteStatement> {
    map(
        preceded(
            keyword("DELETE"),
            cut(tuple((
                keyword("FROM"),
                identifier,
                opt(preceded(keyword("WHERE"), expression)),
            ))),
        ),
        |(_, table, where_clause)| DeleteStatement {
            table,
            where_clause,
        },
    )(tokens)
}

fn select_statement(tokens: &[Token]) -> TokenResult<'_, SelectStatement> {
    map(
        preceded(
            keyword("SELECT"),
            cut(tuple((
                opt(preceded(
                    keyword("TOP"),
                    map(verify(integer, |n: &i64| *n >= 0), |n| n as u64),
                )),
                select_items,
                preceded(keyword("FROM"), identifier),
                opt(preceded(keyword("WHERE"), expression)),
                opt(preceded(
                    pair(keyword("GROUP"), keyword("BY")),
                    comma_list(expression),
                )),
                opt(preceded(keyword("HAVING"), expression)),
                opt(preceded(
                    pair(keyword("ORDER"), keyword("BY")),
                    comma_list(order_item),
                )),
            ))),
        ),
        |(top, items, from, where_clause, group_by, having, order_by)| SelectStatement {
            top,
            items,
            from,
            where_clause,
            group_by: group_by.unwrap_or_default(),
            having,
            order_by: order_by.unwrap_or_default(),
        },
    )(tokens)
}

fn select_items(tokens: &[Token]) -> TokenResult<'_, SelectItems> {
    alt((
        value(SelectItems::Wildcard, expect_token(Token::Star)),
        map(comma_list(select_item), SelectItems::Explicit),
    ))(tokens)
}

fn select_item(tokens: &[Token]) -> TokenResult<'_, SelectItem> {
    map(
        pair(
            expression,
            opt(alt((preceded(keyword("AS"), identifier), identifier))),
        ),
        |(expression, alias)| SelectItem { expression, alias },
    )(tokens)
}

fn order_item(tokens: &[Token]) -> TokenResult<'_, OrderItem> {
    map(
        pair(
            expression,
            opt(alt((
                value(false, keyword("ASC")),
                value(true, keyword("DESC")),
            ))),
        ),
        |(expression, descending)| OrderItem {
            expression,
            descending: descending.unwrap_or(false),
        },
    )(tokens)
}

// ---------------------------------------------------------------------------
// Transaction control
// ---------------------------------------------------------------------------

fn transaction_statement(tokens: &[Token]) -> TokenResult<'_, TransactionStatement> {
    alt((
        value(
            TransactionStatement::Commit,
            pair(keyword("COMMIT"), opt(keyword("WORK"))),
        ),
        map(
            preceded(
                tuple((
                    keyword("ROLLBACK"),
                    opt(keyword("WORK")),
                    keyword("TO"),
                    opt(keyword("SAVEPOINT")),
                )),
                identifier,
            ),
            TransactionStatement::RollbackToSavepoint,
        ),
        value(
            TransactionStatement::Rollback,
            pair(keyword("ROLLBACK"), opt(keyword("WORK"))),
        ),
        map(
            preceded(keyword("SAVEPOINT"), identifier),
            TransactionStatement::Savepoint,
        ),
        map(
            preceded(
                pair(keyword("RELEASE"), opt(keyword("SAVEPOINT"))),
                identifier,
            ),
            TransactionStatement::ReleaseSavepoint,
        ),
        map(
            preceded(
                pair(keyword("SET"), keyword("AUTOCOMMIT")),
                preceded(opt(expect_token(Token::Equal)), on_off),
            ),
            TransactionStatement::SetAutoCommit,
        ),
        map(
            preceded(
                tuple((
                    keyword("SET"),
                    keyword("TRANSACTION"),
                    keyword("ISOLATION"),
                    keyword("LEVEL"),
                )),
                isolation_level,
            ),
            TransactionStatement::SetIsolationLevel,
        ),
    ))(tokens)
}

fn on_off(tokens: &[Token]) -> TokenResult<'_, bool> {
    alt((
        value(true, keyword("ON")),
        value(true, keyword("TRUE")),
        value(false, keyword("OFF")),
        value(false, keyword("FALSE")),
    ))(tokens)
}

fn isolation_level(tokens: &[Token]) -> TokenResult<'_, IsolationLevel> {
    alt((
        value(
            IsolationLevel::ReadUncommitted,
            pair(keyword("READ"), keyword("UNCOMMITTED")),
        ),
        value(
            IsolationLevel::ReadCommitted,
            pair(keyword("READ"), keyword("COMMITTED")),
        ),
        value(
            IsolationLevel::RepeatableRead,
            pair(keyword("REPEATABLE"), keyword("READ")),
        ),
        value(IsolationLevel::Serializable, keyword("SERIALIZABLE")),
    ))(tokens)
}

// ---------------------------------------------------------------------------
// Expressions, lowest precedence first
// ---------------------------------------------------------------------------

fn expression(tokens: &[Token]) -> TokenResult<'_, Expression> {
    or_expression(tokens)
}

fn fold_binary(first: Expression, rest: Vec<(BinaryOperator, Expression)>) -> Expression {
    rest.into_iter()
        .fold(first, |left, (operator, right)| Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
}

fn or_expression(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(
        pair(
            and_expression,
            many0(pair(value(BinaryOperator::Or, keyword("OR")), and_expression)),
        ),
        |(first, rest)| fold_binary(first, rest),
    )(tokens)
}

fn and_expression(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(
        pair(
            not_expression,
            many0(pair(value(BinaryOperator::And, keyword("AND")), not_expression)),
        ),
        |(first, rest)| fold_binary(first, rest),
    )(tokens)
}

fn not_expression(tokens: &[Token]) -> TokenResult<'_, Expression> {
    alt((
        map(preceded(keyword("NOT"), not_expression), |operand| {
            Expression::Unary {
                operator: UnaryOperator::Not,
                operand: Box::new(operand),
            }
        }),
        comparison,
    ))(tokens)
}

fn comparison_operator(tokens: &[Token]) -> TokenResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Equal, expect_token(Token::Equal)),
        value(BinaryOperator::NotEqual, expect_token(Token::NotEqual)),
        value(BinaryOperator::LessEqual, expect_token(Token::LessEqual)),
        value(BinaryOperator::GreaterEqual, expect_token(Token::GreaterEqual)),
        value(BinaryOperator::LessThan, expect_token(Token::LessThan)),
        value(BinaryOperator::GreaterThan, expect_token(Token::GreaterThan)),
    ))(tokens)
}

enum ComparisonTail {
    Compare(BinaryOperator, Expression),
    IsNull(bool),
}

fn comparison(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(
        pair(
            additive,
            opt(alt((
                map(pair(comparison_operator, additive), |(op, right)| {
                    ComparisonTail::Compare(op, right)
                }),
                map(
                    delimited(keyword("IS"), opt(keyword("NOT")), keyword("NULL")),
                    |not| ComparisonTail::IsNull(not.is_some()),
                ),
            ))),
        ),
        |(left, tail)| match tail {
            None => left,
            Some(ComparisonTail::Compare(operator, right)) => Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            Some(ComparisonTail::IsNull(negated)) => Expression::IsNull {
                operand: Box::new(left),
                negated,
            },
        },
    )(tokens)
}

fn additive(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(
        pair(
            multiplicative,
            many0(pair(
                alt((
                    value(BinaryOperator::Add, expect_token(Token::Plus)),
                    value(BinaryOperator::Subtract, expect_token(Token::Minus)),
                    value(BinaryOperator::Concat, expect_token(Token::Concat)),
                )),
                multiplicative,
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )(tokens)
}

fn multiplicative(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(
        pair(
            unary,
            many0(pair(
                alt((
                    value(BinaryOperator::Multiply, expect_token(Token::Star)),
                    value(BinaryOperator::Divide, expect_token(Token::Slash)),
                )),
                unary,
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )(tokens)
}

fn unary(tokens: &[Token]) -> TokenResult<'_, Expression> {
    alt((
        map(preceded(expect_token(Token::Minus), unary), |operand| {
            match operand {
                Expression::Literal(Value::Integer(n)) => Expression::Literal(Value::Integer(-n)),
                Expression::Literal(Value::Double(n)) => Expression::Literal(Value::Double(-n)),
                operand => Expression::Unary {
                    operator: UnaryOperator::Minus,
                    operand: Box::new(operand),
                },
            }
        }),
        preceded(expect_token(Token::Plus), unary),
        primary,
    ))(tokens)
}

fn primary(tokens: &[Token]) -> TokenResult<'_, Expression> {
    alt((
        literal,
        parameter,
        aggregate_call,
        parenthesized(expression),
        map(column_name, Expression::Column),
    ))(tokens)
}

fn literal(tokens: &[Token]) -> TokenResult<'_, Expression> {
    let value = match tokens.first() {
        Some(Token::Integer(n)) => Value::Integer(*n),
        Some(Token::Float(n)) => Value::Double(*n),
        Some(Token::String(s)) => Value::String(s.clone()),
        Some(token) if token.is_keyword("NULL") => Value::Null,
        Some(token) if token.is_keyword("TRUE") => Value::Boolean(true),
        Some(token) if token.is_keyword("FALSE") => Value::Boolean(false),
        _ => return Err(fail(tokens)),
    };
    Ok((&tokens[1..], Expression::Literal(value)))
}

/// `?` markers record how many tokens remain; `number_parameters` turns
/// that into the ordinal position afterwards.
fn parameter(tokens: &[Token]) -> TokenResult<'_, Expression> {
    map(expect_token(Token::Parameter), |_| {
        Expression::Parameter(tokens.len())
    })(tokens)
}

fn aggregate_call(tokens: &[Token]) -> TokenResult<'_, Expression> {
    let function = match tokens.first() {
        Some(Token::Identifier(name)) => AggregateFunction::from_name(name),
        _ => None,
    };
    let Some(function) = function else {
        return Err(fail(tokens));
    };
    let (rest, argument) = parenthesized(alt((
        value(None, expect_token(Token::Star)),
        map(expression, |e| Some(Box::new(e))),
    )))(&tokens[1..])?;
    if argument.is_none() && function != AggregateFunction::Count {
        return Err(fail(tokens));
    }
    Ok((rest, Expression::Aggregate { function, argument }))
}

/// Column reference, optionally qualified by the table name
fn column_name(tokens: &[Token]) -> TokenResult<'_, String> {
    map(
        pair(identifier, opt(preceded(expect_token(Token::Dot), identifier))),
        |(first, second)| second.unwrap_or(first),
    )(tokens)
}

/// Renumber parameter markers in textual order
fn number_parameters(statement: &mut Statement, tokens: &[Token]) -> usize {
    let total = tokens.len();
    let ordinals: HashMap<usize, usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| matches!(token, Token::Parameter))
        .enumerate()
        .map(|(ordinal, (position, _))| (total - position, ordinal))
        .collect();
    statement.walk_expressions_mut(&mut |expression| {
        if let Expression::Parameter(remaining) = expression {
            if let Some(ordinal) = ordinals.get(remaining) {
                *remaining = *ordinal;
            }
        }
    });
    ordinals.len()
}

/// Parse one SQL statement; a trailing `;` is allowed
pub fn parse_statement(sql: &str) -> Result<ParsedStatement, ParserError> {
    let tokens = tokenize(sql).map_err(ParserError::LexerError)?;
    debug!("Parsing {} tokens", tokens.len());

    let result = terminated(statement, many0(expect_token(Token::Semicolon)))(&tokens[..]);
    match result {
        Ok((rest, mut statement)) => {
            if let Some(token) = rest.first() {
                return Err(ParserError::UnexpectedToken(token.clone()));
            }
            let parameter_count = number_parameters(&mut statement, &tokens);
            Ok(ParsedStatement {
                statement,
                parameter_count,
            })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => match e.input.first() {
            Some(token) => Err(ParserError::UnexpectedToken(token.clone())),
            None => Err(ParserError::UnexpectedEnd),
        },
        Err(nom::Err::Incomplete(_)) => Err(ParserError::UnexpectedEnd),
    }
}

/// Split a script into statements at top-level semicolons
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = script.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            current.push('\n');
                            break;
                        }
                    }
                }
                ';' => {
                    if !current.trim().is_empty() {
                        statements.push(current.trim().to_string());
                    }
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        parse_statement(sql).unwrap().statement
    }

    #[test]
    fn test_create_table() {
        let Statement::CreateTable(create) = parse(
            "CREATE TABLE items (id COUNTER PRIMARY KEY, name VARCHAR(20) NOT NULL, \
             qty INT, code BIGINT UNIQUE)",
        ) else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.table, "items");
        assert_eq!(create.columns.len(), 4);
        assert!(create.columns[0].identity && create.columns[0].primary_key);
        assert_eq!(create.columns[1].data_type, DataType::Varchar(Some(20)));
        assert!(create.columns[1].not_null);
        assert!(create.columns[3].unique);
    }

    #[test]
    fn test_table_level_primary_key() {
        let Statement::CreateTable(create) =
            parse("create table t (a int, b int, primary key (b))")
        else {
            panic!("expected CREATE TABLE");
        };
        assert!(!create.columns[0].primary_key);
        assert!(create.columns[1].primary_key);
    }

    #[test]
    fn test_select_clauses() {
        let Statement::Select(select) = parse(
            "SELECT TOP 5 name, COUNT(*) AS n FROM t WHERE qty >= 2 AND NOT name IS NULL \
             GROUP BY name HAVING COUNT(*) > 1 ORDER BY n DESC, name;",
        ) else {
            panic!("expected SELECT");
        };
        assert_eq!(select.top, Some(5));
        assert_eq!(select.from, "t");
        assert_eq!(select.group_by, vec![Expression::Column("name".into())]);
        assert!(select.having.is_some());
        assert_eq!(select.order_by.len(), 2);
        assert!(select.order_by[0].descending);
        assert!(!select.order_by[1].descending);
        assert!(select.is_grouped());
        let SelectItems::Explicit(items) = &select.items else {
            panic!("expected explicit items");
        };
        assert_eq!(items[1].label(), "n");
    }

    #[test]
    fn test_operator_precedence() {
        let Statement::Select(select) = parse("SELECT * FROM t WHERE a = 1 + 2 * 3 OR b = 1")
        else {
            panic!("expected SELECT");
        };
        let Some(Expression::Binary { operator, left, .. }) = select.where_clause else {
            panic!("expected binary");
        };
        assert_eq!(operator, BinaryOperator::Or);
        assert_eq!(left.to_string(), "a = 1 + 2 * 3");
    }

    #[test]
    fn test_parameters_numbered_in_order() {
        let parsed = parse_statement("UPDATE t SET a = ?, b = ? WHERE id = ?").unwrap();
        assert_eq!(parsed.parameter_count, 3);
        let Statement::Update(update) = parsed.statement else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.assignments[0].1, Expression::Parameter(0));
        assert_eq!(update.assignments[1].1, Expression::Parameter(1));
        let Some(Expression::Binary { right, .. }) = update.where_clause else {
            panic!("expected comparison");
        };
        assert_eq!(*right, Expression::Parameter(2));
    }

    #[test]
    fn test_insert_forms() {
        let Statement::Insert(insert) = parse("INSERT INTO t (a, b) VALUES (1, 'x'), (-2, NULL)")
        else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.columns, Some(vec!["a".to_string(), "b".to_string()]));
        let InsertSource::Values(rows) = insert.source else {
            panic!("expected VALUES");
        };
        assert_eq!(rows[1][0], Expression::Literal(Value::Integer(-2)));
        assert_eq!(rows[1][1], Expression::Literal(Value::Null));

        let Statement::Insert(insert) = parse("INSERT INTO t SELECT * FROM s") else {
            panic!("expected INSERT");
        };
        assert!(matches!(insert.source, InsertSource::Select(_)));
    }

    #[test]
    fn test_transaction_statements() {
        assert_eq!(
            parse("COMMIT"),
            Statement::Transaction(TransactionStatement::Commit)
        );
        assert_eq!(
            parse("rollback to savepoint sp1"),
            Statement::Transaction(TransactionStatement::RollbackToSavepoint("sp1".into()))
        );
        assert_eq!(
            parse("ROLLBACK WORK"),
            Statement::Transaction(TransactionStatement::Rollback)
        );
        assert_eq!(
            parse("SET AUTOCOMMIT OFF"),
            Statement::Transaction(TransactionStatement::SetAutoCommit(false))
        );
        assert_eq!(
            parse("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            Statement::Transaction(TransactionStatement::SetIsolationLevel(
                IsolationLevel::RepeatableRead
            ))
        );
    }

    #[test]
    fn test_alter_table() {
        assert!(matches!(
            parse("ALTER TABLE t ADD COLUMN c DOUBLE"),
            Statement::AlterTable {
                action: AlterAction::AddColumn(_),
                ..
            }
        ));
        assert!(matches!(
            parse("ALTER TABLE t DROP c"),
            Statement::AlterTable {
                action: AlterAction::DropColumn(_),
                ..
            }
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_statement("SELECT FROM t"),
            Err(ParserError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_statement("SELECT * FROM"),
            Err(ParserError::UnexpectedEnd)
        ));
        assert!(matches!(
            parse_statement("SELECT * FROM t extra"),
            Err(ParserError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_statement("'open"),
            Err(ParserError::LexerError(_))
        ));
    }

    #[test]
    fn test_split_statements() {
        let parts = split_statements("INSERT INTO t VALUES ('a;b'); -- note; here\nCOMMIT;");
        assert_eq!(parts, vec!["INSERT INTO t VALUES ('a;b')", "COMMIT"]);
    }
}
