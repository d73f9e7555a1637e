// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST subsystem: Lexer, parser and AST nodes for the SQL dialect

#[allow(clippy::module_inception)]
mod ast;
pub use ast::*;
pub mod lexer;
pub mod parser;

pub use parser::{parse_statement, split_statements, ParsedStatement, ParserError};
