// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for RowLite
//!
//! Provides the interactive SQL shell (REPL), script execution and one-off
//! query execution against an in-memory database.

pub mod commands;
pub mod output;
pub mod runner;
pub mod shell;

pub use commands::{Cli, Commands};
pub use runner::{handle_query, handle_run, DatabaseOptions};
pub use shell::handle_shell;
