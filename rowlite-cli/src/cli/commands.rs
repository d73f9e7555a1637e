// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use rowlite_sdk::IsolationLevel;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rowlite")]
#[command(author, version, about = "RowLite - embedded transactional SQL engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Lock wait timeout in milliseconds
    #[arg(long = "lock-timeout-ms", global = true)]
    pub lock_timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", global = true, value_parser = parse_log_level)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive SQL shell
    Shell {
        /// Append every executed statement to this file
        #[arg(short, long)]
        workload: Option<PathBuf>,

        /// Isolation level of the shell connection
        #[arg(short, long, value_parser = parse_isolation)]
        isolation: Option<IsolationLevel>,
    },

    /// Execute a SQL script
    Run {
        /// Script file with `;`-terminated statements
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Execute a single statement on a fresh database
    Query {
        /// SQL text
        query: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn parse_log_level(value: &str) -> Result<log::Level, String> {
    value
        .parse()
        .map_err(|_| format!("Unknown log level: {}", value))
}

fn parse_isolation(value: &str) -> Result<IsolationLevel, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_args() {
        let cli = Cli::parse_from([
            "rowlite",
            "--lock-timeout-ms",
            "250",
            "shell",
            "--workload",
            "trace.sql",
            "--isolation",
            "serializable",
        ]);
        assert_eq!(cli.lock_timeout_ms, Some(250));
        match cli.command {
            Commands::Shell {
                workload,
                isolation,
            } => {
                assert_eq!(workload, Some(PathBuf::from("trace.sql")));
                assert_eq!(isolation, Some(IsolationLevel::Serializable));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_query_args() {
        let cli = Cli::parse_from(["rowlite", "query", "SELECT 1", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Query { format: OutputFormat::Json, .. }
        ));
        assert!(Cli::try_parse_from(["rowlite", "shell", "--isolation", "snapshot"]).is_err());
    }
}
