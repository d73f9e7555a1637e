// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RowLite CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // -v/--verbose wins over --log-level; RUST_LOG can still refine either
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let options = cli::DatabaseOptions {
        lock_timeout_ms: cli.lock_timeout_ms,
    };

    match cli.command {
        Commands::Version => {
            println!("{} {}", "RowLite".bold().green(), rowlite_sdk::VERSION);
            println!("Embedded transactional SQL engine");
            Ok(())
        }

        Commands::Shell {
            workload,
            isolation,
        } => cli::handle_shell(&options, workload, isolation),

        Commands::Run { file, format } => cli::handle_run(&options, file, format),

        Commands::Query { query, format } => cli::handle_query(&options, query, format),
    }
}
