// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Interactive SQL shell

use colored::Colorize;
use rowlite_sdk::{split_statements, IsolationLevel};
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::path::{Path, PathBuf};

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use super::runner::{DatabaseOptions, SqlSession};

const HISTORY_PATH: &str = ".rowlite/history.txt";

/// Words the shell handles itself when no statement is being typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellCommand {
    Exit,
    Help,
    Clear,
    Tables,
    Status,
}

impl ShellCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().trim_end_matches(';').to_lowercase().as_str() {
            "exit" | "quit" => Some(ShellCommand::Exit),
            "help" => Some(ShellCommand::Help),
            "clear" => Some(ShellCommand::Clear),
            "tables" => Some(ShellCommand::Tables),
            "status" => Some(ShellCommand::Status),
            _ => None,
        }
    }
}

/// Handle the shell (REPL) command
pub fn handle_shell(
    options: &DatabaseOptions,
    workload: Option<PathBuf>,
    isolation: Option<IsolationLevel>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SqlSession::open(options, isolation)?.with_workload(workload.clone());

    println!("{}", "RowLite".bold().green());
    println!("Type 'help' for commands, 'exit' or 'quit' to exit");
    println!("Multi-line statements supported - use ';' to terminate\n");
    println!(
        "Connection: {} ({})",
        session.connection().id(),
        session.connection().transaction_isolation()
    );
    if let Some(path) = &workload {
        println!("{}", format!("Recording statements to {:?}", path).cyan());
    }

    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(config)?;

    if let Some(parent) = Path::new(HISTORY_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.load_history(HISTORY_PATH);

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            format!("{}> ", "rowlite".cyan())
        } else {
            format!("{}> ", "   ...".cyan())
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !buffer.is_empty() {
                    buffer.clear();
                    println!("{}", "\nStatement buffer cleared".yellow());
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();

        if buffer.is_empty() {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(command) = ShellCommand::parse(trimmed) {
                match command {
                    ShellCommand::Exit => {
                        println!("{}", "Goodbye!".green());
                        break;
                    }
                    ShellCommand::Help => print_help(),
                    ShellCommand::Clear => {
                        print!("\x1B[2J\x1B[1;1H");
                        std::io::Write::flush(&mut std::io::stdout())?;
                    }
                    ShellCommand::Tables => {
                        for name in session.database().table_names() {
                            println!("  {}", name);
                        }
                    }
                    ShellCommand::Status => print_status(&session),
                }
                continue;
            }
        }

        buffer.push_str(&line);
        buffer.push('\n');

        if trimmed.ends_with(';') {
            let text = buffer.trim().to_string();
            rl.add_history_entry(&text)?;
            for sql in split_statements(&text) {
                match session.execute(&sql) {
                    Ok(report) => println!("{}", ResultFormatter::format(&report, OutputFormat::Table)),
                    Err(e) => {
                        eprintln!("{}", format!("Error: {}", e).red());
                        break;
                    }
                }
            }
            buffer.clear();
        }
    }

    let _ = rl.save_history(HISTORY_PATH);

    Ok(())
}

fn print_status(session: &SqlSession) {
    let connection = session.connection();
    println!("  connection:      {}", connection.id());
    println!("  isolation:       {}", connection.transaction_isolation());
    println!("  auto-commit:     {}", connection.auto_commit());
    println!("  pending changes: {}", connection.pending_changes());
}

fn print_help() {
    println!("{}", "Available commands:".bold().green());
    println!("  {}  - Show this help message", "help".cyan());
    println!("  {}  - Exit the shell", "exit/quit".cyan());
    println!("  {}  - Clear the screen", "clear".cyan());
    println!("  {}  - List tables", "tables".cyan());
    println!("  {}  - Show connection state", "status".cyan());
    println!("\n{}", "Statement syntax:".bold().green());
    println!("  Multi-line statements are supported");
    println!("  Terminate statements with semicolon (;)");
    println!("\n{}", "Examples:".bold().green());
    println!(
        "  {}",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(20));".yellow()
    );
    println!("  {}", "SET AUTOCOMMIT OFF;".yellow());
    println!("  {}", "INSERT INTO t VALUES (1, 'one');".yellow());
    println!("  {}", "SAVEPOINT s1;".yellow());
    println!("  {}", "ROLLBACK TO SAVEPOINT s1;".yellow());
    println!("  {}", "COMMIT;".yellow());
}
