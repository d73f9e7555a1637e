// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use rowlite_sdk::result::value_to_json;
use rowlite_sdk::Value;

use super::commands::OutputFormat;

/// What one statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// Rows of a query, fully read
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Affected-row count of DML, `0` for DDL and transaction control
    Updated(i64),
}

/// An outcome plus how long the statement took
#[derive(Debug, Clone)]
pub struct StatementReport {
    pub outcome: StatementOutcome,
    pub execution_time_ms: u128,
}

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    /// Format a statement report in the specified format
    pub fn format(report: &StatementReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(report),
            OutputFormat::Json => Self::format_json(report),
            OutputFormat::Csv => Self::format_csv(report),
        }
    }

    fn format_table(report: &StatementReport) -> String {
        let (columns, rows) = match &report.outcome {
            StatementOutcome::Updated(count) => {
                return format!(
                    "{} ({} ms)\n",
                    format!("{} row(s) affected", count).green(),
                    report.execution_time_ms
                );
            }
            StatementOutcome::Rows { columns, rows } => (columns, rows),
        };

        if rows.is_empty() {
            return format!("{}\n", "No rows returned".yellow());
        }

        let mut output = String::new();
        output.push_str(&format!(
            "Execution time: {} ms\n",
            report.execution_time_ms
        ));
        output.push_str(&format!("Rows returned: {}\n\n", rows.len()));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            columns
                .iter()
                .map(|col| Cell::new(col).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        for row in rows {
            table.add_row(row.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_json(report: &StatementReport) -> String {
        let json = match &report.outcome {
            StatementOutcome::Updated(count) => serde_json::json!({
                "status": "success",
                "rows_affected": count,
                "execution_time_ms": report.execution_time_ms,
            }),
            StatementOutcome::Rows { columns, rows } => serde_json::json!({
                "status": "success",
                "columns": columns,
                "rows": rows.iter().map(|row| {
                    columns
                        .iter()
                        .zip(row.iter())
                        .map(|(col, value)| (col.clone(), value_to_json(value)))
                        .collect::<serde_json::Map<_, _>>()
                }).collect::<Vec<_>>(),
                "row_count": rows.len(),
                "execution_time_ms": report.execution_time_ms,
            }),
        };

        serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}".to_string()
        })
    }

    fn format_csv(report: &StatementReport) -> String {
        match &report.outcome {
            StatementOutcome::Updated(count) => format!("rows_affected\n{}\n", count),
            StatementOutcome::Rows { columns, rows } => {
                let mut output = String::new();
                output.push_str(
                    &columns
                        .iter()
                        .map(|c| Self::csv_escape(c))
                        .collect::<Vec<_>>()
                        .join(","),
                );
                output.push('\n');
                for row in rows {
                    let line = row
                        .iter()
                        .map(Self::value_to_csv_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    output.push_str(&line);
                    output.push('\n');
                }
                output
            }
        }
    }

    /// NULL is written as an empty field
    fn value_to_csv_string(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            other => Self::csv_escape(&other.to_string()),
        }
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
