// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution shared by the CLI commands

use colored::Colorize;
use log::{debug, info};
use rowlite_sdk::{
    split_statements, Connection, Database, DatabaseConfig, Error, IsolationLevel, Statement,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::commands::OutputFormat;
use super::output::{ResultFormatter, StatementOutcome, StatementReport};

/// Database settings taken from global flags
#[derive(Debug, Clone, Default)]
pub struct DatabaseOptions {
    pub lock_timeout_ms: Option<u64>,
}

impl DatabaseOptions {
    /// Environment configuration with the command-line overrides applied
    pub fn config(&self) -> Result<DatabaseConfig, Error> {
        let mut config = DatabaseConfig::from_env()?;
        if let Some(ms) = self.lock_timeout_ms {
            config = config.with_lock_wait_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

/// One connection and statement used to run SQL text
pub struct SqlSession {
    database: Database,
    connection: Connection,
    statement: Statement,
    workload: Option<PathBuf>,
}

impl SqlSession {
    pub fn open(options: &DatabaseOptions, isolation: Option<IsolationLevel>) -> Result<Self, Error> {
        let database = Database::with_config(options.config()?);
        let connection = database.connect();
        if let Some(level) = isolation {
            connection.set_transaction_isolation(level)?;
        }
        let statement = connection.create_statement()?;
        debug!(
            "Opened session on connection {} ({})",
            connection.id(),
            connection.transaction_isolation()
        );
        Ok(SqlSession {
            database,
            connection,
            statement,
            workload: None,
        })
    }

    /// Record every successfully executed statement in `path`
    pub fn with_workload(mut self, path: Option<PathBuf>) -> Self {
        self.workload = path;
        self
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Execute one statement and read its result completely
    pub fn execute(&mut self, sql: &str) -> Result<StatementReport, Box<dyn std::error::Error>> {
        let start = Instant::now();
        let outcome = if self.statement.execute(sql)? {
            let mut rs = self
                .statement
                .result_set()
                .ok_or_else(|| Error::NotFound("result set".to_string()))?;
            let columns = rs.column_names();
            let mut rows = Vec::new();
            while rs.next()? {
                rows.push(rs.values()?);
            }
            rs.close();
            StatementOutcome::Rows { columns, rows }
        } else {
            StatementOutcome::Updated(self.statement.update_count().unwrap_or(0))
        };
        let execution_time_ms = start.elapsed().as_millis();

        if let Some(path) = &self.workload {
            append_workload(path, sql)?;
        }

        Ok(StatementReport {
            outcome,
            execution_time_ms,
        })
    }

    /// Execute every statement of a script, stopping at the first failure
    pub fn execute_script(
        &mut self,
        script: &str,
    ) -> Result<Vec<StatementReport>, Box<dyn std::error::Error>> {
        let mut reports = Vec::new();
        for (i, sql) in split_statements(script).iter().enumerate() {
            let report = self
                .execute(sql)
                .map_err(|e| format!("statement {} failed: {}\n  {}", i + 1, e, sql))?;
            reports.push(report);
        }
        Ok(reports)
    }
}

/// Append a statement to a workload file, creating the file if needed
pub fn append_workload(path: &Path, sql: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{};", sql.trim().trim_end_matches(';'))
}

/// Handle the run command
pub fn handle_run(
    options: &DatabaseOptions,
    file: PathBuf,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(&file)
        .map_err(|e| format!("Cannot read script {:?}: {}", file, e))?;
    let mut session = SqlSession::open(options, None)?;

    let count = split_statements(&script).len();
    info!("Running {} statement(s) from {:?}", count, file);

    match session.execute_script(&script) {
        Ok(reports) => {
            for report in &reports {
                println!("{}", ResultFormatter::format(report, format));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            Err(e)
        }
    }
}

/// Handle the query command (one-off execution on a fresh database)
pub fn handle_query(
    options: &DatabaseOptions,
    query: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SqlSession::open(options, None)?;
    match session.execute_script(&query) {
        Ok(reports) => {
            if let Some(report) = reports.last() {
                println!("{}", ResultFormatter::format(report, format));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlite_sdk::Value;

    fn session() -> SqlSession {
        SqlSession::open(&DatabaseOptions::default(), None).unwrap()
    }

    #[test]
    fn test_execute_script() {
        let mut session = session();
        let reports = session
            .execute_script(
                "CREATE TABLE notes (id INTEGER, body VARCHAR(20));
                 INSERT INTO notes VALUES (1, 'a;b'), (2, 'c');
                 -- trailing comment; ignored
                 SELECT body FROM notes ORDER BY id;",
            )
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].outcome, StatementOutcome::Updated(2));
        assert_eq!(
            reports[2].outcome,
            StatementOutcome::Rows {
                columns: vec!["body".into()],
                rows: vec![vec!["a;b".into()], vec!["c".into()]],
            }
        );
        assert_eq!(session.database().table_names(), vec!["notes".to_string()]);
    }

    #[test]
    fn test_script_stops_at_failure() {
        let mut session = session();
        let err = session
            .execute_script(
                "CREATE TABLE t (id INTEGER); SELECT * FROM missing; INSERT INTO t VALUES (1);",
            )
            .unwrap_err();
        assert!(err.to_string().contains("statement 2 failed"));
        let report = session.execute("SELECT COUNT(*) AS n FROM t").unwrap();
        assert_eq!(
            report.outcome,
            StatementOutcome::Rows {
                columns: vec!["n".into()],
                rows: vec![vec![Value::Integer(0)]],
            }
        );
    }

    #[test]
    fn test_isolation_and_lock_timeout_options() {
        let options = DatabaseOptions {
            lock_timeout_ms: Some(75),
        };
        assert_eq!(
            options.config().unwrap().lock_wait_timeout(),
            Duration::from_millis(75)
        );
        let session = SqlSession::open(&options, Some(IsolationLevel::RepeatableRead)).unwrap();
        assert_eq!(
            session.connection().transaction_isolation(),
            IsolationLevel::RepeatableRead
        );
    }

    #[test]
    fn test_workload_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.sql");
        let mut session = session().with_workload(Some(path.clone()));
        session.execute("CREATE TABLE w (id INTEGER)").unwrap();
        session.execute("INSERT INTO w VALUES (1)").unwrap();
        assert!(session.execute("INSERT INTO nowhere VALUES (1)").is_err());

        let recorded = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            recorded,
            "CREATE TABLE w (id INTEGER);\nINSERT INTO w VALUES (1);\n"
        );
        assert_eq!(split_statements(&recorded).len(), 2);
    }
}
