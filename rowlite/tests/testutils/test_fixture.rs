//! Test fixture for RowLite integration tests
//!
//! Uses only the public API: `Database`, `Command`, `Cursor` and the
//! connection contexts they hand out.

use rowlite::{
    Command, ConnectionContext, Cursor, Database, DatabaseConfig, ExecutionError,
    IsolationLevel, StatementContext, Value,
};
use std::sync::Arc;
use std::time::Duration;

/// Lock wait used by fixtures so timeout tests finish quickly
pub const TEST_LOCK_WAIT: Duration = Duration::from_millis(150);

/// Test fixture with an isolated database instance
pub struct TestFixture {
    db: Arc<Database>,
    conn: Arc<ConnectionContext>,
    table: String,
}

impl TestFixture {
    /// Create an empty fixture with a short lock wait
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default().with_lock_wait_timeout(TEST_LOCK_WAIT))
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let db = Database::new(config);
        let conn = db.connect();
        // Unique table name for test isolation
        let table = format!("accounts_{}", fastrand::u32(..));
        TestFixture { db, conn, table }
    }

    /// Create a fixture whose table holds five accounts:
    /// `(id, name, balance)` = `(i, 'user<i>', i * 100)` for i in 1..=5
    pub fn with_accounts() -> Self {
        let fixture = Self::new();
        fixture
            .exec(&format!(
                "CREATE TABLE {} (id INTEGER PRIMARY KEY, name VARCHAR(20), balance INTEGER)",
                fixture.table
            ))
            .expect("Failed to create table");
        for i in 1..=5 {
            fixture
                .exec(&format!(
                    "INSERT INTO {} VALUES ({}, 'user{}', {})",
                    fixture.table,
                    i,
                    i,
                    i * 100
                ))
                .expect("Failed to insert account");
        }
        fixture
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// The fixture's default connection (auto-commit, READ COMMITTED)
    pub fn conn(&self) -> &Arc<ConnectionContext> {
        &self.conn
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Open another connection with the given isolation and auto-commit off
    pub fn connect(&self, isolation: IsolationLevel) -> Arc<ConnectionContext> {
        let conn = self.db.connect();
        conn.set_auto_commit(false)
            .expect("Failed to disable auto-commit");
        conn.set_isolation_level(isolation)
            .expect("Failed to set isolation");
        conn
    }

    /// Execute a statement on the default connection
    pub fn exec(&self, sql: &str) -> Result<i64, ExecutionError> {
        Self::exec_on(&self.conn, sql)
    }

    pub fn exec_on(conn: &Arc<ConnectionContext>, sql: &str) -> Result<i64, ExecutionError> {
        Command::prepare(sql)?.execute_update(conn, &StatementContext::default())
    }

    /// Run a query on the default connection and collect its rows
    pub fn query(&self, sql: &str) -> Result<Vec<Vec<Value>>, ExecutionError> {
        Self::query_on(&self.conn, sql)
    }

    pub fn query_on(
        conn: &Arc<ConnectionContext>,
        sql: &str,
    ) -> Result<Vec<Vec<Value>>, ExecutionError> {
        let mut cursor = Self::open_cursor(conn, sql, &StatementContext::default())?;
        let mut rows = Vec::new();
        while cursor.next()? {
            rows.push(cursor.values()?);
        }
        Ok(rows)
    }

    /// Execute a query and hand out its cursor
    pub fn open_cursor(
        conn: &Arc<ConnectionContext>,
        sql: &str,
        context: &StatementContext,
    ) -> Result<Cursor, ExecutionError> {
        let mut command = Command::prepare(sql)?;
        if !command.execute(conn, context)? {
            return Err(ExecutionError::InvalidState(format!(
                "not a query: {}",
                sql
            )));
        }
        command
            .take_result_cursor()
            .ok_or_else(|| ExecutionError::InvalidState("query produced no cursor".into()))
    }

    /// Scrollable, updatable cursor over `SELECT * FROM <table> ORDER BY id`
    pub fn account_cursor(&self, conn: &Arc<ConnectionContext>) -> Cursor {
        Self::open_cursor(
            conn,
            &format!("SELECT * FROM {} ORDER BY id", self.table),
            &StatementContext::scrollable_updatable(),
        )
        .expect("Failed to open cursor")
    }

    /// Number of rows of the fixture table visible to `conn`
    pub fn count_on(&self, conn: &Arc<ConnectionContext>) -> Result<i64, ExecutionError> {
        let rows = Self::query_on(conn, &format!("SELECT COUNT(*) FROM {}", self.table))?;
        Ok(rows[0][0].as_integer().unwrap_or(-1))
    }

    /// Balance of account `id` as seen by `conn`
    pub fn balance_on(
        &self,
        conn: &Arc<ConnectionContext>,
        id: i64,
    ) -> Result<Option<i64>, ExecutionError> {
        let rows = Self::query_on(
            conn,
            &format!("SELECT balance FROM {} WHERE id = {}", self.table, id),
        )?;
        Ok(rows.first().and_then(|row| row[0].as_integer()))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
