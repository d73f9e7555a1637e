/// Benchmark for connection and statement throughput
///
/// Measures connection churn, single-connection statement execution and
/// concurrent auto-commit writers contending for the lock table, using the
/// public API only.

use rowlite::{Command, Database, DatabaseConfig, StatementContext, Value};
use std::thread;
use std::time::{Duration, Instant};

const CONNECTIONS: usize = 1000;
const STATEMENTS: usize = 2000;
const THREADS: usize = 8;
const PER_THREAD: usize = 250;

fn main() {
    println!("=== Connection Throughput Benchmark ===\n");

    let db = Database::new(
        DatabaseConfig::default().with_lock_wait_timeout(Duration::from_secs(30)),
    );
    let ctx = StatementContext::default();
    let setup = db.connect();
    Command::prepare("CREATE TABLE bench (id INTEGER PRIMARY KEY, hits INTEGER)")
        .and_then(|mut c| c.execute(&setup, &ctx))
        .expect("Failed to create table");

    // Benchmark: connection churn
    println!("📊 Connection open/close:");
    let start = Instant::now();
    for _ in 0..CONNECTIONS {
        let conn = db.connect();
        conn.close().expect("Failed to close connection");
    }
    let churn = report(CONNECTIONS, start.elapsed(), "connections");

    // Benchmark: prepared inserts on one connection
    println!("📊 Prepared inserts (auto-commit):");
    let mut insert = Command::prepare("INSERT INTO bench VALUES (?, 0)").expect("prepare");
    let start = Instant::now();
    for i in 0..STATEMENTS {
        insert
            .bind_parameter(1, Value::Integer(i as i64), None)
            .expect("bind");
        insert.execute_update(&setup, &ctx).expect("insert");
    }
    let inserts = report(STATEMENTS, start.elapsed(), "inserts");

    // Benchmark: point queries
    println!("📊 Point queries:");
    let mut query = Command::prepare("SELECT hits FROM bench WHERE id = ?").expect("prepare");
    let start = Instant::now();
    for i in 0..STATEMENTS {
        query
            .bind_parameter(1, Value::Integer((i % 100) as i64), None)
            .expect("bind");
        query.execute(&setup, &ctx).expect("query");
        if let Some(cursor) = query.result_cursor() {
            while cursor.next().expect("fetch") {}
        }
    }
    let queries = report(STATEMENTS, start.elapsed(), "queries");

    // Benchmark: concurrent writers on disjoint rows
    println!("📊 Concurrent updates ({} threads):", THREADS);
    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let conn = db.connect();
            let ctx = ctx.clone();
            thread::spawn(move || {
                let mut update = Command::prepare("UPDATE bench SET hits = hits + 1 WHERE id = ?")
                    .expect("prepare");
                update
                    .bind_parameter(1, Value::Integer(worker as i64), None)
                    .expect("bind");
                for _ in 0..PER_THREAD {
                    update.execute_update(&conn, &ctx).expect("update");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }
    let updates = report(THREADS * PER_THREAD, start.elapsed(), "updates");

    println!("=== Summary ===");
    println!("  Connection churn:   {:.0} connections/sec", churn);
    println!("  Prepared inserts:   {:.0} inserts/sec", inserts);
    println!("  Point queries:      {:.0} queries/sec", queries);
    println!("  Concurrent updates: {:.0} updates/sec", updates);
}

fn report(operations: usize, elapsed: Duration, unit: &str) -> f64 {
    let per_sec = operations as f64 / elapsed.as_secs_f64();
    println!("  Operations: {}", operations);
    println!("  Time: {:?}", elapsed);
    println!("  Throughput: {:.0} {}/sec", per_sec, unit);
    println!();
    per_sec
}
