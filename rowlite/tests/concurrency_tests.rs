//! Many connections working on one database from several threads

#[path = "testutils/mod.rs"]
mod testutils;

use rowlite::{DatabaseConfig, IsolationLevel};
use serial_test::serial;
use std::thread;
use std::time::Duration;
use testutils::test_fixture::TestFixture;

const THREADS: i64 = 4;
const ITERATIONS: i64 = 25;

fn patient_fixture() -> TestFixture {
    let fixture = TestFixture::with_config(
        DatabaseConfig::default().with_lock_wait_timeout(Duration::from_secs(10)),
    );
    fixture
        .exec(&format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY, name VARCHAR(20), balance INTEGER)",
            fixture.table()
        ))
        .unwrap();
    fixture
        .exec(&format!(
            "INSERT INTO {} VALUES (1, 'shared', 0), (2, 'other', 0)",
            fixture.table()
        ))
        .unwrap();
    fixture
}

#[test]
#[serial]
fn test_concurrent_increments_are_not_lost() {
    let fixture = patient_fixture();
    let sql = format!(
        "UPDATE {} SET balance = balance + 1 WHERE id = 1",
        fixture.table()
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let conn = fixture.db().connect();
            let sql = sql.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    TestFixture::exec_on(&conn, &sql).expect("Increment should succeed");
                }
                conn.close().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        fixture.balance_on(fixture.conn(), 1).unwrap(),
        Some(THREADS * ITERATIONS)
    );
    assert_eq!(fixture.balance_on(fixture.conn(), 2).unwrap(), Some(0));
    assert_eq!(fixture.db().open_connection_count(), 1);
    assert!(fixture.db().lock_table().is_empty());
}

#[test]
#[serial]
fn test_concurrent_transactions_commit_independently() {
    let fixture = patient_fixture();
    let table = fixture.table().to_string();

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let conn = fixture.connect(IsolationLevel::ReadCommitted);
            let table = table.clone();
            thread::spawn(move || {
                for i in 0..ITERATIONS {
                    let id = 100 + worker * ITERATIONS + i;
                    TestFixture::exec_on(
                        &conn,
                        &format!("INSERT INTO {} VALUES ({}, 'w{}', {})", table, id, worker, i),
                    )
                    .unwrap();
                }
                // Odd workers change their minds
                if worker % 2 == 1 {
                    conn.rollback().unwrap();
                } else {
                    conn.commit().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let committed = (THREADS + 1) / 2 * ITERATIONS;
    assert_eq!(fixture.count_on(fixture.conn()).unwrap(), 2 + committed);
    assert!(fixture.db().lock_table().is_empty());
}

#[test]
#[serial]
fn test_serializable_readers_and_writer() {
    let fixture = patient_fixture();
    let table = fixture.table().to_string();

    let writer = {
        let conn = fixture.db().connect();
        let table = table.clone();
        thread::spawn(move || {
            for _ in 0..ITERATIONS {
                TestFixture::exec_on(
                    &conn,
                    &format!("UPDATE {} SET balance = balance + 1 WHERE id = 2", table),
                )
                .unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let conn = fixture.db().connect();
            conn.set_isolation_level(IsolationLevel::Serializable).unwrap();
            let table = table.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    let rows = TestFixture::query_on(
                        &conn,
                        &format!("SELECT balance FROM {} WHERE id = 2", table),
                    )
                    .unwrap();
                    let balance = rows[0][0].as_integer().unwrap();
                    assert!((0..=ITERATIONS).contains(&balance));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(fixture.balance_on(fixture.conn(), 2).unwrap(), Some(ITERATIONS));
}
