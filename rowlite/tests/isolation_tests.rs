//! Isolation levels and lock contention between connections
//!
//! These tests rely on lock wait timeouts, so they run serially.

#[path = "testutils/mod.rs"]
mod testutils;

use rowlite::{ExecutionError, IsolationLevel, StatementContext, Value};
use serial_test::serial;
use testutils::test_fixture::TestFixture;

#[test]
#[serial]
fn test_uncommitted_insert_visibility() {
    let fixture = TestFixture::new();
    let t = fixture.table();
    fixture
        .exec(&format!("CREATE TABLE {} (id INTEGER, name VARCHAR(10))", t))
        .unwrap();

    let writer = fixture.connect(IsolationLevel::ReadCommitted);
    let dirty = fixture.connect(IsolationLevel::ReadUncommitted);
    let committed = fixture.connect(IsolationLevel::ReadCommitted);

    TestFixture::exec_on(&writer, &format!("INSERT INTO {} VALUES (1, 'new')", t)).unwrap();

    assert_eq!(fixture.count_on(&dirty).unwrap(), 1);
    assert_eq!(fixture.count_on(&committed).unwrap(), 0);

    writer.commit().unwrap();

    assert_eq!(fixture.count_on(&dirty).unwrap(), 1);
    assert_eq!(fixture.count_on(&committed).unwrap(), 1);
}

#[test]
#[serial]
fn test_lock_timeout_has_no_side_effect() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let first = fixture.connect(IsolationLevel::ReadCommitted);
    let second = fixture.connect(IsolationLevel::ReadCommitted);

    TestFixture::exec_on(&first, &format!("UPDATE {} SET balance = 1 WHERE id = 5", t)).unwrap();
    TestFixture::exec_on(&second, &format!("UPDATE {} SET balance = 2 WHERE id = 2", t)).unwrap();
    let pending = second.pending_changes();
    let held = fixture.db().lock_table().held_by(second.id());

    let err = TestFixture::exec_on(&second, &format!("UPDATE {} SET balance = 3", t))
        .expect_err("Update of a locked row should time out");
    assert!(err.is_lock_timeout());
    assert_eq!(err.sql_state(), "01000");

    // Rows 1 to 4 were updated before the timeout and are undone
    assert_eq!(second.pending_changes(), pending);
    assert_eq!(fixture.db().lock_table().held_by(second.id()), held);
    assert_eq!(fixture.balance_on(&second, 2).unwrap(), Some(2));
    assert_eq!(fixture.balance_on(&second, 3).unwrap(), Some(300));

    first.commit().unwrap();
    TestFixture::exec_on(&second, &format!("UPDATE {} SET balance = 3", t))
        .expect("Update should succeed once the lock is free");
    second.commit().unwrap();
    assert_eq!(fixture.balance_on(fixture.conn(), 5).unwrap(), Some(3));
}

#[test]
#[serial]
fn test_read_committed_waits_for_pending_update() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let writer = fixture.connect(IsolationLevel::ReadCommitted);
    let reader = fixture.connect(IsolationLevel::ReadCommitted);
    let dirty = fixture.connect(IsolationLevel::ReadUncommitted);

    TestFixture::exec_on(&writer, &format!("UPDATE {} SET balance = 0 WHERE id = 4", t)).unwrap();

    let err = fixture.balance_on(&reader, 4).unwrap_err();
    assert!(err.is_lock_timeout());
    assert_eq!(fixture.balance_on(&dirty, 4).unwrap(), Some(0));

    writer.rollback().unwrap();
    assert_eq!(fixture.balance_on(&reader, 4).unwrap(), Some(400));
}

#[test]
#[serial]
fn test_repeatable_read_holds_row_locks() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let reader = fixture.connect(IsolationLevel::RepeatableRead);

    assert_eq!(fixture.balance_on(&reader, 1).unwrap(), Some(100));

    let err = fixture
        .exec(&format!("UPDATE {} SET balance = 0 WHERE id = 1", t))
        .unwrap_err();
    assert!(err.is_lock_timeout());
    // New rows are not protected
    fixture
        .exec(&format!("INSERT INTO {} VALUES (6, 'user6', 600)", t))
        .unwrap();

    assert_eq!(fixture.balance_on(&reader, 1).unwrap(), Some(100));
    reader.commit().unwrap();
    fixture
        .exec(&format!("UPDATE {} SET balance = 0 WHERE id = 1", t))
        .expect("Update should succeed after the reader committed");
}

#[test]
#[serial]
fn test_repeatable_read_blocks_structural_change() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let reader = fixture.connect(IsolationLevel::RepeatableRead);

    fixture.count_on(&reader).unwrap();

    // Another connection waits and times out
    let err = fixture
        .exec(&format!("ALTER TABLE {} ADD COLUMN note VARCHAR(10)", t))
        .unwrap_err();
    assert!(err.is_lock_timeout());

    // The reading connection conflicts with itself immediately
    let err = TestFixture::exec_on(&reader, &format!("DROP TABLE {}", t)).unwrap_err();
    assert!(matches!(err, ExecutionError::SelfConflict(_)));
    assert_eq!(err.sql_state(), "01000");

    reader.commit().unwrap();
    fixture
        .exec(&format!("ALTER TABLE {} ADD COLUMN note VARCHAR(10)", t))
        .expect("Alter should succeed after the reader committed");
}

#[test]
#[serial]
fn test_serializable_blocks_writers() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let reader = fixture.connect(IsolationLevel::Serializable);

    assert_eq!(fixture.count_on(&reader).unwrap(), 5);

    let err = fixture
        .exec(&format!("INSERT INTO {} VALUES (6, 'late', 1)", t))
        .unwrap_err();
    assert!(err.is_lock_timeout());
    let err = fixture
        .exec(&format!("UPDATE {} SET balance = 0 WHERE id = 5", t))
        .unwrap_err();
    assert!(err.is_lock_timeout());

    // The reader itself may still write
    TestFixture::exec_on(&reader, &format!("DELETE FROM {} WHERE id = 5", t)).unwrap();
    assert_eq!(fixture.count_on(&reader).unwrap(), 4);
    reader.commit().unwrap();

    fixture
        .exec(&format!("INSERT INTO {} VALUES (6, 'late', 1)", t))
        .unwrap();
    assert_eq!(fixture.count_on(fixture.conn()).unwrap(), 5);
}

#[test]
#[serial]
fn test_auto_commit_ends_read_locks_with_statement() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let reader = fixture.db().connect();
    reader
        .set_isolation_level(IsolationLevel::Serializable)
        .unwrap();

    assert_eq!(fixture.count_on(&reader).unwrap(), 5);
    assert_eq!(fixture.db().lock_table().held_by(reader.id()), 0);
    fixture
        .exec(&format!("UPDATE {} SET balance = 0 WHERE id = 1", t))
        .expect("Writer should not wait for a finished auto-commit reader");
}

#[test]
#[serial]
fn test_structural_change_invalidates_cursor() {
    let fixture = TestFixture::with_accounts();
    let t = fixture.table();
    let mut cursor = TestFixture::open_cursor(
        fixture.conn(),
        &format!("SELECT * FROM {}", t),
        &StatementContext::scrollable_updatable(),
    )
    .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get(1).unwrap(), Value::Integer(1));

    let other = fixture.db().connect();
    TestFixture::exec_on(&other, &format!("ALTER TABLE {} ADD COLUMN note VARCHAR(10)", t))
        .unwrap();

    let err = cursor.next().unwrap_err();
    assert!(matches!(err, ExecutionError::CursorInvalidated(_)));
    assert_eq!(err.sql_state(), "01000");
    // The failed move kept the old position
    assert_eq!(cursor.row_number(), 1);
}
