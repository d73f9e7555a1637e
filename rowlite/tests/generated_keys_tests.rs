//! Generated key retrieval after inserts

#[path = "testutils/mod.rs"]
mod testutils;

use rowlite::{Command, Cursor, ExecutionError, GeneratedKeys, StatementContext, Value};
use testutils::test_fixture::TestFixture;

fn orders_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    fixture
        .exec(&format!(
            "CREATE TABLE {} (id INTEGER IDENTITY PRIMARY KEY, item VARCHAR(20), qty INTEGER)",
            fixture.table()
        ))
        .expect("Failed to create table");
    fixture
}

fn insert_with_keys(fixture: &TestFixture, keys: GeneratedKeys) -> Result<Cursor, ExecutionError> {
    let mut command = Command::prepare(&format!(
        "INSERT INTO {} (item, qty) VALUES ('apple', 3), ('pear', 5)",
        fixture.table()
    ))?;
    let context = StatementContext::default().with_generated_keys(keys);
    assert!(!command.execute(fixture.conn(), &context)?);
    assert_eq!(command.update_count(), Some(2));
    command.generated_keys()
}

fn collect(mut cursor: Cursor) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    while cursor.next().unwrap() {
        rows.push(cursor.values().unwrap());
    }
    rows
}

#[test]
fn test_auto_keys_report_identity_column() {
    let fixture = orders_fixture();
    let keys = insert_with_keys(&fixture, GeneratedKeys::Auto).unwrap();
    assert_eq!(keys.columns().len(), 1);
    assert_eq!(keys.columns()[0].name, "id");
    assert!(!keys.is_updatable());
    assert_eq!(
        collect(keys),
        vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]
    );

    // The counter keeps counting across statements
    let keys = insert_with_keys(&fixture, GeneratedKeys::Auto).unwrap();
    assert_eq!(
        collect(keys),
        vec![vec![Value::Integer(3)], vec![Value::Integer(4)]]
    );
}

#[test]
fn test_auto_keys_fall_back_to_primary_key() {
    let fixture = TestFixture::with_accounts();
    let mut command = Command::prepare(&format!(
        "INSERT INTO {} VALUES (9, 'nine', 900)",
        fixture.table()
    ))
    .unwrap();
    let context = StatementContext::default().with_generated_keys(GeneratedKeys::Auto);
    command.execute(fixture.conn(), &context).unwrap();
    let keys = command.generated_keys().unwrap();
    assert_eq!(keys.columns()[0].name, "id");
    assert_eq!(collect(keys), vec![vec![Value::Integer(9)]]);
}

#[test]
fn test_keys_by_name_and_index() {
    let fixture = orders_fixture();
    let keys = insert_with_keys(
        &fixture,
        GeneratedKeys::ColumnNames(vec!["QTY".into(), "id".into()]),
    )
    .unwrap();
    assert_eq!(
        collect(keys),
        vec![
            vec![Value::Integer(3), Value::Integer(1)],
            vec![Value::Integer(5), Value::Integer(2)],
        ]
    );

    let keys = insert_with_keys(&fixture, GeneratedKeys::ColumnIndexes(vec![2])).unwrap();
    assert_eq!(keys.columns()[0].name, "item");
    assert_eq!(
        collect(keys),
        vec![vec![Value::from("apple")], vec![Value::from("pear")]]
    );
}

#[test]
fn test_invalid_key_request_fails_the_insert() {
    let fixture = orders_fixture();
    let err = insert_with_keys(&fixture, GeneratedKeys::ColumnIndexes(vec![4])).unwrap_err();
    assert!(matches!(err, ExecutionError::InvalidArgument(_)));
    let err = insert_with_keys(
        &fixture,
        GeneratedKeys::ColumnNames(vec!["missing".into()]),
    )
    .unwrap_err();
    assert!(matches!(err, ExecutionError::StorageError(_)));

    assert_eq!(fixture.count_on(fixture.conn()).unwrap(), 0);
}

#[test]
fn test_keys_not_requested() {
    let fixture = orders_fixture();
    let err = insert_with_keys(&fixture, GeneratedKeys::None).unwrap_err();
    assert!(matches!(err, ExecutionError::GeneratedKeysNotRequested));
    assert_eq!(fixture.count_on(fixture.conn()).unwrap(), 2);
}

#[test]
fn test_keys_retrieved_once() {
    let fixture = orders_fixture();
    let mut command = Command::prepare(&format!(
        "UPDATE {} SET qty = 0",
        fixture.table()
    ))
    .unwrap();
    let context = StatementContext::default().with_generated_keys(GeneratedKeys::Auto);
    command.execute(fixture.conn(), &context).unwrap();

    // Statements other than INSERT report an empty key set
    let keys = command.generated_keys().unwrap();
    assert!(keys.is_empty());
    assert!(matches!(
        command.generated_keys(),
        Err(ExecutionError::InvalidState(_))
    ));
}
