//! SQL surface: queries, DML forms, DDL and parameters

#[path = "testutils/mod.rs"]
mod testutils;

use rowlite::{Command, DataType, ExecutionError, StatementContext, Value};
use testutils::test_fixture::TestFixture;

fn sales_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    let t = fixture.table();
    fixture
        .exec(&format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY, region VARCHAR(10), amount INTEGER)",
            t
        ))
        .unwrap();
    fixture
        .exec(&format!(
            "INSERT INTO {} VALUES (1, 'north', 50), (2, 'south', 120), (3, 'north', 70), \
             (4, 'east', 10), (5, 'south', 30), (6, 'east', NULL)",
            t
        ))
        .unwrap();
    fixture
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

#[test]
fn test_group_by_having_order_by() {
    let fixture = sales_fixture();
    let rows = fixture
        .query(&format!(
            "SELECT region, SUM(amount) AS total, COUNT(*), COUNT(amount) FROM {} \
             GROUP BY region HAVING SUM(amount) > 15 ORDER BY total DESC",
            fixture.table()
        ))
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::from("south"), int(150), int(2), int(2)],
            vec![Value::from("north"), int(120), int(2), int(2)],
        ]
    );
}

#[test]
fn test_aggregates_without_group_by() {
    let fixture = sales_fixture();
    let t = fixture.table();
    let rows = fixture
        .query(&format!(
            "SELECT COUNT(*), MIN(amount), MAX(amount), AVG(amount) FROM {} WHERE region = 'north'",
            t
        ))
        .unwrap();
    assert_eq!(rows, vec![vec![int(2), int(50), int(70), Value::Double(60.0)]]);

    // One row even when nothing matches
    let rows = fixture
        .query(&format!(
            "SELECT COUNT(*), SUM(amount), AVG(amount) FROM {} WHERE id > 100",
            t
        ))
        .unwrap();
    assert_eq!(rows, vec![vec![int(0), Value::Null, Value::Null]]);
}

#[test]
fn test_wildcard_with_group_by_rejected() {
    let fixture = sales_fixture();
    let err = fixture
        .query(&format!("SELECT * FROM {} GROUP BY region", fixture.table()))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::UnsupportedOperation(_)));
}

#[test]
fn test_order_by_ordinal_and_top() {
    let fixture = sales_fixture();
    let rows = fixture
        .query(&format!(
            "SELECT TOP 3 id, amount FROM {} WHERE amount IS NOT NULL ORDER BY 2 DESC",
            fixture.table()
        ))
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![int(2), int(120)],
            vec![int(3), int(70)],
            vec![int(1), int(50)],
        ]
    );

    let rows = fixture
        .query(&format!(
            "SELECT id FROM {} ORDER BY region, amount DESC",
            fixture.table()
        ))
        .unwrap();
    let ids: Vec<Value> = rows.into_iter().map(|mut r| r.remove(0)).collect();
    assert_eq!(ids, vec![int(4), int(6), int(3), int(1), int(2), int(5)]);
}

#[test]
fn test_computed_projection() {
    let fixture = sales_fixture();
    let mut cursor = TestFixture::open_cursor(
        fixture.conn(),
        &format!(
            "SELECT id, amount * 2 AS doubled, region || '!', -amount FROM {} WHERE id = 1",
            fixture.table()
        ),
        &StatementContext::default(),
    )
    .unwrap();
    assert_eq!(cursor.columns()[1].name, "doubled");
    assert_eq!(cursor.columns()[2].name, "region || '!'");
    assert!(cursor.next().unwrap());
    assert_eq!(
        cursor.values().unwrap(),
        vec![int(1), int(100), Value::from("north!"), int(-50)]
    );
}

#[test]
fn test_null_logic() {
    let fixture = sales_fixture();
    let t = fixture.table();
    let count = |filter: &str| {
        fixture
            .query(&format!("SELECT id FROM {} WHERE {}", t, filter))
            .unwrap()
            .len()
    };
    assert_eq!(count("amount = NULL"), 0);
    assert_eq!(count("amount IS NULL"), 1);
    assert_eq!(count("NOT amount > 20"), 1);
    assert_eq!(count("amount > 20 OR region = 'east'"), 6);
    assert_eq!(count("amount > 20 AND region = 'east'"), 0);
    assert_eq!(count("amount <> 50"), 4);
}

#[test]
fn test_insert_select() {
    let fixture = sales_fixture();
    let t = fixture.table();
    let archive = format!("{}_archive", t);
    fixture
        .exec(&format!(
            "CREATE TABLE {} (id INTEGER, amount BIGINT)",
            archive
        ))
        .unwrap();
    let count = fixture
        .exec(&format!(
            "INSERT INTO {} (amount, id) SELECT amount, id FROM {} WHERE region = 'south'",
            archive, t
        ))
        .unwrap();
    assert_eq!(count, 2);
    let rows = fixture
        .query(&format!("SELECT id, amount FROM {} ORDER BY id", archive))
        .unwrap();
    assert_eq!(rows, vec![vec![int(2), int(120)], vec![int(5), int(30)]]);
}

#[test]
fn test_update_and_delete_counts() {
    let fixture = sales_fixture();
    let t = fixture.table();
    assert_eq!(
        fixture
            .exec(&format!("UPDATE {} SET amount = amount + 1, region = 'west' WHERE region = 'east'", t))
            .unwrap(),
        2
    );
    let rows = fixture
        .query(&format!("SELECT amount FROM {} WHERE region = 'west' ORDER BY id", t))
        .unwrap();
    assert_eq!(rows, vec![vec![int(11)], vec![Value::Null]]);
    assert_eq!(fixture.exec(&format!("DELETE FROM {} WHERE amount < 60", t)).unwrap(), 3);
    assert_eq!(fixture.exec(&format!("DELETE FROM {}", t)).unwrap(), 3);
    assert_eq!(fixture.exec(&format!("DELETE FROM {}", t)).unwrap(), 0);
}

#[test]
fn test_type_checks() {
    let fixture = sales_fixture();
    let t = fixture.table();
    fixture
        .exec(&format!("INSERT INTO {} VALUES ('7', 'west', '15')", t))
        .expect("Numeric strings convert to INTEGER");
    assert_eq!(
        fixture
            .query(&format!("SELECT amount FROM {} WHERE id = 7", t))
            .unwrap(),
        vec![vec![int(15)]]
    );

    let err = fixture
        .exec(&format!("INSERT INTO {} VALUES (8, 'west', 'lots')", t))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::StorageError(_)));
    let err = fixture
        .exec(&format!("INSERT INTO {} VALUES (8, 'far-far-away', 1)", t))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::StorageError(_)));
    let err = fixture
        .exec(&format!("INSERT INTO {} VALUES (8, 'west')", t))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::InvalidArgument(_)));
    let err = fixture
        .query(&format!("SELECT id FROM {} WHERE amount / 0 = 1", t))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ExpressionError(_)));
}

#[test]
fn test_alter_table() {
    let fixture = sales_fixture();
    let t = fixture.table();
    fixture
        .exec(&format!("ALTER TABLE {} ADD COLUMN note VARCHAR(20)", t))
        .unwrap();
    let rows = fixture
        .query(&format!("SELECT note FROM {} WHERE id = 1", t))
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Null]]);
    fixture
        .exec(&format!("UPDATE {} SET note = 'checked' WHERE id = 1", t))
        .unwrap();

    fixture
        .exec(&format!("ALTER TABLE {} DROP COLUMN region", t))
        .unwrap();
    let rows = fixture
        .query(&format!("SELECT * FROM {} WHERE id = 1", t))
        .unwrap();
    assert_eq!(rows, vec![vec![int(1), int(50), Value::from("checked")]]);
    assert!(fixture
        .query(&format!("SELECT region FROM {}", t))
        .is_err());
}

#[test]
fn test_table_lifecycle_errors() {
    let fixture = sales_fixture();
    let t = fixture.table();
    let err = fixture
        .exec(&format!("CREATE TABLE {} (id INTEGER)", t))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::StorageError(_)));

    fixture.exec(&format!("DROP TABLE {}", t)).unwrap();
    assert!(fixture.exec(&format!("DROP TABLE {}", t)).is_err());
    assert!(fixture.db().table_names().iter().all(|name| name != t));
}

#[test]
fn test_parameters() {
    let fixture = sales_fixture();
    let mut command = Command::prepare(&format!(
        "SELECT id FROM {} WHERE amount > ? AND region = ? ORDER BY id",
        fixture.table()
    ))
    .unwrap();
    assert_eq!(command.parameter_count(), 2);

    // Unbound parameters are rejected
    command.bind_parameter(1, int(20), None).unwrap();
    let err = command
        .execute(fixture.conn(), &StatementContext::default())
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ParameterError(_)));

    command
        .bind_parameter(2, Value::from("south"), Some(&DataType::Varchar(Some(10))))
        .unwrap();
    assert!(command
        .execute(fixture.conn(), &StatementContext::default())
        .unwrap());
    let cursor = command.result_cursor().unwrap();
    let mut ids = Vec::new();
    while cursor.next().unwrap() {
        ids.push(cursor.get(1).unwrap());
    }
    assert_eq!(ids, vec![int(2), int(5)]);

    assert!(matches!(
        command.bind_parameter(3, int(1), None),
        Err(ExecutionError::ParameterError(_))
    ));
    assert!(command.bind_parameter(1, Value::from("x"), Some(&DataType::Integer)).is_err());
    command.clear_parameters();
    assert!(command
        .execute(fixture.conn(), &StatementContext::default())
        .is_err());
}
