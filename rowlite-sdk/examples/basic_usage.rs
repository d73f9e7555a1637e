//! Basic usage example for RowLite SDK
//!
//! This example demonstrates the core features of the RowLite Rust SDK:
//! - Opening a database and connections
//! - Executing statements and batches
//! - Updatable, scrollable result sets
//! - Using transactions and savepoints
//! - Typed result deserialization
//!
//! Run with: cargo run --example basic_usage

use rowlite_sdk::{Concurrency, CursorType, Database, Error, GeneratedKeys};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
}

fn main() -> Result<(), Error> {
    println!("=== RowLite SDK Basic Usage Example ===\n");

    // 1. Open a database
    println!("1. Opening in-memory database...");
    let db = Database::open_in_memory();
    let conn = db.connect();
    println!("   ✓ Connection {} opened\n", conn.id());

    // 2. Create a table
    println!("2. Creating table...");
    let mut stmt = conn.create_statement()?;
    stmt.execute_update(
        "CREATE TABLE accounts (id INTEGER IDENTITY PRIMARY KEY, owner VARCHAR(20), balance INTEGER)",
    )?;
    println!("   ✓ Table accounts created\n");

    // 3. Insert data with a prepared batch
    println!("3. Inserting data with a batch...");
    let mut insert = conn.prepare_statement_with_keys(
        "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
        GeneratedKeys::Auto,
    )?;
    for (owner, balance) in [("alice", 100), ("bob", 50), ("carol", 75)] {
        insert.set_string(1, owner)?;
        insert.set_long(2, balance)?;
        insert.add_batch()?;
    }
    let counts = insert.execute_batch()?;
    println!("   ✓ Batch update counts: {:?}\n", counts);

    // 4. Transfer money in a transaction
    println!("4. Transferring 30 from alice to bob...");
    {
        let tx = conn.transaction()?;
        tx.execute("UPDATE accounts SET balance = balance - 30 WHERE owner = 'alice'")?;
        tx.execute("UPDATE accounts SET balance = balance + 30 WHERE owner = 'bob'")?;
        tx.commit()?;
    }
    println!("   ✓ Committed\n");

    // 5. Edit rows through an updatable result set
    println!("5. Editing through a scrollable result set...");
    let mut editor =
        conn.create_statement_with(CursorType::ScrollSensitive, Concurrency::Updatable)?;
    let mut rs = editor.execute_query("SELECT * FROM accounts ORDER BY id")?;
    if rs.last()? {
        rs.update_long("balance", 0)?;
        rs.update_row()?;
        println!("   ✓ Row {} now has balance {}", rs.row(), rs.get_long("balance")?);
    }
    rs.move_to_insert_row()?;
    rs.update_string("owner", "dave")?;
    rs.update_long("balance", 10)?;
    rs.insert_row()?;
    println!("   ✓ Inserted a row, result set now holds {} rows\n", rs.row_count());

    // 6. Typed deserialization
    println!("6. Using typed deserialization...");
    let mut rs = stmt.execute_query("SELECT id, owner, balance FROM accounts ORDER BY id")?;
    let accounts: Vec<Account> = rs.deserialize_rows()?;
    for account in &accounts {
        println!("   - {:?}", account);
    }
    println!();

    // 7. Transaction with rollback
    println!("7. Demonstrating transaction rollback...");
    {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM accounts")?;
        println!("   Deleted every account in the transaction");
        // Transaction is dropped without commit - automatically rolls back
    }
    let mut rs = stmt.execute_query("SELECT COUNT(*) FROM accounts")?;
    let count: i64 = rs.scalar()?;
    println!("   Account count after rollback: {}\n", count);

    println!("=== Example completed successfully ===");
    Ok(())
}
