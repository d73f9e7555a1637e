//! Test utilities for RowLite integration tests
//!
//! `TestFixture` owns an in-memory database, a default connection and a
//! uniquely named table so tests never interfere with each other.

#![allow(dead_code)]

pub mod test_fixture;
