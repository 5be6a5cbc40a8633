//! Database module
//!
//! SQLite connection pool, schema migrations and the seeded sample formula.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
