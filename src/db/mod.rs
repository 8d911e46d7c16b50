//! SQLite-backed persistence: connection pooling, the error taxonomy, row
//! models, and repositories.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DbError, DbResult};
