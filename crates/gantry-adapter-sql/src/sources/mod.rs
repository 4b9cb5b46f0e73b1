//! SQL source kinds. Each exposes its sqlx pool as the source capability.

pub mod postgres;
pub mod sqlite;

pub use postgres::{PostgresSource, PostgresSourceConfig};
pub use sqlite::{SqliteSource, SqliteSourceConfig};
