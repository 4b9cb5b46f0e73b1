//! # gantry-adapter-sql
//!
//! SQL source and tool kinds for the gantry tool gateway, built on sqlx.
//!
//! | Kind | Family | Capability |
//! |------|--------|------------|
//! | `postgres` | source | `sqlx::PgPool` |
//! | `sqlite` | source | `sqlx::SqlitePool` |
//! | `postgres-sql` | tool | fixed statement, `$n` placeholders |
//! | `postgres-execute-sql` | tool | caller-supplied statement |
//! | `postgres-list-schemas` | tool | prebuilt schema listing |
//! | `sqlite-sql` | tool | fixed statement, `?` placeholders |
//! | `sqlite-execute-sql` | tool | caller-supplied statement |
//!
//! Results are a JSON array of row objects with columns in select-list
//! order, or `null` when the statement returns no rows.

pub mod executor;
pub mod sources;
pub mod tools;

use gantry_core::{ConfigError, Registries};

pub use executor::{JsonRow, SqlExecutor, SqlParam, rows_to_value};

/// Registers every source and tool kind of this crate.
pub fn register(registries: &mut Registries) -> Result<(), ConfigError> {
    registries
        .sources
        .try_register(sources::postgres::KIND, sources::postgres::decode)?;
    registries
        .sources
        .try_register(sources::sqlite::KIND, sources::sqlite::decode)?;

    let tool_kinds = &mut registries.tools;
    tool_kinds.try_register(tools::postgres::SQL_KIND, tools::postgres::decode_sql)?;
    tool_kinds.try_register(
        tools::postgres::EXECUTE_SQL_KIND,
        tools::postgres::decode_execute_sql,
    )?;
    tool_kinds.try_register(
        tools::postgres::LIST_SCHEMAS_KIND,
        tools::postgres::decode_list_schemas,
    )?;
    tool_kinds.try_register(tools::sqlite::SQL_KIND, tools::sqlite::decode_sql)?;
    tool_kinds.try_register(tools::sqlite::EXECUTE_SQL_KIND, tools::sqlite::decode_execute_sql)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_kinds() {
        let mut registries = Registries::new();
        register(&mut registries).unwrap();
        let sources: Vec<&str> = registries.sources.kinds().collect();
        assert_eq!(sources, vec!["postgres", "sqlite"]);
        assert_eq!(registries.tools.kinds().count(), 5);
        assert!(registries.tools.lookup("sqlite-sql").is_some());
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registries = Registries::new();
        register(&mut registries).unwrap();
        let err = register(&mut registries).unwrap_err();
        assert_eq!(err.to_string(), "source kind \"postgres\" is already registered");
    }
}
