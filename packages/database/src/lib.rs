#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Direct Postgres access for the civic map.
//!
//! The dashboard reads through the `PostgREST` front of this database; this
//! crate is what the seed tooling uses to apply the schema and write bulk
//! data. Migrations are embedded with `switchy_schema` and include the
//! `PostGIS` functions behind the spatial remote procedures.

pub mod db;
pub mod progress;
pub mod villages;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Could not open a connection.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_migration_has_up_and_down() {
        let dirs: Vec<_> = MIGRATIONS_DIR.dirs().collect();
        assert!(!dirs.is_empty());
        for dir in dirs {
            let name = dir.path().display().to_string();
            assert!(dir.get_file(dir.path().join("up.sql")).is_some(), "{name} lacks up.sql");
            assert!(dir.get_file(dir.path().join("down.sql")).is_some(), "{name} lacks down.sql");
        }
    }

    #[test]
    fn schema_defines_spatial_procedures() {
        let sql: String = MIGRATIONS_DIR
            .dirs()
            .filter_map(|d| d.get_file(d.path().join("up.sql")))
            .filter_map(|f| f.contents_utf8())
            .collect();
        for name in [
            "find_area_by_point",
            "facilities_in_area",
            "tickets_in_area",
            "store_capabilities",
        ] {
            assert!(sql.contains(name), "missing {name}");
        }
    }
}
