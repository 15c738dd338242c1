#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seed data conversion for the civic map store.
//!
//! Turns the open-data exports the store is seeded from into SQL: facility
//! point lists, village population summaries, and village boundary files.

pub mod facilities;
pub mod population;
pub mod villages;

use civic_map_database::DbError;

/// Errors that can occur while converting or importing seed data.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input parsed but has the wrong shape.
    #[error("Invalid input: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },

    /// Database write failed.
    #[error(transparent)]
    Db(#[from] DbError),
}
