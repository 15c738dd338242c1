#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard state for the civic map.
//!
//! [`Dashboard`] runs load cycles against a [`RemoteStore`]: it resolves
//! the area to show, fetches facilities, tickets, and their history, joins
//! them, and publishes the result as an immutable [`DashboardSnapshot`].
//! Overlapping loads are sequenced by a request token so only the most
//! recently started one is committed. [`MapState`] holds the scenario and
//! layer choices, and [`views`] projects a snapshot plus a map state into
//! what the map and dashboard pages render.

pub mod scenario;
pub mod snapshot;
mod state;
pub mod views;

use civic_map_store::StoreError;

pub use civic_map_store::RemoteStore;
pub use scenario::{BackgroundMode, Layer, MapAction, MapState, NoiseTime, Scenario};
pub use snapshot::{DashboardSnapshot, LoadRequest};
pub use state::Dashboard;

/// Errors that abort a load cycle or a dashboard command.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The remote store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An area row has no county.
    #[error("Area {area_id} has no county; every area needs its county column filled in")]
    MissingCounty {
        /// Offending area.
        area_id: String,
    },

    /// No area could be chosen for the request.
    #[error("No area is available to load map data for")]
    NoArea,
}
