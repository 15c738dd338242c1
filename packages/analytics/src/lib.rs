#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Status derivations and per-area aggregates for the civic dashboard.
//!
//! Every function here is pure: it takes fetched records plus the
//! evaluation time and returns derived values. Nothing is cached.

pub mod attribution;
pub mod background;
pub mod breakdown;
pub mod facilities;
pub mod missions;
pub mod risk;
pub mod tickets;

pub use facilities::{INSPECTION_STALE_AFTER_DAYS, derive_facility_status, is_stale_inspection};
pub use risk::{risk_score, summarize_areas};
pub use tickets::{derive_ticket_status, is_active, is_overdue, related_ticket, ticket_rows};
