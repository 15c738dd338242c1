#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote store access for the civic map.
//!
//! The store is a `PostgREST` endpoint in front of the civic map Postgres
//! schema. [`RemoteStore`] is the seam the dashboard talks to;
//! [`PostgrestStore`] is the HTTP implementation. Every method returns
//! normalized domain records, never raw rows.

pub mod capabilities;
pub mod client;
pub mod config;
pub mod postgrest;
mod retry;
pub mod rows;

use async_trait::async_trait;
use civic_map_domain_models::{
    Area, AreaRef, AreaRiskSnapshot, BuildingAgePoint, Facility, FacilityInspection,
    FacilityTypeMeta, LngLat, Mission, NewTicket, NoiseMeasurement, Ticket, TicketEvent,
    TicketReceipt,
};

pub use capabilities::{Capabilities, Capability};
pub use config::StoreConfig;
pub use postgrest::PostgrestStore;

/// Fixed message shown when the store credentials are missing.
pub const NOT_CONFIGURED_MESSAGE: &str =
    "Remote store is not configured: set CIVIC_MAP_STORE_URL and CIVIC_MAP_STORE_ANON_KEY";

/// Errors that can occur while talking to the remote store.
///
/// The `Display` output of every variant is suitable for showing to the
/// user as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store URL or anon key is missing.
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    NotConfigured,

    /// A selected column does not exist.
    #[error("The store schema is missing a column ({message}). Run `civic_map_seed migrate` to apply the latest migrations.")]
    MissingColumn {
        /// Message reported by the store.
        message: String,
    },

    /// A table or view does not exist.
    #[error("The store schema is missing a table ({message}). Run `civic_map_seed migrate` to apply the latest migrations.")]
    MissingTable {
        /// Message reported by the store.
        message: String,
    },

    /// A remote procedure does not exist.
    #[error("The store is missing a remote procedure ({message}). Run `civic_map_seed migrate` to install the spatial functions.")]
    MissingProcedure {
        /// Message reported by the store.
        message: String,
    },

    /// The store returned an error response.
    #[error("Store request failed (HTTP {status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Postgres or `PostgREST` error code, when present.
        code: Option<String>,
        /// Message reported by the store.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which areas to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaScope {
    /// Every area of one county.
    County(String),
    /// A single area.
    Area(String),
    /// Every area in the store.
    All,
}

/// Data access used by the dashboard.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Optional server-side features this store supports.
    fn capabilities(&self) -> &Capabilities;

    /// Resolves the area containing `point` server-side.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn find_area_by_point(&self, point: LngLat) -> Result<Option<AreaRef>, StoreError>;

    /// Fetches areas. Geometry is only selected when `with_geometry` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn areas(&self, scope: &AreaScope, with_geometry: bool) -> Result<Vec<Area>, StoreError>;

    /// Facilities inside an area, filtered server-side.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn facilities_in_area(&self, area_id: &str) -> Result<Vec<Facility>, StoreError>;

    /// Every facility.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn all_facilities(&self) -> Result<Vec<Facility>, StoreError>;

    /// Tickets inside an area, filtered server-side.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn tickets_in_area(&self, area_id: &str) -> Result<Vec<Ticket>, StoreError>;

    /// Every ticket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn all_tickets(&self) -> Result<Vec<Ticket>, StoreError>;

    /// Inspections of the given facilities, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn facility_inspections(
        &self,
        facility_ids: &[String],
    ) -> Result<Vec<FacilityInspection>, StoreError>;

    /// Events of the given tickets, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn ticket_events(&self, ticket_ids: &[String]) -> Result<Vec<TicketEvent>, StoreError>;

    /// Every stored risk snapshot, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn area_risk_snapshots(&self) -> Result<Vec<AreaRiskSnapshot>, StoreError>;

    /// Facility type display metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn facility_types(&self) -> Result<Vec<FacilityTypeMeta>, StoreError>;

    /// Surveyed building ages.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn building_ages(&self) -> Result<Vec<BuildingAgePoint>, StoreError>;

    /// Noise monitoring stations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn noise_measurements(&self) -> Result<Vec<NoiseMeasurement>, StoreError>;

    /// Citizen missions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails.
    async fn missions(&self) -> Result<Vec<Mission>, StoreError>;

    /// Inserts a citizen ticket and returns its id and status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert is rejected.
    async fn submit_ticket(&self, ticket: &NewTicket) -> Result<TicketReceipt, StoreError>;
}

/// Error body returned by `PostgREST` for rejected requests.
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl StoreError {
    /// Classifies a non-success store response by its structured error code.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.details)
            .or(parsed.hint)
            .unwrap_or_else(|| body.trim().to_string());

        match parsed.code.as_deref() {
            Some("42703") => Self::MissingColumn { message },
            Some("42P01" | "PGRST205") => Self::MissingTable { message },
            Some("42883" | "PGRST202") => Self::MissingProcedure { message },
            code => Self::Remote {
                status,
                code: code.map(str::to_string),
                message,
            },
        }
    }

    /// Whether the error means some part of the expected schema is absent.
    #[must_use]
    pub const fn is_missing_schema(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. } | Self::MissingTable { .. } | Self::MissingProcedure { .. }
        )
    }
}
