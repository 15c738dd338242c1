#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area, facility, and ticket record types for the civic map.
//!
//! These are the normalized in-memory records the dashboard works with
//! after rows have been fetched from the remote store. Field names follow
//! the JSON API (`camelCase`); store column names live in the store crate's
//! row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A longitude/latitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Creates a new point.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Squared planar distance in degrees. Only meaningful for ranking.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f64 {
        (self.lng - other.lng).powi(2) + (self.lat - other.lat).powi(2)
    }
}

/// A single `[lng, lat]` vertex.
pub type Position = [f64; 2];

/// A closed (or not) list of vertices.
pub type Ring = Vec<Position>;

/// Polygonal area boundary, serialized the `GeoJSON` way.
///
/// Only the first ring of each polygon is used for containment; any
/// further rings (holes) are carried along but ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum AreaGeometry {
    /// A single polygon (outer ring first).
    Polygon(Vec<Ring>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Ring>>),
}

impl AreaGeometry {
    /// Iterates over the outer ring of every constituent polygon.
    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> {
        let polygons: Vec<&Vec<Ring>> = match self {
            Self::Polygon(rings) => vec![rings],
            Self::MultiPolygon(polys) => polys.iter().collect(),
        };
        polygons.into_iter().filter_map(|rings| rings.first())
    }

    /// Iterates over every vertex of every ring.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        let rings: Vec<&Ring> = match self {
            Self::Polygon(rings) => rings.iter().collect(),
            Self::MultiPolygon(polys) => polys.iter().flatten().collect(),
        };
        rings.into_iter().flatten()
    }
}

/// Lifecycle status of a ticket as stored.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
    /// Newly reported.
    Open,
    /// Assigned to a crew.
    Assigned,
    /// Work has started.
    InProgress,
    /// Resolved.
    Completed,
    /// Withdrawn or rejected.
    Cancelled,
    /// Any value this build does not recognize. Treated as active.
    #[serde(other)]
    Unknown,
}

impl TicketStatus {
    /// Parses a stored status string, mapping anything unrecognized to
    /// [`TicketStatus::Unknown`].
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().parse().unwrap_or(Self::Unknown)
    }

    /// Whether the ticket no longer needs attention.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Compact display status of a ticket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatusCompact {
    /// Shown for closed tickets as well (see `derive_ticket_status`).
    Open,
    /// Active and not yet past its SLA deadline.
    WithinSla,
    /// Active and past its SLA deadline.
    Overdue,
}

/// Maintenance status of a facility.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacilityStatus {
    /// Recently inspected, no related ticket.
    Safe,
    /// Has a related ticket that is not overdue.
    InProgress,
    /// Overdue ticket, stale inspection, or never inspected.
    Overdue,
}

impl FacilityStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Safe, Self::InProgress, Self::Overdue]
    }
}

/// Facility health grade.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum HealthGrade {
    /// Good condition.
    A,
    /// Fair condition. Also the display default when no grade is recorded.
    #[default]
    B,
    /// Poor condition.
    C,
}

impl HealthGrade {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::C]
    }
}

/// Three-level severity chosen on the ticket form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeverityLevel {
    /// Stored as 1.
    Low = 1,
    /// Stored as 2.
    Medium = 2,
    /// Stored as 3.
    High = 3,
}

impl SeverityLevel {
    /// Returns the integer stored in the `tickets.severity` column.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from its stored integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-3.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(InvalidSeverityError { value }),
        }
    }
}

/// Error returned when attempting to create a [`SeverityLevel`] from an
/// invalid stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-3", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// An administrative area (village or district).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    /// Store identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Official village code, when known.
    pub code: Option<String>,
    /// County the area belongs to. Never empty for a loaded area.
    pub county: String,
    /// Boundary. Absent when the area was fetched without geometry.
    pub geometry: Option<AreaGeometry>,
    /// Resident population.
    pub population_total: Option<u64>,
    /// Males per 100 females.
    pub gender_ratio: Option<f64>,
    /// Population-weighted mean age.
    pub weighted_avg_age: Option<f64>,
    /// Latest stored risk score, if the store has one.
    pub risk_score: Option<f64>,
}

/// The subset of an [`Area`] used for search and selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaOption {
    /// Store identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Official village code, when known.
    pub code: Option<String>,
    /// County.
    pub county: String,
}

impl From<&Area> for AreaOption {
    fn from(area: &Area) -> Self {
        Self {
            id: area.id.clone(),
            name: area.name.clone(),
            code: area.code.clone(),
            county: area.county.clone(),
        }
    }
}

/// Identifier and county of the area containing a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaRef {
    /// Store identifier.
    pub id: String,
    /// County.
    pub county: String,
}

/// A public facility (park, streetlight, police station, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Store identifier.
    pub id: String,
    /// Explicit area reference, when the store has one.
    pub area_id: Option<String>,
    /// Facility type key (e.g. `"cctv"`, `"park"`).
    #[serde(rename = "type")]
    pub facility_type: String,
    /// Localized type label from `facility_type_meta`.
    pub type_label: Option<String>,
    /// Emoji shown next to the type label.
    pub type_emoji: Option<String>,
    /// Icon name for map markers.
    pub type_icon_name: Option<String>,
    /// Display name.
    pub name: String,
    /// Location.
    pub coords: Option<LngLat>,
    /// Health grade.
    pub grade: Option<HealthGrade>,
    /// Most recent inspection.
    pub last_inspection: Option<DateTime<Utc>>,
    /// Incidents recorded in the year before the last inspection.
    pub incidents_past_year: Option<u32>,
    /// Notes from the most recent inspection.
    pub latest_inspection_notes: Option<String>,
}

/// A citizen- or system-raised issue report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Store identifier.
    pub id: String,
    /// Explicit area reference.
    pub area_id: Option<String>,
    /// Related facility.
    pub facility_id: Option<String>,
    /// Location.
    pub coords: Option<LngLat>,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Issue type (free-form key).
    #[serde(rename = "type")]
    pub ticket_type: String,
    /// Stored severity, 1-3.
    pub severity: Option<u8>,
    /// Resolution deadline.
    pub sla_due_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Reporter description.
    pub description: Option<String>,
    /// Attached photos.
    pub photo_urls: Vec<String>,
}

/// One entry of a ticket's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEvent {
    /// Ticket this event belongs to.
    pub ticket_id: String,
    /// Event type (e.g. `"created"`, `"work_started"`, `"completed"`).
    pub event_type: String,
    /// When the event happened.
    pub created_at: DateTime<Utc>,
    /// Opaque payload.
    pub data: Option<serde_json::Value>,
}

/// A recorded facility inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityInspection {
    /// Inspected facility.
    pub facility_id: String,
    /// Inspection time.
    pub inspected_at: DateTime<Utc>,
    /// Incidents in the year before the inspection.
    pub incident_count_last_year: Option<u32>,
    /// Inspector notes.
    pub notes: Option<String>,
}

/// A stored risk score for an area at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaRiskSnapshot {
    /// Area.
    pub area_id: String,
    /// Score, 0-100.
    pub risk_score: f64,
    /// When the score was computed.
    pub computed_at: DateTime<Utc>,
}

/// Display metadata for a facility type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityTypeMeta {
    /// Type key.
    #[serde(rename = "type")]
    pub facility_type: String,
    /// Localized label.
    pub label: String,
    /// Emoji.
    pub emoji: Option<String>,
    /// Icon name for map markers.
    pub icon_name: Option<String>,
}

/// Age of a surveyed building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingAgePoint {
    /// Store identifier.
    pub id: String,
    /// Building name.
    pub name: String,
    /// Location.
    pub coords: LngLat,
    /// Age in years.
    pub age_years: f64,
}

/// Road noise readings at a monitoring station, in dB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseMeasurement {
    /// Store identifier.
    pub id: String,
    /// Station name.
    pub name: String,
    /// Location.
    pub coords: LngLat,
    /// Morning reading.
    pub morning: f64,
    /// Afternoon reading.
    pub afternoon: f64,
    /// Night reading.
    pub night: f64,
}

/// A task on the citizen missions wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    /// Store identifier.
    pub id: String,
    /// Area the mission is about.
    pub area_id: Option<String>,
    /// Facility the mission is about.
    pub facility_id: Option<String>,
    /// Title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Mission type.
    #[serde(rename = "type")]
    pub mission_type: Option<String>,
    /// Status as stored.
    pub status: String,
    /// Due date.
    pub due_at: Option<DateTime<Utc>>,
}

/// A ticket submitted from the report form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    /// Facility being reported.
    pub facility_id: Option<String>,
    /// Area being reported.
    pub area_id: Option<String>,
    /// Issue type key.
    pub issue_type: String,
    /// Severity chosen by the reporter.
    pub severity: SeverityLevel,
    /// Description.
    pub description: String,
    /// Location picked on the map.
    pub coordinates: Option<LngLat>,
}

/// Identifier and status of a freshly inserted ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketReceipt {
    /// New ticket id.
    pub id: String,
    /// Status as stored (always `"open"` for new tickets).
    pub status: String,
}
