#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived dashboard aggregates.
//!
//! Output types of the analytics crate: per-area summaries and the counts
//! that feed the risk score, chart series, background-coloring averages,
//! the missions wall inspection feed, and the admin ticket list.

use chrono::NaiveDate;
use civic_map_domain_models::{HealthGrade, TicketStatusCompact};
use serde::{Deserialize, Serialize};

/// Counts that feed the per-area risk score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskInputs {
    /// Tickets that are not completed or cancelled.
    pub open_tickets: u32,
    /// Open tickets past their SLA deadline. Never more than `open_tickets`
    /// when produced by `summarize_areas`.
    pub overdue_tickets: u32,
    /// Facilities whose maintenance status is overdue.
    pub overdue_facilities: u32,
    /// Facilities whose maintenance status is in progress.
    pub in_progress_facilities: u32,
}

/// Facility and ticket counts for one area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStats {
    /// Facilities inside the area.
    pub facilities: u32,
    /// Open tickets inside the area.
    pub open_tickets: u32,
    /// Overdue tickets inside the area.
    pub overdue_tickets: u32,
}

/// Summary card for one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    /// Area id.
    pub id: String,
    /// Area name.
    pub name: String,
    /// Client-derived risk score, 0-100.
    pub risk_score: u32,
    /// Facility count.
    pub facilities: u32,
    /// Open ticket count.
    pub open_tickets: u32,
    /// Overdue ticket count.
    pub overdue_tickets: u32,
}

/// One slice of the health-grade pie chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    /// Grade.
    pub grade: HealthGrade,
    /// Number of facilities.
    pub value: u32,
}

/// One bar of the tickets-by-type chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeCount {
    /// Ticket type key.
    #[serde(rename = "type")]
    pub ticket_type: String,
    /// Number of tickets.
    pub count: u32,
    /// Of those, open tickets past their SLA deadline.
    pub overdue: u32,
}

/// A point of the risk trend line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Day the score applies to.
    pub date: NaiveDate,
    /// Score.
    pub score: f64,
}

/// Mean noise readings of the stations inside an area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseAverages {
    /// Morning mean.
    pub morning: f64,
    /// Afternoon mean.
    pub afternoon: f64,
    /// Night mean.
    pub night: f64,
}

/// A facility due for a citizen inspection on the missions wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingInspection {
    /// Facility id.
    pub id: String,
    /// Facility name.
    pub name: String,
    /// Facility type key.
    #[serde(rename = "type")]
    pub facility_type: String,
    /// Type label, falling back to the type key.
    pub type_label: String,
    /// Type emoji.
    pub type_emoji: Option<String>,
    /// Containing area id.
    pub area_id: Option<String>,
    /// Containing area name.
    pub area_name: Option<String>,
    /// Whole days until the next inspection is due, never negative.
    pub due_in_days: i64,
    /// Day of the last inspection.
    pub last_inspection: NaiveDate,
}

/// Narrows the missions wall feed. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionFilter {
    /// Only facilities inside this area.
    pub area_id: Option<String>,
    /// Only facilities of this type.
    pub facility_type: Option<String>,
    /// Case-insensitive substring of the facility or area name.
    pub keyword: Option<String>,
}

/// One row of the admin ticket list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRow {
    /// Ticket id.
    pub id: String,
    /// Description, falling back to the ticket type.
    pub title: String,
    /// Compact status.
    pub status: TicketStatusCompact,
    /// Severity, 1 when unset.
    pub severity: u8,
    /// Day the SLA runs out.
    pub sla_due: Option<NaiveDate>,
}
