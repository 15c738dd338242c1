//! Render-ready projections of a snapshot.
//!
//! Nothing here touches the store; every function takes a published
//! [`DashboardSnapshot`] (plus the [`MapState`] where the map display
//! matters) and a clock reading.

use chrono::{DateTime, Utc};
use civic_map_analytics::attribution::{facilities_in_area, tickets_in_area};
use civic_map_analytics::background::{building_age_by_area, noise_by_area, safety_score_by_area};
use civic_map_analytics::breakdown::{grade_distribution, search_areas, ticket_type_counts};
use civic_map_analytics::missions::upcoming_inspections;
use civic_map_analytics::risk::{area_stats, risk_trend};
use civic_map_analytics::{
    derive_facility_status, derive_ticket_status, is_active, related_ticket, summarize_areas,
    ticket_rows,
};
use civic_map_analytics_models::{
    AreaStats, AreaSummary, GradeCount, TicketRow, TicketTypeCount, TrendPoint,
    UpcomingInspection,
};
use civic_map_domain_models::{
    AreaGeometry, AreaOption, BuildingAgePoint, FacilityStatus, HealthGrade, LngLat, Mission,
    NoiseMeasurement, TicketStatusCompact,
};
use civic_map_spatial::AreaIndex;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::{BackgroundMode, DashboardSnapshot, Layer, MapState, NoiseTime, Scenario};

/// Most tickets listed in the nearby issues panel.
pub const NEARBY_ISSUE_LIMIT: usize = 6;

/// Most facilities listed in the admin inspection panel.
pub const ADMIN_INSPECTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityMarker {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub type_label: Option<String>,
    pub type_emoji: Option<String>,
    pub type_icon_name: Option<String>,
    pub coords: LngLat,
    pub status: FacilityStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMarker {
    pub id: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub facility_id: Option<String>,
    pub coords: LngLat,
    pub status: TicketStatusCompact,
    pub severity: Option<u8>,
}

/// An area polygon with every value the fill color can encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaFeature {
    pub id: String,
    pub name: String,
    pub county: String,
    pub geometry: AreaGeometry,
    /// Client-derived risk score.
    pub risk_score: u32,
    pub gender_ratio: Option<f64>,
    pub avg_age: Option<f64>,
    /// Mean age of surveyed buildings inside the area.
    pub building_age: Option<f64>,
    pub safety_score: Option<f64>,
    /// Mean noise at the selected time of day.
    pub noise: Option<f64>,
    /// The value the current background mode colors by.
    pub background_value: Option<f64>,
    /// Whether the area is drawn filled (heatmap layer).
    pub filled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyIssue {
    pub id: String,
    /// Ticket description, falling back to its type.
    pub label: String,
    pub area_name: String,
    pub status: TicketStatusCompact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityTypeOption {
    #[serde(rename = "type")]
    pub facility_type: String,
    pub label: String,
    pub emoji: Option<String>,
    pub icon_name: Option<String>,
    pub active: bool,
}

/// Everything the map page draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub scenario: Scenario,
    pub background_mode: BackgroundMode,
    pub noise_time: NoiseTime,
    pub areas: Vec<AreaFeature>,
    pub facilities: Vec<FacilityMarker>,
    pub tickets: Vec<TicketMarker>,
    pub building_ages: Vec<BuildingAgePoint>,
    pub noise_points: Vec<NoiseMeasurement>,
    pub summaries: Vec<AreaSummary>,
    pub selected_area: Option<AreaSummary>,
    pub nearby_issues: Vec<NearbyIssue>,
    pub facility_types: Vec<FacilityTypeOption>,
}

/// Projects the snapshot through the map display state.
#[must_use]
pub fn map_view(snapshot: &DashboardSnapshot, state: &MapState, now: DateTime<Utc>) -> MapView {
    let layers = &state.layers;
    let summaries = summarize_areas(&snapshot.areas, &snapshot.facilities, &snapshot.tickets, now);

    let facilities = if layers.get(Layer::Facilities) {
        facility_markers(snapshot, state, now)
    } else {
        Vec::new()
    };
    let tickets = if layers.get(Layer::Tickets) {
        ticket_markers(snapshot, now)
    } else {
        Vec::new()
    };
    let areas = if layers.get(Layer::Areas) {
        area_features(snapshot, state, &summaries)
    } else {
        Vec::new()
    };

    let selected_area = state
        .selected_area_id
        .as_deref()
        .and_then(|id| summaries.iter().find(|s| s.id == id))
        .cloned();

    MapView {
        scenario: state.scenario,
        background_mode: state.background_mode,
        noise_time: state.noise_time,
        areas,
        facilities,
        tickets,
        building_ages: if layers.get(Layer::BuildingAges) {
            snapshot.building_ages.clone()
        } else {
            Vec::new()
        },
        noise_points: if layers.get(Layer::NoisePoints) {
            snapshot.noise_measurements.clone()
        } else {
            Vec::new()
        },
        nearby_issues: nearby_issues(snapshot, state, &summaries, now),
        facility_types: facility_types(snapshot, state),
        selected_area,
        summaries,
    }
}

fn facility_markers(
    snapshot: &DashboardSnapshot,
    state: &MapState,
    now: DateTime<Utc>,
) -> Vec<FacilityMarker> {
    snapshot
        .facilities
        .iter()
        .filter(|f| state.shows_type(&f.facility_type))
        .filter_map(|f| {
            let coords = f.coords?;
            let status =
                derive_facility_status(f, related_ticket(&f.id, &snapshot.tickets), now);
            state.status_filter.allows(status).then(|| FacilityMarker {
                id: f.id.clone(),
                name: f.name.clone(),
                facility_type: f.facility_type.clone(),
                type_label: f.type_label.clone(),
                type_emoji: f.type_emoji.clone(),
                type_icon_name: f.type_icon_name.clone(),
                coords,
                status,
            })
        })
        .collect()
}

fn ticket_markers(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> Vec<TicketMarker> {
    snapshot
        .tickets
        .iter()
        .filter_map(|t| {
            let coords = t.coords.or_else(|| {
                t.facility_id
                    .as_deref()
                    .and_then(|id| snapshot.facility(id))
                    .and_then(|f| f.coords)
            })?;
            Some(TicketMarker {
                id: t.id.clone(),
                ticket_type: t.ticket_type.clone(),
                facility_id: t.facility_id.clone(),
                coords,
                status: derive_ticket_status(t.status, t.sla_due_at, now),
                severity: t.severity,
            })
        })
        .collect()
}

fn area_features(
    snapshot: &DashboardSnapshot,
    state: &MapState,
    summaries: &[AreaSummary],
) -> Vec<AreaFeature> {
    let index = AreaIndex::build(&snapshot.areas);
    let building_ages = building_age_by_area(&index, &snapshot.building_ages);
    let noise = noise_by_area(&index, &snapshot.noise_measurements);
    let safety = safety_score_by_area(&snapshot.areas, &snapshot.facilities);

    snapshot
        .areas
        .iter()
        .filter_map(|area| {
            let geometry = area.geometry.clone()?;
            let risk_score = summaries
                .iter()
                .find(|s| s.id == area.id)
                .map_or(0, |s| s.risk_score);
            let building_age = building_ages.get(&area.id).copied();
            let safety_score = safety.get(&area.id).copied();
            let noise = noise.get(&area.id).map(|n| match state.noise_time {
                NoiseTime::Morning => n.morning,
                NoiseTime::Afternoon => n.afternoon,
                NoiseTime::Night => n.night,
            });
            let background_value = match state.background_mode {
                BackgroundMode::Risk => Some(f64::from(risk_score)),
                BackgroundMode::GenderRatio => area.gender_ratio,
                BackgroundMode::AvgAge => area.weighted_avg_age,
                BackgroundMode::BuildingAge => building_age,
                BackgroundMode::Safety => safety_score,
                BackgroundMode::Noise => noise,
            };

            Some(AreaFeature {
                id: area.id.clone(),
                name: area.name.clone(),
                county: area.county.clone(),
                geometry,
                risk_score,
                gender_ratio: area.gender_ratio,
                avg_age: area.weighted_avg_age,
                building_age,
                safety_score,
                noise,
                background_value,
                filled: state.layers.get(Layer::Heatmap),
                selected: state.selected_area_id.as_deref() == Some(area.id.as_str()),
            })
        })
        .collect()
}

/// Open tickets of the selected area (or the first area), first few only.
fn nearby_issues(
    snapshot: &DashboardSnapshot,
    state: &MapState,
    summaries: &[AreaSummary],
    now: DateTime<Utc>,
) -> Vec<NearbyIssue> {
    let Some(area) = state
        .selected_area_id
        .as_deref()
        .and_then(|id| summaries.iter().find(|s| s.id == id))
        .or_else(|| summaries.first())
    else {
        return Vec::new();
    };

    let index = AreaIndex::build(&snapshot.areas);
    tickets_in_area(&index, &area.id, &snapshot.tickets, &snapshot.facilities)
        .into_iter()
        .filter(|t| is_active(t))
        .take(NEARBY_ISSUE_LIMIT)
        .map(|t| NearbyIssue {
            id: t.id.clone(),
            label: t
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| t.ticket_type.clone()),
            area_name: area.name.clone(),
            status: derive_ticket_status(t.status, t.sla_due_at, now),
        })
        .collect()
}

/// Facility type filter options: stored type metadata when there is any,
/// otherwise the distinct types of the loaded facilities.
#[must_use]
pub fn facility_types(snapshot: &DashboardSnapshot, state: &MapState) -> Vec<FacilityTypeOption> {
    let active = |t: &str| state.facility_type_filter.iter().any(|f| f == t);

    if !snapshot.facility_types.is_empty() {
        return snapshot
            .facility_types
            .iter()
            .map(|m| FacilityTypeOption {
                facility_type: m.facility_type.clone(),
                label: m.label.clone(),
                emoji: m.emoji.clone(),
                icon_name: m.icon_name.clone(),
                active: active(&m.facility_type),
            })
            .collect();
    }

    let mut options: Vec<FacilityTypeOption> = Vec::new();
    for f in &snapshot.facilities {
        if options.iter().any(|o| o.facility_type == f.facility_type) {
            continue;
        }
        options.push(FacilityTypeOption {
            facility_type: f.facility_type.clone(),
            label: f.type_label.clone().unwrap_or_else(|| f.facility_type.clone()),
            emoji: f.type_emoji.clone(),
            icon_name: f.type_icon_name.clone(),
            active: active(&f.facility_type),
        });
    }
    options
}

/// Progress of a ticket timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepState {
    Done,
    InProgress,
    Pending,
}

impl StepState {
    /// State of a ticket event by its type.
    #[must_use]
    pub fn of_event(event_type: &str) -> Self {
        match event_type {
            "completed" => Self::Done,
            "work_started" => Self::InProgress,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub event_type: String,
    pub at: DateTime<Utc>,
    pub state: StepState,
}

/// Detail panel of one facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityCard {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub type_label: String,
    pub type_emoji: Option<String>,
    pub coords: Option<LngLat>,
    pub status: FacilityStatus,
    pub grade: HealthGrade,
    pub last_inspection: Option<DateTime<Utc>>,
    pub incidents_past_year: u32,
    pub pending_issues: Option<String>,
    pub ticket_id: Option<String>,
    pub ticket_status: Option<TicketStatusCompact>,
    pub sla_due_at: Option<DateTime<Utc>>,
    pub timeline: Vec<TimelineStep>,
}

/// Builds the card of a loaded facility.
#[must_use]
pub fn facility_card(
    snapshot: &DashboardSnapshot,
    facility_id: &str,
    now: DateTime<Utc>,
) -> Option<FacilityCard> {
    let facility = snapshot.facility(facility_id)?;
    let ticket = related_ticket(&facility.id, &snapshot.tickets);

    let timeline = ticket
        .map(|t| {
            snapshot
                .ticket_events
                .iter()
                .filter(|e| e.ticket_id == t.id)
                .map(|e| TimelineStep {
                    event_type: e.event_type.clone(),
                    at: e.created_at,
                    state: StepState::of_event(&e.event_type),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(FacilityCard {
        id: facility.id.clone(),
        name: facility.name.clone(),
        facility_type: facility.facility_type.clone(),
        type_label: facility
            .type_label
            .clone()
            .unwrap_or_else(|| facility.facility_type.clone()),
        type_emoji: facility.type_emoji.clone(),
        coords: facility.coords,
        status: derive_facility_status(facility, ticket, now),
        grade: facility.grade.unwrap_or_default(),
        last_inspection: facility.last_inspection,
        incidents_past_year: facility.incidents_past_year.unwrap_or(0),
        pending_issues: facility.latest_inspection_notes.clone(),
        ticket_id: ticket.map(|t| t.id.clone()),
        ticket_status: ticket.map(|t| derive_ticket_status(t.status, t.sla_due_at, now)),
        sla_due_at: ticket.and_then(|t| t.sla_due_at),
        timeline,
    })
}

/// The per-area dashboard page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDashboard {
    pub id: String,
    pub name: String,
    pub county: String,
    pub stats: AreaStats,
    /// Score derived from the loaded facilities and tickets.
    pub risk_score: u32,
    /// Latest stored score, or the derived score when none is stored.
    pub current_risk: f64,
    pub grade_distribution: Vec<GradeCount>,
    pub ticket_types: Vec<TicketTypeCount>,
    pub risk_trend: Vec<TrendPoint>,
}

/// Builds the dashboard of a loaded area.
#[must_use]
pub fn area_dashboard(
    snapshot: &DashboardSnapshot,
    area_id: &str,
    now: DateTime<Utc>,
) -> Option<AreaDashboard> {
    let area = snapshot.area(area_id)?;
    let index = AreaIndex::build(&snapshot.areas);

    let facilities = facilities_in_area(&index, area_id, &snapshot.facilities);
    let tickets = tickets_in_area(&index, area_id, &snapshot.tickets, &snapshot.facilities);
    let risk_score = summarize_areas(
        &snapshot.areas,
        &snapshot.facilities,
        &snapshot.tickets,
        now,
    )
    .into_iter()
    .find(|s| s.id == area_id)
    .map_or(0, |s| s.risk_score);

    Some(AreaDashboard {
        id: area.id.clone(),
        name: area.name.clone(),
        county: area.county.clone(),
        stats: area_stats(&facilities, &tickets, now),
        risk_score,
        current_risk: area.risk_score.unwrap_or_else(|| f64::from(risk_score)),
        grade_distribution: grade_distribution(&facilities),
        ticket_types: ticket_type_counts(&tickets, now),
        risk_trend: risk_trend(&snapshot.area_risk_snapshots, area_id, risk_score, now),
    })
}

/// The missions wall.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionBoard {
    pub missions: Vec<Mission>,
    pub upcoming: Vec<UpcomingInspection>,
}

/// The admin page: every loaded ticket and the inspections due soonest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBoard {
    pub tickets: Vec<TicketRow>,
    pub upcoming: Vec<UpcomingInspection>,
}

#[must_use]
pub fn admin_board(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> AdminBoard {
    let mut upcoming = upcoming_inspections(&snapshot.facilities, &snapshot.areas, now);
    upcoming.truncate(ADMIN_INSPECTION_LIMIT);

    AdminBoard {
        tickets: ticket_rows(&snapshot.tickets, now),
        upcoming,
    }
}

/// Area options matching a search term. A blank term lists every option.
#[must_use]
pub fn area_search(snapshot: &DashboardSnapshot, term: &str) -> Vec<AreaOption> {
    search_areas(&snapshot.area_options, term)
        .into_iter()
        .cloned()
        .collect()
}
