//! The published dashboard state.

use civic_map_domain_models::{
    Area, AreaOption, AreaRiskSnapshot, BuildingAgePoint, Facility, FacilityTypeMeta, LngLat,
    Mission, NoiseMeasurement, Ticket, TicketEvent,
};
use civic_map_spatial::contains;
use serde::{Deserialize, Serialize};

/// Everything the pages render from, as of one committed load cycle.
///
/// Snapshots are never mutated once published; a new one replaces the old.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Areas of the current county.
    pub areas: Vec<Area>,
    /// Area list for search and selection.
    pub area_options: Vec<AreaOption>,
    /// Facilities of the current area, joined with inspections and type
    /// metadata.
    pub facilities: Vec<Facility>,
    /// Tickets of the current area.
    pub tickets: Vec<Ticket>,
    /// Events of the loaded tickets, oldest first.
    pub ticket_events: Vec<TicketEvent>,
    /// Stored risk snapshots of the loaded areas.
    pub area_risk_snapshots: Vec<AreaRiskSnapshot>,
    /// Facility type display metadata.
    pub facility_types: Vec<FacilityTypeMeta>,
    /// Surveyed building ages.
    pub building_ages: Vec<BuildingAgePoint>,
    /// Noise monitoring stations.
    pub noise_measurements: Vec<NoiseMeasurement>,
    /// Citizen missions, once fetched.
    pub missions: Vec<Mission>,
    /// Area the facilities and tickets belong to.
    pub current_area_id: Option<String>,
    /// County of the current area.
    pub current_county: Option<String>,
    /// Whether a load cycle is running.
    pub loading: bool,
    /// Message of the last failed load cycle.
    pub error: Option<String>,
}

impl DashboardSnapshot {
    /// Whether `point` falls inside an area of the current county that is
    /// already loaded.
    #[must_use]
    pub fn covers(&self, point: LngLat) -> bool {
        let Some(county) = self.current_county.as_deref() else {
            return false;
        };
        self.areas.iter().any(|a| {
            a.county == county && a.geometry.as_ref().is_some_and(|g| contains(g, point))
        })
    }

    /// Finds a loaded area.
    #[must_use]
    pub fn area(&self, id: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// Finds a loaded facility.
    #[must_use]
    pub fn facility(&self, id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }
}

/// Parameters of a load cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    /// Area to load explicitly.
    pub area_id: Option<String>,
    /// Map center; the area under it is loaded.
    pub center: Option<LngLat>,
    /// Skip geometry when only the area list is needed.
    pub light_areas: bool,
    /// Only refresh the area list, leaving the rest untouched.
    pub names_only: bool,
}
