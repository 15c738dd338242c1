//! Scenario presets and the map display state.
//!
//! Selecting a named scenario applies a fixed bundle of layer visibility,
//! background mode, and facility-type filter. Any manual layer or filter
//! change moves the state to [`Scenario::Custom`], which applies nothing on
//! its own.

use civic_map_domain_models::FacilityStatus;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Named display presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scenario {
    /// Facility maintenance against area risk.
    #[default]
    AgingInfra,
    /// Areas colored by gender ratio.
    GenderRatio,
    /// Areas colored by weighted average age.
    AvgAge,
    /// Building ages over areas colored by mean building age.
    BuildingAge,
    /// Surveillance and police coverage.
    Safety,
    /// Road noise stations.
    Noise,
    /// Manual layer and filter choices.
    Custom,
}

impl Scenario {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AgingInfra,
            Self::GenderRatio,
            Self::AvgAge,
            Self::BuildingAge,
            Self::Safety,
            Self::Noise,
            Self::Custom,
        ]
    }
}

/// What the area fill color encodes.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackgroundMode {
    /// Derived risk score.
    #[default]
    Risk,
    /// Gender ratio.
    GenderRatio,
    /// Weighted average age.
    AvgAge,
    /// Mean building age.
    BuildingAge,
    /// Safety facility density.
    Safety,
    /// Mean noise level at the selected time of day.
    Noise,
}

/// Time of day for noise readings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoiseTime {
    #[default]
    Morning,
    Afternoon,
    Night,
}

/// Toggleable map layers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layer {
    /// Area outlines.
    Areas,
    /// Facility markers.
    Facilities,
    /// Ticket markers.
    Tickets,
    /// Area fill coloring.
    Heatmap,
    /// Building age points.
    BuildingAges,
    /// Noise stations.
    NoisePoints,
}

/// Visibility of each layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct LayerToggles {
    pub areas: bool,
    pub facilities: bool,
    pub tickets: bool,
    pub heatmap: bool,
    pub building_ages: bool,
    pub noise_points: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            areas: true,
            facilities: true,
            tickets: true,
            heatmap: true,
            building_ages: false,
            noise_points: false,
        }
    }
}

impl LayerToggles {
    /// Whether `layer` is visible.
    #[must_use]
    pub const fn get(&self, layer: Layer) -> bool {
        match layer {
            Layer::Areas => self.areas,
            Layer::Facilities => self.facilities,
            Layer::Tickets => self.tickets,
            Layer::Heatmap => self.heatmap,
            Layer::BuildingAges => self.building_ages,
            Layer::NoisePoints => self.noise_points,
        }
    }

    /// Shows or hides `layer`.
    pub const fn set(&mut self, layer: Layer, visible: bool) {
        match layer {
            Layer::Areas => self.areas = visible,
            Layer::Facilities => self.facilities = visible,
            Layer::Tickets => self.tickets = visible,
            Layer::Heatmap => self.heatmap = visible,
            Layer::BuildingAges => self.building_ages = visible,
            Layer::NoisePoints => self.noise_points = visible,
        }
    }
}

/// Which facility maintenance statuses are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFilter {
    pub safe: bool,
    pub in_progress: bool,
    pub overdue: bool,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self {
            safe: true,
            in_progress: true,
            overdue: true,
        }
    }
}

impl StatusFilter {
    /// Whether facilities with `status` are shown.
    #[must_use]
    pub const fn allows(&self, status: FacilityStatus) -> bool {
        match status {
            FacilityStatus::Safe => self.safe,
            FacilityStatus::InProgress => self.in_progress,
            FacilityStatus::Overdue => self.overdue,
        }
    }

    const fn set(&mut self, status: FacilityStatus, shown: bool) {
        match status {
            FacilityStatus::Safe => self.safe = shown,
            FacilityStatus::InProgress => self.in_progress = shown,
            FacilityStatus::Overdue => self.overdue = shown,
        }
    }
}

/// A change to the map state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MapAction {
    /// Applies a preset.
    SetScenario { scenario: Scenario },
    /// Flips a layer, or sets it when `value` is given.
    ToggleLayer { layer: Layer, value: Option<bool> },
    /// Adds or removes a facility type from the filter.
    ToggleFacilityType { facility_type: String },
    /// Flips a status filter, or sets it when `value` is given.
    ToggleFacilityStatus {
        status: FacilityStatus,
        value: Option<bool>,
    },
    /// Clears the facility type filter.
    ResetFacilityTypeFilter,
    /// Changes the area fill encoding.
    SetBackgroundMode { mode: BackgroundMode },
    /// Changes the noise time of day.
    SetNoiseTime { time: NoiseTime },
    /// Selects an area, or clears the selection.
    SelectArea { area_id: Option<String> },
    /// Selects a facility, or clears the selection.
    SelectFacility { facility_id: Option<String> },
}

/// Display state of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    pub scenario: Scenario,
    pub layers: LayerToggles,
    pub background_mode: BackgroundMode,
    pub noise_time: NoiseTime,
    /// Facility types to show. Empty shows every type.
    pub facility_type_filter: Vec<String>,
    pub status_filter: StatusFilter,
    pub selected_area_id: Option<String>,
    pub selected_facility_id: Option<String>,
}

impl Default for MapState {
    /// The [`Scenario::AgingInfra`] preset.
    fn default() -> Self {
        let mut state = Self {
            scenario: Scenario::Custom,
            layers: LayerToggles::default(),
            background_mode: BackgroundMode::default(),
            noise_time: NoiseTime::default(),
            facility_type_filter: Vec::new(),
            status_filter: StatusFilter::default(),
            selected_area_id: None,
            selected_facility_id: None,
        };
        state.set_scenario(Scenario::default());
        state
    }
}

impl MapState {
    /// Applies the bundle of `scenario`.
    pub fn set_scenario(&mut self, scenario: Scenario) {
        let mut layers = LayerToggles::default();
        let (background, filter): (Option<BackgroundMode>, Option<&[&str]>) = match scenario {
            Scenario::AgingInfra => {
                layers.tickets = false;
                (Some(BackgroundMode::Risk), Some(&[]))
            }
            Scenario::GenderRatio => {
                layers.facilities = false;
                layers.tickets = false;
                (Some(BackgroundMode::GenderRatio), Some(&[]))
            }
            Scenario::AvgAge => {
                layers.facilities = false;
                layers.tickets = false;
                (Some(BackgroundMode::AvgAge), Some(&[]))
            }
            Scenario::BuildingAge => {
                layers.tickets = false;
                layers.building_ages = true;
                (Some(BackgroundMode::BuildingAge), Some(&["building"]))
            }
            Scenario::Safety => {
                layers.tickets = false;
                (Some(BackgroundMode::Safety), Some(&["cctv", "police_station"]))
            }
            Scenario::Noise => {
                layers.facilities = false;
                layers.tickets = false;
                layers.noise_points = true;
                (Some(BackgroundMode::Noise), Some(&[]))
            }
            Scenario::Custom => (None, None),
        };

        self.scenario = scenario;
        self.layers = layers;
        if let Some(mode) = background {
            self.background_mode = mode;
        }
        if let Some(filter) = filter {
            self.facility_type_filter = filter.iter().map(|t| (*t).to_string()).collect();
        }
    }

    /// Whether facilities of `facility_type` pass the type filter.
    #[must_use]
    pub fn shows_type(&self, facility_type: &str) -> bool {
        self.facility_type_filter.is_empty()
            || self.facility_type_filter.iter().any(|t| t == facility_type)
    }

    /// Applies `action`.
    pub fn apply(&mut self, action: MapAction) {
        match action {
            MapAction::SetScenario { scenario } => self.set_scenario(scenario),
            MapAction::ToggleLayer { layer, value } => {
                let visible = value.unwrap_or(!self.layers.get(layer));
                self.layers.set(layer, visible);
                self.scenario = Scenario::Custom;
            }
            MapAction::ToggleFacilityType { facility_type } => {
                if let Some(pos) = self
                    .facility_type_filter
                    .iter()
                    .position(|t| *t == facility_type)
                {
                    self.facility_type_filter.remove(pos);
                } else {
                    self.facility_type_filter.push(facility_type);
                }
                self.scenario = Scenario::Custom;
            }
            MapAction::ToggleFacilityStatus { status, value } => {
                let shown = value.unwrap_or(!self.status_filter.allows(status));
                self.status_filter.set(status, shown);
                self.scenario = Scenario::Custom;
            }
            MapAction::ResetFacilityTypeFilter => {
                self.facility_type_filter.clear();
                self.scenario = Scenario::Custom;
            }
            MapAction::SetBackgroundMode { mode } => self.background_mode = mode,
            MapAction::SetNoiseTime { time } => self.noise_time = time,
            MapAction::SelectArea { area_id } => self.selected_area_id = area_id,
            MapAction::SelectFacility { facility_id } => {
                if facility_id.is_some() {
                    self.selected_area_id = None;
                }
                self.selected_facility_id = facility_id;
            }
        }
    }
}
