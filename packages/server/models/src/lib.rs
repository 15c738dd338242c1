#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the civic map server.
//!
//! Dashboard snapshots and view projections are serialized as-is; the
//! types here cover query parameters and the small envelopes around them.

use civic_map_analytics_models::InspectionFilter;
use civic_map_dashboard::LoadRequest;
use civic_map_domain_models::LngLat;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Whether the remote store credentials are set.
    pub store_configured: bool,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// User-displayable message.
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Query parameters for `GET /api/dashboard`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQueryParams {
    /// Area to load.
    pub area_id: Option<String>,
    /// Map center longitude.
    pub lng: Option<f64>,
    /// Map center latitude.
    pub lat: Option<f64>,
    /// Skip area geometry.
    #[serde(default)]
    pub light: bool,
    /// Only refresh the area list.
    #[serde(default)]
    pub names_only: bool,
}

impl DashboardQueryParams {
    /// Converts the parameters into a load request. A center is only used
    /// when both coordinates are present.
    #[must_use]
    pub fn into_request(self) -> LoadRequest {
        LoadRequest {
            area_id: self.area_id.filter(|id| !id.trim().is_empty()),
            center: self.lng.zip(self.lat).map(|(lng, lat)| LngLat::new(lng, lat)),
            light_areas: self.light,
            names_only: self.names_only,
        }
    }
}

/// Query parameters for `GET /api/missions`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionsQueryParams {
    /// Area id, or `all`.
    pub area_id: Option<String>,
    /// Facility type key, or `all`.
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
    /// Keyword matched against facility and area names.
    pub q: Option<String>,
}

impl MissionsQueryParams {
    /// Converts the parameters into an inspection filter. Blank values and
    /// `all` match everything.
    #[must_use]
    pub fn into_filter(self) -> InspectionFilter {
        let selected = |value: Option<String>| {
            value.filter(|v| {
                let v = v.trim();
                !v.is_empty() && !v.eq_ignore_ascii_case("all")
            })
        };
        InspectionFilter {
            area_id: selected(self.area_id),
            facility_type: selected(self.facility_type),
            keyword: self.q.filter(|q| !q.trim().is_empty()),
        }
    }
}

/// Query parameters for `GET /api/areas`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaSearchParams {
    /// Search term matched against area names and codes.
    #[serde(default)]
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_needs_both_coordinates() {
        let params = DashboardQueryParams {
            lng: Some(120.6),
            ..DashboardQueryParams::default()
        };
        assert_eq!(params.into_request().center, None);

        let params = DashboardQueryParams {
            area_id: Some(" ".to_string()),
            lng: Some(120.6),
            lat: Some(24.1),
            light: true,
            names_only: false,
        };
        let request = params.into_request();
        assert_eq!(request.area_id, None);
        assert_eq!(request.center, Some(LngLat::new(120.6, 24.1)));
        assert!(request.light_areas);
    }

    #[test]
    fn all_selects_every_mission() {
        let params = MissionsQueryParams {
            area_id: Some("all".to_string()),
            facility_type: Some("street_light".to_string()),
            q: Some("  ".to_string()),
        };
        let filter = params.into_filter();
        assert_eq!(filter.area_id, None);
        assert_eq!(filter.facility_type.as_deref(), Some("street_light"));
        assert_eq!(filter.keyword, None);
    }
}
