//! Optional server-side features advertised by the store.
//!
//! The `store_capabilities` view lists one row per installed feature. When
//! the view itself is missing, the store is assumed to be a bare schema and
//! every capability is off, so callers fall back to client-side filtering.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::StoreError;
use crate::client::{PostgrestClient, Query};
use crate::rows::CapabilityRow;

/// View listing installed features.
pub const CAPABILITIES_VIEW: &str = "store_capabilities";

/// A feature the store may or may not provide.
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
pub enum Capability {
    /// `find_area_by_point(lng, lat)` procedure.
    FindAreaByPoint,
    /// `facilities_in_area(target_area_id)` procedure.
    FacilitiesInArea,
    /// `tickets_in_area(target_area_id)` procedure.
    TicketsInArea,
    /// `building_ages` table.
    BuildingAges,
    /// `noise_measurements` table.
    NoiseMeasurements,
}

/// The set of enabled capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// No capabilities.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether `capability` is enabled.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Iterates over enabled capabilities.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Builds the set from `store_capabilities` rows. Unknown features and
    /// disabled rows are ignored.
    #[must_use]
    pub fn from_rows(rows: &[CapabilityRow]) -> Self {
        rows.iter()
            .filter(|row| row.enabled)
            .filter_map(|row| match row.feature.trim().parse::<Capability>() {
                Ok(capability) => Some(capability),
                Err(_) => {
                    log::debug!("ignoring unknown store capability {:?}", row.feature);
                    None
                }
            })
            .collect()
    }

    /// Reads the capability view.
    ///
    /// A missing view yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for any other failure.
    pub async fn negotiate(client: &PostgrestClient) -> Result<Self, StoreError> {
        match client
            .select::<CapabilityRow>(CAPABILITIES_VIEW, &Query::select("feature,enabled"))
            .await
        {
            Ok(rows) => Ok(Self::from_rows(&rows)),
            Err(e) if e.is_missing_schema() => {
                log::warn!("{CAPABILITIES_VIEW} is not installed, using client-side fallbacks: {e}");
                Ok(Self::none())
            }
            Err(e) => Err(e),
        }
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(feature: &str, enabled: bool) -> CapabilityRow {
        CapabilityRow {
            feature: feature.to_string(),
            enabled,
        }
    }

    #[test]
    fn reads_enabled_features() {
        let caps = Capabilities::from_rows(&[
            row("find_area_by_point", true),
            row("tickets_in_area", false),
            row("teleportation", true),
            row(" noise_measurements ", true),
        ]);
        assert!(caps.has(Capability::FindAreaByPoint));
        assert!(!caps.has(Capability::TicketsInArea));
        assert!(caps.has(Capability::NoiseMeasurements));
        assert_eq!(caps.iter().count(), 2);
    }

    #[test]
    fn empty_set_has_nothing() {
        assert!(!Capabilities::none().has(Capability::FacilitiesInArea));
    }
}
