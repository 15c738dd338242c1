//! Village boundary file parsing.
//!
//! The input is the national village boundary `GeoJSON` with `COUNTY`,
//! `TOWN`, `VILLAGE`, and `VILLCODE` properties on every feature.

use std::collections::BTreeMap;

use civic_map_database::villages::VillageRecord;
use geojson::{Feature, GeoJson};

use crate::SeedError;

fn property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a village boundary `FeatureCollection`.
///
/// Features are deduplicated by `VILLCODE`: the last feature with a code
/// wins, at the position where that code first appeared. Features without
/// a code or without geometry are dropped.
///
/// # Errors
///
/// Returns [`SeedError::GeoJson`] if the text is not `GeoJSON` and
/// [`SeedError::Invalid`] if it is not a `FeatureCollection`.
pub fn parse_villages(text: &str) -> Result<Vec<VillageRecord>, SeedError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(SeedError::Invalid {
            message: "expected a GeoJSON FeatureCollection".to_string(),
        });
    };
    log::info!("Loaded {} village features", collection.features.len());

    let mut order: Vec<String> = Vec::new();
    let mut by_code: BTreeMap<String, Feature> = BTreeMap::new();
    for feature in collection.features {
        let Some(code) = property(&feature, "VILLCODE").filter(|c| !c.is_empty()) else {
            continue;
        };
        if by_code.insert(code.clone(), feature).is_none() {
            order.push(code);
        }
    }
    log::info!("{} unique villages after deduplication", order.len());

    let mut villages = Vec::with_capacity(order.len());
    for code in order {
        let Some(feature) = by_code.remove(&code) else {
            continue;
        };
        let Some(geometry) = feature.geometry.as_ref() else {
            log::debug!("Village {code} has no geometry, skipping");
            continue;
        };

        let county = property(&feature, "COUNTY").unwrap_or_default();
        let town = property(&feature, "TOWN").unwrap_or_default();
        let village = property(&feature, "VILLAGE").unwrap_or_default();

        villages.push(VillageRecord {
            name: format!("{county}{town}{village}"),
            geometry: serde_json::to_value(geometry).map_err(|e| SeedError::Invalid {
                message: format!("village {code} geometry: {e}"),
            })?,
            code,
            county,
            village,
        });
    }

    Ok(villages)
}
