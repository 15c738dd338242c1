//! Per-area values for background coloring.

use std::collections::BTreeMap;

use civic_map_analytics_models::NoiseAverages;
use civic_map_domain_models::{Area, BuildingAgePoint, Facility, NoiseMeasurement};
use civic_map_spatial::{AreaIndex, contains};

/// Facility types that count towards the safety score.
pub const SAFETY_FACILITY_TYPES: &[&str] = &["cctv", "police_station"];

/// Mean building age per area.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn building_age_by_area(index: &AreaIndex, points: &[BuildingAgePoint]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for point in points {
        if let Some(area_id) = index.lookup(point.coords) {
            let entry = sums.entry(area_id).or_default();
            entry.0 += point.age_years;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(id, (sum, n))| (id.to_string(), sum / n.max(1) as f64))
        .collect()
}

/// Mean noise readings per area.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn noise_by_area(index: &AreaIndex, measurements: &[NoiseMeasurement]) -> BTreeMap<String, NoiseAverages> {
    let mut sums: BTreeMap<&str, (NoiseAverages, usize)> = BTreeMap::new();
    for m in measurements {
        if let Some(area_id) = index.lookup(m.coords) {
            let (acc, n) = sums.entry(area_id).or_default();
            acc.morning += m.morning;
            acc.afternoon += m.afternoon;
            acc.night += m.night;
            *n += 1;
        }
    }
    sums.into_iter()
        .map(|(id, (acc, n))| {
            let denom = n.max(1) as f64;
            (
                id.to_string(),
                NoiseAverages {
                    morning: acc.morning / denom,
                    afternoon: acc.afternoon / denom,
                    night: acc.night / denom,
                },
            )
        })
        .collect()
}

/// Safety score per area, 0-100.
///
/// Counts surveillance and police facilities inside the area. With a known
/// population the count is scaled per capita (x 80 000); otherwise each
/// facility is worth 20 points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn safety_score_by_area(areas: &[Area], facilities: &[Facility]) -> BTreeMap<String, f64> {
    areas
        .iter()
        .map(|area| {
            let count = area.geometry.as_ref().map_or(0, |geometry| {
                facilities
                    .iter()
                    .filter(|f| SAFETY_FACILITY_TYPES.contains(&f.facility_type.as_str()))
                    .filter_map(|f| f.coords)
                    .filter(|coords| contains(geometry, *coords))
                    .count()
            }) as f64;

            let density = match area.population_total {
                Some(pop) if pop > 0 => count / pop as f64 * 80_000.0,
                _ => count * 20.0,
            };

            (area.id.clone(), density.min(100.0))
        })
        .collect()
}
