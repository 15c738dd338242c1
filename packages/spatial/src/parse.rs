//! Conversion from store `GeoJSON` into domain geometry.

use civic_map_domain_models::{AreaGeometry, LngLat, Ring};

/// Parses a `GeoJSON` geometry object into an [`AreaGeometry`].
///
/// Handles both `Polygon` and `MultiPolygon`; anything else (points,
/// lines, malformed input) yields `None`.
#[must_use]
pub fn geometry_from_geojson(value: &serde_json::Value) -> Option<AreaGeometry> {
    match to_geo(value)? {
        geo::Geometry::Polygon(p) => Some(AreaGeometry::Polygon(polygon_rings(&p))),
        geo::Geometry::MultiPolygon(mp) => Some(AreaGeometry::MultiPolygon(
            mp.0.iter().map(polygon_rings).collect(),
        )),
        _ => None,
    }
}

/// Parses a `GeoJSON` `Point` into a [`LngLat`].
#[must_use]
pub fn point_from_geojson(value: &serde_json::Value) -> Option<LngLat> {
    match to_geo(value)? {
        geo::Geometry::Point(p) => Some(LngLat::new(p.x(), p.y())),
        _ => None,
    }
}

fn to_geo(value: &serde_json::Value) -> Option<geo::Geometry<f64>> {
    if value.is_null() {
        return None;
    }
    let geometry: geojson::Geometry = serde_json::from_value(value.clone()).ok()?;
    geometry.try_into().ok()
}

fn polygon_rings(polygon: &geo::Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|line| line.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}
