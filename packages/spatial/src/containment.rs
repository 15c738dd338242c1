//! Ray-casting containment test.
//!
//! Only the outer ring of each polygon is considered; holes are ignored.
//! Rings are not validated, so open or self-intersecting rings give
//! deterministic but meaningless answers.

use civic_map_domain_models::{AreaGeometry, LngLat, Position};

/// Returns whether `point` lies inside `geometry`.
///
/// A multipolygon contains the point if any constituent polygon does.
#[must_use]
pub fn contains(geometry: &AreaGeometry, point: LngLat) -> bool {
    geometry
        .outer_rings()
        .any(|ring| ring_contains(ring, point))
}

/// Even-odd ray casting over a single ring.
fn ring_contains(ring: &[Position], point: LngLat) -> bool {
    let LngLat { lng, lat } = point;
    let mut inside = false;

    let Some(mut prev) = ring.last() else {
        return false;
    };

    for current in ring {
        let [xi, yi] = *current;
        let [xj, yj] = *prev;
        if (yi > lat) != (yj > lat) && lng < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        prev = current;
    }

    inside
}

/// Center of the bounding box of every vertex in the geometry.
///
/// Returns `(0.0, 0.0)` for a geometry without vertices.
#[must_use]
pub fn bbox_center(geometry: &AreaGeometry) -> (f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for [x, y] in geometry.positions() {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }

    if min_x.is_infinite() {
        return (0.0, 0.0);
    }

    (f64::midpoint(min_x, max_x), f64::midpoint(min_y, max_y))
}

#[cfg(test)]
mod tests {
    use geo::Centroid as _;

    use super::*;

    fn triangle() -> AreaGeometry {
        AreaGeometry::Polygon(vec![vec![[0.0, 0.0], [4.0, 0.0], [0.0, 3.0], [0.0, 0.0]]])
    }

    fn to_geo(geometry: &AreaGeometry) -> geo::MultiPolygon<f64> {
        let polygons = geometry
            .outer_rings()
            .map(|ring| {
                let coords: Vec<geo::Coord<f64>> =
                    ring.iter().map(|[x, y]| geo::coord! { x: *x, y: *y }).collect();
                geo::Polygon::new(geo::LineString::new(coords), Vec::new())
            })
            .collect();
        geo::MultiPolygon(polygons)
    }

    #[test]
    fn centroid_is_inside() {
        let geometry = triangle();
        let centroid = to_geo(&geometry).centroid().unwrap();
        assert!(contains(&geometry, LngLat::new(centroid.x(), centroid.y())));
    }

    #[test]
    fn point_outside_bounding_box_is_outside() {
        assert!(!contains(&triangle(), LngLat::new(100.0, -100.0)));
        assert!(!contains(&triangle(), LngLat::new(3.0, 2.9)));
    }

    #[test]
    fn open_ring_still_closes_implicitly() {
        let open = AreaGeometry::Polygon(vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]]);
        assert!(contains(&open, LngLat::new(1.0, 1.0)));
    }

    #[test]
    fn holes_are_ignored() {
        let with_hole = AreaGeometry::Polygon(vec![
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
            vec![[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]],
        ]);
        assert!(contains(&with_hole, LngLat::new(5.0, 5.0)));
    }

    #[test]
    fn multipolygon_matches_any_member() {
        let geometry = AreaGeometry::MultiPolygon(vec![
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
            vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0]]],
        ]);
        assert!(contains(&geometry, LngLat::new(5.5, 5.5)));
        assert!(contains(&geometry, LngLat::new(0.5, 0.5)));
        assert!(!contains(&geometry, LngLat::new(3.0, 3.0)));
    }

    #[test]
    fn empty_geometry_contains_nothing() {
        let empty = AreaGeometry::MultiPolygon(Vec::new());
        assert!(!contains(&empty, LngLat::new(0.0, 0.0)));
        assert_eq!(bbox_center(&empty), (0.0, 0.0));
    }

    #[test]
    fn bbox_center_spans_all_vertices() {
        assert_eq!(bbox_center(&triangle()), (2.0, 1.5));
    }
}
