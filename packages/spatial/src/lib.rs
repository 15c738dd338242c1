#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-in-polygon tests and an area spatial index.
//!
//! Facilities, tickets, building-age points and noise stations often carry
//! no explicit area reference. They are attributed to areas by testing
//! their coordinates against the area boundaries with a ray-casting parity
//! test. [`AreaIndex`] puts the area envelopes in an R-tree so each lookup
//! only ray-casts the handful of areas whose bounding box contains the
//! point.

pub mod containment;
pub mod parse;

pub use containment::{bbox_center, contains};
pub use parse::{geometry_from_geojson, point_from_geojson};

use civic_map_domain_models::{Area, AreaGeometry, LngLat};
use rstar::{AABB, RTree, RTreeObject};

/// An area boundary stored in the R-tree with its metadata.
struct AreaEntry {
    area_id: String,
    /// Position of the area in the input; lower wins on overlaps.
    order: usize,
    envelope: AABB<[f64; 2]>,
    center: LngLat,
    geometry: AreaGeometry,
}

impl RTreeObject for AreaEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over area boundaries.
///
/// Areas without geometry are skipped. When areas overlap, the one that
/// came first in the input wins, which matches a linear scan over the
/// area list.
pub struct AreaIndex {
    tree: RTree<AreaEntry>,
}

impl AreaIndex {
    /// Builds the index from a list of areas.
    #[must_use]
    pub fn build<'a, I>(areas: I) -> Self
    where
        I: IntoIterator<Item = &'a Area>,
    {
        let entries: Vec<AreaEntry> = areas
            .into_iter()
            .enumerate()
            .filter_map(|(order, area)| {
                let geometry = area.geometry.clone()?;
                let (lng, lat) = bbox_center(&geometry);
                Some(AreaEntry {
                    area_id: area.id.clone(),
                    order,
                    envelope: compute_envelope(&geometry),
                    center: LngLat::new(lng, lat),
                    geometry,
                })
            })
            .collect();

        log::debug!("Built area index with {} boundaries", entries.len());

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no area has a boundary.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Looks up the area containing a point.
    #[must_use]
    pub fn lookup(&self, point: LngLat) -> Option<&str> {
        let query_env = AABB::from_point([point.lng, point.lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| contains(&entry.geometry, point))
            .min_by_key(|entry| entry.order)
            .map(|entry| entry.area_id.as_str())
    }

    /// Every area containing a point, in insertion order.
    #[must_use]
    pub fn lookup_all(&self, point: LngLat) -> Vec<&str> {
        let query_env = AABB::from_point([point.lng, point.lat]);

        let mut hits: Vec<&AreaEntry> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| contains(&entry.geometry, point))
            .collect();
        hits.sort_by_key(|entry| entry.order);
        hits.into_iter().map(|entry| entry.area_id.as_str()).collect()
    }

    /// Picks the area for a map center.
    ///
    /// Returns the containing area if there is one, otherwise the area
    /// whose bounding-box center is nearest to the point.
    #[must_use]
    pub fn pick_by_center(&self, point: LngLat) -> Option<&str> {
        if let Some(hit) = self.lookup(point) {
            return Some(hit);
        }

        self.tree
            .iter()
            .min_by(|a, b| {
                a.center
                    .distance_sq(point)
                    .total_cmp(&b.center.distance_sq(point))
                    .then(a.order.cmp(&b.order))
            })
            .map(|entry| entry.area_id.as_str())
    }
}

/// Compute the bounding box envelope for an [`AreaGeometry`].
fn compute_envelope(geometry: &AreaGeometry) -> AABB<[f64; 2]> {
    let mut positions = geometry.positions();
    let Some(first) = positions.next() else {
        return AABB::from_point([0.0, 0.0]);
    };

    let (mut min, mut max) = (*first, *first);
    for [x, y] in positions {
        min = [min[0].min(*x), min[1].min(*y)];
        max = [max[0].max(*x), max[1].max(*y)];
    }

    AABB::from_corners(min, max)
}
