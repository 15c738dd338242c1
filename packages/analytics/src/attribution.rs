//! Attribution of loose points to areas.
//!
//! Points are attributed by containment first, and a point inside
//! overlapping areas belongs to each of them. A ticket without coordinates
//! borrows the coordinates of its facility, and a record with no usable
//! coordinates at all falls back to its explicit area reference.

use civic_map_domain_models::{Facility, Ticket};
use civic_map_spatial::AreaIndex;

/// The areas a facility belongs to.
#[must_use]
pub fn facility_areas<'a>(index: &'a AreaIndex, facility: &'a Facility) -> Vec<&'a str> {
    match facility.coords {
        Some(coords) => index.lookup_all(coords),
        None => facility.area_id.as_deref().into_iter().collect(),
    }
}

/// The areas a ticket belongs to.
#[must_use]
pub fn ticket_areas<'a>(
    index: &'a AreaIndex,
    ticket: &'a Ticket,
    facilities: &'a [Facility],
) -> Vec<&'a str> {
    if let Some(coords) = ticket.coords {
        return index.lookup_all(coords);
    }

    let facility_coords = ticket
        .facility_id
        .as_deref()
        .and_then(|id| facilities.iter().find(|f| f.id == id))
        .and_then(|f| f.coords);

    match facility_coords {
        Some(coords) => index.lookup_all(coords),
        None => ticket.area_id.as_deref().into_iter().collect(),
    }
}

/// Facilities attributed to `area_id`.
#[must_use]
pub fn facilities_in_area<'a>(
    index: &AreaIndex,
    area_id: &str,
    facilities: &'a [Facility],
) -> Vec<&'a Facility> {
    facilities
        .iter()
        .filter(|f| facility_areas(index, f).contains(&area_id))
        .collect()
}

/// Tickets attributed to `area_id`.
#[must_use]
pub fn tickets_in_area<'a>(
    index: &AreaIndex,
    area_id: &str,
    tickets: &'a [Ticket],
    facilities: &[Facility],
) -> Vec<&'a Ticket> {
    tickets
        .iter()
        .filter(|t| ticket_areas(index, t, facilities).contains(&area_id))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use civic_map_domain_models::{Area, AreaGeometry};

    pub fn square(id: &str, x0: f64, y0: f64, size: f64) -> Area {
        Area {
            id: id.to_string(),
            name: id.to_uppercase(),
            code: None,
            county: "Taichung".to_string(),
            geometry: Some(AreaGeometry::Polygon(vec![vec![
                [x0, y0],
                [x0 + size, y0],
                [x0 + size, y0 + size],
                [x0, y0 + size],
                [x0, y0],
            ]])),
            population_total: None,
            gender_ratio: None,
            weighted_avg_age: None,
            risk_score: None,
        }
    }
}
