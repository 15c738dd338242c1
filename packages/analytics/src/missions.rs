//! Inspection feed for the citizen missions wall.

use chrono::{DateTime, TimeDelta, Utc};
use civic_map_analytics_models::{InspectionFilter, UpcomingInspection};
use civic_map_domain_models::{Area, Facility};
use civic_map_spatial::AreaIndex;

/// Days between citizen inspections of the same facility.
pub const INSPECTION_INTERVAL_DAYS: i64 = 30;

/// Facilities with an inspection history, soonest due first.
///
/// The next inspection is due [`INSPECTION_INTERVAL_DAYS`] after the last
/// one. Facilities that are already past due report zero days left.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn upcoming_inspections(
    facilities: &[Facility],
    areas: &[Area],
    now: DateTime<Utc>,
) -> Vec<UpcomingInspection> {
    let index = AreaIndex::build(areas);

    let mut items: Vec<UpcomingInspection> = facilities
        .iter()
        .filter_map(|f| {
            let last = f.last_inspection?;
            let next_due = last + TimeDelta::days(INSPECTION_INTERVAL_DAYS);
            let days_left = ((next_due - now).num_seconds() as f64 / 86_400.0).round() as i64;

            let area = f
                .coords
                .and_then(|c| index.lookup(c))
                .and_then(|id| areas.iter().find(|a| a.id == id));

            Some(UpcomingInspection {
                id: f.id.clone(),
                name: f.name.clone(),
                facility_type: f.facility_type.clone(),
                type_label: f.type_label.clone().unwrap_or_else(|| f.facility_type.clone()),
                type_emoji: f.type_emoji.clone(),
                area_id: area.map(|a| a.id.clone()),
                area_name: area.map(|a| a.name.clone()),
                due_in_days: days_left.max(0),
                last_inspection: last.date_naive(),
            })
        })
        .collect();

    items.sort_by_key(|item| item.due_in_days);
    items
}

/// Applies the missions wall filters to an inspection feed, keeping its
/// order. Blank filter values match everything.
#[must_use]
pub fn filter_inspections(
    items: Vec<UpcomingInspection>,
    filter: &InspectionFilter,
) -> Vec<UpcomingInspection> {
    let wanted = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let area_id = wanted(filter.area_id.as_deref());
    let facility_type = wanted(filter.facility_type.as_deref());
    let keyword = wanted(filter.keyword.as_deref()).map(|k| k.to_lowercase());

    items
        .into_iter()
        .filter(|item| {
            area_id
                .as_deref()
                .is_none_or(|id| item.area_id.as_deref() == Some(id))
        })
        .filter(|item| {
            facility_type
                .as_deref()
                .is_none_or(|t| item.facility_type == t)
        })
        .filter(|item| {
            keyword.as_deref().is_none_or(|k| {
                item.name.to_lowercase().contains(k)
                    || item
                        .area_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(k))
            })
        })
        .collect()
}
