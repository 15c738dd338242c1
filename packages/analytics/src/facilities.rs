//! Facility maintenance status derivation.

use chrono::{DateTime, TimeDelta, Utc};
use civic_map_domain_models::{Facility, FacilityStatus, Ticket, TicketStatusCompact};

use crate::derive_ticket_status;

/// Inspections older than this many days are considered stale.
pub const INSPECTION_STALE_AFTER_DAYS: u32 = 365;

/// Whether an inspection is missing or older than `stale_after_days`.
#[must_use]
pub fn is_stale_inspection(
    last_inspection: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stale_after_days: u32,
) -> bool {
    last_inspection.is_none_or(|at| now - at > TimeDelta::days(i64::from(stale_after_days)))
}

/// Derives a facility's maintenance status from its related ticket (at
/// most one is considered) and its inspection history.
///
/// A related ticket decides the status on its own: overdue stays overdue,
/// anything else is in progress. Without one, a missing or stale inspection
/// is overdue.
#[must_use]
pub fn derive_facility_status(
    facility: &Facility,
    related_ticket: Option<&Ticket>,
    now: DateTime<Utc>,
) -> FacilityStatus {
    if let Some(ticket) = related_ticket {
        return match derive_ticket_status(ticket.status, ticket.sla_due_at, now) {
            TicketStatusCompact::Overdue => FacilityStatus::Overdue,
            TicketStatusCompact::Open | TicketStatusCompact::WithinSla => {
                FacilityStatus::InProgress
            }
        };
    }

    if is_stale_inspection(facility.last_inspection, now, INSPECTION_STALE_AFTER_DAYS) {
        FacilityStatus::Overdue
    } else {
        FacilityStatus::Safe
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};
    use civic_map_domain_models::{Facility, LngLat};

    pub fn facility(id: &str, last_inspection: Option<DateTime<Utc>>) -> Facility {
        Facility {
            id: id.to_string(),
            area_id: None,
            facility_type: "park".to_string(),
            type_label: None,
            type_emoji: None,
            type_icon_name: None,
            name: id.to_string(),
            coords: None,
            grade: None,
            last_inspection,
            incidents_past_year: None,
            latest_inspection_notes: None,
        }
    }

    pub fn facility_at(id: &str, last_inspection: Option<DateTime<Utc>>, x: f64, y: f64) -> Facility {
        Facility {
            coords: Some(LngLat::new(x, y)),
            ..facility(id, last_inspection)
        }
    }
}

#[cfg(test)]
mod tests {
    use civic_map_domain_models::TicketStatus;

    use super::fixtures::facility;
    use super::*;
    use crate::tickets::fixtures::{at, ticket};

    #[test]
    fn never_inspected_is_overdue() {
        let now = at(2024, 6, 1);
        assert_eq!(
            derive_facility_status(&facility("f", None), None, now),
            FacilityStatus::Overdue
        );
    }

    #[test]
    fn never_inspected_with_healthy_ticket_follows_ticket() {
        let now = at(2024, 6, 1);
        let t = ticket("t", TicketStatus::Open, Some(at(2024, 12, 1)));
        assert_eq!(
            derive_facility_status(&facility("f", None), Some(&t), now),
            FacilityStatus::InProgress
        );
    }

    #[test]
    fn recent_inspection_is_safe() {
        let now = at(2024, 6, 1);
        assert_eq!(
            derive_facility_status(&facility("f", Some(at(2024, 1, 1))), None, now),
            FacilityStatus::Safe
        );
    }

    #[test]
    fn stale_inspection_is_overdue() {
        let now = at(2024, 6, 1);
        assert_eq!(
            derive_facility_status(&facility("f", Some(at(2023, 5, 1))), None, now),
            FacilityStatus::Overdue
        );
    }

    #[test]
    fn exactly_threshold_old_is_not_stale() {
        let now = at(2024, 6, 1);
        let last = now - TimeDelta::days(365);
        assert!(!is_stale_inspection(Some(last), now, INSPECTION_STALE_AFTER_DAYS));
        assert!(is_stale_inspection(
            Some(last - TimeDelta::seconds(1)),
            now,
            INSPECTION_STALE_AFTER_DAYS
        ));
    }

    #[test]
    fn overdue_ticket_makes_facility_overdue() {
        let now = at(2024, 6, 1);
        let t = ticket("t", TicketStatus::InProgress, Some(at(2024, 2, 1)));
        assert_eq!(
            derive_facility_status(&facility("f", Some(at(2024, 5, 1))), Some(&t), now),
            FacilityStatus::Overdue
        );
    }

    #[test]
    fn closed_ticket_still_counts_as_in_progress() {
        let now = at(2024, 6, 1);
        let t = ticket("t", TicketStatus::Completed, Some(at(2024, 2, 1)));
        assert_eq!(
            derive_facility_status(&facility("f", Some(at(2024, 5, 1))), Some(&t), now),
            FacilityStatus::InProgress
        );
    }
}
