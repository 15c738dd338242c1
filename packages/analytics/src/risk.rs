//! Per-area risk scoring.
//!
//! The score is a weighted count of open work, with overdue items
//! weighted heaviest and the total capped at 100 for display scaling.
//! The weights are a heuristic that has not been fitted to outcome data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_map_analytics_models::{AreaStats, AreaSummary, RiskInputs, TrendPoint};
use civic_map_domain_models::{Area, AreaRiskSnapshot, Facility, FacilityStatus, Ticket};
use civic_map_spatial::AreaIndex;

use crate::attribution::{facility_areas, ticket_areas};
use crate::{derive_facility_status, is_active, is_overdue, related_ticket};

/// Weight of an overdue ticket.
pub const OVERDUE_TICKET_WEIGHT: u32 = 25;
/// Weight of an open ticket that is not overdue.
pub const OPEN_TICKET_WEIGHT: u32 = 10;
/// Weight of a facility with overdue maintenance.
pub const OVERDUE_FACILITY_WEIGHT: u32 = 15;
/// Weight of a facility with maintenance in progress.
pub const IN_PROGRESS_FACILITY_WEIGHT: u32 = 5;
/// Upper bound of the score.
pub const MAX_RISK_SCORE: u32 = 100;

/// Computes the risk score for one area.
#[must_use]
pub fn risk_score(inputs: &RiskInputs) -> u32 {
    let within_sla = inputs.open_tickets.saturating_sub(inputs.overdue_tickets);

    inputs
        .overdue_tickets
        .saturating_mul(OVERDUE_TICKET_WEIGHT)
        .saturating_add(within_sla.saturating_mul(OPEN_TICKET_WEIGHT))
        .saturating_add(inputs.overdue_facilities.saturating_mul(OVERDUE_FACILITY_WEIGHT))
        .saturating_add(
            inputs
                .in_progress_facilities
                .saturating_mul(IN_PROGRESS_FACILITY_WEIGHT),
        )
        .min(MAX_RISK_SCORE)
}

/// Counts the risk inputs and derived stats of every area.
///
/// Returns one summary per input area, in input order.
#[must_use]
pub fn summarize_areas(
    areas: &[Area],
    facilities: &[Facility],
    tickets: &[Ticket],
    now: DateTime<Utc>,
) -> Vec<AreaSummary> {
    let index = AreaIndex::build(areas);
    let mut inputs: BTreeMap<&str, RiskInputs> = BTreeMap::new();
    let mut facility_counts: BTreeMap<&str, u32> = BTreeMap::new();

    for ticket in tickets.iter().filter(|t| is_active(t)) {
        let overdue = is_overdue(ticket, now);
        for area_id in ticket_areas(&index, ticket, facilities) {
            let entry = inputs.entry(area_id).or_default();
            entry.open_tickets += 1;
            if overdue {
                entry.overdue_tickets += 1;
            }
        }
    }

    for facility in facilities {
        let area_ids = facility_areas(&index, facility);
        if area_ids.is_empty() {
            continue;
        }

        let related = related_ticket(&facility.id, tickets);
        let status = derive_facility_status(facility, related, now);
        for area_id in area_ids {
            *facility_counts.entry(area_id).or_default() += 1;
            let entry = inputs.entry(area_id).or_default();
            match status {
                FacilityStatus::Overdue => entry.overdue_facilities += 1,
                FacilityStatus::InProgress => entry.in_progress_facilities += 1,
                FacilityStatus::Safe => {}
            }
        }
    }

    areas
        .iter()
        .map(|area| {
            let area_inputs = inputs.get(area.id.as_str()).copied().unwrap_or_default();
            AreaSummary {
                id: area.id.clone(),
                name: area.name.clone(),
                risk_score: risk_score(&area_inputs),
                facilities: facility_counts.get(area.id.as_str()).copied().unwrap_or(0),
                open_tickets: area_inputs.open_tickets,
                overdue_tickets: area_inputs.overdue_tickets,
            }
        })
        .collect()
}

/// Facility and ticket counts for a preselected set of area members.
#[must_use]
pub fn area_stats(facilities: &[&Facility], tickets: &[&Ticket], now: DateTime<Utc>) -> AreaStats {
    let open: Vec<&&Ticket> = tickets.iter().filter(|t| is_active(t)).collect();
    AreaStats {
        facilities: count(facilities.len()),
        open_tickets: count(open.len()),
        overdue_tickets: count(open.iter().filter(|t| is_overdue(t, now)).count()),
    }
}

/// The most recent stored score of every area.
#[must_use]
pub fn latest_risk_by_area(snapshots: &[AreaRiskSnapshot]) -> BTreeMap<String, f64> {
    let mut latest: BTreeMap<&str, &AreaRiskSnapshot> = BTreeMap::new();
    for snapshot in snapshots {
        latest
            .entry(snapshot.area_id.as_str())
            .and_modify(|current| {
                if snapshot.computed_at > current.computed_at {
                    *current = snapshot;
                }
            })
            .or_insert(snapshot);
    }
    latest
        .into_iter()
        .map(|(area_id, s)| (area_id.to_string(), s.risk_score))
        .collect()
}

/// Risk trend of one area, oldest first.
///
/// Falls back to a single point holding the client-derived score when the
/// store has no snapshots for the area.
#[must_use]
pub fn risk_trend(
    snapshots: &[AreaRiskSnapshot],
    area_id: &str,
    derived: u32,
    now: DateTime<Utc>,
) -> Vec<TrendPoint> {
    let mut rows: Vec<&AreaRiskSnapshot> =
        snapshots.iter().filter(|s| s.area_id == area_id).collect();

    if rows.is_empty() {
        return vec![TrendPoint {
            date: now.date_naive(),
            score: f64::from(derived),
        }];
    }

    rows.sort_by_key(|s| s.computed_at);
    rows.into_iter()
        .map(|s| TrendPoint {
            date: s.computed_at.date_naive(),
            score: s.risk_score,
        })
        .collect()
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use civic_map_domain_models::TicketStatus;

    use super::*;
    use crate::attribution::fixtures::square;
    use crate::facilities::fixtures::facility_at;
    use crate::tickets::fixtures::{at, ticket_at};

    fn inputs(open: u32, overdue: u32, overdue_f: u32, in_progress_f: u32) -> RiskInputs {
        RiskInputs {
            open_tickets: open,
            overdue_tickets: overdue,
            overdue_facilities: overdue_f,
            in_progress_facilities: in_progress_f,
        }
    }

    #[test]
    fn worked_example() {
        // 2 overdue tickets, 1 other open ticket, 1 overdue facility.
        assert_eq!(risk_score(&inputs(3, 2, 1, 0)), 75);
    }

    #[test]
    fn capped_at_one_hundred() {
        assert_eq!(risk_score(&inputs(10, 10, 10, 10)), 100);
        assert_eq!(risk_score(&inputs(u32::MAX, u32::MAX, u32::MAX, u32::MAX)), 100);
    }

    #[test]
    fn empty_area_scores_zero() {
        assert_eq!(risk_score(&RiskInputs::default()), 0);
    }

    #[test]
    fn monotonic_in_every_input() {
        for open in 0..6 {
            for overdue in 0..=open {
                for of in 0..4 {
                    for ip in 0..4 {
                        let base = risk_score(&inputs(open, overdue, of, ip));
                        assert!(base <= MAX_RISK_SCORE);
                        assert!(risk_score(&inputs(open + 1, overdue, of, ip)) >= base);
                        assert!(risk_score(&inputs(open + 1, overdue + 1, of, ip)) >= base);
                        assert!(risk_score(&inputs(open, overdue, of + 1, ip)) >= base);
                        assert!(risk_score(&inputs(open, overdue, of, ip + 1)) >= base);
                    }
                }
            }
        }
    }

    #[test]
    fn summarizes_by_containment() {
        let now = at(2024, 6, 1);
        let areas = vec![square("a", 0.0, 0.0, 1.0), square("b", 1.0, 0.0, 1.0)];
        let tickets = vec![
            ticket_at("t1", TicketStatus::Open, Some(at(2024, 1, 1)), 0.2, 0.2),
            ticket_at("t2", TicketStatus::Open, Some(at(2024, 2, 1)), 0.3, 0.3),
            ticket_at("t3", TicketStatus::Assigned, None, 0.4, 0.4),
            ticket_at("t4", TicketStatus::Completed, Some(at(2024, 1, 1)), 0.5, 0.5),
        ];
        let facilities = vec![
            facility_at("f1", None, 0.6, 0.6),
            facility_at("f2", Some(at(2024, 5, 1)), 1.5, 0.5),
        ];

        let summaries = summarize_areas(&areas, &facilities, &tickets, now);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "a");
        assert_eq!(summaries[0].open_tickets, 3);
        assert_eq!(summaries[0].overdue_tickets, 2);
        assert_eq!(summaries[0].facilities, 1);
        assert_eq!(summaries[0].risk_score, 75);
        assert_eq!(summaries[1].risk_score, 0);
        assert_eq!(summaries[1].facilities, 1);
    }

    #[test]
    fn overlapping_areas_both_count_a_facility() {
        let now = at(2024, 6, 1);
        let areas = vec![square("district", 0.0, 0.0, 4.0), square("village", 1.0, 1.0, 1.0)];
        let facilities = vec![facility_at("f1", None, 1.5, 1.5)];

        let summaries = summarize_areas(&areas, &facilities, &[], now);

        assert_eq!(summaries[0].facilities, 1);
        assert_eq!(summaries[1].facilities, 1);
        assert_eq!(summaries[0].risk_score, OVERDUE_FACILITY_WEIGHT);
        assert_eq!(summaries[1].risk_score, OVERDUE_FACILITY_WEIGHT);
    }

    #[test]
    fn latest_snapshot_wins() {
        let snapshots = vec![
            AreaRiskSnapshot { area_id: "a".into(), risk_score: 10.0, computed_at: at(2024, 1, 1) },
            AreaRiskSnapshot { area_id: "a".into(), risk_score: 40.0, computed_at: at(2024, 3, 1) },
            AreaRiskSnapshot { area_id: "a".into(), risk_score: 20.0, computed_at: at(2024, 2, 1) },
        ];
        assert_eq!(latest_risk_by_area(&snapshots).get("a"), Some(&40.0));
    }

    #[test]
    fn trend_sorted_or_derived() {
        let snapshots = vec![
            AreaRiskSnapshot { area_id: "a".into(), risk_score: 40.0, computed_at: at(2024, 3, 1) },
            AreaRiskSnapshot { area_id: "a".into(), risk_score: 10.0, computed_at: at(2024, 1, 1) },
        ];
        let trend = risk_trend(&snapshots, "a", 55, at(2024, 6, 1));
        assert_eq!(trend.len(), 2);
        assert!((trend[0].score - 10.0).abs() < f64::EPSILON);

        let fallback = risk_trend(&snapshots, "b", 55, at(2024, 6, 1));
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].date, at(2024, 6, 1).date_naive());
        assert!((fallback[0].score - 55.0).abs() < f64::EPSILON);
    }
}
