//! Chart series and search for the area dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_map_analytics_models::{GradeCount, TicketTypeCount};
use civic_map_domain_models::{AreaOption, Facility, HealthGrade, Ticket};

use crate::tickets::is_overdue;

/// Facility count per health grade. Facilities without a grade count as
/// [`HealthGrade::B`].
#[must_use]
pub fn grade_distribution(facilities: &[&Facility]) -> Vec<GradeCount> {
    HealthGrade::all()
        .iter()
        .map(|grade| GradeCount {
            grade: *grade,
            value: facilities
                .iter()
                .filter(|f| f.grade.unwrap_or_default() == *grade)
                .count()
                .try_into()
                .unwrap_or(u32::MAX),
        })
        .collect()
}

/// Ticket count per type, ordered by type key, with the overdue share.
#[must_use]
pub fn ticket_type_counts(tickets: &[&Ticket], now: DateTime<Utc>) -> Vec<TicketTypeCount> {
    let mut counts: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for ticket in tickets {
        let entry = counts.entry(ticket.ticket_type.as_str()).or_default();
        entry.0 += 1;
        if is_overdue(ticket, now) {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(ticket_type, (count, overdue))| TicketTypeCount {
            ticket_type: ticket_type.to_string(),
            count,
            overdue,
        })
        .collect()
}

/// Areas whose name or code contains `term`, case-insensitively. An empty
/// term matches everything.
#[must_use]
pub fn search_areas<'a>(options: &'a [AreaOption], term: &str) -> Vec<&'a AreaOption> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return options.iter().collect();
    }
    options
        .iter()
        .filter(|a| {
            a.name.to_lowercase().contains(&term)
                || a.code.as_deref().is_some_and(|c| c.to_lowercase().contains(&term))
        })
        .collect()
}
