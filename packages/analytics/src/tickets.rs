//! Ticket status derivation and the admin ticket list.

use chrono::{DateTime, Utc};
use civic_map_analytics_models::TicketRow;
use civic_map_domain_models::{Ticket, TicketStatus, TicketStatusCompact};

/// Maps a ticket's lifecycle status and SLA deadline to its compact
/// display status.
///
/// Completed and cancelled tickets map to [`TicketStatusCompact::Open`].
/// That is how closed tickets have always been displayed; whether they
/// should get a status of their own is an open product question.
#[must_use]
pub fn derive_ticket_status(
    status: TicketStatus,
    sla_due_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TicketStatusCompact {
    if status.is_closed() {
        return TicketStatusCompact::Open;
    }
    match sla_due_at {
        Some(due) if due < now => TicketStatusCompact::Overdue,
        _ => TicketStatusCompact::WithinSla,
    }
}

/// Whether the ticket still needs work.
#[must_use]
pub const fn is_active(ticket: &Ticket) -> bool {
    !ticket.status.is_closed()
}

/// Whether the ticket is active and past its SLA deadline.
#[must_use]
pub fn is_overdue(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    is_active(ticket) && ticket.sla_due_at.is_some_and(|due| due < now)
}

/// The ticket considered for a facility: the first one that references it.
#[must_use]
pub fn related_ticket<'a>(facility_id: &str, tickets: &'a [Ticket]) -> Option<&'a Ticket> {
    tickets
        .iter()
        .find(|t| t.facility_id.as_deref() == Some(facility_id))
}

/// The admin ticket list, soonest SLA deadline first. Tickets without a
/// deadline come last, in input order.
#[must_use]
pub fn ticket_rows(tickets: &[Ticket], now: DateTime<Utc>) -> Vec<TicketRow> {
    let mut rows: Vec<TicketRow> = tickets
        .iter()
        .map(|t| TicketRow {
            id: t.id.clone(),
            title: t
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| t.ticket_type.clone()),
            status: derive_ticket_status(t.status, t.sla_due_at, now),
            severity: t.severity.unwrap_or(1),
            sla_due: t.sla_due_at.map(|due| due.date_naive()),
        })
        .collect();

    rows.sort_by_key(|row| (row.sla_due.is_none(), row.sla_due));
    rows
}


#[cfg(test)]
mod tests {
    use super::fixtures::{at, ticket};
    use super::*;

    #[test]
    fn closed_tickets_display_as_open() {
        let now = at(2024, 6, 1);
        for status in [TicketStatus::Completed, TicketStatus::Cancelled] {
            for sla in [None, Some(at(2020, 1, 1)), Some(at(2030, 1, 1))] {
                assert_eq!(derive_ticket_status(status, sla, now), TicketStatusCompact::Open);
            }
        }
    }

    #[test]
    fn past_sla_is_overdue() {
        let now = at(2024, 6, 1);
        for status in [
            TicketStatus::Open,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::Unknown,
        ] {
            assert_eq!(
                derive_ticket_status(status, Some(at(2024, 1, 1)), now),
                TicketStatusCompact::Overdue
            );
        }
    }

    #[test]
    fn missing_sla_is_within_sla() {
        let now = at(2024, 6, 1);
        assert_eq!(
            derive_ticket_status(TicketStatus::Assigned, None, now),
            TicketStatusCompact::WithinSla
        );
    }

    #[test]
    fn deadline_equal_to_now_is_not_overdue() {
        let now = at(2024, 6, 1);
        assert_eq!(
            derive_ticket_status(TicketStatus::Open, Some(now), now),
            TicketStatusCompact::WithinSla
        );
    }

    #[test]
    fn overdue_requires_active_ticket() {
        let now = at(2024, 6, 1);
        assert!(is_overdue(&ticket("a", TicketStatus::Open, Some(at(2024, 1, 1))), now));
        assert!(!is_overdue(&ticket("b", TicketStatus::Completed, Some(at(2024, 1, 1))), now));
        assert!(!is_overdue(&ticket("c", TicketStatus::Open, None), now));
    }

    #[test]
    fn related_ticket_is_first_match() {
        let mut first = ticket("first", TicketStatus::Open, None);
        first.facility_id = Some("f1".to_string());
        let mut second = ticket("second", TicketStatus::Open, None);
        second.facility_id = Some("f1".to_string());
        let tickets = vec![ticket("other", TicketStatus::Open, None), first, second];

        assert_eq!(related_ticket("f1", &tickets).map(|t| t.id.as_str()), Some("first"));
        assert!(related_ticket("f2", &tickets).is_none());
    }

    #[test]
    fn ticket_rows_sorted_by_deadline() {
        let now = at(2024, 6, 1);
        let mut described = ticket("late", TicketStatus::Open, Some(at(2024, 5, 1)));
        described.description = Some("Broken bench".to_string());
        let mut unrated = ticket("none", TicketStatus::Open, None);
        unrated.severity = None;
        let tickets = vec![
            unrated,
            ticket("soon", TicketStatus::Assigned, Some(at(2024, 6, 3))),
            described,
        ];

        let rows = ticket_rows(&tickets, now);

        assert_eq!(
            rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["late", "soon", "none"]
        );
        assert_eq!(rows[0].title, "Broken bench");
        assert_eq!(rows[0].status, TicketStatusCompact::Overdue);
        assert_eq!(rows[1].title, "pothole");
        assert_eq!(rows[1].status, TicketStatusCompact::WithinSla);
        assert_eq!(rows[1].sla_due, Some(at(2024, 6, 3).date_naive()));
        assert_eq!(rows[2].severity, 1);
        assert_eq!(rows[2].sla_due, None);
    }
}
