//! Pure ordering policy for the triage queue.
//!
//! Ranking is total: priority tier first (HIGH before MEDIUM before LOW),
//! newest first within a tier, higher confidence breaking timestamp ties.
//! Full ties keep their original relative order (stable sort).

use std::collections::HashSet;

use crate::alert::AlertSummary;
use crate::identifiers::AlertId;

/// Sorts `alerts` in place into triage order.
pub fn rank_alerts(alerts: &mut [AlertSummary]) {
    alerts.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.confidence.cmp(&a.confidence))
    });
}

/// Owned variant of [`rank_alerts`].
pub fn ranked(mut alerts: Vec<AlertSummary>) -> Vec<AlertSummary> {
    rank_alerts(&mut alerts);
    alerts
}

/// Keeps the first occurrence of each alert id, preserving first-seen order.
pub fn dedupe_alerts(alerts: Vec<AlertSummary>) -> Vec<AlertSummary> {
    let mut seen: HashSet<AlertId> = HashSet::with_capacity(alerts.len());
    alerts
        .into_iter()
        .filter(|alert| seen.insert(alert.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::OffsetDateTime;

    use super::*;
    use crate::alert::{AlertStatus, ClientSummary, PortfolioSummary, Priority};
    use crate::identifiers::{ClientId, PortfolioId};

    fn alert(id: i64, priority: Priority, created_at: OffsetDateTime) -> AlertSummary {
        AlertSummary {
            id: AlertId(id),
            created_at,
            priority,
            confidence: 80,
            event_title: format!("alert-{id}"),
            summary: String::new(),
            status: AlertStatus::Open,
            client: ClientSummary {
                id: ClientId::new("client-1"),
                name: "Avery Chen".to_owned(),
                email: "avery@example.com".to_owned(),
                segment: "Core".to_owned(),
                risk_profile: "Balanced".to_owned(),
            },
            portfolio: PortfolioSummary {
                id: PortfolioId::new("portfolio-1"),
                name: "Balanced Growth".to_owned(),
                total_value: 500_000.0,
                target_equity_pct: 60.0,
                target_fixed_income_pct: 30.0,
                target_cash_pct: 10.0,
            },
            recently_arrived: false,
        }
    }

    #[test]
    fn ranks_by_priority_tier_then_recency() {
        let older = datetime!(2026-03-01 09:00 UTC);
        let newer = datetime!(2026-03-01 10:00 UTC);
        let input = vec![
            alert(1, Priority::Low, newer),
            alert(2, Priority::High, older),
            alert(3, Priority::Medium, newer),
            alert(4, Priority::High, newer),
        ];

        let ordered = ranked(input);
        let ids: Vec<i64> = ordered.iter().map(|a| a.id.value()).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn ranking_is_idempotent() {
        let base = datetime!(2026-03-01 09:00 UTC);
        let input = vec![
            alert(1, Priority::Medium, base),
            alert(2, Priority::High, base + time::Duration::minutes(5)),
            alert(3, Priority::High, base),
            alert(4, Priority::Low, base),
        ];

        let once = ranked(input);
        let twice = ranked(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn identical_priority_and_timestamp_keeps_original_relative_order() {
        let at = datetime!(2026-03-01 09:00 UTC);
        let input = vec![
            alert(10, Priority::High, at),
            alert(11, Priority::High, at),
            alert(12, Priority::High, at),
        ];

        let ordered = ranked(input);
        let ids: Vec<i64> = ordered.iter().map(|a| a.id.value()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_first_seen_order() {
        let at = datetime!(2026-03-01 09:00 UTC);
        let mut first = alert(1, Priority::High, at);
        first.event_title = "first".to_owned();
        let mut shadow = alert(1, Priority::Low, at);
        shadow.event_title = "shadow".to_owned();

        let input = vec![
            alert(2, Priority::Medium, at),
            first,
            shadow,
            alert(3, Priority::Low, at),
            alert(2, Priority::High, at),
        ];

        let deduped = dedupe_alerts(input);
        let ids: Vec<i64> = deduped.iter().map(|a| a.id.value()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(deduped[1].event_title, "first");
    }

    #[test]
    fn dedupe_is_idempotent_and_empty_input_is_empty() {
        assert!(dedupe_alerts(Vec::new()).is_empty());

        let at = datetime!(2026-03-01 09:00 UTC);
        let input = vec![
            alert(1, Priority::High, at),
            alert(1, Priority::High, at),
            alert(2, Priority::Low, at),
        ];
        let once = dedupe_alerts(input);
        let twice = dedupe_alerts(once.clone());
        assert_eq!(once, twice);
    }
}
