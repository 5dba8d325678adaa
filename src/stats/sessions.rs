//! Session-level statistics: totals, bounce rate and the flip histogram

use crate::schema::{EventName, EventRow};
use crate::stats::types::{percentage, FlipBucket, SessionStats};
use std::collections::{HashMap, HashSet};

/// Most cards a spread can reveal; higher flip counts share the top bucket
pub const MAX_REVEALABLE_CARDS: u8 = 3;

/// Distinct session ids with at least one row carrying any of `names`
pub(crate) fn distinct_sessions<'a>(rows: &'a [EventRow], names: &[EventName]) -> HashSet<&'a str> {
    rows.iter()
        .filter(|row| names.iter().any(|name| row.is(*name)))
        .map(|row| row.session_id.as_str())
        .collect()
}

/// Number of `card_flip` rows per session
pub(crate) fn flip_counts(rows: &[EventRow]) -> HashMap<&str, u64> {
    let mut counts = HashMap::new();
    for row in rows.iter().filter(|row| row.is(EventName::CardFlip)) {
        *counts.entry(row.session_id.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Compute landing totals and bounce rate
pub fn session_stats(rows: &[EventRow]) -> SessionStats {
    let total_sessions = distinct_sessions(rows, &[EventName::SessionStart]).len() as u64;
    let engaged_sessions = distinct_sessions(rows, &[EventName::CardFlip]).len() as u64;

    let bounce_rate = if total_sessions == 0 {
        0.0
    } else {
        (total_sessions as f64 - engaged_sessions as f64) * 100.0 / total_sessions as f64
    };

    SessionStats {
        total_sessions,
        engaged_sessions,
        bounce_rate,
    }
}

/// Bucket every started session by its capped flip count.
///
/// Sessions whose `session_start` falls outside the window are excluded even
/// when their flips are inside it.
pub fn flip_distribution(rows: &[EventRow]) -> Vec<FlipBucket> {
    let started = distinct_sessions(rows, &[EventName::SessionStart]);
    let flips = flip_counts(rows);

    let mut buckets = [0u64; MAX_REVEALABLE_CARDS as usize + 1];
    for session in &started {
        let count = flips.get(session).copied().unwrap_or(0);
        let capped = count.min(u64::from(MAX_REVEALABLE_CARDS)) as usize;
        buckets[capped] += 1;
    }

    let total = started.len() as u64;
    buckets
        .iter()
        .enumerate()
        .map(|(flip_count, &sessions)| FlipBucket {
            flip_count: flip_count as u8,
            sessions,
            percentage: percentage(sessions, total),
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ten_session_distribution() {
        let rows = ten_sessions();
        let buckets = flip_distribution(&rows);

        let expected = vec![
            FlipBucket { flip_count: 0, sessions: 2, percentage: 20.0 },
            FlipBucket { flip_count: 1, sessions: 6, percentage: 60.0 },
            FlipBucket { flip_count: 2, sessions: 0, percentage: 0.0 },
            FlipBucket { flip_count: 3, sessions: 2, percentage: 20.0 },
        ];
        assert_eq!(buckets, expected);

        let stats = session_stats(&rows);
        assert_eq!(stats.total_sessions, 10);
        assert_eq!(stats.engaged_sessions, 8);
        assert_eq!(stats.bounce_rate, 20.0);
    }

    #[test]
    fn test_flip_count_is_capped() {
        let mut rows = session("heavy", 7);
        rows.extend(session("exact", 3));

        let buckets = flip_distribution(&rows);
        assert_eq!(buckets[3].sessions, 2);
        assert_eq!(buckets.iter().map(|b| b.sessions).sum::<u64>(), 2);
    }

    #[test]
    fn test_flips_without_start_are_excluded() {
        let mut rows = session("started", 1);
        rows.push(row("late", "card_flip", r#"{"cards_revealed_count":1}"#, 10));
        rows.push(row("late", "card_flip", r#"{"cards_revealed_count":2}"#, 20));

        let buckets = flip_distribution(&rows);
        let total: u64 = buckets.iter().map(|b| b.sessions).sum();
        assert_eq!(total, 1);
        assert_eq!(buckets[1].sessions, 1);
        assert_eq!(buckets[1].percentage, 100.0);
    }

    #[test]
    fn test_distribution_sums_to_total_sessions() {
        let mut rows = ten_sessions();
        rows.extend(session("extra-a", 2));
        rows.extend(session("extra-b", 5));

        let total = session_stats(&rows).total_sessions;
        let summed: u64 = flip_distribution(&rows).iter().map(|b| b.sessions).sum();
        assert_eq!(summed, total);
    }

    #[test]
    fn test_bounce_and_engagement_sum_to_hundred() {
        let rows = ten_sessions();
        let stats = session_stats(&rows);
        let engaged_pct = stats.engaged_sessions as f64 * 100.0 / stats.total_sessions as f64;
        assert!((stats.bounce_rate + engaged_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window() {
        let stats = session_stats(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.bounce_rate, 0.0);

        let buckets = flip_distribution(&[]);
        assert_eq!(buckets.len(), 4);
        assert!(buckets.iter().all(|b| b.sessions == 0 && b.percentage == 0.0));
    }

    #[test]
    fn test_duplicate_session_start_counts_once() {
        let mut rows = session("s1", 1);
        rows.push(row("s1", "session_start", "{}", 5));
        assert_eq!(session_stats(&rows).total_sessions, 1);
    }
}
