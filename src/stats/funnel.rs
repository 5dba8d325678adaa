//! Landing funnel and read-spread click-through

use crate::schema::{EventName, EventRow};
use crate::stats::sessions::{distinct_sessions, flip_counts};
use crate::stats::types::{percentage, ClickThrough, FunnelStep};

/// Funnel step labels, in order
pub const FUNNEL_STEPS: [&str; 5] = ["Landed", "1st Flip", "2nd Flip", "3rd Flip", "Conversion"];

/// Build the five-step landing funnel.
///
/// Each step's dropoff is measured against the step immediately before it; the
/// Landed step is its own predecessor. Monotonic session counts are expected
/// from real traffic but are not enforced here.
pub fn funnel(rows: &[EventRow]) -> Vec<FunnelStep> {
    let landed = distinct_sessions(rows, &[EventName::SessionStart]).len() as u64;
    let flips = flip_counts(rows);
    let with_at_least = |n: u64| flips.values().filter(|&&count| count >= n).count() as u64;
    let converted = distinct_sessions(rows, &EventName::CONVERSIONS).len() as u64;

    let counts = [
        landed,
        with_at_least(1),
        with_at_least(2),
        with_at_least(3),
        converted,
    ];

    let mut previous = landed;
    FUNNEL_STEPS
        .iter()
        .zip(counts)
        .map(|(label, sessions)| {
            let dropoff = step_dropoff(previous, sessions);
            previous = sessions;
            FunnelStep {
                step: label.to_string(),
                sessions,
                percentage: percentage(sessions, landed),
                dropoff,
            }
        })
        .collect()
}

/// Percentage lost going from `previous` to `current`, 0 when `previous` is 0
fn step_dropoff(previous: u64, current: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (previous as f64 - current as f64) * 100.0 / previous as f64
}

/// Click-through from a ready spread to the read-spread action.
///
/// `clicked` is counted independently of `eligible`, so out-of-order delivery
/// can push the rate above 100%.
pub fn read_spread_ctr(rows: &[EventRow]) -> ClickThrough {
    let eligible = distinct_sessions(rows, &[EventName::SpreadReady]).len() as u64;
    let clicked = distinct_sessions(rows, &[EventName::ReadSpreadClick]).len() as u64;

    ClickThrough {
        eligible,
        clicked,
        ctr: percentage(clicked, eligible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::sessions::fixtures::*;

    fn converted(rows: &mut Vec<EventRow>, session: &str, name: &str) {
        rows.push(row(session, name, r#"{"elapsed_ms":9000}"#, 9000));
    }

    #[test]
    fn test_funnel_steps_and_dropoff() {
        let mut rows = ten_sessions();
        converted(&mut rows, "three-0", "read_spread_click");
        converted(&mut rows, "three-1", "talk_click");
        converted(&mut rows, "one-0", "card_detail_click");
        converted(&mut rows, "one-0", "talk_click");

        let steps = funnel(&rows);
        let labels: Vec<&str> = steps.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(labels, FUNNEL_STEPS.to_vec());

        let sessions: Vec<u64> = steps.iter().map(|s| s.sessions).collect();
        assert_eq!(sessions, vec![10, 8, 2, 2, 3]);

        assert_eq!(steps[0].percentage, 100.0);
        assert_eq!(steps[0].dropoff, 0.0);
        assert_eq!(steps[1].percentage, 80.0);
        assert_eq!(steps[1].dropoff, 20.0);
        assert_eq!(steps[2].dropoff, 75.0);
        assert_eq!(steps[3].dropoff, 0.0);
        assert_eq!(steps[4].percentage, 30.0);
        // Conversion exceeds the 3rd Flip step; dropoff goes negative rather than clamping.
        assert_eq!(steps[4].dropoff, -50.0);
    }

    #[test]
    fn test_realistic_funnel_is_monotonic() {
        let mut rows = ten_sessions();
        converted(&mut rows, "three-0", "read_spread_click");

        let steps = funnel(&rows);
        for pair in steps.windows(2) {
            assert!(pair[1].sessions <= pair[0].sessions);
            assert!(pair[1].dropoff >= 0.0);
        }
    }

    #[test]
    fn test_empty_funnel() {
        let steps = funnel(&[]);
        assert_eq!(steps.len(), 5);
        assert!(steps
            .iter()
            .all(|s| s.sessions == 0 && s.percentage == 0.0 && s.dropoff == 0.0));
    }

    #[test]
    fn test_zero_previous_step_has_zero_dropoff() {
        let mut rows = session("a", 1);
        converted(&mut rows, "a", "talk_click");

        let steps = funnel(&rows);
        // 2nd and 3rd Flip are empty; Conversion follows an empty step.
        assert_eq!(steps[3].sessions, 0);
        assert_eq!(steps[4].sessions, 1);
        assert_eq!(steps[4].dropoff, 0.0);
    }

    #[test]
    fn test_ctr() {
        let mut rows = Vec::new();
        for session in ["a", "b", "c", "d"] {
            rows.push(row(session, "spread_ready", "{}", 1));
        }
        rows.push(row("a", "read_spread_click", "{}", 2));
        rows.push(row("a", "read_spread_click", "{}", 3));

        let ctr = read_spread_ctr(&rows);
        assert_eq!(ctr.eligible, 4);
        assert_eq!(ctr.clicked, 1);
        assert_eq!(ctr.ctr, 25.0);
    }

    #[test]
    fn test_ctr_clicked_not_subset_of_eligible() {
        let rows = vec![
            row("a", "spread_ready", "{}", 1),
            row("a", "read_spread_click", "{}", 2),
            row("b", "read_spread_click", "{}", 2),
        ];

        let ctr = read_spread_ctr(&rows);
        assert_eq!(ctr.clicked, 2);
        assert_eq!(ctr.ctr, 200.0);
    }

    #[test]
    fn test_ctr_without_eligible_sessions() {
        let rows = vec![row("b", "read_spread_click", "{}", 2)];
        let ctr = read_spread_ctr(&rows);
        assert_eq!(ctr.eligible, 0);
        assert_eq!(ctr.ctr, 0.0);
    }
}
