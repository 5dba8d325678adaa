//! Device mix of session starts

use crate::schema::{EventName, EventRow};
use crate::stats::types::{percentage, DeviceBreakdown};
use serde_json::Value;

const DEVICE_CLASS_KEY: &str = "device_class";

/// Classify every `session_start` row as mobile or desktop.
///
/// Desktop is the fallback bucket: any value other than `"mobile"`, a missing
/// property, or unparseable properties all count as desktop.
pub fn device_breakdown(rows: &[EventRow]) -> DeviceBreakdown {
    let (mobile, desktop) = rows
        .iter()
        .filter(|row| row.is(EventName::SessionStart))
        .fold((0u64, 0u64), |(mobile, desktop), row| {
            if is_mobile(row) {
                (mobile + 1, desktop)
            } else {
                (mobile, desktop + 1)
            }
        });

    let total = mobile + desktop;
    DeviceBreakdown {
        mobile,
        desktop,
        mobile_pct: percentage(mobile, total),
        desktop_pct: percentage(desktop, total),
    }
}

fn is_mobile(row: &EventRow) -> bool {
    row.parse_properties()
        .ok()
        .and_then(|props| props.get(DEVICE_CLASS_KEY).and_then(Value::as_str).map(|c| c == "mobile"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::sessions::fixtures::*;

    fn start(session: &str, properties: &str) -> EventRow {
        row(session, "session_start", properties, 0)
    }

    #[test]
    fn test_breakdown() {
        let rows = vec![
            start("a", r#"{"device_class":"mobile"}"#),
            start("b", r#"{"device_class":"mobile"}"#),
            start("c", r#"{"device_class":"desktop"}"#),
            start("d", r#"{"device_class":"tablet"}"#),
            row("a", "card_flip", r#"{"device_class":"mobile"}"#, 1),
        ];

        let breakdown = device_breakdown(&rows);
        assert_eq!(breakdown.mobile, 2);
        assert_eq!(breakdown.desktop, 2);
        assert_eq!(breakdown.mobile_pct, 50.0);
        assert_eq!(breakdown.desktop_pct, 50.0);
    }

    #[test]
    fn test_invalid_json_counts_as_desktop() {
        let rows = vec![
            start("a", "not json at all"),
            start("b", r#"{"device_class":"mobile"}"#),
            start("c", "{}"),
            start("d", r#"{"device_class":7}"#),
        ];

        let breakdown = device_breakdown(&rows);
        assert_eq!(breakdown.mobile + breakdown.desktop, 4);
        assert_eq!(breakdown.desktop, 3);
        assert_eq!(breakdown.mobile_pct, 25.0);
        assert_eq!(breakdown.desktop_pct, 75.0);
    }

    #[test]
    fn test_empty() {
        let breakdown = device_breakdown(&[]);
        assert_eq!(breakdown.mobile, 0);
        assert_eq!(breakdown.desktop, 0);
        assert_eq!(breakdown.mobile_pct, 0.0);
        assert_eq!(breakdown.desktop_pct, 0.0);
    }
}
