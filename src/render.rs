//! Console formatting shared by the reports.

use chrono::{DateTime, NaiveDateTime};

pub const RULE_WIDTH: usize = 80;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Keeps the first `max` characters and marks the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// One block per 0.05 of score.
pub fn score_bar(score: f32) -> String {
    let blocks = (score * 20.0).floor().max(0.0) as usize;
    "█".repeat(blocks)
}

/// Comma-joined first `max` items, with `...` when some were left out.
pub fn preview<S: AsRef<str>>(items: &[S], max: usize) -> String {
    let shown = items
        .iter()
        .take(max)
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > max {
        format!("{}...", shown)
    } else {
        shown
    }
}

/// `YYYY-MM-DD HH:MM:SS`, or the raw string when it does not parse.
pub fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY).to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format(DISPLAY).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("사원 고유키", 80), "사원 고유키");
        assert_eq!(truncate("가나다라마", 3), "가나다...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn test_score_bar() {
        assert_eq!(score_bar(0.0), "");
        assert_eq!(score_bar(0.52), "█".repeat(10));
        assert_eq!(score_bar(1.0), "█".repeat(20));
        assert_eq!(score_bar(-0.2), "");
    }

    #[test]
    fn test_preview() {
        let items = ["a", "b", "c", "d", "e", "f"];
        assert_eq!(preview(&items, 5), "a, b, c, d, e...");
        assert_eq!(preview(&items[..2], 5), "a, b");
        assert_eq!(preview::<&str>(&[], 3), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2025-03-04T05:06:07.123456Z"),
            "2025-03-04 05:06:07"
        );
        assert_eq!(
            format_timestamp("2025-03-04T05:06:07.123456"),
            "2025-03-04 05:06:07"
        );
        assert_eq!(format_timestamp("2025-03-04T05:06:07"), "2025-03-04 05:06:07");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }
}
