//! Human-readable rendering shared by the CLI tables and the viewer.

use chrono::{DateTime, Local, Utc};

/// Render a duration in seconds as `12.3s`, `4.5m` or `1.2h`.
#[must_use]
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        None => "N/A".to_string(),
        Some(s) if s < 60.0 => format!("{s:.1}s"),
        Some(s) if s < 3600.0 => format!("{:.1}m", s / 60.0),
        Some(s) => format!("{:.1}h", s / 3600.0),
    }
}

/// Render a timestamp in local time, to the second.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Shorten `text` to at most `width` characters, marking the cut with `…`.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(12.34)), "12.3s");
        assert_eq!(format_duration(Some(90.0)), "1.5m");
        assert_eq!(format_duration(Some(5400.0)), "1.5h");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-id", 6), "a-ver…");
    }
}
