//! Formatting utilities

use chrono::{DateTime, Local};

/// Format a countdown as MM:SS (minutes keep growing past 99)
pub fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format a duration in human-readable form
pub fn duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Format minutes as "2h 15m" / "45m"
pub fn minutes(total: u64) -> String {
    let (hours, mins) = (total / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Format a timestamp as HH:MM
pub fn time(dt: DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// Truncate a string to max characters with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        assert_eq!(clock(1500), "25:00");
        assert_eq!(clock(59), "00:59");
        assert_eq!(clock(0), "00:00");
        assert_eq!(clock(6000), "100:00");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(42), "42s");
        assert_eq!(duration(125), "2m 5s");
        assert_eq!(duration(3720), "1h 2m");
    }

    #[test]
    fn test_minutes() {
        assert_eq!(minutes(45), "45m");
        assert_eq!(minutes(135), "2h 15m");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer description", 10), "a longe...");
        assert_eq!(truncate("anything", 2), "...");
    }
}
