//! Focus statistics derived from the session log
//!
//! - Daily view: session count and the distinct focus areas of one day
//! - Range view: totals, success rate and focus time over several days

use std::collections::BTreeSet;

use crate::session::{LoggedSession, Outcome};

/// Sessions completed on a single day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyStats {
    pub count: u64,
    pub focus_areas: BTreeSet<String>,
}

impl DailyStats {
    /// Count one session; non-empty descriptions become focus areas
    pub fn add(&mut self, focus: &str) {
        self.count += 1;
        let focus = focus.trim();
        if !focus.is_empty() {
            self.focus_areas.insert(focus.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Aggregated statistics over a list of logged sessions
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total number of sessions
    pub total_sessions: u32,
    /// Sessions marked successful
    pub successful_sessions: u32,
    /// Sessions stopped before the timer ran out
    pub early_stops: u32,
    /// Total focus time in minutes
    pub total_minutes: u64,
    /// Success rate as percentage (0-100)
    pub success_rate: u32,
    /// Average session duration in minutes
    pub average_duration: u64,
}

impl SessionStats {
    pub fn from_sessions(sessions: &[LoggedSession]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let total_sessions = sessions.len() as u32;
        let count = |outcome| sessions.iter().filter(|s| s.outcome == outcome).count() as u32;
        let successful_sessions = count(Outcome::Success);
        let early_stops = count(Outcome::EarlyStop);
        // Hand-edited lines can carry absurd durations
        let total_minutes = sessions
            .iter()
            .map(|s| u64::from(s.minutes()))
            .fold(0u64, u64::saturating_add);

        Self {
            total_sessions,
            successful_sessions,
            early_stops,
            total_minutes,
            success_rate: (u64::from(successful_sessions) * 100 / u64::from(total_sessions)) as u32,
            average_duration: total_minutes / u64::from(total_sessions),
        }
    }

    /// Get total hours and minutes as a tuple
    pub fn total_time(&self) -> (u64, u64) {
        (self.total_minutes / 60, self.total_minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_session(minutes: Option<u32>, outcome: Outcome) -> LoggedSession {
        LoggedSession {
            number: 1,
            timestamp: NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            description: String::new(),
            outcome,
            planned_minutes: Some(25),
            actual_minutes: minutes,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = SessionStats::from_sessions(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.total_minutes, 0);
        assert_eq!(stats.success_rate, 0);
    }

    #[test]
    fn test_stats_calculation() {
        let sessions = vec![
            make_session(Some(25), Outcome::Success),
            make_session(Some(25), Outcome::Success),
            make_session(Some(15), Outcome::EarlyStop),
            make_session(None, Outcome::Failed),
        ];

        let stats = SessionStats::from_sessions(&sessions);
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.successful_sessions, 2);
        assert_eq!(stats.early_stops, 1);
        // The failed session has no actual time and falls back to its plan
        assert_eq!(stats.total_minutes, 90);
        assert_eq!(stats.success_rate, 50);
        assert_eq!(stats.average_duration, 22);
    }

    #[test]
    fn test_total_time() {
        let sessions = vec![
            make_session(Some(90), Outcome::Success),
            make_session(Some(45), Outcome::Success),
        ];

        let (hours, mins) = SessionStats::from_sessions(&sessions).total_time();
        assert_eq!(hours, 2);
        assert_eq!(mins, 15);
    }

    #[test]
    fn test_daily_add() {
        let mut daily = DailyStats::default();
        daily.add("  writing ");
        daily.add("");
        daily.add("writing");
        assert_eq!(daily.count, 3);
        assert_eq!(daily.focus_areas.len(), 1);
        assert!(daily.focus_areas.contains("writing"));
    }

    #[test]
    fn test_huge_durations_do_not_overflow() {
        let sessions = vec![
            make_session(Some(u32::MAX), Outcome::Success),
            make_session(Some(u32::MAX), Outcome::Success),
            make_session(Some(25), Outcome::EarlyStop),
        ];

        let stats = SessionStats::from_sessions(&sessions);
        assert_eq!(stats.total_minutes, 2 * u64::from(u32::MAX) + 25);
        assert_eq!(stats.success_rate, 66);
        assert_eq!(stats.average_duration, stats.total_minutes / 3);
    }
}
