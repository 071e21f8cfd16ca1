//! Append-only session log
//!
//! One human-readable line per event:
//!
//! ```text
//! Session 3 completed at 2026-10-19 14:03:11 - write report - success (planned 25m, actual 25m)
//! Event at 2026-10-19 15:01:40: Opened daily note 2026-10-19
//! ```
//!
//! The log is the single source of truth. The session count and the daily
//! statistics are recomputed by scanning it; completion lines are recognised
//! textually so hand-edited or older lines still count.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::stats::DailyStats;

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

/// How a focus session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    EarlyStop,
    Failed,
    Unspecified,
}

impl Outcome {
    /// Text written to the log; `None` for an unspecified outcome
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Outcome::Success => Some("success"),
            Outcome::EarlyStop => Some("early stop"),
            Outcome::Failed => Some("failed"),
            Outcome::Unspecified => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" => Some(Outcome::Success),
            "early stop" => Some(Outcome::EarlyStop),
            "failed" => Some(Outcome::Failed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.as_str().unwrap_or("unspecified")
    }
}

/// A session about to be written to the log
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub timestamp: DateTime<Local>,
    pub description: String,
    pub outcome: Outcome,
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
}

impl SessionRecord {
    pub fn new(description: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            timestamp: Local::now(),
            description: description.into(),
            outcome,
            planned_minutes: None,
            actual_minutes: None,
        }
    }

    pub fn with_minutes(mut self, planned: Option<u32>, actual: Option<u32>) -> Self {
        self.planned_minutes = planned;
        self.actual_minutes = actual;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Render as a completion line carrying the session number
    pub fn to_line(&self, number: u64) -> String {
        let mut line = format!(
            "Session {} completed at {}",
            number,
            self.timestamp.format(TIMESTAMP_FMT)
        );

        let description = single_line(&self.description);
        if !description.is_empty() {
            line.push_str(" - ");
            line.push_str(&description);
        }
        if let Some(status) = self.outcome.as_str() {
            line.push_str(" - ");
            line.push_str(status);
        }
        if let Some(details) = minutes_detail(self.planned_minutes, self.actual_minutes) {
            line.push(' ');
            line.push_str(&details);
        }
        line
    }
}

/// "(planned 25m, actual 20m)" or `None` when neither is known
pub fn minutes_detail(planned: Option<u32>, actual: Option<u32>) -> Option<String> {
    let mut details = Vec::new();
    if let Some(planned) = planned {
        details.push(format!("planned {}m", planned));
    }
    if let Some(actual) = actual {
        details.push(format!("actual {}m", actual));
    }
    if details.is_empty() {
        None
    } else {
        Some(format!("({})", details.join(", ")))
    }
}

fn single_line(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A completion line read back from the log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSession {
    pub number: u64,
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub outcome: Outcome,
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
}

impl LoggedSession {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Minutes actually focused, falling back to the plan
    pub fn minutes(&self) -> u32 {
        self.actual_minutes.or(self.planned_minutes).unwrap_or(0)
    }
}

/// Whether a line marks a finished session
pub fn is_completion_line(line: &str) -> bool {
    line.starts_with("Session ") && line.contains(" completed at ")
}

fn line_regex() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^Session (\d+) completed at (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})(?: - (.*))?$")
            .expect("completion line pattern is valid")
    })
}

fn detail_regex() -> &'static Regex {
    static DETAIL: OnceLock<Regex> = OnceLock::new();
    DETAIL.get_or_init(|| {
        Regex::new(r"\s*\((?:planned (\d+)m)?(?:, )?(?:actual (\d+)m)?\)$")
            .expect("minutes detail pattern is valid")
    })
}

/// Parse a completion line. Lines that only match the textual markers
/// return `None` but still count as sessions.
pub fn parse_line(line: &str) -> Option<LoggedSession> {
    let caps = line_regex().captures(line.trim_end())?;
    let number = caps[1].parse().ok()?;
    let timestamp = NaiveDateTime::parse_from_str(&caps[2], TIMESTAMP_FMT).ok()?;

    let mut tail = caps.get(3).map_or("", |m| m.as_str()).trim().to_string();
    let detail = detail_regex().captures(&tail).and_then(|d| {
        let planned = d.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let actual = d.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        let start = d.get(0)?.start();
        (planned.is_some() || actual.is_some()).then_some((planned, actual, start))
    });

    let (planned_minutes, actual_minutes) = match detail {
        Some((planned, actual, start)) => {
            tail.truncate(start);
            (planned, actual)
        }
        None => (None, None),
    };

    let (description, outcome) = match tail.rsplit_once(" - ") {
        Some((head, status)) if Outcome::parse(status).is_some() => {
            (head.trim().to_string(), Outcome::parse(status))
        }
        _ => match Outcome::parse(&tail) {
            Some(outcome) => (String::new(), Some(outcome)),
            None => (tail.trim().to_string(), None),
        },
    };

    Some(LoggedSession {
        number,
        timestamp,
        description,
        outcome: outcome.unwrap_or(Outcome::Unspecified),
        planned_minutes,
        actual_minutes,
    })
}

/// The session log file plus its derived counter
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    count: u64,
}

impl SessionLog {
    /// Open (or prepare) the log at `path` and count existing sessions
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create session log directory {}: {}", parent.display(), e);
            }
        }

        let mut log = Self {
            path: path.to_path_buf(),
            count: 0,
        };
        log.count = match log.read_lines() {
            Ok(lines) => lines.iter().filter(|l| is_completion_line(l)).count() as u64,
            Err(e) => {
                error!("Error reading session count: {}", e);
                0
            }
        };
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of completion lines seen so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Record a finished session and return the new count.
    ///
    /// The counter advances even when the write fails; the failure is
    /// logged.
    pub fn append(&mut self, record: &SessionRecord) -> u64 {
        self.count += 1;
        let line = record.to_line(self.count);
        match self.write_line(&line) {
            Ok(()) => info!("Logged session {}", self.count),
            Err(e) => error!("Error logging session: {}", e),
        }
        self.count
    }

    /// Append a marker line that does not count as a session
    pub fn log_event(&self, message: &str) -> Result<()> {
        let line = format!(
            "Event at {}: {}",
            Local::now().format(TIMESTAMP_FMT),
            single_line(message)
        );
        self.write_line(&line)
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let wrap = |source| Error::LogWrite {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(wrap)?;

        writeln!(file, "{}", line).map_err(wrap)
    }

    /// Every line of the log. Bytes that are not UTF-8 are replaced
    /// rather than failing the whole read.
    fn read_lines(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).map_err(|source| Error::LogRead {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Sessions and focus areas for one calendar day
    pub fn daily_stats(&self, date: NaiveDate) -> DailyStats {
        let lines = match self.read_lines() {
            Ok(lines) => lines,
            Err(e) => {
                error!("Error getting daily stats: {}", e);
                return DailyStats::default();
            }
        };

        let day = date.format(DATE_FMT).to_string();
        let mut stats = DailyStats::default();
        for line in lines.iter().filter(|l| is_completion_line(l)) {
            match parse_line(line) {
                Some(session) if session.date() == date => {
                    stats.add(&session.description);
                }
                Some(_) => {}
                None if line.contains(&day) => {
                    let focus = line.split_once(" - ").map_or("", |(_, rest)| rest.trim());
                    stats.add(focus);
                }
                None => {}
            }
        }
        stats
    }

    /// Every parseable completion line, oldest first
    pub fn sessions(&self) -> Result<Vec<LoggedSession>> {
        Ok(self
            .read_lines()?
            .iter()
            .filter(|l| is_completion_line(l))
            .filter_map(|l| parse_line(l))
            .collect())
    }

    /// Parseable sessions logged on or after `since`
    pub fn sessions_since(&self, since: NaiveDate) -> Result<Vec<LoggedSession>> {
        let mut sessions = self.sessions()?;
        sessions.retain(|s| s.date() >= since);
        Ok(sessions)
    }
}
