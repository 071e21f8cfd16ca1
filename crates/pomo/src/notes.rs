//! Obsidian notes integration
//!
//! Opens daily and weekly notes through `obsidian://` URLs and appends a
//! line per finished session. When a local vault path is configured the
//! session line is written straight into a dated Markdown file; otherwise
//! it goes through Obsidian's `new` action with `append=true`.
//!
//! Everything here is best effort: failures are logged and reported as
//! `false`.

use chrono::{DateTime, Datelike, Local};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{error, info, warn};

use pomo_core::format;

use crate::config::ObsidianSettings;
use crate::error::{Error, Result};
use crate::opener::{encode_component, UrlOpener};
use crate::session::{minutes_detail, Outcome};

/// Notes collaborator bound to one snapshot of the settings
pub struct Notes {
    settings: ObsidianSettings,
    opener: Rc<dyn UrlOpener>,
}

impl Notes {
    pub fn new(settings: ObsidianSettings, opener: Rc<dyn UrlOpener>) -> Self {
        Self { settings, opener }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn settings(&self) -> &ObsidianSettings {
        &self.settings
    }

    /// Append one session entry to today's sessions note
    pub fn record_session(
        &self,
        description: &str,
        outcome: Outcome,
        planned_minutes: Option<u32>,
        actual_minutes: Option<u32>,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let now = Local::now();
        let entry = session_entry(now, description, outcome, planned_minutes, actual_minutes);
        let result = if self.settings.vault_path.trim().is_empty() {
            self.append_via_url(now, &entry)
        } else {
            self.append_to_vault(now, &entry)
        };

        match result {
            Ok(target) => {
                info!("Recorded session to Obsidian: {}", target);
                true
            }
            Err(e) => {
                error!("Error recording session to Obsidian: {}", e);
                false
            }
        }
    }

    fn append_to_vault(&self, now: DateTime<Local>, entry: &str) -> Result<String> {
        let path = self.sessions_note_path(now);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            write!(file, "# Pomodoro Sessions – {}\n\n", now.format("%Y-%m-%d"))?;
        }
        writeln!(file, "{}", entry)?;
        Ok(path.display().to_string())
    }

    fn append_via_url(&self, now: DateTime<Local>, entry: &str) -> Result<String> {
        let file = format!(
            "{}/{} - Pomodoro Sessions",
            self.settings.sessions_notes_path.trim_end_matches('/'),
            now.format("%Y-%m-%d")
        );
        let url = format!(
            "obsidian://new?vault={}&file={}&content={}&append=true",
            encode_component(&self.settings.vault_name),
            encode_component(file.trim_start_matches('/')),
            encode_component(&format!("{}\n", entry)),
        );
        self.opener.open(&url)?;
        Ok(url)
    }

    /// Markdown file that collects today's sessions inside the vault
    pub fn sessions_note_path(&self, now: DateTime<Local>) -> PathBuf {
        PathBuf::from(&self.settings.vault_path)
            .join(&self.settings.sessions_notes_path)
            .join(format!("{} - Pomodoro Sessions.md", now.format("%Y-%m-%d")))
    }

    /// Open today's daily note
    pub fn open_daily_note(&self) -> bool {
        let date = Local::now().format("%Y-%m-%d").to_string();
        self.open_note(&self.settings.daily_notes_path, &date, "daily")
    }

    /// Open this ISO week's weekly note
    pub fn open_weekly_note(&self) -> bool {
        self.open_note(&self.settings.weekly_notes_path, &week_name(Local::now()), "weekly")
    }

    fn open_note(&self, folder: &str, name: &str, kind: &str) -> bool {
        if !self.is_enabled() {
            info!("Notes integration is disabled");
            return false;
        }

        match self.note_url(folder, name).and_then(|url| self.opener.open(&url)) {
            Ok(()) => {
                info!("Opened {} note {}", kind, name);
                true
            }
            Err(e) => {
                error!("Error opening {} note: {}", kind, e);
                false
            }
        }
    }

    /// `obsidian://open` URL for `{folder}/{name}`
    pub fn note_url(&self, folder: &str, name: &str) -> Result<String> {
        let vault = self.settings.vault_name.trim();
        if vault.is_empty() {
            warn!("Obsidian vault_name not set");
            return Err(Error::Integration("vault_name is not configured".to_string()));
        }

        let folder = folder.trim().trim_matches('/');
        let file = if folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", folder, name)
        };
        Ok(format!(
            "obsidian://open?vault={}&file={}",
            encode_component(vault),
            encode_component(&file)
        ))
    }
}

/// ISO week note name, e.g. `2026-W43`
pub fn week_name(now: DateTime<Local>) -> String {
    let week = now.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// One Markdown list item describing a session
pub fn session_entry(
    now: DateTime<Local>,
    description: &str,
    outcome: Outcome,
    planned_minutes: Option<u32>,
    actual_minutes: Option<u32>,
) -> String {
    let description = description.trim();
    let description = if description.is_empty() {
        "(no description)"
    } else {
        description
    };
    let mut entry = format!("- {} – {} — {}", format::time(now), description, outcome.label());
    if let Some(details) = minutes_detail(planned_minutes, actual_minutes) {
        entry.push(' ');
        entry.push_str(&details);
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingOpener {
        urls: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> Result<()> {
            if self.fail {
                return Err(Error::Integration("launcher missing".to_string()));
            }
            self.urls.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn notes_with(settings: ObsidianSettings) -> (Notes, Rc<RefCell<Vec<String>>>) {
        let opener = RecordingOpener::default();
        let urls = opener.urls.clone();
        (Notes::new(settings, Rc::new(opener)), urls)
    }

    #[test]
    fn test_week_name_uses_iso_year() {
        let dec_31 = Local.with_ymd_and_hms(2024, 12, 31, 12, 0, 0).single().unwrap();
        assert_eq!(week_name(dec_31), "2025-W01");
        let mid = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().unwrap();
        assert_eq!(week_name(mid), "2026-W43");
    }

    #[test]
    fn test_session_entry() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 9, 5, 0).single().unwrap();
        assert_eq!(
            session_entry(at, "", Outcome::EarlyStop, Some(25), Some(10)),
            "- 09:05 – (no description) — early stop (planned 25m, actual 10m)"
        );
        assert_eq!(
            session_entry(at, "write", Outcome::Success, None, None),
            "- 09:05 – write — success"
        );
    }

    #[test]
    fn test_note_url() {
        let (notes, _) = notes_with(ObsidianSettings::default());
        assert_eq!(
            notes.note_url("Personal/Notes/Daily Notes", "2026-10-19").unwrap(),
            "obsidian://open?vault=memory&file=Personal/Notes/Daily%20Notes/2026-10-19"
        );
        assert_eq!(
            notes.note_url("", "2026-W43").unwrap(),
            "obsidian://open?vault=memory&file=2026-W43"
        );
    }

    #[test]
    fn test_open_daily_note_uses_opener() {
        let (notes, urls) = notes_with(ObsidianSettings::default());
        assert!(notes.open_daily_note());
        assert!(notes.open_weekly_note());

        let urls = urls.borrow();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("obsidian://open?vault=memory&file=Personal/Notes/Daily%20Notes/"));
        assert!(urls[1].contains("Weekly%20Notes/"));
    }

    #[test]
    fn test_disabled_returns_false() {
        let settings = ObsidianSettings {
            enabled: false,
            ..Default::default()
        };
        let (notes, urls) = notes_with(settings);
        assert!(!notes.open_daily_note());
        assert!(!notes.record_session("x", Outcome::Success, None, None));
        assert!(urls.borrow().is_empty());
    }

    #[test]
    fn test_missing_vault_name_returns_false() {
        let settings = ObsidianSettings {
            vault_name: "  ".to_string(),
            ..Default::default()
        };
        let (notes, _) = notes_with(settings);
        assert!(!notes.open_weekly_note());
    }

    #[test]
    fn test_opener_failure_returns_false() {
        let opener = RecordingOpener {
            fail: true,
            ..Default::default()
        };
        let notes = Notes::new(ObsidianSettings::default(), Rc::new(opener));
        assert!(!notes.open_daily_note());
        assert!(!notes.record_session("x", Outcome::Failed, None, None));
    }

    #[test]
    fn test_record_session_to_vault_file() {
        let tmp = TempDir::new().unwrap();
        let settings = ObsidianSettings {
            vault_path: tmp.path().display().to_string(),
            sessions_notes_path: "Sessions".to_string(),
            ..Default::default()
        };
        let (notes, urls) = notes_with(settings);

        assert!(notes.record_session("first", Outcome::Success, Some(25), Some(25)));
        assert!(notes.record_session("", Outcome::Failed, None, None));
        assert!(urls.borrow().is_empty());

        let path = notes.sessions_note_path(Local::now());
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert!(lines[0].starts_with("# Pomodoro Sessions – "));
        assert_eq!(lines[1], "");
        assert!(lines[2].ends_with("– first — success (planned 25m, actual 25m)"));
        assert!(lines[3].ends_with("– (no description) — failed"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_record_session_via_url_without_vault_path() {
        let (notes, urls) = notes_with(ObsidianSettings::default());
        assert!(notes.record_session("deep work", Outcome::Success, Some(25), None));

        let urls = urls.borrow();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("obsidian://new?vault=memory&file=Personal/Notes/Pomodoro%20Sessions/"));
        assert!(urls[0].contains("deep%20work"));
        assert!(urls[0].ends_with("&append=true"));
    }
}
