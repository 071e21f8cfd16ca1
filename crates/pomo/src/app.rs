//! Application controller
//!
//! Owns the configuration, the timer, the session log and the external
//! collaborators, and turns user intents into timer operations. Whatever
//! front end drives it (the interactive `run` loop today) only calls these
//! methods and renders the returned events.

use std::rc::Rc;
use tracing::{error, info};

use crate::config::{ConfigStore, ObsidianUpdate, SoundKind};
use crate::error::{Error, Result};
use crate::notes::Notes;
use crate::opener::UrlOpener;
use crate::session::{Outcome, SessionLog, SessionRecord};
use crate::sound::NotificationSink;
use crate::timer::{CompletedPhase, Phase, Timer, TimerEvent};

/// What the front end should show or ask after a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Remaining seconds in the current phase
    Display(u64),
    /// A focus phase ran out; ask whether it went well
    VerdictRequested(CompletedPhase),
    /// A rest phase ran out; the timer is idle again
    RestFinished,
}

/// A batch of settings changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub focus_minutes: Option<u32>,
    pub rest_minutes: Option<u32>,
    pub focus_sound: Option<String>,
    pub focus_volume: Option<f64>,
    pub rest_sound: Option<String>,
    pub rest_volume: Option<f64>,
    pub notes_enabled: Option<bool>,
    pub vault_name: Option<String>,
    pub vault_path: Option<String>,
    pub daily_notes_path: Option<String>,
    pub weekly_notes_path: Option<String>,
    pub sessions_notes_path: Option<String>,
    pub always_on_top: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every change inside one configuration batch
    pub fn apply_to(&self, store: &mut ConfigStore) -> Result<()> {
        for minutes in [self.focus_minutes, self.rest_minutes].into_iter().flatten() {
            if minutes == 0 {
                return Err(Error::InvalidDuration(minutes));
            }
        }

        store.start_batch();
        if let Some(minutes) = self.focus_minutes {
            store.set_focus_period(minutes)?;
        }
        if let Some(minutes) = self.rest_minutes {
            store.set_rest_period(minutes)?;
        }
        if self.focus_sound.is_some() || self.focus_volume.is_some() {
            store.set_sound_settings(SoundKind::FocusEnd, self.focus_sound.as_deref(), self.focus_volume);
        }
        if self.rest_sound.is_some() || self.rest_volume.is_some() {
            store.set_sound_settings(SoundKind::RestEnd, self.rest_sound.as_deref(), self.rest_volume);
        }
        if let Some(enabled) = self.notes_enabled {
            store.set_obsidian_enabled(enabled);
        }
        let notes = ObsidianUpdate {
            vault_name: self.vault_name.as_deref(),
            vault_path: self.vault_path.as_deref(),
            daily_notes_path: self.daily_notes_path.as_deref(),
            weekly_notes_path: self.weekly_notes_path.as_deref(),
            sessions_notes_path: self.sessions_notes_path.as_deref(),
        };
        if [
            notes.vault_name,
            notes.vault_path,
            notes.daily_notes_path,
            notes.weekly_notes_path,
            notes.sessions_notes_path,
        ]
        .iter()
        .any(Option::is_some)
        {
            store.update_obsidian_settings(notes);
        }
        if let Some(on_top) = self.always_on_top {
            store.set_always_on_top(on_top);
        }
        store.end_batch();
        Ok(())
    }
}

pub struct App {
    config: ConfigStore,
    timer: Timer,
    log: SessionLog,
    sink: Box<dyn NotificationSink>,
    opener: Rc<dyn UrlOpener>,
    notes: Notes,
    pending: Option<CompletedPhase>,
}

impl App {
    pub fn new(
        config: ConfigStore,
        log: SessionLog,
        sink: Box<dyn NotificationSink>,
        opener: Rc<dyn UrlOpener>,
    ) -> Self {
        let timer = Timer::new(config.focus_period(), config.rest_period());
        let notes = Notes::new(config.obsidian().clone(), Rc::clone(&opener));
        Self {
            config,
            timer,
            log,
            sink,
            opener,
            notes,
            pending: None,
        }
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    /// Focus phase still waiting for a success answer
    pub fn pending_verdict(&self) -> Option<&CompletedPhase> {
        self.pending.as_ref()
    }

    /// Start focusing. Supplied durations are saved as the new defaults.
    pub fn start_focus(&mut self, description: &str, focus: Option<u32>, rest: Option<u32>) {
        self.settle_pending();

        let focus = focus.filter(|m| *m > 0);
        let rest = rest.filter(|m| *m > 0);
        if focus.is_some() || rest.is_some() {
            let update = SettingsUpdate {
                focus_minutes: focus,
                rest_minutes: rest,
                ..Default::default()
            };
            if let Err(e) = update.apply_to(&mut self.config) {
                error!("Error saving session durations: {}", e);
            }
            self.timer
                .set_durations(self.config.focus_period(), self.config.rest_period());
        }

        self.timer.start_focus(description, focus, rest);
        info!("Focus started: {}", description);
    }

    pub fn start_rest(&mut self) {
        self.timer.start_rest();
    }

    pub fn pause_resume(&mut self) {
        self.timer.pause_resume();
    }

    pub fn reset(&mut self) {
        self.timer.reset();
    }

    /// End the current focus early and log it. Returns the new session count.
    pub fn stop_early(&mut self) -> Option<u64> {
        let stopped = self.timer.stop_early()?;
        Some(self.record(&stopped, Outcome::EarlyStop, stopped.elapsed_minutes()))
    }

    /// Advance one second and react to what the timer reports
    pub fn tick(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        for event in self.timer.tick() {
            match event {
                TimerEvent::DisplayUpdate(remaining) => events.push(AppEvent::Display(remaining)),
                TimerEvent::PhaseCompleted(completed) => match completed.phase {
                    Phase::Focus => {
                        self.sink.play_focus_end();
                        self.settle_pending();
                        self.pending = Some(completed.clone());
                        events.push(AppEvent::VerdictRequested(completed));
                    }
                    Phase::Rest => {
                        self.sink.play_rest_end();
                        events.push(AppEvent::RestFinished);
                    }
                },
            }
        }
        events
    }

    /// Answer the success question for the last focus phase.
    /// Returns the new session count, or `None` if nothing was pending.
    pub fn resolve_verdict(&mut self, outcome: Outcome) -> Option<u64> {
        let completed = self.pending.take()?;
        Some(self.record(&completed, outcome, completed.elapsed_minutes()))
    }

    /// A pending answer that gets overtaken is logged as unspecified
    fn settle_pending(&mut self) {
        if self.pending.is_some() {
            self.resolve_verdict(Outcome::Unspecified);
        }
    }

    fn record(&mut self, completed: &CompletedPhase, outcome: Outcome, actual: u32) -> u64 {
        let planned = Some(completed.planned_minutes());
        let record = SessionRecord::new(completed.description.clone(), outcome)
            .with_minutes(planned, Some(actual));
        let count = self.log.append(&record);

        if self.notes.is_enabled() {
            self.notes
                .record_session(&completed.description, outcome, planned, Some(actual));
        }
        count
    }

    pub fn open_daily_note(&mut self) -> bool {
        let opened = self.notes.open_daily_note();
        if opened {
            self.log_event("Opened daily note");
        }
        opened
    }

    pub fn open_weekly_note(&mut self) -> bool {
        let opened = self.notes.open_weekly_note();
        if opened {
            self.log_event("Opened weekly note");
        }
        opened
    }

    fn log_event(&self, message: &str) {
        if let Err(e) = self.log.log_event(message) {
            error!("Error logging event: {}", e);
        }
    }

    /// Apply a settings change and rewire whatever depends on it
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        let notes_before = self.config.obsidian().clone();
        update.apply_to(&mut self.config)?;

        self.timer
            .set_durations(self.config.focus_period(), self.config.rest_period());
        self.sink.reconfigure(self.config.config());

        if *self.config.obsidian() != notes_before {
            info!("Notes settings changed, rebuilding notes integration");
            self.notes = Notes::new(self.config.obsidian().clone(), Rc::clone(&self.opener));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerStatus;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Cues {
        focus_end: u32,
        rest_end: u32,
        reconfigured: u32,
    }

    struct CountingSink(Rc<RefCell<Cues>>);

    impl NotificationSink for CountingSink {
        fn play_focus_end(&self) {
            self.0.borrow_mut().focus_end += 1;
        }

        fn play_rest_end(&self) {
            self.0.borrow_mut().rest_end += 1;
        }

        fn reconfigure(&mut self, _config: &crate::config::Config) {
            self.0.borrow_mut().reconfigured += 1;
        }
    }

    #[derive(Default)]
    struct RecordingOpener(RefCell<Vec<String>>);

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> Result<()> {
            self.0.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    struct Fixture {
        app: App,
        cues: Rc<RefCell<Cues>>,
        opener: Rc<RecordingOpener>,
        _tmp: TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let mut config = ConfigStore::load(&tmp.path().join("config.json"));
        config.set_obsidian_enabled(false);
        let log = SessionLog::open(&tmp.path().join("sessions.log"));
        let cues = Rc::new(RefCell::new(Cues::default()));
        let opener = Rc::new(RecordingOpener::default());

        let app = App::new(
            config,
            log,
            Box::new(CountingSink(Rc::clone(&cues))),
            opener.clone(),
        );
        Fixture {
            app,
            cues,
            opener,
            _tmp: tmp,
        }
    }

    fn run_ticks(app: &mut App, n: usize) -> Vec<AppEvent> {
        (0..n)
            .flat_map(|_| app.tick())
            .filter(|e| !matches!(e, AppEvent::Display(_)))
            .collect()
    }

    #[test]
    fn test_focus_cycle_records_success() {
        let mut f = fixture();
        f.app.start_focus("write report", None, None);
        assert_eq!(f.app.timer().remaining_secs(), 1500);

        let events = run_ticks(&mut f.app, 1500);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AppEvent::VerdictRequested(c) if c.description == "write report"));
        assert_eq!(f.cues.borrow().focus_end, 1);
        assert_eq!(f.app.timer().status(), TimerStatus::RunningRest);
        assert_eq!(f.app.timer().remaining_secs(), 300);

        assert_eq!(f.app.resolve_verdict(Outcome::Success), Some(1));
        assert_eq!(f.app.log().count(), 1);
        assert!(f.app.resolve_verdict(Outcome::Success).is_none());

        let sessions = f.app.log().sessions().unwrap();
        assert_eq!(sessions[0].outcome, Outcome::Success);
        assert_eq!(sessions[0].planned_minutes, Some(25));
        assert_eq!(sessions[0].actual_minutes, Some(25));
    }

    #[test]
    fn test_rest_end_goes_idle() {
        let mut f = fixture();
        f.app.start_rest();
        let events = run_ticks(&mut f.app, 300);
        assert_eq!(events, vec![AppEvent::RestFinished]);
        assert_eq!(f.cues.borrow().rest_end, 1);
        assert_eq!(f.app.timer().status(), TimerStatus::Idle);
        assert_eq!(f.app.log().count(), 0);
    }

    #[test]
    fn test_start_focus_overrides_are_persisted_once() {
        let mut f = fixture();
        let writes = f.app.config().writes();
        f.app.start_focus("deep", Some(50), Some(10));

        assert_eq!(f.app.config().writes(), writes + 1);
        assert_eq!(f.app.config().focus_period(), 50);
        assert_eq!(f.app.config().rest_period(), 10);
        assert_eq!(f.app.timer().remaining_secs(), 3000);

        let reloaded = ConfigStore::load(f.app.config().path());
        assert_eq!(reloaded.focus_period(), 50);
    }

    #[test]
    fn test_stop_early_logs_early_stop() {
        let mut f = fixture();
        f.app.start_focus("reading", None, None);
        run_ticks(&mut f.app, 600);

        assert_eq!(f.app.stop_early(), Some(1));
        let session = &f.app.log().sessions().unwrap()[0];
        assert_eq!(session.outcome, Outcome::EarlyStop);
        assert_eq!(session.actual_minutes, Some(10));
        assert_eq!(f.app.timer().status(), TimerStatus::Idle);
        assert!(f.app.stop_early().is_none());
    }

    #[test]
    fn test_unanswered_verdict_is_settled_by_next_focus() {
        let mut f = fixture();
        f.app.start_focus("first", Some(1), None);
        run_ticks(&mut f.app, 60);
        assert!(f.app.pending_verdict().is_some());

        f.app.start_focus("second", None, None);
        assert!(f.app.pending_verdict().is_none());
        assert_eq!(f.app.log().count(), 1);
        assert_eq!(f.app.log().sessions().unwrap()[0].outcome, Outcome::Unspecified);
    }

    #[test]
    fn test_settings_change_rebuilds_notes() {
        let mut f = fixture();
        assert!(!f.app.open_daily_note());
        assert!(f.opener.0.borrow().is_empty());

        let update = SettingsUpdate {
            notes_enabled: Some(true),
            vault_name: Some("work".to_string()),
            rest_minutes: Some(15),
            ..Default::default()
        };
        f.app.apply_settings(&update).unwrap();
        assert_eq!(f.cues.borrow().reconfigured, 1);
        assert!(f.app.notes().is_enabled());

        assert!(f.app.open_daily_note());
        assert!(f.opener.0.borrow()[0].starts_with("obsidian://open?vault=work&file="));

        // Opening a note leaves a non-counting event line
        assert_eq!(f.app.log().count(), 0);
        let content = std::fs::read_to_string(f.app.log().path()).unwrap();
        assert!(content.contains("Opened daily note"));

        f.app.start_rest();
        assert_eq!(f.app.timer().remaining_secs(), 900);
    }

    #[test]
    fn test_invalid_settings_rejected_without_writing() {
        let mut f = fixture();
        let writes = f.app.config().writes();
        let update = SettingsUpdate {
            focus_minutes: Some(0),
            ..Default::default()
        };
        assert!(matches!(f.app.apply_settings(&update), Err(Error::InvalidDuration(0))));
        assert_eq!(f.app.config().writes(), writes);
        assert!(!f.app.config().in_batch());
    }

    #[test]
    fn test_idle_timer_follows_new_durations() {
        let mut f = fixture();
        let update = SettingsUpdate {
            focus_minutes: Some(30),
            ..Default::default()
        };
        f.app.apply_settings(&update).unwrap();
        assert_eq!(f.app.timer().remaining_secs(), 1800);
        assert!(!update.is_empty());
        assert!(SettingsUpdate::default().is_empty());
    }
}
