//! Countdown state machine
//!
//! A headless focus/rest countdown. The machine never reads the clock:
//! whoever owns it calls [`Timer::tick`] once per second and reacts to the
//! returned events. Focus completion rolls straight into a running rest;
//! rest completion parks the timer back in `Idle` with the focus duration
//! loaded.

use serde::{Deserialize, Serialize};

/// Current interval kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Rest,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::Rest => "rest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    RunningFocus,
    PausedFocus,
    RunningRest,
    PausedRest,
}

impl TimerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::RunningFocus => "focus",
            TimerStatus::PausedFocus => "focus (paused)",
            TimerStatus::RunningRest => "rest",
            TimerStatus::PausedRest => "rest (paused)",
        }
    }
}

/// Snapshot of a phase that just ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPhase {
    pub phase: Phase,
    pub description: String,
    pub planned_secs: u64,
    pub elapsed_secs: u64,
}

impl CompletedPhase {
    pub fn planned_minutes(&self) -> u32 {
        (self.planned_secs / 60) as u32
    }

    pub fn elapsed_minutes(&self) -> u32 {
        (self.elapsed_secs / 60) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Remaining seconds after a decrement
    DisplayUpdate(u64),
    PhaseCompleted(CompletedPhase),
}

/// The countdown engine
#[derive(Debug, Clone)]
pub struct Timer {
    phase: Phase,
    remaining_secs: u64,
    running: bool,
    /// False while idle (never started, reset, or after a rest ended)
    started: bool,
    description: String,
    planned_focus_secs: u64,
    planned_rest_secs: u64,
    configured_focus_secs: u64,
    configured_rest_secs: u64,
}

fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes.max(1)) * 60
}

impl Timer {
    /// Create an idle timer loaded with the focus duration
    pub fn new(focus_minutes: u32, rest_minutes: u32) -> Self {
        let focus = minutes_to_secs(focus_minutes);
        let rest = minutes_to_secs(rest_minutes);
        Self {
            phase: Phase::Focus,
            remaining_secs: focus,
            running: false,
            started: false,
            description: String::new(),
            planned_focus_secs: focus,
            planned_rest_secs: rest,
            configured_focus_secs: focus,
            configured_rest_secs: rest,
        }
    }

    /// Begin a focus phase from any state.
    ///
    /// Supplied minutes override the configured durations for this cycle;
    /// zero is treated as "not supplied".
    pub fn start_focus(
        &mut self,
        description: &str,
        focus_minutes: Option<u32>,
        rest_minutes: Option<u32>,
    ) {
        self.planned_focus_secs = focus_minutes
            .filter(|m| *m > 0)
            .map(minutes_to_secs)
            .unwrap_or(self.configured_focus_secs);
        self.planned_rest_secs = rest_minutes
            .filter(|m| *m > 0)
            .map(minutes_to_secs)
            .unwrap_or(self.configured_rest_secs);

        self.phase = Phase::Focus;
        self.remaining_secs = self.planned_focus_secs;
        self.description = description.trim().to_string();
        self.running = true;
        self.started = true;
    }

    /// Begin a rest phase from any state
    pub fn start_rest(&mut self) {
        self.phase = Phase::Rest;
        self.remaining_secs = self.planned_rest_secs;
        self.description.clear();
        self.running = true;
        self.started = true;
    }

    /// Toggle between running and paused. From idle this starts the
    /// loaded phase.
    pub fn pause_resume(&mut self) {
        self.started = true;
        self.running = !self.running;
    }

    /// Advance by one second
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.running {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            events.push(TimerEvent::DisplayUpdate(self.remaining_secs));
        }
        if self.remaining_secs == 0 {
            events.push(TimerEvent::PhaseCompleted(self.complete_phase()));
        }
        events
    }

    fn complete_phase(&mut self) -> CompletedPhase {
        self.running = false;
        let completed = CompletedPhase {
            phase: self.phase,
            description: std::mem::take(&mut self.description),
            planned_secs: self.planned_secs(),
            elapsed_secs: self.planned_secs(),
        };

        match self.phase {
            Phase::Focus => self.start_rest(),
            Phase::Rest => self.go_idle(Phase::Focus),
        }

        completed
    }

    fn go_idle(&mut self, phase: Phase) {
        self.phase = phase;
        self.planned_focus_secs = self.configured_focus_secs;
        self.planned_rest_secs = self.configured_rest_secs;
        self.remaining_secs = self.configured_for(phase);
        self.running = false;
        self.started = false;
        self.description.clear();
    }

    /// Stop and reload the configured duration for the current phase
    pub fn reset(&mut self) {
        self.go_idle(self.phase);
    }

    /// End a focus phase before it runs out. Returns what was done so the
    /// caller can record an early stop; `None` outside a started focus.
    pub fn stop_early(&mut self) -> Option<CompletedPhase> {
        if !self.started || self.phase != Phase::Focus {
            return None;
        }

        let stopped = CompletedPhase {
            phase: Phase::Focus,
            description: self.description.clone(),
            planned_secs: self.planned_focus_secs,
            elapsed_secs: self.elapsed_secs(),
        };
        self.go_idle(Phase::Focus);
        Some(stopped)
    }

    /// Apply newly configured durations. An idle timer reloads its display.
    pub fn set_durations(&mut self, focus_minutes: u32, rest_minutes: u32) {
        self.configured_focus_secs = minutes_to_secs(focus_minutes);
        self.configured_rest_secs = minutes_to_secs(rest_minutes);
        if !self.started {
            self.go_idle(self.phase);
        }
    }

    fn configured_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.configured_focus_secs,
            Phase::Rest => self.configured_rest_secs,
        }
    }

    fn planned_secs(&self) -> u64 {
        match self.phase {
            Phase::Focus => self.planned_focus_secs,
            Phase::Rest => self.planned_rest_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn planned_focus_secs(&self) -> u64 {
        self.planned_focus_secs
    }

    pub fn planned_rest_secs(&self) -> u64 {
        self.planned_rest_secs
    }

    pub fn status(&self) -> TimerStatus {
        match (self.started, self.phase, self.running) {
            (false, _, _) => TimerStatus::Idle,
            (true, Phase::Focus, true) => TimerStatus::RunningFocus,
            (true, Phase::Focus, false) => TimerStatus::PausedFocus,
            (true, Phase::Rest, true) => TimerStatus::RunningRest,
            (true, Phase::Rest, false) => TimerStatus::PausedRest,
        }
    }

    /// Seconds spent in the current phase
    pub fn elapsed_secs(&self) -> u64 {
        self.planned_secs().saturating_sub(self.remaining_secs)
    }

    /// Progress through the current phase (0-100)
    pub fn progress_percent(&self) -> u32 {
        let planned = self.planned_secs();
        if planned == 0 {
            return 100;
        }
        ((self.elapsed_secs() * 100) / planned).min(100) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completions(events: &[TimerEvent]) -> Vec<&CompletedPhase> {
        events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::PhaseCompleted(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let timer = Timer::new(25, 5);
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_secs(), 1500);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let mut timer = Timer::new(25, 5);
        assert!(timer.tick().is_empty());
        assert_eq!(timer.remaining_secs(), 1500);
    }

    #[test]
    fn test_full_focus_cycle() {
        let mut timer = Timer::new(25, 5);
        timer.start_focus("write report", None, None);
        assert_eq!(timer.remaining_secs(), 1500);
        assert!(timer.is_running());
        assert_eq!(timer.description(), "write report");

        let mut completed = Vec::new();
        for _ in 0..1500 {
            for event in timer.tick() {
                if let TimerEvent::PhaseCompleted(c) = event {
                    completed.push(c);
                }
            }
        }

        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].phase, Phase::Focus);
        assert_eq!(completed[0].description, "write report");
        assert_eq!(completed[0].planned_minutes(), 25);
        assert_eq!(timer.phase(), Phase::Rest);
        assert_eq!(timer.remaining_secs(), 300);
        assert!(timer.is_running());
        assert_eq!(timer.description(), "");
    }

    #[test]
    fn test_zero_crossing_fires_once() {
        let mut timer = Timer::new(25, 5);
        timer.start_focus("", None, None);
        timer.remaining_secs = 0;

        let events = timer.tick();
        assert_eq!(completions(&events).len(), 1);
        assert_eq!(timer.phase(), Phase::Rest);

        let events = timer.tick();
        assert!(completions(&events).is_empty());
        assert_eq!(events, vec![TimerEvent::DisplayUpdate(299)]);
    }

    #[test]
    fn test_rest_completion_returns_to_idle() {
        let mut timer = Timer::new(25, 1);
        timer.start_rest();
        let mut fired = 0;
        for _ in 0..120 {
            fired += completions(&timer.tick()).len();
        }
        assert_eq!(fired, 1);
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_secs(), 1500);
    }

    #[test]
    fn test_pause_resume() {
        let mut timer = Timer::new(25, 5);
        timer.start_focus("task", None, None);
        timer.tick();
        timer.pause_resume();
        assert_eq!(timer.status(), TimerStatus::PausedFocus);

        assert!(timer.tick().is_empty());
        assert_eq!(timer.remaining_secs(), 1499);

        timer.pause_resume();
        assert_eq!(timer.status(), TimerStatus::RunningFocus);
        assert_eq!(timer.tick(), vec![TimerEvent::DisplayUpdate(1498)]);
    }

    #[test]
    fn test_pause_from_idle_starts_focus() {
        let mut timer = Timer::new(25, 5);
        timer.pause_resume();
        assert_eq!(timer.status(), TimerStatus::RunningFocus);
    }

    #[test]
    fn test_overrides_apply_to_cycle() {
        let mut timer = Timer::new(25, 5);
        timer.start_focus("deep", Some(50), Some(10));
        assert_eq!(timer.remaining_secs(), 3000);
        assert_eq!(timer.planned_rest_secs(), 600);

        timer.start_rest();
        assert_eq!(timer.remaining_secs(), 600);

        // Configured values come back once the cycle is over
        timer.reset();
        assert_eq!(timer.remaining_secs(), 300);
        timer.start_focus("next", None, Some(0));
        assert_eq!(timer.remaining_secs(), 1500);
        assert_eq!(timer.planned_rest_secs(), 300);
    }

    #[test]
    fn test_reset_keeps_phase() {
        let mut timer = Timer::new(25, 5);
        timer.start_rest();
        timer.tick();
        timer.reset();
        assert_eq!(timer.phase(), Phase::Rest);
        assert_eq!(timer.remaining_secs(), 300);
        assert!(!timer.is_running());
        assert_eq!(timer.status(), TimerStatus::Idle);
    }

    #[test]
    fn test_start_focus_from_any_state() {
        let mut timer = Timer::new(25, 5);
        timer.start_rest();
        timer.pause_resume();
        timer.start_focus("again", None, None);
        assert_eq!(timer.status(), TimerStatus::RunningFocus);
        assert_eq!(timer.remaining_secs(), 1500);
    }

    #[test]
    fn test_stop_early() {
        let mut timer = Timer::new(25, 5);
        assert!(timer.stop_early().is_none());

        timer.start_focus("refactor", None, None);
        for _ in 0..125 {
            timer.tick();
        }
        let stopped = timer.stop_early().unwrap();
        assert_eq!(stopped.elapsed_secs, 125);
        assert_eq!(stopped.elapsed_minutes(), 2);
        assert_eq!(stopped.description, "refactor");
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.remaining_secs(), 1500);

        timer.start_rest();
        assert!(timer.stop_early().is_none());
    }

    #[test]
    fn test_set_durations() {
        let mut timer = Timer::new(25, 5);
        timer.set_durations(30, 10);
        assert_eq!(timer.remaining_secs(), 1800);

        timer.start_focus("", None, None);
        timer.set_durations(45, 10);
        assert_eq!(timer.remaining_secs(), 1800);
        assert_eq!(timer.planned_focus_secs(), 1800);
    }

    #[test]
    fn test_progress() {
        let mut timer = Timer::new(1, 1);
        timer.start_focus("", None, None);
        for _ in 0..30 {
            timer.tick();
        }
        assert_eq!(timer.progress_percent(), 50);
        assert_eq!(timer.elapsed_secs(), 30);
    }
}
