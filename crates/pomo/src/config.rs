//! Configuration store
//!
//! The configuration is a typed record persisted as pretty JSON. Loading
//! never fails: a missing file is created from defaults, an unreadable or
//! corrupt one is logged and replaced in memory by defaults. Older files are
//! merged onto the defaults so every missing key is backfilled while present
//! values survive.
//!
//! Every setter persists immediately unless a batch is open; `end_batch`
//! flushes exactly once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Which completion sound a setting refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundKind {
    FocusEnd,
    RestEnd,
}

impl SoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundKind::FocusEnd => "focus_end",
            SoundKind::RestEnd => "rest_end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub focus_period_minutes: u32,
    pub rest_period_minutes: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_period_minutes: 25,
            rest_period_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    pub file: String,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sounds {
    pub focus_end: SoundSettings,
    pub rest_end: SoundSettings,
}

impl Default for Sounds {
    fn default() -> Self {
        Self {
            focus_end: SoundSettings {
                file: "sounds/focus_end.mp3".to_string(),
                volume: 0.5,
            },
            rest_end: SoundSettings {
                file: "sounds/rest_end.mp3".to_string(),
                volume: 0.8,
            },
        }
    }
}

impl Sounds {
    pub fn get(&self, kind: SoundKind) -> &SoundSettings {
        match kind {
            SoundKind::FocusEnd => &self.focus_end,
            SoundKind::RestEnd => &self.rest_end,
        }
    }

    fn get_mut(&mut self, kind: SoundKind) -> &mut SoundSettings {
        match kind {
            SoundKind::FocusEnd => &mut self.focus_end,
            SoundKind::RestEnd => &mut self.rest_end,
        }
    }
}

/// Obsidian notes integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidianSettings {
    pub enabled: bool,
    /// Vault identifier used in `obsidian://` URLs
    pub vault_name: String,
    /// Local vault root; when set, session entries are written directly
    pub vault_path: String,
    pub daily_notes_path: String,
    pub weekly_notes_path: String,
    pub sessions_notes_path: String,
}

impl Default for ObsidianSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            vault_name: "memory".to_string(),
            vault_path: String::new(),
            daily_notes_path: "Personal/Notes/Daily Notes".to_string(),
            weekly_notes_path: "Personal/Notes/Weekly Notes".to_string(),
            sessions_notes_path: "Personal/Notes/Pomodoro Sessions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    pub show_focus_text: bool,
    pub always_on_top: bool,
    pub start_position: Position,
    pub window_size: Size,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_focus_text: true,
            always_on_top: true,
            start_position: Position { x: 100, y: 100 },
            window_size: Size {
                width: 300,
                height: 300,
            },
        }
    }
}

/// The whole persisted configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub timer: TimerSettings,
    pub sounds: Sounds,
    pub obsidian: ObsidianSettings,
    pub ui: UiSettings,
}

impl Config {
    /// Parse a configuration document, backfilling anything missing from defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let user: Value = serde_json::from_str(content)?;
        let defaults = serde_json::to_value(Config::default())?;
        let merged = merge_with_defaults(defaults, user);
        let mut config: Config = serde_json::from_value(merged)?;
        config.normalize();
        Ok(config)
    }

    /// Enforce invariants a hand-edited file may violate
    fn normalize(&mut self) {
        let defaults = TimerSettings::default();
        if self.timer.focus_period_minutes == 0 {
            warn!("focus_period_minutes must be positive, using default");
            self.timer.focus_period_minutes = defaults.focus_period_minutes;
        }
        if self.timer.rest_period_minutes == 0 {
            warn!("rest_period_minutes must be positive, using default");
            self.timer.rest_period_minutes = defaults.rest_period_minutes;
        }
        self.sounds.focus_end.volume = clamp_volume(self.sounds.focus_end.volume);
        self.sounds.rest_end.volume = clamp_volume(self.sounds.rest_end.volume);
    }
}

/// Overlay `user` onto `defaults`. Objects merge key by key at every depth;
/// any other present value replaces the default as-is.
pub fn merge_with_defaults(defaults: Value, user: Value) -> Value {
    match (defaults, user) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(default) => merge_with_defaults(default, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, user) => user,
    }
}

/// Clamp a volume into [0, 1]; NaN becomes silence
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Configuration bound to its file, with batched persistence
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
    batch_mode: bool,
    writes: u64,
    /// Command-line durations; never written to disk
    focus_override: Option<u32>,
    rest_override: Option<u32>,
}

impl ConfigStore {
    /// Load configuration from `path`, falling back to defaults
    pub fn load(path: &Path) -> Self {
        let mut store = Self {
            path: path.to_path_buf(),
            config: Config::default(),
            batch_mode: false,
            writes: 0,
            focus_override: None,
            rest_override: None,
        };

        if path.exists() {
            match Self::read(path) {
                Ok(config) => store.config = config,
                Err(e) => error!("Error loading configuration: {}", e),
            }
        } else {
            match store.save() {
                Ok(()) => info!("Created default configuration file: {}", path.display()),
                Err(e) => error!("Error creating default configuration: {}", e),
            }
        }

        store
    }

    fn read(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Config::from_json(&content).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the whole configuration to disk. No-op while batching.
    pub fn save(&mut self) -> Result<()> {
        if self.batch_mode {
            return Ok(());
        }

        let content = serde_json::to_string_pretty(&self.config)?;
        let wrap = |source| Error::ConfigSave {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        fs::write(&self.path, content).map_err(wrap)?;

        self.writes += 1;
        debug!("Configuration saved to: {}", self.path.display());
        Ok(())
    }

    /// Save, logging instead of propagating failures
    fn persist(&mut self) {
        if let Err(e) = self.save() {
            error!("Error saving configuration: {}", e);
        }
    }

    /// Defer persistence until `end_batch`. A second call is a no-op.
    pub fn start_batch(&mut self) {
        if self.batch_mode {
            debug!("Configuration batch already open");
            return;
        }
        self.batch_mode = true;
    }

    /// Close the batch and save exactly once
    pub fn end_batch(&mut self) {
        self.batch_mode = false;
        self.persist();
    }

    pub fn in_batch(&self) -> bool {
        self.batch_mode
    }

    /// Number of successful writes made by this store
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Effective focus minutes, honouring a startup override
    pub fn focus_period(&self) -> u32 {
        self.focus_override
            .unwrap_or(self.config.timer.focus_period_minutes)
    }

    pub fn rest_period(&self) -> u32 {
        self.rest_override
            .unwrap_or(self.config.timer.rest_period_minutes)
    }

    pub fn sound(&self, kind: SoundKind) -> &SoundSettings {
        self.config.sounds.get(kind)
    }

    pub fn is_obsidian_enabled(&self) -> bool {
        self.config.obsidian.enabled
    }

    pub fn obsidian(&self) -> &ObsidianSettings {
        &self.config.obsidian
    }

    pub fn ui(&self) -> &UiSettings {
        &self.config.ui
    }

    pub fn set_focus_period(&mut self, minutes: u32) -> Result<()> {
        if minutes == 0 {
            return Err(Error::InvalidDuration(minutes));
        }
        self.config.timer.focus_period_minutes = minutes;
        self.focus_override = None;
        self.persist();
        Ok(())
    }

    pub fn set_rest_period(&mut self, minutes: u32) -> Result<()> {
        if minutes == 0 {
            return Err(Error::InvalidDuration(minutes));
        }
        self.config.timer.rest_period_minutes = minutes;
        self.rest_override = None;
        self.persist();
        Ok(())
    }

    /// Update a sound's file and/or volume; volume is clamped into [0, 1]
    pub fn set_sound_settings(&mut self, kind: SoundKind, file: Option<&str>, volume: Option<f64>) {
        let sound = self.config.sounds.get_mut(kind);
        if let Some(file) = file.filter(|f| !f.is_empty()) {
            sound.file = file.to_string();
        }
        if let Some(volume) = volume {
            sound.volume = clamp_volume(volume);
        }
        self.persist();
    }

    pub fn set_obsidian_enabled(&mut self, enabled: bool) {
        self.config.obsidian.enabled = enabled;
        self.persist();
    }

    /// Update notes settings. Empty strings leave the required fields
    /// untouched; an empty `vault_path` clears it.
    pub fn update_obsidian_settings(&mut self, update: ObsidianUpdate<'_>) {
        let obsidian = &mut self.config.obsidian;
        let required = [
            (update.vault_name, &mut obsidian.vault_name),
            (update.daily_notes_path, &mut obsidian.daily_notes_path),
            (update.weekly_notes_path, &mut obsidian.weekly_notes_path),
            (update.sessions_notes_path, &mut obsidian.sessions_notes_path),
        ];
        for (value, slot) in required {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                *slot = value.to_string();
            }
        }
        if let Some(vault_path) = update.vault_path {
            obsidian.vault_path = vault_path.trim().to_string();
        }
        self.persist();
    }

    pub fn set_ui_geometry(&mut self, position: Position, size: Size) {
        self.config.ui.start_position = position;
        self.config.ui.window_size = size;
        self.persist();
    }

    pub fn set_always_on_top(&mut self, always_on_top: bool) {
        self.config.ui.always_on_top = always_on_top;
        self.persist();
    }

    /// Startup overrides from the command line. Held in memory only; an
    /// explicit setter call replaces them.
    pub fn override_durations(&mut self, focus: Option<u32>, rest: Option<u32>) {
        if let Some(minutes) = focus.filter(|m| *m > 0) {
            self.focus_override = Some(minutes);
        }
        if let Some(minutes) = rest.filter(|m| *m > 0) {
            self.rest_override = Some(minutes);
        }
    }
}

/// Partial update of the notes settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ObsidianUpdate<'a> {
    pub vault_name: Option<&'a str>,
    pub vault_path: Option<&'a str>,
    pub daily_notes_path: Option<&'a str>,
    pub weekly_notes_path: Option<&'a str>,
    pub sessions_notes_path: Option<&'a str>,
}
