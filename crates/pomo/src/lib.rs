//! pomo - Focus/rest interval timer
//!
//! Alternates focus and rest periods, logs every finished focus session to
//! a plain-text log, and optionally mirrors sessions into an Obsidian vault.
//!
//! Layers:
//! - `config`: typed settings persisted as JSON, with batch writes
//! - `timer`: the Idle / Running / Paused state machine, driven by `tick`
//! - `session` and `stats`: the append-only session log and what is derived from it
//! - `sound`, `opener`, `notes`: best-effort integrations with the desktop
//! - `app`: the controller a front end drives

pub mod app;
pub mod config;
pub mod error;
pub mod notes;
pub mod opener;
pub mod session;
pub mod sound;
pub mod stats;
pub mod timer;

pub use app::{App, AppEvent, SettingsUpdate};
pub use config::{Config, ConfigStore};
pub use error::{Error, Result};
pub use session::{Outcome, SessionLog, SessionRecord};
pub use timer::{Phase, Timer, TimerStatus};
