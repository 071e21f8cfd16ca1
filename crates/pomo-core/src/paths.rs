//! Standard paths used by pomo

use std::path::{Path, PathBuf};

/// Application directory name under the platform data/config roots
pub const APP_DIR: &str = "pomo";

/// Standard pomo paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory (~/.local/share/pomo)
    pub data: PathBuf,
    /// Config directory (~/.config/pomo)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join(APP_DIR);

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR);

        Self { data, config }
    }

    /// Build paths rooted at a single directory (tests, portable installs)
    pub fn rooted(root: &Path) -> Self {
        Self {
            data: root.join("data"),
            config: root.join("config"),
        }
    }

    /// Configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Append-only session log
    pub fn session_log(&self) -> PathBuf {
        self.data.join("pomodoro_sessions.log")
    }

    /// Directory holding user sound files
    pub fn sounds(&self) -> PathBuf {
        self.data.join("sounds")
    }

    /// Resolve a possibly relative resource path against the data directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            self.data.join(candidate)
        }
    }
}
