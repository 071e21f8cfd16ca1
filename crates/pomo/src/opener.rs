//! Opening external URLs
//!
//! The notes integration only needs "hand this URL to the desktop". Each
//! platform has its own launcher; they are tried in order until one starts.

use std::process::{Command, Stdio};
use tracing::debug;

use pomo_core::process;

use crate::error::{Error, Result};

/// Capability to open an external URL
pub trait UrlOpener {
    fn open(&self, url: &str) -> Result<()>;
}

/// Platform URL launchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBackend {
    /// macOS `open`
    Open,
    /// freedesktop `xdg-open`
    XdgOpen,
    /// WSL `wslview`
    WslView,
    /// Windows `cmd /C start`
    CmdStart,
}

impl OpenBackend {
    /// Candidate launchers for the current platform, best first
    pub fn chain() -> Vec<Self> {
        if cfg!(target_os = "macos") {
            vec![Self::Open]
        } else if cfg!(target_os = "windows") {
            vec![Self::CmdStart]
        } else if process::is_wsl() {
            vec![Self::WslView, Self::XdgOpen]
        } else {
            vec![Self::XdgOpen]
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::XdgOpen => "xdg-open",
            Self::WslView => "wslview",
            Self::CmdStart => "cmd",
        }
    }

    pub fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(self.name());
        match self {
            // The empty argument is the window title `start` expects first
            Self::CmdStart => cmd.args(["/C", "start", "", url]),
            _ => cmd.arg(url),
        };
        cmd
    }

    /// Spawn the launcher detached from our terminal
    pub fn launch(&self, url: &str) -> Result<()> {
        let mut child = self
            .command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Integration(format!("{} failed to start: {}", self.name(), e)))?;

        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Opens URLs with the first launcher that starts
#[derive(Debug, Clone)]
pub struct SystemOpener {
    chain: Vec<OpenBackend>,
}

impl Default for SystemOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemOpener {
    pub fn new() -> Self {
        Self {
            chain: OpenBackend::chain(),
        }
    }

    pub fn with_chain(chain: Vec<OpenBackend>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &[OpenBackend] {
        &self.chain
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let mut failures = Vec::new();
        for backend in &self.chain {
            match backend.launch(url) {
                Ok(()) => {
                    debug!("Opened {} with {}", url, backend.name());
                    return Ok(());
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            return Err(Error::Integration("no URL launcher available".to_string()));
        }
        Err(Error::Integration(failures.join("; ")))
    }
}

/// Percent-encode a URL component. Unreserved characters and `/` pass
/// through unchanged.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_component() {
        assert_eq!(
            encode_component("Personal/Notes/Daily Notes/2026-10-19"),
            "Personal/Notes/Daily%20Notes/2026-10-19"
        );
        assert_eq!(encode_component("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode_component("café"), "caf%C3%A9");
    }

    #[test]
    fn test_cmd_start_arguments() {
        let cmd = OpenBackend::CmdStart.command("obsidian://open?vault=x");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/C", "start", "", "obsidian://open?vault=x"]);
        assert_eq!(cmd.get_program(), "cmd");
    }

    #[test]
    fn test_empty_chain_fails_cleanly() {
        let opener = SystemOpener::with_chain(Vec::new());
        assert!(matches!(opener.open("obsidian://x"), Err(Error::Integration(_))));
    }

    #[test]
    fn test_platform_chain_not_empty() {
        assert!(!OpenBackend::chain().is_empty());
    }
}
