//! Completion sounds
//!
//! Audio plays on a dedicated thread that owns the output stream. The rest
//! of the program talks to it over a channel, so a slow or missing audio
//! device never holds up the timer.
//!
//! Playback is fire-and-forget. A missing file, an undecodable file or a
//! missing output device is logged and otherwise ignored.

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

use pomo_core::Paths;

use crate::config::{Config, SoundKind};
use crate::error::{Error, Result};

/// Receives phase-completion cues
pub trait NotificationSink {
    fn play_focus_end(&self);
    fn play_rest_end(&self);

    /// Pick up changed sound settings
    fn reconfigure(&mut self, _config: &Config) {}
}

/// A sound file and the volume to play it at
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub file: PathBuf,
    pub volume: f32,
}

impl Cue {
    fn from_config(config: &Config, paths: &Paths, kind: SoundKind) -> Self {
        let sound = config.sounds.get(kind);
        Self {
            file: paths.resolve(&sound.file),
            volume: sound.volume as f32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SoundCommand {
    Play(SoundKind),
    /// Replace both cues at runtime
    UpdateConfig { focus_end: Cue, rest_end: Cue },
}

/// Plays the configured focus-end and rest-end sounds
#[derive(Debug)]
pub struct SoundPlayer {
    sender: mpsc::Sender<SoundCommand>,
    paths: Paths,
    focus_end: Cue,
    rest_end: Cue,
}

impl SoundPlayer {
    /// Start the audio thread and hand it the current cues
    pub fn new(config: &Config, paths: &Paths) -> Self {
        let (tx, rx) = mpsc::channel();
        let player = Self::with_sender(tx, config, paths);

        let mut focus_end = player.focus_end.clone();
        let mut rest_end = player.rest_end.clone();
        std::thread::spawn(move || {
            let Ok((_stream, handle)) = OutputStream::try_default() else {
                error!("Failed to create audio output stream for sounds");
                return;
            };
            info!("Sound player initialized");

            for command in rx {
                match command {
                    SoundCommand::UpdateConfig {
                        focus_end: focus,
                        rest_end: rest,
                    } => {
                        focus_end = focus;
                        rest_end = rest;
                        debug!("Sound config updated");
                    }
                    SoundCommand::Play(kind) => {
                        let cue = match kind {
                            SoundKind::FocusEnd => &focus_end,
                            SoundKind::RestEnd => &rest_end,
                        };
                        if let Err(e) = play_cue(&handle, cue) {
                            warn!("Error playing {} sound: {}", kind.as_str(), e);
                        }
                    }
                }
            }
        });

        player
    }

    fn with_sender(sender: mpsc::Sender<SoundCommand>, config: &Config, paths: &Paths) -> Self {
        Self {
            sender,
            paths: paths.clone(),
            focus_end: Cue::from_config(config, paths, SoundKind::FocusEnd),
            rest_end: Cue::from_config(config, paths, SoundKind::RestEnd),
        }
    }

    /// Resolved sound file and volume for a cue
    pub fn cue(&self, kind: SoundKind) -> &Cue {
        match kind {
            SoundKind::FocusEnd => &self.focus_end,
            SoundKind::RestEnd => &self.rest_end,
        }
    }

    /// Queue one cue, reporting why it could not be queued
    pub fn play(&self, kind: SoundKind) -> Result<()> {
        let cue = self.cue(kind);
        if !cue.file.exists() {
            return Err(Error::Integration(format!(
                "sound file not found: {}",
                cue.file.display()
            )));
        }
        self.sender
            .send(SoundCommand::Play(kind))
            .map_err(|_| Error::Integration("audio thread is not running".to_string()))?;
        debug!("Playing sound: {} at volume: {}", cue.file.display(), cue.volume);
        Ok(())
    }

    fn play_logged(&self, kind: SoundKind) {
        if let Err(e) = self.play(kind) {
            warn!("Error playing {} sound: {}", kind.as_str(), e);
        }
    }
}

impl NotificationSink for SoundPlayer {
    fn play_focus_end(&self) {
        self.play_logged(SoundKind::FocusEnd);
    }

    fn play_rest_end(&self) {
        self.play_logged(SoundKind::RestEnd);
    }

    fn reconfigure(&mut self, config: &Config) {
        self.focus_end = Cue::from_config(config, &self.paths, SoundKind::FocusEnd);
        self.rest_end = Cue::from_config(config, &self.paths, SoundKind::RestEnd);
        let update = SoundCommand::UpdateConfig {
            focus_end: self.focus_end.clone(),
            rest_end: self.rest_end.clone(),
        };
        if self.sender.send(update).is_err() {
            debug!("Audio thread is not running, sound config kept locally");
        }
    }
}

/// Open and decode a sound file
fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Integration(format!("failed to decode {}: {}", path.display(), e)))
}

fn play_cue(handle: &OutputStreamHandle, cue: &Cue) -> Result<()> {
    let source = decode(&cue.file)?;
    let sink = Sink::try_new(handle)
        .map_err(|e| Error::Integration(format!("failed to open audio sink: {}", e)))?;
    sink.set_volume(cue.volume);
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
