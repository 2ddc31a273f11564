use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Near-silent 8 kHz mono WAV fragment played once to satisfy autoplay gating.
const SILENT_WAV_BASE64: &str = "UklGRnoGAABXQVZFZm10IBAAAAABAAEAQB8AAEAfAAABAAgAZGF0YQoGAACBhYqFbF1fdJivrJBhNjVgodDbq2EcBj+a2/LDciUFLIHO8tiJNwgZaLvt559NEAxQp+PwtmMcBjiR1/LMeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmweAzmB0fO9AJU=";

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("unlock clip is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("unlock clip is not a RIFF/WAVE payload")]
    NotWave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentClip {
    bytes: Vec<u8>,
}

impl SilentClip {
    pub fn embedded() -> Result<Self, AudioError> {
        let bytes = STANDARD.decode(SILENT_WAV_BASE64)?;
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(AudioError::NotWave);
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_uri(&self) -> String {
        format!("data:audio/wav;base64,{}", STANDARD.encode(&self.bytes))
    }
}

/// One-shot audio unlock bookkeeping. `unlocked` never reverts once set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AudioUnlockState {
    attempted: bool,
    unlocked: bool,
}

impl AudioUnlockState {
    /// Returns true exactly once: on the first user gesture.
    pub fn begin_attempt(&mut self) -> bool {
        if self.attempted || self.unlocked {
            return false;
        }
        self.attempted = true;
        true
    }

    pub fn record_success(&mut self) -> bool {
        let changed = !self.unlocked;
        self.unlocked = true;
        changed
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn was_attempted(&self) -> bool {
        self.attempted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackEvent {
    Play,
    Pause,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StopButtonDisplay {
    InlineFlex,
    #[default]
    Hidden,
}

impl StopButtonDisplay {
    pub fn css_value(self) -> &'static str {
        match self {
            Self::InlineFlex => "inline-flex",
            Self::Hidden => "none",
        }
    }
}

pub trait StopButton: Send {
    fn set_display(&mut self, display: StopButtonDisplay);
}

/// Keeps the TTS stop button visible only while the audio element is playing.
pub struct PlaybackController {
    stop_button: Option<Box<dyn StopButton>>,
    mounted: bool,
    display: StopButtonDisplay,
}

impl PlaybackController {
    pub fn new(stop_button: Option<Box<dyn StopButton>>) -> Self {
        Self {
            stop_button,
            mounted: false,
            display: StopButtonDisplay::Hidden,
        }
    }

    pub fn mount(&mut self) {
        self.mounted = true;
        info!(stop_button = self.stop_button.is_some(), "playback controller mounted");
    }

    pub fn destroy(&mut self) {
        self.mounted = false;
        info!("playback controller destroyed");
    }

    pub fn handle(&mut self, event: PlaybackEvent) -> Option<StopButtonDisplay> {
        if !self.mounted {
            return None;
        }
        let next = match event {
            PlaybackEvent::Play => StopButtonDisplay::InlineFlex,
            PlaybackEvent::Pause | PlaybackEvent::Ended => StopButtonDisplay::Hidden,
        };
        debug!(?event, css = next.css_value(), "playback event");
        let button = self.stop_button.as_mut()?;
        button.set_display(next);
        self.display = next;
        Some(next)
    }

    pub fn display(&self) -> StopButtonDisplay {
        self.display
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStopButton {
    history: Arc<Mutex<Vec<StopButtonDisplay>>>,
}

impl RecordingStopButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<StopButtonDisplay> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl StopButton for RecordingStopButton {
    fn set_display(&mut self, display: StopButtonDisplay) {
        if let Ok(mut history) = self.history.lock() {
            history.push(display);
        }
    }
}
