use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const MIN_NOTICE_DISMISS_MS: u64 = 1_000;
const MAX_NOTICE_DISMISS_MS: u64 = 60_000;
const MAX_PROGRESS_DELAY_MS: u64 = 5_000;
const MIN_TICK_INTERVAL_MS: u64 = 10;
const MAX_TICK_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressSettings {
    pub show_delay_ms: u64,
    pub bar_color: String,
    pub shadow_color: String,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            show_delay_ms: 300,
            bar_color: "#29d".to_string(),
            shadow_color: "rgba(0, 0, 0, .3)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct VoiceInputSettings {
    pub locale: String,
    pub toggle_hotkey: String,
    pub permission_name: String,
    pub notice_dismiss_ms: u64,
    pub loopback_hosts: Vec<String>,
    pub sanitize_transcripts: bool,
    pub tick_interval_ms: u64,
    pub progress: ProgressSettings,
}

impl Default for VoiceInputSettings {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            toggle_hotkey: "Meta+Shift+M".to_string(),
            permission_name: "microphone".to_string(),
            notice_dismiss_ms: 5_000,
            loopback_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            sanitize_transcripts: false,
            tick_interval_ms: 50,
            progress: ProgressSettings::default(),
        }
    }
}

impl VoiceInputSettings {
    /// Pulls timing values back into their supported ranges.
    pub fn clamped(mut self) -> Self {
        self.notice_dismiss_ms = self
            .notice_dismiss_ms
            .clamp(MIN_NOTICE_DISMISS_MS, MAX_NOTICE_DISMISS_MS);
        self.progress.show_delay_ms = self.progress.show_delay_ms.min(MAX_PROGRESS_DELAY_MS);
        self.tick_interval_ms = self
            .tick_interval_ms
            .clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        if self.locale.trim().is_empty() {
            self.locale = Self::default().locale;
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Read(std::io::Error),
    #[error("failed to write settings file: {0}")]
    Write(std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Parse(serde_json::Error),
    #[error("cannot resolve app config directory")]
    AppData,
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self, SettingsError> {
        let proj_dirs =
            ProjectDirs::from("com", "speechhook", "core").ok_or(SettingsError::AppData)?;
        let path = proj_dirs.config_dir().join("voice-input.json");
        Ok(Self { path })
    }

    /// Store at `path` when one is given, otherwise at the per-user config location.
    pub fn at_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Ok(Self::from_path(path)),
            None => Self::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<VoiceInputSettings, SettingsError> {
        if !self.path.exists() {
            return Ok(VoiceInputSettings::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(SettingsError::Read)?;
        let settings: VoiceInputSettings =
            serde_json::from_str(&raw).map_err(SettingsError::Parse)?;
        Ok(settings.clamped())
    }

    pub fn save(&self, settings: &VoiceInputSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Write)?;
        }
        let raw = serde_json::to_string_pretty(settings).map_err(SettingsError::Parse)?;
        fs::write(&self.path, raw).map_err(SettingsError::Write)?;
        Ok(())
    }
}
