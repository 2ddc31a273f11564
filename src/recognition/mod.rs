use crate::settings::VoiceInputSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Listening,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub continuous: bool,
    pub interim_results: bool,
    pub locale: String,
}

/// Sessions are single-shot: one final result, then `onend`.
impl From<&VoiceInputSettings> for RecognitionConfig {
    fn from(settings: &VoiceInputSettings) -> Self {
        Self {
            continuous: false,
            interim_results: false,
            locale: settings.locale.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionAlternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

impl RecognitionAlternative {
    pub fn new(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }
}

/// Result list of one `onresult` callback; each entry holds ranked alternatives.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RecognitionResults(pub Vec<Vec<RecognitionAlternative>>);

impl RecognitionResults {
    pub fn single(transcript: impl Into<String>) -> Self {
        Self(vec![vec![RecognitionAlternative::new(transcript, 1.0)]])
    }

    /// Top alternative of the first result.
    pub fn top_transcript(&self) -> Option<&str> {
        self.0
            .first()
            .and_then(|alternatives| alternatives.first())
            .map(|alternative| alternative.transcript.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    NotAllowed,
    ServiceNotAllowed,
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    LanguageNotSupported,
    BadGrammar,
    #[serde(untagged)]
    Other(String),
}

impl RecognitionErrorKind {
    pub fn from_host_code(code: &str) -> Self {
        match code {
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "language-not-supported" => Self::LanguageNotSupported,
            "bad-grammar" => Self::BadGrammar,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_permission_refusal(&self) -> bool {
        matches!(self, Self::NotAllowed)
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::LanguageNotSupported => "language-not-supported",
            Self::BadGrammar => "bad-grammar",
            Self::Other(code) => code.as_str(),
        };
        f.write_str(code)
    }
}
