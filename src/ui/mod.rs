use crate::recognition::SessionState;
use serde::{Deserialize, Serialize};

pub const LISTENING_PLACEHOLDER: &str = "Listening... speak now!";
pub const IDLE_PLACEHOLDER: &str = "Type your message...";
pub const LISTENING_TOOLTIP: &str = "Click to stop listening";

pub const DISABLED_CLASSES: &[&str] = &["btn-disabled", "opacity-50"];
const ACTIVE_CLASSES: &[&str] = &["btn-error", "animate-pulse"];
const IDLE_CLASSES: &[&str] = &["btn-ghost"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TriggerIcon {
    #[default]
    Microphone,
    RecordingDot,
}

impl TriggerIcon {
    pub fn markup(self) -> &'static str {
        match self {
            Self::RecordingDot => {
                r#"<svg class="w-4 h-4" fill="currentColor" viewBox="0 0 20 20"><circle cx="10" cy="10" r="8"/></svg>"#
            }
            Self::Microphone => {
                r#"<svg class="w-4 h-4" fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M19 11a7 7 0 01-7 7m0 0a7 7 0 01-7-7m7 7v4m0 0H8m4 0h4m-4-8a3 3 0 01-3-3V5a3 3 0 116 0v6a3 3 0 01-3 3z"></path></svg>"#
            }
        }
    }
}

/// Everything the trigger and bound field show for one session state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiFrame {
    pub placeholder: &'static str,
    pub add_classes: &'static [&'static str],
    pub remove_classes: &'static [&'static str],
    pub icon: TriggerIcon,
    pub tooltip: String,
}

pub fn render_session_ui(state: SessionState, shortcut_label: &str) -> UiFrame {
    match state {
        SessionState::Listening => UiFrame {
            placeholder: LISTENING_PLACEHOLDER,
            add_classes: ACTIVE_CLASSES,
            remove_classes: IDLE_CLASSES,
            icon: TriggerIcon::RecordingDot,
            tooltip: LISTENING_TOOLTIP.to_string(),
        },
        SessionState::Idle => UiFrame {
            placeholder: IDLE_PLACEHOLDER,
            add_classes: IDLE_CLASSES,
            remove_classes: ACTIVE_CLASSES,
            icon: TriggerIcon::Microphone,
            tooltip: idle_tooltip(shortcut_label),
        },
    }
}

pub fn idle_tooltip(shortcut_label: &str) -> String {
    format!("Click to speak (or {shortcut_label})")
}
