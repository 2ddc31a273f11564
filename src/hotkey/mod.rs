use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One keydown as reported by the host, using physical key codes (`KeyM`, `Digit4`, `F13`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyStroke {
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub code: String,
}

impl KeyStroke {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey cannot be empty")]
    EmptyBinding,
    #[error("hotkey has invalid token '{token}'")]
    InvalidToken { token: String },
    #[error("hotkey must include exactly one non-modifier key")]
    MissingMainKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
    code: String,
    key_label: String,
}

impl Default for HotkeyBinding {
    /// `Cmd+Shift+M`.
    fn default() -> Self {
        Self {
            ctrl: false,
            shift: true,
            alt: false,
            meta: true,
            code: "KeyM".to_string(),
            key_label: "M".to_string(),
        }
    }
}

impl HotkeyBinding {
    pub fn parse(combo: &str) -> Result<Self, HotkeyError> {
        let normalized = normalize_combo(combo)?;
        let mut binding = Self {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            code: String::new(),
            key_label: String::new(),
        };

        for token in normalized.split('+') {
            match token {
                "CTRL" => binding.ctrl = true,
                "SHIFT" => binding.shift = true,
                "ALT" => binding.alt = true,
                "META" => binding.meta = true,
                main => {
                    binding.code = key_code(main).ok_or_else(|| HotkeyError::InvalidToken {
                        token: main.to_string(),
                    })?;
                    binding.key_label = key_label(main);
                }
            }
        }

        if binding.code.is_empty() {
            return Err(HotkeyError::MissingMainKey);
        }
        Ok(binding)
    }

    /// Required modifiers must be held; extra modifiers do not block the match.
    pub fn matches(&self, stroke: &KeyStroke) -> bool {
        stroke.code == self.code
            && (!self.meta || stroke.meta)
            && (!self.ctrl || stroke.ctrl)
            && (!self.shift || stroke.shift)
            && (!self.alt || stroke.alt)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display form used in tooltips, e.g. `Cmd+Shift+M`.
    pub fn label(&self) -> String {
        let mut parts = Vec::with_capacity(5);
        if self.meta {
            parts.push("Cmd");
        }
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key_label.as_str());
        parts.join("+")
    }
}

fn normalize_combo(combo: &str) -> Result<String, HotkeyError> {
    if combo.trim().is_empty() {
        return Err(HotkeyError::EmptyBinding);
    }

    let modifier_aliases = [
        ("CTRL", "CTRL"),
        ("CONTROL", "CTRL"),
        ("SHIFT", "SHIFT"),
        ("ALT", "ALT"),
        ("OPTION", "ALT"),
        ("META", "META"),
        ("CMD", "META"),
        ("COMMAND", "META"),
        ("SUPER", "META"),
        ("WIN", "META"),
    ];

    let mut modifiers = HashSet::new();
    let mut main_keys = Vec::new();

    for raw in combo.split('+') {
        let token = raw.trim().to_uppercase();
        if token.is_empty() {
            return Err(HotkeyError::InvalidToken {
                token: raw.to_string(),
            });
        }

        if let Some((_, normalized)) = modifier_aliases.iter().find(|(alias, _)| *alias == token) {
            modifiers.insert(*normalized);
            continue;
        }

        if key_code(&token).is_some() {
            main_keys.push(token);
            continue;
        }

        return Err(HotkeyError::InvalidToken { token });
    }

    if main_keys.len() != 1 {
        return Err(HotkeyError::MissingMainKey);
    }

    let mut ordered_modifiers = modifiers.into_iter().collect::<Vec<_>>();
    ordered_modifiers.sort_unstable();
    ordered_modifiers.push(main_keys[0].as_str());
    Ok(ordered_modifiers.join("+"))
}

fn key_code(token: &str) -> Option<String> {
    if token == "SPACE" {
        return Some("Space".to_string());
    }
    if let Some(number) = token
        .strip_prefix('F')
        .and_then(|suffix| suffix.parse::<u8>().ok())
    {
        return (1..=24).contains(&number).then(|| format!("F{number}"));
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_alphabetic() => Some(format!("Key{ch}")),
        (Some(ch), None) if ch.is_ascii_digit() => Some(format!("Digit{ch}")),
        _ => None,
    }
}

fn key_label(token: &str) -> String {
    if token == "SPACE" {
        "Space".to_string()
    } else {
        token.to_string()
    }
}
