use crate::settings::ProgressSettings;
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStyle {
    pub bar_color: String,
    pub shadow_color: String,
}

pub trait ProgressBar: Send {
    fn show(&mut self, style: &ProgressStyle);
    fn hide(&mut self);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProgressPhase {
    #[default]
    Hidden,
    Pending,
    Visible,
}

/// Navigation progress bar that only appears when a page load outlasts the delay.
pub struct ProgressIndicator {
    bar: Box<dyn ProgressBar>,
    style: ProgressStyle,
    show_delay: Duration,
    show_at: Option<Instant>,
    visible: bool,
}

impl ProgressIndicator {
    pub fn new(bar: Box<dyn ProgressBar>, settings: &ProgressSettings) -> Self {
        Self {
            bar,
            style: ProgressStyle {
                bar_color: settings.bar_color.clone(),
                shadow_color: settings.shadow_color.clone(),
            },
            show_delay: Duration::from_millis(settings.show_delay_ms),
            show_at: None,
            visible: false,
        }
    }

    pub fn loading_started(&mut self, now: Instant) {
        if self.visible {
            return;
        }
        // A second start while pending keeps the original deadline.
        if self.show_at.is_none() {
            self.show_at = Some(now + self.show_delay);
        }
        if self.show_delay.is_zero() {
            self.tick(now);
        }
    }

    pub fn loading_stopped(&mut self) {
        self.show_at = None;
        if self.visible {
            self.visible = false;
            self.bar.hide();
            debug!("progress bar hidden");
        }
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(show_at) = self.show_at else {
            return;
        };
        if now >= show_at {
            self.show_at = None;
            self.visible = true;
            self.bar.show(&self.style);
            debug!("progress bar shown");
        }
    }

    pub fn phase(&self) -> ProgressPhase {
        if self.visible {
            ProgressPhase::Visible
        } else if self.show_at.is_some() {
            ProgressPhase::Pending
        } else {
            ProgressPhase::Hidden
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressCall {
    Show,
    Hide,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingProgressBar {
    calls: Arc<Mutex<Vec<ProgressCall>>>,
}

impl RecordingProgressBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl ProgressBar for RecordingProgressBar {
    fn show(&mut self, _style: &ProgressStyle) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ProgressCall::Show);
        }
    }

    fn hide(&mut self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ProgressCall::Hide);
        }
    }
}
