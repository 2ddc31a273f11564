//! Transient notices that dismiss themselves after a fixed delay.
//!
//! The board only tracks deadlines; appending and removing the visible element
//! is done by the caller through the host surface.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const PERMISSION_NOTICE_TITLE: &str = "Microphone Permission Required";
pub const PERMISSION_NOTICE_BODY: &str = "Please enable microphone access in your browser settings";

/// Upper bound on notices kept on screen at once; the oldest is dropped first.
pub const MAX_ACTIVE_NOTICES: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NoticeId(pub u64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeSeverity {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: NoticeId,
    pub severity: NoticeSeverity,
    pub title: String,
    pub body: String,
    pub dismiss_after_ms: u64,
}

impl Notice {
    pub fn permission_required(id: NoticeId, dismiss_after: Duration) -> Self {
        Self {
            id,
            severity: NoticeSeverity::Error,
            title: PERMISSION_NOTICE_TITLE.to_string(),
            body: PERMISSION_NOTICE_BODY.to_string(),
            dismiss_after_ms: dismiss_after.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveNotice {
    notice: Notice,
    dismiss_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    active: VecDeque<ActiveNotice>,
    next_id: u64,
    shown_total: u64,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NoticeId {
        self.next_id += 1;
        NoticeId(self.next_id)
    }

    /// Registers a notice and returns any notice evicted to stay under the cap.
    pub fn push(&mut self, notice: Notice, now: Instant) -> Option<Notice> {
        let dismiss_at = now + Duration::from_millis(notice.dismiss_after_ms);
        let evicted = if self.active.len() >= MAX_ACTIVE_NOTICES {
            self.active.pop_front().map(|entry| entry.notice)
        } else {
            None
        };
        self.active.push_back(ActiveNotice { notice, dismiss_at });
        self.shown_total += 1;
        evicted
    }

    /// Removes every notice whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Notice> {
        let mut expired = Vec::new();
        self.active.retain(|entry| {
            if entry.dismiss_at <= now {
                expired.push(entry.notice.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn dismiss_all(&mut self) -> Vec<Notice> {
        self.active.drain(..).map(|entry| entry.notice).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn shown_total(&self) -> u64 {
        self.shown_total
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.iter().map(|entry| entry.dismiss_at).min()
    }
}
