use crate::{
    audio::{PlaybackController, PlaybackEvent, StopButtonDisplay},
    hotkey::KeyStroke,
    host::HostError,
    permissions::MicrophonePermission,
    progress::{ProgressIndicator, ProgressPhase},
    recognition::{RecognitionErrorKind, RecognitionResults, SessionId},
    state::{VoiceInputController, VoiceInputSnapshot},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Host event delivered to the page loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageEvent {
    Click,
    Key { stroke: KeyStroke },
    /// `state` is the raw host string (`granted`, `denied`, `prompt`).
    PermissionResolved { state: String },
    PermissionQueryFailed { reason: String },
    PermissionChanged { state: String },
    AudioUnlockSettled { ok: bool },
    SessionStarted { session_id: SessionId },
    SessionResult {
        session_id: SessionId,
        results: RecognitionResults,
    },
    SessionEnded { session_id: SessionId },
    SessionError {
        session_id: SessionId,
        error: RecognitionErrorKind,
    },
    Playback { event: PlaybackEvent },
    PageLoadingStart,
    PageLoadingStop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub voice: VoiceInputSnapshot,
    pub stop_button: Option<StopButtonDisplay>,
    pub progress: Option<ProgressPhase>,
    pub events_handled: u64,
}

/// The hooks mounted on one page, driven one event at a time.
pub struct PageHooks {
    voice: VoiceInputController,
    playback: Option<PlaybackController>,
    progress: Option<ProgressIndicator>,
    events_handled: u64,
}

impl PageHooks {
    pub fn new(voice: VoiceInputController) -> Self {
        Self {
            voice,
            playback: None,
            progress: None,
            events_handled: 0,
        }
    }

    pub fn with_playback(mut self, playback: PlaybackController) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn with_progress(mut self, progress: ProgressIndicator) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn voice(&self) -> &VoiceInputController {
        &self.voice
    }

    pub fn mount(&mut self) {
        self.voice.mount();
        if let Some(playback) = self.playback.as_mut() {
            playback.mount();
        }
    }

    pub fn destroy(&mut self) {
        self.voice.destroy();
        if let Some(playback) = self.playback.as_mut() {
            playback.destroy();
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.loading_stopped();
        }
    }

    pub fn dispatch(&mut self, event: PageEvent, now: Instant) {
        self.events_handled += 1;
        match event {
            PageEvent::Click => {
                self.voice.on_click();
            }
            PageEvent::Key { stroke } => {
                if self.voice.on_key_stroke(&stroke) {
                    debug!(code = %stroke.code, "voice shortcut handled");
                }
            }
            PageEvent::PermissionResolved { state } => self
                .voice
                .on_permission_resolved(MicrophonePermission::from_host_state(&state)),
            PageEvent::PermissionQueryFailed { reason } => self
                .voice
                .on_permission_query_failed(HostError::Rejected(reason)),
            PageEvent::PermissionChanged { state } => self
                .voice
                .on_permission_changed(MicrophonePermission::from_host_state(&state)),
            PageEvent::AudioUnlockSettled { ok } => {
                let result = if ok {
                    Ok(())
                } else {
                    Err(HostError::Rejected("playback was blocked".to_string()))
                };
                self.voice.on_audio_unlock(result);
            }
            PageEvent::SessionStarted { session_id } => self.voice.on_session_start(session_id),
            PageEvent::SessionResult {
                session_id,
                results,
            } => self.voice.on_session_result(session_id, &results),
            PageEvent::SessionEnded { session_id } => self.voice.on_session_end(session_id),
            PageEvent::SessionError { session_id, error } => {
                self.voice.on_session_error(session_id, error)
            }
            PageEvent::Playback { event } => {
                if let Some(playback) = self.playback.as_mut() {
                    playback.handle(event);
                }
            }
            PageEvent::PageLoadingStart => {
                if let Some(progress) = self.progress.as_mut() {
                    progress.loading_started(now);
                }
            }
            PageEvent::PageLoadingStop => {
                if let Some(progress) = self.progress.as_mut() {
                    progress.loading_stopped();
                }
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        let removed = self.voice.expire_notices(now);
        if removed > 0 {
            debug!(removed, "transient notices dismissed");
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.tick(now);
        }
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            voice: self.voice.snapshot(),
            stop_button: self.playback.as_ref().map(PlaybackController::display),
            progress: self.progress.as_ref().map(ProgressIndicator::phase),
            events_handled: self.events_handled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("page runtime has shut down")]
    Closed,
    #[error("page runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Single task that owns the page hooks and applies events in arrival order.
pub struct PageRuntime {
    events: mpsc::UnboundedSender<PageEvent>,
    cancel: CancellationToken,
    task: JoinHandle<PageSnapshot>,
}

impl PageRuntime {
    /// Mounts the hooks on a new task. Must be called inside a tokio runtime.
    pub fn spawn(hooks: PageHooks, tick_interval: Duration) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_page_loop(
            hooks,
            receiver,
            cancel.clone(),
            tick_interval,
        ));
        Self {
            events,
            cancel,
            task,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<PageEvent> {
        self.events.clone()
    }

    pub fn send(&self, event: PageEvent) -> Result<(), RuntimeError> {
        self.events.send(event).map_err(|_| RuntimeError::Closed)
    }

    /// Unmounts the page after draining queued events and returns the final state.
    pub async fn shutdown(self) -> Result<PageSnapshot, RuntimeError> {
        self.cancel.cancel();
        Ok(self.task.await?)
    }
}

async fn run_page_loop(
    mut hooks: PageHooks,
    mut receiver: mpsc::UnboundedReceiver<PageEvent>,
    cancel: CancellationToken,
    tick_interval: Duration,
) -> PageSnapshot {
    hooks.mount();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            maybe_event = receiver.recv() => match maybe_event {
                Some(event) => hooks.dispatch(event, Instant::now()),
                None => break,
            },
            _ = ticker.tick() => hooks.tick(Instant::now()),
        }
    }

    while let Ok(event) = receiver.try_recv() {
        hooks.dispatch(event, Instant::now());
    }
    hooks.destroy();
    let snapshot = hooks.snapshot();
    info!(events = snapshot.events_handled, "page runtime stopped");
    snapshot
}
