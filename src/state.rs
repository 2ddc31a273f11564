use crate::{
    audio::{AudioUnlockState, SilentClip},
    hotkey::{HotkeyBinding, KeyStroke},
    host::{HostError, RecognitionSession, VoiceHost},
    notice::{Notice, NoticeBoard},
    permissions::{
        assess_environment, Availability, MicrophonePermission, PermissionEffect,
        PermissionSnapshot, PermissionTracker, DENIED_LABEL, GRANTED_LABEL,
    },
    recognition::{
        RecognitionConfig, RecognitionErrorKind, RecognitionResults, SessionId, SessionState,
    },
    settings::VoiceInputSettings,
    transcript::prepare_transcript,
    ui::{render_session_ui, UiFrame, DISABLED_CLASSES},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum VoiceInputError {
    #[error("speech recognition is not available on this host")]
    CapabilityUnavailable,
    #[error("speech recognition requires a secure context")]
    InsecureContext,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("permission query unavailable: {0}")]
    PermissionQuery(HostError),
    #[error("failed to start recognition session {session}: {reason}")]
    SessionStart {
        session: SessionId,
        reason: HostError,
    },
    #[error("recognition session {session} failed: {kind}")]
    Recognition {
        session: SessionId,
        kind: RecognitionErrorKind,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// `start()` was requested, `onstart` has not arrived yet.
    Starting,
    Live,
    /// `stop()` was requested; waiting for `onend`/`onerror`.
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Unavailable,
    Started(SessionId),
    StartFailed,
    StopRequested(SessionId),
    StopPending(SessionId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInputSnapshot {
    pub mounted: bool,
    pub availability: Availability,
    pub permission: MicrophonePermission,
    pub session_state: SessionState,
    pub active_session: Option<SessionId>,
    pub session_phase: Option<SessionPhase>,
    pub audio_unlocked: bool,
    pub trigger_disabled: bool,
    pub shortcut_registered: bool,
    pub sessions_created: u64,
    pub transcripts_submitted: u64,
    pub active_notices: usize,
    pub last_error: Option<String>,
}

struct ActiveSession {
    id: SessionId,
    phase: SessionPhase,
    handle: Box<dyn RecognitionSession>,
}

/// Voice-input hook for one mounted trigger element.
///
/// Owns microphone permission state and at most one recognition session. Host
/// callbacks are fed in through the `on_*` methods; every transition re-renders
/// the trigger through [`VoiceInputController::update_ui`].
pub struct VoiceInputController {
    host: VoiceHost,
    settings: VoiceInputSettings,
    shortcut: HotkeyBinding,
    permission: PermissionTracker,
    session_state: SessionState,
    active: Option<ActiveSession>,
    next_session_id: u64,
    sessions_created: u64,
    transcripts_submitted: u64,
    audio: AudioUnlockState,
    notices: NoticeBoard,
    disabled_label: Option<&'static str>,
    shortcut_registered: bool,
    mounted: bool,
    last_error: Option<VoiceInputError>,
}

impl VoiceInputController {
    pub fn new(host: VoiceHost, settings: VoiceInputSettings) -> Self {
        let mut settings = settings.clamped();
        let shortcut = match HotkeyBinding::parse(&settings.toggle_hotkey) {
            Ok(binding) => binding,
            Err(err) => {
                let fallback = VoiceInputSettings::default().toggle_hotkey;
                warn!(%err, hotkey = %settings.toggle_hotkey, %fallback, "invalid voice shortcut, using default");
                settings.toggle_hotkey = fallback;
                HotkeyBinding::default()
            }
        };

        Self {
            host,
            settings,
            shortcut,
            permission: PermissionTracker::new(),
            session_state: SessionState::Idle,
            active: None,
            next_session_id: 0,
            sessions_created: 0,
            transcripts_submitted: 0,
            audio: AudioUnlockState::default(),
            notices: NoticeBoard::new(),
            disabled_label: None,
            shortcut_registered: false,
            mounted: false,
            last_error: None,
        }
    }

    pub fn settings(&self) -> &VoiceInputSettings {
        &self.settings
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn permission(&self) -> MicrophonePermission {
        self.permission.microphone()
    }

    pub fn permission_snapshot(&self) -> PermissionSnapshot {
        self.permission.snapshot()
    }

    pub fn audio_unlocked(&self) -> bool {
        self.audio.is_unlocked()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|session| session.id)
    }

    pub fn last_error(&self) -> Option<&VoiceInputError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> VoiceInputSnapshot {
        VoiceInputSnapshot {
            mounted: self.mounted,
            availability: self.permission.availability(),
            permission: self.permission.microphone(),
            session_state: self.session_state,
            active_session: self.active_session(),
            session_phase: self.active.as_ref().map(|session| session.phase),
            audio_unlocked: self.audio.is_unlocked(),
            trigger_disabled: self.disabled_label.is_some(),
            shortcut_registered: self.shortcut_registered,
            sessions_created: self.sessions_created,
            transcripts_submitted: self.transcripts_submitted,
            active_notices: self.notices.active_count(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    pub fn mount(&mut self) {
        if self.mounted {
            warn!("voice input already mounted");
            return;
        }
        self.mounted = true;
        self.disabled_label = None;

        let availability = assess_environment(
            self.host.recognizer.is_available(),
            &self.host.environment,
            &self.settings.loopback_hosts,
        );
        self.permission.set_availability(availability);
        info!(?availability, trigger = self.host.surface.has_trigger(), "voice input mounted");

        match availability {
            Availability::Unsupported => {
                warn!("speech recognition not supported by this host");
                self.record_error(VoiceInputError::CapabilityUnavailable);
            }
            Availability::InsecureContext => {
                warn!(
                    protocol = %self.host.environment.protocol,
                    hostname = %self.host.environment.hostname,
                    "speech recognition requires a secure context"
                );
                self.record_error(VoiceInputError::InsecureContext);
            }
            Availability::Ready | Availability::Unmounted => {}
        }

        if let Some(label) = availability.disabled_label() {
            self.disable_trigger(label);
        } else {
            if self.permission.microphone() == MicrophonePermission::Denied {
                self.handle_permission_denied();
            }
            self.query_permission();
        }

        if !self.host.surface.has_trigger() {
            warn!("speech trigger not found; only the keyboard shortcut is active");
        } else if self.disabled_label.is_none() {
            self.host.surface.set_trigger_disabled(false);
            self.host.surface.remove_trigger_classes(&["opacity-50"]);
        }

        self.shortcut_registered = true;
        debug!(shortcut = %self.shortcut.label(), "voice shortcut registered");
    }

    pub fn destroy(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(mut session) = self.active.take() {
            if session.phase != SessionPhase::Stopping {
                session.handle.stop();
            }
            info!(session_id = %session.id, "released recognition session on unmount");
        }
        self.session_state = SessionState::Idle;
        for notice in self.notices.dismiss_all() {
            self.host.surface.remove_notice(notice.id);
        }
        self.shortcut_registered = false;
        self.mounted = false;
        info!("voice input destroyed");
    }

    /// Trigger click. Returns false when the click was ignored.
    pub fn on_click(&mut self) -> bool {
        if !self.mounted || !self.host.surface.has_trigger() {
            return false;
        }
        if self.disabled_label.is_some() {
            debug!("speech trigger disabled, ignoring click");
            return false;
        }
        self.toggle();
        true
    }

    /// Global keydown. Returns true when the stroke matched and the default action
    /// should be prevented.
    pub fn on_key_stroke(&mut self, stroke: &KeyStroke) -> bool {
        if !self.shortcut_registered || !self.shortcut.matches(stroke) {
            return false;
        }
        self.toggle();
        true
    }

    pub fn toggle(&mut self) -> ToggleOutcome {
        if !self.mounted || !self.permission.availability().is_ready() {
            warn!("speech recognition not available");
            return ToggleOutcome::Unavailable;
        }

        self.try_unlock_audio();

        if let Some(session) = self.active.as_mut() {
            if session.phase == SessionPhase::Stopping {
                debug!(session_id = %session.id, "stop already requested");
                return ToggleOutcome::StopPending(session.id);
            }
            info!(session_id = %session.id, phase = ?session.phase, "stopping speech recognition");
            session.phase = SessionPhase::Stopping;
            session.handle.stop();
            return ToggleOutcome::StopRequested(session.id);
        }

        self.start_session()
    }

    pub fn on_permission_resolved(&mut self, state: MicrophonePermission) {
        if !self.permission.availability().is_ready() {
            return;
        }
        info!(permission = ?state, "microphone permission status");
        match self.permission.resolve(state) {
            PermissionEffect::Granted => {
                if self.disabled_label.is_none() {
                    self.host.surface.set_trigger_title(GRANTED_LABEL);
                }
            }
            PermissionEffect::Denied => self.handle_permission_denied(),
            PermissionEffect::None => {}
        }
    }

    pub fn on_permission_query_failed(&mut self, err: HostError) {
        debug!(%err, "permission query failed, will request on first use");
        self.permission.query_unavailable();
        self.record_error(VoiceInputError::PermissionQuery(err));
    }

    pub fn on_permission_changed(&mut self, state: MicrophonePermission) {
        info!(permission = ?state, "microphone permission changed");
        match self.permission.change(state) {
            // A trigger disabled by an earlier denial stays disabled.
            PermissionEffect::Granted => self.update_ui(),
            PermissionEffect::Denied => self.handle_permission_denied(),
            PermissionEffect::None => {}
        }
    }

    pub fn on_audio_unlock(&mut self, result: Result<(), HostError>) {
        match result {
            Ok(()) => {
                if self.audio.record_success() {
                    info!("audio unlocked via speech trigger");
                }
            }
            Err(err) => debug!(%err, "failed to unlock audio"),
        }
    }

    pub fn on_session_start(&mut self, id: SessionId) {
        let Some(session) = self.active_mut(id) else {
            debug!(session_id = %id, "ignoring start from inactive session");
            return;
        };
        if session.phase == SessionPhase::Starting {
            session.phase = SessionPhase::Live;
        }
        info!(session_id = %id, "speech recognition started");
        self.session_state = SessionState::Listening;
        self.update_ui();
    }

    pub fn on_session_result(&mut self, id: SessionId, results: &RecognitionResults) {
        if self.active_mut(id).is_none() {
            debug!(session_id = %id, "ignoring result from inactive session");
            return;
        }
        let Some(raw) = results.top_transcript() else {
            debug!(session_id = %id, "recognition result carried no alternatives");
            return;
        };
        let Some(transcript) = prepare_transcript(raw, self.settings.sanitize_transcripts) else {
            debug!(session_id = %id, "recognition result was empty after cleanup");
            return;
        };
        info!(session_id = %id, %transcript, "speech recognized");

        if !self.host.surface.set_field_value(&transcript) {
            warn!(session_id = %id, "bound text field not found, dropping transcript");
            return;
        }
        self.host.surface.dispatch_input();
        info!(session_id = %id, "auto-submitting form with speech input");
        self.host.surface.dispatch_submit();
        self.transcripts_submitted += 1;
    }

    pub fn on_session_end(&mut self, id: SessionId) {
        if self.active_mut(id).is_none() {
            debug!(session_id = %id, "ignoring end from inactive session");
            return;
        }
        info!(session_id = %id, "speech recognition ended");
        self.active = None;
        self.session_state = SessionState::Idle;
        self.update_ui();
    }

    pub fn on_session_error(&mut self, id: SessionId, kind: RecognitionErrorKind) {
        if self.active_mut(id).is_none() {
            debug!(session_id = %id, %kind, "ignoring error from inactive session");
            return;
        }
        error!(session_id = %id, %kind, "speech recognition error");
        self.active = None;
        self.session_state = SessionState::Idle;

        let refused = kind.is_permission_refusal();
        self.record_error(VoiceInputError::Recognition { session: id, kind });
        if refused {
            self.handle_permission_denied();
            self.show_permission_notice(Instant::now());
        }
        self.update_ui();
    }

    /// Removes transient notices whose deadline has passed. Returns how many were removed.
    pub fn expire_notices(&mut self, now: Instant) -> usize {
        let expired = self.notices.expire(now);
        for notice in &expired {
            self.host.surface.remove_notice(notice.id);
        }
        expired.len()
    }

    pub fn next_notice_deadline(&self) -> Option<Instant> {
        self.notices.next_deadline()
    }

    pub fn update_ui(&mut self) {
        let frame = render_session_ui(self.session_state, &self.shortcut.label());
        self.apply_frame(&frame);
    }

    fn apply_frame(&mut self, frame: &UiFrame) {
        let surface = &mut self.host.surface;
        surface.set_placeholder(frame.placeholder);
        surface.add_trigger_classes(frame.add_classes);
        surface.remove_trigger_classes(frame.remove_classes);
        surface.set_trigger_icon(frame.icon);
        // The explanation for a disabled trigger outlives session re-renders.
        let tooltip = self.disabled_label.unwrap_or(frame.tooltip.as_str());
        surface.set_trigger_title(tooltip);
    }

    fn start_session(&mut self) -> ToggleOutcome {
        self.next_session_id += 1;
        let id = SessionId(self.next_session_id);
        let config = RecognitionConfig::from(&self.settings);
        info!(session_id = %id, locale = %config.locale, "starting speech recognition");

        let mut handle = match self.host.recognizer.create_session(id, &config) {
            Ok(handle) => handle,
            Err(err) => return self.fail_start(id, err),
        };
        self.sessions_created += 1;
        if let Err(err) = handle.start() {
            return self.fail_start(id, err);
        }

        self.active = Some(ActiveSession {
            id,
            phase: SessionPhase::Starting,
            handle,
        });
        ToggleOutcome::Started(id)
    }

    fn fail_start(&mut self, id: SessionId, err: HostError) -> ToggleOutcome {
        error!(session_id = %id, %err, "error starting speech recognition");
        self.session_state = SessionState::Idle;
        self.active = None;
        self.record_error(VoiceInputError::SessionStart {
            session: id,
            reason: err,
        });
        self.update_ui();
        ToggleOutcome::StartFailed
    }

    fn try_unlock_audio(&mut self) {
        if !self.audio.begin_attempt() {
            return;
        }
        match SilentClip::embedded() {
            Ok(clip) => {
                if let Err(err) = self.host.unlocker.play_silent(&clip) {
                    debug!(%err, "could not create unlock audio");
                }
            }
            Err(err) => debug!(%err, "could not build unlock clip"),
        }
    }

    fn query_permission(&mut self) {
        self.permission.mark_query_attempted();
        let capability = self.settings.permission_name.clone();
        let Some(query) = self.host.permissions.as_mut() else {
            debug!("permission API not available, will request on first use");
            self.permission.query_unavailable();
            return;
        };
        if let Err(err) = query.query(&capability) {
            self.on_permission_query_failed(err);
        }
    }

    fn handle_permission_denied(&mut self) {
        warn!("microphone permission denied");
        self.permission.deny();
        self.record_error(VoiceInputError::PermissionDenied);
        self.disable_trigger(DENIED_LABEL);
    }

    fn disable_trigger(&mut self, label: &'static str) {
        self.disabled_label = Some(label);
        let surface = &mut self.host.surface;
        surface.add_trigger_classes(DISABLED_CLASSES);
        surface.set_trigger_disabled(true);
        surface.set_trigger_title(label);
    }

    fn show_permission_notice(&mut self, now: Instant) {
        let id = self.notices.next_id();
        let notice =
            Notice::permission_required(id, Duration::from_millis(self.settings.notice_dismiss_ms));
        if let Some(evicted) = self.notices.push(notice.clone(), now) {
            self.host.surface.remove_notice(evicted.id);
        }
        self.host.surface.append_notice(&notice);
    }

    fn active_mut(&mut self, id: SessionId) -> Option<&mut ActiveSession> {
        self.active.as_mut().filter(|session| session.id == id)
    }

    fn record_error(&mut self, err: VoiceInputError) {
        self.last_error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::{ScriptedHost, ScriptedRecognizer, SessionCall},
        notice::PERMISSION_NOTICE_TITLE,
        permissions::{HostEnvironment, INSECURE_LABEL, UNSUPPORTED_LABEL},
        ui::{IDLE_PLACEHOLDER, LISTENING_PLACEHOLDER},
    };

    fn mounted(host: &ScriptedHost) -> VoiceInputController {
        let mut controller =
            VoiceInputController::new(host.voice_host(), VoiceInputSettings::default());
        controller.mount();
        controller
    }

    fn started(controller: &mut VoiceInputController) -> SessionId {
        match controller.toggle() {
            ToggleOutcome::Started(id) => id,
            other => panic!("expected a started session, got {other:?}"),
        }
    }

    #[test]
    fn missing_capability_disables_trigger_at_mount() {
        let host = ScriptedHost {
            recognizer: ScriptedRecognizer::unavailable(),
            ..ScriptedHost::new()
        };
        let mut controller = mounted(&host);

        let surface = host.surface.state();
        assert!(surface.disabled);
        assert!(surface.classes.contains("btn-disabled"));
        assert_eq!(surface.title.as_deref(), Some(UNSUPPORTED_LABEL));
        assert_eq!(controller.toggle(), ToggleOutcome::Unavailable);
        assert!(!controller.on_click());
        assert!(host.unlocker.attempts().is_empty());
        assert_eq!(
            controller.last_error(),
            Some(&VoiceInputError::CapabilityUnavailable)
        );
        assert!(host
            .permissions
            .as_ref()
            .is_some_and(|permissions| permissions.queries().is_empty()));
    }

    #[test]
    fn insecure_origin_disables_trigger_and_skips_query() {
        let host = ScriptedHost {
            environment: HostEnvironment::new("http:", "10.0.0.8", false),
            ..ScriptedHost::new()
        };
        let mut controller = mounted(&host);
        assert_eq!(host.surface.state().title.as_deref(), Some(INSECURE_LABEL));
        assert_eq!(controller.toggle(), ToggleOutcome::Unavailable);
        let stroke = KeyStroke::new("KeyM").with_meta().with_shift();
        assert!(controller.on_key_stroke(&stroke));
        assert_eq!(controller.snapshot().sessions_created, 0);
    }

    #[test]
    fn mount_queries_microphone_permission() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let queries = host
            .permissions
            .as_ref()
            .map(|permissions| permissions.queries())
            .unwrap_or_default();
        assert_eq!(queries, vec!["microphone".to_string()]);
        assert!(!host.surface.state().disabled);

        controller.on_permission_resolved(MicrophonePermission::Granted);
        assert_eq!(controller.permission(), MicrophonePermission::Granted);
        assert_eq!(host.surface.state().title.as_deref(), Some(GRANTED_LABEL));
    }

    #[test]
    fn missing_permission_api_defers_to_first_use() {
        let host = ScriptedHost {
            permissions: None,
            ..ScriptedHost::new()
        };
        let mut controller = mounted(&host);
        assert_eq!(controller.permission(), MicrophonePermission::Unknown);
        assert!(!controller.permission_snapshot().watching_changes);
        controller.on_permission_changed(MicrophonePermission::Denied);
        assert_eq!(controller.permission(), MicrophonePermission::Unknown);
        assert!(matches!(controller.toggle(), ToggleOutcome::Started(_)));
    }

    #[test]
    fn full_cycle_fills_field_and_submits_once() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        assert_eq!(controller.session_state(), SessionState::Idle);

        controller.on_session_start(id);
        assert_eq!(controller.session_state(), SessionState::Listening);
        let surface = host.surface.state();
        assert_eq!(surface.placeholder.as_deref(), Some(LISTENING_PLACEHOLDER));
        assert!(surface.classes.contains("animate-pulse"));

        controller.on_session_result(id, &RecognitionResults::single("hello world"));
        controller.on_session_end(id);

        let surface = host.surface.state();
        assert_eq!(surface.field_value, "hello world");
        assert_eq!(surface.input_events, 1);
        assert_eq!(surface.submit_events, 1);
        assert_eq!(surface.placeholder.as_deref(), Some(IDLE_PLACEHOLDER));
        assert!(surface.classes.contains("btn-ghost"));
        assert!(!surface.classes.contains("btn-error"));
        assert_eq!(controller.session_state(), SessionState::Idle);
        assert_eq!(controller.active_session(), None);
    }

    #[test]
    fn toggle_while_listening_requests_stop_without_leaving_listening() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        controller.on_session_start(id);

        assert_eq!(controller.toggle(), ToggleOutcome::StopRequested(id));
        assert_eq!(controller.session_state(), SessionState::Listening);
        assert_eq!(controller.toggle(), ToggleOutcome::StopPending(id));
        assert_eq!(host.recognizer.log().count(SessionCall::Stopped), 1);

        controller.on_session_end(id);
        assert_eq!(controller.session_state(), SessionState::Idle);
        assert!(matches!(controller.toggle(), ToggleOutcome::Started(next) if next != id));
    }

    #[test]
    fn stale_callbacks_are_ignored() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let first = started(&mut controller);
        controller.on_session_start(first);
        controller.on_session_end(first);
        let second = started(&mut controller);

        controller.on_session_start(first);
        controller.on_session_result(first, &RecognitionResults::single("late"));
        assert_eq!(controller.session_state(), SessionState::Idle);
        assert_eq!(host.surface.state().submit_events, 0);

        controller.on_session_end(first);
        assert_eq!(controller.active_session(), Some(second));
    }

    #[test]
    fn start_failure_resets_to_idle() {
        let host = ScriptedHost {
            recognizer: ScriptedRecognizer::new().with_start_failure(true),
            ..ScriptedHost::new()
        };
        let mut controller = mounted(&host);
        assert_eq!(controller.toggle(), ToggleOutcome::StartFailed);
        assert_eq!(controller.active_session(), None);
        assert_eq!(controller.session_state(), SessionState::Idle);
        assert!(matches!(
            controller.last_error(),
            Some(VoiceInputError::SessionStart { .. })
        ));
        assert!(host.surface.state().notices.is_empty());
        assert_eq!(
            host.surface.state().placeholder.as_deref(),
            Some(IDLE_PLACEHOLDER)
        );
    }

    #[test]
    fn permission_refusal_disables_trigger_and_shows_notice() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        controller.on_session_start(id);
        controller.on_session_error(id, RecognitionErrorKind::NotAllowed);

        let surface = host.surface.state();
        assert!(surface.disabled);
        assert_eq!(surface.title.as_deref(), Some(DENIED_LABEL));
        assert_eq!(surface.notices.len(), 1);
        assert_eq!(surface.notices[0].title, PERMISSION_NOTICE_TITLE);
        assert_eq!(surface.notices[0].dismiss_after_ms, 5_000);
        assert_eq!(controller.permission(), MicrophonePermission::Denied);
        assert!(!controller.on_click());

        assert_eq!(controller.expire_notices(Instant::now()), 0);
        assert_eq!(
            controller.expire_notices(Instant::now() + Duration::from_secs(6)),
            1
        );
        assert!(host.surface.state().notices.is_empty());
    }

    #[test]
    fn other_recognition_errors_stay_enabled() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        controller.on_session_start(id);
        controller.on_session_error(id, RecognitionErrorKind::NoSpeech);

        let surface = host.surface.state();
        assert!(!surface.disabled);
        assert!(surface.notices.is_empty());
        assert_eq!(controller.permission(), MicrophonePermission::Unknown);
        assert!(controller.on_click());
    }

    #[test]
    fn regrant_after_denial_keeps_trigger_disabled() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        controller.on_permission_resolved(MicrophonePermission::Denied);
        assert!(host.surface.state().disabled);

        controller.on_permission_changed(MicrophonePermission::Granted);
        assert_eq!(controller.permission(), MicrophonePermission::Granted);
        let surface = host.surface.state();
        assert!(surface.disabled);
        assert_eq!(surface.title.as_deref(), Some(DENIED_LABEL));
    }

    #[test]
    fn audio_unlock_is_attempted_on_first_toggle_only() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        controller.toggle();
        controller.on_session_end(id);
        controller.toggle();
        assert_eq!(host.unlocker.attempts().len(), 1);
        assert!(!controller.audio_unlocked());

        controller.on_audio_unlock(Ok(()));
        assert!(controller.audio_unlocked());
        controller.on_audio_unlock(Err(HostError::Rejected("late".to_string())));
        assert!(controller.audio_unlocked());
    }

    #[test]
    fn shortcut_toggles_and_unregisters_on_destroy() {
        let host = ScriptedHost::new();
        let mut controller = mounted(&host);
        let stroke = KeyStroke::new("KeyM").with_meta().with_shift();
        assert!(controller.on_key_stroke(&stroke));
        assert!(controller.active_session().is_some());
        assert!(!controller.on_key_stroke(&KeyStroke::new("KeyM").with_shift()));

        controller.destroy();
        assert_eq!(host.recognizer.log().count(SessionCall::Stopped), 1);
        assert!(!controller.on_key_stroke(&stroke));
        assert_eq!(controller.active_session(), None);
        assert!(!controller.snapshot().shortcut_registered);
    }

    #[test]
    fn invalid_shortcut_falls_back_to_default() {
        let host = ScriptedHost::new();
        let settings = VoiceInputSettings {
            toggle_hotkey: "Ctrl+Banana".to_string(),
            ..VoiceInputSettings::default()
        };
        let mut controller = VoiceInputController::new(host.voice_host(), settings);
        controller.mount();
        assert_eq!(controller.settings().toggle_hotkey, "Meta+Shift+M");
        controller.update_ui();
        assert_eq!(
            host.surface.state().title.as_deref(),
            Some("Click to speak (or Cmd+Shift+M)")
        );
    }

    #[test]
    fn missing_field_drops_transcript_without_submit() {
        let host = ScriptedHost {
            surface: crate::host::RecordingSurface::new().without_field(),
            ..ScriptedHost::new()
        };
        let mut controller = mounted(&host);
        let id = started(&mut controller);
        controller.on_session_start(id);
        controller.on_session_result(id, &RecognitionResults::single("hello"));
        assert_eq!(host.surface.state().submit_events, 0);
        assert_eq!(controller.snapshot().transcripts_submitted, 0);
    }
}
