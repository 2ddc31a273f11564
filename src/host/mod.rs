//! Seams to the page host: DOM surface, speech recognition, permission query and
//! audio unlock. Each trait has a deterministic recording double used by tests
//! and the replay harness.

use crate::{
    audio::SilentClip,
    notice::{Notice, NoticeId},
    permissions::HostEnvironment,
    recognition::{RecognitionConfig, SessionId},
    ui::TriggerIcon,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HostError {
    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),
    #[error("host rejected the request: {0}")]
    Rejected(String),
}

/// DOM operations on the trigger button, the bound text field, its form and the page body.
/// Every method is a no-op when the element it targets is missing.
pub trait VoiceSurface: Send {
    fn has_trigger(&self) -> bool;
    fn set_trigger_disabled(&mut self, disabled: bool);
    fn add_trigger_classes(&mut self, classes: &[&str]);
    fn remove_trigger_classes(&mut self, classes: &[&str]);
    fn set_trigger_title(&mut self, title: &str);
    fn set_trigger_icon(&mut self, icon: TriggerIcon);
    fn set_placeholder(&mut self, text: &str);
    /// Returns false when no bound field exists.
    fn set_field_value(&mut self, value: &str) -> bool;
    fn dispatch_input(&mut self);
    fn dispatch_submit(&mut self);
    fn append_notice(&mut self, notice: &Notice);
    fn remove_notice(&mut self, id: NoticeId) -> bool;
}

pub trait RecognitionSession: Send {
    fn start(&mut self) -> Result<(), HostError>;
    fn stop(&mut self);
}

pub trait Recognizer: Send {
    fn is_available(&self) -> bool;
    fn create_session(
        &mut self,
        id: SessionId,
        config: &RecognitionConfig,
    ) -> Result<Box<dyn RecognitionSession>, HostError>;
}

/// Starts an asynchronous permission query; the answer comes back as a page event.
pub trait PermissionQuery: Send {
    fn query(&mut self, capability: &str) -> Result<(), HostError>;
}

/// Starts playback of the unlock clip; the outcome comes back as a page event.
pub trait AudioUnlocker: Send {
    fn play_silent(&mut self, clip: &SilentClip) -> Result<(), HostError>;
}

pub struct VoiceHost {
    pub surface: Box<dyn VoiceSurface>,
    pub recognizer: Box<dyn Recognizer>,
    pub permissions: Option<Box<dyn PermissionQuery>>,
    pub unlocker: Box<dyn AudioUnlocker>,
    pub environment: HostEnvironment,
}

fn lock<T>(shared: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    // A panicked test thread must not hide the recorded state from the others.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SurfaceOp {
    Disabled { disabled: bool },
    AddClasses { classes: Vec<String> },
    RemoveClasses { classes: Vec<String> },
    Title { title: String },
    Icon { icon: TriggerIcon },
    Placeholder { text: String },
    FieldValue { value: String },
    Input,
    Submit,
    NoticeAppended { id: NoticeId },
    NoticeRemoved { id: NoticeId },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceState {
    pub trigger_present: bool,
    pub field_present: bool,
    pub disabled: bool,
    pub classes: BTreeSet<String>,
    pub title: Option<String>,
    pub icon: Option<TriggerIcon>,
    pub placeholder: Option<String>,
    pub field_value: String,
    pub input_events: usize,
    pub submit_events: usize,
    pub notices: Vec<Notice>,
    pub notices_appended: usize,
    pub ops: Vec<SurfaceOp>,
}

/// In-memory surface that records every mutation. Clones share the same state.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                trigger_present: true,
                field_present: true,
                ..SurfaceState::default()
            })),
        }
    }

    pub fn without_trigger(self) -> Self {
        lock(&self.state).trigger_present = false;
        self
    }

    pub fn without_field(self) -> Self {
        lock(&self.state).field_present = false;
        self
    }

    pub fn state(&self) -> SurfaceState {
        lock(&self.state).clone()
    }

    pub fn has_class(&self, class: &str) -> bool {
        lock(&self.state).classes.contains(class)
    }

    fn record(&self, op: SurfaceOp) {
        lock(&self.state).ops.push(op);
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceSurface for RecordingSurface {
    fn has_trigger(&self) -> bool {
        lock(&self.state).trigger_present
    }

    fn set_trigger_disabled(&mut self, disabled: bool) {
        if !self.has_trigger() {
            return;
        }
        lock(&self.state).disabled = disabled;
        self.record(SurfaceOp::Disabled { disabled });
    }

    fn add_trigger_classes(&mut self, classes: &[&str]) {
        if !self.has_trigger() {
            return;
        }
        {
            let mut state = lock(&self.state);
            for class in classes {
                state.classes.insert((*class).to_string());
            }
        }
        self.record(SurfaceOp::AddClasses {
            classes: classes.iter().map(|class| class.to_string()).collect(),
        });
    }

    fn remove_trigger_classes(&mut self, classes: &[&str]) {
        if !self.has_trigger() {
            return;
        }
        {
            let mut state = lock(&self.state);
            for class in classes {
                state.classes.remove(*class);
            }
        }
        self.record(SurfaceOp::RemoveClasses {
            classes: classes.iter().map(|class| class.to_string()).collect(),
        });
    }

    fn set_trigger_title(&mut self, title: &str) {
        if !self.has_trigger() {
            return;
        }
        lock(&self.state).title = Some(title.to_string());
        self.record(SurfaceOp::Title {
            title: title.to_string(),
        });
    }

    fn set_trigger_icon(&mut self, icon: TriggerIcon) {
        if !self.has_trigger() {
            return;
        }
        lock(&self.state).icon = Some(icon);
        self.record(SurfaceOp::Icon { icon });
    }

    fn set_placeholder(&mut self, text: &str) {
        {
            let mut state = lock(&self.state);
            if !state.field_present {
                return;
            }
            state.placeholder = Some(text.to_string());
        }
        self.record(SurfaceOp::Placeholder {
            text: text.to_string(),
        });
    }

    fn set_field_value(&mut self, value: &str) -> bool {
        {
            let mut state = lock(&self.state);
            if !state.field_present {
                return false;
            }
            state.field_value = value.to_string();
        }
        self.record(SurfaceOp::FieldValue {
            value: value.to_string(),
        });
        true
    }

    fn dispatch_input(&mut self) {
        lock(&self.state).input_events += 1;
        self.record(SurfaceOp::Input);
    }

    fn dispatch_submit(&mut self) {
        lock(&self.state).submit_events += 1;
        self.record(SurfaceOp::Submit);
    }

    fn append_notice(&mut self, notice: &Notice) {
        {
            let mut state = lock(&self.state);
            state.notices.push(notice.clone());
            state.notices_appended += 1;
        }
        self.record(SurfaceOp::NoticeAppended { id: notice.id });
    }

    fn remove_notice(&mut self, id: NoticeId) -> bool {
        let removed = {
            let mut state = lock(&self.state);
            let before = state.notices.len();
            state.notices.retain(|notice| notice.id != id);
            state.notices.len() != before
        };
        if removed {
            self.record(SurfaceOp::NoticeRemoved { id });
        }
        removed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionCall {
    Created,
    Started,
    Stopped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerLog {
    pub calls: Vec<(SessionId, SessionCall)>,
    pub configs: Vec<RecognitionConfig>,
    /// Sessions that were started and have neither been stopped by the controller
    /// nor marked finished by the host.
    pub running: BTreeSet<SessionId>,
}

impl RecognizerLog {
    pub fn count(&self, call: SessionCall) -> usize {
        self.calls.iter().filter(|(_, seen)| *seen == call).count()
    }
}

/// Recognizer double. Lifecycle callbacks are not produced here; tests feed them
/// to the controller explicitly.
#[derive(Debug, Clone)]
pub struct ScriptedRecognizer {
    available: bool,
    fail_create: bool,
    fail_start: bool,
    log: Arc<Mutex<RecognizerLog>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            available: true,
            fail_create: false,
            fail_start: false,
            log: Arc::new(Mutex::new(RecognizerLog::default())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_create_failure(mut self, fails: bool) -> Self {
        self.fail_create = fails;
        self
    }

    pub fn with_start_failure(mut self, fails: bool) -> Self {
        self.fail_start = fails;
        self
    }

    pub fn log(&self) -> RecognizerLog {
        lock(&self.log).clone()
    }

    /// Marks a session as finished, the way the host does before `onend`.
    pub fn finish(&self, id: SessionId) {
        lock(&self.log).running.remove(&id);
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn create_session(
        &mut self,
        id: SessionId,
        config: &RecognitionConfig,
    ) -> Result<Box<dyn RecognitionSession>, HostError> {
        if !self.available {
            return Err(HostError::Unsupported("speech recognition"));
        }
        if self.fail_create {
            return Err(HostError::Rejected("recognizer constructor threw".to_string()));
        }
        {
            let mut log = lock(&self.log);
            log.calls.push((id, SessionCall::Created));
            log.configs.push(config.clone());
        }
        Ok(Box::new(ScriptedSession {
            id,
            fail_start: self.fail_start,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedSession {
    id: SessionId,
    fail_start: bool,
    log: Arc<Mutex<RecognizerLog>>,
}

impl RecognitionSession for ScriptedSession {
    fn start(&mut self) -> Result<(), HostError> {
        if self.fail_start {
            return Err(HostError::Rejected("recognition has already started".to_string()));
        }
        let mut log = lock(&self.log);
        log.calls.push((self.id, SessionCall::Started));
        log.running.insert(self.id);
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = lock(&self.log);
        log.calls.push((self.id, SessionCall::Stopped));
        log.running.remove(&self.id);
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedPermissions {
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPermissions {
    pub fn new() -> Self {
        Self {
            fail: false,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

impl Default for ScriptedPermissions {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionQuery for ScriptedPermissions {
    fn query(&mut self, capability: &str) -> Result<(), HostError> {
        lock(&self.queries).push(capability.to_string());
        if self.fail {
            return Err(HostError::Rejected(format!(
                "permission name '{capability}' is not queryable"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedUnlocker {
    fail: bool,
    attempts: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedUnlocker {
    pub fn new() -> Self {
        Self {
            fail: false,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Byte length of every clip the controller asked to play.
    pub fn attempts(&self) -> Vec<usize> {
        lock(&self.attempts).clone()
    }
}

impl Default for ScriptedUnlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnlocker for ScriptedUnlocker {
    fn play_silent(&mut self, clip: &SilentClip) -> Result<(), HostError> {
        lock(&self.attempts).push(clip.bytes().len());
        if self.fail {
            return Err(HostError::Rejected("audio element could not be created".to_string()));
        }
        Ok(())
    }
}

/// Handles to the recording doubles behind a [`VoiceHost`].
#[derive(Debug, Clone)]
pub struct ScriptedHost {
    pub surface: RecordingSurface,
    pub recognizer: ScriptedRecognizer,
    pub permissions: Option<ScriptedPermissions>,
    pub unlocker: ScriptedUnlocker,
    pub environment: HostEnvironment,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            surface: RecordingSurface::new(),
            recognizer: ScriptedRecognizer::new(),
            permissions: Some(ScriptedPermissions::new()),
            unlocker: ScriptedUnlocker::new(),
            environment: HostEnvironment::default(),
        }
    }

    pub fn voice_host(&self) -> VoiceHost {
        VoiceHost {
            surface: Box::new(self.surface.clone()),
            recognizer: Box::new(self.recognizer.clone()),
            permissions: self
                .permissions
                .clone()
                .map(|permissions| Box::new(permissions) as Box<dyn PermissionQuery>),
            unlocker: Box::new(self.unlocker.clone()),
            environment: self.environment.clone(),
        }
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}
