use serde::{Deserialize, Serialize};

pub const UNSUPPORTED_LABEL: &str = "Speech recognition not supported on mobile";
pub const INSECURE_LABEL: &str = "Voice input requires HTTPS on mobile devices";
pub const DENIED_LABEL: &str = "Microphone permission denied";
pub const GRANTED_LABEL: &str = "Click to speak";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MicrophonePermission {
    Granted,
    Denied,
    #[default]
    Unknown,
}

impl MicrophonePermission {
    /// Maps a host permission state string. `prompt` and anything unrecognised stay unknown.
    pub fn from_host_state(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            _ => Self::Unknown,
        }
    }
}

/// Page origin facts the host reports at mount time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct HostEnvironment {
    pub secure_context: bool,
    pub protocol: String,
    pub hostname: String,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            secure_context: true,
            protocol: "https:".to_string(),
            hostname: "localhost".to_string(),
        }
    }
}

impl HostEnvironment {
    pub fn new(protocol: &str, hostname: &str, secure_context: bool) -> Self {
        Self {
            secure_context,
            protocol: protocol.to_string(),
            hostname: hostname.to_string(),
        }
    }

    pub fn is_secure(&self, loopback_hosts: &[String]) -> bool {
        let is_loopback = loopback_hosts
            .iter()
            .any(|host| host.eq_ignore_ascii_case(&self.hostname));
        self.secure_context || self.protocol.eq_ignore_ascii_case("https:") || is_loopback
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    #[default]
    Unmounted,
    Ready,
    Unsupported,
    InsecureContext,
}

impl Availability {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    /// Permanent explanation shown on the trigger when the feature is switched off.
    pub fn disabled_label(self) -> Option<&'static str> {
        match self {
            Self::Unsupported => Some(UNSUPPORTED_LABEL),
            Self::InsecureContext => Some(INSECURE_LABEL),
            Self::Ready | Self::Unmounted => None,
        }
    }
}

pub fn assess_environment(
    recognition_available: bool,
    environment: &HostEnvironment,
    loopback_hosts: &[String],
) -> Availability {
    if !recognition_available {
        return Availability::Unsupported;
    }
    if !environment.is_secure(loopback_hosts) {
        return Availability::InsecureContext;
    }
    Availability::Ready
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSnapshot {
    pub microphone: MicrophonePermission,
    pub availability: Availability,
    pub watching_changes: bool,
    pub message: Option<String>,
}

/// What the caller has to do to the trigger after a permission update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionEffect {
    None,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionTracker {
    microphone: MicrophonePermission,
    availability: Availability,
    watching_changes: bool,
    query_attempted: bool,
}

impl PermissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn microphone(&self) -> MicrophonePermission {
        self.microphone
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn set_availability(&mut self, availability: Availability) {
        self.availability = availability;
    }

    pub fn is_watching(&self) -> bool {
        self.watching_changes
    }

    pub fn mark_query_attempted(&mut self) {
        self.query_attempted = true;
    }

    /// First answer from the host query. Registers the change subscription.
    pub fn resolve(&mut self, state: MicrophonePermission) -> PermissionEffect {
        self.watching_changes = true;
        self.apply(state)
    }

    /// The host query threw or is missing; the check is deferred to first use.
    pub fn query_unavailable(&mut self) {
        self.microphone = MicrophonePermission::Unknown;
        self.watching_changes = false;
    }

    /// Change notification. Ignored until the subscription exists.
    pub fn change(&mut self, state: MicrophonePermission) -> PermissionEffect {
        if !self.watching_changes {
            return PermissionEffect::None;
        }
        self.apply(state)
    }

    /// A recognition session reported that access was refused.
    pub fn deny(&mut self) {
        self.microphone = MicrophonePermission::Denied;
    }

    pub fn snapshot(&self) -> PermissionSnapshot {
        let message = match (self.availability, self.microphone) {
            (Availability::Unsupported, _) => Some(UNSUPPORTED_LABEL.to_string()),
            (Availability::InsecureContext, _) => Some(INSECURE_LABEL.to_string()),
            (_, MicrophonePermission::Denied) => Some(DENIED_LABEL.to_string()),
            (Availability::Ready, MicrophonePermission::Unknown) if self.query_attempted => {
                Some("Microphone permission will be requested on first use.".to_string())
            }
            _ => None,
        };
        PermissionSnapshot {
            microphone: self.microphone,
            availability: self.availability,
            watching_changes: self.watching_changes,
            message,
        }
    }

    fn apply(&mut self, state: MicrophonePermission) -> PermissionEffect {
        match state {
            MicrophonePermission::Granted => {
                self.microphone = MicrophonePermission::Granted;
                PermissionEffect::Granted
            }
            MicrophonePermission::Denied => {
                self.microphone = MicrophonePermission::Denied;
                PermissionEffect::Denied
            }
            MicrophonePermission::Unknown => PermissionEffect::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> Vec<String> {
        vec!["localhost".to_string(), "127.0.0.1".to_string()]
    }

    #[test]
    fn missing_recognition_wins_over_origin_checks() {
        let env = HostEnvironment::new("http:", "example.com", false);
        assert_eq!(
            assess_environment(false, &env, &loopback()),
            Availability::Unsupported
        );
    }

    #[test]
    fn plain_http_on_remote_host_is_insecure() {
        let env = HostEnvironment::new("http:", "192.168.1.20", false);
        assert_eq!(
            assess_environment(true, &env, &loopback()),
            Availability::InsecureContext
        );
        assert_eq!(
            Availability::InsecureContext.disabled_label(),
            Some(INSECURE_LABEL)
        );
    }

    #[test]
    fn loopback_https_or_secure_flag_is_accepted() {
        for env in [
            HostEnvironment::new("http:", "localhost", false),
            HostEnvironment::new("http:", "127.0.0.1", false),
            HostEnvironment::new("https:", "example.com", false),
            HostEnvironment::new("http:", "example.com", true),
        ] {
            assert_eq!(assess_environment(true, &env, &loopback()), Availability::Ready);
        }
    }

    #[test]
    fn host_state_strings_map_to_permission() {
        assert_eq!(
            MicrophonePermission::from_host_state("granted"),
            MicrophonePermission::Granted
        );
        assert_eq!(
            MicrophonePermission::from_host_state("DENIED"),
            MicrophonePermission::Denied
        );
        assert_eq!(
            MicrophonePermission::from_host_state("prompt"),
            MicrophonePermission::Unknown
        );
    }

    #[test]
    fn changes_before_resolution_are_ignored() {
        let mut tracker = PermissionTracker::new();
        assert_eq!(
            tracker.change(MicrophonePermission::Denied),
            PermissionEffect::None
        );
        assert_eq!(tracker.microphone(), MicrophonePermission::Unknown);

        assert_eq!(
            tracker.resolve(MicrophonePermission::Granted),
            PermissionEffect::Granted
        );
        assert_eq!(
            tracker.change(MicrophonePermission::Denied),
            PermissionEffect::Denied
        );
        assert_eq!(tracker.microphone(), MicrophonePermission::Denied);
    }

    #[test]
    fn prompt_change_keeps_previous_state() {
        let mut tracker = PermissionTracker::new();
        tracker.resolve(MicrophonePermission::Denied);
        assert_eq!(
            tracker.change(MicrophonePermission::Unknown),
            PermissionEffect::None
        );
        assert_eq!(tracker.microphone(), MicrophonePermission::Denied);
    }

    #[test]
    fn snapshot_explains_deferred_check() {
        let mut tracker = PermissionTracker::new();
        tracker.set_availability(Availability::Ready);
        tracker.mark_query_attempted();
        tracker.query_unavailable();
        let snapshot = tracker.snapshot();
        assert!(!snapshot.watching_changes);
        assert!(snapshot
            .message
            .is_some_and(|message| message.contains("first use")));
    }
}
