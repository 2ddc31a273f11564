pub mod audio;
pub mod hotkey;
pub mod host;
pub mod notice;
pub mod permissions;
pub mod progress;
pub mod recognition;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod telemetry;
pub mod transcript;
pub mod ui;

pub use runtime::{PageEvent, PageHooks, PageRuntime, PageSnapshot};
pub use settings::VoiceInputSettings;
pub use state::{VoiceInputController, VoiceInputSnapshot};
