use serde::{Deserialize, Serialize};
use speechhook_core_lib::{
    audio::{PlaybackController, RecordingStopButton, StopButtonDisplay},
    host::{RecognizerLog, ScriptedHost, ScriptedPermissions, ScriptedRecognizer, SurfaceState},
    permissions::HostEnvironment,
    progress::{ProgressCall, ProgressIndicator, RecordingProgressBar},
    runtime::{PageEvent, PageHooks, PageRuntime, PageSnapshot},
    settings::{SettingsStore, VoiceInputSettings},
    state::VoiceInputController,
    telemetry::init_tracing,
};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReplayScript {
    environment: HostEnvironment,
    recognition_available: bool,
    permissions_supported: bool,
    /// Inline settings; when absent they are loaded from the settings store.
    settings: Option<VoiceInputSettings>,
    steps: Vec<ScriptStep>,
}

impl Default for ReplayScript {
    fn default() -> Self {
        Self {
            environment: HostEnvironment::default(),
            recognition_available: true,
            permissions_supported: true,
            settings: None,
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptStep {
    Sleep {
        #[serde(rename = "sleepMs")]
        sleep_ms: u64,
    },
    Event(PageEvent),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayReport {
    script: String,
    steps: usize,
    page: PageSnapshot,
    surface: SurfaceState,
    recognizer: RecognizerLog,
    permission_queries: Vec<String>,
    unlock_attempts: usize,
    stop_button: Vec<StopButtonDisplay>,
    progress: Vec<ProgressCall>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("speechhook harness failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    let script_path = args
        .get(1)
        .filter(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| "usage: speechhook_harness <script.json> [--out <report.json>] [--settings <settings.json>] [--trace]".to_string())?;
    let output_path = parse_arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(&script_path));
    init_tracing(args.iter().any(|arg| arg == "--trace"));

    let raw = fs::read_to_string(&script_path)
        .map_err(|err| format!("failed reading script {}: {err}", script_path.display()))?;
    let mut script: ReplayScript =
        serde_json::from_str(&raw).map_err(|err| format!("failed parsing script: {err}"))?;
    let settings = match script.settings.take() {
        Some(settings) => settings,
        None => load_settings(parse_arg_value(&args, "--settings").map(Path::new))?,
    };

    let report = replay(&script_path, script, settings).await?;
    write_json_report(&output_path, &report)?;
    println!("replay report written to {}", output_path.display());
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<VoiceInputSettings, String> {
    let store = SettingsStore::at_or_default(path)
        .map_err(|err| format!("failed locating settings: {err}"))?;
    let settings = store
        .load()
        .map_err(|err| format!("failed loading settings: {err}"))?;
    println!("settings loaded from {}", store.path().display());
    Ok(settings)
}

async fn replay(
    script_path: &PathBuf,
    script: ReplayScript,
    settings: VoiceInputSettings,
) -> Result<ReplayReport, String> {
    let host = ScriptedHost {
        recognizer: if script.recognition_available {
            ScriptedRecognizer::new()
        } else {
            ScriptedRecognizer::unavailable()
        },
        permissions: script
            .permissions_supported
            .then(ScriptedPermissions::new),
        environment: script.environment,
        ..ScriptedHost::new()
    };
    let settings = settings.clamped();
    let tick = Duration::from_millis(settings.tick_interval_ms);
    let stop_button = RecordingStopButton::new();
    let progress_bar = RecordingProgressBar::new();

    let progress = ProgressIndicator::new(Box::new(progress_bar.clone()), &settings.progress);
    let voice = VoiceInputController::new(host.voice_host(), settings);
    let hooks = PageHooks::new(voice)
        .with_playback(PlaybackController::new(Some(Box::new(stop_button.clone()))))
        .with_progress(progress);

    let runtime = PageRuntime::spawn(hooks, tick);
    let steps = script.steps.len();
    for step in script.steps {
        match step {
            ScriptStep::Sleep { sleep_ms } => {
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
            }
            ScriptStep::Event(event) => runtime
                .send(event)
                .map_err(|err| format!("failed delivering event: {err}"))?,
        }
    }
    let page = runtime
        .shutdown()
        .await
        .map_err(|err| format!("page runtime failed: {err}"))?;

    Ok(ReplayReport {
        script: script_path.display().to_string(),
        steps,
        page,
        surface: host.surface.state(),
        recognizer: host.recognizer.log(),
        permission_queries: host
            .permissions
            .as_ref()
            .map(ScriptedPermissions::queries)
            .unwrap_or_default(),
        unlock_attempts: host.unlocker.attempts().len(),
        stop_button: stop_button.history(),
        progress: progress_bar.calls(),
    })
}

fn parse_arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == key)
        .and_then(|idx| args.get(idx + 1))
        .map(String::as_str)
}

fn default_output_path(script_path: &PathBuf) -> PathBuf {
    script_path.with_extension("report.json")
}

fn write_json_report<T: serde::Serialize>(path: &PathBuf, report: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("failed creating output dir: {err}"))?;
        }
    }
    let data = serde_json::to_string_pretty(report)
        .map_err(|err| format!("failed serializing report: {err}"))?;
    fs::write(path, data).map_err(|err| format!("failed writing report: {err}"))?;
    Ok(())
}
