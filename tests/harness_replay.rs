use std::{
    fs,
    path::PathBuf,
    process::Command,
    time::{SystemTime, UNIX_EPOCH},
};

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("speechhook-harness-{tag}-{nanos}"));
    fs::create_dir_all(&dir).expect("scratch dir should be created");
    dir
}

fn run_harness(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_speechhook_harness"))
        .args(args)
        .env_remove("SPEECHHOOK_TRACE_LOG")
        .output()
        .expect("harness should launch")
}

fn read_report(path: &PathBuf) -> serde_json::Value {
    let raw = fs::read_to_string(path).expect("report should be written");
    serde_json::from_str(&raw).expect("report should be JSON")
}

const CLICK_ONLY: &str = r#"{
  "environment": { "secureContext": true, "protocol": "https:", "hostname": "chat.example.com" },
  "steps": [ { "type": "click" } ]
}"#;

#[test]
fn script_without_settings_loads_the_settings_file() {
    let dir = scratch_dir("settings-flag");
    let script = dir.join("script.json");
    let settings = dir.join("voice-input.json");
    let report = dir.join("report.json");
    fs::write(&script, CLICK_ONLY).expect("script should be written");
    fs::write(&settings, r#"{"locale": "fr-FR"}"#).expect("settings should be written");

    let output = run_harness(&[
        script.to_str().expect("utf-8 path"),
        "--settings",
        settings.to_str().expect("utf-8 path"),
        "--out",
        report.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "harness failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = read_report(&report);
    assert_eq!(report["recognizer"]["configs"][0]["locale"], "fr-FR");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn inline_settings_take_precedence_over_the_settings_file() {
    let dir = scratch_dir("inline-settings");
    let script = dir.join("script.json");
    let settings = dir.join("voice-input.json");
    let report = dir.join("report.json");
    fs::write(
        &script,
        r#"{
  "environment": { "secureContext": true, "protocol": "https:", "hostname": "chat.example.com" },
  "settings": { "locale": "en-GB" },
  "steps": [ { "type": "click" } ]
}"#,
    )
    .expect("script should be written");
    fs::write(&settings, r#"{"locale": "fr-FR"}"#).expect("settings should be written");

    let output = run_harness(&[
        script.to_str().expect("utf-8 path"),
        "--settings",
        settings.to_str().expect("utf-8 path"),
        "--out",
        report.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let report = read_report(&report);
    assert_eq!(report["recognizer"]["configs"][0]["locale"], "en-GB");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_settings_file_falls_back_to_defaults() {
    let dir = scratch_dir("missing-settings");
    let script = dir.join("script.json");
    let report = dir.join("report.json");
    fs::write(&script, CLICK_ONLY).expect("script should be written");

    let output = run_harness(&[
        script.to_str().expect("utf-8 path"),
        "--settings",
        dir.join("absent.json").to_str().expect("utf-8 path"),
        "--out",
        report.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let report = read_report(&report);
    assert_eq!(report["recognizer"]["configs"][0]["locale"], "en-US");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_settings_file_fails_the_replay() {
    let dir = scratch_dir("bad-settings");
    let script = dir.join("script.json");
    let settings = dir.join("voice-input.json");
    fs::write(&script, CLICK_ONLY).expect("script should be written");
    fs::write(&settings, "{ not json").expect("settings should be written");

    let output = run_harness(&[
        script.to_str().expect("utf-8 path"),
        "--settings",
        settings.to_str().expect("utf-8 path"),
        "--out",
        dir.join("report.json").to_str().expect("utf-8 path"),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed loading settings"));
    let _ = fs::remove_dir_all(&dir);
}
