//! JSON trace logging for the harness and host embedders.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{fmt::time::UtcTime, EnvFilter};

const TRACE_LOG_ENV: &str = "SPEECHHOOK_TRACE_LOG";
const FILTER_ENV: &str = "SPEECHHOOK_LOG";
const DEFAULT_FILTER: &str = "speechhook_core_lib=debug,info";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var(TRACE_LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("speechhook_trace.jsonl"))
}

/// Tracing is on when requested explicitly or when a filter is set in the environment.
pub fn tracing_enabled(requested: bool) -> bool {
    requested || env::var(FILTER_ENV).is_ok_and(|filter| !filter.trim().is_empty())
}

fn trace_filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_tracing_once(requested: bool, once: &OnceLock<()>) {
    if !tracing_enabled(requested) {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(trace_filter())
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn init_tracing(requested: bool) {
    init_tracing_once(requested, &TRACING_INIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn unique_trace_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("speechhook-trace-{suffix}-{nanos}.jsonl"))
    }

    #[test]
    fn tracing_log_path_prefers_env_override() {
        let _guard = env_lock().lock().expect("env lock");
        let path = unique_trace_path("env");
        env::set_var(TRACE_LOG_ENV, &path);
        assert_eq!(tracing_log_path(), path);
        env::remove_var(TRACE_LOG_ENV);
    }

    #[test]
    fn tracing_log_path_defaults_to_temp_dir() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var(TRACE_LOG_ENV);
        assert_eq!(
            tracing_log_path(),
            env::temp_dir().join("speechhook_trace.jsonl")
        );
    }

    #[test]
    fn filter_env_enables_tracing() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var(FILTER_ENV);
        assert!(!tracing_enabled(false));
        assert!(tracing_enabled(true));

        env::set_var(FILTER_ENV, "debug");
        assert!(tracing_enabled(false));
        env::set_var(FILTER_ENV, "  ");
        assert!(!tracing_enabled(false));
        env::remove_var(FILTER_ENV);
    }

    #[test]
    fn init_only_creates_file_when_enabled() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var(FILTER_ENV);

        let disabled_path = unique_trace_path("disabled");
        env::set_var(TRACE_LOG_ENV, &disabled_path);
        init_tracing_once(false, &OnceLock::new());
        assert!(!disabled_path.exists());

        let enabled_path = unique_trace_path("enabled");
        env::set_var(TRACE_LOG_ENV, &enabled_path);
        init_tracing_once(true, &OnceLock::new());
        assert!(enabled_path.exists());

        env::remove_var(TRACE_LOG_ENV);
        let _ = fs::remove_file(enabled_path);
    }
}
