use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

pub const SETTINGS_FILE: &str = "aligner.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub log_poll_interval: Duration,
    pub result_poll_interval: Duration,
    pub helper_poll_interval: Duration,
    pub helper_tail: u32,
    pub request_timeout: Duration,
    pub benchling_alignment_url_base: Option<String>,
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            log_poll_interval: Duration::from_millis(500),
            result_poll_interval: Duration::from_millis(1000),
            helper_poll_interval: Duration::from_millis(3000),
            helper_tail: 200,
            request_timeout: Duration::from_secs(30),
            benchling_alignment_url_base: None,
            download_dir: PathBuf::from("."),
        }
    }
}

/// Defaults, then `aligner.toml` in the working directory, then the environment.
pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_config(&mut settings, &raw);
    }
    apply_env(&mut settings, env);

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let table = match toml::from_str::<toml::Table>(raw) {
        Ok(table) => table,
        Err(err) => {
            warn!("ignoring malformed {SETTINGS_FILE}: {err}");
            return;
        }
    };
    let get = |key: &str| table.get(key).and_then(toml_scalar);

    if let Some(v) = get("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = get("log_poll_ms").and_then(|v| parse_millis(&v)) {
        settings.log_poll_interval = v;
    }
    if let Some(v) = get("result_poll_ms").and_then(|v| parse_millis(&v)) {
        settings.result_poll_interval = v;
    }
    if let Some(v) = get("helper_poll_ms").and_then(|v| parse_millis(&v)) {
        settings.helper_poll_interval = v;
    }
    if let Some(v) = get("helper_tail").and_then(|v| parse_positive(&v)) {
        settings.helper_tail = v;
    }
    if let Some(v) = get("request_timeout_secs").and_then(|v| parse_positive(&v)) {
        settings.request_timeout = Duration::from_secs(u64::from(v));
    }
    if let Some(v) = get("benchling_alignment_url_base") {
        settings.benchling_alignment_url_base = non_empty(v);
    }
    if let Some(v) = get("download_dir") {
        settings.download_dir = PathBuf::from(v);
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("ALIGNER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__LOG_POLL_MS").and_then(|v| parse_millis(&v)) {
        settings.log_poll_interval = v;
    }
    if let Some(v) = env("APP__RESULT_POLL_MS").and_then(|v| parse_millis(&v)) {
        settings.result_poll_interval = v;
    }
    if let Some(v) = env("APP__HELPER_POLL_MS").and_then(|v| parse_millis(&v)) {
        settings.helper_poll_interval = v;
    }
    if let Some(v) = env("APP__HELPER_TAIL").and_then(|v| parse_positive(&v)) {
        settings.helper_tail = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| parse_positive(&v)) {
        settings.request_timeout = Duration::from_secs(u64::from(v));
    }
    if let Some(v) = env("APP__BENCHLING_ALIGNMENT_URL_BASE") {
        settings.benchling_alignment_url_base = non_empty(v);
    }
    if let Some(v) = env("APP__DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }
}

fn toml_scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(v) => Some(v.clone()),
        toml::Value::Integer(v) => Some(v.to_string()),
        _ => None,
    }
}

fn parse_millis(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!(value = raw, "ignoring invalid poll interval");
            None
        }
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
