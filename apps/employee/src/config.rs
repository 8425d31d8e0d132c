use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "employee.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub session_file: PathBuf,
    pub log_filter: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5678".into(),
            session_file: PathBuf::from("session.json"),
            log_filter: "info".into(),
            request_timeout_secs: 30,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file, then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
                    settings.api_url = v.to_string();
                }
                if let Some(v) = file_cfg.get("session_file").and_then(toml::Value::as_str) {
                    settings.session_file = PathBuf::from(v);
                }
                if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
                    settings.log_filter = v.to_string();
                }
                if let Some(v) = file_cfg
                    .get("request_timeout_secs")
                    .and_then(toml::Value::as_integer)
                    .and_then(|v| u64::try_from(v).ok())
                {
                    settings.request_timeout_secs = v;
                }
            }
            Err(err) => warn!("config: ignoring malformed '{}': {err}", path.display()),
        }
    }

    if let Some(v) = env("BILLED_API_URL").or_else(|| env("APP__API_URL")) {
        settings.api_url = v;
    }
    if let Some(v) = env("BILLED_SESSION_FILE").or_else(|| env("APP__SESSION_FILE")) {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}
