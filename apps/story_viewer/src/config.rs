use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSettings {
    pub server_url: String,
    pub request_timeout_seconds: u64,
    pub log_filter: String,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            request_timeout_seconds: 10,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_seconds: Option<u64>,
    log_filter: Option<String>,
}

pub fn load_settings(config_path: &Path) -> ViewerSettings {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment overrides.
pub fn load_settings_with(
    config_path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ViewerSettings {
    let mut settings = ViewerSettings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.server_url {
                    settings.server_url = v;
                }
                if let Some(v) = file_cfg.request_timeout_seconds {
                    settings.request_timeout_seconds = v;
                }
                if let Some(v) = file_cfg.log_filter {
                    settings.log_filter = v;
                }
            }
            Err(err) => warn!(
                "config: ignoring unreadable settings file path={}: {err}",
                config_path.display()
            ),
        }
    }

    if let Some(v) = env("STORY_VIEWER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings.request_timeout_seconds = settings.request_timeout_seconds.max(1);
    settings
}
