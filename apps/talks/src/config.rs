use std::{fs, path::Path};

use client_core::ClientConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub ws_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4000/graphql".into(),
            ws_endpoint: None,
            api_key: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            ws_endpoint: self.ws_endpoint.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint: Option<String>,
    ws_endpoint: Option<String>,
    api_key: Option<String>,
    log_filter: Option<String>,
}

pub fn load_settings(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file, then environment overrides. Blank values
/// are ignored at every layer.
pub fn load_settings_from(raw_file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = non_blank(file_cfg.endpoint) {
                    settings.endpoint = v;
                }
                if let Some(v) = non_blank(file_cfg.ws_endpoint) {
                    settings.ws_endpoint = Some(v);
                }
                if let Some(v) = non_blank(file_cfg.api_key) {
                    settings.api_key = Some(v);
                }
                if let Some(v) = non_blank(file_cfg.log_filter) {
                    settings.log_filter = v;
                }
            }
            Err(err) => warn!(%err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = non_blank(env("TALKS_ENDPOINT")) {
        settings.endpoint = v;
    }
    if let Some(v) = non_blank(env("APP__ENDPOINT")) {
        settings.endpoint = v;
    }

    if let Some(v) = non_blank(env("TALKS_WS_ENDPOINT")) {
        settings.ws_endpoint = Some(v);
    }

    if let Some(v) = non_blank(env("TALKS_API_KEY")) {
        settings.api_key = Some(v);
    }
    if let Some(v) = non_blank(env("APP__API_KEY")) {
        settings.api_key = Some(v);
    }

    if let Some(v) = non_blank(env("TALKS_LOG")) {
        settings.log_filter = v;
    }

    settings
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
