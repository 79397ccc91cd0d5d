use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use thiserror::Error;
use url::Url;

const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("api url '{0}' must use http or https")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub banner_dismiss_ms: u64,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5050/api".into(),
            request_timeout_secs: 10,
            banner_dismiss_ms: 2000,
            session_file: None,
        }
    }
}

impl ClientSettings {
    /// Parses `api_url`, dropping any trailing slash so route paths can be appended.
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            source,
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::UnsupportedScheme(self.api_url.clone()));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn banner_dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.banner_dismiss_ms)
    }

    fn apply_file_table(&mut self, file_cfg: &HashMap<String, String>) {
        if let Some(v) = file_cfg.get("api_url") {
            self.api_url = v.clone();
        }
        if let Some(parsed) = file_cfg
            .get("request_timeout_secs")
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.request_timeout_secs = parsed;
        }
        if let Some(parsed) = file_cfg
            .get("banner_dismiss_ms")
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.banner_dismiss_ms = parsed;
        }
        if let Some(v) = file_cfg.get("session_file") {
            self.session_file = Some(PathBuf::from(v));
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("APP__API_URL") {
            self.api_url = v;
        }
        if let Some(parsed) =
            var("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            self.request_timeout_secs = parsed;
        }
        if let Some(parsed) = var("APP__BANNER_DISMISS_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.banner_dismiss_ms = parsed;
        }
        if let Some(v) = var("APP__SESSION_FILE") {
            self.session_file = Some(PathBuf::from(v));
        }
    }
}

/// Loads settings from defaults, then `client.toml`, then the environment.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => settings.apply_file_table(&file_cfg),
            Err(err) => tracing::warn!("config: ignoring unreadable {SETTINGS_FILE}: {err}"),
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}
