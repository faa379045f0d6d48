//! Watcher configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;

/// Top-level watcher configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Event stream settings.
    #[serde(default)]
    pub stream: StreamSection,

    /// Product API settings.
    #[serde(default)]
    pub api: ApiSection,

    /// Reconnect backoff settings.
    #[serde(default)]
    pub backoff: BackoffSection,

    /// Live view settings.
    #[serde(default)]
    pub view: ViewSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event stream connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSection {
    /// Base URL of the event service.
    #[serde(default = "default_stream_url")]
    pub base_url: String,

    /// Store to watch. Required at startup.
    #[serde(default)]
    pub store_id: Option<String>,

    /// Bearer token for the stream and the product API.
    #[serde(default)]
    pub token: Option<String>,

    /// Envelopes buffered between transport and view.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

/// Product API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    /// Base URL of the product API.
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

/// Reconnect backoff settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSection {
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Whether to randomise reconnect delays.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

/// Live view settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewSection {
    /// Initial category filter for the product list.
    #[serde(default)]
    pub category_id: Option<String>,

    /// How long a viewed product stays highlighted.
    #[serde(default = "default_highlight_ttl_secs")]
    pub highlight_ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vitrine_stream=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_stream_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_buffer() -> usize {
    256
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_highlight_ttl_secs() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            base_url: default_stream_url(),
            store_id: None,
            token: None,
            buffer: default_buffer(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
        }
    }
}

impl Default for BackoffSection {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            jitter: true,
        }
    }
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            category_id: None,
            highlight_ttl_secs: default_highlight_ttl_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VITRINE_STREAM_URL` overrides `stream.base_url`
/// - `VITRINE_STORE_ID` overrides `stream.store_id`
/// - `VITRINE_TOKEN` overrides `stream.token`
/// - `VITRINE_API_URL` overrides `api.base_url`
/// - `VITRINE_CATEGORY_ID` overrides `view.category_id`
/// - `VITRINE_LOG_LEVEL` overrides `logging.level`
/// - `VITRINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("VITRINE_STREAM_URL") {
        config.stream.base_url = url;
    }
    if let Some(store_id) = var("VITRINE_STORE_ID") {
        config.stream.store_id = Some(store_id);
    }
    if let Some(token) = var("VITRINE_TOKEN") {
        config.stream.token = Some(token);
    }
    if let Some(url) = var("VITRINE_API_URL") {
        config.api.base_url = url;
    }
    if let Some(category_id) = var("VITRINE_CATEGORY_ID") {
        config.view.category_id = Some(category_id);
    }
    if let Some(level) = var("VITRINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VITRINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
