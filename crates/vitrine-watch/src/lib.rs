//! Headless host for a store's live view.
//!
//! Turns a [`config::Config`] into a connected, mounted [`LiveView`] whose
//! notifications go to the log.

pub mod config;

use config::Config;
use std::time::Duration;
use thiserror::Error;
use url::Url;
use vitrine_live::{FetchError, HttpCatalog, LiveView, LiveViewDeps, TracingNotifier};
use vitrine_stream::{BackoffConfig, StreamConfig, StreamConnection, StreamError};
use vitrine_types::{CategoryId, StoreId};

/// Errors that prevent the watcher from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// No store id was configured.
    #[error("no store configured; set stream.store_id or VITRINE_STORE_ID")]
    MissingStore,

    /// A configured URL is invalid.
    #[error("invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },

    /// The event stream could not be opened.
    #[error("failed to open event stream: {0}")]
    Stream(#[from] StreamError),

    /// The product API client could not be built.
    #[error("failed to build product API client: {0}")]
    Catalog(#[from] FetchError),
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, StartupError> {
    Url::parse(value).map_err(|source| StartupError::InvalidUrl { field, source })
}

/// The configured store id, ignoring blank values.
///
/// # Errors
///
/// Returns [`StartupError::MissingStore`] if none is set.
pub fn store_id(config: &Config) -> Result<StoreId, StartupError> {
    config
        .stream
        .store_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(StoreId::from)
        .ok_or(StartupError::MissingStore)
}

/// Reconnect policy from the `[backoff]` section.
pub fn backoff_config(config: &Config) -> BackoffConfig {
    BackoffConfig {
        initial: Duration::from_millis(config.backoff.initial_ms),
        max: Duration::from_millis(config.backoff.max_ms),
        jitter: config.backoff.jitter,
        ..BackoffConfig::default()
    }
}

/// Stream connection settings for the configured store.
///
/// # Errors
///
/// Fails if the store id is missing or `stream.base_url` is invalid.
pub fn stream_config(config: &Config) -> Result<StreamConfig, StartupError> {
    let base_url = parse_url("stream.base_url", &config.stream.base_url)?;
    let mut stream = StreamConfig::new(base_url, store_id(config)?)
        .with_token(config.stream.token.clone())
        .with_backoff(backoff_config(config));
    stream.buffer = config.stream.buffer.max(1);
    Ok(stream)
}

/// View dependencies: log notifications and the HTTP product API.
///
/// # Errors
///
/// Fails if the store id is missing, `api.base_url` is invalid, or the HTTP
/// client cannot be built.
pub fn live_view_deps(
    config: &Config,
) -> Result<LiveViewDeps<TracingNotifier, HttpCatalog>, StartupError> {
    let api_url = parse_url("api.base_url", &config.api.base_url)?;
    let catalog = HttpCatalog::new(api_url, config.stream.token.clone())?;
    let category = config
        .view
        .category_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(CategoryId::from);

    let mut deps =
        LiveViewDeps::new(store_id(config)?, TracingNotifier, catalog).with_category(category);
    deps.highlight_ttl = Duration::from_secs(config.view.highlight_ttl_secs);
    Ok(deps)
}

/// Opens the store's event stream and mounts a live view over it.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`StartupError`] if the configuration is incomplete or invalid.
pub fn start(config: &Config) -> Result<LiveView, StartupError> {
    let stream = stream_config(config)?;
    let deps = live_view_deps(config)?;
    let endpoint = stream.endpoint()?;

    tracing::info!(
        store_id = %stream.store_id,
        %endpoint,
        authenticated = stream.token.is_some(),
        "starting live view"
    );

    let connection = StreamConnection::open(stream)?;
    Ok(LiveView::mount(connection, deps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(store: Option<&str>) -> Config {
        let mut config = Config::default();
        config.stream.store_id = store.map(str::to_string);
        config
    }

    #[test]
    fn store_id_is_required() {
        assert!(matches!(
            store_id(&config_for(None)),
            Err(StartupError::MissingStore)
        ));
        assert!(matches!(
            store_id(&config_for(Some("  "))),
            Err(StartupError::MissingStore)
        ));
        assert_eq!(
            store_id(&config_for(Some(" loja-1 "))).unwrap(),
            StoreId::from("loja-1")
        );
    }

    #[test]
    fn stream_config_carries_token_backoff_and_buffer() {
        let mut config = config_for(Some("loja-1"));
        config.stream.token = Some("tok".into());
        config.stream.buffer = 0;
        config.backoff.initial_ms = 100;
        config.backoff.max_ms = 2_000;
        config.backoff.jitter = false;

        let stream = stream_config(&config).unwrap();
        assert_eq!(stream.token.as_deref(), Some("tok"));
        assert_eq!(stream.buffer, 1);
        assert_eq!(stream.backoff.initial, Duration::from_millis(100));
        assert_eq!(stream.backoff.max, Duration::from_secs(2));
        assert!(!stream.backoff.jitter);
        assert_eq!(
            stream.endpoint().unwrap().as_str(),
            "http://127.0.0.1:8080/stores/loja-1/events"
        );
    }

    #[test]
    fn invalid_url_names_the_field() {
        let mut config = config_for(Some("loja-1"));
        config.stream.base_url = "not a url".into();

        match stream_config(&config) {
            Err(StartupError::InvalidUrl { field, .. }) => assert_eq!(field, "stream.base_url"),
            other => panic!("expected InvalidUrl, got {other:?}"),
        }
    }

    #[test]
    fn deps_use_category_and_ttl() {
        let mut config = config_for(Some("loja-1"));
        config.view.category_id = Some("c3".into());
        config.view.highlight_ttl_secs = 5;

        let deps = live_view_deps(&config).unwrap();
        assert_eq!(deps.store_id, StoreId::from("loja-1"));
        assert_eq!(deps.category, Some(CategoryId::from("c3")));
        assert_eq!(deps.highlight_ttl, Duration::from_secs(5));
    }
}
