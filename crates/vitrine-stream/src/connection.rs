//! The store event connection and its HTTP transport task.

use crate::backoff::{Backoff, BackoffConfig};
use crate::error::StreamError;
use crate::feed::{EnvelopeFeed, Push, Received};
use crate::sse::SseDecoder;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;
use vitrine_types::StoreId;

/// Default number of envelopes buffered between transport and consumer.
const DEFAULT_BUFFER: usize = 256;

/// Timeout for establishing the TCP/TLS connection. The stream itself has no
/// overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one store event connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base URL of the event service; the store path is appended to it.
    pub base_url: Url,
    /// Store whose channel to join.
    pub store_id: StoreId,
    /// Bearer token. `None` opens an unauthenticated connection.
    pub token: Option<String>,
    /// Reconnect policy.
    pub backoff: BackoffConfig,
    /// Capacity of the envelope buffer.
    pub buffer: usize,
}

impl StreamConfig {
    /// Creates a configuration with no token and default backoff.
    pub fn new(base_url: Url, store_id: StoreId) -> Self {
        Self {
            base_url,
            store_id,
            token: None,
            backoff: BackoffConfig::default(),
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Sets the bearer token. Blank tokens are treated as absent.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Sets the reconnect policy.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns `{base_url}/stores/{store_id}/events`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::CannotBeABase`] if the base URL has no path.
    pub fn endpoint(&self) -> Result<Url, StreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StreamError::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["stores", self.store_id.as_str(), "events"]);
        Ok(url)
    }
}

/// A store's live event connection.
///
/// Envelopes are yielded in arrival order, each exactly once. Dropping the
/// connection stops the transport task.
#[derive(Debug)]
pub struct StreamConnection {
    rx: mpsc::Receiver<Received>,
    task: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Creates an in-process connection fed through the returned [`EnvelopeFeed`].
    pub fn channel(capacity: usize) -> (EnvelopeFeed, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EnvelopeFeed::new(tx), Self { rx, task: None })
    }

    /// Opens the HTTP event stream for `config.store_id` and starts the
    /// transport task. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] if the endpoint URL cannot be built or the HTTP
    /// client cannot be constructed. Network failures are not errors here;
    /// they are retried by the transport task.
    pub fn open(config: StreamConfig) -> Result<Self, StreamError> {
        let endpoint = config.endpoint()?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let (feed, mut connection) = Self::channel(config.buffer);
        let transport = Transport {
            client,
            endpoint,
            token: config.token,
            backoff: Backoff::new(config.backoff),
            last_event_id: None,
        };
        connection.task = Some(tokio::spawn(transport.run(feed)));
        Ok(connection)
    }

    /// Waits for the next envelope. Returns `None` once the connection is closed.
    pub async fn next(&mut self) -> Option<Received> {
        self.rx.recv().await
    }

    /// Closes the connection and stops the transport task.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// How a connected session ended.
enum SessionEnd {
    /// The server closed the body.
    Eof,
    /// The consumer went away.
    ConsumerGone,
}

struct Transport {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
    backoff: Backoff,
    last_event_id: Option<String>,
}

impl Transport {
    async fn run(mut self, mut feed: EnvelopeFeed) {
        tracing::info!(endpoint = %self.endpoint, authenticated = self.token.is_some(), "starting event stream");

        loop {
            match self.connect().await {
                Ok(response) => {
                    tracing::info!(endpoint = %self.endpoint, "event stream connected");
                    self.backoff.reset();
                    match self.pump(response, &mut feed).await {
                        Ok(SessionEnd::ConsumerGone) => break,
                        Ok(SessionEnd::Eof) => {
                            tracing::warn!(endpoint = %self.endpoint, "event stream closed by server");
                        }
                        Err(e) => {
                            tracing::warn!(endpoint = %self.endpoint, error = %e, "event stream interrupted");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(endpoint = %self.endpoint, error = %e, "event stream connection failed");
                }
            }

            if feed.is_closed() {
                break;
            }
            let delay = self.backoff.next_delay();
            tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting event stream");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = feed.closed() => break,
            }
        }

        tracing::info!(endpoint = %self.endpoint, "event stream stopped");
    }

    async fn connect(&self) -> Result<reqwest::Response, StreamError> {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(id) = &self.last_event_id {
            request = request.header("Last-Event-ID", id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with("text/event-stream") {
                return Err(StreamError::ContentType(content_type.to_string()));
            }
        }
        Ok(response)
    }

    async fn pump(
        &mut self,
        response: reqwest::Response,
        feed: &mut EnvelopeFeed,
    ) -> Result<SessionEnd, StreamError> {
        let mut decoder = SseDecoder::resume(self.last_event_id.clone());
        let mut body = std::pin::pin!(response.bytes_stream());

        loop {
            let chunk = tokio::select! {
                chunk = body.next() => chunk,
                () = feed.closed() => return Ok(SessionEnd::ConsumerGone),
            };
            let Some(chunk) = chunk else {
                return Ok(SessionEnd::Eof);
            };

            let frames = decoder.feed(&chunk?);
            self.absorb_controls(&mut decoder);
            for frame in frames {
                if feed.push_frame(&frame).await == Push::Closed {
                    return Ok(SessionEnd::ConsumerGone);
                }
            }
        }
    }

    /// Applies the server's `retry:` hint and remembers the last event id for
    /// the next reconnect, including those sent on frames without data.
    fn absorb_controls(&mut self, decoder: &mut SseDecoder) {
        if let Some(retry) = decoder.take_retry() {
            tracing::debug!(retry_ms = retry.as_millis() as u64, "server set reconnect delay");
            self.backoff.set_initial(retry);
        }
        self.last_event_id = decoder.last_event_id().map(str::to_string);
    }
}
