//! Error types for the event stream transport.

use thiserror::Error;

/// Errors raised while opening or reading a store's event stream.
///
/// Only [`StreamConnection::open`](crate::StreamConnection::open) returns
/// these to callers; inside the transport task they are logged and trigger
/// a reconnect.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("stream URL cannot be used as a base: {0}")]
    CannotBeABase(String),

    /// The HTTP request or body read failed.
    #[error("stream transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("stream endpoint returned status {0}")]
    Status(u16),

    /// The server answered with something other than an event stream.
    #[error("stream endpoint returned content type {0:?}, expected text/event-stream")]
    ContentType(String),
}
