//! Push-event connection to a store's live event channel.
//!
//! A [`StreamConnection`] owns one server-sent-events channel scoped to a
//! store and hands its consumer an ordered, append-only sequence of
//! [`Received`] envelopes. Every delivered envelope carries a sequence number
//! that grows by one per delivery, so a consumer can hold a cursor and never
//! act on the same envelope twice.
//!
//! Transport concerns stay inside this crate:
//!
//! - frames are decoded incrementally by [`SseDecoder`];
//! - malformed frames are dropped (logged at `debug`), never surfaced;
//! - connection failures and server hang-ups are retried with
//!   [`Backoff`] (exponential, equal jitter, honouring the server's `retry:`);
//! - envelopes the server replays after a reconnect are recognised by their
//!   SSE id and not delivered again.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vitrine_stream::{StreamConfig, StreamConnection};
//!
//! let config = StreamConfig::new(base_url, store_id).with_token(token);
//! let mut connection = StreamConnection::open(config)?;
//! while let Some(received) = connection.next().await {
//!     handle(received.seq, &received.envelope);
//! }
//! ```

mod backoff;
mod connection;
mod error;
mod feed;
mod sse;

pub use backoff::{Backoff, BackoffConfig};
pub use connection::{StreamConfig, StreamConnection};
pub use error::StreamError;
pub use feed::{EnvelopeFeed, Push, Received};
pub use sse::{SseDecoder, SseFrame};
