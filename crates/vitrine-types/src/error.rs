//! Error types for envelope parsing.

use thiserror::Error;

/// Reasons a push-event frame could not be turned into an [`crate::Envelope`].
///
/// These never escape the stream layer: a frame that fails to parse is
/// logged and dropped.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The frame body is not valid JSON.
    #[error("envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// A field required by the envelope's kind is absent or has the wrong type.
    #[error("envelope is missing required field `{0}`")]
    MissingField(&'static str),
}
