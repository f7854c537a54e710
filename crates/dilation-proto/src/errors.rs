//! Error types for the dilation wire layer.
//!
//! Decode failures are deliberately split three ways: an unknown `"type"` is
//! logged-and-discarded by callers, while malformed JSON and missing fields
//! are surfaced as protocol violations. Collapsing them into one variant
//! would force callers to string-match to tell the difference.

use thiserror::Error;

/// Errors produced while encoding or decoding control-plane frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame's `"type"` field names no known control frame.
    ///
    /// Receivers discard these without advancing any state machine.
    #[error("unknown frame type {0:?}")]
    UnknownFrameType(String),

    /// The frame is a JSON object but carries no `"type"` field.
    #[error("frame has no \"type\" field")]
    MissingFrameType,

    /// The frame is not well-formed JSON, or a known frame type is missing a
    /// required field.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Serialization failed.
    #[error("failed to encode frame: {0}")]
    EncodeFrame(String),

    /// A side identifier was not 16 lowercase hex characters.
    #[error("invalid side {0:?}: expected 16 lowercase hex characters")]
    InvalidSide(String),

    /// A mailbox phase was not of the form `dilate-<n>`.
    #[error("invalid dilation phase {0:?}")]
    InvalidPhase(String),

    /// The hex-encoded body of an `add` frame did not decode.
    #[error("invalid frame body: {0}")]
    InvalidBody(String),
}

/// Convenient Result alias for wire-layer operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
