//! The JSON control-frame codec.
//!
//! Two layers cross the rendezvous channel during dilation:
//!
//! - [`ControlFrame`]: the decrypted control-plane messages the state
//!   machines consume (`please`, `connection-hints`, `reconnect`,
//!   `reconnecting`).
//! - [`AddFrame`]: the mailbox wrapper that carries an encrypted control
//!   payload under a `dilate-<n>` phase name.
//!
//! The codec is bidirectional and stateless. The `dilate-<n>` counter is
//! send-side sequence state owned by the shell, so [`AddFrame::wrap`] takes
//! the phase number as an argument.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    hints::ConnectionHint,
    side::Side,
};

/// Frame types this codec recognizes on the control plane.
const KNOWN_TYPES: [&str; 4] = ["please", "connection-hints", "reconnect", "reconnecting"];

/// Phase prefix for dilation mailbox messages.
const DILATE_PHASE_PREFIX: &str = "dilate-";

/// A decrypted dilation control-plane frame.
///
/// Discriminated on the wire by a kebab-case `"type"` field. The `please`
/// frame is how each peer learns the other's side; `connection-hints`
/// carries dialable endpoints; `reconnect`/`reconnecting` drive the
/// leader/follower reconnection dance after a connection loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlFrame {
    /// Request dilation and announce our side.
    Please {
        /// The sender's side identifier.
        side: Side,
    },

    /// Advertise dialable endpoints to the peer.
    ConnectionHints {
        /// The endpoints being advertised.
        #[serde(rename = "connection-hints")]
        hints: Vec<ConnectionHint>,
    },

    /// Leader asks the follower to abandon the current connection.
    Reconnect,

    /// Follower acknowledges the abandon; a new race may begin.
    Reconnecting,
}

impl ControlFrame {
    /// Serialize to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EncodeFrame`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::EncodeFrame(e.to_string()))
    }

    /// Parse a frame from wire bytes.
    ///
    /// Unknown frame types are reported distinctly from malformed frames so
    /// receivers can log-and-discard the former while treating the latter as
    /// protocol violations.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MalformedFrame`] if the bytes are not a JSON object
    ///   or a known frame is missing a required field
    /// - [`ProtocolError::MissingFrameType`] if there is no `"type"` field
    /// - [`ProtocolError::UnknownFrameType`] for an unrecognized `"type"`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

        let frame_type = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingFrameType)?
            .to_string();

        if !KNOWN_TYPES.contains(&frame_type.as_str()) {
            return Err(ProtocolError::UnknownFrameType(frame_type));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }
}

/// The mailbox wrapper for an encrypted dilation payload.
///
/// `{"type":"add","phase":"dilate-<n>","body":"<hex>"}` where `<n>` starts
/// at 0 and increases by one per message sent. The counter is shell state;
/// this type only formats and validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFrame {
    /// Always `"add"`.
    #[serde(rename = "type")]
    pub frame_type: String,

    /// The `dilate-<n>` phase name.
    pub phase: String,

    /// Hex-encoded encrypted payload.
    pub body: String,
}

impl AddFrame {
    /// Wrap an encrypted payload under the given phase number.
    #[must_use]
    pub fn wrap(payload: &[u8], phase: u64) -> Self {
        Self {
            frame_type: "add".to_string(),
            phase: format!("{DILATE_PHASE_PREFIX}{phase}"),
            body: hex::encode(payload),
        }
    }

    /// Serialize to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EncodeFrame`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::EncodeFrame(e.to_string()))
    }

    /// Parse a wrapper from wire bytes, validating the `"type"` field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] for bad JSON and
    /// [`ProtocolError::UnknownFrameType`] if the type is not `"add"`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let frame: Self = serde_json::from_slice(bytes)
            .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

        if frame.frame_type != "add" {
            return Err(ProtocolError::UnknownFrameType(frame.frame_type));
        }

        Ok(frame)
    }

    /// The phase number parsed out of `dilate-<n>`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPhase`] if the phase does not carry
    /// the `dilate-` prefix followed by a decimal number.
    pub fn phase_number(&self) -> Result<u64> {
        self.phase
            .strip_prefix(DILATE_PHASE_PREFIX)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ProtocolError::InvalidPhase(self.phase.clone()))
    }

    /// The decoded payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBody`] if the body is not valid hex.
    pub fn payload(&self) -> Result<Vec<u8>> {
        hex::decode(&self.body).map_err(|e| ProtocolError::InvalidBody(e.to_string()))
    }
}
