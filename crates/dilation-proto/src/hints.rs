//! Connection hints.
//!
//! A hint is one dialable endpoint a peer advertises: a kind discriminator,
//! a relative priority, and a host/port pair. The shell discovers local
//! hints from its listeners; the Connector turns remote hints into candidate
//! connection attempts.

use serde::{Deserialize, Serialize};

/// Hint kind for a directly dialable TCP endpoint.
pub const DIRECT_TCP_V1: &str = "direct-tcp-v1";

/// Hint kind for a transit relay endpoint.
pub const RELAY_V1: &str = "relay-v1";

/// One dialable endpoint advertised over the control plane.
///
/// Higher priority hints should be attempted first, but prioritization is
/// advisory: the candidate race is won by whichever attempt completes its
/// key confirmation first, not by the highest-priority hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionHint {
    /// Hint kind, e.g. `direct-tcp-v1` or `relay-v1`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Relative priority; higher is preferred.
    pub priority: f64,

    /// Hostname or address to dial.
    pub hostname: String,

    /// TCP port to dial.
    pub port: u16,
}

impl ConnectionHint {
    /// A `direct-tcp-v1` hint.
    #[must_use]
    pub fn direct(hostname: impl Into<String>, port: u16, priority: f64) -> Self {
        Self { kind: DIRECT_TCP_V1.to_string(), priority, hostname: hostname.into(), port }
    }

    /// A `relay-v1` hint.
    #[must_use]
    pub fn relay(hostname: impl Into<String>, port: u16, priority: f64) -> Self {
        Self { kind: RELAY_V1.to_string(), priority, hostname: hostname.into(), port }
    }

    /// Whether this hint points at a transit relay rather than a peer.
    #[must_use]
    pub fn is_relay(&self) -> bool {
        self.kind == RELAY_V1
    }
}
