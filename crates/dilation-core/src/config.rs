//! Engine configuration.

use dilation_proto::{ConnectionHint, Side};

/// Configuration for one dilation engine.
///
/// Relay hints are per-engine rather than a process-wide default: two
/// engines in one process may legitimately use different relays.
#[derive(Debug, Clone, PartialEq)]
pub struct DilationConfig {
    /// Dilation protocol versions we can speak.
    pub versions: Vec<String>,

    /// Side override, mainly for tests. When `None`, the engine generates
    /// 8 random bytes through its environment.
    pub side: Option<Side>,

    /// Operator-configured transit relays, fed to the Connector as
    /// `AddRelay` so they are both dialed and republished to the peer.
    pub relay_hints: Vec<ConnectionHint>,
}

impl Default for DilationConfig {
    fn default() -> Self {
        Self { versions: vec!["1".to_string()], side: None, relay_hints: Vec::new() }
    }
}

impl DilationConfig {
    /// A config with a fixed side, for tests and deterministic setups.
    #[must_use]
    pub fn with_side(side: Side) -> Self {
        Self { side: Some(side), ..Self::default() }
    }
}
