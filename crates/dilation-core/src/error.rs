//! Error types for the dilation engine.
//!
//! Almost nothing in the core is an error: connection loss, reconnects, and
//! out-of-order events are ordinary inputs, and unexpected events for a
//! state are absorbed. What remains is the small set of conditions that end
//! the session.

use dilation_proto::{Mood, ProtocolError, Side};
use thiserror::Error;

/// Fatal conditions surfaced to the shell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DilationError {
    /// Both peers presented the same side at role election.
    ///
    /// Sides are 8 random bytes, so this means a reflected message or a
    /// broken peer, not bad luck. The engine stops.
    #[error("sides are equal ({side}): cannot elect a leader")]
    SidesEqual {
        /// The identical side value both peers presented.
        side: Side,
    },

    /// A control frame failed to decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl DilationError {
    /// The rendezvous close mood for this failure.
    ///
    /// All core failures are `errory`; `scary` belongs to cryptographic
    /// failures in the surrounding transport, which the core never sees.
    #[must_use]
    pub const fn mood(&self) -> Mood {
        match self {
            Self::SidesEqual { .. } | Self::Protocol(_) => Mood::Errory,
        }
    }
}
