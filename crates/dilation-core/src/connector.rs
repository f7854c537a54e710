//! Connector state machine.
//!
//! One Connector drives one connection attempt: it publishes our hints,
//! turns the peer's hints into candidate dials, routes freshly-handshaken
//! candidates through the L2 machine for key confirmation, and commits to a
//! single winner.
//!
//! The Connector does not rank candidates. When several complete their key
//! confirmation close together, whichever `Accept` the shell queues first
//! wins; the state change to `Connected` makes later `Accept`s fall into
//! the absorb-and-ignore path.

use dilation_proto::ConnectionHint;

use crate::candidate::Candidate;

/// Connector states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// Racing candidates.
    Connecting,
    /// A winner has been selected.
    Connected,
    /// Terminal.
    Stopped,
}

/// Input events for the Connector.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorInput {
    /// The shell bound a local listener and can accept incoming candidates.
    ListenerReady {
        /// The listener's dialable endpoints, to advertise to the peer.
        hints: Vec<ConnectionHint>,
    },
    /// A candidate completed its key confirmation and is viable.
    Accept {
        /// The viable candidate.
        candidate: Candidate,
    },
    /// A candidate arrived from the local listener.
    AddCandidate {
        /// The new candidate.
        candidate: Candidate,
    },
    /// Peer hints arrived via the control plane.
    GotHints {
        /// The peer's endpoints.
        hints: Vec<ConnectionHint>,
    },
    /// An operator-configured transit relay should be used and published.
    AddRelay {
        /// The relay endpoints.
        hints: Vec<ConnectionHint>,
    },
    /// Tear down the attempt.
    Stop,
}

/// Output commands from the Connector.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorOutput {
    /// Broadcast these hints to the peer over the rendezvous channel.
    PublishHints {
        /// The hints to advertise.
        hints: Vec<ConnectionHint>,
    },
    /// Promote this candidate and cancel all other in-flight attempts.
    SelectAndStopRemaining {
        /// The winner.
        candidate: Candidate,
    },
    /// Route this candidate through the L2 machine for key confirmation.
    Consider {
        /// The candidate to consider.
        candidate: Candidate,
    },
    /// Dial these peer hints as new candidate attempts.
    UseHints {
        /// The endpoints to dial.
        hints: Vec<ConnectionHint>,
    },
    /// Abort all candidate activity and free resources.
    StopEverything,
}

/// The Connector state machine. One instance per connection race.
#[derive(Debug, Clone)]
pub struct Connector {
    state: ConnectorState,
}

impl Connector {
    /// Create a Connector in [`ConnectorState::Connecting`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: ConnectorState::Connecting }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Process one input event.
    pub fn step(&mut self, input: ConnectorInput) -> Vec<ConnectorOutput> {
        use ConnectorInput as In;
        use ConnectorOutput as Out;
        use ConnectorState as St;

        let current = self.state;
        let (next, outputs) = match (current, input) {
            (St::Connecting, In::ListenerReady { hints }) => {
                (St::Connecting, vec![Out::PublishHints { hints }])
            },
            (St::Connecting, In::Accept { candidate }) => {
                (St::Connected, vec![Out::SelectAndStopRemaining { candidate }])
            },
            (St::Connecting, In::AddCandidate { candidate }) => {
                (St::Connecting, vec![Out::Consider { candidate }])
            },
            (St::Connecting, In::GotHints { hints }) => {
                (St::Connecting, vec![Out::UseHints { hints }])
            },
            // Use the relay ourselves, and advertise it so the peer does too.
            (St::Connecting, In::AddRelay { hints }) => (
                St::Connecting,
                vec![Out::UseHints { hints: hints.clone() }, Out::PublishHints { hints }],
            ),
            (St::Connecting | St::Connected, In::Stop) => {
                (St::Stopped, vec![Out::StopEverything])
            },

            (state, event) => {
                tracing::trace!(?state, ?event, "connector absorbing event");
                (state, vec![])
            },
        };

        if next != current {
            tracing::debug!(from = ?current, to = ?next, "connector transition");
        }
        self.state = next;

        outputs
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}
