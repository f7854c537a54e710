//! Manager state machine.
//!
//! The Manager owns the top-level dilation lifecycle: it asks the peer to
//! dilate, triggers role election when the peer's side arrives, requests
//! connection races, and orchestrates the reconnect dance after a
//! connection loss.
//!
//! # State machine
//!
//! ```text
//! Waiting ──Start──> Wanting ──RxPlease──> Connecting ──ConnMade──> Connected
//!                                              ▲                     │  │
//!                                              │        LostLeader   │  │ LostFollower
//!                            RxReconnecting ───┤      (Flushing) <───┘  └──> (Lonely)
//!                                              │                              │
//!                            LostFollower ─────┤ <───────── RxReconnect ──────┘
//!                                          (Abandoning) <── RxReconnect ── Connected
//! ```
//!
//! Stop reaches `Stopped` from every state, through `Stopping` when a live
//! connection must be abandoned first. `Stopped` is absorbing.
//!
//! # Loss asymmetry
//!
//! Connection loss arrives as two distinct inputs because the two roles
//! react differently: the Leader drives reconnection (sends `reconnect`,
//! waits in Flushing for the follower's `reconnecting`), while the Follower
//! waits quietly in Lonely for the Leader's cue. The shell picks the input
//! matching the engine's elected role.

use dilation_proto::{ConnectionHint, ControlFrame, Side};

/// Manager lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Created, not yet started.
    Waiting,
    /// `please` sent, waiting for the peer's.
    Wanting,
    /// A connection race is in progress.
    Connecting,
    /// A selected L2 connection is live.
    Connected,
    /// Leader lost the connection and told the follower to reconnect;
    /// waiting for the follower's acknowledgment.
    Flushing,
    /// Follower lost the connection; waiting for the leader's cue.
    Lonely,
    /// Leader asked us to abandon the current connection.
    Abandoning,
    /// Shutting down, waiting for the connection to die.
    Stopping,
    /// Terminal.
    Stopped,
}

/// Input events for the Manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerInput {
    /// Begin dilation.
    Start,
    /// The peer's `please` frame arrived.
    RxPlease {
        /// The peer's side identifier.
        side: Side,
    },
    /// The Connector selected a winning candidate.
    ConnectionMade,
    /// The peer's `reconnecting` frame arrived.
    RxReconnecting,
    /// The peer's `reconnect` frame arrived.
    RxReconnect,
    /// The selected connection was lost; we are the Leader.
    ConnectionLostLeader,
    /// The selected connection was lost; we are the Follower.
    ConnectionLostFollower,
    /// The peer's `connection-hints` frame arrived.
    RxHints {
        /// The advertised endpoints.
        hints: Vec<ConnectionHint>,
    },
    /// Shut down.
    Stop,
}

/// Output commands from the Manager.
///
/// Commands are executed by the shell in the order emitted; in particular
/// `StopConnecting` must take effect before a `StartConnecting` that
/// follows it in the same list.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerOutput {
    /// Send our `please` frame over the rendezvous channel.
    SendPlease,
    /// Signal completion to the calling application.
    NotifyStopped,
    /// Invoke role election with the peer's side.
    ChooseRole {
        /// The side the peer announced.
        peer_side: Side,
    },
    /// Start a connection race, ignoring any stale message in flight.
    StartConnectingIgnoreMsg,
    /// Dial these peer hints as new candidate attempts.
    UseHints {
        /// The endpoints to dial.
        hints: Vec<ConnectionHint>,
    },
    /// Abort the current connection race.
    StopConnecting,
    /// Send a `reconnecting` frame to the peer.
    SendReconnecting,
    /// Start a connection race.
    StartConnecting,
    /// Send a `reconnect` frame to the peer.
    SendReconnect,
    /// Close the currently-selected L2 connection.
    AbandonConnection,
}

/// The Manager state machine.
///
/// A pure step function: one input event in, the next state and an ordered
/// list of commands out. Unexpected events for the current state are
/// absorbed without effect.
#[derive(Debug, Clone)]
pub struct Manager {
    state: ManagerState,
}

impl Manager {
    /// Create a Manager in [`ManagerState::Waiting`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: ManagerState::Waiting }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Whether the terminal state has been reached.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == ManagerState::Stopped
    }

    /// Force the terminal state after a protocol violation.
    ///
    /// No `NotifyStopped` is emitted; the violation itself is the signal
    /// the shell receives.
    pub(crate) fn abort(&mut self) {
        tracing::warn!(from = ?self.state, "manager aborting after protocol violation");
        self.state = ManagerState::Stopped;
    }

    /// Process one input event.
    pub fn step(&mut self, input: ManagerInput) -> Vec<ManagerOutput> {
        use ManagerInput as In;
        use ManagerOutput as Out;
        use ManagerState as St;

        let current = self.state;
        let (next, outputs) = match (current, input) {
            (St::Waiting, In::Start) => (St::Wanting, vec![Out::SendPlease]),

            (St::Wanting, In::RxPlease { side }) => (
                St::Connecting,
                vec![Out::ChooseRole { peer_side: side }, Out::StartConnectingIgnoreMsg],
            ),

            (St::Connecting, In::ConnectionMade) => (St::Connected, vec![]),
            (St::Connecting, In::RxReconnect) => (
                St::Connecting,
                vec![Out::StopConnecting, Out::SendReconnecting, Out::StartConnecting],
            ),
            (St::Connecting, In::RxHints { hints }) => {
                (St::Connecting, vec![Out::UseHints { hints }])
            },
            (St::Connecting, In::Stop) => (St::Stopped, vec![Out::StopConnecting, Out::NotifyStopped]),

            (St::Connected, In::RxReconnect) => (St::Abandoning, vec![Out::AbandonConnection]),
            (St::Connected, In::ConnectionLostLeader) => (St::Flushing, vec![Out::SendReconnect]),
            (St::Connected, In::ConnectionLostFollower) => (St::Lonely, vec![]),
            (St::Connected, In::Stop) => (St::Stopping, vec![Out::AbandonConnection]),

            (St::Flushing, In::RxReconnecting) => (St::Connecting, vec![Out::StartConnecting]),

            (St::Lonely, In::RxReconnect) => {
                (St::Connecting, vec![Out::SendReconnecting, Out::StartConnecting])
            },

            (St::Abandoning, In::ConnectionLostFollower) => {
                (St::Connecting, vec![Out::SendReconnecting, Out::StartConnecting])
            },
            (St::Abandoning, In::Stop) => (St::Stopping, vec![]),

            (St::Stopping, In::ConnectionLostLeader | In::ConnectionLostFollower) => {
                (St::Stopped, vec![Out::NotifyStopped])
            },

            (St::Waiting | St::Wanting | St::Lonely | St::Flushing, In::Stop) => {
                (St::Stopped, vec![Out::NotifyStopped])
            },

            (state, event) => {
                tracing::trace!(?state, ?event, "manager absorbing event");
                (state, vec![])
            },
        };

        if next != current {
            tracing::debug!(from = ?current, to = ?next, "manager transition");
        }
        self.state = next;

        outputs
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Every decoded control frame maps to exactly one Manager input.
impl From<ControlFrame> for ManagerInput {
    fn from(frame: ControlFrame) -> Self {
        match frame {
            ControlFrame::Please { side } => Self::RxPlease { side },
            ControlFrame::ConnectionHints { hints } => Self::RxHints { hints },
            ControlFrame::Reconnect => Self::RxReconnect,
            ControlFrame::Reconnecting => Self::RxReconnecting,
        }
    }
}
