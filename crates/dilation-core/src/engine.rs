//! The dilation engine: three state machines behind one step function.
//!
//! The engine owns the Manager, the current connection race's Connector,
//! and one `L2Conn` per candidate under consideration. The shell funnels
//! every input through [`Engine::handle`], which applies exactly one
//! transition and returns the resulting commands in order. Nothing here
//! performs I/O.
//!
//! # Composition rules
//!
//! - `StartConnecting`/`StartConnectingIgnoreMsg` begin a fresh race: a new
//!   Connector, with all previous candidates discarded.
//! - `StopConnecting` tears the current race down inline: the engine drives
//!   the Connector's Stop itself so that its `StopEverything` lands in the
//!   output stream *before* any `StartConnecting` that follows in the same
//!   step. The shell may still inject a Connector `Stop` directly for
//!   external cancellation.
//! - `Consider` creates the candidate's `L2Conn`; all instances are
//!   discarded when the race ends.
//! - At most one L2 is ever Selected; a `Select` for a second candidate is
//!   absorbed with a warning.

use std::{cmp::Ordering, collections::HashMap};

use dilation_proto::Side;

use crate::{
    candidate::Candidate,
    config::DilationConfig,
    connector::{Connector, ConnectorInput, ConnectorOutput, ConnectorState},
    env::Environment,
    error::DilationError,
    l2::{L2Conn, L2Input, L2Output, L2State},
    manager::{Manager, ManagerInput, ManagerOutput, ManagerState},
};

/// The elected role of this engine.
///
/// The strictly greater side (comparing the 16-character hex renderings)
/// leads. The Leader drives reconnection after a loss; the Follower waits
/// for its cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This side won the election and drives reconnection.
    Leader,
    /// This side follows the Leader's reconnection cues.
    Follower,
}

impl Role {
    /// The Manager input to feed when the selected connection is lost.
    #[must_use]
    pub fn connection_lost(&self) -> ManagerInput {
        match self {
            Self::Leader => ManagerInput::ConnectionLostLeader,
            Self::Follower => ManagerInput::ConnectionLostFollower,
        }
    }
}

/// Whether dilation has been negotiated with the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DilationState {
    /// The peer's version vector has not been seen yet.
    NotNegotiated,
    /// No common dilation version; dilation cannot proceed.
    Impossible,
    /// At least one common version.
    Possible,
}

/// One input event, tagged with its target machine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineInput {
    /// An event for the Manager.
    Manager(ManagerInput),
    /// An event for the current race's Connector.
    Connector(ConnectorInput),
    /// An event for one candidate's L2 connection.
    L2 {
        /// The candidate the event concerns.
        candidate: Candidate,
        /// The event itself.
        input: L2Input,
    },
}

/// One output command, tagged with its source machine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    /// A command from the Manager.
    Manager(ManagerOutput),
    /// A command from the Connector.
    Connector(ConnectorOutput),
    /// A command from one candidate's L2 connection.
    L2 {
        /// The candidate the command concerns.
        candidate: Candidate,
        /// The command itself.
        output: L2Output,
    },
}

/// The dilation protocol engine.
///
/// Create one per wormhole session. Readers observing state concurrently
/// with the driving task must serialize through the same queue that calls
/// [`Engine::handle`]; the accessors here are plain methods on purpose.
#[derive(Debug)]
pub struct Engine {
    config: DilationConfig,
    side: Side,
    role: Option<Role>,
    dilation: DilationState,
    manager: Manager,
    connector: Option<Connector>,
    l2s: HashMap<Candidate, L2Conn>,
}

impl Engine {
    /// Create an engine with a fresh side (or the configured override).
    pub fn new(env: &impl Environment, config: DilationConfig) -> Self {
        let side = match config.side {
            Some(side) => side,
            None => {
                let mut bytes = [0u8; Side::LEN];
                env.random_bytes(&mut bytes);
                Side::from_bytes(bytes)
            },
        };

        tracing::debug!(%side, "dilation engine created");

        Self {
            config,
            side,
            role: None,
            dilation: DilationState::NotNegotiated,
            manager: Manager::new(),
            connector: None,
            l2s: HashMap::new(),
        }
    }

    /// Our side identifier.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The elected role, once `choose_role` has run.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether dilation is possible with the peer.
    #[must_use]
    pub fn dilation_state(&self) -> DilationState {
        self.dilation
    }

    /// The Manager's current state.
    #[must_use]
    pub fn manager_state(&self) -> ManagerState {
        self.manager.state()
    }

    /// The current race's Connector state, if a race is active.
    #[must_use]
    pub fn connector_state(&self) -> Option<ConnectorState> {
        self.connector.as_ref().map(Connector::state)
    }

    /// The state of one candidate's L2 connection, if it exists.
    #[must_use]
    pub fn l2_state(&self, candidate: Candidate) -> Option<L2State> {
        self.l2s.get(&candidate).map(L2Conn::state)
    }

    /// The selected candidate, if any.
    #[must_use]
    pub fn selected(&self) -> Option<Candidate> {
        self.l2s
            .values()
            .find(|l2| l2.state() == L2State::Selected)
            .map(L2Conn::candidate)
    }

    /// Operator-configured relay hints, for the shell to feed as `AddRelay`.
    #[must_use]
    pub fn relay_hints(&self) -> &[dilation_proto::ConnectionHint] {
        &self.config.relay_hints
    }

    /// Record the peer's dilation version vector.
    ///
    /// Dilation is possible when the vectors intersect. The shell learns the
    /// peer's vector from the rendezvous versions exchange and reports it
    /// here before starting the engine.
    pub fn negotiate(&mut self, peer_versions: &[String]) -> DilationState {
        let possible = self.config.versions.iter().any(|v| peer_versions.contains(v));
        self.dilation = if possible { DilationState::Possible } else { DilationState::Impossible };

        tracing::debug!(state = ?self.dilation, "dilation capability negotiated");
        self.dilation
    }

    /// Elect our role against the peer's side.
    ///
    /// Called by the shell in response to the `ChooseRole` command. The role
    /// is write-once: calling again returns the existing election. Equal
    /// sides are a protocol violation; the engine stops and the error is
    /// returned for the shell to surface.
    ///
    /// # Errors
    ///
    /// Returns [`DilationError::SidesEqual`] when the peer presented our own
    /// side.
    pub fn choose_role(&mut self, peer_side: Side) -> Result<Role, DilationError> {
        if let Some(role) = self.role {
            return Ok(role);
        }

        let role = match self.side.cmp(&peer_side) {
            Ordering::Greater => Role::Leader,
            Ordering::Less => Role::Follower,
            Ordering::Equal => {
                tracing::error!(side = %self.side, "peer presented our own side");
                self.manager.abort();
                self.connector = None;
                self.l2s.clear();
                return Err(DilationError::SidesEqual { side: self.side });
            },
        };

        tracing::info!(side = %self.side, peer = %peer_side, ?role, "role elected");
        self.role = Some(role);
        Ok(role)
    }

    /// Process one input event and return the resulting commands in order.
    pub fn handle(&mut self, input: EngineInput) -> Vec<EngineOutput> {
        match input {
            EngineInput::Manager(input) => self.handle_manager(input),
            EngineInput::Connector(input) => self.handle_connector(input),
            EngineInput::L2 { candidate, input } => self.handle_l2(candidate, input),
        }
    }

    fn handle_manager(&mut self, input: ManagerInput) -> Vec<EngineOutput> {
        let outputs = self.manager.step(input);

        let mut events = Vec::with_capacity(outputs.len());
        for output in outputs {
            let stops_race = matches!(output, ManagerOutput::StopConnecting);
            if matches!(
                output,
                ManagerOutput::StartConnecting | ManagerOutput::StartConnectingIgnoreMsg
            ) {
                self.begin_race();
            }

            events.push(EngineOutput::Manager(output));

            if stops_race {
                events.extend(self.stop_race());
            }
        }
        events
    }

    fn handle_connector(&mut self, input: ConnectorInput) -> Vec<EngineOutput> {
        let Some(connector) = self.connector.as_mut() else {
            tracing::warn!(event = ?input, "no active race; dropping connector event");
            return Vec::new();
        };

        let outputs = connector.step(input);

        let mut events = Vec::with_capacity(outputs.len());
        for output in outputs {
            match &output {
                ConnectorOutput::Consider { candidate } => {
                    self.l2s.insert(*candidate, L2Conn::new(*candidate));
                },
                ConnectorOutput::StopEverything => {
                    self.connector = None;
                    self.l2s.clear();
                },
                _ => {},
            }
            events.push(EngineOutput::Connector(output));
        }
        events
    }

    fn handle_l2(&mut self, candidate: Candidate, input: L2Input) -> Vec<EngineOutput> {
        if matches!(input, L2Input::Select) {
            if let Some(selected) = self.selected() {
                if selected != candidate {
                    tracing::warn!(
                        %selected,
                        %candidate,
                        "ignoring Select while another candidate is selected"
                    );
                    return Vec::new();
                }
            }
        }

        let Some(l2) = self.l2s.get_mut(&candidate) else {
            tracing::warn!(%candidate, event = ?input, "no such candidate; dropping l2 event");
            return Vec::new();
        };

        l2.step(input)
            .into_iter()
            .map(|output| EngineOutput::L2 { candidate, output })
            .collect()
    }

    /// Begin a fresh connection race, discarding any previous candidates.
    fn begin_race(&mut self) {
        tracing::debug!("starting connection race");
        self.connector = Some(Connector::new());
        self.l2s.clear();
    }

    /// Drive the current race's Connector to Stopped and discard it.
    fn stop_race(&mut self) -> Vec<EngineOutput> {
        let Some(connector) = self.connector.as_mut() else {
            return Vec::new();
        };

        let outputs = connector.step(ConnectorInput::Stop);
        self.connector = None;
        self.l2s.clear();

        outputs.into_iter().map(EngineOutput::Connector).collect()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    // Deterministic randomness for unit tests.
    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8 + 1;
            }
        }
    }

    fn side(hex: &str) -> Side {
        Side::from_hex(hex).unwrap()
    }

    fn engine_with_side(hex: &str) -> Engine {
        Engine::new(&TestEnv, DilationConfig::with_side(side(hex)))
    }

    fn start_race(engine: &mut Engine, peer: &str) {
        engine.handle(EngineInput::Manager(ManagerInput::Start));
        engine.handle(EngineInput::Manager(ManagerInput::RxPlease { side: side(peer) }));
        assert_eq!(engine.connector_state(), Some(ConnectorState::Connecting));
    }

    #[test]
    fn generates_side_through_environment() {
        let engine = Engine::new(&TestEnv, DilationConfig::default());
        assert_eq!(engine.side().to_hex(), "0102030405060708");
    }

    #[test]
    fn greater_side_leads() {
        let mut engine = engine_with_side("ffffffffffffffff");
        let role = engine.choose_role(side("aaaaaaaaaaaaaaaa")).unwrap();
        assert_eq!(role, Role::Leader);
        assert_eq!(engine.role(), Some(Role::Leader));
    }

    #[test]
    fn lesser_side_follows() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        let role = engine.choose_role(side("ffffffffffffffff")).unwrap();
        assert_eq!(role, Role::Follower);
    }

    #[test]
    fn equal_sides_stop_the_engine() {
        let mut engine = engine_with_side("0000000000000000");
        start_race(&mut engine, "0000000000000000");

        let err = engine.choose_role(side("0000000000000000")).unwrap_err();
        assert_eq!(err, DilationError::SidesEqual { side: side("0000000000000000") });
        assert_eq!(engine.manager_state(), ManagerState::Stopped);
        assert_eq!(engine.connector_state(), None);
        assert_eq!(engine.role(), None);
    }

    #[test]
    fn role_is_write_once() {
        let mut engine = engine_with_side("ffffffffffffffff");
        assert_eq!(engine.choose_role(side("aaaaaaaaaaaaaaaa")).unwrap(), Role::Leader);

        // A second election cannot flip the role, even against a greater
        // side, and cannot fail against an equal one.
        assert_eq!(engine.choose_role(side("ffffffffffffffff")).unwrap(), Role::Leader);
        assert_eq!(engine.role(), Some(Role::Leader));
    }

    #[test]
    fn version_intersection_decides_possibility() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        assert_eq!(engine.dilation_state(), DilationState::NotNegotiated);

        assert_eq!(
            engine.negotiate(&["1".to_string(), "2".to_string()]),
            DilationState::Possible
        );
        assert_eq!(engine.negotiate(&["2".to_string()]), DilationState::Impossible);
        assert_eq!(engine.negotiate(&[]), DilationState::Impossible);
    }

    #[test]
    fn rx_please_starts_a_race() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        engine.handle(EngineInput::Manager(ManagerInput::Start));
        assert_eq!(engine.connector_state(), None);

        let events =
            engine.handle(EngineInput::Manager(ManagerInput::RxPlease { side: side("ffffffffffffffff") }));
        assert_eq!(
            events,
            vec![
                EngineOutput::Manager(ManagerOutput::ChooseRole {
                    peer_side: side("ffffffffffffffff"),
                }),
                EngineOutput::Manager(ManagerOutput::StartConnectingIgnoreMsg),
            ]
        );
        assert_eq!(engine.connector_state(), Some(ConnectorState::Connecting));
    }

    #[test]
    fn consider_creates_an_l2() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        start_race(&mut engine, "ffffffffffffffff");

        let candidate = Candidate::new(1);
        let events = engine.handle(EngineInput::Connector(ConnectorInput::AddCandidate { candidate }));
        assert_eq!(events, vec![EngineOutput::Connector(ConnectorOutput::Consider { candidate })]);
        assert_eq!(engine.l2_state(candidate), Some(L2State::Unselected));

        let events = engine.handle(EngineInput::L2 { candidate, input: L2Input::GotKcm });
        assert_eq!(
            events,
            vec![EngineOutput::L2 { candidate, output: L2Output::AddCandidate { candidate } }]
        );
        assert_eq!(engine.l2_state(candidate), Some(L2State::Selecting));
    }

    #[test]
    fn only_one_candidate_can_be_selected() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        start_race(&mut engine, "ffffffffffffffff");

        let a = Candidate::new(1);
        let b = Candidate::new(2);
        for candidate in [a, b] {
            engine.handle(EngineInput::Connector(ConnectorInput::AddCandidate { candidate }));
            engine.handle(EngineInput::L2 { candidate, input: L2Input::GotKcm });
        }

        engine.handle(EngineInput::L2 { candidate: a, input: L2Input::Select });
        assert_eq!(engine.selected(), Some(a));

        // A stray Select for the loser is absorbed.
        let events = engine.handle(EngineInput::L2 { candidate: b, input: L2Input::Select });
        assert!(events.is_empty());
        assert_eq!(engine.selected(), Some(a));
        assert_eq!(engine.l2_state(b), Some(L2State::Selecting));

        // Re-selecting the winner is idempotent at the engine boundary: the
        // L2 machine absorbs it.
        let events = engine.handle(EngineInput::L2 { candidate: a, input: L2Input::Select });
        assert!(events.is_empty());
    }

    #[test]
    fn records_flow_through_the_engine() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        start_race(&mut engine, "ffffffffffffffff");

        let candidate = Candidate::new(1);
        engine.handle(EngineInput::Connector(ConnectorInput::AddCandidate { candidate }));
        engine.handle(EngineInput::L2 { candidate, input: L2Input::GotKcm });

        let r1 = Bytes::from_static(b"r1");
        engine.handle(EngineInput::L2 { candidate, input: L2Input::GotRecord { record: r1.clone() } });

        let events = engine.handle(EngineInput::L2 { candidate, input: L2Input::Select });
        assert_eq!(
            events,
            vec![
                EngineOutput::L2 { candidate, output: L2Output::SetManager },
                EngineOutput::L2 { candidate, output: L2Output::CanSendRecords },
                EngineOutput::L2 {
                    candidate,
                    output: L2Output::ProcessInboundQueue { records: vec![r1] },
                },
            ]
        );
    }

    #[test]
    fn stop_connecting_tears_down_before_notify() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        start_race(&mut engine, "ffffffffffffffff");

        let events = engine.handle(EngineInput::Manager(ManagerInput::Stop));
        assert_eq!(
            events,
            vec![
                EngineOutput::Manager(ManagerOutput::StopConnecting),
                EngineOutput::Connector(ConnectorOutput::StopEverything),
                EngineOutput::Manager(ManagerOutput::NotifyStopped),
            ]
        );
        assert_eq!(engine.manager_state(), ManagerState::Stopped);
        assert_eq!(engine.connector_state(), None);
    }

    #[test]
    fn reconnect_while_connecting_restarts_the_race() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");
        start_race(&mut engine, "ffffffffffffffff");

        let candidate = Candidate::new(1);
        engine.handle(EngineInput::Connector(ConnectorInput::AddCandidate { candidate }));
        assert_eq!(engine.l2_state(candidate), Some(L2State::Unselected));

        let events = engine.handle(EngineInput::Manager(ManagerInput::RxReconnect));
        assert_eq!(
            events,
            vec![
                EngineOutput::Manager(ManagerOutput::StopConnecting),
                EngineOutput::Connector(ConnectorOutput::StopEverything),
                EngineOutput::Manager(ManagerOutput::SendReconnecting),
                EngineOutput::Manager(ManagerOutput::StartConnecting),
            ]
        );

        // Fresh race: the old candidate is gone.
        assert_eq!(engine.connector_state(), Some(ConnectorState::Connecting));
        assert_eq!(engine.l2_state(candidate), None);
    }

    #[test]
    fn connector_events_without_a_race_are_dropped() {
        let mut engine = engine_with_side("aaaaaaaaaaaaaaaa");

        let events = engine.handle(EngineInput::Connector(ConnectorInput::Accept {
            candidate: Candidate::new(1),
        }));
        assert!(events.is_empty());

        let events = engine.handle(EngineInput::L2 {
            candidate: Candidate::new(1),
            input: L2Input::GotKcm,
        });
        assert!(events.is_empty());
    }

    #[test]
    fn role_maps_to_loss_input() {
        assert_eq!(Role::Leader.connection_lost(), ManagerInput::ConnectionLostLeader);
        assert_eq!(Role::Follower.connection_lost(), ManagerInput::ConnectionLostFollower);
    }
}
