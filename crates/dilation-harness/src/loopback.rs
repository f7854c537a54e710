//! Two engines joined by an in-memory rendezvous.
//!
//! `SessionPair` plays the control-plane shell for both ends of a wormhole
//! at once. Send commands from one engine are encoded as real wire frames,
//! wrapped in `dilate-<n>` mailbox phases, and decoded back into the other
//! engine's inputs, so a test that drives the pair is also exercising the
//! codec on every hop.
//!
//! Commands that would touch the network data plane (dial these hints,
//! close that socket) are collected per endpoint for tests to assert on and
//! answer by feeding the corresponding events, exactly as a real shell
//! would.

use std::collections::VecDeque;

use dilation_core::{
    DilationConfig, DilationError, Engine, EngineInput, EngineOutput, Environment,
    connector::ConnectorOutput,
    manager::ManagerOutput,
};
use dilation_proto::{AddFrame, ControlFrame};

/// Which end of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// The first engine.
    Left,
    /// The second engine.
    Right,
}

/// One engine plus its shell-side bookkeeping.
struct Endpoint {
    engine: Engine,
    /// Next `dilate-<n>` phase to allocate. Shell state, not engine state.
    phase: u64,
    /// Inputs waiting for the event loop.
    queue: VecDeque<EngineInput>,
    /// Non-wire commands awaiting the test's attention.
    commands: Vec<EngineOutput>,
}

impl Endpoint {
    fn new(engine: Engine) -> Self {
        Self { engine, phase: 0, queue: VecDeque::new(), commands: Vec::new() }
    }
}

/// Two engines and the in-memory control plane between them.
pub struct SessionPair {
    left: Endpoint,
    right: Endpoint,
}

impl SessionPair {
    /// Build a pair from two configs sharing one environment.
    pub fn new(env: &impl Environment, left: DilationConfig, right: DilationConfig) -> Self {
        Self {
            left: Endpoint::new(Engine::new(env, left)),
            right: Endpoint::new(Engine::new(env, right)),
        }
    }

    /// Queue the Start event on both ends.
    pub fn start(&mut self) {
        use dilation_core::manager::ManagerInput;
        self.feed(Peer::Left, EngineInput::Manager(ManagerInput::Start));
        self.feed(Peer::Right, EngineInput::Manager(ManagerInput::Start));
    }

    /// Queue one input on an endpoint.
    pub fn feed(&mut self, peer: Peer, input: EngineInput) {
        self.endpoint_mut(peer).queue.push_back(input);
    }

    /// Read-only access to an engine for state assertions.
    #[must_use]
    pub fn engine(&self, peer: Peer) -> &Engine {
        &self.endpoint(peer).engine
    }

    /// Drain the non-wire commands an endpoint's shell has been handed.
    pub fn take_commands(&mut self, peer: Peer) -> Vec<EngineOutput> {
        std::mem::take(&mut self.endpoint_mut(peer).commands)
    }

    /// How many `dilate-<n>` phases an endpoint has sent.
    #[must_use]
    pub fn phases_sent(&self, peer: Peer) -> u64 {
        self.endpoint(peer).phase
    }

    /// Process queued inputs, alternating ends, until both queues drain.
    ///
    /// # Errors
    ///
    /// Propagates a protocol violation (equal sides at election, or a frame
    /// that failed to survive the wire).
    pub fn run_until_quiet(&mut self) -> Result<(), DilationError> {
        loop {
            let left = self.pump_one(Peer::Left)?;
            let right = self.pump_one(Peer::Right)?;
            if !left && !right {
                return Ok(());
            }
        }
    }

    fn endpoint(&self, peer: Peer) -> &Endpoint {
        match peer {
            Peer::Left => &self.left,
            Peer::Right => &self.right,
        }
    }

    fn endpoint_mut(&mut self, peer: Peer) -> &mut Endpoint {
        match peer {
            Peer::Left => &mut self.left,
            Peer::Right => &mut self.right,
        }
    }

    fn pair_mut(&mut self, peer: Peer) -> (&mut Endpoint, &mut Endpoint) {
        match peer {
            Peer::Left => (&mut self.left, &mut self.right),
            Peer::Right => (&mut self.right, &mut self.left),
        }
    }

    /// Apply one queued input on an endpoint. Returns false if idle.
    fn pump_one(&mut self, peer: Peer) -> Result<bool, DilationError> {
        let (active, other) = self.pair_mut(peer);

        let Some(input) = active.queue.pop_front() else {
            return Ok(false);
        };

        for output in active.engine.handle(input) {
            Self::route(active, other, output)?;
        }
        Ok(true)
    }

    /// Execute one command the way a real shell would: send commands cross
    /// the wire, election commands call back into the engine, everything
    /// else is parked for the test.
    fn route(
        active: &mut Endpoint,
        other: &mut Endpoint,
        output: EngineOutput,
    ) -> Result<(), DilationError> {
        match output {
            EngineOutput::Manager(ManagerOutput::SendPlease) => {
                let side = active.engine.side();
                Self::transmit(active, other, &ControlFrame::Please { side })
            },
            EngineOutput::Manager(ManagerOutput::SendReconnect) => {
                Self::transmit(active, other, &ControlFrame::Reconnect)
            },
            EngineOutput::Manager(ManagerOutput::SendReconnecting) => {
                Self::transmit(active, other, &ControlFrame::Reconnecting)
            },
            EngineOutput::Manager(ManagerOutput::ChooseRole { peer_side }) => {
                active.engine.choose_role(peer_side).map(|_| ())
            },
            EngineOutput::Connector(ConnectorOutput::PublishHints { hints }) => {
                Self::transmit(active, other, &ControlFrame::ConnectionHints { hints })
            },
            other_command => {
                active.commands.push(other_command);
                Ok(())
            },
        }
    }

    /// Carry one control frame across the in-memory mailbox, through the
    /// full encode / wrap / unwrap / decode path.
    fn transmit(
        active: &mut Endpoint,
        other: &mut Endpoint,
        frame: &ControlFrame,
    ) -> Result<(), DilationError> {
        let plaintext = frame.encode()?;
        let wrapped = AddFrame::wrap(&plaintext, active.phase);
        active.phase += 1;

        let wire = wrapped.encode()?;

        let received = AddFrame::decode(&wire)?;
        let payload = received.payload()?;
        let decoded = ControlFrame::decode(&payload)?;

        other.queue.push_back(EngineInput::Manager(decoded.into()));
        Ok(())
    }
}
