//! The single-writer event loop.
//!
//! One tokio task owns the engine. Every input, whether from the network
//! shell, from timers, or from the application, funnels through one mpsc
//! queue, so
//! the engine only ever sees one event at a time and commands leave in the
//! exact order the transition tables produced them.
//!
//! The driver executes the two commands that are engine operations rather
//! than I/O: `ChooseRole` becomes the election call, and `NotifyStopped`
//! becomes the terminal [`DriverEvent::Stopped`]. Everything else is
//! forwarded for the outer shell to act on.

use dilation_core::{
    DilationError, Engine, EngineInput, EngineOutput, Role,
    manager::{ManagerOutput, ManagerState},
};
use dilation_proto::{Mood, Side};
use tokio::sync::{mpsc, watch};

/// Queue depth for both the input and event channels.
const CHANNEL_DEPTH: usize = 64;

/// What the driver reports to the outer shell.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// A command for the shell to execute, in emission order.
    Command(EngineOutput),

    /// Role election completed.
    RoleElected(Role),

    /// The engine stopped cleanly; close the rendezvous with this mood.
    Stopped {
        /// Always [`Mood::Happy`] for a clean stop.
        mood: Mood,
    },

    /// The engine stopped on a protocol violation.
    Failed {
        /// The violation.
        error: DilationError,
        /// The mood to close the rendezvous with.
        mood: Mood,
    },
}

/// Handle to a running engine task.
///
/// The `state` watch is the synchronized accessor for concurrent readers:
/// it is updated by the driving task after every transition, so observers
/// never see a half-applied step.
pub struct EngineHandle {
    /// Feed input events here.
    pub inputs: mpsc::Sender<EngineInput>,
    /// Commands and terminal events, in order.
    pub events: mpsc::Receiver<DriverEvent>,
    /// Manager state, updated after each step.
    pub state: watch::Receiver<ManagerState>,
    side: Side,
}

impl EngineHandle {
    /// The engine's side identifier.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Send one input, panicking if the driver is gone (test helper).
    pub async fn feed(&self, input: EngineInput) {
        self.inputs.send(input).await.expect("engine task stopped while feeding input");
    }
}

/// Spawn the event loop for an engine.
///
/// The task runs until the engine stops (cleanly or on a violation) or all
/// input senders are dropped.
#[must_use]
pub fn spawn_engine(mut engine: Engine) -> EngineHandle {
    let (input_tx, mut input_rx) = mpsc::channel::<EngineInput>(CHANNEL_DEPTH);
    let (event_tx, event_rx) = mpsc::channel::<DriverEvent>(CHANNEL_DEPTH);
    let (state_tx, state_rx) = watch::channel(engine.manager_state());
    let side = engine.side();

    tokio::spawn(async move {
        while let Some(input) = input_rx.recv().await {
            let outputs = engine.handle(input);
            let _ = state_tx.send(engine.manager_state());

            for output in outputs {
                match output {
                    EngineOutput::Manager(ManagerOutput::ChooseRole { peer_side }) => {
                        match engine.choose_role(peer_side) {
                            Ok(role) => {
                                let _ = event_tx.send(DriverEvent::RoleElected(role)).await;
                            },
                            Err(error) => {
                                let _ = state_tx.send(engine.manager_state());
                                let mood = error.mood();
                                let _ = event_tx.send(DriverEvent::Failed { error, mood }).await;
                                return;
                            },
                        }
                    },
                    EngineOutput::Manager(ManagerOutput::NotifyStopped) => {
                        let _ = event_tx.send(DriverEvent::Stopped { mood: Mood::Happy }).await;
                        return;
                    },
                    other => {
                        if event_tx.send(DriverEvent::Command(other)).await.is_err() {
                            // Shell went away; nothing left to drive.
                            return;
                        }
                    },
                }
            }
        }
    });

    EngineHandle { inputs: input_tx, events: event_rx, state: state_rx, side }
}
