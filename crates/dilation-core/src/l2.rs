//! Per-candidate L2 connection state machine.
//!
//! One `L2Conn` tracks a single candidate from key confirmation through
//! selection. Records that arrive while the race is still undecided are
//! buffered on the instance and handed to the shell, in arrival order, the
//! moment the candidate is selected. After selection, records flow straight
//! through.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::candidate::Candidate;

/// L2 connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2State {
    /// Created; waiting for the key-confirmation message.
    Unselected,
    /// KCM seen; a viable candidate awaiting the race outcome.
    Selecting,
    /// This candidate won. Terminal on the success path.
    Selected,
}

/// Input events for an L2 connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2Input {
    /// The key-confirmation message arrived on this candidate.
    GotKcm,
    /// The Connector chose this candidate.
    Select,
    /// An encrypted application record arrived on this candidate.
    GotRecord {
        /// The record payload.
        record: Bytes,
    },
}

/// Output commands from an L2 connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2Output {
    /// Announce this candidate as viable for selection.
    AddCandidate {
        /// The candidate that proved key possession.
        candidate: Candidate,
    },
    /// Attach this connection to the manager as the live transport.
    SetManager,
    /// Outbound records may now be sent on this connection.
    CanSendRecords,
    /// Deliver the records buffered during selection, in arrival order.
    ProcessInboundQueue {
        /// The buffered records, oldest first.
        records: Vec<Bytes>,
    },
    /// A record was buffered pending selection.
    QueueInboundRecord,
    /// Deliver one record to the application.
    DeliverRecord {
        /// The record payload.
        record: Bytes,
    },
}

/// One candidate connection's state, including its pre-selection buffer.
#[derive(Debug, Clone)]
pub struct L2Conn {
    candidate: Candidate,
    state: L2State,
    inbound: VecDeque<Bytes>,
}

impl L2Conn {
    /// Create an L2 connection for a candidate, in [`L2State::Unselected`].
    #[must_use]
    pub fn new(candidate: Candidate) -> Self {
        Self { candidate, state: L2State::Unselected, inbound: VecDeque::new() }
    }

    /// The candidate this connection tracks.
    #[must_use]
    pub fn candidate(&self) -> Candidate {
        self.candidate
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> L2State {
        self.state
    }

    /// Number of records buffered awaiting selection.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inbound.len()
    }

    /// Process one input event.
    pub fn step(&mut self, input: L2Input) -> Vec<L2Output> {
        use L2Input as In;
        use L2Output as Out;
        use L2State as St;

        let current = self.state;
        let (next, outputs) = match (current, input) {
            (St::Unselected, In::GotKcm) => {
                (St::Selecting, vec![Out::AddCandidate { candidate: self.candidate }])
            },

            (St::Selecting, In::Select) => {
                let records: Vec<Bytes> = self.inbound.drain(..).collect();
                (
                    St::Selected,
                    vec![Out::SetManager, Out::CanSendRecords, Out::ProcessInboundQueue { records }],
                )
            },
            (St::Selecting, In::GotRecord { record }) => {
                self.inbound.push_back(record);
                (St::Selecting, vec![Out::QueueInboundRecord])
            },

            (St::Selected, In::GotRecord { record }) => {
                (St::Selected, vec![Out::DeliverRecord { record }])
            },

            (state, event) => {
                tracing::trace!(?state, ?event, candidate = %self.candidate, "l2 absorbing event");
                (state, vec![])
            },
        };

        if next != current {
            tracing::debug!(
                from = ?current,
                to = ?next,
                candidate = %self.candidate,
                "l2 transition"
            );
        }
        self.state = next;

        outputs
    }
}
