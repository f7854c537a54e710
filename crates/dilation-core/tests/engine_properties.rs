//! Property-based tests for the dilation state machines.
//!
//! These verify the invariants that must hold for every event sequence:
//! - every (state, event) pair is handled (no panics, no rejections)
//! - Stopped is absorbing
//! - role election is symmetric and write-once
//! - pre-selection record buffering preserves arrival order
//! - at most one candidate is ever Selected

use bytes::Bytes;
use dilation_core::{
    Candidate, DilationConfig, Engine, EngineInput, Environment, Role,
    connector::ConnectorInput,
    l2::{L2Conn, L2Input, L2Output, L2State},
    manager::{Manager, ManagerInput, ManagerState},
};
use dilation_proto::{ConnectionHint, Side};
use proptest::prelude::*;

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        // Deterministic for tests
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = i as u8;
        }
    }
}

fn side_strategy() -> impl Strategy<Value = Side> {
    any::<[u8; 8]>().prop_map(Side::from_bytes)
}

fn hint_strategy() -> impl Strategy<Value = ConnectionHint> {
    ("[a-z]{1,12}", any::<u16>(), 0.0f64..=1.0)
        .prop_map(|(hostname, port, priority)| ConnectionHint::direct(hostname, port, priority))
}

fn manager_input_strategy() -> impl Strategy<Value = ManagerInput> {
    prop_oneof![
        Just(ManagerInput::Start),
        side_strategy().prop_map(|side| ManagerInput::RxPlease { side }),
        Just(ManagerInput::ConnectionMade),
        Just(ManagerInput::RxReconnecting),
        Just(ManagerInput::RxReconnect),
        Just(ManagerInput::ConnectionLostLeader),
        Just(ManagerInput::ConnectionLostFollower),
        prop::collection::vec(hint_strategy(), 0..3)
            .prop_map(|hints| ManagerInput::RxHints { hints }),
        Just(ManagerInput::Stop),
    ]
}

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
    (0u64..4).prop_map(Candidate::new)
}

fn engine_input_strategy() -> impl Strategy<Value = EngineInput> {
    prop_oneof![
        manager_input_strategy().prop_map(EngineInput::Manager),
        prop_oneof![
            prop::collection::vec(hint_strategy(), 0..3)
                .prop_map(|hints| ConnectorInput::ListenerReady { hints }),
            candidate_strategy().prop_map(|candidate| ConnectorInput::Accept { candidate }),
            candidate_strategy().prop_map(|candidate| ConnectorInput::AddCandidate { candidate }),
            prop::collection::vec(hint_strategy(), 0..3)
                .prop_map(|hints| ConnectorInput::GotHints { hints }),
            prop::collection::vec(hint_strategy(), 0..3)
                .prop_map(|hints| ConnectorInput::AddRelay { hints }),
            Just(ConnectorInput::Stop),
        ]
        .prop_map(EngineInput::Connector),
        (candidate_strategy(), prop_oneof![
            Just(L2Input::GotKcm),
            Just(L2Input::Select),
            any::<Vec<u8>>()
                .prop_map(|bytes| L2Input::GotRecord { record: Bytes::from(bytes) }),
        ])
            .prop_map(|(candidate, input)| EngineInput::L2 { candidate, input }),
    ]
}

#[test]
fn prop_manager_is_total_and_stopped_absorbs() {
    proptest!(|(inputs in prop::collection::vec(manager_input_strategy(), 1..50))| {
        let mut manager = Manager::new();

        for input in inputs {
            let was_stopped = manager.state() == ManagerState::Stopped;
            let outputs = manager.step(input);

            if was_stopped {
                prop_assert_eq!(manager.state(), ManagerState::Stopped);
                prop_assert!(outputs.is_empty(), "Stopped must absorb every event");
            }
        }
    });
}

#[test]
fn prop_election_agrees_on_both_ends() {
    proptest!(|(a in side_strategy(), b in side_strategy())| {
        let mut left = Engine::new(&TestEnv, DilationConfig::with_side(a));
        let mut right = Engine::new(&TestEnv, DilationConfig::with_side(b));

        if a == b {
            prop_assert!(left.choose_role(b).is_err());
            prop_assert!(right.choose_role(a).is_err());
            prop_assert_eq!(left.manager_state(), ManagerState::Stopped);
        } else {
            let left_role = left.choose_role(b).unwrap();
            let right_role = right.choose_role(a).unwrap();

            prop_assert_ne!(left_role, right_role, "exactly one side may lead");

            // The strictly greater hex rendering leads.
            let expect_left = if a.to_hex() > b.to_hex() { Role::Leader } else { Role::Follower };
            prop_assert_eq!(left_role, expect_left);
        }
    });
}

#[test]
fn prop_role_is_write_once() {
    proptest!(|(
        local in side_strategy(),
        first in side_strategy(),
        rest in prop::collection::vec(side_strategy(), 0..5),
    )| {
        prop_assume!(local != first);

        let mut engine = Engine::new(&TestEnv, DilationConfig::with_side(local));
        let elected = engine.choose_role(first).unwrap();

        for peer in rest {
            // Later elections, against any side at all, cannot change it.
            prop_assert_eq!(engine.choose_role(peer).unwrap(), elected);
        }
        prop_assert_eq!(engine.role(), Some(elected));
    });
}

#[test]
fn prop_buffered_records_keep_arrival_order() {
    proptest!(|(payloads in prop::collection::vec(any::<Vec<u8>>(), 0..10))| {
        let records: Vec<Bytes> = payloads.into_iter().map(Bytes::from).collect();

        let mut l2 = L2Conn::new(Candidate::new(1));
        l2.step(L2Input::GotKcm);

        for record in &records {
            l2.step(L2Input::GotRecord { record: record.clone() });
        }

        let outputs = l2.step(L2Input::Select);
        prop_assert_eq!(l2.state(), L2State::Selected);

        let drained = outputs.iter().find_map(|output| match output {
            L2Output::ProcessInboundQueue { records } => Some(records.clone()),
            _ => None,
        });
        prop_assert_eq!(drained, Some(records), "no record lost, none reordered");
    });
}

#[test]
fn prop_at_most_one_selected() {
    proptest!(|(inputs in prop::collection::vec(engine_input_strategy(), 1..60))| {
        let mut engine = Engine::new(&TestEnv, DilationConfig::default());

        // Get a race running so connector and l2 events have something to hit.
        engine.handle(EngineInput::Manager(ManagerInput::Start));
        engine.handle(EngineInput::Manager(ManagerInput::RxPlease {
            side: Side::from_hex("ffffffffffffffff").unwrap(),
        }));

        for input in inputs {
            engine.handle(input);

            let selected = (0..4)
                .map(Candidate::new)
                .filter(|c| engine.l2_state(*c) == Some(L2State::Selected))
                .count();
            prop_assert!(selected <= 1, "two candidates selected at once");
        }
    });
}
