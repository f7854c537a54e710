//! Dilation protocol core logic.
//!
//! This crate contains the pure state-machine logic that upgrades a
//! rendezvous-mediated wormhole into a long-lived direct transport. It is
//! completely decoupled from I/O: the machines are driven by input events
//! and answer with output commands, and an imperative shell performs the
//! corresponding network work.
//!
//! # Architecture
//!
//! Three machines cooperate, composed by the [`engine::Engine`]:
//!
//! ```text
//!      ┌─────────────────────────────────┐
//!      │ Manager                         │  lifecycle, role election,
//!      │  Waiting … Connected … Stopped  │  reconnect orchestration
//!      └──────────────┬──────────────────┘
//!                     │ StartConnecting / StopConnecting
//!      ┌──────────────▼──────────────────┐
//!      │ Connector (one per race)        │  publishes + consumes hints,
//!      │  Connecting → Connected         │  picks the single winner
//!      └──────────────┬──────────────────┘
//!                     │ Consider(candidate)
//!      ┌──────────────▼──────────────────┐
//!      │ L2Conn (one per candidate)      │  KCM exchange, record
//!      │  Unselected → Selecting → …     │  buffering and delivery
//!      └─────────────────────────────────┘
//! ```
//!
//! # Key principles
//!
//! - No I/O in core: no sockets, no timers, no system entropy. Randomness
//!   comes through the [`env::Environment`] trait; timeouts arrive as input
//!   events from the shell.
//! - One step per event: each input produces a new state and an ordered list
//!   of output commands, and runs to completion. The shell serializes all
//!   inputs through a single queue.
//! - Unexpected events for a state are absorbed silently. Transient races
//!   between the machines and the network are expected; only equal sides at
//!   role election are a protocol violation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod candidate;
pub mod config;
pub mod connector;
pub mod engine;
pub mod env;
pub mod error;
pub mod l2;
pub mod manager;

pub use candidate::Candidate;
pub use config::DilationConfig;
pub use engine::{DilationState, Engine, EngineInput, EngineOutput, Role};
pub use env::Environment;
pub use error::DilationError;
