//! Deterministic test shell for the dilation engine.
//!
//! The engine in `dilation-core` is pure logic; something still has to play
//! the imperative shell. This crate provides that shell twice over, both
//! fully in-memory:
//!
//! - [`driver::spawn_engine`]: the single-writer event loop. One tokio task
//!   owns the engine; inputs arrive on a channel, commands leave on a
//!   channel, and a watch publishes the Manager state for synchronized
//!   observation.
//! - [`loopback::SessionPair`]: two engines joined by an in-memory
//!   rendezvous. Outbound send commands are encoded as real wire frames,
//!   wrapped in `dilate-<n>` phases, and decoded back into the peer's
//!   inputs, so end-to-end tests cross the actual codec.
//!
//! Randomness comes from [`SimEnv`], seeded so every run reproduces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod driver;
pub mod loopback;
pub mod sim_env;

pub use driver::{spawn_engine, DriverEvent, EngineHandle};
pub use loopback::{Peer, SessionPair};
pub use sim_env::SimEnv;
