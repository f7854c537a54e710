//! Wire types for the wormhole dilation control plane.
//!
//! This crate contains everything that crosses the rendezvous channel during
//! dilation: side identifiers, connection hints, the JSON control frames
//! exchanged inside `dilate-<n>` mailbox phases, and the close moods reported
//! when a session ends.
//!
//! Everything here is stateless and I/O-free. Encoding and decoding are pure
//! functions over byte slices; the state machines that consume these types
//! live in `dilation-core`.
//!
//! # Wire format
//!
//! Control frames are JSON objects discriminated by a `"type"` field with
//! kebab-case names (`"please"`, `"connection-hints"`, `"reconnect"`,
//! `"reconnecting"`). Binary payloads on the control plane are always
//! hex-encoded; the encrypted payload of a mailbox message rides in an
//! [`AddFrame`] under a monotonically increasing `dilate-<n>` phase.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frames;
pub mod hints;
pub mod mood;
pub mod side;

pub use errors::{ProtocolError, Result};
pub use frames::{AddFrame, ControlFrame};
pub use hints::ConnectionHint;
pub use mood::Mood;
pub use side::Side;
