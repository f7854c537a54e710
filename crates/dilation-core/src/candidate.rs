//! Candidate connection handles.

use std::fmt;

/// Opaque handle for one in-flight or established peer connection.
///
/// The shell mints one per connection attempt and owns whatever socket it
/// names; the core only compares handles and echoes them in output commands
/// (select this one, stop the others).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate(u64);

impl Candidate {
    /// Construct a handle from a shell-assigned id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The shell-assigned id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate({})", self.0)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate-{}", self.0)
    }
}
