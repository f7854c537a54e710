//! Environment abstraction for deterministic testing.
//!
//! The core never reads system entropy directly; side identifiers are
//! generated through this trait. The harness implements it with a seeded
//! RNG so every test run is reproducible, and production shells implement
//! it with the OS entropy pool.
//!
//! There is deliberately no clock here. The core owns no timers: timeouts
//! are shell concerns and arrive as ordinary input events.

/// Source of randomness for the engine.
///
/// # Safety
///
/// Implementations must guarantee:
///
/// 1. Production randomness is cryptographically secure (side identifiers
///    must be unpredictable or role election becomes biasable).
/// 2. Simulation randomness is seeded and the seed is logged, so failures
///    reproduce.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Convenience for a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
