//! Seeded environment for reproducible tests.

use std::sync::{Arc, Mutex};

use dilation_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A deterministic [`Environment`] backed by a seeded ChaCha8 RNG.
///
/// Clones share the underlying RNG, so two engines built from the same
/// `SimEnv` draw from one stream and a single seed reproduces the whole
/// scenario.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment from a seed. The seed is logged so a failing
    /// run can be replayed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        tracing::info!(seed, "sim environment created");
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("rng lock poisoned").fill_bytes(buffer);
    }
}
