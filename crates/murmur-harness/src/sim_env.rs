//! Simulated environment.
//!
//! Time only moves when someone sleeps or the test advances it. Sleeping
//! completes immediately after moving the clock, so a relay call that never
//! answers loses its race against the engine's timeout on the first poll,
//! and a run of the sync loop covers hours of virtual time in milliseconds.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use murmur_core::Environment;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Unix time at which every simulation starts (2024-01-01T00:00:00Z).
pub const SIM_EPOCH_MILLIS: u64 = 1_704_067_200_000;

/// Seeded, virtual-time [`Environment`].
///
/// Clones share the clock and the RNG stream.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

struct SimState {
    start: Instant,
    elapsed: Duration,
    rng: ChaCha20Rng,
}

impl SimEnv {
    /// Environment whose randomness is fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                start: Instant::now(),
                elapsed: Duration::ZERO,
                rng: ChaCha20Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }

    /// Virtual time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv").field("elapsed", &self.elapsed()).finish_non_exhaustive()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        let state = self.state.lock();
        state.start + state.elapsed
    }

    fn unix_millis(&self) -> u64 {
        let elapsed = self.state.lock().elapsed.as_millis();
        SIM_EPOCH_MILLIS.saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        let state = Arc::clone(&self.state);
        async move {
            state.lock().elapsed += duration;
            tokio::task::yield_now().await;
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.state.lock().rng.fill_bytes(buffer);
    }
}
