//! Shared request throttle.
//!
//! Every outbound request first waits `base * uniform(low, high)` seconds.
//! The wait happens while holding the throttle's lock, so when several
//! workers share one throttle the global request cadence stays the same as
//! a single sequential worker's.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct ThrottleState {
    rng: StdRng,
    requests: u64,
}

/// Randomized inter-request delay, shared across threads.
#[derive(Debug)]
pub struct Throttle {
    base_secs: f64,
    jitter: (f64, f64),
    state: Mutex<ThrottleState>,
}

impl Throttle {
    /// Throttle seeded from OS entropy.
    pub fn new(base_secs: f64, jitter: (f64, f64)) -> Self {
        Self::with_rng(base_secs, jitter, StdRng::from_entropy())
    }

    /// Deterministic throttle for tests.
    pub fn seeded(base_secs: f64, jitter: (f64, f64), seed: u64) -> Self {
        Self::with_rng(base_secs, jitter, StdRng::seed_from_u64(seed))
    }

    /// A throttle that never sleeps.
    pub fn disabled() -> Self {
        Self::seeded(0.0, (1.0, 1.0), 0)
    }

    fn with_rng(base_secs: f64, jitter: (f64, f64), rng: StdRng) -> Self {
        Self {
            base_secs: base_secs.max(0.0),
            jitter,
            state: Mutex::new(ThrottleState { rng, requests: 0 }),
        }
    }

    /// Block the calling thread for one throttling delay. Returns the delay slept.
    pub fn wait(&self) -> Duration {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let delay = self.next_delay(&mut state.rng);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        state.requests += 1;
        delay
    }

    /// Number of delays served so far.
    pub fn requests(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
    }

    fn next_delay(&self, rng: &mut StdRng) -> Duration {
        let (low, high) = self.jitter;
        let factor = if high > low {
            rng.gen_range(low..=high)
        } else {
            low
        };
        let secs = self.base_secs * factor;
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }
}
