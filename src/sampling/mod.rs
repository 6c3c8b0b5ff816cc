//! Probabilistic gate deciding whether an event is transmitted at all.

use crate::domain::Event;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides whether an event should be sent to the collector.
pub trait EventSampler: Send + Sync {
    fn should_send(&self, event: &Event) -> bool;
}

/// Samples events uniformly at a fixed rate.
///
/// Draws a value in [0, 100) per event and sends iff the draw falls below
/// `rate * 100`, so a rate of 0.0 sends nothing and 1.0 sends everything.
pub struct RandomSampler {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl RandomSampler {
    /// Sampler with the given send rate in [0.0, 1.0].
    #[must_use]
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministically seeded sampler for reproducible test runs.
    #[must_use]
    pub fn with_seed(rate: f64, seed: u64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl EventSampler for RandomSampler {
    fn should_send(&self, _event: &Event) -> bool {
        self.rng.lock().random_range(0.0..100.0) < self.rate * 100.0
    }
}
