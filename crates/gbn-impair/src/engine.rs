//! Bernoulli-trial impairment engine.
//!
//! Evaluates drop → duplicate → delay, in that fixed order, with
//! short-circuit semantics: at most one of the three fires per datagram.
//! Randomness comes from a single seedable generator so a test (or an
//! operator chasing a flaky run) can replay the exact same sequence of
//! decisions.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Probabilities and delay bounds for the three impairments. All
/// probabilities are independent Bernoulli parameters in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpairmentConfig {
    pub p_drop: f64,
    pub p_dup: f64,
    pub p_delay: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ImpairmentConfig {
    fn default() -> Self {
        ImpairmentConfig {
            p_drop: 0.10,
            p_dup: 0.10,
            p_delay: 0.10,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(2000),
        }
    }
}

/// Outcome of one Bernoulli-trial evaluation against a single datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Forward immediately, unmodified.
    Forward,
    /// Discard silently.
    Drop,
    /// Send twice immediately; the duplicate is not itself re-evaluated.
    Duplicate,
    /// Hold for `Duration` before sending once.
    Delay(Duration),
}

/// Owns the RNG state and decides the fate of each datagram.
#[derive(Debug)]
pub struct ImpairmentEngine {
    config: ImpairmentConfig,
    rng: StdRng,
}

impl ImpairmentEngine {
    /// Build an engine seeded from OS entropy.
    pub fn new(config: ImpairmentConfig) -> Self {
        ImpairmentEngine {
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Build an engine with a fixed seed — deterministic trial sequence,
    /// for tests and reproducible debugging.
    pub fn with_seed(config: ImpairmentConfig, seed: u64) -> Self {
        ImpairmentEngine {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &ImpairmentConfig {
        &self.config
    }

    /// Evaluate the three trials, in fixed order, against one datagram.
    pub fn decide(&mut self) -> Decision {
        if self.rng.random::<f64>() < self.config.p_drop {
            return Decision::Drop;
        }
        if self.rng.random::<f64>() < self.config.p_dup {
            return Decision::Duplicate;
        }
        if self.rng.random::<f64>() < self.config.p_delay {
            let min = self.config.min_delay.as_secs_f64();
            let max = self.config.max_delay.as_secs_f64();
            let span = (max - min).max(0.0);
            let delay = min + self.rng.random::<f64>() * span;
            return Decision::Delay(Duration::from_secs_f64(delay));
        }
        Decision::Forward
    }
}
