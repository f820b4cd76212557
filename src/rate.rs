//! Adaptive probe pacing.
//!
//! The controller tracks a single scalar: the delay between post probes.
//! A 429 from the forum pushes the delay up; the delay only comes back down
//! after a grace period of success without further 429s. The hysteresis
//! prevents oscillation: one lucky fetch right after a rate limit must not
//! immediately speed the walker back up.

use crate::config::RateConfig;
use std::time::{Duration, Instant};

/// Adaptive inter-probe delay, bounded to `[post_min_secs, post_max_secs]`.
#[derive(Debug)]
pub struct RateController {
    /// Current delay between probes, seconds.
    pub interval_secs: f64,
    /// When the forum last answered 429 (None = never this run).
    pub last_rate_limit: Option<Instant>,
    config: RateConfig,
}

impl RateController {
    /// Create a controller starting at the midpoint of the configured bounds.
    ///
    /// The interval is not persisted; every restart begins here.
    pub fn new(config: RateConfig) -> Self {
        Self {
            interval_secs: config.midpoint_secs(),
            last_rate_limit: None,
            config,
        }
    }

    /// Record a 429: slow down one step and restart the grace window.
    pub fn on_rate_limited(&mut self) {
        self.interval_secs = (self.interval_secs + self.config.step_secs).min(self.config.post_max_secs);
        self.last_rate_limit = Some(Instant::now());

        log::warn!(
            "Rate limited by forum, interval now {:.1}s",
            self.interval_secs
        );
    }

    /// Record a successful probe: speed up one step, but only once
    /// `grace_multiplier * interval` seconds have passed since the last 429.
    ///
    /// The threshold is deliberately self-referential: as the interval
    /// shrinks, the grace window shrinks with it.
    pub fn on_found(&mut self) {
        let grace = Duration::from_secs_f64(self.config.grace_multiplier * self.interval_secs);
        let cooled = match self.last_rate_limit {
            Some(at) => at.elapsed() > grace,
            None => true,
        };

        if cooled {
            self.interval_secs = (self.interval_secs - self.config.step_secs).max(self.config.post_min_secs);
        }
    }

    /// Not-found probes and transient errors leave the pacing alone.
    pub fn on_not_found(&mut self) {}

    /// Current delay, seconds.
    pub fn interval(&self) -> f64 {
        self.interval_secs
    }

    /// Current delay as a [`Duration`] for sleeping.
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}
