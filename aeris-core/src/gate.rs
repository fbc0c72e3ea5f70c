//! Publish rate gate
//!
//! Readings are sampled every loop iteration but published at most once per
//! interval, measured in wall-clock seconds so loop jitter does not drift
//! the cadence.

/// Whether a reading taken at `now` may be published
pub fn should_publish(now: u64, last_published_at: u64, interval_secs: u64) -> bool {
    now >= last_published_at.saturating_add(interval_secs)
}

/// Interval gate with its own last-publish timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishGate {
    last_published_at: u64,
    interval_secs: u64,
}

impl PublishGate {
    /// Start the interval at `now`, so the first publish comes one
    /// interval later
    pub fn new(now: u64, interval_secs: u64) -> Self {
        Self {
            last_published_at: now,
            interval_secs,
        }
    }

    pub fn should_publish(&self, now: u64) -> bool {
        should_publish(now, self.last_published_at, self.interval_secs)
    }

    /// Record a publish attempt at `now`, whether or not it succeeded
    pub fn record_attempt(&mut self, now: u64) {
        self.last_published_at = now;
    }

    pub fn last_published_at(&self) -> u64 {
        self.last_published_at
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}
