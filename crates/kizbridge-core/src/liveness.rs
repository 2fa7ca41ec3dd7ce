// ── Liveness monitor ──
//
// Tracks the last cycle in which at least one device yielded a state
// read. If polling produces no data past the ceiling, the sync loop
// shuts the process down (an external supervisor restarts it).

use std::time::{Duration, Instant};

pub struct LivenessClock {
    last_data: Instant,
    ceiling: Duration,
}

impl LivenessClock {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            last_data: Instant::now(),
            ceiling,
        }
    }

    /// Record that the current cycle produced state data.
    pub fn mark_data(&mut self) {
        self.last_data = Instant::now();
    }

    /// Time since the last successful state read.
    pub fn elapsed(&self) -> Duration {
        self.last_data.elapsed()
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// True once the elapsed time exceeds the ceiling.
    pub fn expired(&self) -> bool {
        self.elapsed() > self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clock_is_not_expired() {
        let clock = LivenessClock::new(Duration::from_secs(600));
        assert!(!clock.expired());
    }

    #[test]
    fn expires_past_the_ceiling_and_resets_on_data() {
        let mut clock = LivenessClock::new(Duration::from_secs(600));
        if let Some(backdated) = Instant::now().checked_sub(Duration::from_secs(700)) {
            clock.last_data = backdated;
            assert!(clock.expired());

            clock.mark_data();
            assert!(!clock.expired());
        }
    }
}
