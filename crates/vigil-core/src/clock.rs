use std::cell::Cell;
use web_time::{Duration, Instant};

/// Time source for the scheduler. Everything that needs "now" reads it from
/// here, so tests and host-pumped loops can substitute virtual time.
pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock you drive by hand. Shared between a `Visibility` instance and the
/// `StepDriver` firing its timers, so callbacks observe the instant their
/// deadline was scheduled for rather than wherever wall time happens to be.
pub struct VirtualClock {
    t: Cell<Instant>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(t: Instant) -> Self {
        Self { t: Cell::new(t) }
    }

    pub fn set(&self, t: Instant) {
        self.t.set(t);
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances() {
        let clock = VirtualClock::new();
        let t0 = clock.now();

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now().saturating_duration_since(t0).as_millis(), 250);

        clock.set(t0 + Duration::from_secs(2));
        assert_eq!(clock.now().saturating_duration_since(t0).as_secs(), 2);
    }
}
