use std::cell::Cell;
use std::rc::Rc;

use vigil_core::StepDriver;
use web_time::{Duration, Instant};

/// Bridges the deterministic driver to wall time. Call `pump` from the
/// host's poll or render loop; each call advances virtual time by however
/// much real time passed since the previous call, firing due timers along
/// the way.
pub struct RealTimePump {
    driver: Rc<StepDriver>,
    last: Cell<Instant>,
}

impl RealTimePump {
    pub fn new(driver: Rc<StepDriver>) -> Self {
        Self {
            driver,
            last: Cell::new(Instant::now()),
        }
    }

    /// Advance by the real time elapsed since the last pump. Returns the
    /// elapsed duration, handy for frame pacing.
    pub fn pump(&self) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last.get());
        self.last.set(now);
        self.pump_by(elapsed);
        elapsed
    }

    /// Advance by an explicit delta. The deterministic variant `pump` is
    /// built on.
    pub fn pump_by(&self, delta: Duration) {
        self.driver.advance(delta);
    }
}
