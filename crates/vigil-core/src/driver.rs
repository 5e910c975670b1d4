use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slotmap::SlotMap;
use web_time::{Duration, Instant};

use crate::clock::{Clock, VirtualClock};

slotmap::new_key_type! {
    /// Handle to a task scheduled on a `TimerDriver`. Versioned, so a key
    /// kept around after its task fired or was cancelled never aliases a
    /// newer task.
    pub struct TaskKey;
}

/// The native timer primitives the scheduler arms its timers with: a
/// recurring interval and a one-shot delay. Platforms bring their own
/// implementation; `StepDriver` is the one shipped here.
pub trait TimerDriver {
    /// Schedule `task` to run every `period`, starting one period from now.
    fn repeating(&self, period: Duration, task: Rc<dyn Fn()>) -> TaskKey;

    /// Schedule `task` to run once, `delay` from now.
    fn once(&self, delay: Duration, task: Rc<dyn Fn()>) -> TaskKey;

    /// Cancel a scheduled task. No-op if it already fired or was cancelled.
    fn cancel(&self, key: TaskKey);
}

// Intervals below this would spin the step loop; platforms clamp similarly.
const MIN_PERIOD: Duration = Duration::from_millis(1);

struct Scheduled {
    deadline: Instant,
    period: Option<Duration>,
    seq: u64,
    task: Rc<dyn Fn()>,
}

/// Deterministic driver over a shared `VirtualClock`.
///
/// Tasks fire in deadline order, and the clock is moved to each task's
/// deadline before its body runs, so a callback reading `clock.now()` sees
/// the instant it was scheduled for. `advance` steps virtual time through
/// every intermediate deadline; `run_due` fires whatever is due at the
/// current instant. A host loop can drive this from wall time (see the
/// platform crate's pump) or a test can drive it tick by tick.
pub struct StepDriver {
    clock: Rc<VirtualClock>,
    tasks: RefCell<SlotMap<TaskKey, Scheduled>>,
    seq: Cell<u64>,
}

impl StepDriver {
    pub fn new(clock: Rc<VirtualClock>) -> Self {
        Self {
            clock,
            tasks: RefCell::new(SlotMap::with_key()),
            seq: Cell::new(0),
        }
    }

    /// Number of tasks currently scheduled.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Move virtual time forward by `by`, firing every task whose deadline
    /// falls inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.now() + by;
        self.run_until(target);
    }

    /// Fire everything due at the current virtual instant.
    pub fn run_due(&self) {
        self.run_until(self.clock.now());
    }

    fn next_seq(&self) -> u64 {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        seq
    }

    fn run_until(&self, target: Instant) {
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                let due = tasks
                    .iter()
                    .filter(|(_, s)| s.deadline <= target)
                    .min_by_key(|(_, s)| (s.deadline, s.seq))
                    .map(|(key, _)| key);
                match due {
                    None => None,
                    Some(key) => {
                        let (deadline, period, task) = {
                            let scheduled = &tasks[key];
                            (scheduled.deadline, scheduled.period, scheduled.task.clone())
                        };
                        match period {
                            Some(period) => tasks[key].deadline = deadline + period,
                            None => {
                                tasks.remove(key);
                            }
                        }
                        Some((deadline, task))
                    }
                }
            };
            let Some((deadline, task)) = next else { break };
            if self.clock.now() < deadline {
                self.clock.set(deadline);
            }
            task();
        }
        if self.clock.now() < target {
            self.clock.set(target);
        }
    }
}

impl TimerDriver for StepDriver {
    fn repeating(&self, period: Duration, task: Rc<dyn Fn()>) -> TaskKey {
        let period = if period < MIN_PERIOD {
            log::warn!("clamping {period:?} interval to {MIN_PERIOD:?}");
            MIN_PERIOD
        } else {
            period
        };
        let deadline = self.clock.now() + period;
        self.tasks.borrow_mut().insert(Scheduled {
            deadline,
            period: Some(period),
            seq: self.next_seq(),
            task,
        })
    }

    fn once(&self, delay: Duration, task: Rc<dyn Fn()>) -> TaskKey {
        let deadline = self.clock.now() + delay;
        self.tasks.borrow_mut().insert(Scheduled {
            deadline,
            period: None,
            seq: self.next_seq(),
            task,
        })
    }

    fn cancel(&self, key: TaskKey) {
        self.tasks.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn rig() -> (Rc<VirtualClock>, StepDriver) {
        let clock = Rc::new(VirtualClock::new());
        let driver = StepDriver::new(clock.clone());
        (clock, driver)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_in_deadline_order() {
        let (_, driver) = rig();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("b", 200), ("a", 100), ("c", 300)] {
            let order = order.clone();
            driver.once(ms(delay), Rc::new(move || order.borrow_mut().push(label)));
        }

        driver.advance(ms(1000));
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
        assert_eq!(driver.pending(), 0);
    }

    #[test]
    fn repeating_fires_every_period() {
        let (_, driver) = rig();
        let count = Rc::new(Cell::new(0));
        {
            let count = count.clone();
            driver.repeating(ms(100), Rc::new(move || count.set(count.get() + 1)));
        }

        driver.advance(ms(350));
        assert_eq!(count.get(), 3);
        driver.advance(ms(50));
        assert_eq!(count.get(), 4);
        assert_eq!(driver.pending(), 1);
    }

    #[test]
    fn callback_observes_its_deadline() {
        let (clock, driver) = rig();
        let t0 = clock.now();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let clock = clock.clone();
            let seen = seen.clone();
            driver.once(
                ms(500),
                Rc::new(move || {
                    seen.borrow_mut()
                        .push(clock.now().saturating_duration_since(t0).as_millis());
                }),
            );
        }

        driver.advance(ms(2000));
        assert_eq!(*seen.borrow(), vec![500]);
        assert_eq!(clock.now().saturating_duration_since(t0), ms(2000));
    }

    #[test]
    fn cancel_is_idempotent() {
        let (_, driver) = rig();
        let count = Rc::new(Cell::new(0));
        let key = {
            let count = count.clone();
            driver.repeating(ms(100), Rc::new(move || count.set(count.get() + 1)))
        };

        driver.advance(ms(150));
        assert_eq!(count.get(), 1);

        driver.cancel(key);
        driver.cancel(key);
        driver.advance(ms(1000));
        assert_eq!(count.get(), 1);
        assert_eq!(driver.pending(), 0);
    }

    #[test]
    fn task_can_cancel_itself() {
        let (_, driver) = rig();
        let driver = Rc::new(driver);
        let key_slot = Rc::new(Cell::new(None));
        let count = Rc::new(Cell::new(0));

        let key = {
            let driver_in_task = driver.clone();
            let key_slot = key_slot.clone();
            let count = count.clone();
            driver.repeating(
                ms(100),
                Rc::new(move || {
                    count.set(count.get() + 1);
                    if count.get() == 2 {
                        if let Some(key) = key_slot.get() {
                            driver_in_task.cancel(key);
                        }
                    }
                }),
            )
        };
        key_slot.set(Some(key));

        driver.advance(ms(1000));
        assert_eq!(count.get(), 2);
        assert_eq!(driver.pending(), 0);
    }

    #[test]
    fn zero_period_is_clamped() {
        let (_, driver) = rig();
        let count = Rc::new(Cell::new(0));
        {
            let count = count.clone();
            driver.repeating(Duration::ZERO, Rc::new(move || count.set(count.get() + 1)));
        }

        driver.advance(ms(10));
        assert_eq!(count.get(), 10);
    }
}
