use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;
use web_time::{Duration, Instant};

use crate::cadence::{CadenceError, parse_cadence};
use crate::clock::Clock;
use crate::dispatch::BindingId;
use crate::driver::TimerDriver;
use crate::provider::{ChangeEvent, VisibilityProvider, VisibilityState};
use crate::registry::{Armed, Registry, StoppedTimer, TimerId};

pub(crate) type ChangeListener = dyn Fn(&ChangeEvent, VisibilityState);
pub(crate) type Listeners = SmallVec<[(BindingId, Rc<ChangeListener>); 2]>;
pub(crate) type Waiters = SmallVec<[(BindingId, Box<dyn FnOnce()>); 2]>;

/// Visibility-aware scheduler. One instance owns the timer registry, the
/// change listener lists and the remembered hidden flag; clone the handle
/// freely, clones share the instance.
///
/// Callbacks run on the single execution context that drives the collaborators
/// (the timer driver and the provider's notifications); the only hazard is
/// reentrancy, and `stop` is safe to call from inside any callback, including
/// a timer stopping itself mid-sweep.
#[derive(Clone)]
pub struct Visibility {
    pub(crate) inner: Rc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) provider: Rc<dyn VisibilityProvider>,
    pub(crate) driver: Rc<dyn TimerDriver>,
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) timers: RefCell<Registry>,
    pub(crate) listeners: RefCell<Listeners>,
    pub(crate) visible_waiters: RefCell<Waiters>,
    pub(crate) prerender_waiters: RefCell<Waiters>,
    pub(crate) next_binding: Cell<u64>,
    pub(crate) listening: Cell<bool>,
    pub(crate) was_hidden: Cell<bool>,
    pub(crate) change_seq: Cell<u64>,
}

impl Visibility {
    pub fn new(
        provider: Rc<dyn VisibilityProvider>,
        driver: Rc<dyn TimerDriver>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let was_hidden = provider.hidden();
        Self {
            inner: Rc::new(Inner {
                provider,
                driver,
                clock,
                timers: RefCell::new(Registry::default()),
                listeners: RefCell::new(SmallVec::new()),
                visible_waiters: RefCell::new(SmallVec::new()),
                prerender_waiters: RefCell::new(SmallVec::new()),
                next_binding: Cell::new(0),
                listening: Cell::new(false),
                was_hidden: Cell::new(was_hidden),
                change_seq: Cell::new(0),
            }),
        }
    }

    /// Run `callback` every `visible` while the host is visible and every
    /// `hidden` while it is not. With `hidden` of `None` the timer is dormant
    /// while hidden and resumes (with an immediate catch-up firing, cadence
    /// permitting) when visibility returns.
    pub fn every(
        &self,
        visible: Duration,
        hidden: Option<Duration>,
        callback: impl Fn() + 'static,
    ) -> TimerId {
        let id = self
            .inner
            .timers
            .borrow_mut()
            .insert(visible, hidden, Rc::new(callback));
        log::debug!("timer {id} registered (visible {visible:?}, hidden {hidden:?})");
        Inner::arm(&self.inner, id, false);
        if self.inner.provider.is_supported() {
            Inner::ensure_listening(&self.inner);
        }
        id
    }

    /// `every` with human-readable cadences: `every_str("1 minute",
    /// Some("5 minutes"), cb)`.
    pub fn every_str(
        &self,
        visible: &str,
        hidden: Option<&str>,
        callback: impl Fn() + 'static,
    ) -> Result<TimerId, CadenceError> {
        let visible = parse_cadence(visible)?;
        let hidden = hidden.map(parse_cadence).transpose()?;
        Ok(self.every(visible, hidden, callback))
    }

    /// Stop a timer. Returns `None` for an unknown id (nothing to stop, not
    /// an error). Once this returns, the callback will not run again.
    pub fn stop(&self, id: TimerId) -> Option<StoppedTimer> {
        let record = self.inner.timers.borrow_mut().remove(id)?;
        if let Some(armed) = record.armed {
            self.inner.driver.cancel(armed.key());
        }
        log::debug!("timer {id} stopped");
        Some(StoppedTimer {
            visible: record.visible,
            hidden: record.hidden,
            callback: record.callback,
        })
    }
}

impl Inner {
    /// Arm `id` for the current state. `immediate` distinguishes fresh
    /// registration (plain recurring handle, nothing to catch up) from the
    /// re-arm after a transition, which fires now if a whole cadence already
    /// elapsed and otherwise defers the next firing by the remainder, so a
    /// transition landing just after a tick cannot double-fire.
    pub(crate) fn arm(inner: &Rc<Inner>, id: TimerId, immediate: bool) {
        let (cadence, last) = {
            let mut timers = inner.timers.borrow_mut();
            let Some(record) = timers.get_mut(id) else {
                return;
            };
            let applicable = if inner.provider.hidden() {
                record.hidden
            } else {
                Some(record.visible)
            };
            let Some(cadence) = applicable else {
                log::debug!("timer {id} dormant while hidden");
                return;
            };
            (cadence, record.last)
        };

        if !immediate {
            let key = inner.driver.repeating(cadence, Self::tick_task(inner, id));
            Self::set_armed(inner, id, Armed::Repeating(key));
            return;
        }

        let now = inner.clock.now();
        let elapsed = last.map(|last| now.saturating_duration_since(last));
        match elapsed {
            Some(elapsed) if elapsed < cadence => {
                let key = inner
                    .driver
                    .once(cadence - elapsed, Self::catch_up_task(inner, id, cadence));
                Self::set_armed(inner, id, Armed::CatchUp(key));
            }
            _ => {
                Self::fire(inner, id, now);
                if !inner.timers.borrow().contains(id) {
                    // Removed itself from inside the firing.
                    return;
                }
                let key = inner.driver.repeating(cadence, Self::tick_task(inner, id));
                Self::set_armed(inner, id, Armed::Repeating(key));
            }
        }
    }

    /// Cancel every handle and re-arm every timer for the state that just
    /// became current. Walks an id snapshot and re-checks presence, since a
    /// callback fired during the sweep may stop any timer, itself included.
    pub(crate) fn rearm_all(inner: &Rc<Inner>) {
        let ids = inner.timers.borrow().ids();
        log::debug!(
            "re-arming {} timer(s) for state {}",
            ids.len(),
            inner.provider.state()
        );
        for id in ids {
            if !inner.timers.borrow().contains(id) {
                continue;
            }
            inner.disarm(id);
            Self::arm(inner, id, true);
        }
    }

    fn disarm(&self, id: TimerId) {
        let armed = self
            .timers
            .borrow_mut()
            .get_mut(id)
            .and_then(|record| record.armed.take());
        if let Some(armed) = armed {
            self.driver.cancel(armed.key());
        }
    }

    /// Record the firing instant and invoke the callback, with no registry
    /// borrow held while user code runs.
    fn fire(inner: &Rc<Inner>, id: TimerId, now: Instant) {
        let callback = {
            let mut timers = inner.timers.borrow_mut();
            let Some(record) = timers.get_mut(id) else {
                return;
            };
            record.last = Some(now);
            record.callback.clone()
        };
        callback();
    }

    fn set_armed(inner: &Rc<Inner>, id: TimerId, armed: Armed) {
        let mut timers = inner.timers.borrow_mut();
        match timers.get_mut(id) {
            Some(record) => record.armed = Some(armed),
            None => {
                drop(timers);
                inner.driver.cancel(armed.key());
            }
        }
    }

    fn tick_task(inner: &Rc<Inner>, id: TimerId) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(inner);
        Rc::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let now = inner.clock.now();
            Inner::fire(&inner, id, now);
        })
    }

    /// One-shot body that completes a deferred catch-up: fire, then resume
    /// the recurring cadence, unless the callback stopped the timer.
    fn catch_up_task(inner: &Rc<Inner>, id: TimerId, cadence: Duration) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(inner);
        Rc::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            {
                let mut timers = inner.timers.borrow_mut();
                let Some(record) = timers.get_mut(id) else {
                    return;
                };
                record.armed = None;
            }
            let now = inner.clock.now();
            Inner::fire(&inner, id, now);
            if !inner.timers.borrow().contains(id) {
                return;
            }
            let key = inner.driver.repeating(cadence, Inner::tick_task(&inner, id));
            Inner::set_armed(&inner, id, Armed::Repeating(key));
        })
    }
}
