use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use web_time::{Duration, Instant};

use crate::driver::TaskKey;

/// External handle for a timer registered with `Visibility::every`.
/// Monotonically assigned and never reused, even after the timer stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Build an id from its raw number, e.g. one received over FFI.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The native handle currently backing a timer. At most one logical handle
/// is armed per timer: either the recurring interval, or the one-shot delay
/// that defers a catch-up firing after a state transition.
pub(crate) enum Armed {
    Repeating(TaskKey),
    CatchUp(TaskKey),
}

impl Armed {
    pub(crate) fn key(&self) -> TaskKey {
        match self {
            Armed::Repeating(key) | Armed::CatchUp(key) => *key,
        }
    }
}

pub(crate) struct TimerRecord {
    pub visible: Duration,
    pub hidden: Option<Duration>,
    pub callback: Rc<dyn Fn()>,
    pub last: Option<Instant>,
    pub armed: Option<Armed>,
}

/// What `stop` hands back for a timer that existed: the cadences and the
/// callback, for diagnostics or re-registration.
pub struct StoppedTimer {
    pub visible: Duration,
    pub hidden: Option<Duration>,
    pub callback: Rc<dyn Fn()>,
}

/// Owns the id → record map. No scheduling logic here; the runtime decides
/// when and how each record is armed.
#[derive(Default)]
pub(crate) struct Registry {
    next: u64,
    timers: BTreeMap<TimerId, TimerRecord>,
}

impl Registry {
    pub fn insert(
        &mut self,
        visible: Duration,
        hidden: Option<Duration>,
        callback: Rc<dyn Fn()>,
    ) -> TimerId {
        self.next += 1;
        let id = TimerId(self.next);
        self.timers.insert(
            id,
            TimerRecord {
                visible,
                hidden,
                callback,
                last: None,
                armed: None,
            },
        );
        id
    }

    pub fn remove(&mut self, id: TimerId) -> Option<TimerRecord> {
        self.timers.remove(&id)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Option<&mut TimerRecord> {
        self.timers.get_mut(&id)
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Snapshot of the registered ids, in id order. The re-arm sweep walks
    /// this and re-checks presence per id, so callbacks may shrink the
    /// registry mid-sweep.
    pub fn ids(&self) -> Vec<TimerId> {
        self.timers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut registry = Registry::default();
        let a = registry.insert(Duration::from_secs(1), None, noop());
        let b = registry.insert(Duration::from_secs(2), None, noop());
        assert!(b > a);

        registry.remove(a);
        registry.remove(b);
        let c = registry.insert(Duration::from_secs(3), None, noop());
        assert!(c > b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_returns_the_record() {
        let mut registry = Registry::default();
        let id = registry.insert(
            Duration::from_secs(1),
            Some(Duration::from_secs(5)),
            noop(),
        );

        let record = registry.remove(id).unwrap();
        assert_eq!(record.visible, Duration::from_secs(1));
        assert_eq!(record.hidden, Some(Duration::from_secs(5)));
        assert!(record.last.is_none());

        assert!(registry.remove(id).is_none());
        assert!(!registry.contains(id));
    }

    #[test]
    fn ids_snapshot_is_ordered() {
        let mut registry = Registry::default();
        let a = registry.insert(Duration::from_secs(1), None, noop());
        let b = registry.insert(Duration::from_secs(1), None, noop());
        let c = registry.insert(Duration::from_secs(1), None, noop());
        registry.remove(b);
        assert_eq!(registry.ids(), vec![a, c]);
    }
}
