//! Change dispatch: persistent listeners, the one-shot wait queues, and the
//! transition handler that re-arms timers on an actual hidden↔visible flip.

use std::fmt;
use std::rc::Rc;

use crate::provider::{ChangeEvent, VisibilityState};
use crate::runtime::{Inner, Visibility};

/// Handle for anything registered on the dispatcher: a persistent change
/// listener or a queued one-shot wait. `unbind` takes either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl Visibility {
    pub fn is_supported(&self) -> bool {
        self.inner.provider.is_supported()
    }

    /// Hidden flag right now; false when the platform is unsupported.
    pub fn hidden(&self) -> bool {
        self.inner.provider.hidden()
    }

    /// Current state; `Visible` when the platform is unsupported.
    pub fn state(&self) -> VisibilityState {
        if !self.is_supported() {
            return VisibilityState::Visible;
        }
        self.inner.provider.state()
    }

    /// Subscribe to every change notification. Listeners run in subscription
    /// order, once per raw notification, even when the hidden flag did not
    /// actually flip. Returns `None` when unsupported; the listener will then
    /// never run.
    pub fn change(
        &self,
        listener: impl Fn(&ChangeEvent, VisibilityState) + 'static,
    ) -> Option<BindingId> {
        if !self.is_supported() {
            return None;
        }
        let id = self.inner.alloc_binding();
        let listener: Rc<crate::runtime::ChangeListener> = Rc::new(listener);
        self.inner.listeners.borrow_mut().push((id, listener));
        Inner::ensure_listening(&self.inner);
        Some(id)
    }

    /// Remove a listener or a queued wait. Idempotent.
    pub fn unbind(&self, id: BindingId) {
        self.inner.listeners.borrow_mut().retain(|(b, _)| *b != id);
        self.inner
            .visible_waiters
            .borrow_mut()
            .retain(|(b, _)| *b != id);
        self.inner
            .prerender_waiters
            .borrow_mut()
            .retain(|(b, _)| *b != id);
    }

    /// Run `callback` when the host next becomes visible, or synchronously
    /// right now if it already is (or the platform is unsupported). Returns
    /// `None` when the callback already ran, otherwise a handle to cancel the
    /// wait. The callback runs at most once, ever.
    pub fn on_visible(&self, callback: impl FnOnce() + 'static) -> Option<BindingId> {
        if !self.is_supported() || !self.hidden() {
            callback();
            return None;
        }
        let id = self.inner.alloc_binding();
        let callback: Box<dyn FnOnce()> = Box::new(callback);
        self.inner.visible_waiters.borrow_mut().push((id, callback));
        Inner::ensure_listening(&self.inner);
        Some(id)
    }

    /// Run `callback` once the state is anything but `Prerender`, or
    /// synchronously right now if it already is. Same contract as
    /// `on_visible`.
    pub fn after_prerendering(&self, callback: impl FnOnce() + 'static) -> Option<BindingId> {
        if !self.is_supported() || self.state() != VisibilityState::Prerender {
            callback();
            return None;
        }
        let id = self.inner.alloc_binding();
        let callback: Box<dyn FnOnce()> = Box::new(callback);
        self.inner
            .prerender_waiters
            .borrow_mut()
            .push((id, callback));
        Inner::ensure_listening(&self.inner);
        Some(id)
    }
}

impl Inner {
    pub(crate) fn alloc_binding(&self) -> BindingId {
        let id = self.next_binding.get() + 1;
        self.next_binding.set(id);
        BindingId(id)
    }

    /// Install the provider listener once per instance.
    pub(crate) fn ensure_listening(inner: &Rc<Inner>) {
        if inner.listening.get() {
            return;
        }
        let weak = Rc::downgrade(inner);
        inner.provider.on_change(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Inner::on_change(&inner);
            }
        }));
        inner.listening.set(true);
        inner.was_hidden.set(inner.provider.hidden());
    }

    /// One logical pass per raw notification: persistent listeners first,
    /// then the timer sweep if the hidden flag actually flipped, then the
    /// one-shot queues whose condition now holds. Queues are drained from a
    /// snapshot; callbacks enqueued during the drain wait for the next
    /// qualifying notification.
    fn on_change(inner: &Rc<Inner>) {
        let state = inner.provider.state();
        let hidden_now = inner.provider.hidden();
        let seq = inner.change_seq.get() + 1;
        inner.change_seq.set(seq);
        let event = ChangeEvent { seq, state };
        log::debug!("change #{seq}: state {state}, hidden {hidden_now}");

        let listeners: Vec<Rc<crate::runtime::ChangeListener>> = inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&event, state);
        }

        if hidden_now != inner.was_hidden.get() {
            Inner::rearm_all(inner);
        }

        if !hidden_now {
            let waiters = std::mem::take(&mut *inner.visible_waiters.borrow_mut());
            for (_, callback) in waiters {
                callback();
            }
        }

        if state != VisibilityState::Prerender {
            let waiters = std::mem::take(&mut *inner.prerender_waiters.borrow_mut());
            for (_, callback) in waiters {
                callback();
            }
        }

        inner.was_hidden.set(hidden_now);
    }
}
