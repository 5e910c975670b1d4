use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Visibility as reported by the hosting surface. `Hidden` and `Prerender`
/// are both non-visible, but prerendered content was never shown at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VisibilityState {
    Visible,
    Hidden,
    Prerender,
}

impl VisibilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::Hidden => "hidden",
            VisibilityState::Prerender => "prerender",
        }
    }

    /// True for every non-visible state. Prefer this over matching on
    /// `Visible`; platforms may grow further non-visible states.
    pub fn is_hidden(&self) -> bool {
        !matches!(self, VisibilityState::Visible)
    }
}

impl fmt::Display for VisibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw change notification, as handed to persistent change listeners.
#[derive(Clone, Copy, Debug)]
pub struct ChangeEvent {
    /// Notification counter, 1 for the first notification an instance sees.
    pub seq: u64,
    /// State reported by the provider when the notification was processed.
    pub state: VisibilityState,
}

/// The platform capability the scheduler consumes. Implementations wrap
/// whatever the host exposes (a window system, a document, a test harness);
/// the scheduler only ever reads these four primitives.
pub trait VisibilityProvider {
    /// Whether the platform reports visibility at all. When false, every
    /// consumer falls back to always-visible semantics.
    fn is_supported(&self) -> bool;

    /// Raw state as the platform reports it right now.
    fn state(&self) -> VisibilityState;

    /// Hidden flag derived from the state; false when unsupported.
    fn hidden(&self) -> bool {
        self.is_supported() && self.state().is_hidden()
    }

    /// Install the raw change listener. Installs at most once; later calls
    /// are no-ops.
    fn on_change(&self, listener: Rc<dyn Fn()>);
}

/// Provider driven by the embedding host (or a test): the owner pushes state
/// changes in and the provider raises the change notification.
pub struct ManualProvider {
    supported: bool,
    state: Cell<VisibilityState>,
    listener: RefCell<Option<Rc<dyn Fn()>>>,
    install_calls: Cell<usize>,
}

impl ManualProvider {
    pub fn new(initial: VisibilityState) -> Self {
        Self {
            supported: true,
            state: Cell::new(initial),
            listener: RefCell::new(None),
            install_calls: Cell::new(0),
        }
    }

    /// A provider that reports no visibility capability at all.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(VisibilityState::Visible)
        }
    }

    /// Change state and raise the change notification.
    pub fn set_state(&self, state: VisibilityState) {
        self.state.set(state);
        self.notify();
    }

    /// Change state without notifying. Pair with `notify` to model platforms
    /// that batch or reorder their notifications.
    pub fn set_state_silently(&self, state: VisibilityState) {
        self.state.set(state);
    }

    /// Raise the change notification against the current state. The platform
    /// may do this even when the state did not actually change.
    pub fn notify(&self) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }

    /// How many times `on_change` has been called, including the ignored
    /// calls after the first.
    pub fn install_calls(&self) -> usize {
        self.install_calls.get()
    }
}

impl VisibilityProvider for ManualProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn state(&self) -> VisibilityState {
        self.state.get()
    }

    fn on_change(&self, listener: Rc<dyn Fn()>) {
        self.install_calls.set(self.install_calls.get() + 1);
        let mut slot = self.listener.borrow_mut();
        if slot.is_none() {
            *slot = Some(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_follows_state() {
        let provider = ManualProvider::new(VisibilityState::Visible);
        assert!(!provider.hidden());

        provider.set_state_silently(VisibilityState::Hidden);
        assert!(provider.hidden());

        provider.set_state_silently(VisibilityState::Prerender);
        assert!(provider.hidden());
        assert_eq!(provider.state().as_str(), "prerender");
    }

    #[test]
    fn unsupported_reports_visible() {
        let provider = ManualProvider::unsupported();
        assert!(!provider.is_supported());
        assert!(!provider.hidden());
    }

    #[test]
    fn listener_installs_once() {
        let provider = ManualProvider::new(VisibilityState::Visible);
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        {
            let first = first.clone();
            provider.on_change(Rc::new(move || first.set(first.get() + 1)));
        }
        {
            let second = second.clone();
            provider.on_change(Rc::new(move || second.set(second.get() + 1)));
        }

        provider.set_state(VisibilityState::Hidden);
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 0);
        assert_eq!(provider.install_calls(), 2);
    }
}
