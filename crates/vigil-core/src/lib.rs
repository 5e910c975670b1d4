//! # Visibility-aware timers
//!
//! `vigil-core` runs periodic work whose cadence follows whether the hosting
//! surface is currently visible to the user, hidden in the background, or
//! still prerendering. Callers register a timer once; the scheduler re-arms
//! it on every visibility transition, with catch-up handling so a transition
//! landing next to a scheduled tick never double-fires.
//!
//! There are three collaborators, all passed in explicitly (tests build a
//! fresh set per case):
//!
//! - [`VisibilityProvider`] — how the platform reports visibility.
//!   [`ManualProvider`] is the host-driven implementation shipped here.
//! - [`TimerDriver`] — the recurring-interval / one-shot-delay primitives.
//!   [`StepDriver`] is a deterministic driver over a [`VirtualClock`].
//! - [`Clock`] — the time source used for catch-up arithmetic.
//!
//! ## Periodic timers
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use vigil_core::*;
//!
//! let clock = Rc::new(VirtualClock::new());
//! let driver = Rc::new(StepDriver::new(clock.clone()));
//! let provider = Rc::new(ManualProvider::new(VisibilityState::Visible));
//! let vis = Visibility::new(provider.clone(), driver.clone(), clock.clone());
//!
//! let polls = Rc::new(Cell::new(0));
//! let id = vis.every(Duration::from_secs(1), Some(Duration::from_secs(5)), {
//!     let polls = polls.clone();
//!     move || polls.set(polls.get() + 1)
//! });
//!
//! driver.advance(Duration::from_secs(3));
//! assert_eq!(polls.get(), 3); // every second while visible
//!
//! provider.set_state(VisibilityState::Hidden);
//! driver.advance(Duration::from_secs(5));
//! assert_eq!(polls.get(), 4); // every five seconds while hidden
//!
//! vis.stop(id);
//! ```
//!
//! Omit the hidden cadence and the timer simply sleeps while hidden, firing
//! a catch-up tick when visibility returns.
//!
//! ## Change listeners and one-shot waits
//!
//! ```rust
//! use std::rc::Rc;
//! use vigil_core::*;
//!
//! let clock = Rc::new(VirtualClock::new());
//! let driver = Rc::new(StepDriver::new(clock.clone()));
//! let provider = Rc::new(ManualProvider::new(VisibilityState::Hidden));
//! let vis = Visibility::new(provider.clone(), driver, clock);
//!
//! let binding = vis.change(|event, state| {
//!     log::info!("visibility change #{}: {state}", event.seq);
//! });
//! assert!(binding.is_some());
//!
//! // Runs once, on the next transition to visible; `None` would mean it
//! // ran synchronously because the page was already visible.
//! let wait = vis.on_visible(|| log::info!("back in front"));
//! assert!(wait.is_some());
//!
//! provider.set_state(VisibilityState::Visible);
//! ```
//!
//! Cadences can also be written out: [`every_str`](Visibility::every_str)
//! accepts `"1 second"`, `"5 minutes"`, `"250 ms"` and friends via
//! [`parse_cadence`].
//!
//! On an unsupported platform ([`ManualProvider::unsupported`], or a host
//! with no visibility reporting) nothing errors: timers run at their visible
//! cadence, waits run synchronously, and [`Visibility::change`] returns
//! `None`.

pub mod cadence;
pub mod clock;
pub mod dispatch;
pub mod driver;
pub mod provider;
pub mod registry;
pub mod runtime;

pub use cadence::*;
pub use clock::*;
pub use dispatch::*;
pub use driver::*;
pub use provider::*;
pub use registry::*;
pub use runtime::*;
pub use web_time::{Duration, Instant};
