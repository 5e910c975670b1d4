//! Host integration for vigil: a wall-clock pump that drives the
//! deterministic `StepDriver` from real elapsed time, and (behind the
//! `desktop` feature) an adapter feeding winit window events into a
//! `ManualProvider`.

pub mod pump;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use pump::*;

#[cfg(feature = "desktop")]
pub use desktop::*;
