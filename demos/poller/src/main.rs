//! Mail-poller demo: one timer polling every second in the foreground and
//! every five seconds in the background, first driven through a scripted
//! tab-switch scenario in virtual time, then pumped from the wall clock.

use std::rc::Rc;

use vigil_core::{
    Duration, ManualProvider, StepDriver, VirtualClock, Visibility, VisibilityState,
};
use vigil_platform::RealTimePump;

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let clock = Rc::new(VirtualClock::new());
    let driver = Rc::new(StepDriver::new(clock.clone()));
    let provider = Rc::new(ManualProvider::new(VisibilityState::Visible));
    let vis = Visibility::new(provider.clone(), driver.clone(), clock);

    vis.change(|event, state| log::info!("change #{}: now {state}", event.seq));
    vis.on_visible(|| log::info!("already visible, greeting immediately"));

    let mails = vis
        .every_str("1 second", Some("5 seconds"), || log::info!("checking mail"))
        .expect("literal cadence");

    log::info!("-- 3s in the foreground --");
    driver.advance(Duration::from_secs(3));

    log::info!("-- 12s in a background tab --");
    provider.set_state(VisibilityState::Hidden);
    driver.advance(Duration::from_secs(12));

    log::info!("-- back to the foreground --");
    provider.set_state(VisibilityState::Visible);
    driver.advance(Duration::from_secs(2));

    log::info!("-- 2s pumped from the wall clock --");
    let pump = RealTimePump::new(driver);
    for _ in 0..20 {
        std::thread::sleep(std::time::Duration::from_millis(100));
        pump.pump();
    }

    if let Some(stopped) = vis.stop(mails) {
        log::info!("stopped the poller (visible cadence {:?})", stopped.visible);
    }
}
