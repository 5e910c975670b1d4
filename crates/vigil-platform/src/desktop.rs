use vigil_core::{ManualProvider, VisibilityState};
use winit::event::WindowEvent;

/// Feed a winit window event into a provider. Occlusion is the only signal
/// winit gives about whether the surface is actually shown; everything else
/// is ignored. The provider notifies even when the state did not change,
/// which the dispatcher tolerates.
pub fn apply_window_event(provider: &ManualProvider, event: &WindowEvent) {
    match event {
        WindowEvent::Occluded(occluded) => {
            let state = if *occluded {
                VisibilityState::Hidden
            } else {
                VisibilityState::Visible
            };
            log::debug!("window occlusion changed, reporting {state}");
            provider.set_state(state);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::VisibilityProvider;

    #[test]
    fn occlusion_maps_to_visibility() {
        let provider = ManualProvider::new(VisibilityState::Visible);

        apply_window_event(&provider, &WindowEvent::Occluded(true));
        assert_eq!(provider.state(), VisibilityState::Hidden);

        apply_window_event(&provider, &WindowEvent::Occluded(false));
        assert_eq!(provider.state(), VisibilityState::Visible);

        apply_window_event(&provider, &WindowEvent::CloseRequested);
        assert_eq!(provider.state(), VisibilityState::Visible);
    }
}
