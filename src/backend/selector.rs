use strum::AsRefStr;

use super::{
    movement::MovementSynthesizer,
    redirect::PanelInputRedirector,
    source::{CameraProjectedSource, ControllerRaySource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum InputModality {
    Mouse,
    Controller,
}

impl InputModality {
    pub const fn from_use_mouse(use_mouse: bool) -> Self {
        if use_mouse { Self::Mouse } else { Self::Controller }
    }
}

/// Head/controller pose drivers that move the camera in controller mode.
pub trait TrackingDrivers {
    fn set_tracking_enabled(&mut self, enabled: bool);
}

/// Startup wiring: picks the raycast source once and turns off whatever the
/// other modality needs. Consumed by [`SourceSelector::apply`].
pub struct SourceSelector {
    modality: InputModality,
}

impl SourceSelector {
    pub const fn new(modality: InputModality) -> Self {
        Self { modality }
    }

    pub fn apply(
        self,
        redirector: &mut PanelInputRedirector,
        controller: Option<ControllerRaySource>,
        synthesizer: &mut MovementSynthesizer,
        tracking: &mut dyn TrackingDrivers,
    ) -> InputModality {
        log::info!("Input modality: {}", self.modality.as_ref());

        match self.modality {
            InputModality::Mouse => {
                // the camera must stay where the host puts it
                tracking.set_tracking_enabled(false);
                redirector.bind_source(CameraProjectedSource);
                synthesizer.set_enabled(false);
            }
            InputModality::Controller => {
                if let Some(controller) = controller {
                    redirector.bind_source(controller);
                } else {
                    log::warn!("Controller input selected, but no controller ray is available");
                }
            }
        }

        self.modality
    }
}
