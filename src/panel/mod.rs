use std::sync::Arc;

use glam::UVec2;

use crate::backend::input::{AxisEvent, BaseEvent, PointerEvent};

pub mod surface;

/// Receives events in the panel's own 2D coordinate space.
///
/// Implemented by the external UI panel; the redirector only ever calls it
/// with positions already translated into panel pixels.
pub trait PanelEventHandler {
    fn on_pointer_move(&mut self, event: &PointerEvent);
    fn on_pointer_down(&mut self, event: &PointerEvent);
    fn on_pointer_up(&mut self, event: &PointerEvent);
    fn on_scroll(&mut self, event: &PointerEvent);
    fn on_submit(&mut self, event: &BaseEvent);
    fn on_cancel(&mut self, event: &BaseEvent);
    fn on_move(&mut self, event: &AxisEvent);
    fn on_select(&mut self, event: &BaseEvent);
    fn on_deselect(&mut self, event: &BaseEvent);
}

/// The off-screen image the panel renders into.
pub trait PanelRenderTarget {
    fn target_size(&self) -> UVec2;
    fn resize_target(&mut self, size: UVec2);
    fn set_scale(&mut self, scale: f32);
    /// Request a repaint after the target was recreated.
    fn mark_dirty(&mut self);
}

pub trait PanelBackend: PanelRenderTarget + PanelEventHandler {}

impl<T> PanelBackend for T where T: PanelRenderTarget + PanelEventHandler {}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelDescriptor {
    pub name: Arc<str>,
    pub size: UVec2,
    pub scale: f32,
}

/// Builds panels for the redirector, e.g. from a UI template.
pub trait PanelFactory {
    fn create(&mut self, desc: &PanelDescriptor) -> anyhow::Result<Box<dyn PanelBackend>>;
}
