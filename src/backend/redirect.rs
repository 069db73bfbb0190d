use std::{collections::HashSet, sync::Arc};

use anyhow::Context;
use glam::{Quat, UVec2, Vec2, Vec3A, Vec3Swizzles};

use crate::{
    config::PanelConfig,
    panel::{PanelBackend, PanelDescriptor, PanelFactory, surface::Surface},
};

use super::{
    common::Skip,
    input::{AxisEvent, BaseEvent, EventId, PanelEventKind, PointerEvent, PointerId},
    source::{EventCamera, RaycastSource},
};

/// What the host knows about the current frame when it dispatches events.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    camera: Option<&'a dyn EventCamera>,
    viewport_height: f32,
}

impl<'a> FrameContext<'a> {
    pub const fn new(camera: Option<&'a dyn EventCamera>, viewport_height: f32) -> Self {
        Self {
            camera,
            viewport_height,
        }
    }

    pub const fn main_camera(&self) -> Option<&'a dyn EventCamera> {
        self.camera
    }

    /// Height of the window that encloses the panel's input system.
    pub const fn viewport_height(&self) -> f32 {
        self.viewport_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FramePhase {
    #[default]
    Idle,
    Dispatching,
}

/// `(event, pointer)` pairs already translated in the current frame.
#[derive(Debug, Default)]
pub struct ProcessedEvents {
    keys: HashSet<(EventId, PointerId)>,
    phase: FramePhase,
    frame: u64,
}

impl ProcessedEvents {
    pub fn begin_frame(&mut self) {
        if self.phase == FramePhase::Dispatching {
            log::warn!(
                "Frame {} was never ended, dropping {} stale keys",
                self.frame,
                self.keys.len()
            );
            self.keys.clear();
        }
        self.frame += 1;
        self.phase = FramePhase::Dispatching;
    }

    /// Must run after the last dispatch of the frame.
    pub fn end_frame(&mut self) {
        self.keys.clear();
        self.phase = FramePhase::Idle;
    }

    /// Returns `false` if the key was already there.
    pub fn insert(&mut self, id: EventId, pointer: PointerId) -> bool {
        self.keys.insert((id, pointer))
    }

    pub fn contains(&self, id: EventId, pointer: PointerId) -> bool {
        self.keys.contains(&(id, pointer))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

/// Local quad coordinates (`[-0.5, 0.5]`, Y up) to panel pixels.
///
/// The top-left corner of the quad lands on `(0, viewport_height)`; the
/// panel's input system measures Y downward from there.
pub fn local_to_panel(local: Vec2, panel_size: UVec2, viewport_height: f32) -> Vec2 {
    let size = panel_size.as_vec2();
    Vec2::new(
        (local.x + 0.5) * size.x,
        (local.y - 0.5) * size.y + viewport_height,
    )
}

/// Sits between the host's input dispatch and a panel drawn on a quad.
///
/// Every pointer event is re-projected into the panel's pixel space using
/// the active raycast source, at most once per event and pointer per frame,
/// and then forwarded to the bound panel.
pub struct PanelInputRedirector {
    name: Arc<str>,
    surface: Surface,
    source: Option<RaycastSource>,
    panel: Option<Box<dyn PanelBackend>>,
    processed: ProcessedEvents,
    pub use_drag_event_fix: bool,
    last_world_hit: Option<Vec3A>,
}

impl PanelInputRedirector {
    pub fn new(name: impl Into<Arc<str>>, surface: Surface) -> Self {
        Self {
            name: name.into(),
            surface,
            source: None,
            panel: None,
            processed: ProcessedEvents::default(),
            use_drag_event_fix: false,
            last_world_hit: None,
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        let surface = Surface::new(config.panel_size(), config.pixels_per_unit)
            .with_pose(config.rotation, config.position.into());

        let mut redirector = Self::new(config.name.clone(), surface);
        redirector.surface.set_scale(config.panel_scale);
        redirector.use_drag_event_fix = config.use_drag_event_fix;
        redirector
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn set_pose(&mut self, rotation: Quat, translation: Vec3A) {
        self.surface.set_pose(rotation, translation);
    }

    // --- raycast source ---

    pub fn bind_source(&mut self, source: impl Into<RaycastSource>) {
        let source = source.into();
        log::info!("{}: using {} raycast source", self.name, source.as_ref());
        self.source = Some(source);
    }

    pub fn unbind_source(&mut self) -> Option<RaycastSource> {
        self.source.take()
    }

    pub const fn source(&self) -> Option<&RaycastSource> {
        self.source.as_ref()
    }

    // --- panel ---

    pub fn bind_panel(&mut self, panel: Box<dyn PanelBackend>) {
        self.panel = Some(panel);
        self.refresh_panel_size();
    }

    pub fn unbind_panel(&mut self) -> Option<Box<dyn PanelBackend>> {
        self.panel.take()
    }

    pub fn panel(&self) -> Option<&dyn PanelBackend> {
        self.panel.as_deref()
    }

    pub fn descriptor(&self) -> PanelDescriptor {
        PanelDescriptor {
            name: self.name.clone(),
            size: self.surface.size(),
            scale: self.surface.scale(),
        }
    }

    /// Throws away the current panel and asks `factory` for a new one that
    /// matches the current configuration.
    pub fn rebuild_panel(&mut self, factory: &mut dyn PanelFactory) -> anyhow::Result<()> {
        self.panel = None;

        let desc = self.descriptor();
        let panel = factory
            .create(&desc)
            .with_context(|| format!("Failed to create panel {}", self.name))?;

        log::info!(
            "{}: rebuilt panel at {}x{}",
            self.name,
            desc.size.x,
            desc.size.y
        );
        self.bind_panel(panel);
        Ok(())
    }

    // --- configuration ---

    pub const fn panel_size(&self) -> UVec2 {
        self.surface.size()
    }

    /// Fractional sizes are rounded to the nearest pixel; a dimension that
    /// rounds to zero leaves the size unchanged.
    pub fn set_panel_size(&mut self, size: Vec2) {
        let size = Vec2::new(size.x.round_ties_even(), size.y.round_ties_even())
            .max(Vec2::ZERO)
            .as_uvec2();
        self.surface.set_size(size);
        self.refresh_panel_size();
    }

    pub fn set_panel_width(&mut self, width: u32) {
        let height = self.surface.size().y;
        self.surface.set_size(UVec2::new(width, height));
        self.refresh_panel_size();
    }

    pub fn set_panel_height(&mut self, height: u32) {
        let width = self.surface.size().x;
        self.surface.set_size(UVec2::new(width, height));
        self.refresh_panel_size();
    }

    pub const fn pixels_per_unit(&self) -> f32 {
        self.surface.pixels_per_unit()
    }

    pub fn set_pixels_per_unit(&mut self, pixels_per_unit: f32) {
        self.surface.set_pixels_per_unit(pixels_per_unit);
        self.refresh_panel_size();
    }

    pub const fn panel_scale(&self) -> f32 {
        self.surface.scale()
    }

    pub fn set_panel_scale(&mut self, scale: f32) {
        self.surface.set_scale(scale);
        if let Some(panel) = self.panel.as_deref_mut() {
            panel.set_scale(scale);
        }
    }

    fn refresh_panel_size(&mut self) {
        let size = self.surface.size();
        if let Some(panel) = self.panel.as_deref_mut() {
            if panel.target_size() != size {
                log::debug!("{}: resizing target to {}x{}", self.name, size.x, size.y);
                panel.resize_target(size);
                panel.mark_dirty();
            }
        }
    }

    // --- frame lifecycle ---

    pub fn begin_frame(&mut self) {
        self.processed.begin_frame();
    }

    pub fn end_frame(&mut self) {
        self.processed.end_frame();
    }

    pub const fn processed(&self) -> &ProcessedEvents {
        &self.processed
    }

    /// World position of the last successful hit, for debug drawing.
    pub const fn last_world_hit(&self) -> Option<Vec3A> {
        self.last_world_hit
    }

    // --- translation ---

    /// Translated copy of `event`, or the reason it does not apply.
    ///
    /// Marks the event as processed for this frame as soon as a source is
    /// bound, even if no camera or hit is found afterwards.
    pub fn translate(
        &mut self,
        ctx: &FrameContext,
        event: &PointerEvent,
    ) -> Result<PointerEvent, Skip> {
        let Some(source) = self.source.as_ref() else {
            return Err(Skip::NoActiveSource);
        };

        if !self.processed.insert(event.id, event.pointer_id) {
            return Err(Skip::AlreadyProcessed);
        }

        let camera = ctx.main_camera().ok_or(Skip::NoCamera)?;
        let hit = source
            .try_get_current_hit(camera, event, &self.surface)
            .ok_or(Skip::NoGeometricHit)?;

        let local = self.surface.world_to_local(hit.point);
        if !local.is_finite() {
            return Err(Skip::NoGeometricHit);
        }
        self.last_world_hit = Some(hit.point);

        let pos = local_to_panel(local.xy(), self.surface.size(), ctx.viewport_height());

        Ok(event.with_screen_position(pos))
    }

    fn transform(
        &mut self,
        ctx: &FrameContext,
        kind: PanelEventKind,
        event: PointerEvent,
    ) -> PointerEvent {
        match self.translate(ctx, &event) {
            Ok(translated) => {
                log::trace!(
                    "{}: {} {:?} {} -> {}",
                    self.name,
                    kind.as_ref(),
                    event.id,
                    event.position,
                    translated.position
                );
                translated
            }
            Err(skip) => {
                log::trace!("{}: {} {:?} untouched: {skip}", self.name, kind.as_ref(), event.id);
                event
            }
        }
    }

    fn forward(&mut self, kind: PanelEventKind, f: impl FnOnce(&mut dyn PanelBackend)) {
        if let Some(panel) = self.panel.as_deref_mut() {
            f(panel);
        } else {
            log::trace!("{}: {} dropped: {}", self.name, kind.as_ref(), Skip::NoBoundHandler);
        }
    }

    // --- entry points ---

    pub fn on_pointer_move(&mut self, ctx: &FrameContext, event: PointerEvent) -> PointerEvent {
        let event = self.transform(ctx, PanelEventKind::PointerMove, event);
        self.forward(PanelEventKind::PointerMove, |p| p.on_pointer_move(&event));
        event
    }

    pub fn on_pointer_down(&mut self, ctx: &FrameContext, event: PointerEvent) -> PointerEvent {
        let event = self.transform(ctx, PanelEventKind::PointerDown, event);
        log::debug!("{}: pointer down at {}", self.name, event.position);
        self.forward(PanelEventKind::PointerDown, |p| p.on_pointer_down(&event));
        event
    }

    pub fn on_pointer_up(&mut self, ctx: &FrameContext, event: PointerEvent) -> PointerEvent {
        let event = self.transform(ctx, PanelEventKind::PointerUp, event);
        self.forward(PanelEventKind::PointerUp, |p| p.on_pointer_up(&event));
        event
    }

    pub fn on_scroll(&mut self, ctx: &FrameContext, event: PointerEvent) -> PointerEvent {
        let event = self.transform(ctx, PanelEventKind::Scroll, event);
        self.forward(PanelEventKind::Scroll, |p| p.on_scroll(&event));
        event
    }

    /// Ignored unless `use_drag_event_fix` is set, in which case drags are
    /// handled as pointer moves.
    pub fn on_drag(&mut self, ctx: &FrameContext, event: PointerEvent) -> PointerEvent {
        if self.use_drag_event_fix {
            self.on_pointer_move(ctx, event)
        } else {
            log::trace!(
                "{}: {} {:?} ignored",
                self.name,
                PanelEventKind::Drag.as_ref(),
                event.id
            );
            event
        }
    }

    pub fn on_submit(&mut self, event: &BaseEvent) {
        log::debug!("{}: submit {:?}", self.name, event.id);
        self.forward(PanelEventKind::Submit, |p| p.on_submit(event));
    }

    pub fn on_cancel(&mut self, event: &BaseEvent) {
        self.forward(PanelEventKind::Cancel, |p| p.on_cancel(event));
    }

    pub fn on_move(&mut self, event: &AxisEvent) {
        self.forward(PanelEventKind::Move, |p| p.on_move(event));
    }

    pub fn on_select(&mut self, event: &BaseEvent) {
        log::debug!("{}: select {:?}", self.name, event.id);
        self.forward(PanelEventKind::Select, |p| p.on_select(event));
    }

    pub fn on_deselect(&mut self, event: &BaseEvent) {
        self.forward(PanelEventKind::Deselect, |p| p.on_deselect(event));
    }
}
