use std::{collections::HashMap, rc::Rc};

use glam::Vec2;
use smallvec::SmallVec;

use super::{
    input::{PointerEvent, PointerId, RaycastResult, TargetId},
    source::RayInteractor,
};

pub trait PointerMoveHandler {
    fn on_pointer_move(&mut self, event: &PointerEvent);
}

/// Whatever owns the scene objects a controller ray can hit.
pub trait PointerMoveTargets {
    /// Deliver `event` to every move handler attached to `target` and
    /// return how many there were.
    fn dispatch_pointer_move(&mut self, target: TargetId, event: &PointerEvent) -> usize;
}

#[derive(Default)]
pub struct MoveHandlerRegistry {
    handlers: HashMap<TargetId, SmallVec<[Box<dyn PointerMoveHandler>; 2]>>,
}

impl MoveHandlerRegistry {
    pub fn attach(&mut self, target: TargetId, handler: Box<dyn PointerMoveHandler>) {
        self.handlers.entry(target).or_default().push(handler);
    }

    pub fn detach_all(&mut self, target: TargetId) -> usize {
        self.handlers.remove(&target).map_or(0, |h| h.len())
    }

    pub fn handler_count(&self, target: TargetId) -> usize {
        self.handlers.get(&target).map_or(0, SmallVec::len)
    }
}

impl PointerMoveTargets for MoveHandlerRegistry {
    fn dispatch_pointer_move(&mut self, target: TargetId, event: &PointerEvent) -> usize {
        let Some(handlers) = self.handlers.get_mut(&target) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler.on_pointer_move(event);
        }
        handlers.len()
    }
}

/// Keeps hover state alive for controller input pipelines that never emit
/// pointer move events on their own.
///
/// Every tick it looks at what the controller ray hits and sends that
/// object a synthetic move event in object space. Panel-space translation
/// is not involved.
pub struct MovementSynthesizer {
    interactor: Option<Rc<dyn RayInteractor>>,
    pointer_id: PointerId,
    enabled: bool,
}

impl MovementSynthesizer {
    pub fn new(interactor: Option<Rc<dyn RayInteractor>>, pointer_id: PointerId) -> Self {
        Self {
            interactor,
            pointer_id,
            enabled: true,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Movement synthesizer enabled: {enabled}");
        }
        self.enabled = enabled;
    }

    pub fn set_interactor(&mut self, interactor: Option<Rc<dyn RayInteractor>>) {
        self.interactor = interactor;
    }

    /// The move event for the current controller hit, if it hit an object.
    pub fn synthesize(&self) -> Option<(TargetId, PointerEvent)> {
        let hit = self.interactor.as_ref()?.current_3d_hit()?;
        let target = hit.target?;

        let mut event = PointerEvent::new(self.pointer_id, Vec2::ZERO);
        event.eligible_for_click = false;
        event.dragging = false;
        // non-zero so the event counts as moving
        event.delta = Vec2::ONE;
        event.current_raycast = RaycastResult {
            target: Some(target),
            world_position: hit.point,
            distance: hit.distance,
            ..Default::default()
        };
        event.press_raycast = event.current_raycast;

        Some((target, event))
    }

    /// Returns how many handlers received an event.
    pub fn tick(&mut self, targets: &mut dyn PointerMoveTargets) -> usize {
        if !self.enabled {
            return 0;
        }

        let Some((target, event)) = self.synthesize() else {
            return 0;
        };

        let count = targets.dispatch_pointer_move(target, &event);
        log::trace!("Synthetic move to {target:?} reached {count} handlers");
        count
    }
}
