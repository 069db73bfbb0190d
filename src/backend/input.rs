use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3A};
use strum::{AsRefStr, EnumIter};

static EVENT_AUTO_INCREMENT: AtomicU64 = AtomicU64::new(0);

/// Opaque sequence number stamped on an event when the host ingests it.
///
/// Together with the [`PointerId`] this is what the redirector deduplicates
/// on, so two events carrying the same id are considered the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl EventId {
    pub fn next() -> Self {
        Self(EVENT_AUTO_INCREMENT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Distinguishes concurrent pointers and touches. Mice conventionally use
/// negative ids, touches and controllers non-negative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointerId(pub i32);

pub const MOUSE_POINTER: PointerId = PointerId(-1);

/// An object in the host's scene that can be hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub usize);

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RaycastResult {
    pub target: Option<TargetId>,
    pub world_position: Vec3A,
    pub world_normal: Vec3A,
    pub distance: f32,
    /// Position the panel's own input system reads.
    pub screen_position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub id: EventId,
    pub pointer_id: PointerId,
    pub position: Vec2,
    pub delta: Vec2,
    pub scroll_delta: Vec2,
    pub button: PointerButton,
    pub eligible_for_click: bool,
    pub dragging: bool,
    pub current_raycast: RaycastResult,
    pub press_raycast: RaycastResult,
}

impl PointerEvent {
    /// A fresh event at `position`, stamped with the next [`EventId`].
    pub fn new(pointer_id: PointerId, position: Vec2) -> Self {
        Self {
            id: EventId::next(),
            pointer_id,
            position,
            delta: Vec2::ZERO,
            scroll_delta: Vec2::ZERO,
            button: PointerButton::Left,
            eligible_for_click: false,
            dragging: false,
            current_raycast: RaycastResult::default(),
            press_raycast: RaycastResult::default(),
        }
    }

    /// Same event moved to `pos`: the position and the screen position of
    /// both raycast records change, everything else is kept.
    #[must_use]
    pub fn with_screen_position(&self, pos: Vec2) -> Self {
        let mut out = self.clone();
        out.position = pos;
        out.current_raycast.screen_position = pos;
        out.press_raycast.screen_position = pos;
        out
    }

    pub fn is_moving(&self) -> bool {
        self.delta.length_squared() > 0.0
    }
}

/// Submit, cancel, select and deselect carry nothing but their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseEvent {
    pub id: EventId,
}

impl BaseEvent {
    pub fn new() -> Self {
        Self { id: EventId::next() }
    }
}

impl Default for BaseEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveDirection {
    Left,
    Up,
    Right,
    Down,
    #[default]
    None,
}

/// Directional navigation, e.g. from a d-pad or arrow keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEvent {
    pub id: EventId,
    pub move_vector: Vec2,
    pub move_dir: MoveDirection,
}

impl AxisEvent {
    /// Derives the direction from the dominant axis of `move_vector`.
    pub fn new(move_vector: Vec2) -> Self {
        let move_dir = if move_vector.length_squared() == 0.0 {
            MoveDirection::None
        } else if move_vector.x.abs() > move_vector.y.abs() {
            if move_vector.x > 0.0 {
                MoveDirection::Right
            } else {
                MoveDirection::Left
            }
        } else if move_vector.y > 0.0 {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        };

        Self {
            id: EventId::next(),
            move_vector,
            move_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter)]
pub enum PanelEventKind {
    PointerMove,
    PointerDown,
    PointerUp,
    Scroll,
    Drag,
    Submit,
    Cancel,
    Move,
    Select,
    Deselect,
}
