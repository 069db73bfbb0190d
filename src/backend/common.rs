use glam::Vec3A;
use thiserror::Error;

/// Dot products below this are treated as a ray running parallel to a plane.
const PARALLEL_EPSILON: f32 = 1e-6;

/// Why a pointer event was left untouched by the redirector.
///
/// None of these are failures from the caller's point of view: the event
/// simply does not apply to this panel right now.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    #[error("no raycast source bound")]
    NoActiveSource,
    #[error("event already translated this frame")]
    AlreadyProcessed,
    #[error("no camera available")]
    NoCamera,
    #[error("raycast source reported no hit")]
    NoGeometricHit,
    #[error("no panel bound")]
    NoBoundHandler,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3A,
    /// Need not be normalized.
    pub direction: Vec3A,
}

impl Ray {
    pub const fn new(origin: Vec3A, direction: Vec3A) -> Self {
        Self { origin, direction }
    }

    /// Point at distance `t` along the normalized direction.
    pub fn point_at(&self, t: f32) -> Vec3A {
        self.origin + self.direction.normalize_or_zero() * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3A,
    pub point: Vec3A,
}

impl Plane {
    /// `normal` is normalized on construction.
    pub fn new(normal: Vec3A, point: Vec3A) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            point,
        }
    }
}

/// Distance along `ray` (in units of its normalized direction) at which it
/// crosses `plane`. Parallel rays and hits behind the origin yield `None`.
pub fn raycast_plane(ray: &Ray, plane: &Plane) -> Option<f32> {
    let ray_dir = ray.direction.normalize_or_zero();
    let denom = ray_dir.dot(plane.normal);

    // also catches a zero-length direction
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let d = plane.point.dot(-plane.normal);
    let dist = -(d + ray.origin.dot(plane.normal)) / denom;

    if dist < 0.0 || !dist.is_finite() {
        // hit is behind us
        return None;
    }

    Some(dist)
}
