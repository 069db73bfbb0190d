use std::rc::Rc;

use glam::{Affine3A, Vec2, Vec3, Vec3A, Vec3Swizzles};
use strum::AsRefStr;

use crate::panel::surface::Surface;

use super::{
    common::{Ray, raycast_plane},
    input::{PointerEvent, TargetId},
};

/// Depth at which screen positions are unprojected to build the pick ray.
const UNPROJECT_DEPTH: f32 = 1.0;

/// Something that can turn a screen position into a world-space point.
pub trait EventCamera {
    fn position(&self) -> Vec3A;

    /// `screen.xy` is in pixels from the bottom-left corner, `screen.z` is
    /// the distance in front of the camera.
    fn screen_to_world_point(&self, screen: Vec3) -> Vec3A;
}

/// Pinhole camera looking down the `-Z` axis of its pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub pose: Affine3A,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub viewport: Vec2,
}

impl PerspectiveCamera {
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, viewport: Vec2) -> Self {
        Self {
            pose: Affine3A::look_at_rh(eye, target, Vec3::Y).inverse(),
            fov_y,
            viewport,
        }
    }
}

impl EventCamera for PerspectiveCamera {
    fn position(&self) -> Vec3A {
        self.pose.translation
    }

    fn screen_to_world_point(&self, screen: Vec3) -> Vec3A {
        let ndc = screen.xy() / self.viewport * 2.0 - Vec2::ONE;
        let half_h = (self.fov_y * 0.5).tan();
        let aspect = self.viewport.x / self.viewport.y;

        let dir = Vec3A::new(ndc.x * half_h * aspect, ndc.y * half_h, -1.0);
        self.pose.transform_point3a(dir * screen.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Vec3A,
    pub normal: Vec3A,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractorHit {
    pub point: Vec3A,
    pub normal: Vec3A,
    pub distance: f32,
    pub target: Option<TargetId>,
}

/// An external ray-casting controller which keeps its own latest hit.
pub trait RayInteractor {
    fn current_3d_hit(&self) -> Option<InteractorHit>;
}

/// Projects the event's screen position through the camera onto the
/// surface plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraProjectedSource;

impl CameraProjectedSource {
    pub fn try_get_current_hit(
        &self,
        camera: &dyn EventCamera,
        event: &PointerEvent,
        surface: &Surface,
    ) -> Option<RaycastHit> {
        let world = camera.screen_to_world_point(event.position.extend(UNPROJECT_DEPTH));
        let origin = camera.position();
        let ray = Ray::new(origin, world - origin);

        let dist = raycast_plane(&ray, &surface.plane())?;

        // the ray direction stands in for the normal
        Some(RaycastHit {
            point: ray.point_at(dist),
            normal: ray.direction.normalize(),
        })
    }
}

/// Reports whatever the controller's interactor last hit.
#[derive(Clone)]
pub struct ControllerRaySource {
    interactor: Rc<dyn RayInteractor>,
}

impl ControllerRaySource {
    pub fn new(interactor: Rc<dyn RayInteractor>) -> Self {
        Self { interactor }
    }

    pub fn interactor(&self) -> &Rc<dyn RayInteractor> {
        &self.interactor
    }

    pub fn try_get_current_hit(&self) -> Option<RaycastHit> {
        self.interactor.current_3d_hit().map(|hit| RaycastHit {
            point: hit.point,
            normal: hit.normal,
        })
    }
}

#[derive(Clone, AsRefStr)]
pub enum RaycastSource {
    CameraProjected(CameraProjectedSource),
    ControllerRay(ControllerRaySource),
}

impl RaycastSource {
    pub fn try_get_current_hit(
        &self,
        camera: &dyn EventCamera,
        event: &PointerEvent,
        surface: &Surface,
    ) -> Option<RaycastHit> {
        match self {
            Self::CameraProjected(source) => source.try_get_current_hit(camera, event, surface),
            Self::ControllerRay(source) => source.try_get_current_hit(),
        }
    }
}

impl From<CameraProjectedSource> for RaycastSource {
    fn from(source: CameraProjectedSource) -> Self {
        Self::CameraProjected(source)
    }
}

impl From<ControllerRaySource> for RaycastSource {
    fn from(source: ControllerRaySource) -> Self {
        Self::ControllerRay(source)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::Cell, f32::consts::FRAC_PI_2};

    use glam::{Quat, UVec2};

    use super::*;
    use crate::backend::input::MOUSE_POINTER;

    pub(crate) struct FixedInteractor {
        pub hit: Cell<Option<InteractorHit>>,
    }

    impl FixedInteractor {
        pub fn new(hit: Option<InteractorHit>) -> Rc<Self> {
            Rc::new(Self {
                hit: Cell::new(hit),
            })
        }
    }

    impl RayInteractor for FixedInteractor {
        fn current_3d_hit(&self) -> Option<InteractorHit> {
            self.hit.get()
        }
    }

    pub(crate) fn test_camera() -> PerspectiveCamera {
        PerspectiveCamera {
            pose: Affine3A::IDENTITY,
            fov_y: FRAC_PI_2,
            viewport: Vec2::new(1920.0, 1080.0),
        }
    }

    #[test]
    fn viewport_center_unprojects_forward() {
        let camera = test_camera();
        let point = camera.screen_to_world_point(Vec3::new(960.0, 540.0, 2.0));
        assert!(point.abs_diff_eq(Vec3A::new(0.0, 0.0, -2.0), 1e-5));

        // 90 degree fov: the top edge is as far up as it is deep
        let top = camera.screen_to_world_point(Vec3::new(960.0, 1080.0, 1.0));
        assert!(top.abs_diff_eq(Vec3A::new(0.0, 1.0, -1.0), 1e-5));
    }

    #[test]
    fn look_at_faces_target() {
        let camera = PerspectiveCamera::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            FRAC_PI_2,
            Vec2::new(100.0, 100.0),
        );
        assert!(camera.position().abs_diff_eq(Vec3A::new(0.0, 0.0, 5.0), 1e-5));
        let point = camera.screen_to_world_point(Vec3::new(50.0, 50.0, 5.0));
        assert!(point.abs_diff_eq(Vec3A::ZERO, 1e-4));
    }

    #[test]
    fn camera_source_hits_plane_with_ray_normal() {
        let surface = Surface::new(UVec2::new(1280, 720), 1280.0)
            .with_pose(Quat::IDENTITY, Vec3A::new(0.0, 0.0, -2.0));
        let event = PointerEvent::new(MOUSE_POINTER, Vec2::new(960.0, 540.0));

        let hit = CameraProjectedSource
            .try_get_current_hit(&test_camera(), &event, &surface)
            .unwrap();

        assert!(hit.point.abs_diff_eq(Vec3A::new(0.0, 0.0, -2.0), 1e-5));
        assert!(hit.normal.abs_diff_eq(Vec3A::NEG_Z, 1e-5));
    }

    #[test]
    fn camera_source_off_center() {
        let surface = Surface::new(UVec2::new(1280, 720), 1280.0)
            .with_pose(Quat::IDENTITY, Vec3A::new(0.0, 0.0, -1.0));
        // right edge of the viewport, 90 degree vertical fov
        let event = PointerEvent::new(MOUSE_POINTER, Vec2::new(1920.0, 540.0));

        let hit = CameraProjectedSource
            .try_get_current_hit(&test_camera(), &event, &surface)
            .unwrap();

        let aspect = 1920.0 / 1080.0;
        assert!(hit.point.abs_diff_eq(Vec3A::new(aspect, 0.0, -1.0), 1e-4));
    }

    #[test]
    fn camera_source_parallel_plane_misses() {
        let surface = Surface::new(UVec2::new(1280, 720), 1280.0)
            .with_pose(Quat::from_rotation_y(FRAC_PI_2), Vec3A::new(0.0, 0.0, -2.0));
        let event = PointerEvent::new(MOUSE_POINTER, Vec2::new(960.0, 540.0));

        let hit = CameraProjectedSource.try_get_current_hit(&test_camera(), &event, &surface);
        assert_eq!(hit, None);
    }

    #[test]
    fn camera_source_plane_behind_misses() {
        let surface = Surface::new(UVec2::new(1280, 720), 1280.0)
            .with_pose(Quat::IDENTITY, Vec3A::new(0.0, 0.0, 2.0));
        let event = PointerEvent::new(MOUSE_POINTER, Vec2::new(960.0, 540.0));

        let hit = CameraProjectedSource.try_get_current_hit(&test_camera(), &event, &surface);
        assert_eq!(hit, None);
    }

    #[test]
    fn controller_source_passes_interactor_hit_through() {
        let interactor = FixedInteractor::new(Some(InteractorHit {
            point: Vec3A::new(0.1, 0.2, 0.3),
            normal: Vec3A::Z,
            distance: 1.5,
            target: Some(TargetId(4)),
        }));
        let source = RaycastSource::from(ControllerRaySource::new(interactor.clone()));
        let surface = Surface::new(UVec2::new(1280, 720), 1280.0);
        let event = PointerEvent::new(MOUSE_POINTER, Vec2::ZERO);

        let hit = source
            .try_get_current_hit(&test_camera(), &event, &surface)
            .unwrap();
        assert_eq!(hit.point, Vec3A::new(0.1, 0.2, 0.3));
        assert_eq!(hit.normal, Vec3A::Z);
        assert_eq!(source.as_ref(), "ControllerRay");

        interactor.hit.set(None);
        assert_eq!(source.try_get_current_hit(&test_camera(), &event, &surface), None);
    }
}
