use glam::{Affine3A, Quat, UVec2, Vec2, Vec3, Vec3A};

use crate::backend::common::Plane;

/// The quad a panel is drawn on.
///
/// The world transform is composed from the pose and the pixel size: the
/// quad spans `[-0.5, 0.5]` on local X and Y, and is scaled so that one
/// world unit covers `pixels_per_unit` panel pixels. Its plane normal is the
/// local `+Z` axis.
#[derive(Debug, Clone)]
pub struct Surface {
    rotation: Quat,
    translation: Vec3A,
    size: UVec2,
    scale: f32,
    pixels_per_unit: f32,
    transform: Affine3A,
}

impl Surface {
    pub fn new(size: UVec2, pixels_per_unit: f32) -> Self {
        let mut surface = Self {
            rotation: Quat::IDENTITY,
            translation: Vec3A::ZERO,
            size,
            scale: 1.0,
            pixels_per_unit: 1.0,
            transform: Affine3A::IDENTITY,
        };
        surface.set_pixels_per_unit(pixels_per_unit);
        surface.refresh();
        surface
    }

    #[must_use]
    pub fn with_pose(mut self, rotation: Quat, translation: Vec3A) -> Self {
        self.set_pose(rotation, translation);
        self
    }

    pub fn set_pose(&mut self, rotation: Quat, translation: Vec3A) {
        self.rotation = rotation.normalize();
        self.translation = translation;
        self.refresh();
    }

    pub const fn size(&self) -> UVec2 {
        self.size
    }

    /// Zero-sized quads have no inverse transform and are ignored.
    pub fn set_size(&mut self, size: UVec2) {
        if size.x == 0 || size.y == 0 {
            log::warn!("Ignoring empty surface size: {}x{}", size.x, size.y);
            return;
        }
        self.size = size;
        self.refresh();
    }

    /// Zoom factor handed to the panel renderer. Does not affect geometry.
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    pub const fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub const fn pixels_per_unit(&self) -> f32 {
        self.pixels_per_unit
    }

    pub fn set_pixels_per_unit(&mut self, pixels_per_unit: f32) {
        if !pixels_per_unit.is_normal() || pixels_per_unit < 0.0 {
            log::warn!("Ignoring invalid pixels per unit: {pixels_per_unit}");
            return;
        }
        self.pixels_per_unit = pixels_per_unit;
        self.refresh();
    }

    pub fn world_scale(&self) -> Vec3 {
        let size = self.size.as_vec2() / self.pixels_per_unit;
        Vec3::new(size.x, size.y, 1.0)
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size.as_vec2() / self.pixels_per_unit / 2.0
    }

    pub const fn transform(&self) -> &Affine3A {
        &self.transform
    }

    pub const fn position(&self) -> Vec3A {
        self.translation
    }

    pub fn forward(&self) -> Vec3A {
        self.rotation * Vec3A::Z
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.forward(), self.position())
    }

    /// World point to local quad space; points on the quad land in
    /// `[-0.5, 0.5]` on X and Y.
    pub fn world_to_local(&self, point: Vec3A) -> Vec3A {
        self.transform.inverse().transform_point3a(point)
    }

    pub fn local_to_world(&self, point: Vec3A) -> Vec3A {
        self.transform.transform_point3a(point)
    }

    fn refresh(&mut self) {
        self.transform = Affine3A::from_scale_rotation_translation(
            self.world_scale(),
            self.rotation,
            self.translation.into(),
        );
    }
}
