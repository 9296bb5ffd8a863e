use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec2, Vec3};

use crate::{FORWARD, RIGHT, UP};

/// World-space description of the film plane, placed at the focal distance in front of the eye.
///
/// `origin` is the top-left corner of the plane. `horizontal` spans it left to right and
/// `vertical` top to bottom, so a film coordinate `uv` in `[0, 1]^2` maps to
/// `origin + uv.x * horizontal + uv.y * vertical`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ImagePlane {
    pub eye: Vec3,
    pub origin: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
    /// Lens basis scaled by the lens radius, zero for a pinhole.
    pub lens_right: Vec3,
    pub lens_up: Vec3,
}

impl ImagePlane {
    pub fn new(
        eye: Vec3,
        orientation: Quat,
        fov_y: f32,
        aspect_ratio: f32,
        lens_radius: f32,
        focal_distance: f32,
    ) -> Self {
        let right = orientation * RIGHT;
        let up = orientation * UP;
        let forward = orientation * FORWARD;

        let half_height = (fov_y * 0.5).tan() * focal_distance;
        let half_width = half_height * aspect_ratio;

        Self {
            eye,
            origin: eye + forward * focal_distance - right * half_width + up * half_height,
            horizontal: right * (2.0 * half_width),
            vertical: -up * (2.0 * half_height),
            lens_right: right * lens_radius,
            lens_up: up * lens_radius,
        }
    }

    /// Maps a film coordinate and a point on the unit disk to a primary ray `(origin, direction)`.
    pub fn primary_ray(&self, film_uv: Vec2, lens_disk: Vec2) -> (Vec3, Vec3) {
        let target = self.origin + film_uv.x * self.horizontal + film_uv.y * self.vertical;
        let origin = self.eye + lens_disk.x * self.lens_right + lens_disk.y * self.lens_up;

        (origin, (target - origin).normalize())
    }

    pub fn is_pinhole(&self) -> bool {
        self.lens_right == Vec3::ZERO && self.lens_up == Vec3::ZERO
    }
}
