use std::f32::consts::FRAC_PI_2;

use bytemuck::Zeroable;
use glam::{EulerRot, Quat, Vec3};

use crate::ImagePlane;

pub const RIGHT: Vec3 = Vec3::new(1.0, 0.0, 0.0);
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, Copy)]
pub struct CameraDesc {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub lens_radius: f32,
    pub focal_distance: f32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            fov: 45.0,
            aspect_ratio: 16.0 / 9.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
        }
    }
}

/// Thin-lens camera with an accumulated yaw/pitch/roll orientation.
///
/// Every mutator marks the cached [`ImagePlane`] stale; [`Camera::image_plane`] refuses to hand
/// out a plane until [`Camera::generate_image_plane`] ran again, so primary rays can never be
/// generated from an outdated pose.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    rotation: Vec3,
    fov: f32,
    aspect_ratio: f32,
    lens_radius: f32,
    focal_distance: f32,

    image_plane: ImagePlane,
    image_plane_stale: bool,
    moved: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraDesc::default())
    }
}

impl Camera {
    pub fn new(desc: CameraDesc) -> Self {
        Self {
            position: desc.position,
            rotation: Vec3::ZERO,
            fov: desc.fov,
            aspect_ratio: desc.aspect_ratio,
            lens_radius: desc.lens_radius,
            focal_distance: desc.focal_distance,
            image_plane: ImagePlane::zeroed(),
            image_plane_stale: true,
            moved: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Accumulated (yaw, pitch, roll) in radians.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            -self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * FORWARD
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn lens_radius(&self) -> f32 {
        self.lens_radius
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    /// Moves along the current view direction.
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.forward() * distance;
        self.invalidate();
    }

    /// Adds `delta` with pitch clamped. A delta absorbed entirely by the clamp changes nothing.
    pub fn add_rotation(&mut self, delta: Vec3) {
        let mut rotation = self.rotation + delta;
        rotation.y = rotation.y.clamp(-MAX_PITCH, MAX_PITCH);

        if rotation != self.rotation {
            self.rotation = rotation;
            self.invalidate();
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.image_plane_stale = true;
        self.moved = true;
    }

    /// Recomputes the image plane from the current pose and lens parameters.
    pub fn generate_image_plane(&mut self) -> ImagePlane {
        self.image_plane = ImagePlane::new(
            self.position,
            self.orientation(),
            self.fov.to_radians(),
            self.aspect_ratio,
            self.lens_radius,
            self.focal_distance,
        );
        self.image_plane_stale = false;

        self.image_plane
    }

    /// The image plane of the current pose, `None` while it is stale.
    pub fn image_plane(&self) -> Option<&ImagePlane> {
        if self.image_plane_stale {
            None
        } else {
            Some(&self.image_plane)
        }
    }

    pub fn is_image_plane_stale(&self) -> bool {
        self.image_plane_stale
    }

    /// Returns whether the view changed since the last call, clearing the signal.
    pub fn take_moved(&mut self) -> bool {
        std::mem::take(&mut self.moved)
    }
}
