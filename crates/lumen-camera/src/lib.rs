mod camera;
mod image_plane;

pub use camera::{Camera, CameraDesc, FORWARD, RIGHT, UP};
pub use image_plane::ImagePlane;
