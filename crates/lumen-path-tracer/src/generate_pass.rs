use glam::{UVec2, Vec2};
use lumen_camera::ImagePlane;

use crate::{
    compute,
    random::{random_vec2, sample_disk},
    random_state::RandomState,
    ray::Ray,
    ray_pool::RayPool,
};

pub struct GeneratePassParameters<'a> {
    pub resolution: UVec2,
    pub image_plane: &'a ImagePlane,
    pub random_state: &'a RandomState,
    pub ray_pool: &'a RayPool,
}

/// Writes one jittered primary ray per pixel into the current buffer, slot `i` owned by pixel
/// `i`, and sets the active population to the pixel count.
pub fn dispatch(parameters: &GeneratePassParameters) {
    puffin::profile_function!();

    let pixel_count = parameters.resolution.x * parameters.resolution.y;
    debug_assert!(pixel_count <= parameters.ray_pool.capacity());

    let width = parameters.resolution.x;
    let inv_resolution = Vec2::ONE / parameters.resolution.as_vec2();
    let rays = parameters.ray_pool.current();

    compute::dispatch(pixel_count, |pixel| {
        let mut rng = unsafe { parameters.random_state.load(pixel) };

        let id = UVec2::new(pixel % width, pixel / width);
        let film_uv = (id.as_vec2() + random_vec2(&mut rng)) * inv_resolution;
        let lens = if parameters.image_plane.is_pinhole() {
            Vec2::ZERO
        } else {
            sample_disk(random_vec2(&mut rng))
        };

        let (origin, direction) = parameters.image_plane.primary_ray(film_uv, lens);
        unsafe {
            rays.write(
                pixel as usize,
                Ray::primary(origin, direction, pixel, rng),
            );
        }
    });

    parameters.ray_pool.current_counter().set(pixel_count);
}
