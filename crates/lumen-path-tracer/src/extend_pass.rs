use lumen_scene::Scene;

use crate::{
    accumulator::Accumulator, buffer::AtomicCounter, compute, random_state::RandomState,
    ray::RayFlags, ray_pool::RayPool,
};

pub struct ExtendPassParameters<'a> {
    pub scene: &'a Scene,
    pub ray_pool: &'a RayPool,
    pub accumulator: &'a Accumulator,
    pub random_state: &'a RandomState,
    pub completed_paths: &'a AtomicCounter,
}

/// Finds the closest hit of every active ray.
///
/// Rays that hit something are appended to the next buffer together with their hit record.
/// Misses add the environment radiance to their pixel and retire. The caller swaps the pool
/// afterwards.
pub fn dispatch(parameters: &ExtendPassParameters) {
    puffin::profile_function!();

    let ray_pool = parameters.ray_pool;
    ray_pool.begin_pass();

    compute::dispatch(ray_pool.active_count(), |i| unsafe {
        let mut ray = ray_pool.current().read(i as usize);

        let hit = parameters
            .scene
            .intersect(ray.origin, ray.direction, f32::INFINITY);

        if let Some(hit) = hit {
            if let Some(slot) = ray_pool.next_counter().reserve() {
                ray_pool.next().write(slot as usize, ray);
                ray_pool.hits().write(slot as usize, hit);
                return;
            }
            log::warn!("Ray pool overflow, retiring ray of pixel {}", ray.pixel);
        } else {
            let radiance = ray.throughput * parameters.scene.environment_radiance(ray.direction);
            parameters.accumulator.add(ray.pixel, radiance);
        }

        ray.flags.insert(RayFlags::TERMINATED);
        ray_pool.current().write(i as usize, ray);
        parameters.random_state.store(ray.pixel, ray.rng);
        parameters.completed_paths.reserve();
    });
}
