use std::sync::atomic::{AtomicU32, Ordering};

use lumen_scene::Scene;

use crate::{accumulator::Accumulator, compute, ray_pool::ShadowQueue};

pub struct ShadowPassParameters<'a> {
    pub scene: &'a Scene,
    pub shadow_queue: &'a ShadowQueue,
    pub accumulator: &'a Accumulator,
}

/// Resolves the light samples queued by the preceding shade pass, adding the contribution of
/// every unoccluded one. Returns the number of unoccluded samples.
pub fn dispatch(parameters: &ShadowPassParameters) -> u32 {
    puffin::profile_function!();

    let unoccluded = AtomicU32::new(0);
    compute::dispatch(parameters.shadow_queue.len(), |i| unsafe {
        let shadow_ray = parameters.shadow_queue.get(i);
        if !parameters
            .scene
            .occluded(shadow_ray.origin, shadow_ray.direction, shadow_ray.distance)
        {
            parameters
                .accumulator
                .add(shadow_ray.pixel, shadow_ray.contribution);
            unoccluded.fetch_add(1, Ordering::Relaxed);
        }
    });

    unoccluded.into_inner()
}
