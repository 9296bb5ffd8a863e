use std::{collections::TryReserveError, time::Duration};

use glam::UVec2;
use lumen_camera::ImagePlane;
use lumen_scene::Scene;
use lumen_time::Timer;

use crate::{
    accumulator::Accumulator,
    buffer::AtomicCounter,
    compute,
    config::RendererConfig,
    extend_pass::{self, ExtendPassParameters},
    generate_pass::{self, GeneratePassParameters},
    random_state::RandomState,
    ray::RayFlags,
    ray_pool::{RayPool, ShadowQueue},
    shade_pass::{self, ShadePassParameters},
    shadow_pass::{self, ShadowPassParameters},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavefrontState {
    #[default]
    Idle,
    Generating,
    Extending {
        bounce: u32,
    },
    /// Includes the shadow sub-pass of the bounce.
    Shading {
        bounce: u32,
    },
    FrameComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Generate,
    Extend,
    Shade,
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub kind: PassKind,
    pub bounce: u32,
    pub population_in: u32,
    pub population_out: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub passes: Vec<PassStats>,
    /// Extend/shade iterations executed.
    pub bounces: u32,
    /// Paths that terminated during the frame, equal to the pixel count.
    pub completed_paths: u32,
    /// Accumulated samples per pixel after the frame.
    pub sample_count: u32,
    pub duration: Duration,
}

/// GPU-style buffers of the wavefront, all sized to the output resolution.
pub struct WavefrontResources {
    pub resolution: UVec2,
    pub ray_pool: RayPool,
    pub shadow_queue: ShadowQueue,
    pub random_state: RandomState,
    pub accumulator: Accumulator,
    pub completed_paths: AtomicCounter,
}

impl WavefrontResources {
    pub fn new(resolution: UVec2, seed: u64, epoch: u32) -> Result<Self, TryReserveError> {
        let pixel_count = resolution.x * resolution.y;

        Ok(Self {
            resolution,
            ray_pool: RayPool::new(pixel_count)?,
            shadow_queue: ShadowQueue::new(pixel_count)?,
            random_state: RandomState::new(pixel_count, seed, epoch)?,
            accumulator: Accumulator::new(pixel_count)?,
            completed_paths: AtomicCounter::new(pixel_count),
        })
    }

    pub fn pixel_count(&self) -> u32 {
        self.resolution.x * self.resolution.y
    }
}

/// Drives the per-frame pass sequence
/// `Idle -> Generating -> (Extending -> Shading)* -> FrameComplete -> Idle`.
#[derive(Debug, Default)]
pub struct Wavefront {
    state: WavefrontState,
    history: Vec<WavefrontState>,
}

impl Wavefront {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WavefrontState {
        self.state
    }

    /// States visited by the most recent frame, in order.
    pub fn last_frame_states(&self) -> &[WavefrontState] {
        &self.history
    }

    fn transition(&mut self, state: WavefrontState) {
        log::trace!("Wavefront {:?} -> {:?}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    /// Renders one sample per pixel into the accumulator.
    pub fn run_frame(
        &mut self,
        resources: &mut WavefrontResources,
        scene: &Scene,
        image_plane: &ImagePlane,
        config: &RendererConfig,
    ) -> FrameStats {
        puffin::profile_function!();

        let timer = Timer::new();
        let mut stats = FrameStats::default();
        self.history.clear();

        self.transition(WavefrontState::Generating);
        resources.random_state.ensure_seeded();
        resources.completed_paths.reset();

        generate_pass::dispatch(&GeneratePassParameters {
            resolution: resources.resolution,
            image_plane,
            random_state: &resources.random_state,
            ray_pool: &resources.ray_pool,
        });
        stats.passes.push(PassStats {
            kind: PassKind::Generate,
            bounce: 0,
            population_in: 0,
            population_out: resources.ray_pool.active_count(),
        });

        let mut bounce = 0;
        while resources.ray_pool.active_count() > 0 && bounce <= config.max_bounces {
            self.transition(WavefrontState::Extending { bounce });
            let population_in = resources.ray_pool.active_count();
            extend_pass::dispatch(&ExtendPassParameters {
                scene,
                ray_pool: &resources.ray_pool,
                accumulator: &resources.accumulator,
                random_state: &resources.random_state,
                completed_paths: &resources.completed_paths,
            });
            resources.ray_pool.swap();
            stats.passes.push(PassStats {
                kind: PassKind::Extend,
                bounce,
                population_in,
                population_out: resources.ray_pool.active_count(),
            });

            stats.bounces = bounce + 1;
            if resources.ray_pool.active_count() == 0 {
                break;
            }

            self.transition(WavefrontState::Shading { bounce });
            let population_in = resources.ray_pool.active_count();
            resources.shadow_queue.clear();
            shade_pass::dispatch(&ShadePassParameters {
                scene,
                config,
                ray_pool: &resources.ray_pool,
                shadow_queue: &resources.shadow_queue,
                accumulator: &resources.accumulator,
                random_state: &resources.random_state,
                completed_paths: &resources.completed_paths,
            });
            resources.ray_pool.swap();
            stats.passes.push(PassStats {
                kind: PassKind::Shade,
                bounce,
                population_in,
                population_out: resources.ray_pool.active_count(),
            });

            let shadow_rays = resources.shadow_queue.len();
            let unoccluded = shadow_pass::dispatch(&ShadowPassParameters {
                scene,
                shadow_queue: &resources.shadow_queue,
                accumulator: &resources.accumulator,
            });
            stats.passes.push(PassStats {
                kind: PassKind::Shadow,
                bounce,
                population_in: shadow_rays,
                population_out: unoccluded,
            });

            bounce += 1;
        }

        // Max depth reached with rays still alive; their lineages end here.
        if resources.ray_pool.active_count() > 0 {
            retire_active(resources);
        }

        self.transition(WavefrontState::FrameComplete);
        stats.completed_paths = resources.completed_paths.load();
        resources.accumulator.end_sample(stats.completed_paths);
        stats.sample_count = resources.accumulator.sample_count();
        stats.duration = timer.elapsed_duration();

        self.transition(WavefrontState::Idle);
        stats
    }
}

fn retire_active(resources: &mut WavefrontResources) {
    puffin::profile_function!();

    let ray_pool = &resources.ray_pool;
    let random_state = &resources.random_state;
    let completed_paths = &resources.completed_paths;

    ray_pool.begin_pass();
    compute::dispatch(ray_pool.active_count(), |i| unsafe {
        let mut ray = ray_pool.current().read(i as usize);
        ray.flags.insert(RayFlags::TERMINATED);
        ray_pool.current().write(i as usize, ray);
        random_state.store(ray.pixel, ray.rng);
        completed_paths.reserve();
    });
    resources.ray_pool.swap();
}
