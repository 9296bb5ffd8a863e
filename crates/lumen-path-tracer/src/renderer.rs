use std::{path::Path, time::Duration};

use anyhow::Context;
use glam::UVec2;
use lumen_camera::Camera;
use lumen_scene::Scene;
use lumen_time::Timer;

use crate::{
    config::RendererConfig,
    error::RenderError,
    presenter::{FrameImage, Presenter},
    resolve_pass::{self, ResolvePassParameters, BYTES_PER_PIXEL},
    wavefront::{FrameStats, Wavefront, WavefrontResources},
};

struct SizedResources {
    wavefront: WavefrontResources,
    pixels: Vec<u8>,
}

impl SizedResources {
    fn new(resolution: UVec2, seed: u64, epoch: u32) -> Result<Self, RenderError> {
        let exhausted = |_| RenderError::ResourceExhausted { resolution };

        let pixel_count = resolution
            .x
            .checked_mul(resolution.y)
            .ok_or(RenderError::ResourceExhausted { resolution })?;
        let wavefront = WavefrontResources::new(resolution, seed, epoch).map_err(exhausted)?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(pixel_count as usize * BYTES_PER_PIXEL)
            .map_err(exhausted)?;
        pixels.resize(pixel_count as usize * BYTES_PER_PIXEL, 0);

        Ok(Self { wavefront, pixels })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceStats {
    pub samples: u32,
    pub duration: Duration,
}

/// Owns the scene and the wavefront resources of one output resolution.
pub struct Renderer {
    config: RendererConfig,
    resolution: UVec2,
    scene: Scene,
    sized_resources: SizedResources,
    wavefront: Wavefront,
}

impl Renderer {
    /// Loads the scene and allocates resources. Every failure here is fatal.
    pub fn initialize(
        resolution: UVec2,
        scene_path: &Path,
        environment_path: Option<&Path>,
        config: RendererConfig,
    ) -> anyhow::Result<Self> {
        puffin::profile_function!();

        let scene = Scene::load(scene_path, environment_path)?;
        let renderer = Self::new(resolution, scene, config)
            .context("Failed to create renderer resources")?;

        Ok(renderer)
    }

    pub fn new(
        resolution: UVec2,
        scene: Scene,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(RenderError::InvalidResolution(resolution));
        }

        let sized_resources = SizedResources::new(resolution, config.seed, 0)?;
        log::info!(
            "Renderer initialized at {}x{} with {} primitives and {} lights",
            resolution.x,
            resolution.y,
            scene.primitives().len(),
            scene.lights().len()
        );

        Ok(Self {
            config,
            resolution,
            scene,
            sized_resources,
            wavefront: Wavefront::new(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn sample_count(&self) -> u32 {
        self.sized_resources.wavefront.accumulator.sample_count()
    }

    /// Paths terminated since the last reset, over all samples.
    pub fn completed_paths(&self) -> u64 {
        self.sized_resources.wavefront.accumulator.completed_paths()
    }

    pub fn random_epoch(&self) -> u32 {
        self.sized_resources.wavefront.random_state.epoch()
    }

    /// Current per-pixel estimate, rows top to bottom.
    pub fn accumulated_radiance(&mut self) -> Vec<glam::Vec3> {
        let pixel_count = self.sized_resources.wavefront.pixel_count();
        let accumulator = &mut self.sized_resources.wavefront.accumulator;
        (0..pixel_count).map(|p| accumulator.average(p)).collect()
    }

    /// Adds one sample per pixel. The camera's image plane must be current.
    pub fn render_frame(&mut self, camera: &Camera) -> Result<FrameStats, RenderError> {
        puffin::profile_function!();

        let image_plane = camera.image_plane().ok_or(RenderError::StaleImagePlane)?;
        let stats = self.wavefront.run_frame(
            &mut self.sized_resources.wavefront,
            &self.scene,
            image_plane,
            &self.config,
        );

        log::debug!(
            "Frame {} took {:.2}ms over {} bounces",
            stats.sample_count,
            stats.duration.as_secs_f32() * 1000.0,
            stats.bounces
        );

        Ok(stats)
    }

    /// Restarts accumulation and renders `reference_samples` frames without presenting.
    pub fn render_reference(&mut self, camera: &Camera) -> Result<ReferenceStats, RenderError> {
        puffin::profile_function!();

        if camera.image_plane().is_none() {
            return Err(RenderError::StaleImagePlane);
        }

        let timer = Timer::new();
        self.reset_samples();
        for _ in 0..self.config.reference_samples {
            self.render_frame(camera)?;
        }

        let stats = ReferenceStats {
            samples: self.sample_count(),
            duration: timer.elapsed_duration(),
        };
        log::info!(
            "Reference render with {} samples took {:.2}s",
            stats.samples,
            stats.duration.as_secs_f32()
        );

        Ok(stats)
    }

    /// Clears the accumulator and starts a new random epoch.
    pub fn reset_samples(&mut self) {
        let resources = &mut self.sized_resources.wavefront;
        resources.accumulator.clear();
        resources.random_state.reset();
        log::debug!("Reset samples");
    }

    /// Reallocates resources for `resolution` and returns whether anything changed. On failure
    /// the previous resolution stays active.
    pub fn resize(&mut self, resolution: UVec2) -> Result<bool, RenderError> {
        if resolution == self.resolution {
            return Ok(false);
        }
        if resolution.x == 0 || resolution.y == 0 {
            return Err(RenderError::InvalidResolution(resolution));
        }

        puffin::profile_function!();

        let epoch = self.random_epoch().wrapping_add(1);
        self.sized_resources = SizedResources::new(resolution, self.config.seed, epoch)?;
        self.resolution = resolution;

        log::info!("Resized to {}x{}", resolution.x, resolution.y);
        Ok(true)
    }

    /// Tone maps the accumulator into the RGBA8 frame image.
    pub fn resolve(&mut self) -> FrameImage<'_> {
        let resources = &mut self.sized_resources;
        resolve_pass::dispatch(
            &ResolvePassParameters {
                resolution: self.resolution,
                sample_count: resources.wavefront.accumulator.sample_count(),
                exposure: self.config.exposure,
                sums: resources.wavefront.accumulator.sums(),
            },
            &mut resources.pixels,
        );

        FrameImage {
            resolution: self.resolution,
            pixels: &resources.pixels,
        }
    }

    pub fn present(&mut self, presenter: &mut dyn Presenter) -> Result<(), RenderError> {
        puffin::profile_function!();

        let image = self.resolve();
        presenter.present(&image).map_err(RenderError::Present)
    }

    /// Writes the current estimate as a PNG.
    pub fn save_screenshot(&mut self, path: &Path) -> Result<(), RenderError> {
        puffin::profile_function!();

        let screenshot_error = |source| RenderError::Screenshot {
            path: path.to_owned(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| screenshot_error(image::ImageError::IoError(err)))?;
        }

        let image = self.resolve();
        image::save_buffer(
            path,
            image.pixels,
            image.resolution.x,
            image.resolution.y,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(screenshot_error)?;

        log::info!("Saved screenshot to {}", path.display());
        Ok(())
    }

    pub fn clean_up(self) {
        log::info!(
            "Shutting down renderer after {} samples",
            self.sample_count()
        );
    }
}
