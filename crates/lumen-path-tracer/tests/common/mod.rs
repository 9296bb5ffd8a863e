#![allow(dead_code)]

use glam::{UVec2, Vec3};
use lumen_camera::{Camera, CameraDesc};
use lumen_path_tracer::{FrameImage, Presenter, Renderer, RendererConfig};
use lumen_scene::{Environment, Material, Scene, SceneBuilder};

/// Camera at the origin looking down `-Z` with a square 30 degree view.
pub fn camera() -> Camera {
    let mut camera = Camera::new(CameraDesc {
        position: Vec3::ZERO,
        fov: 30.0,
        aspect_ratio: 1.0,
        lens_radius: 0.0,
        focal_distance: 1.0,
    });
    camera.generate_image_plane();
    camera
}

/// A single sphere in front of the camera, large enough to cover the whole view.
pub fn sphere_filling_view(material: Material, environment: Environment) -> Scene {
    let mut builder = SceneBuilder::new();
    let material = builder.material(material);
    builder.sphere(Vec3::new(0.0, 0.0, -3.0), 2.5, material);
    builder.environment(environment);
    builder.build()
}

/// Diffuse floor and backdrop lit by one small emissive sphere, under a black sky.
pub fn lit_room() -> Scene {
    let mut builder = SceneBuilder::new();
    let diffuse = builder.material(Material::diffuse(Vec3::splat(0.6)));
    let light = builder.material(Material::emissive(Vec3::splat(20.0)));
    builder.sphere(Vec3::new(0.0, -1001.0, 0.0), 1000.0, diffuse);
    builder.sphere(Vec3::new(0.0, 0.0, -1010.0), 1000.0, diffuse);
    builder.sphere(Vec3::new(0.0, 0.0, -4.0), 0.75, diffuse);
    builder.sphere(Vec3::new(1.0, 1.5, -3.0), 0.25, light);
    builder.build()
}

pub fn renderer(scene: Scene, resolution: UVec2, config: RendererConfig) -> Renderer {
    Renderer::new(resolution, scene, config).unwrap()
}

/// Records what it was asked to present.
#[derive(Default)]
pub struct CapturePresenter {
    pub frames: Vec<UVec2>,
    pub last_pixels: Vec<u8>,
}

impl Presenter for CapturePresenter {
    fn present(&mut self, image: &FrameImage) -> anyhow::Result<()> {
        assert_eq!(
            image.pixels.len(),
            (image.resolution.x * image.resolution.y * 4) as usize
        );
        self.frames.push(image.resolution);
        self.last_pixels = image.pixels.to_vec();
        Ok(())
    }
}

pub struct FailingPresenter;

impl Presenter for FailingPresenter {
    fn present(&mut self, _image: &FrameImage) -> anyhow::Result<()> {
        anyhow::bail!("surface lost")
    }
}
