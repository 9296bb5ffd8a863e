use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::Parser;
use glam::{UVec2, Vec3};
use lumen::lumen_camera::{Camera, CameraDesc};
use lumen::lumen_input::{EventQueue, InputBindings, InputHandler};
use lumen::lumen_path_tracer::{FrameImage, Presenter, RenderSession, Renderer, RendererConfig};
use lumen::lumen_render_loop::winit::{
    event::{DeviceEvent, WindowEvent},
    window::Window,
};
use lumen::lumen_render_loop::{
    wgpu, BlitPass, Context, FrameTexture, RenderLoop, RenderLoopHandler, RenderLoopWindowDesc,
};
use lumen::lumen_time::Timer;
use lumen::Lumen;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Mesh scene to render (.gltf, .glb or .obj)
    #[arg(long)]
    scene: PathBuf,

    /// Equirectangular environment image, or a text file listing six cubemap faces
    #[arg(long)]
    environment: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Maximum number of bounces per path
    #[arg(long)]
    max_bounces: Option<u32>,

    /// Samples per pixel of a reference render
    #[arg(long)]
    reference_samples: Option<u32>,

    /// Base seed of the per-pixel random streams
    #[arg(long)]
    seed: Option<u64>,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 45.0)]
    fov: f32,

    #[arg(long, default_value_t = 1.0)]
    focal_distance: f32,

    /// Thin lens radius, 0 renders a pinhole camera
    #[arg(long, default_value_t = 0.0)]
    lens_radius: f32,

    /// Initial camera position
    #[arg(
        long,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        default_values_t = [-0.25, 2.79, 6.0],
        allow_negative_numbers = true
    )]
    position: Vec<f32>,

    /// Directory for screenshots and reference renders
    #[arg(long, default_value = "screenshots")]
    screenshot_dir: PathBuf,

    /// Render a reference image, save it and exit without opening a window
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Collect puffin profiling scopes
    #[arg(long, default_value_t = false)]
    profile: bool,
}

impl Args {
    fn renderer_config(&self) -> RendererConfig {
        let defaults = RendererConfig::default();
        RendererConfig {
            max_bounces: self.max_bounces.unwrap_or(defaults.max_bounces),
            reference_samples: self.reference_samples.unwrap_or(defaults.reference_samples),
            seed: self.seed.unwrap_or(defaults.seed),
            ..defaults
        }
    }

    fn resolution(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    fn camera(&self) -> Camera {
        let resolution = self.resolution().as_vec2();
        Camera::new(CameraDesc {
            position: Vec3::from_slice(&self.position),
            fov: self.fov,
            aspect_ratio: resolution.x / resolution.y.max(1.0),
            lens_radius: self.lens_radius,
            focal_distance: self.focal_distance,
        })
    }

    fn session(&self, resolution: UVec2) -> Result<RenderSession> {
        let renderer = Renderer::initialize(
            resolution,
            &self.scene,
            self.environment.as_deref(),
            self.renderer_config(),
        )?;

        Ok(RenderSession::new(
            self.camera(),
            renderer,
            self.screenshot_dir.clone(),
        ))
    }
}

/// Uploads resolved frames and blits them onto the swapchain view of the current redraw.
struct SurfacePresenter<'a> {
    ctx: &'a Context,
    view: &'a wgpu::TextureView,
    blit_pass: &'a BlitPass,
    frame_texture: &'a mut Option<FrameTexture>,
}

impl Presenter for SurfacePresenter<'_> {
    fn present(&mut self, image: &FrameImage) -> Result<()> {
        let frame_texture = match self.frame_texture.take() {
            Some(texture) if texture.resolution() == image.resolution => texture,
            _ => FrameTexture::new(&self.ctx.device, image.resolution),
        };
        frame_texture.write(&self.ctx.queue, image.pixels);

        let mut command_encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        self.blit_pass.encode(
            frame_texture.view(),
            self.view,
            &self.ctx.device,
            &mut command_encoder,
        );
        self.ctx.queue.submit(Some(command_encoder.finish()));

        *self.frame_texture = Some(frame_texture);
        Ok(())
    }
}

struct ViewerRenderLoop {
    session: RenderSession,
    events: EventQueue,
    input_handler: InputHandler,
    blit_pass: BlitPass,
    frame_texture: Option<FrameTexture>,
    timer: Timer,
}

impl RenderLoop for ViewerRenderLoop {
    type Args = Args;

    fn init(
        args: &Args,
        config: &wgpu::SurfaceConfiguration,
        ctx: &Context,
        _window: Arc<Window>,
    ) -> Result<Self> {
        let session = args.session(UVec2::new(config.width, config.height))?;

        Ok(Self {
            events: session.events(),
            session,
            input_handler: InputHandler::new(InputBindings::default()),
            blit_pass: BlitPass::new(&ctx.device, config.view_formats[0]),
            frame_texture: None,
            timer: Timer::new(),
        })
    }

    fn window_event(&mut self, event: &WindowEvent) {
        self.input_handler.handle_window_input(event, &self.events);
    }

    fn device_event(&mut self, event: &DeviceEvent) {
        self.input_handler.handle_device_input(event);
    }

    fn render(&mut self, view: &wgpu::TextureView, ctx: &Context) -> Result<bool> {
        let delta_time = self.timer.lap();
        self.input_handler.update(delta_time, &self.events);

        let mut presenter = SurfacePresenter {
            ctx,
            view,
            blit_pass: &self.blit_pass,
            frame_texture: &mut self.frame_texture,
        };
        self.session.frame(&mut presenter)?;

        Ok(self.session.quit_requested())
    }

    fn clean_up(self) {
        self.session.clean_up();
    }
}

fn run_headless(args: &Args) -> Result<()> {
    let mut session = args.session(args.resolution())?;

    let (stats, path) = session.render_reference()?;
    log::info!(
        "Reference render with {} samples saved to {}",
        stats.samples,
        path.display()
    );

    session.clean_up();
    Ok(())
}

fn run_windowed(args: Args) -> Result<()> {
    RenderLoopHandler::<ViewerRenderLoop>::new(
        RenderLoopWindowDesc {
            title: "Lumen".to_owned(),
            width: args.width,
            height: args.height,
            resizeable: true,
            maximized: false,
        },
        args,
    )
    .run()
}

pub fn internal_main() -> ExitCode {
    let args = Args::parse();

    let lumen = Lumen::new("Lumen Viewer");
    if args.profile {
        lumen.enable_profiling();
    }

    let result = if args.headless {
        run_headless(&args)
    } else {
        run_windowed(args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_camera() {
        let args = Args::try_parse_from(["lumen-viewer", "--scene", "scene.glb"]).unwrap();

        assert_eq!(args.resolution(), UVec2::new(1280, 720));
        assert_eq!(args.position, vec![-0.25, 2.79, 6.0]);
        assert_eq!(args.renderer_config(), RendererConfig::default());
        assert!(!args.headless);

        let camera = args.camera();
        assert_eq!(camera.fov(), 45.0);
        assert_eq!(camera.position(), Vec3::new(-0.25, 2.79, 6.0));
    }

    #[test]
    fn overrides_reach_config_and_camera() {
        let args = Args::try_parse_from([
            "lumen-viewer",
            "--scene",
            "scene.obj",
            "--position",
            "-1",
            "2",
            "-3.5",
            "--max-bounces",
            "8",
            "--reference-samples",
            "16",
            "--seed",
            "42",
            "--lens-radius",
            "0.05",
            "--headless",
        ])
        .unwrap();

        let config = args.renderer_config();
        assert_eq!(config.max_bounces, 8);
        assert_eq!(config.reference_samples, 16);
        assert_eq!(config.seed, 42);
        assert_eq!(config.russian_roulette_depth, 3);

        let camera = args.camera();
        assert_eq!(camera.position(), Vec3::new(-1.0, 2.0, -3.5));
        assert_eq!(camera.lens_radius(), 0.05);
        assert!(args.headless);
    }

    #[test]
    fn scene_is_required() {
        assert!(Args::try_parse_from(["lumen-viewer"]).is_err());
    }
}
