use std::sync::Arc;

use anyhow::Result;
use futures::executor::block_on;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

mod blit_pass;
mod context;
mod frame_texture;
mod surface;

pub use blit_pass::BlitPass;
pub use context::Context;
pub use frame_texture::FrameTexture;
pub use surface::Surface;

pub use wgpu;
pub use winit;

pub struct RenderLoopWindowDesc {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizeable: bool,
    pub maximized: bool,
}

/// An application driven by [`RenderLoopHandler`], one `render` per redraw.
pub trait RenderLoop: 'static + Sized {
    /// Whether the swapchain view applies sRGB encoding on write.
    const SRGB: bool = true;

    /// Whatever `init` needs besides the GPU context, handed over by [`RenderLoopHandler::new`].
    type Args: 'static;

    fn required_features() -> wgpu::Features {
        wgpu::Features::empty()
    }

    fn required_limits() -> wgpu::Limits {
        wgpu::Limits::downlevel_webgl2_defaults()
    }

    fn init(
        args: &Self::Args,
        config: &wgpu::SurfaceConfiguration,
        ctx: &Context,
        window: Arc<Window>,
    ) -> Result<Self>;

    fn resize(&mut self, _config: &wgpu::SurfaceConfiguration, _ctx: &Context) {}

    fn window_event(&mut self, _event: &WindowEvent) {}
    fn device_event(&mut self, _event: &DeviceEvent) {}

    /// Draws one frame into `view`. Returns `true` to exit the loop.
    fn render(&mut self, view: &wgpu::TextureView, ctx: &Context) -> Result<bool>;

    /// Called once after the loop exited, successfully or not.
    fn clean_up(self) {}
}

struct RenderLoopState<R: RenderLoop> {
    window: Arc<Window>,
    surface: Surface,
    context: Context,
    render_loop: R,
}

impl<R: RenderLoop> RenderLoopState<R> {
    async fn from_window(args: &R::Args, window: Arc<Window>) -> Result<Self> {
        let mut surface = Surface::new();
        let context = Context::init_async(
            &mut surface,
            window.clone(),
            R::required_features(),
            R::required_limits(),
        )
        .await?;

        surface.resume(&context, window.clone(), R::SRGB)?;
        let config = surface
            .config()
            .ok_or_else(|| anyhow::anyhow!("Surface is not configured"))?;

        let render_loop = R::init(args, config, &context, window.clone())?;

        Ok(Self {
            window,
            surface,
            context,
            render_loop,
        })
    }

    fn redraw(&mut self) -> Result<bool> {
        puffin::profile_function!();

        let frame = self.surface.acquire(&self.context)?;
        let format = self
            .surface
            .config()
            .map(|config| config.view_formats[0])
            .unwrap_or(frame.texture.format());
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(format),
            ..wgpu::TextureViewDescriptor::default()
        });

        let exit = self.render_loop.render(&view, &self.context)?;
        frame.present();

        Ok(exit)
    }
}

/// Owns the window and GPU state of a [`RenderLoop`] and feeds it winit events.
pub struct RenderLoopHandler<R: RenderLoop> {
    desc: RenderLoopWindowDesc,
    args: R::Args,
    state: Option<RenderLoopState<R>>,
    error: Option<anyhow::Error>,
}

impl<R: RenderLoop> RenderLoopHandler<R> {
    pub fn new(desc: RenderLoopWindowDesc, args: R::Args) -> Self {
        Self {
            desc,
            args,
            state: None,
            error: None,
        }
    }

    /// Runs until the window closes or the render loop asks to exit. The first fatal error
    /// ends the loop and is returned.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        if let Some(state) = self.state.take() {
            state.render_loop.clean_up();
        }

        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }
}

impl<R: RenderLoop> ApplicationHandler for RenderLoopHandler<R> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            if let Err(err) = state
                .surface
                .resume(&state.context, state.window.clone(), R::SRGB)
            {
                self.fail(event_loop, err);
            }
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.desc.title.clone())
            .with_inner_size(PhysicalSize::new(self.desc.width, self.desc.height))
            .with_resizable(self.desc.resizeable)
            .with_maximized(self.desc.maximized);
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        match block_on(RenderLoopState::<R>::from_window(&self.args, window)) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.surface.suspend();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.render_loop.window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                puffin::GlobalProfiler::lock().new_frame();

                match state.redraw() {
                    Ok(true) => event_loop.exit(),
                    Ok(false) => state.window.request_redraw(),
                    Err(err) => self.fail(event_loop, err),
                }
            }
            WindowEvent::Resized(size) => {
                state.surface.resize(&state.context, size);
                if let Some(config) = state.surface.config() {
                    state.render_loop.resize(config, &state.context);
                }
                state.window.request_redraw();
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.render_loop.device_event(&event);
        }
    }
}
