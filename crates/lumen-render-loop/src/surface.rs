use std::sync::Arc;

use anyhow::{Context as _, Result};
use winit::{dpi::PhysicalSize, window::Window};

use crate::Context;

/// Window surface that survives suspend and resume.
#[derive(Default)]
pub struct Surface {
    surface: Option<wgpu::Surface<'static>>,
    config: Option<wgpu::SurfaceConfiguration>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the surface so that adapter selection can check compatibility against it.
    pub fn pre_adapter(&mut self, instance: &wgpu::Instance, window: Arc<Window>) -> Result<()> {
        self.surface = Some(
            instance
                .create_surface(window)
                .context("Failed to create window surface")?,
        );
        Ok(())
    }

    pub fn get(&self) -> Option<&wgpu::Surface<'static>> {
        self.surface.as_ref()
    }

    /// (Re)configures the surface for the current window size. The view format is the sRGB or
    /// linear variant of the preferred format, depending on `srgb`.
    pub fn resume(&mut self, context: &Context, window: Arc<Window>, srgb: bool) -> Result<()> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface = match self.surface.take() {
            Some(surface) => surface,
            None => context
                .instance
                .create_surface(window)
                .context("Failed to create window surface")?,
        };

        let mut config = surface
            .get_default_config(&context.adapter, width, height)
            .context("Window surface is not supported by the adapter")?;
        let view_format = if srgb {
            config.format.add_srgb_suffix()
        } else {
            config.format.remove_srgb_suffix()
        };
        config.view_formats.push(view_format);

        surface.configure(&context.device, &config);
        self.surface = Some(surface);
        self.config = Some(config);

        Ok(())
    }

    pub fn suspend(&mut self) {
        // Android destroys the native window while suspended.
        if cfg!(target_os = "android") {
            self.surface = None;
        }
    }

    pub fn resize(&mut self, context: &Context, size: PhysicalSize<u32>) {
        if let (Some(surface), Some(config)) = (&self.surface, &mut self.config) {
            config.width = size.width.max(1);
            config.height = size.height.max(1);
            surface.configure(&context.device, config);
        }
    }

    /// Acquires the next swapchain texture, reconfiguring once if the surface went stale.
    pub fn acquire(&mut self, context: &Context) -> Result<wgpu::SurfaceTexture> {
        let (Some(surface), Some(config)) = (&self.surface, &self.config) else {
            anyhow::bail!("Surface is not configured");
        };

        match surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(err @ wgpu::SurfaceError::OutOfMemory) => Err(err.into()),
            Err(err) => {
                log::warn!("Reconfiguring surface after {err}");
                surface.configure(&context.device, config);
                surface
                    .get_current_texture()
                    .context("Failed to acquire next swapchain texture")
            }
        }
    }

    pub fn config(&self) -> Option<&wgpu::SurfaceConfiguration> {
        self.config.as_ref()
    }
}
