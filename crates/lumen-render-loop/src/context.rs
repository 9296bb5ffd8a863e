use std::sync::Arc;

use anyhow::{Context as _, Result};
use winit::window::Window;

use crate::Surface;

/// The wgpu instance, adapter, device and queue shared by everything that draws to the window.
pub struct Context {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Context {
    /// Creates the device for an adapter that can present to `window`, creating the window
    /// surface on the way.
    pub async fn init_async(
        surface: &mut Surface,
        window: Arc<Window>,
        required_features: wgpu::Features,
        required_limits: wgpu::Limits,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        surface.pre_adapter(&instance, window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: surface.get(),
            })
            .await
            .context("No graphics adapter can present to the window")?;

        let info = adapter.get_info();
        log::info!("Using {} ({:?})", info.name, info.backend);

        let missing_features = required_features - adapter.features();
        if !missing_features.is_empty() {
            anyhow::bail!("Adapter does not support required features: {missing_features:?}");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features,
                    required_limits: required_limits.using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
