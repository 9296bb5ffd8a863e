use glam::UVec2;

/// CPU rendered RGBA8 frame living on the GPU. The bytes are already sRGB encoded, so the
/// texture uses an sRGB format and samples back to linear.
pub struct FrameTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FrameTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(device: &wgpu::Device, resolution: UVec2) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame_texture"),
            size: wgpu::Extent3d {
                width: resolution.x,
                height: resolution.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    pub fn resolution(&self) -> UVec2 {
        UVec2::new(self.texture.width(), self.texture.height())
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Uploads tightly packed rows, top row first.
    pub fn write(&self, queue: &wgpu::Queue, pixels: &[u8]) {
        puffin::profile_function!();

        let resolution = self.resolution();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * resolution.x),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: resolution.x,
                height: resolution.y,
                depth_or_array_layers: 1,
            },
        );
    }
}
