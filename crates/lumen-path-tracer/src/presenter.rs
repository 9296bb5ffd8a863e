use glam::UVec2;

/// A resolved RGBA8 frame, rows top to bottom.
#[derive(Debug, Clone, Copy)]
pub struct FrameImage<'a> {
    pub resolution: UVec2,
    pub pixels: &'a [u8],
}

/// Displays resolved frames, typically by drawing a full-screen quad.
pub trait Presenter {
    fn present(&mut self, image: &FrameImage) -> anyhow::Result<()>;
}
