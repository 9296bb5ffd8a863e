#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    /// Maximum number of scattering events per path.
    pub max_bounces: u32,
    /// First bounce at which Russian roulette may terminate a path.
    pub russian_roulette_depth: u32,
    /// Samples per pixel of a reference render.
    pub reference_samples: u32,
    /// Base seed mixed into every per-pixel random state.
    pub seed: u64,
    /// Linear scale applied before tone mapping.
    pub exposure: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_bounces: 5,
            russian_roulette_depth: 3,
            reference_samples: 1024,
            seed: 0,
            exposure: 1.0,
        }
    }
}
