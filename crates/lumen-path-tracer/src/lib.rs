//! Wavefront progressive path tracer.
//!
//! A frame runs as a sequence of data-parallel dispatches over a double buffered ray pool:
//! generate seeds one primary ray per pixel, then extend (closest hit) and shade (emission,
//! light sampling, scattering) alternate until every path has terminated. Radiance is summed
//! into a per-pixel accumulator that is only cleared by an explicit reset.

mod accumulator;
mod buffer;
mod compute;
mod config;
mod error;
mod extend_pass;
mod generate_pass;
mod presenter;
mod random;
mod random_state;
mod ray;
mod ray_pool;
mod renderer;
mod resolve_pass;
mod session;
mod shade_pass;
mod shadow_pass;
mod wavefront;

pub use accumulator::Accumulator;
pub use buffer::{AtomicCounter, StorageBuffer};
pub use config::RendererConfig;
pub use error::RenderError;
pub use presenter::{FrameImage, Presenter};
pub use random_state::RandomState;
pub use ray::{Ray, RayFlags, ShadowRay};
pub use ray_pool::{RayPool, ShadowQueue};
pub use renderer::{ReferenceStats, Renderer};
pub use resolve_pass::tonemap;
pub use session::RenderSession;
pub use wavefront::{
    FrameStats, PassKind, PassStats, Wavefront, WavefrontResources, WavefrontState,
};
