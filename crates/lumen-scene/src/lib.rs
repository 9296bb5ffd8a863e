//! Immutable render scene: geometry, materials, emitters and environment lighting, plus the
//! ray queries the path tracer's passes are built on.

mod bvh;
mod environment;
mod gltf_loader;
mod material;
mod obj_loader;
mod primitive;
mod scene;
mod texture;

pub use bvh::Aabb;
pub use environment::Environment;
pub use material::{Material, MaterialKind};
pub use primitive::{orthonormal_basis, Hit, LightSample, Primitive, Sphere, Triangle};
pub use scene::{Scene, SceneBuilder};
pub use texture::Texture;

/// Closest distance along a ray that still counts as an intersection.
pub const RAY_T_MIN: f32 = 1e-4;
