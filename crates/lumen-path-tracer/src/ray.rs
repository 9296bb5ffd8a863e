use bitflags::bitflags;
use glam::Vec3;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RayFlags: u32 {
        /// Retired from the wavefront, never part of an active prefix.
        const TERMINATED = 0b00000001;
        /// The last scattering event was a perfect specular reflection.
        const SPECULAR = 0b00000010;
    }
}

impl Default for RayFlags {
    fn default() -> Self {
        RayFlags::empty()
    }
}

/// In-flight path segment. A lineage keeps its pixel for its entire lifetime and carries the
/// pixel's random state between bounces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub throughput: Vec3,
    pub pixel: u32,
    pub depth: u32,
    pub rng: u32,
    pub flags: RayFlags,
}

impl Ray {
    pub fn primary(origin: Vec3, direction: Vec3, pixel: u32, rng: u32) -> Self {
        Self {
            origin,
            direction,
            throughput: Vec3::ONE,
            pixel,
            depth: 0,
            rng,
            flags: RayFlags::empty(),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.flags.contains(RayFlags::TERMINATED)
    }

    pub fn after_specular(&self) -> bool {
        self.flags.contains(RayFlags::SPECULAR)
    }
}

/// Next event estimation query, resolved by the shadow sub-pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub distance: f32,
    /// Radiance added to `pixel` when the segment is unoccluded.
    pub contribution: Vec3,
    pub pixel: u32,
}
