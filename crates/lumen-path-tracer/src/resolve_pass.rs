use glam::{UVec2, Vec3};
use rayon::{iter::IndexedParallelIterator, iter::ParallelIterator, slice::ParallelSliceMut};

use crate::buffer::StorageBuffer;

pub const BYTES_PER_PIXEL: usize = 4;

pub struct ResolvePassParameters<'a> {
    pub resolution: UVec2,
    pub sample_count: u32,
    pub exposure: f32,
    pub sums: &'a StorageBuffer<Vec3>,
}

/// Averages the accumulated radiance and writes tone mapped sRGB into `target` as RGBA8.
pub fn dispatch(parameters: &ResolvePassParameters, target: &mut [u8]) {
    puffin::profile_function!();

    let pixel_count = (parameters.resolution.x * parameters.resolution.y) as usize;
    debug_assert_eq!(target.len(), pixel_count * BYTES_PER_PIXEL);

    let scale = if parameters.sample_count == 0 {
        0.0
    } else {
        parameters.exposure / parameters.sample_count as f32
    };

    target
        .par_chunks_exact_mut(BYTES_PER_PIXEL)
        .enumerate()
        .for_each(|(i, pixel)| {
            let radiance = unsafe { parameters.sums.read(i) } * scale;
            pixel.copy_from_slice(&tonemap(radiance));
        });
}

/// Reinhard tone mapping followed by the sRGB transfer function.
pub fn tonemap(radiance: Vec3) -> [u8; 4] {
    let radiance = radiance.max(Vec3::ZERO);
    let mapped = radiance / (Vec3::ONE + radiance);

    let encode = |c: f32| (linear_to_srgb(c) * 255.0).round().clamp(0.0, 255.0) as u8;
    [encode(mapped.x), encode(mapped.y), encode(mapped.z), 255]
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}
