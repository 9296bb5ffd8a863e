use std::collections::TryReserveError;

use glam::Vec3;

use crate::buffer::StorageBuffer;

/// Per-pixel running radiance sums plus the sample counter they are averaged by.
///
/// Sums and counters are only ever cleared together through [`Accumulator::clear`].
pub struct Accumulator {
    sums: StorageBuffer<Vec3>,
    sample_count: u32,
    completed_paths: u64,
}

impl Accumulator {
    pub fn new(pixel_count: u32) -> Result<Self, TryReserveError> {
        Ok(Self {
            sums: StorageBuffer::new(pixel_count as usize)?,
            sample_count: 0,
            completed_paths: 0,
        })
    }

    pub fn pixel_count(&self) -> u32 {
        self.sums.len() as u32
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Paths terminated since the last clear, over all accumulated samples.
    pub fn completed_paths(&self) -> u64 {
        self.completed_paths
    }

    /// Adds `radiance` to the running sum of `pixel`.
    ///
    /// # Safety
    /// Only the single path owning `pixel` may write to it during a dispatch.
    pub unsafe fn add(&self, pixel: u32, radiance: Vec3) {
        let sum = self.sums.read(pixel as usize);
        self.sums.write(pixel as usize, sum + radiance);
    }

    /// Completes one sample per pixel.
    pub fn end_sample(&mut self, completed_paths: u32) {
        self.sample_count += 1;
        self.completed_paths += completed_paths as u64;
    }

    pub fn clear(&mut self) {
        self.sums.fill(Vec3::ZERO);
        self.sample_count = 0;
        self.completed_paths = 0;
    }

    pub fn sums(&self) -> &StorageBuffer<Vec3> {
        &self.sums
    }

    pub fn sum(&mut self, pixel: u32) -> Vec3 {
        self.sums.get(pixel as usize)
    }

    /// Running estimate of `pixel`, black before the first sample.
    pub fn average(&mut self, pixel: u32) -> Vec3 {
        if self.sample_count == 0 {
            Vec3::ZERO
        } else {
            self.sum(pixel) / self.sample_count as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_zeroes_sums_and_counters_together() {
        let mut accumulator = Accumulator::new(4).unwrap();
        unsafe {
            accumulator.add(2, Vec3::ONE);
            accumulator.add(2, Vec3::ONE);
        }
        accumulator.end_sample(4);
        accumulator.end_sample(4);

        assert_eq!(accumulator.sample_count(), 2);
        assert_eq!(accumulator.completed_paths(), 8);
        assert_eq!(accumulator.average(2), Vec3::ONE);

        accumulator.clear();
        assert_eq!(accumulator.sample_count(), 0);
        assert_eq!(accumulator.completed_paths(), 0);
        assert_eq!(accumulator.sum(2), Vec3::ZERO);
        assert_eq!(accumulator.average(2), Vec3::ZERO);
    }
}
