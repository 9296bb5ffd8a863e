use std::collections::TryReserveError;

use murmurhash3::murmurhash3_x64_128;

use crate::{buffer::StorageBuffer, compute};

/// Persistent per-pixel xorshift state.
///
/// Seeding is lazy: [`RandomState::reset`] and construction only mark the store as unseeded,
/// and the next [`RandomState::ensure_seeded`] derives fresh seeds from the pixel index, the
/// reset epoch and the base seed.
pub struct RandomState {
    states: StorageBuffer<u32>,
    base_seed: u64,
    epoch: u32,
    seeded: bool,
}

impl RandomState {
    pub fn new(pixel_count: u32, base_seed: u64, epoch: u32) -> Result<Self, TryReserveError> {
        Ok(Self {
            states: StorageBuffer::new(pixel_count as usize)?,
            base_seed,
            epoch,
            seeded: false,
        })
    }

    /// Deterministic, never-zero seed of `pixel` for the given reset epoch.
    pub fn seed_for(pixel: u32, epoch: u32, base_seed: u64) -> u32 {
        let key = [pixel.to_le_bytes(), epoch.to_le_bytes()].concat();
        let hash = murmurhash3_x64_128(&key, base_seed).0;
        let seed = (hash ^ (hash >> 32)) as u32;

        if seed == 0 {
            0x9e37_79b9
        } else {
            seed
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.states.len() as u32
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Starts a new epoch; seeds are regenerated before the next use.
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.seeded = false;
    }

    pub fn ensure_seeded(&mut self) {
        if self.seeded {
            return;
        }

        puffin::profile_function!();

        let states = &self.states;
        let epoch = self.epoch;
        let base_seed = self.base_seed;
        compute::dispatch(self.pixel_count(), |pixel| unsafe {
            states.write(pixel as usize, Self::seed_for(pixel, epoch, base_seed));
        });

        self.seeded = true;
        log::debug!("Seeded random state for epoch {}", epoch);
    }

    /// # Safety
    /// See [`StorageBuffer::read`].
    pub unsafe fn load(&self, pixel: u32) -> u32 {
        self.states.read(pixel as usize)
    }

    /// # Safety
    /// See [`StorageBuffer::write`]; only the path owning `pixel` may store its state.
    pub unsafe fn store(&self, pixel: u32, state: u32) {
        self.states.write(pixel as usize, state)
    }

    pub fn get(&mut self, pixel: u32) -> u32 {
        self.states.get(pixel as usize)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn seeds_are_unique_per_pixel_and_epoch() {
        let mut seeds = HashSet::new();
        for epoch in 0..4 {
            for pixel in 0..1024 {
                let seed = RandomState::seed_for(pixel, epoch, 42);
                assert_ne!(seed, 0);
                seeds.insert(seed);
            }
        }

        // Collisions between 4096 random 32 bit values are possible but very unlikely.
        assert!(seeds.len() >= 4094);
        assert_eq!(
            RandomState::seed_for(5, 1, 42),
            RandomState::seed_for(5, 1, 42)
        );
        assert_ne!(RandomState::seed_for(5, 1, 42), RandomState::seed_for(5, 1, 43));
    }

    #[test]
    fn reset_reseeds_lazily_with_new_epoch() {
        let mut random_state = RandomState::new(16, 7, 0).unwrap();
        assert!(!random_state.is_seeded());

        random_state.ensure_seeded();
        let before: Vec<u32> = (0..16).map(|p| random_state.get(p)).collect();

        random_state.reset();
        assert!(!random_state.is_seeded());
        assert_eq!(random_state.epoch(), 1);

        random_state.ensure_seeded();
        let after: Vec<u32> = (0..16).map(|p| random_state.get(p)).collect();
        assert!(before.iter().zip(&after).all(|(a, b)| a != b));
        assert_eq!(after[3], RandomState::seed_for(3, 1, 7));
    }
}
