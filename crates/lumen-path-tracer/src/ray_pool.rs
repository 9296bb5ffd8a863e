use std::collections::TryReserveError;

use lumen_scene::Hit;

use crate::{
    buffer::{AtomicCounter, StorageBuffer},
    ray::{Ray, ShadowRay},
};

/// Double buffered wavefront working set.
///
/// Passes read the active prefix `[0, count)` of the current buffer and append survivors to the
/// next buffer through its counter; [`RayPool::swap`] then makes the compacted survivors
/// current. Hit records are indexed by the survivor's slot in the next buffer.
pub struct RayPool {
    rays: [StorageBuffer<Ray>; 2],
    counters: [AtomicCounter; 2],
    hits: StorageBuffer<Hit>,
    current: usize,
}

impl RayPool {
    pub fn new(capacity: u32) -> Result<Self, TryReserveError> {
        Ok(Self {
            rays: [
                StorageBuffer::new(capacity as usize)?,
                StorageBuffer::new(capacity as usize)?,
            ],
            counters: [AtomicCounter::new(capacity), AtomicCounter::new(capacity)],
            hits: StorageBuffer::new(capacity as usize)?,
            current: 0,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.counters[0].capacity()
    }

    pub fn active_count(&self) -> u32 {
        self.counters[self.current].load()
    }

    pub fn current(&self) -> &StorageBuffer<Ray> {
        &self.rays[self.current]
    }

    pub fn current_counter(&self) -> &AtomicCounter {
        &self.counters[self.current]
    }

    pub fn next(&self) -> &StorageBuffer<Ray> {
        &self.rays[1 - self.current]
    }

    pub fn next_counter(&self) -> &AtomicCounter {
        &self.counters[1 - self.current]
    }

    pub fn hits(&self) -> &StorageBuffer<Hit> {
        &self.hits
    }

    /// Empties the next buffer before a pass appends to it.
    pub fn begin_pass(&self) {
        self.next_counter().reset();
    }

    /// Makes the survivors appended by the last pass the active population.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Copy of the active prefix of the current buffer.
    pub fn active_rays(&mut self) -> Vec<Ray> {
        let count = self.active_count() as usize;
        let current = self.current;
        self.rays[current].to_vec()[..count].to_vec()
    }

    /// Every slot of the buffer that was current before the last swap.
    pub fn retired_buffer(&mut self) -> Vec<Ray> {
        let previous = 1 - self.current;
        self.rays[previous].to_vec()
    }
}

/// Append-only queue of shadow rays produced by a shade pass.
pub struct ShadowQueue {
    rays: StorageBuffer<ShadowRay>,
    counter: AtomicCounter,
}

impl ShadowQueue {
    pub fn new(capacity: u32) -> Result<Self, TryReserveError> {
        Ok(Self {
            rays: StorageBuffer::new(capacity as usize)?,
            counter: AtomicCounter::new(capacity),
        })
    }

    pub fn len(&self) -> u32 {
        self.counter.load()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.counter.reset();
    }

    /// Appends `ray`, returning `false` when the queue is full.
    ///
    /// # Safety
    /// Must not race with [`ShadowQueue::get`] in the same dispatch.
    pub unsafe fn push(&self, ray: ShadowRay) -> bool {
        match self.counter.reserve() {
            Some(slot) => {
                self.rays.write(slot as usize, ray);
                true
            }
            None => false,
        }
    }

    /// # Safety
    /// Must not race with [`ShadowQueue::push`] in the same dispatch.
    pub unsafe fn get(&self, i: u32) -> ShadowRay {
        self.rays.read(i as usize)
    }
}
