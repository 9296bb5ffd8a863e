use std::{
    cell::UnsafeCell,
    collections::TryReserveError,
    sync::atomic::{AtomicU32, Ordering},
};

/// Fixed-capacity storage shared between the work items of a compute dispatch.
///
/// Reads and writes are not synchronized. Callers must guarantee that no slot is written by
/// more than one work item per dispatch, and that a written slot is not read by another work
/// item of the same dispatch.
pub struct StorageBuffer<T> {
    data: Box<[UnsafeCell<T>]>,
}

// Access is coordinated by the dispatch ownership rules documented above.
unsafe impl<T: Send> Sync for StorageBuffer<T> {}

impl<T: Copy + Default> StorageBuffer<T> {
    /// Allocates `len` default-initialized slots, failing instead of aborting when the
    /// allocation can not be satisfied.
    pub fn new(len: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize_with(len, || UnsafeCell::new(T::default()));

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// # Safety
    /// No work item may write slot `i` during the current dispatch.
    pub unsafe fn read(&self, i: usize) -> T {
        *self.data[i].get()
    }

    /// # Safety
    /// The calling work item must be the only one accessing slot `i` during the current
    /// dispatch.
    pub unsafe fn write(&self, i: usize, value: T) {
        *self.data[i].get() = value;
    }

    pub fn get(&mut self, i: usize) -> T {
        *self.data[i].get_mut()
    }

    pub fn set(&mut self, i: usize, value: T) {
        *self.data[i].get_mut() = value;
    }

    pub fn fill(&mut self, value: T) {
        for slot in self.data.iter_mut() {
            *slot.get_mut() = value;
        }
    }

    pub fn to_vec(&mut self) -> Vec<T> {
        self.data.iter_mut().map(|slot| *slot.get_mut()).collect()
    }
}

/// Atomic slot allocator that never hands out more indices than its capacity.
#[derive(Debug)]
pub struct AtomicCounter {
    value: AtomicU32,
    capacity: u32,
}

impl AtomicCounter {
    pub fn new(capacity: u32) -> Self {
        Self {
            value: AtomicU32::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn load(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Hands out the next unique index, or `None` once the counter reached capacity.
    pub fn reserve(&self) -> Option<u32> {
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                (value < self.capacity).then_some(value + 1)
            })
            .ok()
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }

    /// Sets the counter to `value`, clamped to capacity.
    pub fn set(&self, value: u32) {
        self.value.store(value.min(self.capacity), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    use super::*;

    #[test]
    fn counter_never_exceeds_capacity() {
        let counter = AtomicCounter::new(1000);

        let reserved: Vec<u32> = (0..4000)
            .into_par_iter()
            .filter_map(|_| counter.reserve())
            .collect();

        assert_eq!(counter.load(), 1000);
        assert_eq!(reserved.len(), 1000);
        assert_eq!(reserved.iter().collect::<HashSet<_>>().len(), 1000);
        assert!(reserved.iter().all(|i| *i < 1000));
    }

    #[test]
    fn reset_and_set_clamp() {
        let counter = AtomicCounter::new(8);
        counter.set(20);
        assert_eq!(counter.load(), 8);
        assert_eq!(counter.reserve(), None);

        counter.reset();
        assert_eq!(counter.reserve(), Some(0));
    }

    #[test]
    fn storage_buffer_parallel_unique_writes() {
        let mut buffer = StorageBuffer::<u32>::new(256).unwrap();
        (0..256u32).into_par_iter().for_each(|i| unsafe {
            buffer.write(i as usize, i * 2);
        });

        assert_eq!(buffer.get(100), 200);
        assert_eq!(buffer.to_vec().len(), 256);

        buffer.fill(7);
        assert!(buffer.to_vec().iter().all(|v| *v == 7));
    }

    #[test]
    fn huge_allocation_fails_gracefully() {
        assert!(StorageBuffer::<[u64; 32]>::new(usize::MAX / 64).is_err());
    }
}
