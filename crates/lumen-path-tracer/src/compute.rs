use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Runs `kernel` once for every work item in `[0, count)` on the rayon thread pool.
///
/// Work items execute in unspecified order. The call returns only after every work item
/// finished, so consecutive dispatches are separated by a full barrier.
pub fn dispatch<F>(count: u32, kernel: F)
where
    F: Fn(u32) + Send + Sync,
{
    (0..count).into_par_iter().for_each(kernel);
}
