//! Fan-out/fan-in over independent tasks.
//!
//! Callers describe work as `task(index) -> T` and receive results in index
//! order. Tasks must not share mutable state; everything a task needs is
//! captured by reference or derived from its index.

use rayon::prelude::*;

#[cfg(test)]
mod tests;

/// Number of chunks handed to rayon per worker thread.
const CHUNKS_PER_THREAD: usize = 3;

#[inline]
fn auto_chunk_size(len: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (len / num_chunks).max(1)
}

/// Runs `count` independent tasks and collects their results in index order.
pub trait TaskMap {
    fn map_tasks<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;
}

/// Runs tasks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl TaskMap for Sequential {
    fn map_tasks<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..count).map(task).collect()
    }
}

/// Runs tasks on the global rayon pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonPool;

impl TaskMap for RayonPool {
    fn map_tasks<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..count)
            .into_par_iter()
            .with_min_len(auto_chunk_size(count))
            .map(task)
            .collect()
    }
}
