//! Parallel iteration over the map ranks of an index.
//!
//! The generator, verifier, and the statistics passes all share the same
//! parallel shape: every map rank of a tile set is processed by exactly one
//! worker, with a join at the end. Workers synchronise on nothing else;
//! whatever they share goes through atomics.

use rayon::prelude::*;

use crate::index::IndexAux;

/// The largest permitted number of worker threads.
pub const MAX_JOBS: usize = 256;

/// A bounded pool of worker threads for iterating pattern databases.
pub struct Workers {
    pool: Option<rayon::ThreadPool>,
    jobs: usize,
}

impl Workers {
    /// Creates a pool of `jobs` workers, clamped to 1 to [`MAX_JOBS`].
    ///
    /// With one worker no threads are spawned and all work runs on the
    /// calling thread, which also makes single-stepping in a debugger
    /// practical. If the pool cannot be built but the process can still
    /// run on the calling thread, it degrades to one worker with a
    /// warning.
    #[must_use]
    pub fn new(jobs: usize) -> Self {
        let jobs = jobs.clamp(1, MAX_JOBS);

        if jobs == 1 {
            return Self { pool: None, jobs: 1 };
        }

        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => Self {
                pool: Some(pool),
                jobs,
            },
            Err(e) => {
                log::warn!("could not spawn worker threads ({e}), continuing with one");
                Self { pool: None, jobs: 1 }
            }
        }
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Calls `worker` once for every map rank of `aux`. Returns when all
    /// calls have finished.
    pub fn for_each_maprank<F>(&self, aux: &IndexAux, worker: F)
    where
        F: Fn(u32) + Send + Sync,
    {
        match &self.pool {
            Some(pool) => {
                pool.install(|| (0..aux.n_maprank()).into_par_iter().for_each(worker));
            }
            None => {
                for maprank in 0..aux.n_maprank() {
                    worker(maprank);
                }
            }
        }
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new(1)
    }
}
