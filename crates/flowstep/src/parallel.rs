//! Data-parallel index fan-out with a completion barrier
//!
//! Every integration call is a single pass over the active index range in
//! which work-item `i` reads and writes slot `i` of each buffer and nothing
//! else. The kernel expresses that by splitting all buffers at the same chunk
//! boundaries ([`Lanes`]) and handing each chunk to its own task, so the
//! borrow checker sees disjoint `&mut` slices rather than shared arrays.
//!
//! The task pool is bevy's `ComputeTaskPool`; `TaskPool::scope` does not
//! return until every spawned chunk has finished, which is the fence callers
//! rely on.

use crate::population::IndexRange;
use bevy::log::trace;
use bevy::tasks::{ComputeTaskPool, TaskPool};
use serde::{Deserialize, Serialize};

/// Where kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// On the calling thread, in index order.
    Serial,
    /// Chunked across bevy's compute task pool.
    #[default]
    TaskPool,
}

/// A bundle of equally indexed buffers that can be cut into disjoint pieces.
///
/// Index `0` of a lanes value is the first slot it covers; the kernel keeps
/// track of the matching global particle index.
pub trait Lanes: Send + Sized {
    /// Number of slots covered.
    fn lanes_len(&self) -> usize;

    /// Splits every buffer at `mid`, yielding `[0, mid)` and `[mid, len)`.
    fn split_lanes(self, mid: usize) -> (Self, Self);
}

impl<T: Send> Lanes for &mut [T] {
    fn lanes_len(&self) -> usize {
        self.len()
    }

    fn split_lanes(self, mid: usize) -> (Self, Self) {
        self.split_at_mut(mid)
    }
}

impl<T: Sync> Lanes for &[T] {
    fn lanes_len(&self) -> usize {
        self.len()
    }

    fn split_lanes(self, mid: usize) -> (Self, Self) {
        <[T]>::split_at(self, mid)
    }
}

impl<A: Lanes, B: Lanes> Lanes for (A, B) {
    fn lanes_len(&self) -> usize {
        self.0.lanes_len().min(self.1.lanes_len())
    }

    fn split_lanes(self, mid: usize) -> (Self, Self) {
        let (a_lo, a_hi) = self.0.split_lanes(mid);
        let (b_lo, b_hi) = self.1.split_lanes(mid);
        ((a_lo, b_lo), (a_hi, b_hi))
    }
}

/// "For each index in range" executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelKernel {
    backend: Backend,
    min_chunk_len: usize,
}

impl ParallelKernel {
    /// Below this many indices per task the spawn overhead dominates.
    pub const DEFAULT_MIN_CHUNK_LEN: usize = 1024;

    pub fn new(backend: Backend, min_chunk_len: usize) -> Self {
        Self {
            backend,
            min_chunk_len: min_chunk_len.max(1),
        }
    }

    pub fn serial() -> Self {
        Self::new(Backend::Serial, Self::DEFAULT_MIN_CHUNK_LEN)
    }

    pub fn task_pool() -> Self {
        Self::new(Backend::TaskPool, Self::DEFAULT_MIN_CHUNK_LEN)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn min_chunk_len(&self) -> usize {
        self.min_chunk_len
    }

    /// Calls `body(lanes, local, index)` once for every `index` in `range`,
    /// where `local` addresses the slot inside the chunk handed to `body`.
    ///
    /// `lanes` must cover slot `0` upward and hold at least `range.last`
    /// slots. Returns only after every index has been processed.
    pub fn for_each<L, F>(&self, label: &str, range: IndexRange, lanes: L, body: F)
    where
        L: Lanes,
        F: Fn(&mut L, usize, usize) + Sync,
    {
        if range.is_empty() {
            return;
        }

        debug_assert!(
            lanes.lanes_len() >= range.last,
            "{label}: lanes shorter than range {range}"
        );
        let (_, tail) = lanes.split_lanes(range.first);
        let (window, _) = tail.split_lanes(range.len());

        match self.backend {
            Backend::Serial => {
                trace!("{label}: serial over {range}");
                run_chunk(window, range.first, &body);
            }
            Backend::TaskPool => {
                let pool = ComputeTaskPool::get_or_init(TaskPool::default);
                let chunk_len = self.chunk_len(range.len(), pool.thread_num());

                if chunk_len >= range.len() {
                    trace!("{label}: single chunk over {range}");
                    run_chunk(window, range.first, &body);
                    return;
                }

                trace!(
                    "{label}: {} chunks of {chunk_len} over {range}",
                    range.len().div_ceil(chunk_len)
                );

                let body = &body;
                pool.scope(|scope| {
                    let mut rest = window;
                    let mut start = range.first;
                    while rest.lanes_len() > 0 {
                        let take = chunk_len.min(rest.lanes_len());
                        let (chunk, tail) = rest.split_lanes(take);
                        rest = tail;
                        let first = start;
                        scope.spawn(async move { run_chunk(chunk, first, body) });
                        start += take;
                    }
                });
            }
        }
    }

    fn chunk_len(&self, len: usize, threads: usize) -> usize {
        len.div_ceil(threads.max(1)).max(self.min_chunk_len)
    }
}

impl Default for ParallelKernel {
    fn default() -> Self {
        Self::task_pool()
    }
}

fn run_chunk<L, F>(mut chunk: L, first: usize, body: &F)
where
    L: Lanes,
    F: Fn(&mut L, usize, usize),
{
    for local in 0..chunk.lanes_len() {
        body(&mut chunk, local, first + local);
    }
}
