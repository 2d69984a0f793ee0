//! Active particle population
//!
//! Integration never walks the whole field capacity. Instead every call is
//! bounded by a contiguous index range and filtered by a per-index predicate,
//! both supplied by whoever owns the particle lifecycle. [`PointStructure`] is
//! the owner used by the driver plugin; tests and benchmarks frequently use
//! the simpler [`AllActive`].

use std::fmt;

/// Half-open index interval `[first, last)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexRange {
    pub first: usize,
    pub last: usize,
}

impl IndexRange {
    /// Builds a range, collapsing it to empty when `last < first`.
    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first,
            last: last.max(first),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        (self.first..self.last).contains(&index)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.first, self.last)
    }
}

/// Read-only view of which particles take part in the current call.
///
/// Implementations must be cheap to query from many threads at once; the
/// kernel calls `is_active` once per index inside the active range.
pub trait ActivePredicate: Sync {
    /// Whether `index` participates in integration.
    fn is_active(&self, index: usize) -> bool;

    /// Contiguous range that bounds every active index.
    fn active_range(&self) -> IndexRange;

    /// True when every index inside [`active_range`](Self::active_range) is
    /// active, letting kernels skip the per-index test.
    fn is_all_active(&self) -> bool {
        false
    }
}

/// Predicate for a dense population where every index in range is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllActive(pub IndexRange);

impl AllActive {
    pub fn first(count: usize) -> Self {
        Self(IndexRange::new(0, count))
    }
}

impl ActivePredicate for AllActive {
    #[inline]
    fn is_active(&self, index: usize) -> bool {
        self.0.contains(index)
    }

    fn active_range(&self) -> IndexRange {
        self.0
    }

    fn is_all_active(&self) -> bool {
        true
    }
}

/// Indices that just became active, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexContainer {
    indices: Vec<usize>,
}

impl IndexContainer {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Smallest range covering every contained index.
    pub fn span(&self) -> Option<IndexRange> {
        let min = self.indices.iter().min()?;
        let max = self.indices.iter().max()?;
        Some(IndexRange::new(*min, max + 1))
    }
}

impl From<Vec<usize>> for IndexContainer {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}

/// Owner of the particle lifecycle: which slots are live and where they are.
///
/// Removed slots are only marked inactive. Their entries in every field keep
/// whatever they last held until [`insert`](Self::insert) hands the slot out
/// again.
#[derive(Debug, Clone, Default)]
pub struct PointStructure {
    active: Vec<bool>,
    active_count: usize,
    range: IndexRange,
}

impl PointStructure {
    /// A population of `count` live particles occupying slots `0..count`.
    pub fn new(count: usize) -> Self {
        Self {
            active: vec![true; count],
            active_count: count,
            range: IndexRange::new(0, count),
        }
    }

    /// An empty population with `capacity` free slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: vec![false; capacity],
            active_count: 0,
            range: IndexRange::empty(),
        }
    }

    /// Number of slots, live or free. Fields must hold at least this many entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    /// Number of live particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.active_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// Activates `count` slots, reusing freed slots (lowest first) before
    /// growing the capacity, and returns the indices handed out.
    pub fn insert(&mut self, count: usize) -> IndexContainer {
        let mut indices = Vec::with_capacity(count);

        for (index, live) in self.active.iter_mut().enumerate() {
            if indices.len() == count {
                break;
            }
            if !*live {
                *live = true;
                indices.push(index);
            }
        }

        while indices.len() < count {
            indices.push(self.active.len());
            self.active.push(true);
        }

        self.active_count += indices.len();
        self.recompute_range();
        IndexContainer::new(indices)
    }

    /// Marks the given slots inactive. Returns how many were actually live.
    pub fn remove(&mut self, indices: &[usize]) -> usize {
        let mut removed = 0;
        for &index in indices {
            match self.active.get_mut(index) {
                Some(live) if *live => {
                    *live = false;
                    removed += 1;
                }
                _ => {}
            }
        }

        self.active_count -= removed;
        self.recompute_range();
        removed
    }

    /// Live indices in ascending order.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(index, live)| live.then_some(index))
    }

    fn recompute_range(&mut self) {
        let first = self.active.iter().position(|live| *live);
        let last = self.active.iter().rposition(|live| *live);
        self.range = match (first, last) {
            (Some(first), Some(last)) => IndexRange::new(first, last + 1),
            _ => IndexRange::empty(),
        };
    }
}

impl ActivePredicate for PointStructure {
    #[inline]
    fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    fn active_range(&self) -> IndexRange {
        self.range
    }

    fn is_all_active(&self) -> bool {
        self.active_count == self.range.len()
    }
}
