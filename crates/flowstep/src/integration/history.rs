//! Per-particle history shared by the Adams-Moulton family
//!
//! A method of depth `D` keeps the last corrected value `y0` and `D` saved
//! derivatives. Slot `0` (`dy0`) is written by predict and consumed by
//! correct; slots `1..D` hold the derivatives from one, two, ... steps back.

use crate::error::{FieldError, IntegrationError};
use crate::fields::{FieldRepository, VectorizedField, require_len};
use crate::math::Vector;
use crate::parallel::{Lanes, ParallelKernel};
use crate::population::{ActivePredicate, IndexContainer, IndexRange};

/// Snapshot of one particle's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySlot<const D: usize> {
    pub y0: Vector,
    pub dy: [Vector; D],
}

/// History fields `y0, dy0 .. dy{D-1}`, one entry per particle slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MultistepHistory<const D: usize> {
    y0: VectorizedField,
    dy: [VectorizedField; D],
}

impl<const D: usize> MultistepHistory<D> {
    /// Registers `"<base_name>_y0"` and `"<base_name>_dy0"` onward and
    /// allocates them zero-filled.
    pub fn create(
        repository: &mut FieldRepository,
        base_name: &str,
        capacity: usize,
    ) -> Result<Self, FieldError> {
        let y0 = repository.create(base_name, "y0", capacity)?;

        let suffixes: [String; D] = std::array::from_fn(|k| format!("dy{k}"));
        let mut names: [String; D] = std::array::from_fn(|_| String::new());
        for (name, suffix) in names.iter_mut().zip(&suffixes) {
            *name = repository.reserve(base_name, suffix)?;
        }

        Ok(Self {
            y0,
            dy: names.map(|name| VectorizedField::new(name, capacity)),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.y0.len()
    }

    /// Resizes every history field. New slots are zero until seeded.
    pub fn resize(&mut self, capacity: usize) {
        self.y0.resize(capacity);
        for field in &mut self.dy {
            field.resize(capacity);
        }
    }

    pub fn y0(&self) -> &VectorizedField {
        &self.y0
    }

    /// Derivative history field `dy{k}`.
    pub fn dy(&self, k: usize) -> Option<&VectorizedField> {
        self.dy.get(k)
    }

    pub fn slot(&self, index: usize) -> Option<HistorySlot<D>> {
        let y0 = self.y0.get(index)?;
        let mut dy = [Vector::ZERO; D];
        for (value, field) in dy.iter_mut().zip(&self.dy) {
            *value = field.get(index)?;
        }
        Some(HistorySlot { y0, dy })
    }

    /// Overwrites one particle's history.
    pub fn set_slot(&mut self, index: usize, slot: HistorySlot<D>) -> Result<(), IntegrationError> {
        self.check_index(index)?;
        self.y0[index] = slot.y0;
        for (field, value) in self.dy.iter_mut().zip(slot.dy) {
            field[index] = value;
        }
        Ok(())
    }

    /// Cold start for new particles: `y0 ← y`, every derivative slot zero.
    ///
    /// `values[k]` belongs to `new_indices[k]`. Nothing is written unless
    /// every index fits.
    pub fn seed(
        &mut self,
        new_indices: &IndexContainer,
        values: &[Vector],
    ) -> Result<(), IntegrationError> {
        if new_indices.len() != values.len() {
            return Err(IntegrationError::InitialValueCount {
                indices: new_indices.len(),
                values: values.len(),
            });
        }
        for index in new_indices.iter() {
            self.check_index(index)?;
        }

        for (index, value) in new_indices.iter().zip(values) {
            self.set_slot(
                index,
                HistorySlot {
                    y0: *value,
                    dy: [Vector::ZERO; D],
                },
            )?;
        }
        Ok(())
    }

    /// Runs `step(lanes, local)` for each active index of `active`, after
    /// checking that `y`, `dy` and the history cover its range.
    pub(crate) fn apply<'a, F>(
        &'a mut self,
        kernel: &ParallelKernel,
        label: &str,
        active: &dyn ActivePredicate,
        y: &'a mut [Vector],
        dy: &'a [Vector],
        step: F,
    ) -> Result<(), IntegrationError>
    where
        F: Fn(&mut HistoryLanes<'a, D>, usize) + Sync,
    {
        let range = active.active_range();
        self.require(range)?;
        require_len("y", y.len(), range)?;
        require_len("dy", dy.len(), range)?;

        let lanes = self.lanes(y, dy);
        if active.is_all_active() {
            kernel.for_each(label, range, lanes, |lanes, local, _| step(lanes, local));
        } else {
            kernel.for_each(label, range, lanes, |lanes, local, index| {
                if active.is_active(index) {
                    step(lanes, local);
                }
            });
        }
        Ok(())
    }

    fn require(&self, range: IndexRange) -> Result<(), IntegrationError> {
        self.y0.require(range)?;
        self.dy.iter().try_for_each(|field| field.require(range))
    }

    fn check_index(&self, index: usize) -> Result<(), IntegrationError> {
        if index < self.capacity() {
            Ok(())
        } else {
            Err(IntegrationError::IndexOutOfBounds {
                index,
                capacity: self.capacity(),
            })
        }
    }

    fn lanes<'a>(&'a mut self, y: &'a mut [Vector], dy: &'a [Vector]) -> HistoryLanes<'a, D> {
        let mut hist: [&'a mut [Vector]; D] = std::array::from_fn(|_| Default::default());
        for (lane, field) in hist.iter_mut().zip(self.dy.iter_mut()) {
            *lane = field.as_mut_slice();
        }

        HistoryLanes {
            y,
            dy,
            y0: self.y0.as_mut_slice(),
            hist,
        }
    }
}

/// Caller buffers plus history, cut to the same window of slots.
pub struct HistoryLanes<'a, const D: usize> {
    pub y: &'a mut [Vector],
    pub dy: &'a [Vector],
    pub y0: &'a mut [Vector],
    pub hist: [&'a mut [Vector]; D],
}

impl<const D: usize> HistoryLanes<'_, D> {
    /// `dy{k} ← dy{k-1}` from the oldest slot down to `dy1 ← dy0`.
    #[inline]
    pub fn shift(&mut self, local: usize) {
        for k in (1..D).rev() {
            self.hist[k][local] = self.hist[k - 1][local];
        }
    }
}

impl<const D: usize> Lanes for HistoryLanes<'_, D> {
    fn lanes_len(&self) -> usize {
        self.y0.len().min(self.y.len()).min(self.dy.len())
    }

    fn split_lanes(self, mid: usize) -> (Self, Self) {
        let HistoryLanes {
            y,
            dy,
            y0,
            mut hist,
        } = self;

        let (y_lo, y_hi) = y.split_at_mut(mid);
        let (dy_lo, dy_hi) = dy.split_at(mid);
        let (y0_lo, y0_hi) = y0.split_at_mut(mid);

        let mut hist_lo: [&mut [Vector]; D] = std::array::from_fn(|_| Default::default());
        let mut hist_hi: [&mut [Vector]; D] = std::array::from_fn(|_| Default::default());
        for k in 0..D {
            let (lo, hi) = std::mem::take(&mut hist[k]).split_at_mut(mid);
            hist_lo[k] = lo;
            hist_hi[k] = hi;
        }

        (
            HistoryLanes {
                y: y_lo,
                dy: dy_lo,
                y0: y0_lo,
                hist: hist_lo,
            },
            HistoryLanes {
                y: y_hi,
                dy: dy_hi,
                y0: y0_hi,
                hist: hist_hi,
            },
        )
    }
}
