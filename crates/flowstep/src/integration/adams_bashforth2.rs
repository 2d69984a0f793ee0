//! Two-step Adams-Bashforth integration

use super::registry::MethodKind;
use super::{IntegrationMethod, StepOutcome};
use crate::error::{FieldError, IntegrationError};
use crate::fields::{FieldRepository, VectorizedField, require_len};
use crate::math::{Scalar, Vector, weighted_sum};
use crate::parallel::ParallelKernel;
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

/// Explicit second-order Adams-Bashforth method
///
/// The whole step happens in `correct`; `predict` leaves `y` alone. The only
/// history is the previous derivative `dy1`.
///
/// ```text
/// y   += dt·(3·dy − dy1)/2
/// dy1 ← dy
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AdamsBashforth2 {
    dy1: VectorizedField,
    kernel: ParallelKernel,
}

impl AdamsBashforth2 {
    pub const WEIGHTS: [Scalar; 2] = [3.0 / 2.0, -1.0 / 2.0];

    pub fn new(
        repository: &mut FieldRepository,
        base_name: &str,
        capacity: usize,
        kernel: ParallelKernel,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            dy1: repository.create(base_name, "dy1", capacity)?,
            kernel,
        })
    }

    /// Previous-step derivative per particle
    pub fn dy1(&self) -> &VectorizedField {
        &self.dy1
    }
}

impl IntegrationMethod for AdamsBashforth2 {
    fn predict(
        &mut self,
        _dt: Scalar,
        _y: &mut [Vector],
        _dy: &[Vector],
        _active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        Ok(StepOutcome::Applied)
    }

    fn correct(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        let range = active.active_range();
        self.dy1.require(range)?;
        require_len("y", y.len(), range)?;
        require_len("dy", dy.len(), range)?;

        let all_active = active.is_all_active();
        self.kernel.for_each(
            "AdamsBashforth2::correct",
            range,
            (y, (dy, self.dy1.as_mut_slice())),
            |(y, (dy, dy1)), i, index| {
                if all_active || active.is_active(index) {
                    y[i] += weighted_sum(&Self::WEIGHTS, [dy[i], dy1[i]]) * dt;
                    dy1[i] = dy[i];
                }
            },
        );
        Ok(StepOutcome::Applied)
    }

    fn set_initial_vals(
        &mut self,
        new_indices: &IndexContainer,
        y: &[Vector],
    ) -> Result<StepOutcome, IntegrationError> {
        if new_indices.len() != y.len() {
            return Err(IntegrationError::InitialValueCount {
                indices: new_indices.len(),
                values: y.len(),
            });
        }
        if let Some(index) = new_indices.iter().find(|index| *index >= self.dy1.len()) {
            return Err(IntegrationError::IndexOutOfBounds {
                index,
                capacity: self.dy1.len(),
            });
        }

        for index in new_indices.iter() {
            self.dy1[index] = Vector::ZERO;
        }
        Ok(StepOutcome::Applied)
    }

    fn need_set_initial_vals(&self) -> bool {
        true
    }

    fn resize(&mut self, capacity: usize) {
        self.dy1.resize(capacity);
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.dy1.len())
    }

    fn clone_box(&self) -> Box<dyn IntegrationMethod> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        MethodKind::AdamsBashforth2.name()
    }

    fn aliases(&self) -> Vec<&'static str> {
        MethodKind::AdamsBashforth2.aliases().to_vec()
    }

    fn convergence_order(&self) -> usize {
        2
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
