//! Explicit Euler integration method

use super::registry::MethodKind;
use super::{IntegrationMethod, StepOutcome};
use crate::error::IntegrationError;
use crate::fields::require_len;
use crate::math::{Scalar, Vector};
use crate::parallel::ParallelKernel;
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

/// Explicit (forward) Euler integrator
///
/// First order and stateless: `y += dt·dy` during `correct`, nothing during
/// `predict`. Since there is no history, newly active particles need no
/// seeding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExplicitEuler {
    kernel: ParallelKernel,
}

impl ExplicitEuler {
    pub fn new(kernel: ParallelKernel) -> Self {
        Self { kernel }
    }
}

impl IntegrationMethod for ExplicitEuler {
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
        require_len("y", y.len(), range)?;
        require_len("dy", dy.len(), range)?;

        let all_active = active.is_all_active();
        self.kernel.for_each(
            "ExplicitEuler::correct",
            range,
            (y, dy),
            |(y, dy), i, index| {
                if all_active || active.is_active(index) {
                    y[i] += dy[i] * dt;
                }
            },
        );
        Ok(StepOutcome::Applied)
    }

    fn set_initial_vals(
        &mut self,
        _new_indices: &IndexContainer,
        _y: &[Vector],
    ) -> Result<StepOutcome, IntegrationError> {
        Ok(StepOutcome::Applied)
    }

    fn need_set_initial_vals(&self) -> bool {
        false
    }

    fn resize(&mut self, _capacity: usize) {}

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn clone_box(&self) -> Box<dyn IntegrationMethod> {
        Box::new(*self)
    }

    fn name(&self) -> &'static str {
        MethodKind::ExplicitEuler.name()
    }

    fn aliases(&self) -> Vec<&'static str> {
        MethodKind::ExplicitEuler.aliases().to_vec()
    }

    fn convergence_order(&self) -> usize {
        1
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
