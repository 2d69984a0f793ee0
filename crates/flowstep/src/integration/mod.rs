//! Numerical integration methods for particle populations
//!
//! Every method advances a caller-owned `y` using a caller-owned derivative
//! `dy` across the indices an [`ActivePredicate`] selects. Per timestep a
//! driver calls [`IntegrationMethod::predict`], refreshes `dy` at the
//! predicted state, then calls [`IntegrationMethod::correct`]. The free
//! function [`step`] performs that sequence for callers who would rather not
//! manage the ordering themselves.

use crate::error::IntegrationError;
use crate::math::{Scalar, Vector};
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

pub mod adams_bashforth2;
pub mod adams_moulton3;
pub mod adams_moulton4;
pub mod adams_moulton5;
pub mod explicit_euler;
pub mod history;
pub mod registry;

pub use adams_bashforth2::AdamsBashforth2;
pub use adams_moulton3::AdamsMoulton3;
pub use adams_moulton4::AdamsMoulton4;
pub use adams_moulton5::AdamsMoulton5;
pub use explicit_euler::ExplicitEuler;
pub use history::{HistorySlot, MultistepHistory};
pub use registry::{IntegratorRegistry, MethodContext, MethodKind};

/// Whether a phase was applied.
///
/// The shipped methods always apply their phases; `Rejected` exists so a
/// method that can refuse a step reports it through the same interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Rejected,
}

impl StepOutcome {
    #[inline]
    pub fn is_applied(self) -> bool {
        self == StepOutcome::Applied
    }
}

/// Capability set shared by every integration method
pub trait IntegrationMethod: Send + Sync {
    /// Advance `y` over `dt` for every active index using only past information.
    fn predict(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError>;

    /// Refine `y` given `dy` evaluated at the predicted state and roll the
    /// history forward by one step.
    ///
    /// Must follow exactly one `predict` for the same timestep. Calling it
    /// twice shifts history twice; that is not detected.
    fn correct(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError>;

    /// Seed history for indices that just became active. `y[k]` is the
    /// current value of `new_indices[k]`.
    fn set_initial_vals(
        &mut self,
        new_indices: &IndexContainer,
        y: &[Vector],
    ) -> Result<StepOutcome, IntegrationError>;

    /// Whether newly active indices must go through [`set_initial_vals`](Self::set_initial_vals)
    /// before their first step.
    fn need_set_initial_vals(&self) -> bool;

    /// Resize per-particle history to follow the population capacity.
    fn resize(&mut self, capacity: usize);

    /// Slots of history held, or `None` for methods without history.
    fn capacity(&self) -> Option<usize>;

    /// Independent copy carrying the same history.
    fn clone_box(&self) -> Box<dyn IntegrationMethod>;

    /// Canonical registry name
    fn name(&self) -> &'static str;

    /// Alternative registry names
    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Order of the global truncation error
    fn convergence_order(&self) -> usize;

    /// Get self as Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn IntegrationMethod> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// One complete timestep: predict, re-evaluate, correct, re-evaluate.
///
/// `dy` must hold the derivative at the current `y` on entry and holds the
/// derivative at the corrected `y` on return, ready for the next call.
/// `recompute(y, dy)` fills `dy` from `y`; its errors abort the step.
pub fn step<F>(
    method: &mut dyn IntegrationMethod,
    dt: Scalar,
    y: &mut [Vector],
    dy: &mut [Vector],
    active: &dyn ActivePredicate,
    mut recompute: F,
) -> Result<StepOutcome, IntegrationError>
where
    F: FnMut(&[Vector], &mut [Vector]) -> Result<(), IntegrationError>,
{
    if !method.predict(dt, y, dy, active)?.is_applied() {
        return Ok(StepOutcome::Rejected);
    }
    recompute(y, dy)?;

    let outcome = method.correct(dt, y, dy, active)?;
    if outcome.is_applied() {
        recompute(y, dy)?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRepository;
    use crate::parallel::ParallelKernel;
    use crate::population::AllActive;

    #[test]
    fn test_step_sequences_phases_and_refreshes_derivative() {
        let mut method =
            AdamsMoulton5::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial())
                .unwrap();
        let mut y = vec![Vector::ZERO];
        let mut dy = vec![Vector::X];
        let mut evaluations = 0;

        let outcome = step(
            &mut method,
            0.1,
            &mut y,
            &mut dy,
            &AllActive::first(1),
            |_, dy| {
                evaluations += 1;
                dy[0] = Vector::X;
                Ok(())
            },
        )
        .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(evaluations, 2);
        assert_eq!(method.history().slot(0).unwrap().dy[1], Vector::X);
    }

    #[test]
    fn test_boxed_clone_is_independent() {
        let mut method: Box<dyn IntegrationMethod> = Box::new(
            AdamsMoulton5::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial())
                .unwrap(),
        );
        let snapshot = method.clone();

        let mut y = vec![Vector::ZERO];
        let dy = vec![Vector::ONE];
        let active = AllActive::first(1);
        method.predict(1.0, &mut y, &dy, &active).unwrap();
        method.correct(1.0, &mut y, &dy, &active).unwrap();

        let changed = method.as_any().downcast_ref::<AdamsMoulton5>().unwrap();
        let original = snapshot.as_any().downcast_ref::<AdamsMoulton5>().unwrap();
        assert_ne!(changed.history(), original.history());
        assert_eq!(original.history().slot(0).unwrap().y0, Vector::ZERO);
    }
}
