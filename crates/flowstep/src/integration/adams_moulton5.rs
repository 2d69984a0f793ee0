//! Fifth-order Adams-Moulton predictor-corrector

use super::history::{HistoryLanes, MultistepHistory};
use super::registry::MethodKind;
use super::{IntegrationMethod, StepOutcome};
use crate::error::{FieldError, IntegrationError};
use crate::fields::FieldRepository;
use crate::math::{Scalar, Vector, weighted_sum};
use crate::parallel::ParallelKernel;
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

/// Fifth-order Adams-Moulton integrator with an Adams-Bashforth predictor
///
/// History per particle: `y0` (last corrected value) and `dy0..dy3`.
///
/// ```text
/// Predict (AB4):
///   dy0 ← dy
///   y   = y0 + dt·(55·dy − 59·dy1 + 37·dy2 − 9·dy3)/24
///
/// Correct (AM5), dy re-evaluated at the predicted y:
///   yc  = y0 + dt·(251·dy + 646·dy0 − 264·dy1 + 106·dy2 − 19·dy3)/720
///   dy3 ← dy2, dy2 ← dy1, dy1 ← dy0
///   y0  ← yc, y ← yc
/// ```
///
/// The predictor always extrapolates from `y0`, so whatever the caller's `y`
/// held before `predict` has no influence on the step.
#[derive(Debug, Clone, PartialEq)]
pub struct AdamsMoulton5 {
    history: MultistepHistory<4>,
    kernel: ParallelKernel,
}

impl AdamsMoulton5 {
    /// Weights for `dy, dy1, dy2, dy3`
    pub const PREDICTOR: [Scalar; 4] = [55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -9.0 / 24.0];

    /// Weights for `dy, dy0, dy1, dy2, dy3`
    pub const CORRECTOR: [Scalar; 5] = [
        251.0 / 720.0,
        646.0 / 720.0,
        -264.0 / 720.0,
        106.0 / 720.0,
        -19.0 / 720.0,
    ];

    pub fn new(
        repository: &mut FieldRepository,
        base_name: &str,
        capacity: usize,
        kernel: ParallelKernel,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            history: MultistepHistory::create(repository, base_name, capacity)?,
            kernel,
        })
    }

    pub fn history(&self) -> &MultistepHistory<4> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MultistepHistory<4> {
        &mut self.history
    }

    #[inline]
    fn predict_slot(lanes: &mut HistoryLanes<'_, 4>, i: usize, dt: Scalar) {
        let dy = lanes.dy[i];
        lanes.hist[0][i] = dy;

        let increment = weighted_sum(
            &Self::PREDICTOR,
            [dy, lanes.hist[1][i], lanes.hist[2][i], lanes.hist[3][i]],
        );
        lanes.y[i] = lanes.y0[i] + increment * dt;
    }

    #[inline]
    fn correct_slot(lanes: &mut HistoryLanes<'_, 4>, i: usize, dt: Scalar) {
        let increment = weighted_sum(
            &Self::CORRECTOR,
            [
                lanes.dy[i],
                lanes.hist[0][i],
                lanes.hist[1][i],
                lanes.hist[2][i],
                lanes.hist[3][i],
            ],
        );
        let corrected = lanes.y0[i] + increment * dt;

        lanes.shift(i);
        lanes.y0[i] = corrected;
        lanes.y[i] = corrected;
    }
}

impl IntegrationMethod for AdamsMoulton5 {
    fn predict(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        let kernel = self.kernel;
        self.history
            .apply(&kernel, "AdamsMoulton5::predict", active, y, dy, |lanes, i| {
                Self::predict_slot(lanes, i, dt)
            })?;
        Ok(StepOutcome::Applied)
    }

    fn correct(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        let kernel = self.kernel;
        self.history
            .apply(&kernel, "AdamsMoulton5::correct", active, y, dy, |lanes, i| {
                Self::correct_slot(lanes, i, dt)
            })?;
        Ok(StepOutcome::Applied)
    }

    fn set_initial_vals(
        &mut self,
        new_indices: &IndexContainer,
        y: &[Vector],
    ) -> Result<StepOutcome, IntegrationError> {
        self.history.seed(new_indices, y)?;
        Ok(StepOutcome::Applied)
    }

    fn need_set_initial_vals(&self) -> bool {
        true
    }

    fn resize(&mut self, capacity: usize) {
        self.history.resize(capacity);
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.history.capacity())
    }

    fn clone_box(&self) -> Box<dyn IntegrationMethod> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        MethodKind::AdamsMoulton5.name()
    }

    fn aliases(&self) -> Vec<&'static str> {
        MethodKind::AdamsMoulton5.aliases().to_vec()
    }

    fn convergence_order(&self) -> usize {
        5
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
