//! Third-order Adams-Moulton predictor-corrector

use super::history::{HistoryLanes, MultistepHistory};
use super::registry::MethodKind;
use super::{IntegrationMethod, StepOutcome};
use crate::error::{FieldError, IntegrationError};
use crate::fields::FieldRepository;
use crate::math::{Scalar, Vector, weighted_sum};
use crate::parallel::ParallelKernel;
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

/// Third-order Adams-Moulton integrator seeded by a two-step
/// Adams-Bashforth predictor. History per particle: `y0`, `dy0`, `dy1`.
///
/// ```text
/// Predict (AB2):  dy0 ← dy;  y  = y0 + dt·(3·dy − dy1)/2
/// Correct (AM3):  yc = y0 + dt·(5·dy + 8·dy0 − dy1)/12
///                 dy1 ← dy0, y0 ← yc, y ← yc
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AdamsMoulton3 {
    history: MultistepHistory<2>,
    kernel: ParallelKernel,
}

impl AdamsMoulton3 {
    pub const PREDICTOR: [Scalar; 2] = [3.0 / 2.0, -1.0 / 2.0];
    pub const CORRECTOR: [Scalar; 3] = [5.0 / 12.0, 8.0 / 12.0, -1.0 / 12.0];

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

    pub fn history(&self) -> &MultistepHistory<2> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MultistepHistory<2> {
        &mut self.history
    }

    #[inline]
    fn predict_slot(lanes: &mut HistoryLanes<'_, 2>, i: usize, dt: Scalar) {
        let dy = lanes.dy[i];
        lanes.hist[0][i] = dy;
        let increment = weighted_sum(&Self::PREDICTOR, [dy, lanes.hist[1][i]]);
        lanes.y[i] = lanes.y0[i] + increment * dt;
    }

    #[inline]
    fn correct_slot(lanes: &mut HistoryLanes<'_, 2>, i: usize, dt: Scalar) {
        let increment = weighted_sum(
            &Self::CORRECTOR,
            [lanes.dy[i], lanes.hist[0][i], lanes.hist[1][i]],
        );
        let corrected = lanes.y0[i] + increment * dt;

        lanes.shift(i);
        lanes.y0[i] = corrected;
        lanes.y[i] = corrected;
    }
}

impl IntegrationMethod for AdamsMoulton3 {
    fn predict(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        let kernel = self.kernel;
        self.history
            .apply(&kernel, "AdamsMoulton3::predict", active, y, dy, |lanes, i| {
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
            .apply(&kernel, "AdamsMoulton3::correct", active, y, dy, |lanes, i| {
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
        MethodKind::AdamsMoulton3.name()
    }

    fn aliases(&self) -> Vec<&'static str> {
        MethodKind::AdamsMoulton3.aliases().to_vec()
    }

    fn convergence_order(&self) -> usize {
        3
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
