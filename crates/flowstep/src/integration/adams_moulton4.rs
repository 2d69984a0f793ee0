//! Fourth-order Adams-Moulton predictor-corrector

use super::history::{HistoryLanes, MultistepHistory};
use super::registry::MethodKind;
use super::{IntegrationMethod, StepOutcome};
use crate::error::{FieldError, IntegrationError};
use crate::fields::FieldRepository;
use crate::math::{Scalar, Vector, weighted_sum};
use crate::parallel::ParallelKernel;
use crate::population::{ActivePredicate, IndexContainer};
use std::any::Any;

/// Fourth-order Adams-Moulton integrator with a three-step Adams-Bashforth
/// predictor. History per particle: `y0`, `dy0..dy2`.
///
/// ```text
/// Predict (AB3):  dy0 ← dy;  y  = y0 + dt·(23·dy − 16·dy1 + 5·dy2)/12
/// Correct (AM4):  yc = y0 + dt·(9·dy + 19·dy0 − 5·dy1 + dy2)/24
///                 dy2 ← dy1, dy1 ← dy0, y0 ← yc, y ← yc
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AdamsMoulton4 {
    history: MultistepHistory<3>,
    kernel: ParallelKernel,
}

impl AdamsMoulton4 {
    pub const PREDICTOR: [Scalar; 3] = [23.0 / 12.0, -16.0 / 12.0, 5.0 / 12.0];
    pub const CORRECTOR: [Scalar; 4] = [9.0 / 24.0, 19.0 / 24.0, -5.0 / 24.0, 1.0 / 24.0];

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

    pub fn history(&self) -> &MultistepHistory<3> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MultistepHistory<3> {
        &mut self.history
    }

    #[inline]
    fn predict_slot(lanes: &mut HistoryLanes<'_, 3>, i: usize, dt: Scalar) {
        let dy = lanes.dy[i];
        lanes.hist[0][i] = dy;
        let increment = weighted_sum(&Self::PREDICTOR, [dy, lanes.hist[1][i], lanes.hist[2][i]]);
        lanes.y[i] = lanes.y0[i] + increment * dt;
    }

    #[inline]
    fn correct_slot(lanes: &mut HistoryLanes<'_, 3>, i: usize, dt: Scalar) {
        let increment = weighted_sum(
            &Self::CORRECTOR,
            [
                lanes.dy[i],
                lanes.hist[0][i],
                lanes.hist[1][i],
                lanes.hist[2][i],
            ],
        );
        let corrected = lanes.y0[i] + increment * dt;

        lanes.shift(i);
        lanes.y0[i] = corrected;
        lanes.y[i] = corrected;
    }
}

impl IntegrationMethod for AdamsMoulton4 {
    fn predict(
        &mut self,
        dt: Scalar,
        y: &mut [Vector],
        dy: &[Vector],
        active: &dyn ActivePredicate,
    ) -> Result<StepOutcome, IntegrationError> {
        let kernel = self.kernel;
        self.history
            .apply(&kernel, "AdamsMoulton4::predict", active, y, dy, |lanes, i| {
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
            .apply(&kernel, "AdamsMoulton4::correct", active, y, dy, |lanes, i| {
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
        MethodKind::AdamsMoulton4.name()
    }

    fn aliases(&self) -> Vec<&'static str> {
        MethodKind::AdamsMoulton4.aliases().to_vec()
    }

    fn convergence_order(&self) -> usize {
        4
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::HistorySlot;
    use crate::population::AllActive;

    #[test]
    fn test_coefficients_are_consistent() {
        assert!((AdamsMoulton4::PREDICTOR.iter().sum::<Scalar>() - 1.0).abs() < 1e-12);
        assert!((AdamsMoulton4::CORRECTOR.iter().sum::<Scalar>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_growth_is_exact() {
        // y' = 1 is integrated exactly by any consistent multistep pair
        let mut method = AdamsMoulton4::new(
            &mut FieldRepository::new(),
            "y",
            1,
            ParallelKernel::serial(),
        )
        .unwrap();
        method
            .history_mut()
            .set_slot(
                0,
                HistorySlot {
                    y0: Vector::ZERO,
                    dy: [Vector::Y; 3],
                },
            )
            .unwrap();

        let active = AllActive::first(1);
        let mut y = vec![Vector::ZERO];
        for _ in 0..10 {
            method.predict(0.1, &mut y, &[Vector::Y], &active).unwrap();
            method.correct(0.1, &mut y, &[Vector::Y], &active).unwrap();
        }

        assert!((y[0] - Vector::Y).length() < 1e-12);
    }
}
