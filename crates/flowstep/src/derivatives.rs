//! Right-hand sides `dy = f(y)` for the demo driver and tests
//!
//! A field only maps one state vector to its rate of change. Filling a whole
//! `dy` buffer goes through [`evaluate`], which uses the same kernel and
//! active-set rules as the integrators so inactive slots are never touched.

use crate::config::FieldConfig;
use crate::error::IntegrationError;
use crate::fields::require_len;
use crate::math::{Scalar, Vector};
use crate::parallel::ParallelKernel;
use crate::population::ActivePredicate;

/// Time-independent rate of change of a single particle's state
pub trait DerivativeField: Send + Sync {
    fn at(&self, y: Vector) -> Vector;
}

/// `dy = -rate·y`: exponential relaxation toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDecay {
    pub rate: Scalar,
}

impl DerivativeField for LinearDecay {
    fn at(&self, y: Vector) -> Vector {
        -self.rate * y
    }
}

/// `dy = ω × y`: rigid rotation about `omega` with angular speed `|omega|`.
///
/// Each component perpendicular to the axis oscillates harmonically, which
/// makes it a good long-run accuracy check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub omega: Vector,
}

impl DerivativeField for Rotation {
    fn at(&self, y: Vector) -> Vector {
        self.omega.cross(y)
    }
}

/// Constant velocity regardless of state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformDrift {
    pub velocity: Vector,
}

impl DerivativeField for UniformDrift {
    fn at(&self, _y: Vector) -> Vector {
        self.velocity
    }
}

impl From<&FieldConfig> for Box<dyn DerivativeField> {
    fn from(config: &FieldConfig) -> Self {
        match *config {
            FieldConfig::Decay { rate } => Box::new(LinearDecay { rate }),
            FieldConfig::Rotation { omega } => Box::new(Rotation {
                omega: Vector::from_array(omega),
            }),
            FieldConfig::Drift { velocity } => Box::new(UniformDrift {
                velocity: Vector::from_array(velocity),
            }),
        }
    }
}

/// Fills `dy[i] = field.at(y[i])` for every active `i`.
pub fn evaluate(
    field: &dyn DerivativeField,
    kernel: &ParallelKernel,
    active: &dyn ActivePredicate,
    y: &[Vector],
    dy: &mut [Vector],
) -> Result<(), IntegrationError> {
    let range = active.active_range();
    require_len("y", y.len(), range)?;
    require_len("dy", dy.len(), range)?;

    let all_active = active.is_all_active();
    kernel.for_each(
        "DerivativeField::evaluate",
        range,
        (dy, y),
        |(dy, y), i, index| {
            if all_active || active.is_active(index) {
                dy[i] = field.at(y[i]);
            }
        },
    );
    Ok(())
}
