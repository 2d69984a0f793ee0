//! Flowstep prelude module
//!
//! Re-exports the types most call sites need so that systems and tests can
//! start from a single import.

// External crate re-exports
pub use bevy::prelude::*;
pub use rand::Rng;

// Internal re-exports - Config
pub use crate::config::SimulationConfig;

// Internal re-exports - Math and storage
pub use crate::fields::{FieldRepository, VectorizedField};
pub use crate::math::{Scalar, Vector};
pub use crate::population::{ActivePredicate, AllActive, IndexContainer, IndexRange, PointStructure};

// Internal re-exports - Integration
pub use crate::derivatives::DerivativeField;
pub use crate::integration::{IntegrationMethod, IntegratorRegistry, StepOutcome};
pub use crate::parallel::{Backend, ParallelKernel};

// Internal re-exports - Resources
pub use crate::resources::{
    ActiveDerivative, CurrentIntegrator, Particles, SharedRng, StepSettings, StepStats,
};
