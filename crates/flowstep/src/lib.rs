//! Flowstep library
//!
//! Multistep predictor-corrector time integration for particle populations
//! whose membership changes between steps. The binary drives these pieces
//! through a headless Bevy app; exposing them as a library keeps them
//! reachable from integration tests and benchmarks.

pub mod cli;
pub mod config;
pub mod derivatives;
pub mod error;
pub mod fields;
pub mod integration;
pub mod math;
pub mod parallel;
pub mod plugins;
pub mod population;
pub mod prelude;
pub mod resources;

// Re-export commonly used items
pub use config::SimulationConfig;
pub use error::{ConfigError, FieldError, IntegrationError, RegistryError};
pub use integration::{
    AdamsMoulton5, IntegrationMethod, IntegratorRegistry, MethodContext, MethodKind, StepOutcome,
    step,
};
pub use math::{Scalar, Vector};
pub use plugins::integration::IntegrationPlugin;
