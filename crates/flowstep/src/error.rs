//! Error types shared across the integration core

use crate::population::IndexRange;
use thiserror::Error;

/// Precondition failures detected before a kernel is launched.
///
/// Numerical problems (stale history, double correction) are never reported
/// here; they are silent by nature and remain the driver's responsibility.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("field '{field}' holds {len} entries but the active range {range} needs {required}")]
    FieldTooShort {
        field: String,
        len: usize,
        required: usize,
        range: IndexRange,
    },

    #[error("{values} initial values supplied for {indices} new indices")]
    InitialValueCount { indices: usize, values: usize },

    #[error("new index {index} lies outside history capacity {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },
}

/// Failures while creating or looking up named fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("a field named '{0}' already exists in the repository")]
    NameTaken(String),
}

/// Failures while resolving a method from its configured name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(
        "Unknown integrator: '{name}'. Available integrators: {}. Aliases: {}",
        .available.join(", "),
        .aliases.join(", ")
    )]
    UnknownMethod {
        name: String,
        available: Vec<String>,
        aliases: Vec<String>,
    },

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Failures while loading or saving a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to layer configuration sources: {0}")]
    Layered(#[from] config::ConfigError),
}
