use crate::error::ConfigError;
use crate::math::Scalar;
use crate::parallel::{Backend, ParallelKernel};
use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `FLOWSTEP__INTEGRATION__METHOD=am4`.
pub const ENV_PREFIX: &str = "FLOWSTEP";

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub integration: IntegrationConfig,
    pub demo: DemoConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Registry name or alias
    pub method: String,
    /// Prefix for the method's history field names
    pub base_name: String,
    pub execution: ExecutionConfig,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            method: "adams_moulton5".to_string(),
            base_name: "position".to_string(),
            execution: ExecutionConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub backend: Backend,
    pub min_chunk_len: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            min_chunk_len: ParallelKernel::DEFAULT_MIN_CHUNK_LEN,
        }
    }
}

impl ExecutionConfig {
    pub fn kernel(&self) -> ParallelKernel {
        ParallelKernel::new(self.backend, self.min_chunk_len)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub particle_count: usize,
    /// Slots allocated up front; the population may still outgrow it
    pub capacity: usize,
    pub dt: Scalar,
    pub steps: usize,
    pub spawn_every: usize,
    pub spawn_batch: usize,
    pub despawn_every: usize,
    pub spawn_extent: Scalar,
    pub field: FieldConfig,
    pub initial_seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            particle_count: 4096,
            capacity: 8192,
            dt: 0.01,
            steps: 1000,
            spawn_every: 0,
            spawn_batch: 64,
            despawn_every: 0,
            spawn_extent: 1.0,
            field: FieldConfig::default(),
            initial_seed: None,
        }
    }
}

impl DemoConfig {
    /// Replaces values the driver cannot run with by their defaults.
    /// Returns the number of fields that were reset.
    pub fn sanitize(&mut self) -> usize {
        let defaults = Self::default();
        let mut reset = 0;

        if !(self.dt.is_finite() && self.dt > 0.0) {
            warn!(
                "Invalid timestep {} in configuration. Falling back to {}.",
                self.dt, defaults.dt
            );
            self.dt = defaults.dt;
            reset += 1;
        }
        if !(self.spawn_extent.is_finite() && self.spawn_extent >= 0.0) {
            warn!(
                "Invalid spawn extent {} in configuration. Falling back to {}.",
                self.spawn_extent, defaults.spawn_extent
            );
            self.spawn_extent = defaults.spawn_extent;
            reset += 1;
        }
        reset
    }
}

/// Which derivative field the demo integrates
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldConfig {
    Decay { rate: Scalar },
    Rotation { omega: [Scalar; 3] },
    Drift { velocity: [Scalar; 3] },
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig::Rotation {
            omega: [0.0, 0.0, 1.0],
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a file, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config file {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found. Using defaults.", path);
                Self::default()
            }
        }
    }

    /// Platform config file, if the platform has a config directory
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "flowstep").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Layer the platform config file and `FLOWSTEP__*` environment variables
    /// over the defaults. Problems are logged and yield the defaults.
    pub fn load_from_user_config() -> Self {
        let path = Self::user_config_path();
        if path.is_none() {
            warn!("No config directory on this platform; reading environment only.");
        }

        match Self::load_layered(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load user configuration: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Defaults, then `path` (optional file), then the environment.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let layered = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(layered.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn kernel(&self) -> ParallelKernel {
        self.integration.execution.kernel()
    }
}
