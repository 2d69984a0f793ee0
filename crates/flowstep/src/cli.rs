//! Command line interface for Flowstep

use clap::Parser;
use std::fmt;

use crate::config::SimulationConfig;
use crate::integration::IntegratorRegistry;
use crate::parallel::Backend;

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be loaded
    ConfigLoad(String),
    /// Invalid integrator name provided
    InvalidIntegrator(String),
    /// Timestep must be positive and finite
    InvalidTimestep(f64),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ConfigLoad(msg) => write!(f, "Failed to load configuration: {msg}"),
            CliError::InvalidIntegrator(msg) => write!(f, "Invalid integrator: {msg}"),
            CliError::InvalidTimestep(dt) => write!(f, "Invalid timestep: {dt}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Flowstep - multistep time integration for particle populations
#[derive(Parser, Debug)]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"),
    about,
    long_about = None
)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Integration method (e.g., adams_moulton5, am4, euler)
    #[arg(short = 'm', long, value_name = "NAME")]
    pub method: Option<String>,

    /// Number of particles at startup (overrides config file)
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub particles: Option<usize>,

    /// Number of steps to run
    #[arg(long, value_name = "COUNT")]
    pub steps: Option<usize>,

    /// Timestep
    #[arg(long, value_name = "SECONDS")]
    pub dt: Option<f64>,

    /// Random seed for particle placement
    #[arg(short = 's', long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Where kernels run
    #[arg(short = 'b', long, value_enum)]
    pub backend: Option<Backend>,

    /// Write the effective configuration to FILE before running
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// List available integration methods and exit
    #[arg(long)]
    pub list_methods: bool,
}

/// Handles the --list-methods flag by printing available methods
pub fn handle_list_methods() {
    let registry = IntegratorRegistry::global();
    println!("Available integrators:");
    for name in registry.list_available() {
        println!("  - {name}");
    }

    let aliases = registry.list_aliases();
    if !aliases.is_empty() {
        println!("\nAliases:");
        for (alias, target) in aliases {
            println!("  - {alias} -> {target}");
        }
    }
}

/// Loads configuration from file or defaults, then applies command-line overrides
pub fn load_and_apply_config(args: &Args) -> Result<SimulationConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        println!("Loading configuration from: {config_path}");
        SimulationConfig::load_or_default(config_path)
    } else {
        SimulationConfig::load_from_user_config()
    };

    if let Some(particle_count) = args.particles {
        println!("Overriding particle count to: {particle_count}");
        config.demo.particle_count = particle_count;
    }

    if let Some(steps) = args.steps {
        config.demo.steps = steps;
    }

    if let Some(dt) = args.dt {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(CliError::InvalidTimestep(dt));
        }
        println!("Overriding timestep to: {dt}");
        config.demo.dt = dt;
    }

    if let Some(method) = &args.method {
        // Validate the name against the registry before the app starts
        IntegratorRegistry::global()
            .resolve(method)
            .map_err(|err| CliError::InvalidIntegrator(err.to_string()))?;

        println!("Using integrator: {method}");
        config.integration.method = method.clone();
    }

    if let Some(seed) = args.seed {
        println!("Using random seed: {seed}");
        config.demo.initial_seed = Some(seed);
    }

    if let Some(backend) = args.backend {
        config.integration.execution.backend = backend;
    }

    if let Some(path) = &args.save_config {
        config
            .save(path)
            .map_err(|err| CliError::ConfigLoad(err.to_string()))?;
        println!("Saved configuration to: {path}");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_config(extra: &[&str]) -> Args {
        let mut argv = vec!["flowstep", "--config", "/nonexistent/flowstep.toml"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_overrides_apply() {
        let args = args_with_config(&["-n", "10", "--dt", "0.5", "-m", "am3", "-b", "serial"]);
        let config = load_and_apply_config(&args).unwrap();

        assert_eq!(config.demo.particle_count, 10);
        assert_eq!(config.demo.dt, 0.5);
        assert_eq!(config.integration.method, "am3");
        assert_eq!(config.integration.execution.backend, Backend::Serial);
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let args = args_with_config(&["--method", "leapfrog"]);
        let Err(CliError::InvalidIntegrator(message)) = load_and_apply_config(&args) else {
            panic!("expected an invalid integrator error");
        };
        assert!(message.contains("leapfrog"));
    }

    #[test]
    fn test_invalid_timestep_is_rejected() {
        let args = args_with_config(&["--dt=-1"]);
        assert!(matches!(
            load_and_apply_config(&args),
            Err(CliError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn test_list_flag_parses() {
        let args = Args::parse_from(["flowstep", "--list-methods"]);
        assert!(args.list_methods);
        assert!(args.config.is_none());
    }
}
