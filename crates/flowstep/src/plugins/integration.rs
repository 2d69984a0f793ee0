//! Integration plugin - headless driver for a changing particle population
//!
//! Owns the population, the configured integration method and derivative
//! field as resources. Every update first adjusts membership (seeding
//! history for newcomers when the method needs it) and then advances all
//! live particles by one predict-evaluate-correct-evaluate step.

use crate::derivatives::{self, DerivativeField};
use crate::error::IntegrationError;
use crate::fields::FieldRepository;
use crate::integration::{self, IntegrationMethod, IntegratorRegistry, MethodContext, MethodKind};
use crate::math::{Scalar, Vector};
use crate::prelude::*;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntegrationSet {
    Populate,
    Integrate,
}

#[derive(Default)]
pub struct IntegrationPlugin {
    pub config: SimulationConfig,
}

impl IntegrationPlugin {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

impl Plugin for IntegrationPlugin {
    fn build(&self, app: &mut App) {
        let mut config = self.config.clone();
        config.demo.sanitize();
        let config = &config;

        match toml::to_string_pretty(config) {
            Ok(toml_string) => {
                debug!("=== Current Configuration (TOML) ===\n{}", toml_string);
                debug!("=== End Configuration ===");
            }
            Err(e) => {
                error!("Failed to serialize configuration to TOML: {}", e);
            }
        }

        let kernel = config.kernel();
        let capacity = config.demo.capacity.max(config.demo.particle_count);
        let integrator = create_integrator(
            &config.integration.method,
            &MethodContext::new(config.integration.base_name.clone(), capacity, kernel),
        );
        info!(
            "Integrating with {} (order {}) on {:?}",
            integrator.name(),
            integrator.convergence_order(),
            kernel.backend()
        );

        app.insert_resource(config.clone());
        app.insert_resource(SharedRng::from_optional_seed(config.demo.initial_seed));
        app.insert_resource(Particles::new(&config.integration.base_name, capacity));
        app.insert_resource(CurrentIntegrator(integrator));
        app.insert_resource(ActiveDerivative((&config.demo.field).into()));
        app.insert_resource(StepSettings {
            dt: config.demo.dt,
            kernel,
            spawn_every: config.demo.spawn_every,
            spawn_batch: config.demo.spawn_batch,
            despawn_every: config.demo.despawn_every,
            spawn_extent: config.demo.spawn_extent,
        });
        app.init_resource::<StepStats>();

        app.configure_sets(
            Update,
            (IntegrationSet::Populate, IntegrationSet::Integrate).chain(),
        );

        let initial_count = config.demo.particle_count;
        app.add_systems(
            Startup,
            move |mut particles: ResMut<Particles>,
                  mut integrator: ResMut<CurrentIntegrator>,
                  field: Res<ActiveDerivative>,
                  settings: Res<StepSettings>,
                  mut rng: ResMut<SharedRng>,
                  mut stats: ResMut<StepStats>| {
                let positions = random_positions(&mut rng, initial_count, settings.spawn_extent);
                match activate(&mut particles, &mut ***integrator, &***field, &positions) {
                    Ok(()) => stats.spawned += positions.len() as u64,
                    Err(e) => error!("Failed to seed initial particles: {}", e),
                }
                stats.active = particles.points.len();
            },
        );

        app.add_systems(
            Update,
            (
                (spawn_particles, despawn_particles)
                    .chain()
                    .in_set(IntegrationSet::Populate),
                integrate_particles.in_set(IntegrationSet::Integrate),
            ),
        );
    }
}

/// Resolves `name`, falling back to the default method when it is unknown.
fn create_integrator(name: &str, context: &MethodContext) -> Box<dyn IntegrationMethod> {
    let registry = IntegratorRegistry::global();
    let mut repository = FieldRepository::new();

    match registry.create(name, context, &mut repository) {
        Ok(integrator) => integrator,
        Err(e) => {
            warn!("{}. Falling back to {}.", e, MethodKind::AdamsMoulton5.name());
            let mut repository = FieldRepository::new();
            match MethodKind::AdamsMoulton5.build(context, &mut repository) {
                Ok(integrator) => integrator,
                // A fresh repository cannot hold a clashing name
                Err(_) => Box::new(integration::ExplicitEuler::new(context.kernel)),
            }
        }
    }
}

fn random_positions(rng: &mut SharedRng, count: usize, extent: Scalar) -> Vec<Vector> {
    (0..count)
        .map(|_| {
            Vector::new(
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
            )
        })
        .collect()
}

/// Brings new particles to life: stores their state, computes their first
/// derivative and seeds the integrator's history for them.
pub fn activate(
    particles: &mut Particles,
    integrator: &mut dyn IntegrationMethod,
    field: &dyn DerivativeField,
    positions: &[Vector],
) -> Result<(), IntegrationError> {
    if positions.is_empty() {
        return Ok(());
    }

    let new_indices = particles.insert(positions);
    for index in new_indices.iter() {
        particles.dy[index] = field.at(particles.y[index]);
    }

    if integrator.need_set_initial_vals() {
        if integrator
            .capacity()
            .is_some_and(|held| held < particles.points.capacity())
        {
            integrator.resize(particles.points.capacity());
        }
        let values = particles.values_at(&new_indices);
        integrator.set_initial_vals(&new_indices, &values)?;
    }
    Ok(())
}

fn spawn_particles(
    mut particles: ResMut<Particles>,
    mut integrator: ResMut<CurrentIntegrator>,
    field: Res<ActiveDerivative>,
    settings: Res<StepSettings>,
    mut rng: ResMut<SharedRng>,
    mut stats: ResMut<StepStats>,
) {
    if settings.spawn_every == 0 || stats.steps == 0 {
        return;
    }
    if stats.steps % settings.spawn_every as u64 != 0 {
        return;
    }

    let positions = random_positions(&mut rng, settings.spawn_batch, settings.spawn_extent);
    match activate(&mut particles, &mut ***integrator, &***field, &positions) {
        Ok(()) => {
            trace!("Spawned {} particles", positions.len());
            stats.spawned += positions.len() as u64;
        }
        Err(e) => error!("Failed to spawn particles: {}", e),
    }
}

fn despawn_particles(
    mut particles: ResMut<Particles>,
    settings: Res<StepSettings>,
    mut rng: ResMut<SharedRng>,
    mut stats: ResMut<StepStats>,
) {
    if settings.despawn_every == 0 || stats.steps == 0 || particles.points.is_empty() {
        return;
    }
    if stats.steps % settings.despawn_every as u64 != 0 {
        return;
    }

    let live = particles.points.len();
    let nth = rng.random_range(0..live);
    let picked = particles.points.active_indices().nth(nth);
    if let Some(index) = picked {
        stats.despawned += particles.points.remove(&[index]) as u64;
        trace!("Despawned particle {}", index);
    }
}

fn integrate_particles(
    mut particles: ResMut<Particles>,
    mut integrator: ResMut<CurrentIntegrator>,
    field: Res<ActiveDerivative>,
    settings: Res<StepSettings>,
    mut stats: ResMut<StepStats>,
) {
    let Particles { points, y, dy } = &mut *particles;
    let kernel = settings.kernel;
    let field: &dyn DerivativeField = &***field;

    let result = integration::step(
        &mut ***integrator,
        settings.dt,
        y.as_mut_slice(),
        dy.as_mut_slice(),
        &*points,
        |y, dy| derivatives::evaluate(field, &kernel, &*points, y, dy),
    );

    stats.steps += 1;
    stats.active = points.len();
    match result {
        Ok(StepOutcome::Applied) => {}
        Ok(StepOutcome::Rejected) => stats.rejected += 1,
        Err(e) => {
            stats.failed += 1;
            error!("Step {} failed: {}", stats.steps, e);
        }
    }
}
