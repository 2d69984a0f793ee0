use crate::derivatives::DerivativeField;
use crate::fields::VectorizedField;
use crate::integration::IntegrationMethod;
use crate::math::{Scalar, Vector};
use crate::parallel::ParallelKernel;
use crate::population::{IndexContainer, PointStructure};
use bevy::prelude::*;
use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

#[derive(Resource, Deref, DerefMut, Debug, Clone, PartialEq)]
pub struct SharedRng(pub ChaCha8Rng);

impl SharedRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::default(),
        }
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self(ChaCha8Rng::from_rng(&mut rand::rng()))
    }
}

/// The particle population together with its state and derivative fields.
///
/// `y` and `dy` always hold `points.capacity()` entries.
#[derive(Resource, Debug, Clone)]
pub struct Particles {
    pub points: PointStructure,
    pub y: VectorizedField,
    pub dy: VectorizedField,
}

impl Particles {
    pub fn new(base_name: &str, capacity: usize) -> Self {
        Self {
            points: PointStructure::with_capacity(capacity),
            y: VectorizedField::new(base_name, capacity),
            dy: VectorizedField::new(format!("{base_name}_rate"), capacity),
        }
    }

    /// Activates one slot per entry of `values` and stores them. Fields grow
    /// when the population outgrows its capacity.
    pub fn insert(&mut self, values: &[Vector]) -> IndexContainer {
        let new_indices = self.points.insert(values.len());
        let capacity = self.points.capacity();
        if self.y.len() < capacity {
            self.y.resize(capacity);
            self.dy.resize(capacity);
        }

        for (index, value) in new_indices.iter().zip(values) {
            self.y[index] = *value;
        }
        new_indices
    }

    /// Current values of `indices`, in the same order.
    pub fn values_at(&self, indices: &IndexContainer) -> Vec<Vector> {
        indices.iter().map(|index| self.y[index]).collect()
    }
}

#[derive(Resource, Deref, DerefMut)]
pub struct CurrentIntegrator(pub Box<dyn IntegrationMethod>);

#[derive(Resource, Deref, DerefMut)]
pub struct ActiveDerivative(pub Box<dyn DerivativeField>);

/// Fixed stepping parameters for the driver systems.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub dt: Scalar,
    pub kernel: ParallelKernel,
    /// Spawn a batch every this many steps; 0 disables spawning.
    pub spawn_every: usize,
    pub spawn_batch: usize,
    /// Despawn one particle every this many steps; 0 disables despawning.
    pub despawn_every: usize,
    /// Particles are placed uniformly inside a cube of this half-width.
    pub spawn_extent: Scalar,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            dt: 0.01,
            kernel: ParallelKernel::default(),
            spawn_every: 0,
            spawn_batch: 0,
            despawn_every: 0,
            spawn_extent: 1.0,
        }
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub steps: u64,
    pub rejected: u64,
    pub failed: u64,
    pub spawned: u64,
    pub despawned: u64,
    pub active: usize,
}
