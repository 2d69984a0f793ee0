//! Registry for selecting an integration method by name
//!
//! The set of methods is closed: each [`MethodKind`] is bound to a factory
//! that allocates the method's history against a [`FieldRepository`]. The
//! registry itself only resolves names and aliases to kinds, so the scheme a
//! simulation uses can be picked from configuration without touching the
//! driver.

use super::{
    AdamsBashforth2, AdamsMoulton3, AdamsMoulton4, AdamsMoulton5, ExplicitEuler, IntegrationMethod,
};
use crate::error::{FieldError, RegistryError};
use crate::fields::FieldRepository;
use crate::parallel::ParallelKernel;
use bevy::log::debug;
use bevy::prelude::Resource;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every method the registry can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    ExplicitEuler,
    AdamsBashforth2,
    AdamsMoulton3,
    AdamsMoulton4,
    AdamsMoulton5,
}

impl MethodKind {
    pub const ALL: [MethodKind; 5] = [
        MethodKind::ExplicitEuler,
        MethodKind::AdamsBashforth2,
        MethodKind::AdamsMoulton3,
        MethodKind::AdamsMoulton4,
        MethodKind::AdamsMoulton5,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MethodKind::ExplicitEuler => "explicit_euler",
            MethodKind::AdamsBashforth2 => "adams_bashforth2",
            MethodKind::AdamsMoulton3 => "adams_moulton3",
            MethodKind::AdamsMoulton4 => "adams_moulton4",
            MethodKind::AdamsMoulton5 => "adams_moulton5",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            MethodKind::ExplicitEuler => &["euler"],
            MethodKind::AdamsBashforth2 => &["ab2"],
            MethodKind::AdamsMoulton3 => &["am3"],
            MethodKind::AdamsMoulton4 => &["am4"],
            MethodKind::AdamsMoulton5 => &["am5", "AdamsMoulton5"],
        }
    }

    /// Build a boxed instance with history sized to `context.capacity`.
    pub fn build(
        self,
        context: &MethodContext,
        repository: &mut FieldRepository,
    ) -> Result<Box<dyn IntegrationMethod>, FieldError> {
        let MethodContext {
            base_name,
            capacity,
            kernel,
        } = context;

        let method: Box<dyn IntegrationMethod> = match self {
            MethodKind::ExplicitEuler => Box::new(ExplicitEuler::new(*kernel)),
            MethodKind::AdamsBashforth2 => Box::new(AdamsBashforth2::new(
                repository, base_name, *capacity, *kernel,
            )?),
            MethodKind::AdamsMoulton3 => Box::new(AdamsMoulton3::new(
                repository, base_name, *capacity, *kernel,
            )?),
            MethodKind::AdamsMoulton4 => Box::new(AdamsMoulton4::new(
                repository, base_name, *capacity, *kernel,
            )?),
            MethodKind::AdamsMoulton5 => Box::new(AdamsMoulton5::new(
                repository, base_name, *capacity, *kernel,
            )?),
        };
        Ok(method)
    }
}

/// What a method needs to allocate itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// Prefix for history field names, e.g. `"position"` → `"position_dy1"`
    pub base_name: String,
    /// Initial number of particle slots
    pub capacity: usize,
    pub kernel: ParallelKernel,
}

impl MethodContext {
    pub fn new(base_name: impl Into<String>, capacity: usize, kernel: ParallelKernel) -> Self {
        Self {
            base_name: base_name.into(),
            capacity,
            kernel,
        }
    }
}

/// Name → method lookup
#[derive(Resource, Debug, Clone)]
pub struct IntegratorRegistry {
    /// Canonical names and aliases alike
    kinds: HashMap<String, MethodKind>,
}

impl IntegratorRegistry {
    /// Create an empty registry without any pre-registered methods.
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registry holding every [`MethodKind`] under its name and aliases.
    pub fn new() -> Self {
        MethodKind::ALL
            .into_iter()
            .fold(Self::empty(), |registry, kind| registry.with_method(kind))
    }

    /// Process-wide registry of the standard methods.
    pub fn global() -> &'static IntegratorRegistry {
        static REGISTRY: OnceLock<IntegratorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(IntegratorRegistry::new)
    }

    /// Register one method. Returns self for method chaining.
    pub fn with_method(mut self, kind: MethodKind) -> Self {
        self.register(kind);
        self
    }

    pub fn register(&mut self, kind: MethodKind) {
        self.kinds.insert(kind.name().to_string(), kind);
        for alias in kind.aliases() {
            self.kinds.insert(alias.to_string(), kind);
        }
    }

    /// Point an extra name at an already registered method.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let kind = self.resolve(target)?;
        self.kinds.insert(alias.to_string(), kind);
        Ok(())
    }

    /// Look up a name or alias. Names are case-sensitive.
    pub fn resolve(&self, name: &str) -> Result<MethodKind, RegistryError> {
        self.kinds
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownMethod {
                name: name.to_string(),
                available: self.list_available(),
                aliases: self.list_aliases().into_iter().map(|(a, _)| a).collect(),
            })
    }

    pub fn create(
        &self,
        name: &str,
        context: &MethodContext,
        repository: &mut FieldRepository,
    ) -> Result<Box<dyn IntegrationMethod>, RegistryError> {
        let kind = self.resolve(name)?;
        debug!(
            "creating integrator '{}' for '{}' with {} slots",
            kind.name(),
            context.base_name,
            context.capacity
        );
        Ok(kind.build(context, repository)?)
    }

    /// Canonical names, sorted
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kinds
            .iter()
            .filter(|(key, kind)| key.as_str() == kind.name())
            .map(|(key, _)| key.clone())
            .collect();
        names.sort();
        names
    }

    /// `(alias, canonical)` pairs, sorted by alias
    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .kinds
            .iter()
            .filter(|(key, kind)| key.as_str() != kind.name())
            .map(|(key, kind)| (key.clone(), kind.name().to_string()))
            .collect();
        aliases.sort_by(|a, b| a.0.cmp(&b.0));
        aliases
    }
}

impl Default for IntegratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
