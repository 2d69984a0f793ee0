//! Named per-particle storage

use crate::error::{FieldError, IntegrationError};
use crate::math::Vector;
use crate::population::IndexRange;
use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};

/// A named, resizable array of one vector per particle slot.
///
/// The slice views are what kernels operate on; the name only matters for
/// diagnostics and for keeping repository keys unique.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedField {
    name: String,
    values: Vec<Vector>,
}

impl VectorizedField {
    /// Zero-filled field with `len` entries.
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self::filled(name, len, Vector::ZERO)
    }

    pub fn filled(name: impl Into<String>, len: usize, value: Vector) -> Self {
        Self {
            name: name.into(),
            values: vec![value; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grows with zeros or truncates to `len` entries.
    pub fn resize(&mut self, len: usize) {
        self.values.resize(len, Vector::ZERO);
    }

    #[inline]
    pub fn as_slice(&self) -> &[Vector] {
        &self.values
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Vector] {
        &mut self.values
    }

    pub fn get(&self, index: usize) -> Option<Vector> {
        self.values.get(index).copied()
    }

    /// Fails unless every index of `range` addresses an entry.
    pub fn require(&self, range: IndexRange) -> Result<(), IntegrationError> {
        require_len(&self.name, self.values.len(), range)
    }
}

impl Index<usize> for VectorizedField {
    type Output = Vector;

    fn index(&self, index: usize) -> &Vector {
        &self.values[index]
    }
}

impl IndexMut<usize> for VectorizedField {
    fn index_mut(&mut self, index: usize) -> &mut Vector {
        &mut self.values[index]
    }
}

/// Length check used for both owned fields and caller-supplied slices.
pub fn require_len(name: &str, len: usize, range: IndexRange) -> Result<(), IntegrationError> {
    if range.is_empty() || len >= range.last {
        Ok(())
    } else {
        Err(IntegrationError::FieldTooShort {
            field: name.to_string(),
            len,
            required: range.last,
            range,
        })
    }
}

/// Hands out fields keyed by `"<base>_<suffix>"` and refuses duplicates.
///
/// The repository only tracks names; every field it creates is returned by
/// value and owned by the caller from then on.
#[derive(Debug, Clone, Default)]
pub struct FieldRepository {
    names: BTreeSet<String>,
}

impl FieldRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_name(base_name: &str, suffix: &str) -> String {
        format!("{base_name}_{suffix}")
    }

    /// Claims `"<base_name>_<suffix>"` without building the field yet.
    pub fn reserve(&mut self, base_name: &str, suffix: &str) -> Result<String, FieldError> {
        let name = Self::field_name(base_name, suffix);
        if !self.names.insert(name.clone()) {
            return Err(FieldError::NameTaken(name));
        }
        Ok(name)
    }

    /// Creates a zero-filled field named `"<base_name>_<suffix>"`.
    pub fn create(
        &mut self,
        base_name: &str,
        suffix: &str,
        len: usize,
    ) -> Result<VectorizedField, FieldError> {
        let name = self.reserve(base_name, suffix)?;
        Ok(VectorizedField::new(name, len))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Frees a name so it can be created again.
    pub fn release(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
