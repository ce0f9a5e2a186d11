//! Iteration sets.

use crate::utils::sanitize::{sanitize, sanitize_opt};
use serde::{Deserialize, Serialize};

/// A named, sized iteration domain (mesh cells, nodes, edges...).
///
/// In distributed runs a set is split into a `core` region owned by the
/// process, an `exec` halo that is executed redundantly and a `nonexec` halo
/// that is only read. Single-process chains leave both halo sizes at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    /// Set name (an emitted identifier)
    pub name: String,
    /// Number of owned elements
    pub core: u32,
    /// Size of the executed halo
    #[serde(default)]
    pub exec: u32,
    /// Size of the non-executed halo
    #[serde(default)]
    pub nonexec: u32,
    /// Name of the set this one is a strict subset of
    #[serde(default)]
    pub superset: Option<String>,
}

impl Set {
    /// A single-partition set of `size` elements.
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            core: size,
            exec: 0,
            nonexec: 0,
            superset: None,
        }
    }

    /// Set the halo region sizes.
    pub fn with_halo(mut self, exec: u32, nonexec: u32) -> Self {
        self.exec = exec;
        self.nonexec = nonexec;
        self
    }

    /// Declare this set as a strict subset of `superset`.
    pub fn subset_of(mut self, superset: impl Into<String>) -> Self {
        self.superset = Some(superset.into());
        self
    }

    /// Total number of elements across all regions.
    pub fn total(&self) -> u64 {
        u64::from(self.core) + u64::from(self.exec) + u64::from(self.nonexec)
    }

    /// Whether the set has a superset.
    pub fn is_subset(&self) -> bool {
        self.superset.is_some()
    }

    pub(crate) fn sanitized(self) -> Self {
        Self {
            name: sanitize(&self.name),
            superset: sanitize_opt(self.superset.as_deref()),
            ..self
        }
    }
}
