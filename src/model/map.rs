//! Index maps and set partitionings.
//!
//! Both borrow their index buffers from the caller. The buffers are not read
//! by the emitters (the generated code receives them as entry-point
//! arguments), but they must outlive the compiled inspector call.

use crate::utils::sanitize::sanitize;

/// An indirection from one set to another, backed by an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Map<'a> {
    /// Map name, unique within the chain
    pub name: &'a str,
    /// Input (source) set name
    pub source: &'a str,
    /// Output (target) set name
    pub target: &'a str,
    /// Flattened index buffer, `arity * |source|` entries
    pub values: &'a [i32],
}

impl<'a> Map<'a> {
    /// Borrow `values` as the index buffer of a map from `source` to `target`.
    pub fn new(name: &'a str, source: &'a str, target: &'a str, values: &'a [i32]) -> Self {
        Self { name, source, target, values }
    }

    /// Number of entries in the index buffer.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the index buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A map with sanitized names, as stored by the chain and the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMap<'a> {
    /// Sanitized map name
    pub name: String,
    /// Sanitized input set
    pub source: String,
    /// Sanitized output set
    pub target: String,
    /// Borrowed index buffer
    pub values: &'a [i32],
}

impl<'a> DeclaredMap<'a> {
    pub(crate) fn declare(map: Map<'a>) -> Self {
        Self {
            name: sanitize(map.name),
            source: sanitize(map.source),
            target: sanitize(map.target),
            values: map.values,
        }
    }

    /// Number of entries in the index buffer.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the index buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A map from the elements of a set to partition identifiers.
///
/// Used to seed the runtime's tiling decision instead of a plain chunked
/// partition of the seed loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioning<'a> {
    /// The partitioned set
    pub set: String,
    /// Partition id per element
    pub values: &'a [i32],
}

impl<'a> Partitioning<'a> {
    pub(crate) fn declare(set: &str, values: &'a [i32]) -> Self {
        Self { set: sanitize(set), values }
    }

    /// Name of the synthetic map from the set to its partitions.
    pub fn map_name(&self) -> String {
        format!("{}_to_partitioning", self.set)
    }

    /// Name of the synthetic set of partitions.
    pub fn partition_set_name(&self) -> String {
        format!("{}_partitioning", self.set)
    }

    /// Number of partitions: ids are zero-based, so the largest id plus one.
    pub fn nparts(&self) -> u32 {
        self.values
            .iter()
            .copied()
            .max()
            .map(|m| u32::try_from(m).map(|m| m + 1).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of entries in the index buffer.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the index buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
