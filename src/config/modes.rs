//! Enumerated runtime settings.
//!
//! Each mode has a strict [`FromStr`] parser and a lenient [`resolve`] that
//! falls back to a documented default and reports a warning instead of
//! failing. The lenient form is what the string-based configuration surface
//! uses, so unknown values from newer callers still produce working code.

use crate::utils::errors::{ConfigurationError, ConfigurationErrorKind, Diagnostic, Resolved};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A setting with a fixed set of spellings and a runtime enumerator.
pub trait RuntimeMode: Copy + PartialEq + fmt::Debug + 'static {
    /// Human-readable name of the setting, used in messages
    const KIND: &'static str;
    /// Value used when a spelling is not recognised
    const FALLBACK: Self;
    /// Accepted spellings and the value they denote
    const SPELLINGS: &'static [(&'static str, Self)];

    /// Identifier of the value in the emitted code.
    fn as_runtime(&self) -> &'static str;

    /// Accepted spellings, for messages and CLI help.
    fn accepted() -> Vec<&'static str> {
        Self::SPELLINGS.iter().map(|(s, _)| *s).collect()
    }
}

fn parse_strict<M: RuntimeMode>(s: &str) -> Result<M, ConfigurationError> {
    M::SPELLINGS
        .iter()
        .find(|(spelling, _)| spelling.eq_ignore_ascii_case(s))
        .map(|(_, mode)| *mode)
        .ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::InvalidValue,
                format!("{} `{}` not in {:?}", M::KIND, s, M::accepted()),
            )
        })
}

/// Parse `s`, falling back to `M::FALLBACK` with a warning.
pub fn resolve<M: RuntimeMode>(s: &str) -> Resolved<M> {
    match parse_strict::<M>(s) {
        Ok(mode) => Resolved::clean(mode),
        Err(err) => {
            let warning = Diagnostic::warning(err.message)
                .with_note(format!("{} set to {}", M::KIND, M::FALLBACK.as_runtime()));
            Resolved::with_warning(M::FALLBACK, warning)
        }
    }
}

/// How the executor parallelizes tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Single thread, single process
    #[default]
    #[serde(rename = "SEQUENTIAL")]
    Sequential,
    /// Shared memory (OpenMP)
    #[serde(rename = "OMP")]
    Omp,
    /// Distributed memory only (MPI)
    #[serde(rename = "ONLY_MPI")]
    OnlyMpi,
    /// Hybrid MPI + OpenMP
    #[serde(rename = "OMP_MPI")]
    OmpMpi,
}

impl ExecutionMode {
    /// Tiles of one color run on multiple threads.
    pub fn is_shared_memory(&self) -> bool {
        matches!(self, ExecutionMode::Omp | ExecutionMode::OmpMpi)
    }
}

impl RuntimeMode for ExecutionMode {
    const KIND: &'static str = "execution mode";
    const FALLBACK: Self = ExecutionMode::Sequential;
    const SPELLINGS: &'static [(&'static str, Self)] = &[
        ("SEQUENTIAL", ExecutionMode::Sequential),
        ("OMP", ExecutionMode::Omp),
        ("ONLY_MPI", ExecutionMode::OnlyMpi),
        ("OMP_MPI", ExecutionMode::OmpMpi),
    ];

    fn as_runtime(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "SEQUENTIAL",
            ExecutionMode::Omp => "OMP",
            ExecutionMode::OnlyMpi => "ONLY_MPI",
            ExecutionMode::OmpMpi => "OMP_MPI",
        }
    }
}

/// Tile coloring strategy requested from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColoringMode {
    /// Runtime's default coloring
    #[default]
    #[serde(rename = "default")]
    Default,
    /// Randomized coloring, for load balancing
    #[serde(rename = "rand")]
    Random,
    /// Minimize the number of colors
    #[serde(rename = "mincols")]
    MinColors,
}

impl RuntimeMode for ColoringMode {
    const KIND: &'static str = "coloring mode";
    const FALLBACK: Self = ColoringMode::Default;
    const SPELLINGS: &'static [(&'static str, Self)] = &[
        ("default", ColoringMode::Default),
        ("rand", ColoringMode::Random),
        ("mincols", ColoringMode::MinColors),
    ];

    fn as_runtime(&self) -> &'static str {
        match self {
            ColoringMode::Default => "COL_DEFAULT",
            ColoringMode::Random => "COL_RAND",
            ColoringMode::MinColors => "COL_MINCOLS",
        }
    }
}

/// How the seed loop's iteration space is partitioned into tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionMode {
    /// Contiguous chunks of the average tile size
    #[default]
    #[serde(rename = "chunk")]
    Chunk,
    /// Topology-aware graph partitioning of the mesh
    #[serde(rename = "metis")]
    Metis,
}

impl PartitionMode {
    /// Whether partitioning uses the mesh topology maps.
    pub fn is_topology_aware(&self) -> bool {
        matches!(self, PartitionMode::Metis)
    }
}

impl RuntimeMode for PartitionMode {
    const KIND: &'static str = "partitioning mode";
    const FALLBACK: Self = PartitionMode::Chunk;
    const SPELLINGS: &'static [(&'static str, Self)] =
        &[("chunk", PartitionMode::Chunk), ("metis", PartitionMode::Metis)];

    fn as_runtime(&self) -> &'static str {
        match self {
            PartitionMode::Chunk => "chunk",
            PartitionMode::Metis => "metis",
        }
    }
}

/// Verbosity of the inspector's debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum DebugMode {
    /// Least verbose
    #[default]
    #[serde(rename = "MINIMAL")]
    Minimal,
    /// `VERY_LOW` verbosity
    #[serde(rename = "VERY_LOW")]
    VeryLow,
    /// `LOW` verbosity
    #[serde(rename = "LOW")]
    Low,
    /// `MEDIUM` verbosity
    #[serde(rename = "MEDIUM")]
    Medium,
    /// Most verbose
    #[serde(rename = "HIGH")]
    High,
}

impl RuntimeMode for DebugMode {
    const KIND: &'static str = "debug mode";
    const FALLBACK: Self = DebugMode::Minimal;
    const SPELLINGS: &'static [(&'static str, Self)] = &[
        ("MINIMAL", DebugMode::Minimal),
        ("VERY_LOW", DebugMode::VeryLow),
        ("LOW", DebugMode::Low),
        ("MEDIUM", DebugMode::Medium),
        ("HIGH", DebugMode::High),
    ];

    fn as_runtime(&self) -> &'static str {
        match self {
            DebugMode::Minimal => "MINIMAL",
            DebugMode::VeryLow => "VERY_LOW",
            DebugMode::Low => "LOW",
            DebugMode::Medium => "MEDIUM",
            DebugMode::High => "HIGH",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_strict(s)
    }
}

impl FromStr for ColoringMode {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_strict(s)
    }
}

impl FromStr for PartitionMode {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_strict(s)
    }
}

impl FromStr for DebugMode {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_strict(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_parse() {
        assert_eq!("omp_mpi".parse::<ExecutionMode>().unwrap(), ExecutionMode::OmpMpi);
        assert_eq!("mincols".parse::<ColoringMode>().unwrap(), ColoringMode::MinColors);
        assert!("gpu".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_lenient_fallback_warns() {
        let r = resolve::<ExecutionMode>("CUDA");
        assert_eq!(r.value, ExecutionMode::Sequential);
        assert_eq!(r.warnings.len(), 1);
        assert!(r.warnings[0].message.contains("CUDA"));

        let r = resolve::<DebugMode>("VERBOSE");
        assert_eq!(r.value, DebugMode::Minimal);
        assert!(!r.is_clean());
    }

    #[test]
    fn test_lenient_accepts_valid() {
        let r = resolve::<PartitionMode>("metis");
        assert!(r.is_clean());
        assert!(r.value.is_topology_aware());
    }

    #[test]
    fn test_runtime_names() {
        assert_eq!(ColoringMode::Random.as_runtime(), "COL_RAND");
        assert_eq!(ExecutionMode::OnlyMpi.as_runtime(), "ONLY_MPI");
        assert!(ExecutionMode::Omp.is_shared_memory());
        assert!(!ExecutionMode::OnlyMpi.is_shared_memory());
    }
}
