//! Serializable loop-chain descriptions.
//!
//! A description owns everything a [`Session`] borrows (index buffers,
//! coordinates), so a chain can be read from JSON and compiled without a
//! host program.

use crate::config::{CoordinateField, InspectionOptions};
use crate::model::{Loop, Map, Set};
use crate::session::Session;
use crate::utils::errors::SlopeResult;
use serde::{Deserialize, Serialize};

/// A map with an inline index buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDescription {
    /// Map name
    pub name: String,
    /// Input set
    pub source: String,
    /// Output set
    pub target: String,
    /// Flattened index buffer
    pub values: Vec<i32>,
}

impl MapDescription {
    fn borrow(&self) -> Map<'_> {
        Map::new(&self.name, &self.source, &self.target, &self.values)
    }
}

/// A partitioning with an inline buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitioningDescription {
    /// Partitioned set
    pub set: String,
    /// Partition id per element
    pub values: Vec<i32>,
}

/// Coordinates of a set's elements, for mesh visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesDescription {
    /// Set the coordinates belong to
    pub set: String,
    /// Flattened coordinates
    pub values: Vec<f64>,
    /// Coordinates per element
    pub arity: i64,
}

/// Everything needed to generate one chain's inspector and executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainDescription {
    /// Chain name
    pub name: String,
    /// Sets of the chain
    pub sets: Vec<Set>,
    /// Maps with inline buffers
    pub maps: Vec<MapDescription>,
    /// Loops in execution order
    pub loops: Vec<Loop>,
    /// Partitionings with inline buffers
    pub partitionings: Vec<PartitioningDescription>,
    /// Mesh topology maps, used with `metis` partitioning
    pub mesh_maps: Vec<MapDescription>,
    /// Coordinate field for mesh visualization
    pub coordinates: Option<CoordinatesDescription>,
    /// Average tile size
    pub tile_size: Option<u32>,
    /// Process rank
    pub rank: Option<u32>,
    /// Inspection hints
    pub options: InspectionOptions,
    /// Execution mode spelling
    pub execution_mode: Option<String>,
    /// Debug verbosity spelling
    pub debug_mode: Option<String>,
    /// Time every loop
    pub timing: bool,
    /// Kernel fragment per loop, spliced into the executor
    pub kernels: Vec<String>,
}

impl ChainDescription {
    /// Parse a description from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the description as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Build a session borrowing this description's buffers.
    pub fn session(&self) -> SlopeResult<Session<'_>> {
        let mut session = Session::new(&self.name);
        session.declare_sets(self.sets.iter().cloned())?;
        session.declare_maps(self.maps.iter().map(MapDescription::borrow))?;
        session.declare_loops(self.loops.iter().cloned())?;
        session.declare_partitionings(
            self.partitionings.iter().map(|p| (p.set.as_str(), p.values.as_slice())),
        );
        if let Some(tile_size) = self.tile_size {
            session.set_tile_size(tile_size);
        }
        if let Some(rank) = self.rank {
            session.set_process_rank(rank);
        }
        session.configure(&self.options)?;
        if let Some(mode) = &self.execution_mode {
            session.set_execution_mode(mode);
        }
        if !self.mesh_maps.is_empty() {
            session.set_mesh_topology(self.mesh_maps.iter().map(MapDescription::borrow));
        }
        if let Some(mode) = &self.debug_mode {
            let coordinates = self
                .coordinates
                .as_ref()
                .map(|c| CoordinateField::new(&c.set, &c.values, c.arity))
                .transpose()?;
            session.set_debug_mode(mode, coordinates);
        }
        session.set_timing_mode(self.timing);
        Ok(session)
    }
}
