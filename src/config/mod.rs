//! Configuration shared by the inspector and executor emitters.
//!
//! A [`ConfigBuilder`] collects settings (typed, or as strings resolved
//! leniently) and freezes them into an immutable [`Config`], which is then
//! passed by reference to every emitter. Chains compiled in the same process
//! can share one process-wide instance through [`install`] / [`global`]; it
//! can be installed once and never changes afterwards.

pub mod modes;

pub use modes::{resolve, ColoringMode, DebugMode, ExecutionMode, PartitionMode, RuntimeMode};

use crate::model::map::{DeclaredMap, Map};
use crate::utils::errors::{
    ConfigurationError, ConfigurationErrorKind, Diagnostic, RangeError, RangeErrorKind, Resolved,
    SlopeResult,
};
use crate::utils::sanitize::sanitize;
use log::debug;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};

/// A coordinate field used to export the tiled mesh for visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateField<'a> {
    set: String,
    values: &'a [f64],
    arity: u8,
}

impl<'a> CoordinateField<'a> {
    /// `values` holds `arity` coordinates per element of `set`.
    ///
    /// Only the arity is checked here; whether `set` belongs to a chain is
    /// checked when that chain's inspector is generated.
    pub fn new(set: &str, values: &'a [f64], arity: i64) -> SlopeResult<Self> {
        if !(1..=3).contains(&arity) {
            return Err(RangeError::new(
                RangeErrorKind::CoordinateArity,
                arity,
                "coordinate arity should be a number in [1, 2, 3]",
            )
            .into());
        }
        Ok(Self {
            set: sanitize(set),
            values,
            arity: arity as u8,
        })
    }

    /// Sanitized name of the set the coordinates belong to.
    pub fn set(&self) -> &str {
        &self.set
    }

    /// Flattened coordinates.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Coordinates per element (1 to 3).
    pub fn arity(&self) -> u8 {
        self.arity
    }

    /// Number of mesh elements covered by the field.
    pub fn size(&self) -> usize {
        self.values.len() / usize::from(self.arity)
    }

    /// The runtime's dimensionality constant, e.g. `DIM2`.
    pub fn dim_constant(&self) -> String {
        format!("DIM{}", self.arity)
    }
}

/// Inspection hints, as accepted by `configure`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionOptions {
    /// No write-after-read dependencies need tracking in this chain
    pub ignore_war: bool,
    /// Loop from which tiles are derived
    pub seed_loop: Option<i64>,
    /// Software prefetch distance used by the executor
    pub prefetch: i64,
    /// Coloring mode spelling (`default`, `rand`, `mincols`)
    pub coloring: Option<String>,
    /// Partitioning mode spelling (`chunk`, `metis`)
    pub part_mode: Option<String>,
}

/// Frozen configuration read by the emitters.
#[derive(Debug, Clone, Default)]
pub struct Config<'a> {
    execution: ExecutionMode,
    coloring: ColoringMode,
    partitioning: PartitionMode,
    debug: Option<DebugMode>,
    coordinates: Option<CoordinateField<'a>>,
    mesh_maps: Vec<DeclaredMap<'a>>,
    timing: bool,
    prefetch: u32,
    ignore_war: bool,
}

impl<'a> Config<'a> {
    /// Start from the defaults.
    pub fn builder() -> ConfigBuilder<'a> {
        ConfigBuilder::new()
    }

    /// Tile parallelization.
    pub fn execution(&self) -> ExecutionMode {
        self.execution
    }

    /// Coloring strategy.
    pub fn coloring(&self) -> ColoringMode {
        self.coloring
    }

    /// Partitioning strategy.
    pub fn partitioning(&self) -> PartitionMode {
        self.partitioning
    }

    /// Inspector debug verbosity, if enabled.
    pub fn debug(&self) -> Option<DebugMode> {
        self.debug
    }

    /// Coordinate field for mesh visualization, if any.
    pub fn coordinates(&self) -> Option<&CoordinateField<'a>> {
        self.coordinates.as_ref()
    }

    /// Maps describing the mesh topology.
    pub fn mesh_maps(&self) -> &[DeclaredMap<'a>] {
        &self.mesh_maps
    }

    /// Whether loops are timed.
    pub fn timing(&self) -> bool {
        self.timing
    }

    /// Prefetch distance.
    pub fn prefetch(&self) -> u32 {
        self.prefetch
    }

    /// Whether write-after-read dependencies are relaxed.
    pub fn ignore_war(&self) -> bool {
        self.ignore_war
    }
}

/// Collects settings before freezing them into a [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder<'a> {
    config: Config<'a>,
    warnings: Vec<Diagnostic>,
}

impl<'a> ConfigBuilder<'a> {
    /// A builder over the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode.
    pub fn execution_mode(&mut self, mode: ExecutionMode) -> &mut Self {
        self.config.execution = mode;
        self
    }

    /// Set the execution mode from its spelling, falling back to `SEQUENTIAL`.
    pub fn execution_mode_str(&mut self, mode: &str) -> &mut Self {
        self.config.execution = self.lenient(mode);
        self
    }

    /// Coloring strategy.
    pub fn coloring(&mut self, mode: ColoringMode) -> &mut Self {
        self.config.coloring = mode;
        self
    }

    /// Set the coloring from its spelling, falling back to the default coloring.
    pub fn coloring_str(&mut self, mode: &str) -> &mut Self {
        self.config.coloring = self.lenient(mode);
        self
    }

    /// Partitioning strategy.
    pub fn partitioning(&mut self, mode: PartitionMode) -> &mut Self {
        self.config.partitioning = mode;
        self
    }

    /// Set the partitioning from its spelling, falling back to chunk partitioning.
    pub fn partitioning_str(&mut self, mode: &str) -> &mut Self {
        self.config.partitioning = self.lenient(mode);
        self
    }

    /// Enable inspector debug output, optionally with a coordinate field
    /// for mesh visualization.
    pub fn debug_mode(&mut self, mode: DebugMode, coordinates: Option<CoordinateField<'a>>) -> &mut Self {
        self.config.debug = Some(mode);
        if coordinates.is_some() {
            self.config.coordinates = coordinates;
        }
        self
    }

    /// Like [`debug_mode`](Self::debug_mode), falling back to `MINIMAL`.
    pub fn debug_mode_str(&mut self, mode: &str, coordinates: Option<CoordinateField<'a>>) -> &mut Self {
        let mode = self.lenient(mode);
        self.debug_mode(mode, coordinates)
    }

    /// Time every loop of the chain and persist per-rank statistics.
    pub fn timing(&mut self, on: bool) -> &mut Self {
        self.config.timing = on;
        self
    }

    /// Maps describing the mesh topology, used by topology-aware partitioning.
    pub fn mesh_topology(&mut self, maps: impl IntoIterator<Item = Map<'a>>) -> &mut Self {
        self.config.mesh_maps = maps.into_iter().map(DeclaredMap::declare).collect();
        self
    }

    /// Software prefetch distance; negative distances are a `RangeError`.
    pub fn prefetch(&mut self, distance: i64) -> SlopeResult<&mut Self> {
        self.config.prefetch = prefetch_distance(distance)?;
        Ok(self)
    }

    /// Relax write-after-read dependencies between loops.
    pub fn ignore_war(&mut self, on: bool) -> &mut Self {
        self.config.ignore_war = on;
        self
    }

    /// Apply the global part of `options`; the seed loop belongs to the chain.
    ///
    /// Nothing is changed when `options` is rejected.
    pub fn configure(&mut self, options: &InspectionOptions) -> SlopeResult<&mut Self> {
        let prefetch = prefetch_distance(options.prefetch)?;
        self.config.prefetch = prefetch;
        self.ignore_war(options.ignore_war);
        if let Some(coloring) = &options.coloring {
            self.coloring_str(coloring);
        }
        if let Some(part_mode) = &options.part_mode {
            self.partitioning_str(part_mode);
        }
        Ok(self)
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Freeze the configuration.
    pub fn build(&self) -> Resolved<Config<'a>> {
        debug!("configuration frozen: {:?}", self.config);
        Resolved {
            value: self.config.clone(),
            warnings: self.warnings.clone(),
        }
    }

    fn lenient<M: RuntimeMode>(&mut self, spelling: &str) -> M {
        let resolved = resolve::<M>(spelling);
        for warning in &resolved.warnings {
            warning.emit_log();
        }
        self.warnings.extend(resolved.warnings);
        resolved.value
    }
}

static GLOBAL: OnceCell<Config<'static>> = OnceCell::new();
static DEFAULT: Lazy<Config<'static>> = Lazy::new(Config::default);

/// Install the process-wide configuration. Fails if one is already installed.
pub fn install(config: Config<'static>) -> SlopeResult<()> {
    GLOBAL.set(config).map_err(|_| {
        ConfigurationError::new(
            ConfigurationErrorKind::AlreadyInstalled,
            "process-wide configuration already installed",
        )
        .into()
    })
}

fn prefetch_distance(distance: i64) -> SlopeResult<u32> {
    u32::try_from(distance).map_err(|_| {
        RangeError::new(
            RangeErrorKind::PrefetchDistance,
            distance,
            "prefetch distance must be a non-negative integer",
        )
        .into()
    })
}

/// The installed process-wide configuration, or the defaults.
pub fn global() -> &'static Config<'static> {
    GLOBAL.get().unwrap_or_else(|| &*DEFAULT)
}
