//! One-stop surface for describing a chain and generating its code.
//!
//! A [`Session`] owns a [`LoopChain`] and a [`ConfigBuilder`], mirroring the
//! calls a host program makes: declare the chain, tune the configuration,
//! then ask for the inspector and the executor.

use crate::codegen::{Executor, ExecutorEmission, Inspector, InspectorEmission};
use crate::config::{Config, ConfigBuilder, CoordinateField, DebugMode, ExecutionMode, InspectionOptions};
use crate::model::{Loop, LoopChain, Map, Set};
use crate::utils::errors::{Diagnostic, SlopeResult};
use log::info;

/// A loop chain together with its configuration.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    chain: LoopChain<'a>,
    config: ConfigBuilder<'a>,
}

impl<'a> Session<'a> {
    /// An empty session with the default configuration.
    pub fn new(name: &str) -> Self {
        Self { chain: LoopChain::new(name), config: ConfigBuilder::new() }
    }

    /// Start from an existing configuration builder.
    pub fn with_config(name: &str, config: ConfigBuilder<'a>) -> Self {
        Self { chain: LoopChain::new(name), config }
    }

    /// The chain under construction.
    pub fn chain(&self) -> &LoopChain<'a> {
        &self.chain
    }

    /// Mutable access to the configuration under construction.
    pub fn config_builder(&mut self) -> &mut ConfigBuilder<'a> {
        &mut self.config
    }

    /// See [`LoopChain::declare_sets`].
    pub fn declare_sets(&mut self, sets: impl IntoIterator<Item = Set>) -> SlopeResult<&mut Self> {
        self.chain.declare_sets(sets)?;
        Ok(self)
    }

    /// See [`LoopChain::declare_maps`].
    pub fn declare_maps(&mut self, maps: impl IntoIterator<Item = Map<'a>>) -> SlopeResult<&mut Self> {
        self.chain.declare_maps(maps)?;
        Ok(self)
    }

    /// See [`LoopChain::declare_loops`].
    pub fn declare_loops(&mut self, loops: impl IntoIterator<Item = Loop>) -> SlopeResult<&mut Self> {
        self.chain.declare_loops(loops)?;
        Ok(self)
    }

    /// See [`LoopChain::declare_partitionings`].
    pub fn declare_partitionings<S: AsRef<str>>(
        &mut self,
        partitionings: impl IntoIterator<Item = (S, &'a [i32])>,
    ) -> &mut Self {
        self.chain.declare_partitionings(partitionings);
        self
    }

    /// Average tile size handed to the runtime.
    pub fn set_tile_size(&mut self, tile_size: u32) -> &mut Self {
        self.chain.set_tile_size(tile_size);
        self
    }

    /// Rank of the process running the generated code.
    pub fn set_process_rank(&mut self, rank: u32) -> &mut Self {
        self.chain.set_process_rank(rank);
        self
    }

    /// Apply inspection hints: the seed loop to the chain, the rest to the
    /// configuration. Either all hints are applied or none.
    pub fn configure(&mut self, options: &InspectionOptions) -> SlopeResult<&mut Self> {
        let seed = options
            .seed_loop
            .map(|seed| self.chain.check_seed_loop(seed))
            .transpose()?;
        self.config.configure(options)?;
        if let Some(seed) = seed {
            self.chain.pin_seed_loop(seed);
        }
        Ok(self)
    }

    /// Enable debug output from a verbosity spelling, falling back to `MINIMAL`.
    pub fn set_debug_mode(&mut self, mode: &str, coordinates: Option<CoordinateField<'a>>) -> &mut Self {
        self.config.debug_mode_str(mode, coordinates);
        self
    }

    /// Enable debug output at `mode`.
    pub fn set_debug_level(&mut self, mode: DebugMode, coordinates: Option<CoordinateField<'a>>) -> &mut Self {
        self.config.debug_mode(mode, coordinates);
        self
    }

    /// Toggle per-loop timing in the executor.
    pub fn set_timing_mode(&mut self, on: bool) -> &mut Self {
        self.config.timing(on);
        self
    }

    /// Maps describing the mesh topology, used with `metis` partitioning.
    pub fn set_mesh_topology(&mut self, maps: impl IntoIterator<Item = Map<'a>>) -> &mut Self {
        self.config.mesh_topology(maps);
        self
    }

    /// Set the execution mode from its spelling; unknown spellings fall
    /// back to `SEQUENTIAL` with a warning.
    pub fn set_execution_mode(&mut self, mode: &str) -> &mut Self {
        self.config.execution_mode_str(mode);
        self
    }

    /// The resolved execution mode.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.config.build().value.execution()
    }

    /// Warnings collected by the lenient setters.
    pub fn warnings(&self) -> &[Diagnostic] {
        self.config.warnings()
    }

    /// Freeze the current configuration.
    pub fn config(&self) -> Config<'a> {
        self.config.build().value
    }

    /// Generate the inspector with the current configuration.
    pub fn generate_inspector(&self) -> SlopeResult<InspectorEmission> {
        let config = self.config();
        let emission = Inspector::new(&self.chain, &config).generate()?;
        info!("generated inspector for chain `{}`", self.chain.name());
        Ok(emission)
    }

    /// Generate the executor, splicing one kernel fragment per loop.
    pub fn generate_executor<K: AsRef<str>>(&self, kernels: &[K]) -> SlopeResult<ExecutorEmission> {
        let config = self.config();
        let emission = Executor::new(&self.chain, &config)?.generate(kernels)?;
        info!("generated executor for chain `{}`", self.chain.name());
        Ok(emission)
    }
}
