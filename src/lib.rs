//! # slope-gen - inspector/executor generation for sparse tiling
//!
//! Given a loop chain (sets, index maps between sets, and an ordered list of
//! loops annotated with access descriptors), generates:
//! - the C++ source of an inspector that builds the chain in the SLOPE
//!   runtime, runs its tiling and returns an executor handle
//! - the C++ traversal of the resulting tiles (executor), into which the
//!   caller splices one kernel fragment per loop
//!
//! ## Architecture
//!
//! ```text
//! Session → LoopChain + Config → Inspector / Executor → C IR → Printer → Source
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use slope_gen::prelude::*;
//!
//! let edge2node = vec![0, 1, 1, 2];
//! let mut session = Session::new("jacobi");
//! session.declare_sets(vec![Set::new("edges", 2), Set::new("nodes", 3)])?;
//! session.declare_maps(vec![Map::new("edge2node", "edges", "nodes", &edge2node)])?;
//! session.declare_loops(vec![Loop::new(
//!     "flux",
//!     "edges",
//!     vec![Descriptor::new("edge2node", AccessMode::Increment)],
//! )])?;
//! let inspector = session.generate_inspector()?;
//! let executor = session.generate_executor(&["flux(tileLoopSize);"])?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codegen;
pub mod config;
pub mod description;
pub mod model;
pub mod session;
pub mod toolchain;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{
        EntryArg, Executor, ExecutorEmission, Inspector, InspectorEmission, LoopBinding,
    };
    pub use crate::config::{
        ColoringMode, Config, ConfigBuilder, CoordinateField, DebugMode, ExecutionMode,
        InspectionOptions, PartitionMode, RuntimeMode,
    };
    pub use crate::description::ChainDescription;
    pub use crate::model::{AccessMode, Descriptor, Loop, LoopChain, Map, MapRef, Set, DIRECT};
    pub use crate::session::Session;
    pub use crate::toolchain::{compile_options, Compiler};
    pub use crate::utils::errors::*;
}

use utils::errors::SlopeResult;

/// Generate the inspector of a chain with an explicit configuration.
pub fn inspector(chain: &model::LoopChain<'_>, config: &config::Config<'_>) -> SlopeResult<String> {
    Ok(codegen::generate_inspector(chain, config)?.source)
}

/// Generate the inspector of a chain with the process-wide configuration.
pub fn inspector_with_global(chain: &model::LoopChain<'_>) -> SlopeResult<String> {
    inspector(chain, config::global())
}

/// Generate the executor of a chain with an explicit configuration.
pub fn executor<K: AsRef<str>>(
    chain: &model::LoopChain<'_>,
    config: &config::Config<'_>,
    kernels: &[K],
) -> SlopeResult<String> {
    Ok(codegen::generate_executor(chain, config, kernels)?.source)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
