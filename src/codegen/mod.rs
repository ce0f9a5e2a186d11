//! Code generation for the inspector/executor pair.
//!
//! Emitters build a [`cir`] tree, which [`printer`] renders to C++ text.

pub mod cir;
pub mod executor;
pub mod inspector;
pub mod printer;
pub mod runtime;

pub use executor::{Executor, ExecutorEmission, LoopBinding};
pub use inspector::{EntryArg, Inspector, InspectorEmission};

use crate::config::Config;
use crate::model::LoopChain;
use crate::utils::errors::SlopeResult;

/// Generate the inspector translation unit of `chain`.
pub fn generate_inspector(chain: &LoopChain<'_>, config: &Config<'_>) -> SlopeResult<InspectorEmission> {
    Inspector::new(chain, config).generate()
}

/// Generate the executor fragment of `chain`, one kernel fragment per loop.
pub fn generate_executor<K: AsRef<str>>(
    chain: &LoopChain<'_>,
    config: &Config<'_>,
    kernels: &[K],
) -> SlopeResult<ExecutorEmission> {
    Executor::new(chain, config)?.generate(kernels)
}
