//! Helpers for compiling the emitted code against the runtime library.

use crate::config::{Config, ExecutionMode};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported C++ compiler families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
    /// GCC and compatible compilers
    #[default]
    Gnu,
    /// Intel C++ compiler
    Intel,
}

/// Options the inspector and executor are expected to be compiled with.
pub fn compile_options(compiler: Compiler, config: &Config<'_>) -> Vec<String> {
    let mut opts = vec!["-std=c++11".to_string()];
    if config.coordinates().is_some() {
        opts.push("-DSLOPE_VTK".to_string());
    }
    opts.push("-O3".to_string());
    opts.push("-fopenmp".to_string());
    if compiler == Compiler::Intel {
        if config.execution() == ExecutionMode::Omp {
            opts.push("-par-affinity=scatter,verbose".to_string());
        }
        opts.push("-xHost".to_string());
        opts.push("-ip".to_string());
    }
    opts
}

/// Base name of the runtime's shared library.
pub fn lib_name() -> &'static str {
    "slope"
}

/// Runtime include directory, relative to its source tree.
pub fn include_dir() -> &'static str {
    "sparsetiling/include"
}

/// Runtime library directory, relative to its source tree.
pub fn lib_dir() -> &'static str {
    "lib"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, CoordinateField, DebugMode};

    #[test]
    fn test_gnu_defaults() {
        let opts = compile_options(Compiler::Gnu, &Config::default());
        assert_eq!(opts, vec!["-std=c++11", "-O3", "-fopenmp"]);
    }

    #[test]
    fn test_intel_omp_with_coordinates() {
        let xyz = [0.0; 3];
        let mut b = ConfigBuilder::new();
        b.execution_mode(ExecutionMode::Omp)
            .debug_mode(DebugMode::Low, Some(CoordinateField::new("nodes", &xyz, 3).unwrap()));
        let opts = compile_options(Compiler::Intel, &b.build().value);
        assert_eq!(
            opts,
            vec!["-std=c++11", "-DSLOPE_VTK", "-O3", "-fopenmp", "-par-affinity=scatter,verbose", "-xHost", "-ip"]
        );
    }

    #[test]
    fn test_intel_mpi_has_no_affinity() {
        let mut b = ConfigBuilder::new();
        b.execution_mode(ExecutionMode::OmpMpi);
        let opts = compile_options(Compiler::Intel, &b.build().value);
        assert!(!opts.iter().any(|o| o.starts_with("-par-affinity")));
    }

    #[test]
    fn test_layout() {
        assert_eq!(lib_name(), "slope");
        assert_eq!(include_dir(), "sparsetiling/include");
        assert_eq!(lib_dir(), "lib");
    }
}
