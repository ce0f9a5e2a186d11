//! Utility modules for the loop-chain compiler.
//!
//! This module contains common utilities used throughout the codebase:
//! - Error types and diagnostics
//! - Identifier sanitizing
//! - Code formatting and pretty printing

pub mod errors;
pub mod pretty;
pub mod sanitize;

// Re-exports
pub use errors::*;
pub use pretty::{CodeFormatter, PrettyPrint};
pub use sanitize::{sanitize, sanitize_opt};
