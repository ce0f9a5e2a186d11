//! Error types for the loop-chain compiler.
//!
//! This module defines all error types used throughout the crate,
//! organized by the kind of mistake the caller made.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Top-level error type for the loop-chain compiler.
#[derive(Error, Debug)]
pub enum SlopeError {
    /// The chain or the configuration is not in a state that allows generation
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A name refers to something that was never declared
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// A numeric setting lies outside its accepted range
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    /// Rendering of the emitted source failed
    #[error("Render error: {0}")]
    Render(#[from] fmt::Error),
}

impl SlopeError {
    /// Short machine-friendly name of the error family.
    pub fn family(&self) -> &'static str {
        match self {
            SlopeError::Configuration(_) => "configuration",
            SlopeError::Reference(_) => "reference",
            SlopeError::Range(_) => "range",
            SlopeError::Render(_) => "render",
        }
    }
}

/// The chain or configuration cannot be used as requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// The error message
    pub message: String,
    /// The kind of configuration error
    pub kind: ConfigurationErrorKind,
}

impl ConfigurationError {
    /// Create a configuration error of the given kind.
    pub fn new(kind: ConfigurationErrorKind, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// What went wrong with the chain or the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    /// Generation requested before sets and loops were declared
    ChainNotConstructed,
    /// Two sets share the same sanitized name
    DuplicateSet,
    /// Two maps share the same sanitized name
    DuplicateMap,
    /// A set, map or loop name is empty once sanitized
    EmptyName,
    /// The superset relation contains a cycle
    SupersetCycle,
    /// An enum value was rejected by strict parsing
    InvalidValue,
    /// The number of kernel fragments does not match the loop count
    KernelCountMismatch,
    /// The process-wide configuration was installed twice
    AlreadyInstalled,
}

/// A name refers to a set or map that is not part of the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ReferenceError {
    /// The error message
    pub message: String,
    /// The unresolved name
    pub name: String,
    /// The kind of reference error
    pub kind: ReferenceErrorKind,
}

impl ReferenceError {
    /// Create a reference error for the unresolved `name`.
    pub fn new(kind: ReferenceErrorKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), name: name.into(), kind }
    }
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (`{}`)", self.message, self.name)
    }
}

/// Which kind of name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceErrorKind {
    /// Undeclared set
    UndeclaredSet,
    /// Undeclared map
    UndeclaredMap,
}

/// A numeric value lies outside its accepted range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct RangeError {
    /// The error message
    pub message: String,
    /// The offending value
    pub value: i64,
    /// The kind of range error
    pub kind: RangeErrorKind,
}

impl RangeError {
    /// Create a range error for the offending `value`.
    pub fn new(kind: RangeErrorKind, value: i64, message: impl Into<String>) -> Self {
        Self { message: message.into(), value, kind }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (got {})", self.message, self.value)
    }
}

/// Which value is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeErrorKind {
    /// Seed loop outside `[0, loop_count)`
    SeedLoop,
    /// Negative prefetch distance
    PrefetchDistance,
    /// Coordinate arity outside `1..=3`
    CoordinateArity,
}

/// A warning: generation continued with a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Message
    pub message: String,
    /// Additional notes
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Add a note to the diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Forward the diagnostic to the `log` facade.
    pub fn emit_log(&self) {
        log::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)?;
        for note in &self.notes {
            write!(f, " ({})", note)?;
        }
        Ok(())
    }
}

/// A value resolved with possible fallbacks, plus the warnings they produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Warnings produced while resolving
    pub warnings: Vec<Diagnostic>,
}

impl<T> Resolved<T> {
    /// A value resolved without fallbacks.
    pub fn clean(value: T) -> Self {
        Self { value, warnings: Vec::new() }
    }

    /// A value resolved with one fallback.
    pub fn with_warning(value: T, warning: Diagnostic) -> Self {
        Self { value, warnings: vec![warning] }
    }

    /// True when no fallback was taken.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Result type using SlopeError.
pub type SlopeResult<T> = Result<T, SlopeError>;
