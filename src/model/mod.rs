//! In-memory representation of a loop chain.
//!
//! A chain is built from:
//! - [`Set`]s: named iteration domains, optionally nested
//! - [`Map`]s: indirections between sets, backed by borrowed index buffers
//! - [`Loop`]s: kernels iterating over a set, touching data through
//!   [`Descriptor`]s
//! - [`Partitioning`]s: optional hints seeding the runtime's tiling
//!
//! All caller-supplied names are sanitized on declaration.

pub mod chain;
pub mod map;
pub mod order;
pub mod parloop;
pub mod set;

pub use chain::{LoopChain, DEFAULT_TILE_SIZE};
pub use map::{DeclaredMap, Map, Partitioning};
pub use order::order_sets;
pub use parloop::{AccessMode, Descriptor, Loop, MapRef, DIRECT};
pub use set::Set;
