//! The loop chain: the unit of compilation.

use super::map::{DeclaredMap, Map, Partitioning};
use super::order::order_sets;
use super::parloop::{Loop, MapRef};
use super::set::Set;
use crate::utils::errors::{
    ConfigurationError, ConfigurationErrorKind, RangeError, RangeErrorKind, ReferenceError,
    ReferenceErrorKind, SlopeResult,
};
use crate::utils::sanitize::sanitize;
use log::debug;
use std::collections::HashSet;

/// Default average tile size handed to the runtime.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// An ordered sequence of loops over shared sets and maps.
///
/// Sets and maps are referenced by name; one inspector/executor emission
/// pair is generated per chain.
#[derive(Debug, Clone)]
pub struct LoopChain<'a> {
    name: String,
    sets: Vec<Set>,
    maps: Vec<DeclaredMap<'a>>,
    loops: Vec<Loop>,
    partitionings: Vec<Partitioning<'a>>,
    seed_loop: Option<usize>,
    tile_size: u32,
    rank: u32,
}

impl<'a> LoopChain<'a> {
    /// An empty chain; `name` is sanitized.
    pub fn new(name: &str) -> Self {
        Self {
            name: sanitize(name),
            sets: Vec::new(),
            maps: Vec::new(),
            loops: Vec::new(),
            partitionings: Vec::new(),
            seed_loop: None,
            tile_size: DEFAULT_TILE_SIZE,
            rank: 0,
        }
    }

    /// Declare the chain's sets, replacing any previous declaration.
    ///
    /// Sets are stored in emission order: every subset after its superset.
    pub fn declare_sets(&mut self, sets: impl IntoIterator<Item = Set>) -> SlopeResult<()> {
        let sets: Vec<Set> = sets.into_iter().map(Set::sanitized).collect();
        let mut seen = HashSet::new();
        for (i, set) in sets.iter().enumerate() {
            ensure_named("set", i, &set.name)?;
            if !seen.insert(set.name.as_str()) {
                return Err(ConfigurationError::new(
                    ConfigurationErrorKind::DuplicateSet,
                    format!("set `{}` declared twice", set.name),
                )
                .into());
            }
        }
        self.sets = order_sets(sets)?;
        debug!("chain `{}`: {} sets declared", self.name, self.sets.len());
        Ok(())
    }

    /// Declare the chain's access maps, replacing any previous declaration.
    ///
    /// The index buffers are borrowed: the caller keeps them alive until the
    /// generated inspector has been compiled and run.
    pub fn declare_maps(&mut self, maps: impl IntoIterator<Item = Map<'a>>) -> SlopeResult<()> {
        let maps: Vec<DeclaredMap<'a>> = maps.into_iter().map(DeclaredMap::declare).collect();
        let mut seen = HashSet::new();
        for (i, map) in maps.iter().enumerate() {
            ensure_named("map", i, &map.name)?;
            if !seen.insert(map.name.as_str()) {
                return Err(ConfigurationError::new(
                    ConfigurationErrorKind::DuplicateMap,
                    format!("map `{}` declared twice", map.name),
                )
                .into());
            }
        }
        self.maps = maps;
        debug!("chain `{}`: {} maps declared", self.name, self.maps.len());
        Ok(())
    }

    /// Declare the loops in execution order, replacing any previous declaration.
    pub fn declare_loops(&mut self, loops: impl IntoIterator<Item = Loop>) -> SlopeResult<()> {
        let loops: Vec<Loop> = loops.into_iter().map(Loop::sanitized).collect();
        for (i, lp) in loops.iter().enumerate() {
            ensure_named("loop", i, &lp.name)?;
        }
        self.loops = loops;
        debug!("chain `{}`: {} loops declared", self.name, self.loops.len());
        Ok(())
    }

    /// Declare set partitionings as `(set, partition id per element)` pairs.
    pub fn declare_partitionings<S: AsRef<str>>(
        &mut self,
        partitionings: impl IntoIterator<Item = (S, &'a [i32])>,
    ) {
        self.partitionings = partitionings
            .into_iter()
            .map(|(set, values)| Partitioning::declare(set.as_ref(), values))
            .collect();
    }

    /// Average tile size handed to the runtime.
    pub fn set_tile_size(&mut self, tile_size: u32) {
        self.tile_size = tile_size;
    }

    /// Rank of the process, used to gate debug output and name timing files.
    pub fn set_process_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    /// Choose the loop whose iteration space is partitioned first.
    ///
    /// Checked against the current loop count when loops are already
    /// declared, and again at generation time.
    pub fn set_seed_loop(&mut self, seed: i64) -> SlopeResult<()> {
        let index = self.check_seed_loop(seed)?;
        self.pin_seed_loop(index);
        Ok(())
    }

    /// Validate a seed loop without storing it.
    pub fn check_seed_loop(&self, seed: i64) -> SlopeResult<usize> {
        let index = usize::try_from(seed).map_err(|_| seed_out_of_range(seed, self.loops.len()))?;
        if !self.loops.is_empty() && index >= self.loops.len() {
            return Err(seed_out_of_range(seed, self.loops.len()).into());
        }
        Ok(index)
    }

    pub(crate) fn pin_seed_loop(&mut self, index: usize) {
        self.seed_loop = Some(index);
    }

    /// Sanitized chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets in emission order.
    pub fn sets(&self) -> &[Set] {
        &self.sets
    }

    /// Declared maps.
    pub fn maps(&self) -> &[DeclaredMap<'a>] {
        &self.maps
    }

    /// Loops in chain order.
    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    /// Declared partitionings.
    pub fn partitionings(&self) -> &[Partitioning<'a>] {
        &self.partitionings
    }

    /// Average tile size.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Process rank.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// True once at least one set and one loop are declared.
    pub fn is_constructed(&self) -> bool {
        !self.sets.is_empty() && !self.loops.is_empty()
    }

    /// Whether a set with this sanitized name is declared.
    pub fn has_set(&self, name: &str) -> bool {
        self.sets.iter().any(|s| s.name == name)
    }

    /// Look up a declared map by sanitized name.
    pub fn find_map(&self, name: &str) -> Option<&DeclaredMap<'a>> {
        self.maps.iter().find(|m| m.name == name)
    }

    /// True when every named set is declared in this chain.
    pub fn sets_available(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has_set(n))
    }

    /// The seed loop, defaulting to the middle loop (floor of `len / 2`).
    pub fn seed_loop(&self) -> SlopeResult<usize> {
        let seed = self.seed_loop.unwrap_or(self.loops.len() / 2);
        if seed >= self.loops.len() {
            return Err(seed_out_of_range(seed as i64, self.loops.len()).into());
        }
        Ok(seed)
    }

    /// Fail unless sets and loops are declared.
    pub fn ensure_constructed(&self) -> SlopeResult<()> {
        if self.is_constructed() {
            Ok(())
        } else {
            Err(ConfigurationError::new(
                ConfigurationErrorKind::ChainNotConstructed,
                format!("loop chain `{}` not constructed yet", self.name),
            )
            .into())
        }
    }

    /// Check that every name used by maps and loops resolves.
    pub fn validate_references(&self) -> SlopeResult<()> {
        for map in &self.maps {
            for set in [&map.source, &map.target] {
                if !self.has_set(set) {
                    return Err(undeclared_set(set, format!("map `{}` uses an undeclared set", map.name)));
                }
            }
        }
        for (i, lp) in self.loops.iter().enumerate() {
            if !self.has_set(&lp.set) {
                return Err(undeclared_set(
                    &lp.set,
                    format!("loop `{}` iterates over an undeclared set", lp.runtime_name(i)),
                ));
            }
            for desc in &lp.descriptors {
                if let MapRef::Map(name) = &desc.map {
                    if self.find_map(name).is_none() {
                        return Err(ReferenceError::new(
                            ReferenceErrorKind::UndeclaredMap,
                            name.clone(),
                            format!("loop `{}` accesses data through an undeclared map", lp.runtime_name(i)),
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}

fn seed_out_of_range(seed: i64, loops: usize) -> RangeError {
    RangeError::new(
        RangeErrorKind::SeedLoop,
        seed,
        format!("seed loop must lie in [0, {})", loops),
    )
}

fn ensure_named(what: &str, position: usize, name: &str) -> SlopeResult<()> {
    if name.is_empty() {
        return Err(ConfigurationError::new(
            ConfigurationErrorKind::EmptyName,
            format!("{} #{} has no usable name", what, position),
        )
        .into());
    }
    Ok(())
}

fn undeclared_set(name: &str, message: String) -> crate::utils::errors::SlopeError {
    ReferenceError::new(ReferenceErrorKind::UndeclaredSet, name, message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parloop::{AccessMode, Descriptor};
    use crate::utils::errors::SlopeError;

    fn airfoil_loops() -> Vec<Loop> {
        vec![
            Loop::new("save_soln", "cells", vec![Descriptor::direct(AccessMode::Read)]),
            Loop::new("adt_calc", "cells", vec![Descriptor::new("pcell", AccessMode::Read)]),
            Loop::new("res_calc", "edges", vec![Descriptor::new("pedge", AccessMode::Read)]),
        ]
    }

    #[test]
    fn test_duplicate_sets_after_sanitize() {
        let mut chain = LoopChain::new("airfoil");
        let err = chain
            .declare_sets(vec![Set::new("op2.cells", 10), Set::new("cells", 10)])
            .unwrap_err();
        assert!(matches!(
            err,
            SlopeError::Configuration(ConfigurationError { kind: ConfigurationErrorKind::DuplicateSet, .. })
        ));
    }

    #[test]
    fn test_duplicate_maps() {
        let buf = [0i32; 4];
        let mut chain = LoopChain::new("airfoil");
        let err = chain
            .declare_maps(vec![
                Map::new("pcell", "cells", "nodes", &buf),
                Map::new("pcell", "cells", "nodes", &buf),
            ])
            .unwrap_err();
        assert_eq!(err.family(), "configuration");
    }

    #[test]
    fn test_names_sanitized_to_nothing() {
        let buf = [0i32; 4];
        let empty_name = |err: SlopeError| {
            matches!(err, SlopeError::Configuration(ConfigurationError { kind: ConfigurationErrorKind::EmptyName, .. }))
        };
        let mut chain = LoopChain::new("airfoil");
        assert!(empty_name(chain.declare_sets(vec![Set::new("cells", 2), Set::new("cells.", 2)]).unwrap_err()));
        assert!(chain.sets().is_empty());
        assert!(empty_name(chain.declare_maps(vec![Map::new("#", "cells", "nodes", &buf)]).unwrap_err()));
        let err = chain
            .declare_loops(vec![Loop::new("kernels.", "cells", vec![Descriptor::direct(AccessMode::Read)])])
            .unwrap_err();
        assert!(err.to_string().contains("loop #0"));
        assert!(chain.loops().is_empty());
    }

    #[test]
    fn test_default_seed_is_middle_loop() {
        let mut chain = LoopChain::new("airfoil");
        chain.declare_loops(airfoil_loops()).unwrap();
        assert_eq!(chain.seed_loop().unwrap(), 1);
        chain.declare_loops(airfoil_loops().into_iter().take(2)).unwrap();
        assert_eq!(chain.seed_loop().unwrap(), 1);
    }

    #[test]
    fn test_seed_out_of_range() {
        let mut chain = LoopChain::new("airfoil");
        chain.declare_loops(airfoil_loops()).unwrap();
        assert!(matches!(chain.set_seed_loop(5), Err(SlopeError::Range(_))));
        assert!(matches!(chain.set_seed_loop(-1), Err(SlopeError::Range(_))));
        chain.set_seed_loop(2).unwrap();
        assert_eq!(chain.seed_loop().unwrap(), 2);
    }

    #[test]
    fn test_seed_rechecked_after_loops_shrink() {
        let mut chain = LoopChain::new("airfoil");
        chain.declare_loops(airfoil_loops()).unwrap();
        chain.set_seed_loop(2).unwrap();
        chain.declare_loops(airfoil_loops().into_iter().take(1)).unwrap();
        assert!(matches!(chain.seed_loop(), Err(SlopeError::Range(_))));
    }

    #[test]
    fn test_not_constructed() {
        let chain = LoopChain::new("empty");
        assert!(matches!(
            chain.ensure_constructed(),
            Err(SlopeError::Configuration(ConfigurationError {
                kind: ConfigurationErrorKind::ChainNotConstructed,
                ..
            }))
        ));
    }

    #[test]
    fn test_validate_references() {
        let buf = [0i32; 8];
        let mut chain = LoopChain::new("airfoil");
        chain.declare_sets(vec![Set::new("cells", 2), Set::new("nodes", 4)]).unwrap();
        chain.declare_maps(vec![Map::new("pcell", "cells", "nodes", &buf)]).unwrap();
        chain.declare_loops(airfoil_loops().into_iter().take(2)).unwrap();
        chain.validate_references().unwrap();

        chain.declare_loops(airfoil_loops()).unwrap();
        let err = chain.validate_references().unwrap_err();
        assert!(matches!(err, SlopeError::Reference(ref r) if r.name == "edges"));
    }
}
