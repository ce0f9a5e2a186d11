//! Declaration ordering for sets.
//!
//! The emitted code declares every set as a local variable and subsets pass
//! their superset's variable to the runtime, so a superset must be declared
//! first. The superset relation is turned into a dependency graph and sorted
//! topologically; sets at the same nesting depth keep their declaration order.

use super::set::Set;
use crate::utils::errors::{
    ConfigurationError, ConfigurationErrorKind, ReferenceError, ReferenceErrorKind, SlopeResult,
};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Reorder `sets` so that each subset follows its superset.
///
/// Names must already be sanitized and unique.
pub fn order_sets(sets: Vec<Set>) -> SlopeResult<Vec<Set>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(sets.len(), sets.len());
    let nodes: Vec<NodeIndex> = (0..sets.len()).map(|i| graph.add_node(i)).collect();
    let by_name: HashMap<&str, usize> = sets
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    for (i, set) in sets.iter().enumerate() {
        if let Some(superset) = &set.superset {
            let Some(&parent) = by_name.get(superset.as_str()) else {
                return Err(ReferenceError::new(
                    ReferenceErrorKind::UndeclaredSet,
                    superset.clone(),
                    format!("set `{}` names an undeclared superset", set.name),
                )
                .into());
            };
            graph.add_edge(nodes[parent], nodes[i], ());
        }
    }

    let topo = toposort(&graph, None).map_err(|cycle| {
        let culprit = &sets[graph[cycle.node_id()]].name;
        ConfigurationError::new(
            ConfigurationErrorKind::SupersetCycle,
            format!("superset relation is cyclic through set `{}`", culprit),
        )
    })?;

    let mut depth = vec![0usize; sets.len()];
    for node in topo {
        let d = graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|parent| depth[graph[parent]] + 1)
            .max()
            .unwrap_or(0);
        depth[graph[node]] = d;
    }

    let mut indexed: Vec<(usize, Set)> = sets.into_iter().enumerate().collect();
    // Stable: equal depths keep declaration order.
    indexed.sort_by_key(|(i, _)| depth[*i]);
    Ok(indexed.into_iter().map(|(_, s)| s).collect())
}
