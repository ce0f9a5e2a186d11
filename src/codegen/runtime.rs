//! Typed constructors for the runtime library's calls.
//!
//! Each function builds one call expression with the argument order the
//! runtime headers declare, so emitters never assemble argument lists by hand.

use super::cir::Expr;
use crate::config::{ColoringMode, DebugMode, ExecutionMode, RuntimeMode};
use crate::model::parloop::{AccessMode, MapRef};

/// Runtime header declaring the inspector API.
pub const INSPECTOR_HEADER: &str = "inspector.h";
/// Runtime header declaring the executor API.
pub const EXECUTOR_HEADER: &str = "executor.h";
/// Runtime header with timing helpers.
pub const UTILS_HEADER: &str = "utils.h";

/// Headers every emitted translation unit includes, in order.
pub const HEADERS: [&str; 3] = [INSPECTOR_HEADER, EXECUTOR_HEADER, UTILS_HEADER];

/// `set(sets[row].name, sets[row].core, sets[row].exec, sets[row].nonexec, superset)`
pub fn set(table: &str, row: usize, superset: Option<&str>) -> Expr {
    Expr::call(
        "set",
        vec![
            Expr::table(table, row, "name"),
            Expr::table(table, row, "core"),
            Expr::table(table, row, "exec"),
            Expr::table(table, row, "nonexec"),
            Expr::ident_or_null(superset),
        ],
    )
}

/// The synthetic set of partitions: one element per partition, no halo.
pub fn partition_set(table: &str, row: usize) -> Expr {
    Expr::call(
        "set",
        vec![
            Expr::table(table, row, "name"),
            Expr::table(table, row, "nparts"),
            Expr::int(0),
            Expr::int(0),
            Expr::Null,
        ],
    )
}

/// `map(table[row].name, source, target, table[row].map, table[row].size)`
pub fn map(table: &str, row: usize, source: &str, target: &str) -> Expr {
    Expr::call(
        "map",
        vec![
            Expr::table(table, row, "name"),
            Expr::ident(source),
            Expr::ident(target),
            Expr::table(table, row, "map"),
            Expr::table(table, row, "size"),
        ],
    )
}

/// Map from a partitioned set to its partitions; the name is a literal.
pub fn partition_map(name: &str, source: &str, target: &str, table: &str, row: usize) -> Expr {
    Expr::call(
        "map",
        vec![
            Expr::str(name),
            Expr::ident(source),
            Expr::ident(target),
            Expr::table(table, row, "part"),
            Expr::table(table, row, "size"),
        ],
    )
}

/// `desc(map, MODE)`
pub fn desc(map: &MapRef, mode: AccessMode) -> Expr {
    Expr::call("desc", vec![Expr::ident(map.as_str()), Expr::ident(mode.as_runtime())])
}

/// Arguments of `insp_init`, in declaration order.
#[derive(Debug, Clone)]
pub struct InitCall<'n> {
    /// Variable holding the average tile size
    pub tile_size: &'n str,
    /// Tile parallelization
    pub mode: ExecutionMode,
    /// Coloring strategy
    pub coloring: ColoringMode,
    /// Mesh topology map list, `NULL` when absent
    pub mesh_maps: Option<&'n str>,
    /// Partitioning list, `NULL` when absent
    pub partitionings: Option<&'n str>,
    /// Variable holding the prefetch distance
    pub prefetch: &'n str,
    /// Variable holding the WAR relaxation flag
    pub ignore_war: &'n str,
    /// Chain name, as a string literal
    pub chain_name: &'n str,
}

impl InitCall<'_> {
    /// `insp_init(...)`
    pub fn to_expr(&self) -> Expr {
        Expr::call(
            "insp_init",
            vec![
                Expr::ident(self.tile_size),
                Expr::ident(self.mode.as_runtime()),
                Expr::ident(self.coloring.as_runtime()),
                Expr::ident_or_null(self.mesh_maps),
                Expr::ident_or_null(self.partitionings),
                Expr::ident(self.prefetch),
                Expr::ident(self.ignore_war),
                Expr::str(self.chain_name),
            ],
        )
    }
}

/// `insp_add_parloop(insp, "name", set, &descriptors)`
pub fn insp_add_parloop(insp: &str, loop_name: &str, set: &str, descriptors: &str) -> Expr {
    Expr::call(
        "insp_add_parloop",
        vec![
            Expr::ident(insp),
            Expr::str(loop_name),
            Expr::ident(set),
            Expr::ident(descriptors).addr_of(),
        ],
    )
}

/// `insp_run(insp, seed)`
pub fn insp_run(insp: &str, seed: &str) -> Expr {
    Expr::call("insp_run", vec![Expr::ident(insp), Expr::ident(seed)])
}

/// `insp_print(insp, level, -1)`
pub fn insp_print(insp: &str, level: DebugMode) -> Expr {
    Expr::call("insp_print", vec![Expr::ident(insp), Expr::ident(level.as_runtime())])
}

/// `generate_vtk(insp, level, set, (double*)coords[0].data, DIMn, rank)`
pub fn generate_vtk(insp: &str, level: DebugMode, set: &str, coords: &str, dim: &str, rank: &str) -> Expr {
    Expr::call(
        "generate_vtk",
        vec![
            Expr::ident(insp),
            Expr::ident(level.as_runtime()),
            Expr::ident(set),
            Expr::cast("double*", Expr::table(coords, 0, "data")),
            Expr::ident(dim),
            Expr::ident(rank),
        ],
    )
}

/// `exec_init(insp)`
pub fn exec_init(insp: &str) -> Expr {
    Expr::call("exec_init", vec![Expr::ident(insp)])
}

/// `insp_free(insp)`
pub fn insp_free(insp: &str) -> Expr {
    Expr::call("insp_free", vec![Expr::ident(insp)])
}

/// `exec_num_colors(exec)`
pub fn exec_num_colors(exec: &str) -> Expr {
    Expr::call("exec_num_colors", vec![Expr::ident(exec)])
}

/// `exec_tiles_per_color(exec, color)`
pub fn exec_tiles_per_color(exec: &str, color: &str) -> Expr {
    Expr::call("exec_tiles_per_color", vec![Expr::ident(exec), Expr::ident(color)])
}

/// `exec_tile_at(exec, color, index, region)`
pub fn exec_tile_at(exec: &str, color: &str, index: &str, region: &str) -> Expr {
    Expr::call(
        "exec_tile_at",
        vec![Expr::ident(exec), Expr::ident(color), Expr::ident(index), Expr::ident(region)],
    )
}

/// `tile_get_local_map(tile, ordinal, "map")`
pub fn tile_get_local_map(tile: &str, ordinal: usize, map: &str) -> Expr {
    Expr::call(
        "tile_get_local_map",
        vec![Expr::ident(tile), Expr::int(ordinal as i64), Expr::str(map)],
    )
}

/// `tile_get_iterations(tile, ordinal)`
pub fn tile_get_iterations(tile: &str, ordinal: usize) -> Expr {
    Expr::call("tile_get_iterations", vec![Expr::ident(tile), Expr::int(ordinal as i64)])
}

/// `tile_loop_size(tile, ordinal)`
pub fn tile_loop_size(tile: &str, ordinal: usize) -> Expr {
    Expr::call("tile_loop_size", vec![Expr::ident(tile), Expr::int(ordinal as i64)])
}

/// `time_stamp()`
pub fn time_stamp() -> Expr {
    Expr::call("time_stamp", Vec::new())
}
