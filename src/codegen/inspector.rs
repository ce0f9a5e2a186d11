//! Inspector emission.
//!
//! The inspector is a C++ translation unit exporting one `extern "C"`
//! function, `inspector`, which receives the chain's sets, maps and optional
//! extras as plain tables, rebuilds them as runtime objects, runs the
//! runtime's inspection and returns an opaque executor handle.
//!
//! The emitted code is a function of the chain and the configuration only:
//! generating twice yields byte-identical text.

use super::cir::{Expr, Param, Stmt};
use super::printer;
use super::runtime::{self, InitCall, HEADERS};
use crate::config::{Config, CoordinateField};
use crate::model::chain::LoopChain;
use crate::model::map::{DeclaredMap, Partitioning};
use crate::utils::errors::{Diagnostic, ReferenceError, ReferenceErrorKind, SlopeResult};
use log::{debug, trace};
use serde::Serialize;

/// Name of the exported entry point.
pub const ENTRY_POINT: &str = "inspector";

const SETS: &str = "sets";
const MAPS: &str = "maps";
const TILE_SIZE: &str = "tileSize";
const RANK: &str = "rank";
const COORDS: &str = "coords_dat";
const MESH_MAPS: &str = "mesh_maps";
const PARTITIONINGS: &str = "partitionings";

const INSP: &str = "insp";
const EXEC: &str = "exec";
const MESH_MAP_LIST: &str = "meshMaps";
const PARTITIONING_LIST: &str = "setPartitionings";

/// One row of the sets table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetRow {
    /// Set name as passed to the runtime
    pub name: String,
    /// Owned elements
    pub core: u32,
    /// Halo elements executed redundantly
    pub exec: u32,
    /// Halo elements read but not executed
    pub nonexec: u32,
}

/// One row of a maps table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapRow {
    /// Map name
    pub name: String,
    /// Index buffer length
    pub size: usize,
}

/// One row of the partitionings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionRow {
    /// Name of the synthetic partitioning map
    pub name: String,
    /// Number of partitioned elements
    pub size: usize,
    /// Number of partitions
    pub nparts: u32,
}

/// An argument of the emitted `inspector` function, in call order.
///
/// Carries what the model knows about the value (row names, sizes, partition
/// counts) so a foreign-call adapter can build the argument without
/// re-deriving the layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryArg {
    /// `slope_set sets[n]`
    Sets { rows: Vec<SetRow> },
    /// `slope_map maps[n]`
    Maps { rows: Vec<MapRow> },
    /// `int tileSize`
    TileSize { value: u32 },
    /// `int rank`
    Rank { value: u32 },
    /// `slope_dat coords_dat[1]`; a null pointer with size 0 when absent
    Coordinates { set: Option<String>, size: usize },
    /// `slope_map* mesh_maps`
    MeshMaps { rows: Vec<MapRow> },
    /// `slope_part* partitionings`
    Partitionings { rows: Vec<PartitionRow> },
}

/// Output of [`Inspector::generate`].
#[derive(Debug, Clone, Serialize)]
pub struct InspectorEmission {
    /// Complete translation unit
    pub source: String,
    /// Name of the exported function
    pub entry_point: String,
    /// Arguments of the entry point, in call order
    pub arguments: Vec<EntryArg>,
    /// Declarations skipped because their sets are not in the chain
    pub warnings: Vec<Diagnostic>,
    /// Seed loop handed to `insp_run`
    pub seed_loop: usize,
}

/// Emits the inspector of one chain under one configuration.
pub struct Inspector<'c, 'a> {
    chain: &'c LoopChain<'a>,
    config: &'c Config<'a>,
}

impl<'c, 'a> Inspector<'c, 'a> {
    /// Inspector for `chain` under `config`; checks run in [`generate`](Self::generate).
    pub fn new(chain: &'c LoopChain<'a>, config: &'c Config<'a>) -> Self {
        Self { chain, config }
    }

    /// Generate the inspector translation unit.
    pub fn generate(&self) -> SlopeResult<InspectorEmission> {
        let (program, warnings, seed_loop) = self.build()?;
        let source = printer::render(&program)?;
        debug!(
            "inspector for `{}`: {} loops, seed loop {}, {} bytes",
            self.chain.name(),
            self.chain.loops().len(),
            seed_loop,
            source.len()
        );
        Ok(InspectorEmission {
            source,
            entry_point: ENTRY_POINT.to_string(),
            arguments: self.arguments(),
            warnings,
            seed_loop,
        })
    }

    /// The syntax tree of the translation unit.
    pub fn program(&self) -> SlopeResult<Vec<Stmt>> {
        Ok(self.build()?.0)
    }

    /// Entry-point arguments, in call order.
    pub fn arguments(&self) -> Vec<EntryArg> {
        let map_row = |m: &DeclaredMap<'_>| MapRow { name: m.name.clone(), size: m.len() };
        vec![
            EntryArg::Sets {
                rows: self
                    .chain
                    .sets()
                    .iter()
                    .map(|s| SetRow { name: s.name.clone(), core: s.core, exec: s.exec, nonexec: s.nonexec })
                    .collect(),
            },
            EntryArg::Maps { rows: self.chain.maps().iter().map(map_row).collect() },
            EntryArg::TileSize { value: self.chain.tile_size() },
            EntryArg::Rank { value: self.chain.rank() },
            EntryArg::Coordinates {
                set: self.config.coordinates().map(|c| c.set().to_string()),
                size: self.config.coordinates().map_or(0, CoordinateField::size),
            },
            EntryArg::MeshMaps { rows: self.config.mesh_maps().iter().map(map_row).collect() },
            EntryArg::Partitionings {
                rows: self
                    .chain
                    .partitionings()
                    .iter()
                    .map(|p| PartitionRow {
                        name: p.partition_set_name(),
                        size: p.len(),
                        nparts: p.nparts(),
                    })
                    .collect(),
            },
        ]
    }

    fn check(&self) -> SlopeResult<usize> {
        self.chain.ensure_constructed()?;
        self.chain.validate_references()?;
        if let Some(coords) = self.config.coordinates() {
            if !self.chain.has_set(coords.set()) {
                return Err(ReferenceError::new(
                    ReferenceErrorKind::UndeclaredSet,
                    coords.set(),
                    format!("coordinate field set is not part of chain `{}`", self.chain.name()),
                )
                .into());
            }
        }
        self.chain.seed_loop()
    }

    fn build(&self) -> SlopeResult<(Vec<Stmt>, Vec<Diagnostic>, usize)> {
        let seed = self.check()?;
        let mut warnings = Vec::new();

        let params = self.params();
        let mut program: Vec<Stmt> = HEADERS.iter().map(|h| Stmt::include_local(h)).collect();
        program.push(Stmt::Blank);
        program.extend(table_types());
        program.push(Stmt::Function {
            ret: "void*".into(),
            name: ENTRY_POINT.into(),
            params: params.clone(),
            body: None,
            extern_c: true,
        });
        program.push(Stmt::Blank);

        let mut body = Vec::new();
        body.push(Stmt::comment("Sets, maps and descriptors"));
        body.extend(self.set_decls());
        body.extend(self.map_decls());
        body.extend(self.desc_decls());
        body.push(Stmt::Blank);

        body.push(Stmt::comment("Mesh topology, used by topology-aware partitioning"));
        body.push(Stmt::decl("map_list*", MESH_MAP_LIST, Expr::New("map_list".into())));
        let mesh = self.mesh_map_decls(&mut warnings);
        let has_mesh = !mesh.is_empty();
        body.extend(mesh);
        body.push(Stmt::Blank);

        body.push(Stmt::comment("Set partitionings, seeding the tiling"));
        body.push(Stmt::decl("map_list*", PARTITIONING_LIST, Expr::New("map_list".into())));
        let parts = self.partitioning_decls(&mut warnings);
        let has_parts = !parts.is_empty();
        body.extend(parts);
        body.push(Stmt::Blank);

        body.push(Stmt::decl("int", "avgTileSize", Expr::ident(TILE_SIZE)));
        body.push(Stmt::decl("int", "prefetchHalo", Expr::int(i64::from(self.config.prefetch()))));
        body.push(Stmt::decl("bool", "ignoreWAR", Expr::Bool(self.config.ignore_war())));
        let init = InitCall {
            tile_size: "avgTileSize",
            mode: self.config.execution(),
            coloring: self.config.coloring(),
            mesh_maps: has_mesh.then_some(MESH_MAP_LIST),
            partitionings: has_parts.then_some(PARTITIONING_LIST),
            prefetch: "prefetchHalo",
            ignore_war: "ignoreWAR",
            chain_name: self.chain.name(),
        };
        body.push(Stmt::decl("inspector_t*", INSP, init.to_expr()));
        body.push(Stmt::Blank);

        for (i, lp) in self.chain.loops().iter().enumerate() {
            body.push(Stmt::Expr(runtime::insp_add_parloop(
                INSP,
                &lp.runtime_name(i),
                &lp.set,
                &lp.desc_list_name(i),
            )));
        }
        body.push(Stmt::Blank);

        body.push(Stmt::decl("int", "seedTilePoint", Expr::int(seed as i64)));
        body.push(Stmt::Expr(runtime::insp_run(INSP, "seedTilePoint")));
        body.push(Stmt::Blank);

        if let Some(report) = self.debug_output() {
            body.push(Stmt::If {
                cond: Expr::ident(RANK).equals(Expr::int(0)),
                then_body: report,
            });
            body.push(Stmt::Blank);
        }

        body.push(Stmt::decl("executor_t*", EXEC, runtime::exec_init(INSP)));
        body.push(Stmt::Expr(runtime::insp_free(INSP)));
        body.push(Stmt::Delete(Expr::ident(MESH_MAP_LIST)));
        body.push(Stmt::Delete(Expr::ident(PARTITIONING_LIST)));
        body.push(Stmt::Return(Expr::ident(EXEC)));

        program.push(Stmt::Function {
            ret: "void*".into(),
            name: ENTRY_POINT.into(),
            params,
            body: Some(body),
            extern_c: false,
        });

        for warning in &warnings {
            warning.emit_log();
        }
        Ok((program, warnings, seed))
    }

    fn params(&self) -> Vec<Param> {
        vec![
            Param::array("slope_set", SETS, self.chain.sets().len()),
            Param::array("slope_map", MAPS, self.chain.maps().len()),
            Param::new("int", TILE_SIZE),
            Param::new("int", RANK),
            Param::array("slope_dat", COORDS, 1),
            Param::new("slope_map*", MESH_MAPS),
            Param::new("slope_part*", PARTITIONINGS),
        ]
    }

    fn set_decls(&self) -> Vec<Stmt> {
        self.chain
            .sets()
            .iter()
            .enumerate()
            .map(|(i, s)| Stmt::decl("set_t*", &s.name, runtime::set(SETS, i, s.superset.as_deref())))
            .collect()
    }

    fn map_decls(&self) -> Vec<Stmt> {
        self.chain
            .maps()
            .iter()
            .enumerate()
            .map(|(i, m)| Stmt::decl("map_t*", &m.name, runtime::map(MAPS, i, &m.source, &m.target)))
            .collect()
    }

    fn desc_decls(&self) -> Vec<Stmt> {
        self.chain
            .loops()
            .iter()
            .enumerate()
            .map(|(i, lp)| Stmt::CtorDecl {
                ty: "desc_list".into(),
                name: lp.desc_list_name(i),
                args: vec![Expr::InitList(
                    lp.descriptors.iter().map(|d| runtime::desc(&d.map, d.mode)).collect(),
                )],
            })
            .collect()
    }

    /// Mesh maps are only useful to topology-aware partitioning. Rows keep
    /// their index in the caller's table even when others are skipped.
    fn mesh_map_decls(&self, warnings: &mut Vec<Diagnostic>) -> Vec<Stmt> {
        if !self.config.partitioning().is_topology_aware() {
            return Vec::new();
        }
        let mut decls = Vec::new();
        let mut inserts = Vec::new();
        for (i, m) in self.config.mesh_maps().iter().enumerate() {
            if !self.chain.sets_available(&[&m.source, &m.target]) {
                warnings.push(
                    Diagnostic::warning(format!("mesh map `{}` skipped", m.name))
                        .with_note(format!("`{}` or `{}` is not a set of this chain", m.source, m.target)),
                );
                continue;
            }
            let local = format!("mm_{}", m.name);
            decls.push(Stmt::decl("map_t*", &local, runtime::map(MESH_MAPS, i, &m.source, &m.target)));
            inserts.push(insert(MESH_MAP_LIST, &local));
        }
        trace!("{} mesh maps emitted", decls.len());
        decls.extend(inserts);
        decls
    }

    fn partitioning_decls(&self, warnings: &mut Vec<Diagnostic>) -> Vec<Stmt> {
        let mut decls = Vec::new();
        let mut inserts = Vec::new();
        for (i, p) in self.chain.partitionings().iter().enumerate() {
            if !self.chain.has_set(&p.set) {
                warnings.push(
                    Diagnostic::warning(format!("partitioning of `{}` skipped", p.set))
                        .with_note("the set is not part of this chain"),
                );
                continue;
            }
            decls.extend(partitioning(p, i));
            inserts.push(insert(PARTITIONING_LIST, &p.map_name()));
        }
        decls.extend(inserts);
        decls
    }

    fn debug_output(&self) -> Option<Vec<Stmt>> {
        let level = self.config.debug()?;
        let mut report = vec![Stmt::Expr(runtime::insp_print(INSP, level))];
        if let Some(coords) = self.config.coordinates() {
            report.push(Stmt::Expr(runtime::generate_vtk(
                INSP,
                level,
                coords.set(),
                COORDS,
                &coords.dim_constant(),
                RANK,
            )));
        }
        Some(report)
    }
}

fn partitioning(p: &Partitioning<'_>, row: usize) -> [Stmt; 2] {
    let part_set = p.partition_set_name();
    let map_name = p.map_name();
    [
        Stmt::decl("set_t*", &part_set, runtime::partition_set(PARTITIONINGS, row)),
        Stmt::decl(
            "map_t*",
            &map_name,
            runtime::partition_map(&map_name, &p.set, &part_set, PARTITIONINGS, row),
        ),
    ]
}

fn insert(list: &str, item: &str) -> Stmt {
    Stmt::Expr(Expr::ident(list).arrow("insert").invoke(vec![Expr::ident(item)]))
}

/// Layouts of the entry point's table arguments.
fn table_types() -> Vec<Stmt> {
    let typedef = |name: &str, fields: &[(&str, &str)]| Stmt::Typedef {
        name: name.to_string(),
        fields: fields.iter().map(|(t, n)| (t.to_string(), n.to_string())).collect(),
    };
    vec![
        typedef("slope_set", &[("char*", "name"), ("int", "core"), ("int", "exec"), ("int", "nonexec")]),
        Stmt::Blank,
        typedef("slope_map", &[("char*", "name"), ("int*", "map"), ("int", "size")]),
        Stmt::Blank,
        typedef("slope_dat", &[("void*", "data"), ("int", "size")]),
        Stmt::Blank,
        typedef("slope_part", &[("char*", "name"), ("int*", "part"), ("int", "size"), ("int", "nparts")]),
        Stmt::Blank,
    ]
}
