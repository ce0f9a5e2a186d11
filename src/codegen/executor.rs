//! Executor emission.
//!
//! The executor is a code fragment meant to be spliced into a caller-owned
//! function taking `(void* _exec, tile_region region, int rank)`. It walks
//! the colors in increasing order and the tiles of each color, possibly in
//! parallel, and runs one caller-supplied kernel fragment per loop of the
//! chain inside every tile.
//!
//! Kernel fragments address the tile's iterations through local bindings,
//! exposed per loop as [`LoopBinding`]s.

use super::cir::{Expr, Param, Stmt};
use super::printer;
use super::runtime::{self, HEADERS};
use crate::config::Config;
use crate::model::chain::LoopChain;
use crate::model::parloop::MapRef;
use crate::utils::errors::{ConfigurationError, ConfigurationErrorKind, SlopeResult};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// Variable holding the current loop's iteration count inside a tile.
pub const LOOP_SIZE_VAR: &str = "tileLoopSize";
/// Directory the timing statistics are written to.
pub const TIMING_DIR: &str = "Execution_output";

const EXEC: &str = "exec";
const EXEC_PARAM: &str = "_exec";
const REGION: &str = "region";
const RANK: &str = "rank";
const TILE: &str = "tile";
const N_COLORS: &str = "nColors";
const N_TILES: &str = "nTilesPerColor";

const TIMES: &str = "times";
const ITERS: &str = "nIters";
const WORKER_TIMES: &str = "timesWorker";
const WORKER_ITERS: &str = "nItersWorker";

const TIMING_HEADERS: [&str; 5] = ["vector", "string", "sstream", "fstream", "sys/stat.h"];

/// Global-to-local names for one loop of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopBinding {
    /// Position of the loop in the chain
    pub ordinal: usize,
    /// Kernel name of the loop
    pub loop_name: String,
    /// Declared map name to the tile-local map, in first-use order
    pub local_maps: IndexMap<String, String>,
    /// Tile-local iteration list
    pub iterations: String,
}

impl LoopBinding {
    /// Local name for a descriptor's map; `DIRECT` resolves to the iterations.
    pub fn resolve(&self, map: &MapRef) -> Option<&str> {
        match map {
            MapRef::Direct => Some(&self.iterations),
            MapRef::Map(name) => self.local_maps.get(name).map(String::as_str),
        }
    }
}

/// Output of [`Executor::generate`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorEmission {
    /// Traversal fragment with the kernels in place
    pub source: String,
    /// Headers the enclosing translation unit must include
    pub headers: Vec<String>,
    /// Parameters the enclosing function must declare, as `type name`
    pub parameters: Vec<String>,
    /// Per-loop bindings, in chain order
    pub bindings: Vec<LoopBinding>,
    /// Variable holding the current loop's tile-local size
    pub loop_size_var: String,
}

impl ExecutorEmission {
    /// A complete function around the fragment, headers included.
    pub fn wrap_function(&self, name: &str) -> SlopeResult<String> {
        let mut unit: Vec<Stmt> = self.headers.iter().map(|h| header(h)).collect();
        unit.push(Stmt::Blank);
        unit.push(Stmt::Function {
            ret: "void".into(),
            name: name.to_string(),
            params: params(),
            body: Some(vec![Stmt::Verbatim(self.source.clone())]),
            extern_c: false,
        });
        printer::render(&unit)
    }
}

fn header(name: &str) -> Stmt {
    if HEADERS.contains(&name) {
        Stmt::include_local(name)
    } else {
        Stmt::include_system(name)
    }
}

fn params() -> Vec<Param> {
    vec![
        Param::new("void*", EXEC_PARAM),
        Param::new("tile_region", REGION),
        Param::new("int", RANK),
    ]
}

/// Emits the executor of one chain under one configuration.
pub struct Executor<'c, 'a> {
    chain: &'c LoopChain<'a>,
    config: &'c Config<'a>,
    bindings: Vec<LoopBinding>,
}

impl<'c, 'a> Executor<'c, 'a> {
    /// Fails if the chain is not constructed or has unresolved names.
    pub fn new(chain: &'c LoopChain<'a>, config: &'c Config<'a>) -> SlopeResult<Self> {
        chain.ensure_constructed()?;
        chain.validate_references()?;
        let bindings = chain
            .loops()
            .iter()
            .enumerate()
            .map(|(i, lp)| LoopBinding {
                ordinal: i,
                loop_name: lp.name.clone(),
                local_maps: lp
                    .indirect_maps()
                    .into_iter()
                    .map(|m| (m.to_string(), format!("loc_{}_{}", m, i)))
                    .collect(),
                iterations: format!("iterations_{}", i),
            })
            .collect();
        Ok(Self { chain, config, bindings })
    }

    /// Bindings for every loop of the chain.
    pub fn bindings(&self) -> &[LoopBinding] {
        &self.bindings
    }

    /// Headers required by the fragment.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        if self.config.timing() {
            headers.extend(TIMING_HEADERS.iter().map(|h| h.to_string()));
        }
        headers
    }

    /// Parameters the enclosing function declares, as `type name`.
    pub fn params(&self) -> Vec<String> {
        params().into_iter().map(|p| format!("{} {}", p.ty, p.name)).collect()
    }

    /// Emit with one kernel fragment per loop, in chain order.
    pub fn generate<K: AsRef<str>>(&self, kernels: &[K]) -> SlopeResult<ExecutorEmission> {
        if kernels.len() != self.bindings.len() {
            return Err(ConfigurationError::new(
                ConfigurationErrorKind::KernelCountMismatch,
                format!(
                    "chain `{}` has {} loops but {} kernel fragments were given",
                    self.chain.name(),
                    self.bindings.len(),
                    kernels.len()
                ),
            )
            .into());
        }
        self.emit(|b| kernels[b.ordinal].as_ref().to_string())
    }

    /// Emit with kernels produced from each loop's bindings.
    pub fn generate_with(&self, kernel: impl Fn(&LoopBinding) -> String) -> SlopeResult<ExecutorEmission> {
        self.emit(kernel)
    }

    /// Statements run before loop `i`'s kernel inside a tile.
    pub fn loop_prologue(&self, i: usize) -> Vec<Stmt> {
        let Some(binding) = self.bindings.get(i) else {
            return Vec::new();
        };
        let mut stmts = vec![Stmt::comment(&format!("loop {}: {}", i, binding.loop_name))];
        for (map, local) in &binding.local_maps {
            stmts.push(Stmt::decl("iterations_list&", local, runtime::tile_get_local_map(TILE, i, map)));
        }
        stmts.push(Stmt::decl(
            "iterations_list&",
            &binding.iterations,
            runtime::tile_get_iterations(TILE, i),
        ));
        stmts.push(Stmt::assign(Expr::ident(LOOP_SIZE_VAR), runtime::tile_loop_size(TILE, i)));
        if self.config.timing() {
            stmts.push(Stmt::assign(Expr::ident("start"), runtime::time_stamp()));
        }
        stmts
    }

    /// Statements run after loop `i`'s kernel inside a tile.
    pub fn loop_epilogue(&self, i: usize) -> Vec<Stmt> {
        if !self.config.timing() {
            return Vec::new();
        }
        let (times, iters) = self.accumulators();
        let slot = Expr::int(i as i64);
        vec![
            Stmt::assign(Expr::ident("end"), runtime::time_stamp()),
            Stmt::Expr(
                Expr::ident(times)
                    .at(slot.clone())
                    .dot("push_back")
                    .invoke(vec![Expr::ident("end").sub(Expr::ident("start"))]),
            ),
            Stmt::add_assign(Expr::ident(iters).at(slot), Expr::ident(LOOP_SIZE_VAR)),
        ]
    }

    fn parallel(&self) -> bool {
        self.config.execution().is_shared_memory()
    }

    /// Per-worker accumulators in parallel regions, shared ones otherwise.
    fn accumulators(&self) -> (&'static str, &'static str) {
        if self.parallel() {
            (WORKER_TIMES, WORKER_ITERS)
        } else {
            (TIMES, ITERS)
        }
    }

    fn emit(&self, kernel: impl Fn(&LoopBinding) -> String) -> SlopeResult<ExecutorEmission> {
        let mut program = Vec::new();
        if self.config.timing() {
            program.extend(self.timing_init());
            program.push(Stmt::Blank);
        }
        program.push(Stmt::decl(
            "executor_t*",
            EXEC,
            Expr::cast("executor_t*", Expr::ident(EXEC_PARAM)),
        ));
        program.push(Stmt::decl("int", N_COLORS, runtime::exec_num_colors(EXEC)));
        program.push(self.color_loop(&kernel));
        if self.config.timing() {
            program.push(Stmt::Blank);
            program.extend(self.timing_report());
        }

        let source = printer::render(&program)?;
        debug!(
            "executor for `{}`: {} loops, mode {:?}, timing {}",
            self.chain.name(),
            self.bindings.len(),
            self.config.execution(),
            self.config.timing()
        );
        Ok(ExecutorEmission {
            source,
            headers: self.headers(),
            parameters: self.params(),
            bindings: self.bindings.clone(),
            loop_size_var: LOOP_SIZE_VAR.to_string(),
        })
    }

    /// Colors run in order; only tiles of one color may run concurrently.
    fn color_loop(&self, kernel: &impl Fn(&LoopBinding) -> String) -> Stmt {
        let tiles = Stmt::for_range("j", Expr::ident(N_TILES), self.tile_body(kernel));
        let mut body = vec![Stmt::decl(
            "const int",
            N_TILES,
            runtime::exec_tiles_per_color(EXEC, "i"),
        )];
        match (self.parallel(), self.config.timing()) {
            (true, true) => body.extend(self.timed_parallel_region(tiles)),
            (true, false) => {
                body.push(Stmt::pragma("omp parallel for schedule(dynamic)"));
                body.push(tiles);
            }
            (false, _) => body.push(tiles),
        }
        Stmt::for_range("i", Expr::ident(N_COLORS), body)
    }

    fn tile_body(&self, kernel: &impl Fn(&LoopBinding) -> String) -> Vec<Stmt> {
        let mut body = vec![
            Stmt::decl("tile_t*", TILE, runtime::exec_tile_at(EXEC, "i", "j", REGION)),
            Stmt::If {
                cond: Expr::ident(TILE).not(),
                then_body: vec![Stmt::Continue],
            },
            Stmt::decl_uninit("int", LOOP_SIZE_VAR),
        ];
        if self.config.timing() {
            body.push(Stmt::decl_uninit("double", "start"));
            body.push(Stmt::decl_uninit("double", "end"));
        }
        for binding in &self.bindings {
            body.push(Stmt::Blank);
            body.extend(self.loop_prologue(binding.ordinal));
            body.push(Stmt::Verbatim(kernel(binding)));
            body.extend(self.loop_epilogue(binding.ordinal));
        }
        body
    }

    /// Tiles of one color with per-worker accumulators, merged when the
    /// color is done.
    fn timed_parallel_region(&self, tiles: Stmt) -> Vec<Stmt> {
        let n = self.bindings.len();
        let k = Expr::ident("k");
        let merge = Stmt::for_range(
            "k",
            Expr::int(n as i64),
            vec![
                Stmt::add_assign(Expr::ident(ITERS).at(k.clone()), Expr::ident(WORKER_ITERS).at(k.clone())),
                Stmt::Expr(Expr::ident(TIMES).at(k.clone()).dot("insert").invoke(vec![
                    Expr::ident(TIMES).at(k.clone()).dot("end").invoke(Vec::new()),
                    Expr::ident(WORKER_TIMES).at(k.clone()).dot("begin").invoke(Vec::new()),
                    Expr::ident(WORKER_TIMES).at(k).dot("end").invoke(Vec::new()),
                ])),
            ],
        );
        vec![
            Stmt::pragma("omp parallel"),
            Stmt::Scope(vec![
                Stmt::decl("int", &format!("{}[{}]", WORKER_ITERS, n), Expr::InitList(vec![Expr::int(0)])),
                Stmt::decl_uninit("std::vector<double>", &format!("{}[{}]", WORKER_TIMES, n)),
                Stmt::pragma("omp for schedule(dynamic)"),
                tiles,
                Stmt::pragma("omp critical"),
                Stmt::Scope(vec![merge]),
            ]),
        ]
    }

    fn timing_init(&self) -> Vec<Stmt> {
        let n = self.bindings.len();
        vec![
            Stmt::comment("per loop statistics"),
            Stmt::decl("int", &format!("{}[{}]", ITERS, n), Expr::InitList(vec![Expr::int(0)])),
            Stmt::decl_uninit("std::vector<double>", &format!("{}[{}]", TIMES, n)),
            Stmt::decl("struct stat", "st", Expr::InitList(vec![Expr::int(0)])),
            Stmt::If {
                cond: Expr::call("stat", vec![Expr::str(TIMING_DIR), Expr::ident("st").addr_of()])
                    .equals(Expr::int(-1)),
                then_body: vec![Stmt::Expr(Expr::call(
                    "mkdir",
                    vec![Expr::str(TIMING_DIR), Expr::int(0o700)],
                ))],
            },
        ]
    }

    /// One file per (chain, rank, region), rewritten on every run.
    fn timing_report(&self) -> Vec<Stmt> {
        let n = self.bindings.len();
        let i = Expr::ident("i");
        let path = Expr::stream(vec![
            Expr::ident("stream"),
            Expr::str(TIMING_DIR),
            Expr::str("/"),
            Expr::str(self.chain.name()),
            Expr::str("_rank"),
            Expr::ident(RANK),
            Expr::str("_"),
            Expr::ident("regionName"),
            Expr::str(".txt"),
        ]);
        let line = Expr::stream(vec![
            Expr::ident("outfile"),
            Expr::str("Loop "),
            i.clone(),
            Expr::str(": totIters="),
            Expr::ident(ITERS).at(i.clone()),
            Expr::str(", time="),
            Expr::ident("tot"),
            Expr::ident("std::endl"),
        ]);
        vec![
            Stmt::decl("std::string", "regionName", Expr::str("core")),
            Stmt::If {
                cond: Expr::ident(REGION).equals(Expr::int(1)),
                then_body: vec![Stmt::assign(Expr::ident("regionName"), Expr::str("exec"))],
            },
            Stmt::decl_uninit("std::stringstream", "stream"),
            Stmt::Expr(path),
            Stmt::CtorDecl {
                ty: "std::ofstream".into(),
                name: "outfile".into(),
                args: vec![Expr::ident("stream").dot("str").invoke(Vec::new())],
            },
            Stmt::for_range(
                "i",
                Expr::int(n as i64),
                vec![
                    Stmt::decl("double", "tot", Expr::Float(0.0)),
                    Stmt::for_range(
                        "j",
                        Expr::cast("int", Expr::ident(TIMES).at(i.clone()).dot("size").invoke(Vec::new())),
                        vec![Stmt::add_assign(
                            Expr::ident("tot"),
                            Expr::ident(TIMES).at(i).at(Expr::ident("j")),
                        )],
                    ),
                    Stmt::Expr(line),
                ],
            ),
            Stmt::Expr(Expr::ident("outfile").dot("close").invoke(Vec::new())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, ExecutionMode};
    use crate::model::{AccessMode, Descriptor, Loop, Map, Set};
    use crate::utils::errors::SlopeError;

    fn chain<'a>(buf: &'a [i32]) -> LoopChain<'a> {
        let mut chain = LoopChain::new("jacobi");
        chain.declare_sets(vec![Set::new("edges", 4), Set::new("nodes", 5)]).unwrap();
        chain.declare_maps(vec![Map::new("edge2node", "edges", "nodes", buf)]).unwrap();
        chain
            .declare_loops(vec![
                Loop::new(
                    "residual",
                    "edges",
                    vec![
                        Descriptor::new("edge2node", AccessMode::Read),
                        Descriptor::direct(AccessMode::Write),
                        Descriptor::new("edge2node", AccessMode::Increment),
                    ],
                ),
                Loop::new("update", "nodes", vec![Descriptor::direct(AccessMode::ReadWrite)]),
            ])
            .unwrap();
        chain
    }

    fn config(mode: ExecutionMode, timing: bool) -> Config<'static> {
        let mut b = ConfigBuilder::new();
        b.execution_mode(mode).timing(timing);
        b.build().value
    }

    #[test]
    fn test_bindings() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = Config::default();
        let exec = Executor::new(&chain, &cfg).unwrap();
        let b = &exec.bindings()[0];
        assert_eq!(b.local_maps.len(), 1);
        assert_eq!(b.resolve(&MapRef::Map("edge2node".into())), Some("loc_edge2node_0"));
        assert_eq!(b.resolve(&MapRef::Direct), Some("iterations_0"));
        assert!(exec.bindings()[1].local_maps.is_empty());
        assert_eq!(exec.bindings()[1].resolve(&MapRef::Direct), Some("iterations_1"));
    }

    #[test]
    fn test_sequential_skeleton() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = Config::default();
        let out = Executor::new(&chain, &cfg).unwrap().generate(&["kernel_a();", "kernel_b();"]).unwrap();
        let src = &out.source;
        assert!(src.starts_with("executor_t* exec = (executor_t*)_exec;\nint nColors = exec_num_colors(exec);\n"));
        assert!(src.contains("for (int i = 0; i < nColors; i++) {\n  const int nTilesPerColor = exec_tiles_per_color(exec, i);\n  for (int j = 0;"));
        assert!(src.contains("    tile_t* tile = exec_tile_at(exec, i, j, region);\n    if (!tile) {\n      continue;\n    }\n    int tileLoopSize;\n"));
        assert!(src.contains("iterations_list& loc_edge2node_0 = tile_get_local_map(tile, 0, \"edge2node\");"));
        assert!(src.contains("tileLoopSize = tile_loop_size(tile, 1);\n    kernel_b();"));
        assert!(!src.contains("#pragma"));
        assert!(!src.contains("time_stamp"));
        assert_eq!(out.loop_size_var, "tileLoopSize");
        assert_eq!(out.headers, vec!["inspector.h", "executor.h", "utils.h"]);
    }

    #[test]
    fn test_omp_pragma_on_tile_loop_only() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = config(ExecutionMode::Omp, false);
        let src = Executor::new(&chain, &cfg).unwrap().generate(&["a();", "b();"]).unwrap().source;
        assert_eq!(src.matches("#pragma").count(), 1);
        assert!(src.contains("  #pragma omp parallel for schedule(dynamic)\n  for (int j = 0; j < nTilesPerColor; j++) {"));
    }

    #[test]
    fn test_kernel_count_mismatch() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = Config::default();
        let err = Executor::new(&chain, &cfg).unwrap().generate(&["only_one();"]).unwrap_err();
        assert!(matches!(err, SlopeError::Configuration(_)));
    }

    #[test]
    fn test_timing_sequential() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = config(ExecutionMode::Sequential, true);
        let out = Executor::new(&chain, &cfg).unwrap().generate(&["a();", "b();"]).unwrap();
        let src = &out.source;
        assert!(src.starts_with("// per loop statistics\nint nIters[2] = {0};\nstd::vector<double> times[2];\n"));
        assert!(src.contains("start = time_stamp();\n    a();\n    end = time_stamp();\n    times[0].push_back(end - start);\n    nIters[0] += tileLoopSize;"));
        assert!(src.contains("stream << \"Execution_output\" << \"/\" << \"jacobi\" << \"_rank\" << rank"));
        assert!(src.contains("std::ofstream outfile (stream.str());"));
        assert!(src.contains("outfile << \"Loop \" << i << \": totIters=\" << nIters[i] << \", time=\" << tot << std::endl;"));
        assert!(out.headers.iter().any(|h| h == "sys/stat.h"));
    }

    #[test]
    fn test_timing_parallel_uses_worker_accumulators() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = config(ExecutionMode::OmpMpi, true);
        let src = Executor::new(&chain, &cfg).unwrap().generate(&["a();", "b();"]).unwrap().source;
        assert!(src.contains("#pragma omp parallel\n  {\n    int nItersWorker[2] = {0};"));
        assert!(src.contains("#pragma omp for schedule(dynamic)"));
        assert!(src.contains("timesWorker[1].push_back(end - start);"));
        assert!(src.contains("#pragma omp critical"));
        assert!(src.contains("nIters[k] += nItersWorker[k];"));
        assert!(!src.contains("#pragma omp parallel for"));
    }

    #[test]
    fn test_wrap_function() {
        let buf = [0i32; 8];
        let chain = chain(&buf);
        let cfg = Config::default();
        let out = Executor::new(&chain, &cfg)
            .unwrap()
            .generate_with(|b| format!("k({});", b.iterations))
            .unwrap();
        let unit = out.wrap_function("run_chain").unwrap();
        assert!(unit.starts_with("#include \"inspector.h\""));
        assert!(unit.contains("void run_chain(void* _exec, tile_region region, int rank) {\n  executor_t* exec"));
        assert!(unit.contains("      k(iterations_1);"));
        assert!(unit.ends_with("}\n"));
    }
}
