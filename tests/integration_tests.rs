//! Integration tests for inspector/executor generation.

use slope_gen::codegen::cir::{walk, Stmt};
use slope_gen::prelude::*;
use slope_gen::toolchain;

/// Airfoil-like chain: nodes, edges, cells and a boundary subset of edges.
fn airfoil<'a>(edge2node: &'a [i32], edge2cell: &'a [i32], cell2node: &'a [i32]) -> Session<'a> {
    let mut session = Session::new("airfoil");
    session
        .declare_sets(vec![
            Set::new("bedges", 4).subset_of("edges"),
            Set::new("nodes", 12),
            Set::new("edges", 16),
            Set::new("cells", 6),
        ])
        .expect("Failed to declare sets");
    session
        .declare_maps(vec![
            Map::new("edge2node", "edges", "nodes", edge2node),
            Map::new("edge2cell", "edges", "cells", edge2cell),
            Map::new("cell2node", "cells", "nodes", cell2node),
        ])
        .expect("Failed to declare maps");
    session
        .declare_loops(vec![
            Loop::new("save_soln", "cells", vec![Descriptor::direct(AccessMode::Read)]),
            Loop::new(
                "adt_calc",
                "cells",
                vec![Descriptor::new("cell2node", AccessMode::Read), Descriptor::direct(AccessMode::Write)],
            ),
            Loop::new(
                "res_calc",
                "edges",
                vec![
                    Descriptor::new("edge2node", AccessMode::Read),
                    Descriptor::new("edge2cell", AccessMode::Increment),
                ],
            ),
        ])
        .expect("Failed to declare loops");
    session
}

#[test]
fn test_single_loop_binding() {
    let cell2node = vec![0, 1, 2, 3, 1, 2, 3, 4];
    let mut session = Session::new("single");
    session.declare_sets(vec![Set::new("cells", 2), Set::new("nodes", 5)]).unwrap();
    session.declare_maps(vec![Map::new("cell2node", "cells", "nodes", &cell2node)]).unwrap();
    session
        .declare_loops(vec![Loop::new(
            "flux",
            "cells",
            vec![Descriptor::new("cell2node", AccessMode::ReadWrite)],
        )])
        .unwrap();

    let insp = session.generate_inspector().expect("Failed to generate inspector");
    assert!(insp.source.contains("desc_list flux_Desc_0 ({desc(cell2node, RW)});"));
    assert!(insp.source.contains("insp_add_parloop(insp, \"flux_Loop_0\", cells, &flux_Desc_0);"));
    assert!(insp.source.contains("int seedTilePoint = 0;"));

    let exec = session.generate_executor(&["flux(loc_cell2node_0, iterations_0);"]).unwrap();
    let binding = &exec.bindings[0];
    assert_eq!(binding.local_maps.get("cell2node").map(String::as_str), Some("loc_cell2node_0"));
    assert_eq!(binding.resolve(&MapRef::Direct), Some("iterations_0"));
    assert!(exec
        .source
        .contains("iterations_list& loc_cell2node_0 = tile_get_local_map(tile, 0, \"cell2node\");"));
    assert!(exec.source.contains("tileLoopSize = tile_loop_size(tile, 0);"));
}

#[test]
fn test_seed_loop_out_of_range() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let mut session = airfoil(&a, &b, &c);
    let opts = InspectionOptions { seed_loop: Some(5), ..Default::default() };
    let err = session.configure(&opts).unwrap_err();
    assert!(matches!(err, SlopeError::Range(ref r) if r.value == 5));
    assert_eq!(err.family(), "range");
}

#[test]
fn test_coordinates_on_undeclared_set() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let coords = vec![0.0; 24];
    let mut session = airfoil(&a, &b, &c);
    let field = CoordinateField::new("vertices", &coords, 2).expect("arity 2 is valid");
    session.set_debug_level(DebugMode::Low, Some(field));

    let err = session.generate_inspector().unwrap_err();
    assert!(matches!(err, SlopeError::Reference(ref r) if r.name == "vertices"));
}

#[test]
fn test_timing_report_per_rank_and_region() {
    let edge2node = vec![0, 1, 1, 2];
    let mut session = Session::new("timed");
    session.declare_sets(vec![Set::new("edges", 2), Set::new("nodes", 3)]).unwrap();
    session.declare_maps(vec![Map::new("edge2node", "edges", "nodes", &edge2node)]).unwrap();
    session
        .declare_loops(vec![
            Loop::new("flux", "edges", vec![Descriptor::new("edge2node", AccessMode::Increment)]),
            Loop::new("update", "nodes", vec![Descriptor::direct(AccessMode::ReadWrite)]),
        ])
        .unwrap();
    session.set_timing_mode(true).set_process_rank(3);

    let exec = session.generate_executor(&["flux();", "update();"]).unwrap();
    let src = &exec.source;
    assert!(src.contains("int nIters[2] = {0};"));
    assert!(src.contains("std::vector<double> times[2];"));
    assert!(src.contains("mkdir(\"Execution_output\", 448);"));
    assert!(src.contains("<< \"timed\" << \"_rank\" << rank << \"_\" << regionName << \".txt\";"));
    assert!(src.contains("if (region == 1) {\n  regionName = \"exec\";\n}"));
    // One line per loop, written once per run
    assert!(src.contains("for (int i = 0; i < 2; i++) {"));
    assert_eq!(src.matches("outfile << ").count(), 1);
    assert!(!src.contains("****"));
    assert_eq!(src.matches("time_stamp()").count(), 4);
}

#[test]
fn test_inspector_idempotent() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let ids = vec![0, 0, 1, 1, 2, 2];
    let mut session = airfoil(&a, &b, &c);
    session.declare_partitionings(vec![("cells", &ids[..])]);
    session.set_execution_mode("OMP_MPI");

    let first = session.generate_inspector().unwrap();
    let second = session.generate_inspector().unwrap();
    assert_eq!(first.source, second.source);
    assert_eq!(first.arguments, second.arguments);
}

#[test]
fn test_subsets_declared_after_supersets() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let session = airfoil(&a, &b, &c);
    let src = session.generate_inspector().unwrap().source;

    let edges = src.find("set_t* edges = ").expect("edges declared");
    let bedges = src.find("set_t* bedges = ").expect("bedges declared");
    assert!(edges < bedges);
    assert!(src.contains("sets[3].nonexec, edges);"));
}

#[test]
fn test_binding_iff_indirect() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let session = airfoil(&a, &b, &c);
    let exec = session.generate_executor(&["k0();", "k1();", "k2();"]).unwrap();

    for (binding, lp) in exec.bindings.iter().zip(session.chain().loops()) {
        let indirect: Vec<&str> = lp.descriptors.iter().filter_map(|d| d.map.map_name()).collect();
        assert_eq!(binding.local_maps.len(), indirect.len());
        for map in indirect {
            let local = format!("loc_{}_{}", map, binding.ordinal);
            assert!(exec.source.contains(&format!("iterations_list& {} =", local)));
        }
    }
    assert!(!exec.source.contains("loc_DIRECT"));
}

#[test]
fn test_metis_without_partitionings() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let mut session = airfoil(&a, &b, &c);
    let opts = InspectionOptions { part_mode: Some("metis".into()), ..Default::default() };
    session.configure(&opts).unwrap();

    let src = session.generate_inspector().unwrap().source;
    assert!(src.contains("COL_DEFAULT, NULL, NULL,"));
    assert!(!src.contains("setPartitionings->insert"));
}

#[test]
fn test_metis_with_mesh_topology() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let mut session = airfoil(&a, &b, &c);
    session.set_mesh_topology(vec![
        Map::new("edge2node", "edges", "nodes", &a),
        Map::new("face2node", "faces", "nodes", &a),
    ]);
    let opts = InspectionOptions { part_mode: Some("metis".into()), ..Default::default() };
    session.configure(&opts).unwrap();

    let out = session.generate_inspector().unwrap();
    assert!(out.source.contains("meshMaps->insert(mm_edge2node);"));
    assert!(!out.source.contains("mm_face2node"));
    assert_eq!(out.warnings.len(), 1);
    assert!(out.source.contains("COL_DEFAULT, meshMaps, NULL,"));
}

#[test]
fn test_pragma_only_in_shared_memory_modes() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    for (mode, parallel) in [("SEQUENTIAL", false), ("OMP", true), ("ONLY_MPI", false), ("OMP_MPI", true)] {
        let mut session = airfoil(&a, &b, &c);
        session.set_execution_mode(mode);
        let src = session.generate_executor(&["a();", "b();", "c();"]).unwrap().source;
        assert_eq!(src.contains("#pragma omp parallel for schedule(dynamic)"), parallel, "mode {}", mode);
    }
}

#[test]
fn test_color_loop_never_parallel() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let mut session = airfoil(&a, &b, &c);
    session.set_execution_mode("OMP");
    let config = session.config();
    let executor = Executor::new(session.chain(), &config).unwrap();
    let src = executor.generate(&["a();", "b();", "c();"]).unwrap().source;

    let pragma = src.find("#pragma").unwrap();
    let colors = src.find("for (int i = 0; i < nColors; i++)").unwrap();
    let tiles = src.find("for (int j = 0; j < nTilesPerColor; j++)").unwrap();
    assert!(colors < pragma && pragma < tiles);
    assert!(src[pragma..].trim_start_matches("#pragma omp parallel for schedule(dynamic)\n").trim_start().starts_with("for (int j"));
}

#[test]
fn test_inspector_tree_has_single_init() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let session = airfoil(&a, &b, &c);
    let config = session.config();
    let program = Inspector::new(session.chain(), &config).program().unwrap();

    let mut functions = 0;
    let mut add_parloops = 0;
    walk(&program, &mut |stmt| match stmt {
        Stmt::Function { .. } => functions += 1,
        Stmt::Expr(e) if format!("{:?}", e).contains("insp_add_parloop") => add_parloops += 1,
        _ => {}
    });
    assert_eq!(functions, 2);
    assert_eq!(add_parloops, 3);
}

#[test]
fn test_json_description_end_to_end() {
    let json = r#"{
        "name": "op2.jacobi",
        "sets": [{"name": "edges", "core": 3}, {"name": "nodes", "core": 3}],
        "maps": [{"name": "ppedge", "source": "edges", "target": "nodes", "values": [0, 1, 1, 2, 2, 0]}],
        "loops": [
            {"name": "res", "set": "edges", "descriptors": [{"map": "ppedge", "mode": "INC"}]},
            {"name": "update", "set": "nodes", "descriptors": [{"map": "DIRECT", "mode": "RW"}]}
        ],
        "tile_size": 128,
        "rank": 1,
        "execution_mode": "bogus",
        "timing": true
    }"#;
    let desc = ChainDescription::from_json(json).unwrap();
    let session = desc.session().unwrap();
    assert_eq!(session.chain().name(), "jacobi");
    assert_eq!(session.warnings().len(), 1);
    assert_eq!(session.execution_mode(), ExecutionMode::Sequential);

    let insp = session.generate_inspector().unwrap();
    assert_eq!(insp.arguments[2], EntryArg::TileSize { value: 128 });
    assert_eq!(insp.arguments[3], EntryArg::Rank { value: 1 });

    let flags = toolchain::compile_options(Compiler::Gnu, &session.config());
    assert_eq!(flags, vec!["-std=c++11", "-O3", "-fopenmp"]);
}

#[test]
fn test_kernel_fragments_spliced_in_order() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let session = airfoil(&a, &b, &c);
    let src = session.generate_executor(&["first();", "second();", "third();"]).unwrap().source;
    let first = src.find("first();").unwrap();
    let second = src.find("second();").unwrap();
    let third = src.find("third();").unwrap();
    assert!(first < second && second < third);
}

#[test]
fn test_session_over_prepared_config() {
    let edge2node = vec![0, 1, 1, 2];
    let mut builder = ConfigBuilder::new();
    builder.execution_mode(ExecutionMode::Omp);
    let mut session = Session::with_config("prepared", builder);
    session.declare_sets(vec![Set::new("edges", 2), Set::new("nodes", 3)]).unwrap();
    session.declare_maps(vec![Map::new("edge2node", "edges", "nodes", &edge2node)]).unwrap();
    session
        .declare_loops(vec![Loop::new("flux", "edges", vec![Descriptor::new("edge2node", AccessMode::Increment)])])
        .unwrap();
    session.config_builder().timing(true);

    assert_eq!(session.execution_mode(), ExecutionMode::Omp);
    let exec = session.generate_executor(&["flux();"]).unwrap();
    assert!(exec.headers.iter().any(|h| h == "sstream"));
    assert!(exec.source.contains("#pragma omp parallel"));
}

#[test]
fn test_free_functions_agree_with_session() {
    let (a, b, c) = (vec![0; 32], vec![0; 32], vec![0; 24]);
    let session = airfoil(&a, &b, &c);
    let config = session.config();

    let source = slope_gen::inspector(session.chain(), &config).unwrap();
    assert_eq!(source, session.generate_inspector().unwrap().source);
    assert_eq!(slope_gen::inspector_with_global(session.chain()).unwrap(), source);

    let kernels = ["a();", "b();", "c();"];
    let exec = slope_gen::executor(session.chain(), &config, &kernels).unwrap();
    assert_eq!(exec, session.generate_executor(&kernels).unwrap().source);
}

#[test]
fn test_description_rejects_unnamed_set() {
    let json = r#"{
        "name": "broken",
        "sets": [{"name": "mesh.", "core": 4}],
        "loops": [{"name": "flux", "set": "mesh", "descriptors": []}]
    }"#;
    let desc = ChainDescription::from_json(json).unwrap();
    let err = desc.session().unwrap_err();
    assert_eq!(err.family(), "configuration");
}
