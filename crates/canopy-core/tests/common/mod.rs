//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use canopy_core::config::AnalysisConfig;
use canopy_core::graph::{Edge, GroupId, NodeId, Program};
use canopy_core::languages::Language;
use canopy_core::phases;
use canopy_core::phases::calls::LinkReport;
use canopy_core::pipeline::{run_pipeline, AnalysisResult};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

pub struct PhaseResult {
    pub language: Language,
    pub program: Program,
    pub report: LinkReport,
}

/// Run discovery, parsing and build on a fixture directory.
pub fn run_build(fixture_name: &str) -> PhaseResult {
    let config = AnalysisConfig::new([fixture_path(fixture_name)]);
    let found = phases::discovery::run_discovery_phase(&config).expect("discovery failed");
    let parsed = phases::parsing::run_parsing_phase(found.language, &found.files, false)
        .expect("parsing failed");
    let mut program = Program::new();
    phases::build::run_build_phase(found.language, &parsed, &mut program);
    PhaseResult {
        language: found.language,
        program,
        report: LinkReport::default(),
    }
}

/// Run every phase up to and including resolve.
pub fn run_resolved(fixture_name: &str) -> PhaseResult {
    let mut r = run_build(fixture_name);
    phases::inherit::run_inherit_phase(&mut r.program);
    phases::resolve::run_resolve_phase(&mut r.program);
    r
}

/// Run every phase up to and including calls; nothing is trimmed.
pub fn run_linked(fixture_name: &str) -> PhaseResult {
    let mut r = run_resolved(fixture_name);
    r.report = phases::calls::run_calls_phase(&mut r.program);
    r
}

/// Run the full pipeline with default options.
pub fn analyse(fixture_name: &str) -> AnalysisResult {
    analyse_with(fixture_name, |_| {})
}

/// Run the full pipeline after letting the caller adjust the config.
pub fn analyse_with(fixture_name: &str, adjust: impl FnOnce(&mut AnalysisConfig)) -> AnalysisResult {
    let mut config = AnalysisConfig::new([fixture_path(fixture_name)]);
    adjust(&mut config);
    run_pipeline(&config, None).expect("pipeline failed")
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Distinct `(caller, callee)` names of the given edges.
pub fn edge_names(program: &Program, edges: &[Edge]) -> BTreeSet<(String, String)> {
    edges
        .iter()
        .map(|e| (program.node_name(e.caller), program.node_name(e.callee)))
        .collect()
}

/// Fully-qualified names of every reachable node.
pub fn node_names(program: &Program) -> BTreeSet<String> {
    program
        .nodes()
        .into_iter()
        .map(|n| program.node_name(n))
        .collect()
}

/// Tokens of every reachable group, in traversal order.
pub fn group_tokens(program: &Program) -> Vec<String> {
    program
        .groups()
        .into_iter()
        .map(|g| program.group(g).token.clone())
        .collect()
}

/// Node with the given fully-qualified name, e.g. `app::Greeter.greet`.
pub fn find_node(program: &Program, name: &str) -> NodeId {
    program
        .nodes()
        .into_iter()
        .find(|&n| program.node_name(n) == name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

/// First reachable group with the given token.
pub fn find_group(program: &Program, token: &str) -> GroupId {
    program
        .groups()
        .into_iter()
        .find(|&g| program.group(g).token == token)
        .unwrap_or_else(|| panic!("no group named {token}"))
}

pub fn pair(caller: &str, callee: &str) -> (String, String) {
    (caller.to_string(), callee.to_string())
}
