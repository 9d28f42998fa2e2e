//! Exclusion and trim integration tests.

mod common;

use canopy_core::phases::exclude::{run_exclude_functions_phase, run_exclude_namespaces_phase};
use canopy_core::phases::trim::run_trim_phase;
use common::*;
use pretty_assertions::assert_eq;

// ===========================================================================
// Trimming
// ===========================================================================

#[test]
fn trim_keeps_only_connected_nodes() {
    let mut r = run_linked("py_nested");
    run_trim_phase(&mut r.program, &r.report.edges);
    let names = node_names(&r.program);
    assert_eq!(
        names.into_iter().collect::<Vec<_>>(),
        vec![
            "nested::Lid.open",
            "nested::helper",
            "nested::inner",
            "nested::outer",
        ]
    );
    // Box survives because Lid below it still holds a node.
    assert_eq!(group_tokens(&r.program), vec!["nested", "Box", "Lid"]);
}

#[test]
fn trim_drops_files_without_edges() {
    let mut r = run_linked("py_instance_method");
    run_trim_phase(&mut r.program, &r.report.edges);
    let files: Vec<_> = r
        .program
        .files()
        .iter()
        .map(|&f| r.program.group(f).token.clone())
        .collect();
    assert_eq!(files, vec!["app"]);
}

#[test]
fn trim_is_idempotent() {
    let mut r = run_linked("py_inherits");
    run_trim_phase(&mut r.program, &r.report.edges);
    let snapshot = (r.program.nodes(), r.program.groups());
    run_trim_phase(&mut r.program, &r.report.edges);
    assert_eq!((r.program.nodes(), r.program.groups()), snapshot);
}

// ===========================================================================
// Exclusion
// ===========================================================================

#[test]
fn excluded_function_breaks_its_cycle() {
    let mut r = run_build("py_exclusion");
    let missed = run_exclude_functions_phase(&mut r.program, &["pong".to_string()]);
    assert!(missed.is_empty());
    let linked = {
        canopy_core::phases::inherit::run_inherit_phase(&mut r.program);
        canopy_core::phases::resolve::run_resolve_phase(&mut r.program);
        canopy_core::phases::calls::run_calls_phase(&mut r.program)
    };
    assert!(linked.edges.is_empty());
    assert_eq!(
        node_names(&r.program).into_iter().collect::<Vec<_>>(),
        vec!["pingpong::(global)", "pingpong::ping"]
    );
    run_trim_phase(&mut r.program, &linked.edges);
    assert_eq!(r.program.node_count(), 0);
    assert!(r.program.files().is_empty());
}

#[test]
fn excluded_namespace_takes_its_members() {
    let mut r = run_build("py_instance_method");
    let missed = run_exclude_namespaces_phase(
        &mut r.program,
        &["Greeter".to_string(), "nowhere".to_string()],
    );
    assert_eq!(missed, vec!["nowhere".to_string()]);
    assert_eq!(group_tokens(&r.program), vec!["app", "other"]);
    assert!(!node_names(&r.program).contains("app::Greeter.greet"));
}

#[test]
fn excluded_file_disappears() {
    let mut r = run_build("py_instance_method");
    run_exclude_namespaces_phase(&mut r.program, &["other".to_string()]);
    assert_eq!(r.program.files().len(), 1);
    assert!(!node_names(&r.program).contains("other::greet"));
}
