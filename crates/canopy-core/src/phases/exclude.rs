//! Phase 4: Drop user-excluded namespaces and functions from the model.

use log::warn;

use crate::graph::Program;

/// Remove every group, at any depth, whose token is listed. A matching file
/// group removes the whole file. Returns the names that matched nothing.
pub fn run_exclude_namespaces_phase(program: &mut Program, names: &[String]) -> Vec<String> {
    let mut missed = Vec::new();
    for name in names {
        let matches: Vec<_> = program
            .groups()
            .into_iter()
            .filter(|&g| program.group(g).token == *name)
            .collect();
        if matches.is_empty() {
            warn!("could not exclude namespace '{name}' because it was not found");
            missed.push(name.clone());
        }
        for group in matches {
            program.remove_group(group);
        }
    }
    missed
}

/// Remove every node whose token is listed. Returns the names that matched
/// nothing.
pub fn run_exclude_functions_phase(program: &mut Program, names: &[String]) -> Vec<String> {
    let mut missed = Vec::new();
    for name in names {
        let matches: Vec<_> = program
            .nodes()
            .into_iter()
            .filter(|&n| program.node(n).token == *name)
            .collect();
        if matches.is_empty() {
            warn!("could not exclude function '{name}' because it was not found");
            missed.push(name.clone());
        }
        for node in matches {
            program.remove_node(node);
        }
    }
    missed
}
