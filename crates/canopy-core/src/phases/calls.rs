//! Phase 7: Link every call site to the node it invokes.
//!
//! A call is first matched against the bindings visible at its line, nearest
//! first. Failing that, a structural search over every node decides: exactly
//! one candidate links, several make the call ambiguous, none leave it
//! unresolved.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::graph::{Call, Edge, EntityRef, GroupId, GroupKind, NodeId, PointsTo, Program, Variable};

/// Outcome of resolving one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    /// The receiver is a module outside the analysed sources.
    External,
    Ambiguous,
    Unresolved,
}

/// Edges found by the calls phase plus the calls it refused to guess.
#[derive(Debug, Default, Clone)]
pub struct LinkReport {
    /// One edge per resolved call site, duplicates included.
    pub edges: Vec<Edge>,
    /// Rendered ambiguous calls, sorted and de-duplicated.
    pub ambiguous: Vec<String>,
    /// Calls skipped because their receiver is an external module.
    pub external: usize,
}

/// Run the calls phase over every reachable node.
pub fn run_calls_phase(program: &mut Program) -> LinkReport {
    let all_nodes = program.nodes();
    let mut report = LinkReport::default();
    let mut ambiguous = BTreeSet::new();

    for &caller in &all_nodes {
        let calls = program.node(caller).calls.clone();
        for call in &calls {
            match find_target(program, &all_nodes, caller, call) {
                Target::Node(callee) => report.edges.push(program.link(caller, callee)),
                Target::Ambiguous => {
                    ambiguous.insert(call.to_string());
                }
                Target::External => {
                    report.external += 1;
                    debug!(
                        "not linking {call} on line {} of {}: receiver is an external module",
                        call.line_number,
                        program.node_name(caller)
                    );
                }
                Target::Unresolved => {}
            }
        }
    }

    report.ambiguous = ambiguous.into_iter().collect();
    if !report.ambiguous.is_empty() {
        info!(
            "skipped {} ambiguous call(s): {}",
            report.ambiguous.len(),
            report.ambiguous.join(", ")
        );
    }
    report
}

/// Resolve one call made by `caller`. `all_nodes` is the structural search
/// space.
pub fn find_target(program: &Program, all_nodes: &[NodeId], caller: NodeId, call: &Call) -> Target {
    for variable in program.visible_variables(caller, call.line_number) {
        if let Some(target) = match_variable(program, call, &variable) {
            return target;
        }
    }

    let caller_file = program.file_group_of_node(caller);
    let candidates: Vec<NodeId> = all_nodes
        .iter()
        .copied()
        .filter(|&n| is_candidate(program, n, call, caller_file))
        .collect();
    match candidates.as_slice() {
        [] => Target::Unresolved,
        [only] => Target::Node(*only),
        _ => Target::Ambiguous,
    }
}

fn is_candidate(program: &Program, id: NodeId, call: &Call, caller_file: GroupId) -> bool {
    let node = program.node(id);
    let parent = program.group(node.parent);
    if call.is_attr() {
        // A same-file top-level helper is not what `obj.f()` means.
        node.token == call.token && node.parent != caller_file
    } else {
        (node.token == call.token && parent.kind == GroupKind::File)
            || (node.is_constructor && parent.token == call.token)
    }
}

/// What `variable` says about `call`, or `None` to keep looking.
fn match_variable(program: &Program, call: &Call, variable: &Variable) -> Option<Target> {
    let Some(owner) = &call.owner_token else {
        if variable.token != call.token {
            return None;
        }
        return match variable.points_to {
            PointsTo::Resolved(EntityRef::Node(node)) => Some(Target::Node(node)),
            PointsTo::Resolved(EntityRef::Group(group)) => {
                program.constructor_of(group).map(Target::Node)
            }
            _ => None,
        };
    };

    if *owner == variable.token {
        match variable.points_to {
            PointsTo::Resolved(EntityRef::Group(group)) => {
                if let Some(node) = member_named(program, group, &call.token) {
                    return Some(Target::Node(node));
                }
            }
            PointsTo::UnknownExternal => return Some(Target::External),
            _ => {}
        }
    }

    // `ns.Class.method()` through a variable bound to a namespace.
    if let PointsTo::Resolved(EntityRef::Group(group)) = variable.points_to {
        if program.group(group).kind == GroupKind::Namespace {
            let (head, class) = owner.split_once('.')?;
            if head != variable.token || class.contains('.') {
                return None;
            }
            return program
                .all_nodes(group)
                .into_iter()
                .find(|&n| {
                    let node = program.node(n);
                    node.token == call.token && program.group(node.parent).token == class
                })
                .map(Target::Node);
        }
    }
    None
}

/// Member of `group` (or of one of its ancestors) with the given token.
fn member_named(program: &Program, group: GroupId, token: &str) -> Option<NodeId> {
    let group = program.group(group);
    group
        .nodes
        .iter()
        .chain(group.inherited.iter().flat_map(|&base| program.group(base).nodes.iter()))
        .copied()
        .find(|&n| program.node(n).token == token)
}
