//! Phase 5: Resolve superclass names and expose inherited members.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, warn};

use crate::graph::{GroupId, GroupKind, Program, Variable};

/// Run the inheritance phase.
///
/// Superclass (and mixin) names are looked up among the class and namespace
/// groups of every file, first declaration wins. Each class's `inherited` list is filled with all of its
/// ancestors, nearest first, and every member of the class gains one binding
/// per inherited member so bare references to them resolve.
pub fn run_inherit_phase(program: &mut Program) {
    warn_duplicate_groups(program);
    let index = bases_by_token(program);

    let mut direct: HashMap<GroupId, Vec<GroupId>> = HashMap::new();
    for group in program.groups() {
        let g = program.group(group);
        if g.inherits.is_empty() {
            continue;
        }
        let mut bases = Vec::new();
        for name in &g.inherits {
            let short = name.rsplit('.').next().unwrap_or(name);
            match index.get(name).or_else(|| index.get(short)) {
                Some(&base) if base != group => bases.push(base),
                _ => debug!("superclass {name} of {} is not in the analysed sources", g.token),
            }
        }
        direct.insert(group, bases);
    }

    for group in program.groups() {
        if !direct.contains_key(&group) {
            continue;
        }
        let ancestors = ancestors(group, &direct);
        let mut bindings = Vec::new();
        for &base in &ancestors {
            let base_group = program.group(base);
            for &n in &base_group.nodes {
                if Some(n) == base_group.root_node {
                    continue;
                }
                // Line 0: visible from every line of every subclass member.
                bindings.push(Variable::node(program.node(n).token.clone(), n, 0));
            }
        }
        let members = program.group(group).nodes.clone();
        for member in members {
            program.node_mut(member).variables.extend(bindings.iter().cloned());
        }
        program.group_mut(group).inherited = ancestors;
    }
}

/// First class or namespace group declaring each token.
fn bases_by_token(program: &Program) -> HashMap<String, GroupId> {
    let mut index = HashMap::new();
    for group in program.groups() {
        let g = program.group(group);
        if g.kind != GroupKind::File {
            index.entry(g.token.clone()).or_insert(group);
        }
    }
    index
}

/// Breadth-first ancestors of `group`, nearest first, each listed once.
fn ancestors(group: GroupId, direct: &HashMap<GroupId, Vec<GroupId>>) -> Vec<GroupId> {
    let mut seen = HashSet::from([group]);
    let mut queue: VecDeque<GroupId> = direct.get(&group).cloned().unwrap_or_default().into();
    let mut out = Vec::new();
    while let Some(next) = queue.pop_front() {
        if !seen.insert(next) {
            continue;
        }
        out.push(next);
        if let Some(bases) = direct.get(&next) {
            queue.extend(bases.iter().copied());
        }
    }
    out
}

/// Warn once per group whose token an earlier group already uses. Returns the
/// duplicated tokens in discovery order.
pub fn warn_duplicate_groups(program: &Program) -> Vec<String> {
    let mut first: HashMap<&str, GroupId> = HashMap::new();
    let mut duplicates = Vec::new();
    for group in program.groups() {
        let g = program.group(group);
        match first.get(g.token.as_str()) {
            Some(&earlier) => {
                warn!(
                    "duplicate {} name {} in {} and {}; lookups by name use the first",
                    g.kind.as_str().to_lowercase(),
                    g.token,
                    program.group(program.file_group_of(earlier)).token,
                    program.group(program.file_group_of(group)).token
                );
                duplicates.push(g.token.clone());
            }
            None => {
                first.insert(g.token.as_str(), group);
            }
        }
    }
    duplicates
}
