//! Phase 6: Resolve variable placeholders to concrete entities.

use std::collections::HashMap;

use log::debug;

use crate::graph::{EntityRef, PointsTo, Program};

/// Counts of how each placeholder ended up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    pub imports_resolved: usize,
    pub imports_external: usize,
    pub constructors_resolved: usize,
}

/// Run the resolve phase over every reachable node.
///
/// Import paths resolve to the first entity (per file: nodes, then groups)
/// answering to that import token, or to `UnknownExternal`. Constructor calls
/// resolve to the first class with that name; attribute-form calls are only
/// considered when they are definitely constructors. Resolved bindings are
/// never touched, so running the phase twice changes nothing.
pub fn run_resolve_phase(program: &mut Program) -> ResolveStats {
    let imports = import_index(program);
    let classes = program.classes_by_token();
    let mut stats = ResolveStats::default();

    for node in program.nodes() {
        for variable in &mut program.node_mut(node).variables {
            let resolved = match &variable.points_to {
                PointsTo::ImportPath(path) => match imports.get(path) {
                    Some(&entity) => {
                        stats.imports_resolved += 1;
                        PointsTo::Resolved(entity)
                    }
                    None => {
                        stats.imports_external += 1;
                        PointsTo::UnknownExternal
                    }
                },
                PointsTo::PendingConstructor(call) => {
                    if call.is_attr() && !call.definite_constructor {
                        continue;
                    }
                    match classes.get(&call.token) {
                        Some(&class) => {
                            stats.constructors_resolved += 1;
                            PointsTo::Resolved(EntityRef::Group(class))
                        }
                        None => continue,
                    }
                }
                PointsTo::Resolved(_) | PointsTo::UnknownExternal => continue,
            };
            variable.points_to = resolved;
        }
    }

    debug!(
        "resolved {} import(s) ({} external) and {} constructor binding(s)",
        stats.imports_resolved, stats.imports_external, stats.constructors_resolved
    );
    stats
}

/// Import token -> entity, first registration wins.
fn import_index(program: &Program) -> HashMap<String, EntityRef> {
    let mut index = HashMap::new();
    for &file in program.files() {
        for node in program.all_nodes(file) {
            for token in &program.node(node).import_tokens {
                index.entry(token.clone()).or_insert(EntityRef::Node(node));
            }
        }
        for group in program.all_groups(file) {
            for token in &program.group(group).import_tokens {
                index.entry(token.clone()).or_insert(EntityRef::Group(group));
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Call, Group, GroupKind, Node, Variable};

    #[test]
    fn placeholders_resolve_once() {
        let mut p = Program::new();
        let lib = p.add_file_group(
            Group::new("lib", GroupKind::File, 0).with_import_tokens(vec!["lib".into()]),
        );
        let helper = p.add_node(
            Node::new("helper", 1, vec![], vec![], lib).with_import_tokens(vec!["lib.helper".into()]),
        );
        let widget = p.add_subgroup(lib, Group::new("Widget", GroupKind::Class, 5));
        let app = p.add_file_group(Group::new("app", GroupKind::File, 0));
        let main = p.add_node(Node::new(
            "main",
            1,
            vec![],
            vec![
                Variable::new("helper", PointsTo::ImportPath("lib.helper".into()), 1),
                Variable::new("lib", PointsTo::ImportPath("lib".into()), 1),
                Variable::new("requests", PointsTo::ImportPath("requests".into()), 1),
                Variable::new("w", PointsTo::PendingConstructor(Call::bare("Widget", 3)), 3),
                Variable::new("v", PointsTo::PendingConstructor(Call::attr("Widget", "ui", 4)), 4),
                Variable::new(
                    "d",
                    PointsTo::PendingConstructor(Call::attr("Widget", "ui", 5).with_definite_constructor()),
                    5,
                ),
            ],
            app,
        ));

        let stats = run_resolve_phase(&mut p);
        assert_eq!(
            stats,
            ResolveStats {
                imports_resolved: 2,
                imports_external: 1,
                constructors_resolved: 2,
            }
        );
        let points: Vec<_> = p.node(main).variables.iter().map(|v| v.points_to.clone()).collect();
        assert_eq!(points[0], PointsTo::Resolved(EntityRef::Node(helper)));
        assert_eq!(points[1], PointsTo::Resolved(EntityRef::Group(lib)));
        assert_eq!(points[2], PointsTo::UnknownExternal);
        assert_eq!(points[3], PointsTo::Resolved(EntityRef::Group(widget)));
        assert!(matches!(points[4], PointsTo::PendingConstructor(_)));
        assert_eq!(points[5], PointsTo::Resolved(EntityRef::Group(widget)));

        let before = p.node(main).variables.clone();
        assert_eq!(run_resolve_phase(&mut p), ResolveStats::default());
        assert_eq!(p.node(main).variables, before);
    }
}
