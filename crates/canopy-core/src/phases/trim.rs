//! Phase 8: Remove everything not connected to an edge.

use std::collections::HashSet;

use crate::graph::{Edge, NodeId, Program};

/// Run the trim phase. A single pass: drop nodes that are no edge's endpoint,
/// then groups left without nodes anywhere below them, then empty files.
pub fn run_trim_phase(program: &mut Program, edges: &[Edge]) {
    let endpoints: HashSet<NodeId> = edges
        .iter()
        .flat_map(|e| [e.caller, e.callee])
        .collect();

    for node in program.nodes() {
        if !endpoints.contains(&node) {
            program.remove_node(node);
        }
    }

    for file in program.files().to_vec() {
        for group in program.all_groups(file).into_iter().skip(1) {
            if program.all_nodes(group).is_empty() {
                program.remove_group(group);
            }
        }
        if program.all_nodes(file).is_empty() {
            program.remove_group(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Group, GroupKind, Node};

    #[test]
    fn keeps_only_edge_endpoints() {
        let mut p = Program::new();
        let a = p.add_file_group(Group::new("a", GroupKind::File, 0));
        let caller = p.add_node(Node::new("caller", 1, vec![], vec![], a));
        p.add_node(Node::new("unused", 5, vec![], vec![], a));
        let empty_class = p.add_subgroup(a, Group::new("Idle", GroupKind::Class, 8));
        p.add_node(Node::new("idle", 9, vec![], vec![], empty_class));
        let outer = p.add_subgroup(a, Group::new("Outer", GroupKind::Class, 12));
        let inner = p.add_subgroup(outer, Group::new("Inner", GroupKind::Class, 13));
        let callee = p.add_node(Node::new("callee", 14, vec![], vec![], inner));
        let b = p.add_file_group(Group::new("b", GroupKind::File, 0));
        p.add_node(Node::new("lonely", 1, vec![], vec![], b));

        let edges = vec![p.link(caller, callee)];
        run_trim_phase(&mut p, &edges);

        assert_eq!(p.nodes(), vec![caller, callee]);
        assert_eq!(p.groups(), vec![a, outer, inner]);
        assert_eq!(p.files(), &[a]);

        let snapshot = (p.nodes(), p.groups());
        run_trim_phase(&mut p, &edges);
        assert_eq!((p.nodes(), p.groups()), snapshot);
    }
}
