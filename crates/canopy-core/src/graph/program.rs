//! Arena owning every group and node of one analysis run.

use std::collections::HashMap;

use super::model::{Edge, EntityRef, Group, GroupId, GroupKind, Node, NodeId, PointsTo, Variable};

/// Owns all [`Group`]s and [`Node`]s and hands out dense indices.
///
/// Removing an entity only detaches it from its parent (or from the file list);
/// the slot stays in the arena but no traversal reaches it again.
#[derive(Debug, Clone, Default)]
pub struct Program {
    groups: Vec<Group>,
    nodes: Vec<Node>,
    files: Vec<GroupId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    /// Register a file-root group (one per source file).
    pub fn add_file_group(&mut self, mut group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        group.id = id;
        group.parent = None;
        self.groups.push(group);
        self.files.push(id);
        id
    }

    /// Register a class/namespace group owned by `parent`.
    pub fn add_subgroup(&mut self, parent: GroupId, mut group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        group.id = id;
        group.parent = Some(parent);
        self.groups.push(group);
        self.groups[parent.0].subgroups.push(id);
        id
    }

    /// Register a node with the group named by `node.parent`.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        let parent = node.parent;
        self.nodes.push(node);
        self.groups[parent.0].nodes.push(id);
        id
    }

    /// Register the synthetic top-level node of its parent group.
    pub fn add_root_node(&mut self, node: Node) -> NodeId {
        let parent = node.parent;
        let id = self.add_node(node);
        self.groups[parent.0].root_node = Some(id);
        id
    }

    // --- Access ---

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Live file-root groups, in input order.
    pub fn files(&self) -> &[GroupId] {
        &self.files
    }

    /// `id` and every group nested under it, pre-order.
    pub fn all_groups(&self, id: GroupId) -> Vec<GroupId> {
        let mut ret = vec![id];
        for &sub in &self.groups[id.0].subgroups {
            ret.extend(self.all_groups(sub));
        }
        ret
    }

    /// Nodes of `id` followed by the nodes of every nested group.
    pub fn all_nodes(&self, id: GroupId) -> Vec<NodeId> {
        let group = &self.groups[id.0];
        let mut ret = group.nodes.clone();
        for &sub in &group.subgroups {
            ret.extend(self.all_nodes(sub));
        }
        ret
    }

    /// Every reachable group across all files.
    pub fn groups(&self) -> Vec<GroupId> {
        self.files.iter().flat_map(|&f| self.all_groups(f)).collect()
    }

    /// Every reachable node across all files.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.files.iter().flat_map(|&f| self.all_nodes(f)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn group_count(&self) -> usize {
        self.groups().len()
    }

    pub fn file_group_of(&self, id: GroupId) -> GroupId {
        let mut current = id;
        while let Some(parent) = self.groups[current.0].parent {
            current = parent;
        }
        current
    }

    pub fn file_group_of_node(&self, id: NodeId) -> GroupId {
        self.file_group_of(self.nodes[id.0].parent)
    }

    /// First constructor member of a class group.
    pub fn constructor_of(&self, id: GroupId) -> Option<NodeId> {
        let group = &self.groups[id.0];
        if group.kind != GroupKind::Class {
            return None;
        }
        group
            .nodes
            .iter()
            .copied()
            .find(|&n| self.nodes[n.0].is_constructor)
    }

    /// First class group (in file order, pre-order) declaring each token.
    pub fn classes_by_token(&self) -> HashMap<String, GroupId> {
        let mut index = HashMap::new();
        for id in self.groups() {
            let group = &self.groups[id.0];
            if group.kind == GroupKind::Class {
                index.entry(group.token.clone()).or_insert(id);
            }
        }
        index
    }

    // --- Removal ---

    pub fn remove_node(&mut self, id: NodeId) {
        let parent = self.nodes[id.0].parent;
        self.groups[parent.0].nodes.retain(|&n| n != id);
    }

    pub fn remove_group(&mut self, id: GroupId) {
        match self.groups[id.0].parent {
            Some(parent) => self.groups[parent.0].subgroups.retain(|&g| g != id),
            None => self.files.retain(|&g| g != id),
        }
    }

    // --- Scoping ---

    /// Bindings a group exposes to the nodes nested inside it, most recent first.
    ///
    /// Files (and namespaces) expose their top-level variables plus every
    /// member function and subgroup by name. Classes expose only the variables
    /// of their body; members are reached through `self`/`this`.
    pub fn scope_variables(&self, id: GroupId) -> Vec<Variable> {
        let group = &self.groups[id.0];
        let Some(root) = group.root_node else {
            return Vec::new();
        };
        let mut variables = self.nodes[root.0].variables.clone();
        if group.kind != GroupKind::Class {
            for &sub in &group.subgroups {
                let sub = &self.groups[sub.0];
                variables.push(Variable::group(sub.token.clone(), sub.id, sub.line_number));
            }
            for &n in group.nodes.iter().filter(|&&n| n != root) {
                let node = &self.nodes[n.0];
                variables.push(Variable::node(node.token.clone(), node.id, node.line_number));
            }
        }
        variables.sort_by(|a, b| b.line_number.cmp(&a.line_number));
        variables
    }

    /// Variables visible to a call on `line` inside `id`: the node's own
    /// bindings up to that line (most recent first), then each enclosing
    /// group's scope, innermost first.
    pub fn visible_variables(&self, id: NodeId, line: usize) -> Vec<Variable> {
        let node = &self.nodes[id.0];
        let mut ret: Vec<Variable> = node
            .variables
            .iter()
            .filter(|v| v.line_number <= line)
            .cloned()
            .collect();
        ret.sort_by(|a, b| b.line_number.cmp(&a.line_number));

        let mut parent = Some(node.parent);
        while let Some(group) = parent {
            ret.extend(self.scope_variables(group));
            parent = self.groups[group.0].parent;
        }
        ret
    }

    // --- Linking ---

    /// Record that `caller` calls `callee`, updating leaf/trunk flags.
    pub fn link(&mut self, caller: NodeId, callee: NodeId) -> Edge {
        self.nodes[caller.0].is_leaf = false;
        self.nodes[callee.0].is_trunk = false;
        Edge { caller, callee }
    }

    // --- Naming ---

    /// `Class.method` for class members, the bare token otherwise.
    pub fn token_with_ownership(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        let parent = &self.groups[node.parent.0];
        match parent.kind {
            GroupKind::Class | GroupKind::Namespace => format!("{}.{}", parent.token, node.token),
            GroupKind::File => node.token.clone(),
        }
    }

    /// Fully-qualified name: `<file>::<class>.<function>`.
    pub fn node_name(&self, id: NodeId) -> String {
        let file = self.file_group_of_node(id);
        format!(
            "{}::{}",
            self.groups[file.0].token,
            self.token_with_ownership(id)
        )
    }

    /// `token->target` rendering used in debug logs.
    pub fn describe_variable(&self, variable: &Variable) -> String {
        let target = match &variable.points_to {
            PointsTo::ImportPath(path) => path.clone(),
            PointsTo::PendingConstructor(call) => call.to_string(),
            PointsTo::Resolved(EntityRef::Node(n)) => self.nodes[n.0].token.clone(),
            PointsTo::Resolved(EntityRef::Group(g)) => self.groups[g.0].token.clone(),
            PointsTo::UnknownExternal => "UNKNOWN_MODULE".to_string(),
        };
        format!("{}->{}", variable.token, target)
    }
}
