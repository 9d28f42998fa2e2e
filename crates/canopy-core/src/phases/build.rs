//! Phase 3: Build one file group per parsed file.
//!
//! Classes become nested groups, functions become nodes of the group they are
//! defined in (functions nested in functions are flattened into the same
//! group), and the statements left over at each level become the group's
//! synthetic root node.

use log::{debug, warn};
use tree_sitter::Node as SyntaxNode;

use crate::graph::{Group, GroupId, GroupKind, Node, NodeId, Program, Variable, ROOT_NODE_TOKEN};
use crate::languages::{Language, LanguageAnalyser};
use crate::phases::parsing::ParsedFile;

/// Run the build phase. Returns the new file groups in input order.
pub fn run_build_phase(
    language: Language,
    files: &[ParsedFile],
    program: &mut Program,
) -> Vec<GroupId> {
    files
        .iter()
        .map(|file| build_file_group(&language, file, program))
        .collect()
}

pub fn build_file_group(
    lang: &dyn LanguageAnalyser,
    file: &ParsedFile,
    program: &mut Program,
) -> GroupId {
    let token = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.path.display().to_string());
    let group = Group::new(token, GroupKind::File, 0)
        .with_import_tokens(lang.file_import_tokens(&file.path));
    let id = program.add_file_group(group);

    let split = lang.split(file.tree.root_node());
    for tree in &split.functions {
        build_node(lang, *tree, &file.source, id, program);
    }
    build_root_node(lang, &split.body, &file.source, id, program);
    for tree in &split.groups {
        build_class_group(lang, *tree, &file.source, id, program);
    }
    debug!(
        "built {}: {} group(s), {} node(s)",
        file.path.display(),
        program.all_groups(id).len(),
        program.all_nodes(id).len()
    );
    id
}

/// Build the node for one function tree, plus one sibling node for every
/// function nested inside it.
pub fn build_node(
    lang: &dyn LanguageAnalyser,
    tree: SyntaxNode,
    source: &[u8],
    parent: GroupId,
    program: &mut Program,
) -> Vec<NodeId> {
    let in_class = program.group(parent).kind == GroupKind::Class;
    let Some(info) = lang.function_info(tree, source, in_class) else {
        debug!("skipping unnamed {} at line {}", tree.kind(), tree.start_position().row + 1);
        return Vec::new();
    };

    let split = lang.split(info.body);
    for class_tree in &split.groups {
        let file = program.group(program.file_group_of(parent)).token.clone();
        warn!(
            "skipping class on line {} of {file}: classes defined inside {}() are not analysed",
            class_tree.start_position().row + 1,
            info.token
        );
    }

    let calls = lang.make_calls(&split.body, source);
    let mut variables = lang.make_variables(&split.body, source);
    if in_class {
        variables.push(Variable::group(
            lang.self_token(),
            parent,
            info.line_number,
        ));
    }
    let import_tokens = lang.member_import_tokens(program.group(parent), &info.token);
    let node = Node::new(info.token, info.line_number, calls, variables, parent)
        .with_import_tokens(import_tokens)
        .constructor(info.is_constructor);
    let mut ids = vec![program.add_node(node)];

    for nested in &split.functions {
        ids.extend(build_node(lang, *nested, source, parent, program));
    }
    ids
}

/// Build a class group and everything defined in its body.
pub fn build_class_group(
    lang: &dyn LanguageAnalyser,
    tree: SyntaxNode,
    source: &[u8],
    parent: GroupId,
    program: &mut Program,
) -> Option<GroupId> {
    let info = lang.class_info(tree, source)?;
    let import_tokens = lang.member_import_tokens(program.group(parent), &info.token);
    let group = Group::new(info.token, info.kind, info.line_number)
        .with_display_kind(info.display_kind)
        .with_import_tokens(import_tokens)
        .with_inherits(info.inherits);
    let id = program.add_subgroup(parent, group);

    let split = lang.split(info.body);
    let mut members = Vec::new();
    for tree in &split.functions {
        members.extend(build_node(lang, *tree, source, id, program));
    }
    if info.kind == GroupKind::Class && lang.members_share_scope() {
        bind_siblings(&members, program);
    }
    // Namespaces always get a root node since their scope is exposed through
    // it. Class bodies only get one when they actually do something.
    if info.kind == GroupKind::Namespace
        || !lang.make_calls(&split.body, source).is_empty()
        || !lang.make_variables(&split.body, source).is_empty()
    {
        build_root_node(lang, &split.body, source, id, program);
    }
    for tree in &split.groups {
        build_class_group(lang, *tree, source, id, program);
    }
    Some(id)
}

/// The synthetic node capturing statements that run outside any function.
pub fn build_root_node(
    lang: &dyn LanguageAnalyser,
    body: &[SyntaxNode],
    source: &[u8],
    parent: GroupId,
    program: &mut Program,
) -> NodeId {
    let calls = lang.make_calls(body, source);
    let variables = lang.make_variables(body, source);
    let line_number = program.group(parent).line_number;
    program.add_root_node(Node::new(
        ROOT_NODE_TOKEN,
        line_number,
        calls,
        variables,
        parent,
    ))
}

/// Give every member a line-0 binding to each member of the same class,
/// itself included.
fn bind_siblings(members: &[NodeId], program: &mut Program) {
    let bindings: Vec<Variable> = members
        .iter()
        .map(|&n| Variable::node(program.node(n).token.clone(), n, 0))
        .collect();
    for &member in members {
        program.node_mut(member).variables.extend(bindings.iter().cloned());
    }
}
