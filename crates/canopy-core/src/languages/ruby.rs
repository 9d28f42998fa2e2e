//! Ruby language analyser.
//!
//! Classes become class groups and modules become namespace groups. Methods
//! reach their siblings without a receiver, so every class member is bound
//! to every member of the same class.

use std::path::Path;

use tree_sitter::{Language, Node};

use super::{
    descendants, line, named_children, split_children, text, ClassInfo, FunctionInfo,
    LanguageAnalyser, Role, Split,
};
use crate::graph::{Call, GroupKind, PointsTo, Variable, UNKNOWN_VAR};

/// Node kinds whose children are whole statements. A lone identifier there
/// is a method called without arguments.
const STATEMENT_CONTAINERS: &[&str] = &[
    "program",
    "body_statement",
    "then",
    "else",
    "do",
    "begin",
    "ensure",
    "block_body",
    "parenthesized_statements",
    "interpolation",
];

pub struct RubyAnalyser;

impl Default for RubyAnalyser {
    fn default() -> Self {
        Self
    }
}

impl RubyAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn classify(node: Node) -> Role {
        match node.kind() {
            "method" | "singleton_method" => Role::Function(node),
            "class" | "module" => Role::Class(node),
            "comment" => Role::Ignore,
            _ => Role::Other,
        }
    }

    /// Last segment of a constant path: `Billing::Invoice` is `Invoice`.
    fn constant_name(node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "constant" => Some(text(node, source)),
            "scope_resolution" => node.child_by_field_name("name").map(|n| text(n, source)),
            _ => None,
        }
    }

    fn resolve_owner(node: Node, source: &[u8]) -> String {
        match node.kind() {
            "identifier" | "instance_variable" => text(node, source),
            "self" => "self".to_string(),
            _ => Self::constant_name(node, source).unwrap_or_else(|| UNKNOWN_VAR.to_string()),
        }
    }

    fn call_from_node(node: Node, source: &[u8]) -> Option<Call> {
        match node.kind() {
            "call" => {
                let token = text(node.child_by_field_name("method")?, source);
                let line_number = line(node);
                match node.child_by_field_name("receiver") {
                    None => Some(Call::bare(token, line_number)),
                    // `Foo.new` constructs a Foo.
                    Some(receiver) if token == "new" => {
                        let class = Self::constant_name(receiver, source)?;
                        Some(Call::bare(class, line_number).with_definite_constructor())
                    }
                    Some(receiver) => Some(Call::attr(
                        token,
                        Self::resolve_owner(receiver, source),
                        line_number,
                    )),
                }
            }
            "identifier"
                if node
                    .parent()
                    .is_some_and(|p| STATEMENT_CONTAINERS.contains(&p.kind())) =>
            {
                Some(Call::bare(text(node, source), line(node)))
            }
            _ => None,
        }
    }

    /// Modules named by `include X` statements directly in a class body.
    fn mixins(body: Node, source: &[u8]) -> Vec<String> {
        named_children(body)
            .into_iter()
            .filter(|c| c.kind() == "call" && c.child_by_field_name("receiver").is_none())
            .filter(|c| {
                c.child_by_field_name("method")
                    .is_some_and(|m| text(m, source) == "include")
            })
            .filter_map(|c| c.child_by_field_name("arguments"))
            .flat_map(named_children)
            .filter_map(|arg| Self::constant_name(arg, source))
            .collect()
    }
}

impl LanguageAnalyser for RubyAnalyser {
    fn name(&self) -> &str {
        "Ruby"
    }

    fn extensions(&self) -> &[&str] {
        &["rb"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_ruby::LANGUAGE.into()
    }

    fn self_token(&self) -> &str {
        "self"
    }

    fn split<'t>(&self, tree: Node<'t>) -> Split<'t> {
        split_children(tree, &Self::classify)
    }

    fn function_info<'t>(
        &self,
        tree: Node<'t>,
        source: &[u8],
        in_class: bool,
    ) -> Option<FunctionInfo<'t>> {
        let token = text(tree.child_by_field_name("name")?, source);
        let is_constructor = in_class && tree.kind() == "method" && token == "initialize";
        Some(FunctionInfo {
            token,
            line_number: line(tree),
            // Empty methods have no body node.
            body: tree.child_by_field_name("body").unwrap_or(tree),
            is_constructor,
        })
    }

    fn class_info<'t>(&self, tree: Node<'t>, source: &[u8]) -> Option<ClassInfo<'t>> {
        let token = Self::constant_name(tree.child_by_field_name("name")?, source)?;
        let body = tree.child_by_field_name("body").unwrap_or(tree);
        let mut inherits = Vec::new();
        if let Some(base) = tree
            .child_by_field_name("superclass")
            .and_then(|s| named_children(s).into_iter().next())
            .and_then(|base| Self::constant_name(base, source))
        {
            inherits.push(base);
        }
        // A reopened module extends the first declaration of the same name.
        if tree.kind() == "module" {
            inherits.push(token.clone());
        }
        inherits.extend(Self::mixins(body, source));

        let info = ClassInfo::class(token, line(tree), inherits, body);
        Some(match tree.kind() {
            "module" => info.with_kind(GroupKind::Namespace, "Module"),
            _ => info,
        })
    }

    fn make_calls(&self, trees: &[Node], source: &[u8]) -> Vec<Call> {
        trees
            .iter()
            .flat_map(|tree| descendants(*tree))
            .filter_map(|node| Self::call_from_node(node, source))
            .collect()
    }

    fn make_variables(&self, trees: &[Node], source: &[u8]) -> Vec<Variable> {
        let mut variables = Vec::new();
        for node in trees.iter().flat_map(|tree| descendants(*tree)) {
            if node.kind() != "assignment" {
                continue;
            }
            let (Some(left), Some(right)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) else {
                continue;
            };
            if left.kind() != "identifier" || right.kind() != "call" {
                continue;
            }
            if let Some(call) = Self::call_from_node(right, source) {
                variables.push(Variable::new(
                    text(left, source),
                    PointsTo::PendingConstructor(call),
                    line(node),
                ));
            }
        }
        variables
    }

    /// Ruby files are pulled in with `require`, which binds no names.
    fn file_import_tokens(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }

    fn members_share_scope(&self) -> bool {
        true
    }
}
