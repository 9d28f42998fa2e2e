//! Python language analyser.

use std::path::{Component, Path};

use tree_sitter::{Language, Node};

use super::{
    descendants, djoin, line, named_children, split_children, text, ClassInfo, FunctionInfo,
    LanguageAnalyser, Role, Split,
};
use crate::graph::{Call, PointsTo, Variable, UNKNOWN_VAR};

pub struct PythonAnalyser;

impl Default for PythonAnalyser {
    fn default() -> Self {
        Self
    }
}

impl PythonAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn classify(node: Node) -> Role {
        match node.kind() {
            "function_definition" => Role::Function(node),
            "class_definition" => Role::Class(node),
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => Role::Function(def),
                Some(def) if def.kind() == "class_definition" => Role::Class(def),
                _ => Role::Other,
            },
            "comment" => Role::Ignore,
            _ => Role::Other,
        }
    }

    /// Call described by the `function` child of a `call` node.
    fn call_from_function(func: Node, source: &[u8], line_number: usize) -> Option<Call> {
        match func.kind() {
            "identifier" => Some(Call::bare(text(func, source), line_number)),
            "attribute" => {
                let token = text(func.child_by_field_name("attribute")?, source);
                let owner = func
                    .child_by_field_name("object")
                    .and_then(|obj| Self::owner_chain(obj, source))
                    .unwrap_or_else(|| UNKNOWN_VAR.to_string());
                Some(Call::attr(token, owner, line_number))
            }
            _ => None,
        }
    }

    /// Dotted name of a call receiver: `self.svc` for `self.svc.run()`.
    /// Subscripts are looked through; anything else ends the chain.
    fn owner_chain(mut node: Node, source: &[u8]) -> Option<String> {
        let mut parts = Vec::new();
        loop {
            match node.kind() {
                "identifier" => {
                    parts.push(text(node, source));
                    break;
                }
                "attribute" => {
                    if let Some(attr) = node.child_by_field_name("attribute") {
                        parts.push(text(attr, source));
                    }
                    match node.child_by_field_name("object") {
                        Some(obj) => node = obj,
                        None => break,
                    }
                }
                "subscript" => match node.child_by_field_name("value") {
                    Some(value) => node = value,
                    None => break,
                },
                _ => break,
            }
        }
        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("."))
    }

    fn assignment_variable(node: Node, source: &[u8]) -> Option<Variable> {
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        if left.kind() != "identifier" || right.kind() != "call" {
            return None;
        }
        let call = Self::call_from_function(
            right.child_by_field_name("function")?,
            source,
            line(right),
        )?;
        Some(Variable::new(
            text(left, source),
            PointsTo::PendingConstructor(call),
            line(node),
        ))
    }

    /// `(bound name, imported path)` of one `name` entry of an import.
    fn import_name(node: Node, source: &[u8]) -> Option<(String, String)> {
        match node.kind() {
            "dotted_name" => {
                let name = text(node, source);
                Some((name.clone(), name))
            }
            "aliased_import" => {
                let name = text(node.child_by_field_name("name")?, source);
                let alias = text(node.child_by_field_name("alias")?, source);
                Some((alias, name))
            }
            _ => None,
        }
    }

    fn import_variables(node: Node, source: &[u8], out: &mut Vec<Variable>) {
        let module = if node.kind() == "import_from_statement" {
            node.child_by_field_name("module_name")
                .map(|m| text(m, source).trim_start_matches('.').to_string())
                .filter(|m| !m.is_empty())
        } else {
            None
        };
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let Some((token, path)) = Self::import_name(name, source) else {
                continue;
            };
            let path = match &module {
                Some(module) => djoin(&[module, &path]),
                None => path,
            };
            out.push(Variable::new(token, PointsTo::ImportPath(path), line(node)));
        }
    }
}

impl LanguageAnalyser for PythonAnalyser {
    fn name(&self) -> &str {
        "Python"
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
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
        let is_constructor = in_class && (token == "__init__" || token == "__new__");
        Some(FunctionInfo {
            token,
            line_number: line(tree),
            body: tree.child_by_field_name("body")?,
            is_constructor,
        })
    }

    fn class_info<'t>(&self, tree: Node<'t>, source: &[u8]) -> Option<ClassInfo<'t>> {
        let inherits = tree
            .child_by_field_name("superclasses")
            .map(|args| {
                named_children(args)
                    .into_iter()
                    .filter(|a| a.kind() == "identifier")
                    .map(|a| text(a, source))
                    .collect()
            })
            .unwrap_or_default();
        Some(ClassInfo::class(
            text(tree.child_by_field_name("name")?, source),
            line(tree),
            inherits,
            tree.child_by_field_name("body")?,
        ))
    }

    fn make_calls(&self, trees: &[Node], source: &[u8]) -> Vec<Call> {
        let mut calls = Vec::new();
        for tree in trees {
            for node in descendants(*tree) {
                if node.kind() != "call" {
                    continue;
                }
                if let Some(call) = node
                    .child_by_field_name("function")
                    .and_then(|f| Self::call_from_function(f, source, line(node)))
                {
                    calls.push(call);
                }
            }
        }
        calls
    }

    fn make_variables(&self, trees: &[Node], source: &[u8]) -> Vec<Variable> {
        let mut variables = Vec::new();
        for tree in trees {
            for node in descendants(*tree) {
                match node.kind() {
                    "assignment" => variables.extend(Self::assignment_variable(node, source)),
                    "import_statement" | "import_from_statement" => {
                        Self::import_variables(node, source, &mut variables)
                    }
                    _ => {}
                }
            }
        }
        variables
    }

    /// `pkg/sub/mod.py` is importable as `mod`, `sub.mod` and `pkg.sub.mod`;
    /// a package `__init__.py` additionally as the package path itself.
    fn file_import_tokens(&self, path: &Path) -> Vec<String> {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            return Vec::new();
        };
        let dirs: Vec<String> = path
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut chain = dirs.clone();
        chain.push(stem.clone());
        let mut tokens: Vec<String> = (0..chain.len())
            .rev()
            .map(|i| chain[i..].join("."))
            .collect();
        if stem == "__init__" {
            tokens.extend((0..dirs.len()).rev().map(|i| dirs[i..].join(".")));
        }
        tokens
    }
}
