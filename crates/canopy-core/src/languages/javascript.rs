//! JavaScript language analyser.

use std::path::Path;

use tree_sitter::{Language, Node};

use super::{
    descendants, djoin, line, named_children, split_children, text, ClassInfo, FunctionInfo,
    LanguageAnalyser, Role, Split,
};
use crate::graph::{Call, PointsTo, Variable, UNKNOWN_VAR};

/// Token given to class constructors so they never collide with a method.
pub const CONSTRUCTOR_TOKEN: &str = "(constructor)";

pub struct JavaScriptAnalyser;

impl Default for JavaScriptAnalyser {
    fn default() -> Self {
        Self
    }
}

impl JavaScriptAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn classify(node: Node) -> Role {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => Role::Function(node),
            // Object literal methods are not class members.
            "method_definition"
                if node.parent().map(|p| p.kind()) == Some("class_body") =>
            {
                Role::Function(node)
            }
            "class_declaration" => Role::Class(node),
            "comment" => Role::Ignore,
            _ => Role::Other,
        }
    }

    /// Dotted name of a call receiver. Receivers produced by a call are
    /// unknowable.
    fn resolve_owner(node: Node, source: &[u8]) -> String {
        match node.kind() {
            "this" => "this".to_string(),
            "identifier" => text(node, source),
            "member_expression" => {
                let owner = node
                    .child_by_field_name("object")
                    .map(|o| Self::resolve_owner(o, source))
                    .unwrap_or_else(|| UNKNOWN_VAR.to_string());
                match node.child_by_field_name("property") {
                    Some(prop) => djoin(&[&owner, &text(prop, source)]),
                    None => owner,
                }
            }
            "new_expression" => match node.child_by_field_name("constructor") {
                Some(ctor) if ctor.kind() == "identifier" => text(ctor, source),
                Some(ctor) if ctor.kind() == "member_expression" => Self::resolve_owner(ctor, source),
                _ => UNKNOWN_VAR.to_string(),
            },
            "parenthesized_expression" => named_children(node)
                .first()
                .map(|inner| Self::resolve_owner(*inner, source))
                .unwrap_or_else(|| UNKNOWN_VAR.to_string()),
            _ => UNKNOWN_VAR.to_string(),
        }
    }

    /// Call described by the callee of a call or `new` expression.
    fn call_from_callee(callee: Node, source: &[u8], line_number: usize) -> Option<Call> {
        match callee.kind() {
            "identifier" => Some(Call::bare(text(callee, source), line_number)),
            "member_expression" => {
                let token = text(callee.child_by_field_name("property")?, source);
                let owner = Self::resolve_owner(callee.child_by_field_name("object")?, source);
                Some(Call::attr(token, owner, line_number))
            }
            _ => None,
        }
    }

    fn call_from_expression(node: Node, source: &[u8]) -> Option<Call> {
        match node.kind() {
            "call_expression" => {
                Self::call_from_callee(node.child_by_field_name("function")?, source, line(node))
            }
            "new_expression" => Self::call_from_callee(
                node.child_by_field_name("constructor")?,
                source,
                line(node),
            )
            .map(Call::with_definite_constructor),
            _ => None,
        }
    }

    /// Contents of the first string argument, without quotes.
    fn string_argument(call: Node, source: &[u8]) -> Option<String> {
        let args = call.child_by_field_name("arguments")?;
        let first = named_children(args).into_iter().next()?;
        if first.kind() != "string" {
            return None;
        }
        let content = named_children(first)
            .into_iter()
            .filter(|c| c.kind() == "string_fragment")
            .map(|c| text(c, source))
            .collect::<String>();
        Some(content)
    }

    /// Variables bound by a single-declarator `const`/`let`/`var`.
    fn declaration_variables(decl: Node, source: &[u8], out: &mut Vec<Variable>) {
        let declarators: Vec<Node> = named_children(decl)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let [declarator] = declarators.as_slice() else {
            return;
        };
        let (Some(name), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            return;
        };
        let value = if value.kind() == "await_expression" {
            match named_children(value).into_iter().next() {
                Some(inner) => inner,
                None => return,
            }
        } else {
            value
        };
        let line_number = line(decl);

        if value.kind() == "call_expression" {
            let callee = value.child_by_field_name("function");
            match callee.map(|c| (c.kind(), c)) {
                Some(("identifier", c)) if text(c, source) == "require" => {
                    if let Some(module) = Self::string_argument(value, source) {
                        Self::require_variables(name, &module, source, line_number, out);
                    }
                    return;
                }
                Some(("import", _)) => {
                    if let (Some(args), "identifier") =
                        (value.child_by_field_name("arguments"), name.kind())
                    {
                        if let Some(raw) = named_children(args).into_iter().next() {
                            let path = djoin(&[&text(raw, source), &text(name, source)]);
                            out.push(Variable::new(
                                text(name, source),
                                PointsTo::ImportPath(path),
                                line_number,
                            ));
                        }
                    }
                    return;
                }
                _ => {}
            }
        }

        if name.kind() != "identifier" {
            return;
        }
        if let Some(call) = Self::call_from_expression(value, source) {
            out.push(Variable::new(
                text(name, source),
                PointsTo::PendingConstructor(call),
                line_number,
            ));
        }
    }

    /// `const x = require('m')` binds `x` to `m.x`; destructuring binds each
    /// local name to `m.<key>`.
    fn require_variables(
        name: Node,
        module: &str,
        source: &[u8],
        line_number: usize,
        out: &mut Vec<Variable>,
    ) {
        match name.kind() {
            "identifier" => {
                let token = text(name, source);
                out.push(Variable::new(
                    token.clone(),
                    PointsTo::ImportPath(djoin(&[module, &token])),
                    line_number,
                ));
            }
            "object_pattern" => {
                for prop in named_children(name) {
                    let (key, local) = match prop.kind() {
                        "shorthand_property_identifier_pattern" => {
                            let key = text(prop, source);
                            (key.clone(), key)
                        }
                        "pair_pattern" => {
                            let (Some(key), Some(value)) = (
                                prop.child_by_field_name("key"),
                                prop.child_by_field_name("value"),
                            ) else {
                                continue;
                            };
                            if value.kind() != "identifier" {
                                continue;
                            }
                            (text(key, source), text(value, source))
                        }
                        _ => continue,
                    };
                    out.push(Variable::new(
                        local,
                        PointsTo::ImportPath(djoin(&[module, &key])),
                        line_number,
                    ));
                }
            }
            _ => {}
        }
    }
}

impl LanguageAnalyser for JavaScriptAnalyser {
    fn name(&self) -> &str {
        "JavaScript"
    }

    fn extensions(&self) -> &[&str] {
        &["js", "mjs", "cjs"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn self_token(&self) -> &str {
        "this"
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
        let name = text(tree.child_by_field_name("name")?, source);
        let is_constructor =
            in_class && tree.kind() == "method_definition" && name == "constructor";
        let token = if is_constructor {
            CONSTRUCTOR_TOKEN.to_string()
        } else {
            name
        };
        Some(FunctionInfo {
            token,
            line_number: line(tree),
            body: tree.child_by_field_name("body")?,
            is_constructor,
        })
    }

    fn class_info<'t>(&self, tree: Node<'t>, source: &[u8]) -> Option<ClassInfo<'t>> {
        let inherits = named_children(tree)
            .into_iter()
            .find(|c| c.kind() == "class_heritage")
            .and_then(|h| named_children(h).into_iter().next())
            .filter(|base| matches!(base.kind(), "identifier" | "member_expression"))
            .map(|base| vec![text(base, source)])
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
                let call = match node.kind() {
                    "call_expression" => node
                        .child_by_field_name("function")
                        .and_then(|f| Self::call_from_callee(f, source, line(node))),
                    // Only `new Foo()`; `new a.Foo()` is picked up through the
                    // variable it is assigned to.
                    "new_expression" => node
                        .child_by_field_name("constructor")
                        .filter(|c| c.kind() == "identifier")
                        .map(|c| Call::bare(text(c, source), line(node)).with_definite_constructor()),
                    _ => None,
                };
                calls.extend(call);
            }
        }
        calls
    }

    fn make_variables(&self, trees: &[Node], source: &[u8]) -> Vec<Variable> {
        let mut variables = Vec::new();
        for tree in trees {
            for node in descendants(*tree) {
                if matches!(node.kind(), "lexical_declaration" | "variable_declaration") {
                    Self::declaration_variables(node, source, &mut variables);
                }
            }
        }
        variables
    }

    /// JavaScript modules are bound through `require`/`import()` paths only.
    fn file_import_tokens(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }
}
