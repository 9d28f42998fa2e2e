//! PHP language analyser.
//!
//! Namespaces become namespace groups; classes, traits and enums become class
//! groups. Definitions are imported by their namespace-qualified name, with
//! `\` written as `.`, so `use App\Models\User;` binds `User` to whatever
//! `App\Models` declares as `User`.

use std::path::Path;

use tree_sitter::{Language, Node};

use super::{
    descendants, djoin, line, named_children, split_children, split_nodes, text, ClassInfo,
    FunctionInfo, LanguageAnalyser, Role, Split,
};
use crate::graph::{Call, Group, GroupKind, PointsTo, Variable, UNKNOWN_VAR};

pub const CONSTRUCTOR_NAME: &str = "__construct";

pub struct PhpAnalyser;

impl Default for PhpAnalyser {
    fn default() -> Self {
        Self
    }
}

impl PhpAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn classify(node: Node) -> Role {
        match node.kind() {
            "function_definition" | "method_declaration" => Role::Function(node),
            "class_declaration" | "trait_declaration" | "enum_declaration" => Role::Class(node),
            // `namespace { ... }` is the global namespace: its contents stay
            // in the file.
            "namespace_definition" if node.child_by_field_name("name").is_some() => {
                Role::Class(node)
            }
            "interface_declaration" | "comment" | "php_tag" | "text" | "text_interpolation" => {
                Role::Ignore
            }
            _ => Role::Other,
        }
    }

    /// File-level classification: statements following `namespace X;`
    /// belong to that namespace, not to the file.
    fn classify_top_level(node: Node) -> Role {
        if node.kind() != "namespace_definition" && Self::in_open_namespace(node) {
            return Role::Ignore;
        }
        Self::classify(node)
    }

    fn in_open_namespace(node: Node) -> bool {
        let mut prev = node.prev_named_sibling();
        while let Some(sibling) = prev {
            if sibling.kind() == "namespace_definition" {
                return sibling.child_by_field_name("body").is_none();
            }
            prev = sibling.prev_named_sibling();
        }
        false
    }

    /// Statements between `namespace X;` and the next namespace declaration.
    fn open_namespace_members(namespace: Node) -> Vec<Node> {
        let mut members = Vec::new();
        let mut next = namespace.next_named_sibling();
        while let Some(sibling) = next {
            if sibling.kind() == "namespace_definition" {
                break;
            }
            members.push(sibling);
            next = sibling.next_named_sibling();
        }
        members
    }

    /// `App\Models\User` as `App.Models.User`.
    fn dotted(node: Node, source: &[u8]) -> String {
        text(node, source).trim_start_matches('\\').replace('\\', ".")
    }

    fn last_segment(node: Node, source: &[u8]) -> String {
        let dotted = Self::dotted(node, source);
        match dotted.rsplit_once('.') {
            Some((_, last)) => last.to_string(),
            None => dotted,
        }
    }

    fn resolve_owner(node: Node, source: &[u8]) -> String {
        match node.kind() {
            "variable_name" => text(node, source).trim_start_matches('$').to_string(),
            "relative_scope" => match text(node, source).as_str() {
                "self" | "static" => "this".to_string(),
                other => other.to_string(),
            },
            "name" | "qualified_name" => Self::dotted(node, source),
            "member_access_expression" | "nullsafe_member_access_expression" => {
                let owner = node
                    .child_by_field_name("object")
                    .map(|o| Self::resolve_owner(o, source))
                    .unwrap_or_else(|| UNKNOWN_VAR.to_string());
                match node.child_by_field_name("name").filter(|n| n.kind() == "name") {
                    Some(name) => djoin(&[&owner, &text(name, source)]),
                    None => UNKNOWN_VAR.to_string(),
                }
            }
            "parenthesized_expression" => named_children(node)
                .first()
                .map(|inner| Self::resolve_owner(*inner, source))
                .unwrap_or_else(|| UNKNOWN_VAR.to_string()),
            _ => UNKNOWN_VAR.to_string(),
        }
    }

    fn call_from_node(node: Node, source: &[u8]) -> Option<Call> {
        let line_number = line(node);
        match node.kind() {
            "function_call_expression" => {
                let function = node.child_by_field_name("function")?;
                match function.kind() {
                    "name" => Some(Call::bare(text(function, source), line_number)),
                    "qualified_name" => {
                        let dotted = Self::dotted(function, source);
                        match dotted.rsplit_once('.') {
                            Some((owner, token)) => Some(Call::attr(token, owner, line_number)),
                            None => Some(Call::bare(dotted, line_number)),
                        }
                    }
                    _ => None,
                }
            }
            "member_call_expression" | "nullsafe_member_call_expression" => {
                let name = node.child_by_field_name("name").filter(|n| n.kind() == "name")?;
                let owner = Self::resolve_owner(node.child_by_field_name("object")?, source);
                Some(Call::attr(text(name, source), owner, line_number))
            }
            "scoped_call_expression" => {
                let name = node.child_by_field_name("name").filter(|n| n.kind() == "name")?;
                let owner = Self::resolve_owner(node.child_by_field_name("scope")?, source);
                Some(Call::attr(text(name, source), owner, line_number))
            }
            "object_creation_expression" => {
                let class = named_children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "name" | "qualified_name"))?;
                let token = Self::last_segment(class, source);
                Some(Call::bare(token, line_number).with_definite_constructor())
            }
            _ => None,
        }
    }

    /// Bindings made by one `use` declaration. Without an alias the last
    /// segment of the imported name is bound.
    fn use_variables(decl: Node, source: &[u8], out: &mut Vec<Variable>) {
        // `use App\{A, B as C};`
        let prefix = named_children(decl)
            .into_iter()
            .find(|c| c.kind() == "namespace_name")
            .map(|p| Self::dotted(p, source));
        for clause in descendants(decl) {
            if !matches!(clause.kind(), "namespace_use_clause" | "namespace_use_group_clause") {
                continue;
            }
            let Some(path) = named_children(clause)
                .into_iter()
                .find(|c| matches!(c.kind(), "name" | "qualified_name" | "namespace_name"))
            else {
                continue;
            };
            let alias = clause.child_by_field_name("alias").or_else(|| {
                named_children(clause)
                    .into_iter()
                    .find(|c| c.kind() == "namespace_aliasing_clause")
                    .and_then(|a| named_children(a).into_iter().find(|n| n.kind() == "name"))
            });
            let full = match &prefix {
                Some(prefix) => djoin(&[prefix, &Self::dotted(path, source)]),
                None => Self::dotted(path, source),
            };
            let token = match alias {
                Some(alias) if alias != path => text(alias, source),
                _ => Self::last_segment(path, source),
            };
            out.push(Variable::new(token, PointsTo::ImportPath(full), line(decl)));
        }
    }

    /// Names after `extends` plus traits pulled in with `use`.
    fn inherits(tree: Node, body: Node, source: &[u8]) -> Vec<String> {
        let extends = named_children(tree)
            .into_iter()
            .filter(|c| c.kind() == "base_clause")
            .flat_map(named_children);
        let traits = named_children(body)
            .into_iter()
            .filter(|c| c.kind() == "use_declaration")
            .flat_map(named_children);
        extends
            .chain(traits)
            .filter(|n| matches!(n.kind(), "name" | "qualified_name"))
            .map(|n| Self::dotted(n, source))
            .collect()
    }
}

impl LanguageAnalyser for PhpAnalyser {
    fn name(&self) -> &str {
        "PHP"
    }

    fn extensions(&self) -> &[&str] {
        &["php"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_php::LANGUAGE_PHP.into()
    }

    fn self_token(&self) -> &str {
        "this"
    }

    fn split<'t>(&self, tree: Node<'t>) -> Split<'t> {
        match tree.kind() {
            "program" => split_children(tree, &Self::classify_top_level),
            "namespace_definition" => {
                split_nodes(Self::open_namespace_members(tree), &Self::classify)
            }
            _ => split_children(tree, &Self::classify),
        }
    }

    fn function_info<'t>(
        &self,
        tree: Node<'t>,
        source: &[u8],
        in_class: bool,
    ) -> Option<FunctionInfo<'t>> {
        let token = text(tree.child_by_field_name("name")?, source);
        let is_constructor = in_class && token.eq_ignore_ascii_case(CONSTRUCTOR_NAME);
        Some(FunctionInfo {
            token,
            line_number: line(tree),
            // Abstract methods have no body and are skipped.
            body: tree.child_by_field_name("body")?,
            is_constructor,
        })
    }

    fn class_info<'t>(&self, tree: Node<'t>, source: &[u8]) -> Option<ClassInfo<'t>> {
        let name = tree.child_by_field_name("name")?;
        if tree.kind() == "namespace_definition" {
            // `namespace X;` owns the statements that follow it.
            let body = tree.child_by_field_name("body").unwrap_or(tree);
            return Some(
                ClassInfo::class(Self::dotted(name, source), line(tree), Vec::new(), body)
                    .with_kind(GroupKind::Namespace, "Namespace"),
            );
        }
        let body = tree.child_by_field_name("body")?;
        let info = ClassInfo::class(
            text(name, source),
            line(tree),
            Self::inherits(tree, body, source),
            body,
        );
        Some(match tree.kind() {
            "trait_declaration" => info.with_kind(GroupKind::Class, "Trait"),
            "enum_declaration" => info.with_kind(GroupKind::Class, "Enum"),
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
            match node.kind() {
                "namespace_use_declaration" => Self::use_variables(node, source, &mut variables),
                "assignment_expression" => {
                    let (Some(left), Some(right)) = (
                        node.child_by_field_name("left"),
                        node.child_by_field_name("right"),
                    ) else {
                        continue;
                    };
                    if left.kind() != "variable_name" {
                        continue;
                    }
                    if let Some(call) = Self::call_from_node(right, source) {
                        variables.push(Variable::new(
                            text(left, source).trim_start_matches('$'),
                            PointsTo::PendingConstructor(call),
                            line(node),
                        ));
                    }
                }
                _ => {}
            }
        }
        variables
    }

    /// PHP files are included by path, which binds no names.
    fn file_import_tokens(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }

    /// Top-level definitions import by their own name; anything inside a
    /// namespace or class by `<parent>.<name>`.
    fn member_import_tokens(&self, parent: &Group, token: &str) -> Vec<String> {
        match parent.kind {
            GroupKind::File => vec![token.to_string()],
            GroupKind::Class | GroupKind::Namespace => vec![djoin(&[&parent.token, token])],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        PhpAnalyser
            .parse(Path::new("t.php"), source.as_bytes())
            .unwrap()
    }

    #[test]
    fn statements_after_namespace_declaration_belong_to_it() {
        let src = "<?php\nnamespace App\\Models;\n\nclass User {\n    public function __construct() {}\n}\n\nfunction helper() {}\n";
        let tree = parse(src);
        let split = PhpAnalyser.split(tree.root_node());
        assert_eq!(split.groups.len(), 1);
        assert!(split.functions.is_empty());
        assert!(split.body.is_empty());

        let ns = PhpAnalyser.class_info(split.groups[0], src.as_bytes()).unwrap();
        assert_eq!(ns.token, "App.Models");
        assert_eq!(ns.kind, GroupKind::Namespace);
        let members = PhpAnalyser.split(ns.body);
        assert_eq!(members.groups.len(), 1);
        assert_eq!(members.functions.len(), 1);

        let user = PhpAnalyser.class_info(members.groups[0], src.as_bytes()).unwrap();
        let methods = PhpAnalyser.split(user.body);
        let ctor = PhpAnalyser
            .function_info(methods.functions[0], src.as_bytes(), true)
            .unwrap();
        assert!(ctor.is_constructor);
    }

    #[test]
    fn braced_namespaces_keep_their_own_members() {
        let src = "<?php\nnamespace Billing {\n    function charge() {}\n}\nnamespace Shipping {\n    function ship() {}\n}\n";
        let tree = parse(src);
        let split = PhpAnalyser.split(tree.root_node());
        let tokens: Vec<String> = split
            .groups
            .iter()
            .map(|g| PhpAnalyser.class_info(*g, src.as_bytes()).unwrap().token)
            .collect();
        assert_eq!(tokens, vec!["Billing", "Shipping"]);
    }

    #[test]
    fn class_inherits_base_and_traits() {
        let src = "<?php\ntrait Greets {}\nclass Admin extends \\App\\User {\n    use Greets, Logs;\n}\n";
        let tree = parse(src);
        let split = PhpAnalyser.split(tree.root_node());
        let greets = PhpAnalyser.class_info(split.groups[0], src.as_bytes()).unwrap();
        assert_eq!(greets.display_kind, "Trait");
        let admin = PhpAnalyser.class_info(split.groups[1], src.as_bytes()).unwrap();
        assert_eq!(admin.inherits, vec!["App.User", "Greets", "Logs"]);
    }

    #[test]
    fn calls_and_owners() {
        let src = "<?php\n$this->repo->save();\nself::boot();\nModels\\User::find(1);\n$u = new User();\nhelper();\n";
        let tree = parse(src);
        let calls = PhpAnalyser.make_calls(&[tree.root_node()], src.as_bytes());
        let rendered: Vec<String> = calls.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["this.repo.save()", "this.boot()", "Models.User.find()", "User()", "helper()"]
        );
        assert!(calls[3].definite_constructor);
    }

    #[test]
    fn use_statements_and_assignments_bind_names() {
        let src = "<?php\nuse App\\Models;\nuse App\\Services\\Mailer as Mail;\n$svc = new Service();\n$n = 3;\n";
        let tree = parse(src);
        let vars = PhpAnalyser.make_variables(&[tree.root_node()], src.as_bytes());
        let tokens: Vec<&str> = vars.iter().map(|v| v.token.as_str()).collect();
        assert_eq!(tokens, vec!["Models", "Mail", "svc"]);
        assert_eq!(vars[0].points_to, PointsTo::ImportPath("App.Models".to_string()));
        assert_eq!(
            vars[1].points_to,
            PointsTo::ImportPath("App.Services.Mailer".to_string())
        );
    }

    #[test]
    fn namespace_members_import_by_qualified_name() {
        let ns = Group::new("App.Models", GroupKind::Namespace, 2);
        assert_eq!(
            PhpAnalyser.member_import_tokens(&ns, "User"),
            vec!["App.Models.User".to_string()]
        );
        let file = Group::new("index", GroupKind::File, 0);
        assert_eq!(PhpAnalyser.member_import_tokens(&file, "main"), vec!["main".to_string()]);
    }
}
