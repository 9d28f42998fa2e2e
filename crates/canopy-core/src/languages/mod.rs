//! Language analyser trait and the closed set of supported languages.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node as SyntaxNode, Parser, Tree};

use crate::error::{CanopyError, Result};
use crate::graph::{Call, Group, GroupKind, Variable};

pub mod javascript;
pub mod php;
pub mod python;
pub mod ruby;

pub use javascript::JavaScriptAnalyser;
pub use php::PhpAnalyser;
pub use python::PythonAnalyser;
pub use ruby::RubyAnalyser;

/// The three-way split of a syntax subtree.
#[derive(Debug, Default)]
pub struct Split<'t> {
    /// Class (or namespace) definitions.
    pub groups: Vec<SyntaxNode<'t>>,
    /// Function and method definitions.
    pub functions: Vec<SyntaxNode<'t>>,
    /// Every other statement, executed in the enclosing scope.
    pub body: Vec<SyntaxNode<'t>>,
}

impl<'t> Split<'t> {
    fn is_flat(&self) -> bool {
        self.groups.is_empty() && self.functions.is_empty()
    }

    fn extend(&mut self, other: Split<'t>) {
        self.groups.extend(other.groups);
        self.functions.extend(other.functions);
        self.body.extend(other.body);
    }
}

/// What the builder needs to know about a function definition.
#[derive(Debug)]
pub struct FunctionInfo<'t> {
    pub token: String,
    pub line_number: usize,
    pub body: SyntaxNode<'t>,
    pub is_constructor: bool,
}

/// What the builder needs to know about a class (or namespace) definition.
#[derive(Debug)]
pub struct ClassInfo<'t> {
    pub token: String,
    pub line_number: usize,
    pub inherits: Vec<String>,
    pub body: SyntaxNode<'t>,
    /// `Class` or `Namespace`.
    pub kind: GroupKind,
    /// Label shown for the group, e.g. "Trait" or "Module".
    pub display_kind: &'static str,
}

impl<'t> ClassInfo<'t> {
    /// A plain class definition.
    pub fn class(
        token: String,
        line_number: usize,
        inherits: Vec<String>,
        body: SyntaxNode<'t>,
    ) -> Self {
        Self {
            token,
            line_number,
            inherits,
            body,
            kind: GroupKind::Class,
            display_kind: "Class",
        }
    }

    pub fn with_kind(mut self, kind: GroupKind, display_kind: &'static str) -> Self {
        self.kind = kind;
        self.display_kind = display_kind;
        self
    }
}

/// Trait that every language analyser implements.
///
/// The resolution engine only relies on this contract; everything
/// syntax-specific stays behind it.
pub trait LanguageAnalyser {
    /// Human-readable language name (e.g. "Python").
    fn name(&self) -> &str;

    /// File extensions this analyser handles (e.g. &["py"]).
    fn extensions(&self) -> &[&str];

    /// The tree-sitter grammar.
    fn grammar(&self) -> tree_sitter::Language;

    /// Name bound to the enclosing instance inside class members.
    fn self_token(&self) -> &str;

    /// Fail fast if the grammar cannot be loaded.
    fn assert_dependencies(&self) -> Result<()> {
        Parser::new()
            .set_language(&self.grammar())
            .map(|_| ())
            .map_err(|e| CanopyError::Dependency {
                language: self.name().to_string(),
                reason: e.to_string(),
            })
    }

    /// Parse one file. A tree containing syntax errors is a parse failure.
    fn parse(&self, path: &Path, source: &[u8]) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| CanopyError::Dependency {
                language: self.name().to_string(),
                reason: e.to_string(),
            })?;
        let tree = parser.parse(source, None).ok_or_else(|| CanopyError::Parse {
            path: path.to_path_buf(),
            reason: "parser produced no tree".to_string(),
        })?;
        if let Some(bad) = first_error(tree.root_node()) {
            return Err(CanopyError::Parse {
                path: path.to_path_buf(),
                reason: format!(
                    "syntax error at line {}, column {}",
                    bad.start_position().row + 1,
                    bad.start_position().column + 1
                ),
            });
        }
        Ok(tree)
    }

    /// Split a subtree into (class trees, function trees, leftover statements).
    fn split<'t>(&self, tree: SyntaxNode<'t>) -> Split<'t>;

    /// Name, line, body and constructor flag of a function tree found by `split`.
    fn function_info<'t>(
        &self,
        tree: SyntaxNode<'t>,
        source: &[u8],
        in_class: bool,
    ) -> Option<FunctionInfo<'t>>;

    /// Name, line, superclasses and body of a class tree found by `split`.
    fn class_info<'t>(&self, tree: SyntaxNode<'t>, source: &[u8]) -> Option<ClassInfo<'t>>;

    /// Every call site inside the given statements.
    fn make_calls(&self, trees: &[SyntaxNode], source: &[u8]) -> Vec<Call>;

    /// Every binding (assignment of a call result, import) inside the given statements.
    fn make_variables(&self, trees: &[SyntaxNode], source: &[u8]) -> Vec<Variable>;

    /// Tokens by which another file could import this one.
    fn file_import_tokens(&self, path: &Path) -> Vec<String>;

    /// Tokens by which a definition named `token` inside `parent` can be
    /// imported. File-level definitions default to `<file token>.<name>`.
    fn member_import_tokens(&self, parent: &Group, token: &str) -> Vec<String> {
        if parent.kind != GroupKind::File {
            return Vec::new();
        }
        parent
            .import_tokens
            .iter()
            .map(|file_token| format!("{file_token}.{token}"))
            .collect()
    }

    /// Whether class members can call each other without a receiver.
    fn members_share_scope(&self) -> bool {
        false
    }
}

/// Supported input languages. Adding a language means adding a variant here
/// and an analyser module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "py")]
    Python,
    #[serde(alias = "js")]
    JavaScript,
    #[serde(alias = "rb")]
    Ruby,
    Php,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Ruby,
        Language::Php,
    ];

    /// Language handling files with this extension, if any.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }

    /// Parse a `--language` flag value such as `py` or `javascript`.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.to_ascii_lowercase().as_str() {
            "py" | "python" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "javascript" => Some(Self::JavaScript),
            "rb" | "ruby" => Some(Self::Ruby),
            "php" => Some(Self::Php),
            _ => None,
        }
    }

    /// Whether `path` has one of this language's extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| self.extensions().contains(&e.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }

    fn analyser(&self) -> &'static dyn LanguageAnalyser {
        match self {
            Self::Python => &PythonAnalyser,
            Self::JavaScript => &JavaScriptAnalyser,
            Self::Ruby => &RubyAnalyser,
            Self::Php => &PhpAnalyser,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl LanguageAnalyser for Language {
    fn name(&self) -> &str {
        self.analyser().name()
    }

    fn extensions(&self) -> &[&str] {
        self.analyser().extensions()
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.analyser().grammar()
    }

    fn self_token(&self) -> &str {
        self.analyser().self_token()
    }

    fn split<'t>(&self, tree: SyntaxNode<'t>) -> Split<'t> {
        self.analyser().split(tree)
    }

    fn function_info<'t>(
        &self,
        tree: SyntaxNode<'t>,
        source: &[u8],
        in_class: bool,
    ) -> Option<FunctionInfo<'t>> {
        self.analyser().function_info(tree, source, in_class)
    }

    fn class_info<'t>(&self, tree: SyntaxNode<'t>, source: &[u8]) -> Option<ClassInfo<'t>> {
        self.analyser().class_info(tree, source)
    }

    fn make_calls(&self, trees: &[SyntaxNode], source: &[u8]) -> Vec<Call> {
        self.analyser().make_calls(trees, source)
    }

    fn make_variables(&self, trees: &[SyntaxNode], source: &[u8]) -> Vec<Variable> {
        self.analyser().make_variables(trees, source)
    }

    fn file_import_tokens(&self, path: &Path) -> Vec<String> {
        self.analyser().file_import_tokens(path)
    }

    fn member_import_tokens(&self, parent: &Group, token: &str) -> Vec<String> {
        self.analyser().member_import_tokens(parent, token)
    }

    fn members_share_scope(&self) -> bool {
        self.analyser().members_share_scope()
    }
}

// ---------------------------------------------------------------------------
// Shared tree helpers
// ---------------------------------------------------------------------------

/// How `split_children` should treat one syntax node.
pub(crate) enum Role<'t> {
    Class(SyntaxNode<'t>),
    Function(SyntaxNode<'t>),
    Ignore,
    Other,
}

/// Recursive three-way split. A statement that contains no definitions stays
/// whole in the body; otherwise it is opened up and its pieces are merged.
pub(crate) fn split_children<'t>(
    tree: SyntaxNode<'t>,
    classify: &dyn Fn(SyntaxNode<'t>) -> Role<'t>,
) -> Split<'t> {
    split_nodes(named_children(tree), classify)
}

/// `split_children` over an explicit list of sibling statements.
pub(crate) fn split_nodes<'t>(
    nodes: Vec<SyntaxNode<'t>>,
    classify: &dyn Fn(SyntaxNode<'t>) -> Role<'t>,
) -> Split<'t> {
    let mut split = Split::default();
    for child in nodes {
        match classify(child) {
            Role::Class(def) => split.groups.push(def),
            Role::Function(def) => split.functions.push(def),
            Role::Ignore => {}
            Role::Other => {
                let inner = split_children(child, classify);
                if inner.is_flat() {
                    split.body.push(child);
                } else {
                    split.extend(inner);
                }
            }
        }
    }
    split
}

pub(crate) fn named_children<'t>(node: SyntaxNode<'t>) -> Vec<SyntaxNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// `node` and all named descendants, pre-order.
pub(crate) fn descendants<'t>(node: SyntaxNode<'t>) -> Vec<SyntaxNode<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let children = named_children(current);
        stack.extend(children.into_iter().rev());
    }
    out
}

pub(crate) fn text(node: SyntaxNode, source: &[u8]) -> String {
    String::from_utf8_lossy(&source[node.byte_range()]).into_owned()
}

/// 1-based line of the node's first character.
pub(crate) fn line(node: SyntaxNode) -> usize {
    node.start_position().row + 1
}

pub(crate) fn djoin(parts: &[&str]) -> String {
    parts.join(".")
}

fn first_error(root: SyntaxNode) -> Option<SyntaxNode> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev().filter(|c| c.has_error()));
    }
    Some(root)
}
