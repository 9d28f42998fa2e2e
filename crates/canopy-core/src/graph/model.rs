//! Entity model: groups (namespaces), nodes (callables), variables and calls.
//!
//! Every cross-reference between entities is an arena index into
//! [`Program`](super::program::Program); nothing here owns another entity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Owner token used when a call's receiver has no resolvable name, e.g. `f().g()`.
pub const UNKNOWN_VAR: &str = "UNKNOWN_VAR";

/// Token of the synthetic node holding a group's top-level statements.
pub const ROOT_NODE_TOKEN: &str = "(global)";

/// Dense index of a [`Group`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub usize);

/// Dense index of a [`Node`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl GroupId {
    /// Stable identifier used by the output encoders.
    pub fn uid(&self) -> String {
        format!("cluster_{:08x}", self.0)
    }
}

impl NodeId {
    /// Stable identifier used by the output encoders.
    pub fn uid(&self) -> String {
        format!("node_{:08x}", self.0)
    }
}

/// A resolved reference to either kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Group(GroupId),
}

/// The kinds of namespace a [`Group`] can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    File,
    Class,
    Namespace,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Class => "Class",
            Self::Namespace => "Namespace",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call expression site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub token: String,
    pub owner_token: Option<String>,
    pub line_number: usize,
    /// Set for `new a.B()` style expressions, which are constructors even in
    /// attribute form.
    pub definite_constructor: bool,
}

impl Call {
    /// A bare call like `do_something()`.
    pub fn bare(token: impl Into<String>, line_number: usize) -> Self {
        Self {
            token: token.into(),
            owner_token: None,
            line_number,
            definite_constructor: false,
        }
    }

    /// An attribute call like `obj.do_something()`.
    pub fn attr(token: impl Into<String>, owner: impl Into<String>, line_number: usize) -> Self {
        Self {
            token: token.into(),
            owner_token: Some(owner.into()),
            line_number,
            definite_constructor: false,
        }
    }

    pub fn with_definite_constructor(mut self) -> Self {
        self.definite_constructor = true;
        self
    }

    pub fn is_attr(&self) -> bool {
        self.owner_token.is_some()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_token {
            Some(owner) => write!(f, "{owner}.{}()", self.token),
            None => write!(f, "{}()", self.token),
        }
    }
}

/// What a [`Variable`] refers to. The first two variants are placeholders
/// that the resolver replaces exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsTo {
    /// Dotted import path, e.g. `b.func_b`.
    ImportPath(String),
    /// `x = Something()`: possibly an instance of a class named `Something`.
    PendingConstructor(Call),
    Resolved(EntityRef),
    /// An import that matched nothing in the analysed sources.
    UnknownExternal,
}

impl PointsTo {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::ImportPath(_) | Self::PendingConstructor(_))
    }
}

/// A named binding visible in some scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub token: String,
    pub points_to: PointsTo,
    pub line_number: usize,
}

impl Variable {
    pub fn new(token: impl Into<String>, points_to: PointsTo, line_number: usize) -> Self {
        let token = token.into();
        debug_assert!(!token.is_empty(), "variable token must not be empty");
        debug_assert!(
            !matches!(&points_to, PointsTo::ImportPath(p) if p.is_empty()),
            "import path must not be empty"
        );
        Self {
            token,
            points_to,
            line_number,
        }
    }

    pub fn node(token: impl Into<String>, node: NodeId, line_number: usize) -> Self {
        Self::new(token, PointsTo::Resolved(EntityRef::Node(node)), line_number)
    }

    pub fn group(token: impl Into<String>, group: GroupId, line_number: usize) -> Self {
        Self::new(token, PointsTo::Resolved(EntityRef::Group(group)), line_number)
    }
}

/// A namespace: a file, class or namespace block.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub token: String,
    pub kind: GroupKind,
    pub display_kind: String,
    pub line_number: usize,
    pub import_tokens: Vec<String>,
    /// Superclass names as written in the source.
    pub inherits: Vec<String>,
    /// Superclasses resolved by the inheritance phase.
    pub inherited: Vec<GroupId>,
    pub nodes: Vec<NodeId>,
    pub subgroups: Vec<GroupId>,
    pub root_node: Option<NodeId>,
    pub parent: Option<GroupId>,
}

impl Group {
    pub fn new(token: impl Into<String>, kind: GroupKind, line_number: usize) -> Self {
        Self {
            id: GroupId(usize::MAX),
            token: token.into(),
            kind,
            display_kind: kind.as_str().to_string(),
            line_number,
            import_tokens: Vec::new(),
            inherits: Vec::new(),
            inherited: Vec::new(),
            nodes: Vec::new(),
            subgroups: Vec::new(),
            root_node: None,
            parent: None,
        }
    }

    pub fn with_display_kind(mut self, display_kind: impl Into<String>) -> Self {
        self.display_kind = display_kind.into();
        self
    }

    pub fn with_import_tokens(mut self, tokens: Vec<String>) -> Self {
        self.import_tokens = tokens;
        self
    }

    pub fn with_inherits(mut self, inherits: Vec<String>) -> Self {
        self.inherits = inherits;
        self
    }

    pub fn label(&self) -> String {
        format!("{}: {}", self.display_kind, self.token)
    }
}

/// A callable unit: function, method, or a group's synthetic top level.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub token: String,
    pub line_number: usize,
    pub calls: Vec<Call>,
    pub variables: Vec<Variable>,
    pub parent: GroupId,
    pub import_tokens: Vec<String>,
    pub is_constructor: bool,
    /// Calls nothing resolvable. Only ever flipped to false.
    pub is_leaf: bool,
    /// Nothing calls it. Only ever flipped to false.
    pub is_trunk: bool,
}

impl Node {
    pub fn new(
        token: impl Into<String>,
        line_number: usize,
        calls: Vec<Call>,
        variables: Vec<Variable>,
        parent: GroupId,
    ) -> Self {
        Self {
            id: NodeId(usize::MAX),
            token: token.into(),
            line_number,
            calls,
            variables,
            parent,
            import_tokens: Vec::new(),
            is_constructor: false,
            is_leaf: true,
            is_trunk: true,
        }
    }

    pub fn with_import_tokens(mut self, tokens: Vec<String>) -> Self {
        self.import_tokens = tokens;
        self
    }

    pub fn constructor(mut self, is_constructor: bool) -> Self {
        self.is_constructor = is_constructor;
        self
    }

    /// What the graph shows, e.g. `12: handle()`.
    pub fn label(&self) -> String {
        format!("{}: {}()", self.line_number, self.token)
    }
}

/// A resolved caller -> callee relationship. Built through
/// [`Program::link`](super::program::Program::link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub caller: NodeId,
    pub callee: NodeId,
}
