//! Entity model and the arena that owns it.

pub mod model;
pub mod program;

pub use model::{
    Call, Edge, EntityRef, Group, GroupId, GroupKind, Node, NodeId, PointsTo, Variable,
    ROOT_NODE_TOKEN, UNKNOWN_VAR,
};
pub use program::Program;
