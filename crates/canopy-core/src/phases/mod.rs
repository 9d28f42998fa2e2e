//! Pipeline phases, one module per phase, in execution order.

pub mod discovery;
pub mod parsing;
pub mod build;
pub mod exclude;
pub mod inherit;
pub mod resolve;
pub mod calls;
pub mod trim;
