//! Canopy Core: heuristic static call-graph extraction.
//!
//! This crate contains all analysis logic: tree-sitter parsing, the group/node
//! model of each file, variable resolution, call linking, trimming, and the
//! DOT/JSON encoders.

pub mod config;
pub mod error;
pub mod graph;
pub mod languages;
pub mod output;
pub mod phases;
pub mod pipeline;

pub use config::{AnalysisConfig, OutputFormat};
pub use error::{CanopyError, Result};
pub use languages::Language;
pub use pipeline::{run_pipeline, AnalysisResult};
