//! Error type shared by every phase of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an analysis run.
///
/// Resolution ambiguity and exclusion misses are deliberately absent: they are
/// logged and reported in the result, never raised.
#[derive(Debug, Error)]
pub enum CanopyError {
    #[error("no source files found from {0:?}")]
    NoSourceFiles(Vec<PathBuf>),

    #[error("could not find any {language} source files given {paths:?}")]
    NoMatchingSources {
        paths: Vec<PathBuf>,
        language: String,
    },

    #[error("language could not be detected from {0:?}; pass --language explicitly")]
    UndetectedLanguage(Vec<PathBuf>),

    #[error("output file {path:?} must end in one of {expected:?}")]
    UnsupportedOutput { path: PathBuf, expected: Vec<String> },

    #[error("the {language} grammar could not be loaded: {reason}")]
    Dependency { language: String, reason: String },

    #[error("could not parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error(
        "can't render an image because neither `dot` nor `dot.exe` was found; \
         install graphviz or write a .dot/.gv/.json file instead"
    )]
    GraphvizMissing,

    #[error("--verbose and --quiet are mutually exclusive")]
    ConflictingVerbosity,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CanopyError {
    /// Configuration errors are raised before any file is parsed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoSourceFiles(_)
                | Self::NoMatchingSources { .. }
                | Self::UndetectedLanguage(_)
                | Self::UnsupportedOutput { .. }
                | Self::Dependency { .. }
                | Self::GraphvizMissing
                | Self::ConflictingVerbosity
        )
    }
}

pub type Result<T> = std::result::Result<T, CanopyError>;
