//! Run configuration and output format selection.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};
use crate::languages::Language;

/// Serializer picked from the output path's extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Dot,
    Gv,
    Json,
    Png,
    Svg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Dot,
        OutputFormat::Gv,
        OutputFormat::Json,
        OutputFormat::Png,
        OutputFormat::Svg,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Gv => "gv",
            Self::Json => "json",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// Rendered by graphviz rather than written directly.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Svg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| CanopyError::UnsupportedOutput {
                path: path.to_path_buf(),
                expected: Self::ALL.iter().map(|f| f.extension().to_string()).collect(),
            })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Files and directories to analyse.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Detected from the first recognised source extension when unset.
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub exclude_namespaces: Vec<String>,
    #[serde(default)]
    pub exclude_functions: Vec<String>,
    #[serde(default)]
    pub no_grouping: bool,
    #[serde(default)]
    pub no_trimming: bool,
    #[serde(default)]
    pub hide_legend: bool,
    #[serde(default)]
    pub skip_parse_errors: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("out.png")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output_path: default_output_path(),
            language: None,
            exclude_namespaces: Vec::new(),
            exclude_functions: Vec::new(),
            no_grouping: false,
            no_trimming: false,
            hide_legend: false,
            skip_parse_errors: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl AnalysisConfig {
    pub fn new(sources: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_path(&self.output_path)
    }

    /// Checks that need no file system access.
    pub fn validate(&self) -> Result<OutputFormat> {
        if self.verbose && self.quiet {
            return Err(CanopyError::ConflictingVerbosity);
        }
        if self.sources.is_empty() {
            return Err(CanopyError::NoSourceFiles(Vec::new()));
        }
        self.output_format()
    }
}

/// Split a comma-separated CLI value, dropping empty entries.
pub fn parse_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_config_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.output_path, PathBuf::from("out.png"));
        assert!(cfg.language.is_none());
        assert!(!cfg.no_trimming);
        assert!(!cfg.skip_parse_errors);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"sources": ["src"], "language": "py"}"#).unwrap();
        assert_eq!(cfg.sources, vec![PathBuf::from("src")]);
        assert_eq!(cfg.language, Some(Language::Python));
        assert_eq!(cfg.output_path, PathBuf::from("out.png"));
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("graph.GV")).unwrap(),
            OutputFormat::Gv
        );
        assert!(OutputFormat::from_path(Path::new("graph.svg")).unwrap().is_image());
        let err = OutputFormat::from_path(Path::new("graph.pdf")).unwrap_err();
        assert!(matches!(err, CanopyError::UnsupportedOutput { .. }));
        assert!(OutputFormat::from_path(Path::new("graph")).is_err());
    }

    #[test]
    fn validate_rejects_conflicting_verbosity() {
        let mut cfg = AnalysisConfig::new(["src"]);
        cfg.verbose = true;
        cfg.quiet = true;
        assert!(matches!(
            cfg.validate(),
            Err(CanopyError::ConflictingVerbosity)
        ));
    }

    #[test]
    fn comma_lists() {
        assert_eq!(parse_comma_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_comma_list("").is_empty());
    }
}
