//! Sequential phase orchestrator with timing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use log::debug;

use crate::config::AnalysisConfig;
use crate::error::{CanopyError, Result};
use crate::graph::{Edge, GroupId, NodeId, Program};
use crate::languages::{Language, LanguageAnalyser};
use crate::phases;
use crate::phases::parsing::ParsedFile;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("discovery", "Discovering source files"),
    ("parsing", "Parsing source files"),
    ("build", "Building groups and nodes"),
    ("exclude_namespaces", "Excluding namespaces"),
    ("exclude_functions", "Excluding functions"),
    ("inherit", "Consolidating inheritance"),
    ("resolve", "Resolving variables"),
    ("calls", "Linking calls"),
    ("trim", "Trimming unconnected nodes"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Type alias for phase function closures to keep signatures readable.
type PhaseFn = Box<dyn FnOnce(&AnalysisConfig, &mut PipelineState) -> Result<()>>;

/// Everything the phases hand to each other.
#[derive(Default)]
struct PipelineState {
    language: Option<Language>,
    files: Vec<PathBuf>,
    parsed: Vec<ParsedFile>,
    program: Program,
    report: phases::calls::LinkReport,
}

/// Outcome of a run: the trimmed model and the edges between its nodes.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub language: Language,
    pub source_files: Vec<PathBuf>,
    pub program: Program,
    /// One entry per resolved call site; the encoders de-duplicate.
    pub edges: Vec<Edge>,
    pub ambiguous_calls: Vec<String>,
    pub external_calls: usize,
    pub phase_timings: HashMap<String, f64>,
    pub total_ms: f64,
}

impl AnalysisResult {
    pub fn file_groups(&self) -> &[GroupId] {
        self.program.files()
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.program.nodes()
    }
}

/// Execute the analysis pipeline and return the result.
///
/// Configuration is validated before any file is read.
pub fn run_pipeline(
    config: &AnalysisConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    config.validate()?;
    let mut state = PipelineState::default();
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    let phase_fns: Vec<(&str, PhaseFn)> = vec![
        (
            "discovery",
            Box::new(|config, state| {
                let found = phases::discovery::run_discovery_phase(config)?;
                state.language = Some(found.language);
                state.files = found.files;
                Ok(())
            }),
        ),
        (
            "parsing",
            Box::new(|config, state| {
                let language = state.language()?;
                language.assert_dependencies()?;
                state.parsed = phases::parsing::run_parsing_phase(
                    language,
                    &state.files,
                    config.skip_parse_errors,
                )?;
                Ok(())
            }),
        ),
        (
            "build",
            Box::new(|_config, state| {
                let language = state.language()?;
                phases::build::run_build_phase(language, &state.parsed, &mut state.program);
                log_model_summary(&state.program);
                Ok(())
            }),
        ),
        (
            "exclude_namespaces",
            Box::new(|config, state| {
                phases::exclude::run_exclude_namespaces_phase(
                    &mut state.program,
                    &config.exclude_namespaces,
                );
                Ok(())
            }),
        ),
        (
            "exclude_functions",
            Box::new(|config, state| {
                phases::exclude::run_exclude_functions_phase(
                    &mut state.program,
                    &config.exclude_functions,
                );
                Ok(())
            }),
        ),
        (
            "inherit",
            Box::new(|_config, state| {
                phases::inherit::run_inherit_phase(&mut state.program);
                Ok(())
            }),
        ),
        (
            "resolve",
            Box::new(|_config, state| {
                phases::resolve::run_resolve_phase(&mut state.program);
                Ok(())
            }),
        ),
        (
            "calls",
            Box::new(|_config, state| {
                state.report = phases::calls::run_calls_phase(&mut state.program);
                Ok(())
            }),
        ),
        (
            "trim",
            Box::new(|config, state| {
                if !config.no_trimming {
                    phases::trim::run_trim_phase(&mut state.program, &state.report.edges);
                }
                Ok(())
            }),
        ),
    ];

    for (name, phase_fn) in phase_fns {
        if let Some(ref mut cb) = progress_callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        phase_fn(config, &mut state)?;
        timings.insert(name.to_string(), start.elapsed().as_secs_f64());
    }

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let language = state.language()?;
    Ok(AnalysisResult {
        language,
        source_files: state.files,
        program: state.program,
        edges: state.report.edges,
        ambiguous_calls: state.report.ambiguous,
        external_calls: state.report.external,
        phase_timings: timings,
        total_ms,
    })
}

impl PipelineState {
    /// Set by discovery; any phase asking earlier gets an error.
    fn language(&self) -> Result<Language> {
        self.language
            .ok_or_else(|| CanopyError::UndetectedLanguage(self.files.clone()))
    }
}

fn log_model_summary(program: &Program) {
    let nodes = program.nodes();
    let calls: usize = nodes.iter().map(|&n| program.node(n).calls.len()).sum();
    let variables: usize = nodes.iter().map(|&n| program.node(n).variables.len()).sum();
    debug!(
        "found {} group(s), {} node(s), {} call(s) and {} variable(s)",
        program.group_count(),
        nodes.len(),
        calls,
        variables
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_is_required_before_parsing() {
        let state = PipelineState::default();
        assert!(matches!(
            state.language(),
            Err(CanopyError::UndetectedLanguage(_))
        ));
    }

    #[test]
    fn language_comes_from_discovery() {
        let state = PipelineState {
            language: Some(Language::JavaScript),
            ..PipelineState::default()
        };
        assert_eq!(state.language().unwrap(), Language::JavaScript);
    }
}
