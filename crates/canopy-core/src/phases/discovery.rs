//! Phase 1: Expand the given paths into source files and settle the language.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::{CanopyError, Result};
use crate::languages::Language;

/// Directory names never descended into.
const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
];

/// Source files to analyse, in a stable order, and their language.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub language: Language,
    pub files: Vec<PathBuf>,
}

/// Run the discovery phase.
///
/// Directories are walked recursively in file-name order; explicitly listed
/// files are kept in the order given. Without an explicit language the first
/// file with a recognised extension decides it.
pub fn run_discovery_phase(config: &AnalysisConfig) -> Result<Discovered> {
    let candidates = collect_candidates(&config.sources);
    if candidates.is_empty() {
        return Err(CanopyError::NoSourceFiles(config.sources.clone()));
    }

    let language = match config.language {
        Some(language) => language,
        None => candidates
            .iter()
            .filter_map(|p| p.extension())
            .find_map(|ext| Language::from_extension(&ext.to_string_lossy()))
            .ok_or_else(|| CanopyError::UndetectedLanguage(config.sources.clone()))?,
    };

    let files: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| language.matches(p))
        .collect();
    if files.is_empty() {
        return Err(CanopyError::NoMatchingSources {
            paths: config.sources.clone(),
            language: language.to_string(),
        });
    }
    debug!("found {} {} source file(s)", files.len(), language);
    Ok(Discovered { language, files })
}

fn collect_candidates(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for source in sources {
        if source.is_file() {
            if seen.insert(source.clone()) {
                out.push(source.clone());
            }
            continue;
        }
        if !source.is_dir() {
            warn!("skipping {}: no such file or directory", source.display());
            continue;
        }
        for entry in WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e.path(), e.file_type().is_dir()))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() && seen.insert(entry.path().to_path_buf()) {
                out.push(entry.into_path());
            }
        }
    }
    out
}

fn is_excluded_dir(path: &Path, is_dir: bool) -> bool {
    if !is_dir {
        return false;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.starts_with('.') || DEFAULT_EXCLUDES.contains(&name.as_str())
}
