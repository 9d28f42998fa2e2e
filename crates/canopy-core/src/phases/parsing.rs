//! Phase 2: Read and parse every source file with tree-sitter.

use std::path::{Path, PathBuf};

use log::warn;
use tree_sitter::Tree;

use crate::error::Result;
use crate::languages::{Language, LanguageAnalyser};

/// One successfully parsed file.
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: Vec<u8>,
    pub tree: Tree,
}

impl ParsedFile {
    pub fn parse(language: Language, path: &Path) -> Result<Self> {
        let source = std::fs::read(path)?;
        let tree = language.parse(path, &source)?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }
}

/// Run the parsing phase.
///
/// A file that fails to parse aborts the run unless `skip_parse_errors` is
/// set, in which case it is dropped whole with a warning.
pub fn run_parsing_phase(
    language: Language,
    files: &[PathBuf],
    skip_parse_errors: bool,
) -> Result<Vec<ParsedFile>> {
    let mut parsed = Vec::with_capacity(files.len());
    for path in files {
        match ParsedFile::parse(language, path) {
            Ok(file) => parsed.push(file),
            Err(err) if skip_parse_errors => {
                warn!("skipping {}: {err}", path.display());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanopyError;

    #[test]
    fn parse_errors_abort_or_skip() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.py");
        let bad = tmp.path().join("bad.py");
        std::fs::write(&good, "def ok():\n    pass\n").unwrap();
        std::fs::write(&bad, "def broken(:\n").unwrap();
        let files = vec![good.clone(), bad];

        let err = run_parsing_phase(Language::Python, &files, false)
            .err()
            .unwrap();
        assert!(matches!(err, CanopyError::Parse { .. }));

        let parsed = run_parsing_phase(Language::Python, &files, true).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, good);
    }
}
