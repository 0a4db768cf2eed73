//! Pipeline stages for bookmarked-PDF-to-CSV conversion.
//!
//! Each stage reads its predecessor's output directory and writes its own;
//! nothing is passed in memory between stages, so every per-person artefact
//! is durable and a stage can be re-run on its own.
//!
//! ## Data Flow
//!
//! ```text
//! source.pdf ──▶ split ──▶ extract ──▶ parse ──▶ join
//!               {slug}.pdf  .pdf.txt    .json    six CSVs
//! ```
//!
//! 1. [`split`]   — bookmark planning ([`slug`]) and pdfium I/O ([`pdf`]);
//!    the only stage where every failure is fatal
//! 2. [`extract`] — one external-tool invocation per PDF
//! 3. [`parse`]   — one LLM call per text ([`llm`]), reply fixed up by
//!    [`repair`]; skips people that already have output
//! 4. [`join`]    — flatten records into [`table`]s, with years from [`dates`]

pub mod dates;
pub mod extract;
pub mod input;
pub mod join;
pub mod llm;
pub mod parse;
pub mod pdf;
pub mod repair;
pub mod slug;
pub mod split;
pub mod table;

use crate::error::Bio2CsvError;
use crate::progress::Stage;
use std::path::{Path, PathBuf};

/// Create `dir` (and parents) if absent.
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), Bio2CsvError> {
    std::fs::create_dir_all(dir).map_err(|e| Bio2CsvError::io(dir, e))
}

/// Fail with [`Bio2CsvError::StageInputMissing`] unless `dir` exists.
pub(crate) fn require_input_dir(stage: Stage, dir: &Path) -> Result<(), Bio2CsvError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Bio2CsvError::StageInputMissing {
            stage: stage.to_string(),
            path: dir.to_path_buf(),
        })
    }
}

/// Regular files in `dir` with the given extension, sorted by name.
///
/// Listing order is filesystem-dependent; sorting only makes logs and
/// progress output reproducible.
pub(crate) fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, Bio2CsvError> {
    let entries = std::fs::read_dir(dir).map_err(|e| Bio2CsvError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Bio2CsvError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Final path component as UTF-8 (lossy).
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "c.txt", "d.PDFX"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let names: Vec<String> = list_files(dir.path(), "pdf")
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
    }

    #[test]
    fn missing_input_dir_names_the_stage() {
        let err = require_input_dir(Stage::Join, Path::new("/no/such/dir")).unwrap_err();
        match err {
            Bio2CsvError::StageInputMissing { stage, .. } => assert_eq!(stage, "join"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
