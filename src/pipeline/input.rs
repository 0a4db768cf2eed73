//! Source validation: make sure the splitter's input is a readable PDF.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure. We
//! check existence, permissions and the `%PDF` magic bytes first so the
//! caller gets a specific, actionable fatal error instead.

use crate::error::Bio2CsvError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate the source PDF and return its path.
pub fn resolve_source(path: &Path) -> Result<PathBuf, Bio2CsvError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Bio2CsvError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Bio2CsvError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Bio2CsvError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Bio2CsvError::FileNotFound { path });
        }
    }

    debug!("Resolved source PDF: {}", path.display());
    Ok(path)
}
