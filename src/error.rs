//! Error types for the bio2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Bio2CsvError`] — **Fatal**: the stage cannot proceed at all (source
//!   PDF has no outline, extraction tool not installed, no API key). Returned
//!   as `Err(Bio2CsvError)` from the stage entry points, and stops every
//!   downstream stage.
//!
//! * [`ItemError`] — **Non-fatal**: a single person failed (extraction tool
//!   exited non-zero, LLM reply could not be repaired, JSON would not load)
//!   but the rest of the batch is fine. Stored inside the stage stats so the
//!   run still succeeds and reports its error count.
//!
//! The Splitter has no per-item tier: an unsplittable source makes the whole
//! run meaningless, so all of its failures are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bio2csv library.
///
/// Per-person failures use [`ItemError`] and are stored in
/// [`crate::output`] stats rather than propagated here.
#[derive(Debug, Error)]
pub enum Bio2CsvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source PDF was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A stage's input directory does not exist; the previous stage never ran.
    #[error("Input directory for stage '{stage}' does not exist: '{path}'\nRun the previous stage first.")]
    StageInputMissing { stage: String, path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The source PDF has an empty outline; there is nothing to split on.
    #[error("No bookmarks found in PDF '{path}'")]
    NoBookmarks { path: PathBuf },

    /// A bookmark points past the end of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could not create, fill or save a per-person PDF.
    #[error("Failed to write split PDF '{path}': {detail}")]
    SplitWriteFailed { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The external text-extraction tool is not installed / not on PATH.
    #[error("Text extraction tool '{tool}' not found.\nInstall pdfminer.six (pip install pdfminer.six) or pass --extract-tool.")]
    ExtractorNotFound { tool: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No API key was given and the environment fallback is empty.
    #[error("No LLM API key configured.\n{hint}")]
    MissingCredential { hint: String },

    /// The provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, list, read or write a path owned by a stage.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise a CSV table.
    #[error("Failed to write table '{path}': {detail}")]
    TableWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Bio2CsvError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Bio2CsvError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single person.
///
/// Stored in the stage stats; the stage outcome is still success.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The extraction tool ran but exited non-zero.
    #[error("{file}: text extraction failed: {detail}")]
    ExtractionFailed { file: String, detail: String },

    /// The LLM request itself failed.
    #[error("{file}: LLM request failed: {detail}")]
    LlmFailed { file: String, detail: String },

    /// The LLM replied, but the reply could not be repaired into JSON.
    #[error("{file}: reply is not repairable JSON: {detail}")]
    RepairFailed { file: String, detail: String },

    /// The parsed record could not be written to its output file.
    #[error("{file}: failed to write record: {detail}")]
    WriteFailed { file: String, detail: String },

    /// A per-person JSON file could not be loaded during the join.
    #[error("{file}: failed to load: {detail}")]
    LoadFailed { file: String, detail: String },
}

impl ItemError {
    /// File name of the item this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            ItemError::ExtractionFailed { file, .. }
            | ItemError::LlmFailed { file, .. }
            | ItemError::RepairFailed { file, .. }
            | ItemError::WriteFailed { file, .. }
            | ItemError::LoadFailed { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_bookmarks_display() {
        let e = Bio2CsvError::NoBookmarks {
            path: PathBuf::from("book.pdf"),
        };
        assert!(e.to_string().contains("book.pdf"), "got: {e}");
    }

    #[test]
    fn extractor_not_found_display() {
        let e = Bio2CsvError::ExtractorNotFound {
            tool: "pdf2txt.py".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pdf2txt.py"));
        assert!(msg.contains("pdfminer.six"));
    }

    #[test]
    fn stage_input_missing_display() {
        let e = Bio2CsvError::StageInputMissing {
            stage: "parse".into(),
            path: PathBuf::from("data/extract"),
        };
        let msg = e.to_string();
        assert!(msg.contains("parse"));
        assert!(msg.contains("data/extract"));
    }

    #[test]
    fn item_error_carries_file_name() {
        let e = ItemError::LlmFailed {
            file: "noether_emmy.pdf.txt".into(),
            detail: "503".into(),
        };
        assert_eq!(e.file(), "noether_emmy.pdf.txt");
        assert!(e.to_string().contains("503"));
    }

    #[test]
    fn item_error_serialises() {
        let e = ItemError::LoadFailed {
            file: "x.json".into(),
            detail: "EOF".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("LoadFailed"));
    }
}
