//! pdfium I/O for the splitter: bind the library, read the outline, and
//! write one document per [`SplitPlan`].
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Every call here runs
//! on tokio's blocking pool so the runtime's worker threads never stall.
//!
//! ## Library lookup
//!
//! 1. The explicit path from the config (`--pdfium-lib`), file or directory
//! 2. `PDFIUM_LIB_PATH`
//! 3. `./libpdfium.*` in the working directory
//! 4. The system library search path

use crate::error::Bio2CsvError;
use crate::pipeline::split::{Bookmark, SplitPlan};
use crate::progress::{ProgressCallback, Stage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment override for the pdfium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// What the splitter needs to know about the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    /// Every outline entry, depth-first, in document order.
    pub bookmarks: Vec<Bookmark>,
    pub total_pages: usize,
}

/// Bind to a pdfium library following the lookup order above.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Bio2CsvError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                Bio2CsvError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Bio2CsvError::PdfiumBindingFailed(e.to_string()))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Read the outline and page count of `pdf_path`.
pub async fn read_outline(
    pdf_path: &Path,
    lib_path: Option<&Path>,
) -> Result<Outline, Bio2CsvError> {
    let path = pdf_path.to_path_buf();
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || read_outline_blocking(&path, lib.as_deref()))
        .await
        .map_err(|e| Bio2CsvError::Internal(format!("Outline task panicked: {}", e)))?
}

fn read_outline_blocking(pdf_path: &Path, lib_path: Option<&Path>) -> Result<Outline, Bio2CsvError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = open_document(&pdfium, pdf_path)?;

    let total_pages = document.pages().len() as usize;
    let bookmarks: Vec<Bookmark> = document
        .bookmarks()
        .iter()
        .map(|bookmark| {
            let page = bookmark
                .destination()
                .and_then(|dest| dest.page_index().ok())
                .map_or(0, |idx| idx as usize + 1);
            Bookmark::new(bookmark.title().unwrap_or_default(), page)
        })
        .collect();

    info!(
        "PDF loaded: {} pages, {} bookmarks",
        total_pages,
        bookmarks.len()
    );
    Ok(Outline {
        bookmarks,
        total_pages,
    })
}

/// Write one PDF per plan into `out_dir`; returns the number written.
///
/// The first failing write aborts the whole stage.
pub async fn write_splits(
    source: &Path,
    out_dir: &Path,
    plans: &[SplitPlan],
    lib_path: Option<&Path>,
    progress: Option<ProgressCallback>,
) -> Result<usize, Bio2CsvError> {
    let source = source.to_path_buf();
    let out_dir = out_dir.to_path_buf();
    let plans = plans.to_vec();
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        write_splits_blocking(&source, &out_dir, &plans, lib.as_deref(), progress)
    })
    .await
    .map_err(|e| Bio2CsvError::Internal(format!("Split task panicked: {}", e)))?
}

fn write_splits_blocking(
    source: &Path,
    out_dir: &Path,
    plans: &[SplitPlan],
    lib_path: Option<&Path>,
    progress: Option<ProgressCallback>,
) -> Result<usize, Bio2CsvError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = open_document(&pdfium, source)?;

    let mut written = 0;
    for plan in plans {
        let path = out_dir.join(plan.file_name());
        let write_failed = |e: PdfiumError| Bio2CsvError::SplitWriteFailed {
            path: path.clone(),
            detail: e.to_string(),
        };

        let mut target = pdfium.create_new_pdf().map_err(write_failed)?;
        if !plan.pages.is_empty() {
            let first = plan.pages.start as PdfPageIndex;
            let last = (plan.pages.end - 1) as PdfPageIndex;
            target
                .pages_mut()
                .copy_page_range_from_document(&document, first..=last, 0)
                .map_err(write_failed)?;
        }
        target.save_to_file(&path).map_err(write_failed)?;

        debug!(
            "Wrote {} ({} pages from {:?})",
            path.display(),
            plan.pages.len(),
            plan.title
        );
        if let Some(ref cb) = progress {
            cb.on_item_complete(Stage::Split, &plan.file_name());
        }
        written += 1;
    }

    Ok(written)
}

fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, Bio2CsvError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| Bio2CsvError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}
