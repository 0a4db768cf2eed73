//! Stage 1: split the source PDF into one PDF per bookmarked person.
//!
//! ## Range resolution
//!
//! A person's pages run from their bookmark's page up to the page of the
//! *next bookmark in the original outline*, whether or not that neighbour
//! is itself a person. Ranges are therefore resolved over the unfiltered
//! sequence first, and only then are front-matter pages, section headers
//! and malformed titles dropped. Filtering first would let a person's range
//! swallow the section header that follows it.
//!
//! The copied 0-based page indices are `start_page - 1 .. end_page - 1`
//! (exclusive); the last bookmark ends at `total_pages - 1`.

use crate::config::PipelineConfig;
use crate::error::Bio2CsvError;
use crate::output::SplitStats;
use crate::pipeline::{ensure_dir, input, pdf, slug};
use crate::progress::Stage;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info};

/// One outline entry, in outline (depth-first, prefix) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Raw display title.
    pub title: String,
    /// 1-based target page; `0` when the destination could not be resolved.
    pub page: usize,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, page: usize) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// The pages copied into one person's PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Output file stem, `lastname_firstname`.
    pub slug: String,
    /// Raw title the slug came from.
    pub title: String,
    /// 0-based page indices, half-open. May be empty.
    pub pages: Range<usize>,
}

impl SplitPlan {
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.slug)
    }
}

/// Why a bookmark produced no PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Target page is before the first content page.
    FrontMatter,
    /// Single-character title (alphabetical section letter).
    SectionLetter,
    /// No comma, or no first name after it.
    NotAPerson,
}

/// Accept or reject a single bookmark, in the order the checks apply.
pub fn classify(bookmark: &Bookmark, first_content_page: usize) -> Result<String, Rejection> {
    if bookmark.page < first_content_page {
        return Err(Rejection::FrontMatter);
    }
    if bookmark.title.chars().count() == 1 {
        return Err(Rejection::SectionLetter);
    }
    slug::normalize_title(&bookmark.title).ok_or(Rejection::NotAPerson)
}

/// Resolve the page range of every accepted bookmark.
///
/// Each entry's end boundary comes from its immediate successor in
/// `bookmarks` (accepted or not), or `total_pages` for the last entry.
/// Ranges where the successor is on the same or an earlier page are empty.
pub fn plan_splits(
    bookmarks: &[Bookmark],
    total_pages: usize,
    first_content_page: usize,
) -> Vec<SplitPlan> {
    bookmarks
        .iter()
        .enumerate()
        .filter_map(|(i, bookmark)| {
            let end_page = bookmarks.get(i + 1).map_or(total_pages, |next| next.page);

            match classify(bookmark, first_content_page) {
                Ok(slug) => {
                    let start = bookmark.page.saturating_sub(1);
                    let end = end_page.saturating_sub(1).max(start);
                    Some(SplitPlan {
                        slug,
                        title: bookmark.title.clone(),
                        pages: start..end,
                    })
                }
                Err(reason) => {
                    debug!("Skipping bookmark {:?} (page {}): {:?}", bookmark.title, bookmark.page, reason);
                    None
                }
            }
        })
        .collect()
}

/// Split `config.source_pdf` into `config.split_dir/{slug}.pdf`.
///
/// Every failure here is fatal: an empty outline, a bookmark past the end of
/// the document, or any write error aborts the run. Files already present in
/// the output directory are overwritten only when a slug collides with them.
pub async fn split_pdf(config: &PipelineConfig) -> Result<SplitStats, Bio2CsvError> {
    let source = input::resolve_source(&config.source_pdf)?;
    ensure_dir(&config.split_dir)?;
    info!("Splitting {} → {}", source.display(), config.split_dir.display());

    let outline = pdf::read_outline(&source, config.pdfium_lib_path.as_deref()).await?;
    if outline.bookmarks.is_empty() {
        return Err(Bio2CsvError::NoBookmarks { path: source });
    }

    let plans = plan_splits(&outline.bookmarks, outline.total_pages, config.first_content_page);
    if let Some(bad) = plans
        .iter()
        .find(|p| !p.pages.is_empty() && p.pages.end > outline.total_pages)
    {
        return Err(Bio2CsvError::PageOutOfRange {
            page: bad.pages.end,
            total: outline.total_pages,
        });
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Split, plans.len());
    }

    let written = pdf::write_splits(
        &source,
        &config.split_dir,
        &plans,
        config.pdfium_lib_path.as_deref(),
        config.progress_callback.clone(),
    )
    .await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(Stage::Split, written, plans.len());
    }

    let stats = SplitStats {
        input_from: source,
        output_to: config.split_dir.clone(),
        num_bookmarks: outline.bookmarks.len(),
        num_pdfs_created: written,
        num_rejected: outline.bookmarks.len() - plans.len(),
    };
    info!(
        "Split complete: {} PDFs from {} bookmarks ({} rejected)",
        stats.num_pdfs_created, stats.num_bookmarks, stats.num_rejected
    );
    Ok(stats)
}
