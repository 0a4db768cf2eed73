//! Split-stage tests against the small PDFs in `tests/fixtures/`.
//!
//! `bookmarked.pdf` has 9 pages and three outline entries:
//! "Aaron, Ann (1900-1980)" on page 6, "Errata" on page 8 and "Baker, Beth"
//! on page 9. `no_outline.pdf` has 3 pages and no outline. Regenerate both
//! with `python3 tests/fixtures/make_fixtures.py`.
//!
//! Needs only the pdfium shared library (`PDFIUM_LIB_PATH`, `./libpdfium.*`
//! or the system search path); every test skips when it cannot be bound.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium cargo test --test split -- --nocapture

use bio2csv::{pipeline::pdf, split_pdf, Bio2CsvError, PipelineConfig};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Skip this test if pdfium cannot be bound.
macro_rules! skip_unless_pdfium {
    () => {{
        if let Err(e) = pdf::bind_pdfium(None) {
            println!("SKIP — {e}");
            return;
        }
    }};
}

fn config_for(source: PathBuf) -> (tempfile::TempDir, PipelineConfig) {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .workdir(root.path())
        .source_pdf(source)
        .build()
        .unwrap();
    (root, config)
}

fn page_count(path: &Path) -> usize {
    let pdfium = pdf::bind_pdfium(None).unwrap();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .unwrap_or_else(|e| panic!("{}: {e:?}", path.display()));
    let pages = document.pages().len() as usize;
    pages
}

fn pdf_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Outline ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn outline_lists_every_entry_with_its_page() {
    skip_unless_pdfium!();

    let outline = pdf::read_outline(&fixture("bookmarked.pdf"), None).await.unwrap();
    assert_eq!(outline.total_pages, 9);

    let entries: Vec<(&str, usize)> = outline
        .bookmarks
        .iter()
        .map(|b| (b.title.as_str(), b.page))
        .collect();
    assert_eq!(
        entries,
        [("Aaron, Ann (1900-1980)", 6), ("Errata", 8), ("Baker, Beth", 9)]
    );
}

// ── Split ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_bookmark_is_skipped_and_ranges_are_inclusive() {
    skip_unless_pdfium!();
    let (_root, config) = config_for(fixture("bookmarked.pdf"));

    let stats = split_pdf(&config).await.unwrap();
    assert_eq!(stats.num_bookmarks, 3);
    assert_eq!(stats.num_pdfs_created, 2);
    assert_eq!(stats.num_rejected, 1);

    assert_eq!(pdf_names(&config.split_dir), ["aaron_ann.pdf", "baker_beth.pdf"]);
    // Pages 6-7: ends where "Errata" starts, even though that entry is skipped.
    assert_eq!(page_count(&config.split_dir.join("aaron_ann.pdf")), 2);
    // Page 9 alone: the last entry runs to the end of the document.
    assert_eq!(page_count(&config.split_dir.join("baker_beth.pdf")), 1);
}

#[tokio::test]
async fn document_without_outline_is_fatal() {
    skip_unless_pdfium!();
    let (_root, config) = config_for(fixture("no_outline.pdf"));

    assert!(matches!(
        split_pdf(&config).await,
        Err(Bio2CsvError::NoBookmarks { .. })
    ));
    assert!(pdf_names(&config.split_dir).is_empty());
}

#[tokio::test]
async fn later_first_content_page_rejects_more() {
    skip_unless_pdfium!();
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .workdir(root.path())
        .source_pdf(fixture("bookmarked.pdf"))
        .first_content_page(7)
        .build()
        .unwrap();

    let stats = split_pdf(&config).await.unwrap();
    assert_eq!(stats.num_pdfs_created, 1);
    assert_eq!(stats.num_rejected, 2);
    assert_eq!(pdf_names(&config.split_dir), ["baker_beth.pdf"]);
}

// ── Split → join ─────────────────────────────────────────────────────────────

#[cfg(unix)]
mod chain {
    use super::*;
    use bio2csv::{extract_texts, join_tables, parse_biographies_with, CompletionClient};
    use std::os::unix::fs::PermissionsExt;

    const FAKE_EXTRACTOR: &str = "#!/bin/sh\necho \"Biography of $(basename \"$1\")\"\n";

    struct TwoPeople;

    impl CompletionClient for TwoPeople {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, String> {
            let (name, born) = if user.contains("aaron_ann") {
                ("Ann Aaron", "1900")
            } else if user.contains("baker_beth") {
                ("Beth Baker", "1911")
            } else {
                return Err("unexpected prompt".to_string());
            };
            Ok(format!(
                r#"{{"full_name": "{name}", "birthdate": "{born}", "deathdate": null,
                    "birthplace": null, "parents": [], "employment": [],
                    "degrees": [{{"degree_institution_name": "Erlangen", "degree_type": "PhD",
                                  "degree_year": 1930, "degree_advisor": null}}],
                    "visits": [], "honors": []}}"#
            ))
        }
    }

    #[tokio::test]
    async fn three_bookmarks_one_malformed_gives_two_people() {
        skip_unless_pdfium!();
        let root = tempfile::tempdir().unwrap();
        let tool = root.path().join("fake-pdf2txt");
        std::fs::write(&tool, FAKE_EXTRACTOR).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let config = PipelineConfig::builder()
            .workdir(root.path().join("work"))
            .source_pdf(fixture("bookmarked.pdf"))
            .extract_tool(tool.to_string_lossy())
            .build()
            .unwrap();

        let split = split_pdf(&config).await.unwrap();
        assert_eq!(split.num_pdfs_created, 2);

        let extract = extract_texts(&config).await.unwrap();
        assert_eq!(extract.num_texts_created, 2);

        let parse = parse_biographies_with(&TwoPeople, &config.text_dir, &config.parse_dir, None)
            .await
            .unwrap();
        assert_eq!(parse.num_jsons_created, 2);
        assert_eq!(parse.num_errors, 0);

        let join = join_tables(&config).await.unwrap();
        assert_eq!(join.num_people, 2);
        assert_eq!(join.num_degrees, 2);

        let personal = std::fs::read_to_string(config.join_dir.join("personal.csv")).unwrap();
        let rows: Vec<&str> = personal.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("Ann Aaron,1900,"));
        assert!(rows[1].starts_with("Beth Baker,1911,"));

        // Personal fields are repeated on every child row.
        let degrees = std::fs::read_to_string(config.join_dir.join("degrees.csv")).unwrap();
        assert!(degrees.lines().skip(1).all(|row| row.contains("Erlangen")));
        assert!(degrees.contains("Ann Aaron") && degrees.contains("Beth Baker"));
    }
}
