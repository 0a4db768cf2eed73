//! Full pipeline driver: split → extract → parse → check → join.
//!
//! Stages run strictly one after another. A fatal error in any stage
//! returns immediately and the downstream stages never start; per-item
//! failures only show up in the stage's stats.

use crate::config::PipelineConfig;
use crate::error::Bio2CsvError;
use crate::output::PipelineReport;
use crate::pipeline::{extract, join, parse, split};
use std::time::Instant;
use tracing::info;

/// Run all four stages in order, plus the parser consistency check.
///
/// # Errors
/// The first fatal [`Bio2CsvError`] raised by any stage.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport, Bio2CsvError> {
    let total_start = Instant::now();
    let mut report = PipelineReport::default();
    info!("Starting pipeline on {}", config.source_pdf.display());

    // ── Stage 1: Split ───────────────────────────────────────────────────
    report.split = Some(split::split_pdf(config).await?);

    // ── Stage 2: Extract ─────────────────────────────────────────────────
    report.extract = Some(extract::extract_texts(config).await?);

    // ── Stage 3: Parse (+ consistency gate) ──────────────────────────────
    report.parse = Some(parse::parse_biographies(config).await?);
    report.check = Some(parse::check_parse_outputs(&config.text_dir, &config.parse_dir)?);

    // ── Stage 4: Join ────────────────────────────────────────────────────
    report.join = Some(join::join_tables(config).await?);

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!("Pipeline finished in {}ms", report.total_duration_ms);
    Ok(report)
}

/// Blocking wrapper around [`run_pipeline`] for non-async callers.
pub fn run_pipeline_sync(config: &PipelineConfig) -> Result<PipelineReport, Bio2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Bio2CsvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_pipeline(config))
}
