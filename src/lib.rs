//! # bio2csv
//!
//! Turn a bookmarked PDF of biographical entries into flat CSV tables.
//!
//! ## Why this crate?
//!
//! Reference works such as biographical dictionaries are published as one
//! long PDF with an outline entry per person. The text is prose, so a
//! regex extractor cannot pull out degrees, employers or parents reliably.
//! This crate splits the book into one PDF per person, extracts the text,
//! asks an LLM for a fixed JSON schema per person, and joins the records
//! into tables that load straight into a spreadsheet or dataframe.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source.pdf
//!  │
//!  ├─ 1. Split    outline → one {last}_{first}.pdf per person (pdfium)
//!  ├─ 2. Extract  external tool → {slug}.pdf.txt
//!  ├─ 3. Parse    one chat request per text → {slug}.json (skip if present)
//!  └─ 4. Join     personal / degrees / employment / visits / honors / parents .csv
//! ```
//!
//! Stages communicate only through their output directories, so each can be
//! run on its own and re-running the parser after a partial failure only
//! pays for the missing people.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bio2csv::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from OPENAI_API_KEY
//!     let config = PipelineConfig::builder()
//!         .workdir("data")
//!         .source_pdf("data/PioneeringWomenSupplement.pdf")
//!         .build()?;
//!     let report = run_pipeline(&config).await?;
//!     if let Some(join) = report.join {
//!         eprintln!("{} people, {} degrees", join.num_people, join.num_degrees);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bio2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bio2csv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{Bio2CsvError, ItemError};
pub use output::{
    ConsistencyReport, ExtractStats, JoinStats, ParseStats, PipelineReport, SplitStats,
};
pub use pipeline::extract::extract_texts;
pub use pipeline::join::join_tables;
pub use pipeline::llm::{CompletionClient, ProviderClient};
pub use pipeline::parse::{check_parse_outputs, parse_biographies, parse_biographies_with};
pub use pipeline::split::split_pdf;
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, StageProgressCallback};
pub use run::{run_pipeline, run_pipeline_sync};
