//! Run metadata reported by each stage.
//!
//! Stats are a side-channel for observability only: nothing here is
//! persisted, and a stage with per-item errors still returns `Ok(stats)`.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of the bookmark splitter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitStats {
    pub input_from: PathBuf,
    pub output_to: PathBuf,
    /// Outline entries seen, accepted or not.
    pub num_bookmarks: usize,
    pub num_pdfs_created: usize,
    /// Front matter, section headers and malformed titles.
    pub num_rejected: usize,
}

/// Result of the text extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractStats {
    pub input_from: PathBuf,
    pub output_to: PathBuf,
    pub num_texts_created: usize,
    pub num_pdfs_processed: usize,
    pub errors: Vec<ItemError>,
}

/// Result of the biography parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    pub input_from: PathBuf,
    pub output_to: PathBuf,
    pub num_jsons_created: usize,
    /// Every text in the input directory, including already-parsed ones.
    pub num_texts_processed: usize,
    pub num_errors: usize,
    pub errors: Vec<ItemError>,
    /// True when every input already had an output and no request was made.
    pub skipped: bool,
    /// Outputs that were present before this run.
    pub existing_files: usize,
}

/// Post-hoc data-quality gate comparing parser inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub passed: bool,
    pub num_inputs: usize,
    pub num_outputs: usize,
    /// Input ids (slugs) with no JSON output, sorted.
    pub missing: Vec<String>,
}

/// Result of the table joiner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinStats {
    pub input_from: PathBuf,
    pub output_to: PathBuf,
    pub num_people: usize,
    pub num_degrees: usize,
    pub num_employment_records: usize,
    pub num_visits: usize,
    pub num_honors: usize,
    pub num_parents: usize,
    pub num_load_errors: usize,
}

/// Stats of a full `run` (stages that did not run are `None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub split: Option<SplitStats>,
    pub extract: Option<ExtractStats>,
    pub parse: Option<ParseStats>,
    pub check: Option<ConsistencyReport>,
    pub join: Option<JoinStats>,
    pub total_duration_ms: u64,
}
