//! Stage 3: turn each extracted text into a structured JSON record.
//!
//! One chat request per person, sequentially. The stage is resumable: a
//! person whose `{id}.json` already exists is never sent again, and when
//! every input already has an output the stage returns without building a
//! client (so no credential is needed to re-run a finished pipeline).
//!
//! A request, repair or write failure does not stop the batch. The raw
//! reply, or the error text when there was no reply, is written in place of
//! the JSON
//! so the failure is visible on disk and the person counts as "done" for
//! later runs. Delete the file to retry.

use crate::config::PipelineConfig;
use crate::error::{Bio2CsvError, ItemError};
use crate::output::{ConsistencyReport, ParseStats};
use crate::pipeline::llm::{request_biography, CompletionClient, ProviderClient};
use crate::pipeline::repair::repair_json;
use crate::pipeline::{ensure_dir, file_name, list_files, require_input_dir};
use crate::progress::{ProgressCallback, Stage};
use crate::prompts::biography_prompt;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Person id for a text file: `noether_emmy.pdf.txt` → `noether_emmy`.
pub fn record_id(text_file: &Path) -> String {
    let stem = text_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.replace(".pdf", "")
}

/// Output path for one text file: `out_dir/{id}.json`.
pub fn json_path_for(text_file: &Path, out_dir: &Path) -> PathBuf {
    out_dir.join(format!("{}.json", record_id(text_file)))
}

/// Inputs split by whether their output already exists.
#[derive(Debug, Default)]
struct ParsePlan {
    pending: Vec<PathBuf>,
    existing: usize,
}

fn plan_parse(text_dir: &Path, parse_dir: &Path) -> Result<ParsePlan, Bio2CsvError> {
    let mut plan = ParsePlan::default();
    for text in list_files(text_dir, "txt")? {
        if json_path_for(&text, parse_dir).exists() {
            plan.existing += 1;
        } else {
            plan.pending.push(text);
        }
    }
    Ok(plan)
}

/// Parse every text in `config.text_dir` that has no output yet.
///
/// The LLM client is built from the config only when there is work to do.
pub async fn parse_biographies(config: &PipelineConfig) -> Result<ParseStats, Bio2CsvError> {
    require_input_dir(Stage::Parse, &config.text_dir)?;
    ensure_dir(&config.parse_dir)?;

    let plan = plan_parse(&config.text_dir, &config.parse_dir)?;
    if plan.pending.is_empty() {
        return Ok(skipped_stats(&config.text_dir, &config.parse_dir, plan.existing));
    }

    let client = ProviderClient::from_config(config)?;
    run_plan(
        &client,
        plan,
        &config.text_dir,
        &config.parse_dir,
        config.progress_callback.as_ref(),
    )
    .await
}

/// Same as [`parse_biographies`] with a caller-supplied client.
pub async fn parse_biographies_with<C: CompletionClient>(
    client: &C,
    text_dir: &Path,
    parse_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<ParseStats, Bio2CsvError> {
    require_input_dir(Stage::Parse, text_dir)?;
    ensure_dir(parse_dir)?;

    let plan = plan_parse(text_dir, parse_dir)?;
    if plan.pending.is_empty() {
        return Ok(skipped_stats(text_dir, parse_dir, plan.existing));
    }
    run_plan(client, plan, text_dir, parse_dir, progress).await
}

fn skipped_stats(text_dir: &Path, parse_dir: &Path, existing: usize) -> ParseStats {
    info!(
        "All {} texts already parsed into {}, skipping",
        existing,
        parse_dir.display()
    );
    ParseStats {
        input_from: text_dir.to_path_buf(),
        output_to: parse_dir.to_path_buf(),
        num_texts_processed: existing,
        skipped: true,
        existing_files: existing,
        ..Default::default()
    }
}

async fn run_plan<C: CompletionClient>(
    client: &C,
    plan: ParsePlan,
    text_dir: &Path,
    parse_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<ParseStats, Bio2CsvError> {
    let total = plan.pending.len();
    info!(
        "Parsing {} biographies ({} already done)",
        total, plan.existing
    );
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Parse, total);
    }

    let mut created = 0;
    let mut errors = Vec::new();

    for text_path in &plan.pending {
        let name = file_name(text_path);
        let out = json_path_for(text_path, parse_dir);

        let text = tokio::fs::read_to_string(text_path)
            .await
            .map_err(|e| Bio2CsvError::io(text_path, e))?;
        let prompt = biography_prompt(&text);

        let outcome = match parse_one(client, &name, &prompt).await {
            Ok(record) => write_pretty_json(&out, &record).map_err(|e| {
                let fallback = record.to_string();
                (
                    ItemError::WriteFailed {
                        file: name.clone(),
                        detail: e.to_string(),
                    },
                    fallback,
                )
            }),
            Err(failed) => Err(failed),
        };

        match outcome {
            Ok(()) => {
                debug!("{} → {}", name, out.display());
                created += 1;
                if let Some(cb) = progress {
                    cb.on_item_complete(Stage::Parse, &name);
                }
            }
            Err((item_error, fallback)) => {
                error!("Failed to parse {}: {}", name, item_error);
                if let Err(e) = std::fs::write(&out, fallback) {
                    warn!("Could not write fallback for {}: {}", name, e);
                }
                if let Some(cb) = progress {
                    cb.on_item_error(Stage::Parse, &name, &item_error.to_string());
                }
                errors.push(item_error);
            }
        }
    }

    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Parse, created, total);
    }
    info!(
        "Parsing complete: {}/{} records, {} errors",
        created,
        total,
        errors.len()
    );

    Ok(ParseStats {
        input_from: text_dir.to_path_buf(),
        output_to: parse_dir.to_path_buf(),
        num_jsons_created: created,
        num_texts_processed: total + plan.existing,
        num_errors: errors.len(),
        errors,
        skipped: false,
        existing_files: plan.existing,
    })
}

/// One request + repair. `Err` carries the item error and the text to
/// write in place of the record.
async fn parse_one<C: CompletionClient>(
    client: &C,
    name: &str,
    prompt: &str,
) -> Result<Value, (ItemError, String)> {
    let reply = request_biography(client, prompt).await.map_err(|detail| {
        let fallback = detail.clone();
        (
            ItemError::LlmFailed {
                file: name.to_string(),
                detail,
            },
            fallback,
        )
    })?;

    repair_json(&reply).map_err(|detail| {
        (
            ItemError::RepairFailed {
                file: name.to_string(),
                detail,
            },
            reply,
        )
    })
}

/// Write `value` as JSON with a four-space indent.
pub(crate) fn write_pretty_json(path: &Path, value: &Value) -> Result<(), Bio2CsvError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Bio2CsvError::Internal(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, buf).map_err(|e| Bio2CsvError::io(path, e))
}

/// Compare parser inputs and outputs by person id.
///
/// `passed` is a size comparison of the two id sets; `missing` lists the
/// input ids with no JSON file.
pub fn check_parse_outputs(text_dir: &Path, parse_dir: &Path) -> Result<ConsistencyReport, Bio2CsvError> {
    require_input_dir(Stage::Parse, text_dir)?;

    let inputs: BTreeSet<String> = list_files(text_dir, "txt")?
        .iter()
        .map(|p| record_id(p))
        .collect();
    let outputs: BTreeSet<String> = if parse_dir.is_dir() {
        list_files(parse_dir, "json")?
            .iter()
            .map(|p| record_id(p))
            .collect()
    } else {
        BTreeSet::new()
    };

    let missing: Vec<String> = inputs.difference(&outputs).cloned().collect();
    let passed = inputs.len() == outputs.len();

    if passed {
        info!("Consistency check passed: {} records", outputs.len());
    } else {
        warn!(
            "Consistency check failed: {} inputs, {} outputs, missing {:?}",
            inputs.len(),
            outputs.len(),
            missing
        );
    }

    Ok(ConsistencyReport {
        passed,
        num_inputs: inputs.len(),
        num_outputs: outputs.len(),
        missing,
    })
}
