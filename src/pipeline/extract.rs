//! Stage 2: extract raw text from every per-person PDF.
//!
//! The extraction tool is an external command invoked as `<tool> <pdf>`
//! that prints the text on stdout (pdfminer.six's `pdf2txt.py` by default).
//! Its stdout is written verbatim to `{pdf file name}.txt`.
//!
//! A tool that runs but exits non-zero is a per-file failure: logged,
//! recorded, no output file, and the batch continues. A tool that cannot be
//! spawned because it does not exist is a configuration error and aborts the
//! stage.

use crate::config::PipelineConfig;
use crate::error::{Bio2CsvError, ItemError};
use crate::output::ExtractStats;
use crate::pipeline::{ensure_dir, file_name, list_files, require_input_dir};
use crate::progress::Stage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Output path for one PDF: `a_b.pdf` → `out_dir/a_b.pdf.txt`.
pub fn text_path_for(pdf: &Path, out_dir: &Path) -> PathBuf {
    out_dir.join(format!("{}.txt", file_name(pdf)))
}

/// Run the extraction tool over every `*.pdf` in `config.split_dir`.
pub async fn extract_texts(config: &PipelineConfig) -> Result<ExtractStats, Bio2CsvError> {
    require_input_dir(Stage::Extract, &config.split_dir)?;
    ensure_dir(&config.text_dir)?;

    let pdfs = list_files(&config.split_dir, "pdf")?;
    info!(
        "Extracting text from {} PDFs with '{}'",
        pdfs.len(),
        config.extract_tool
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Extract, pdfs.len());
    }

    let mut created = 0;
    let mut errors = Vec::new();

    for pdf in &pdfs {
        let name = file_name(pdf);
        match run_tool(&config.extract_tool, pdf).await? {
            Ok(text) => {
                let out = text_path_for(pdf, &config.text_dir);
                tokio::fs::write(&out, &text)
                    .await
                    .map_err(|e| Bio2CsvError::io(&out, e))?;
                debug!("{} → {} ({} bytes)", name, out.display(), text.len());
                created += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_complete(Stage::Extract, &name);
                }
            }
            Err(detail) => {
                warn!("Failed to extract text from {}: {}", name, detail);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(Stage::Extract, &name, &detail);
                }
                errors.push(ItemError::ExtractionFailed { file: name, detail });
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(Stage::Extract, created, pdfs.len());
    }
    info!("Extraction complete: {}/{} texts", created, pdfs.len());

    Ok(ExtractStats {
        input_from: config.split_dir.clone(),
        output_to: config.text_dir.clone(),
        num_texts_created: created,
        num_pdfs_processed: pdfs.len(),
        errors,
    })
}

/// Invoke the tool once.
///
/// Outer `Err` is fatal (tool missing); inner `Err` is the per-file failure
/// description (non-zero exit, or any other spawn problem).
async fn run_tool(tool: &str, pdf: &Path) -> Result<Result<Vec<u8>, String>, Bio2CsvError> {
    let output = match Command::new(tool).arg(pdf).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Bio2CsvError::ExtractorNotFound {
                tool: tool.to_string(),
            })
        }
        Err(e) => return Ok(Err(format!("failed to run '{tool}': {e}"))),
    };

    if output.status.success() {
        return Ok(Ok(output.stdout));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    Ok(Err(if stderr.is_empty() {
        format!("'{tool}' exited with {}", output.status)
    } else {
        format!("'{tool}' exited with {}: {}", output.status, stderr)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_name_keeps_pdf_suffix() {
        let p = text_path_for(Path::new("split/noether_emmy.pdf"), Path::new("extract"));
        assert_eq!(p, PathBuf::from("extract/noether_emmy.pdf.txt"));
    }

    #[tokio::test]
    async fn missing_tool_is_fatal() {
        let err = run_tool("definitely-not-an-installed-tool-1234", Path::new("x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Bio2CsvError::ExtractorNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_per_file() {
        // `false` ignores its argument and exits 1.
        let res = run_tool("false", Path::new("x.pdf")).await.unwrap();
        let detail = res.unwrap_err();
        assert!(detail.contains("'false' exited"), "got: {detail}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_captured_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a_b.pdf");
        std::fs::write(&pdf, "line one\n  line two\n").unwrap();
        let text = run_tool("cat", &pdf).await.unwrap().unwrap();
        assert_eq!(text, b"line one\n  line two\n");
    }

    #[tokio::test]
    async fn missing_split_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_workdir(dir.path());
        let err = extract_texts(&config).await.unwrap_err();
        assert!(matches!(err, Bio2CsvError::StageInputMissing { .. }));
    }
}
