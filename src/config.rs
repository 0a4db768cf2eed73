//! Configuration for the four-stage pipeline.
//!
//! Every stage reads its directories and knobs from one [`PipelineConfig`],
//! built via [`PipelineConfigBuilder`]. The pipeline communicates only
//! through the filesystem, so the config is mostly a list of directories:
//! each stage reads from its predecessor's output directory and writes to
//! its own.
//!
//! The LLM credential is an explicit config value with a documented
//! environment fallback (`OPENAI_API_KEY`), resolved by
//! [`PipelineConfig::resolve_api_key`] only when the parser actually has
//! work to do.

use crate::error::Bio2CsvError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable consulted when no explicit API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default external text-extraction command (ships with pdfminer.six).
pub const DEFAULT_EXTRACT_TOOL: &str = "pdf2txt.py";

/// Bookmarks targeting a page before this one are front matter.
pub const DEFAULT_FIRST_CONTENT_PAGE: usize = 6;

/// Configuration for a pipeline run.
///
/// # Example
/// ```rust
/// use bio2csv::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .workdir("data")
///     .source_pdf("data/PioneeringWomenSupplement.pdf")
///     .build()
///     .unwrap();
/// assert!(config.text_dir.ends_with("extract"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// The bookmarked source PDF consumed by the splitter.
    pub source_pdf: PathBuf,

    /// Output of the splitter: one `{slug}.pdf` per person.
    pub split_dir: PathBuf,

    /// Output of the extractor: one `{slug}.pdf.txt` per person.
    pub text_dir: PathBuf,

    /// Output of the parser: one `{slug}.json` per person.
    pub parse_dir: PathBuf,

    /// Output of the joiner: six CSV tables.
    pub join_dir: PathBuf,

    /// Bookmarks before this 1-based page are skipped. Default: 6.
    pub first_content_page: usize,

    /// Command invoked as `<tool> <pdf>`; must print the text on stdout.
    pub extract_tool: String,

    /// Explicit LLM API key. Falls back to `OPENAI_API_KEY` when `None`.
    pub api_key: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `api_key`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Explicit pdfium shared-library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_workdir("data")
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("source_pdf", &self.source_pdf)
            .field("split_dir", &self.split_dir)
            .field("text_dir", &self.text_dir)
            .field("parse_dir", &self.parse_dir)
            .field("join_dir", &self.join_dir)
            .field("first_content_page", &self.first_content_page)
            .field("extract_tool", &self.extract_tool)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default layout under `root`: `source.pdf`, `split/`, `extract/`,
    /// `parse/`, `join/`.
    pub fn with_workdir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            source_pdf: root.join("source.pdf"),
            split_dir: root.join("split"),
            text_dir: root.join("extract"),
            parse_dir: root.join("parse"),
            join_dir: root.join("join"),
            first_content_page: DEFAULT_FIRST_CONTENT_PAGE,
            extract_tool: DEFAULT_EXTRACT_TOOL.to_string(),
            api_key: None,
            provider: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }

    /// Resolve the LLM credential: explicit value first, then
    /// `OPENAI_API_KEY`. Empty strings count as unset.
    pub fn resolve_api_key(&self) -> Result<String, Bio2CsvError> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        resolve_key(self.api_key.as_deref(), env_key.as_deref())
    }
}

fn resolve_key(explicit: Option<&str>, env: Option<&str>) -> Result<String, Bio2CsvError> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or(env.filter(|k| !k.trim().is_empty()))
        .map(str::to_string)
        .ok_or_else(|| Bio2CsvError::MissingCredential {
            hint: format!("Pass --api-key or set {API_KEY_ENV}."),
        })
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Re-root all four stage directories (and the default source path).
    /// Call before the per-directory setters.
    pub fn workdir(mut self, root: impl AsRef<Path>) -> Self {
        let fresh = PipelineConfig::with_workdir(root);
        self.config.source_pdf = fresh.source_pdf;
        self.config.split_dir = fresh.split_dir;
        self.config.text_dir = fresh.text_dir;
        self.config.parse_dir = fresh.parse_dir;
        self.config.join_dir = fresh.join_dir;
        self
    }

    pub fn source_pdf(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_pdf = path.into();
        self
    }

    pub fn split_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.split_dir = path.into();
        self
    }

    pub fn text_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.text_dir = path.into();
        self
    }

    pub fn parse_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.parse_dir = path.into();
        self
    }

    pub fn join_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.join_dir = path.into();
        self
    }

    pub fn first_content_page(mut self, page: usize) -> Self {
        self.config.first_content_page = page;
        self
    }

    pub fn extract_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.extract_tool = tool.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Bio2CsvError> {
        let c = &self.config;
        if c.first_content_page == 0 {
            return Err(Bio2CsvError::InvalidConfig(
                "first content page is 1-based, got 0".into(),
            ));
        }
        if c.extract_tool.trim().is_empty() {
            return Err(Bio2CsvError::InvalidConfig(
                "extract tool must not be empty".into(),
            ));
        }
        let dirs = [&c.split_dir, &c.text_dir, &c.parse_dir, &c.join_dir];
        for (i, a) in dirs.iter().enumerate() {
            if dirs[i + 1..].contains(a) {
                return Err(Bio2CsvError::InvalidConfig(format!(
                    "stage directories must be distinct, '{}' is used twice",
                    a.display()
                )));
            }
        }
        Ok(self.config)
    }
}
