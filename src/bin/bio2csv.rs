//! CLI binary for bio2csv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs one stage (or all of them) and prints the stats.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use bio2csv::{
    check_parse_outputs, extract_texts, join_tables, parse_biographies, run_pipeline, split_pdf,
    ConsistencyReport, ExtractStats, JoinStats, ParseStats, PipelineConfig, PipelineReport,
    ProgressCallback, SplitStats, Stage, StageProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// One bar, re-armed at the start of every stage, with a log line per
/// failed item printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        self.errors.store(0, Ordering::SeqCst);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>4}/{len}  {msg}  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_prefix(format!("{stage:<7}"));
        self.bar.set_message("");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{stage}: {total} items"))
        ));
    }

    fn on_item_complete(&self, _stage: Stage, item: &str) {
        self.bar.set_message(item.to_string());
        self.bar.inc(1);
    }

    fn on_item_error(&self, _stage: Stage, item: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), item, red(&msg)));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, succeeded: usize, total: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.println(if failed == 0 {
            format!(
                "{} {}: {}/{} done",
                green("✔"),
                stage,
                bold(&succeeded.to_string()),
                total
            )
        } else {
            format!(
                "{} {}: {}/{} done  ({} failed)",
                cyan("⚠"),
                stage,
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string())
            )
        });
        self.bar.set_prefix("Preparing");
        self.bar.set_message("");
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole pipeline on data/source.pdf
  bio2csv run

  # Whole pipeline, explicit source and working directory
  bio2csv --workdir out --input PioneeringWomenSupplement.pdf run

  # Re-run only the parser (people with an existing JSON are skipped)
  bio2csv parse

  # Compare parser inputs and outputs, machine-readable
  bio2csv check --json

  # Use pdftotext instead of pdfminer's pdf2txt.py (any `<tool> <pdf>` that
  # prints text on stdout works)
  bio2csv --extract-tool pdftotext-stdout extract

LAYOUT (under --workdir, default `data`):
  source.pdf     bookmarked input (override with --input)
  split/         {last}_{first}.pdf per person
  extract/       {last}_{first}.pdf.txt
  parse/         {last}_{first}.json
  join/          personal, degrees, employment, visits, honors, parents .csv

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY   API key for the parse stage (only needed when work remains)
  PDFIUM_LIB_PATH  Path to libpdfium (file or directory) for the split stage
  RUST_LOG         Overrides -v / -q log filtering
"#;

/// Split a bookmarked PDF of biographies and turn it into CSV tables.
#[derive(Parser, Debug)]
#[command(
    name = "bio2csv",
    version,
    about = "Split a bookmarked PDF of biographies and turn it into CSV tables",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root of the default directory layout.
    #[arg(long, global = true, env = "BIO2CSV_WORKDIR", default_value = "data")]
    workdir: PathBuf,

    /// Bookmarked source PDF (default: <workdir>/source.pdf).
    #[arg(short, long, global = true, env = "BIO2CSV_INPUT")]
    input: Option<PathBuf>,

    /// Split output directory (default: <workdir>/split).
    #[arg(long, global = true)]
    split_dir: Option<PathBuf>,

    /// Extract output directory (default: <workdir>/extract).
    #[arg(long, global = true)]
    text_dir: Option<PathBuf>,

    /// Parse output directory (default: <workdir>/parse).
    #[arg(long, global = true)]
    parse_dir: Option<PathBuf>,

    /// Join output directory (default: <workdir>/join).
    #[arg(long, global = true)]
    join_dir: Option<PathBuf>,

    /// Bookmarks before this 1-based page are front matter.
    #[arg(long, global = true, default_value_t = bio2csv::config::DEFAULT_FIRST_CONTENT_PAGE)]
    first_content_page: usize,

    /// Text extraction command, invoked as `<tool> <pdf>`.
    #[arg(long, global = true, env = "BIO2CSV_EXTRACT_TOOL",
          default_value = bio2csv::config::DEFAULT_EXTRACT_TOOL)]
    extract_tool: String,

    /// LLM API key.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print stage stats as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "BIO2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Split the source PDF into one PDF per bookmarked person.
    Split,
    /// Extract text from every split PDF.
    Extract,
    /// Parse every text into JSON with the LLM.
    Parse,
    /// Compare parser inputs and outputs; exits 1 when outputs are missing.
    Check,
    /// Join the JSON records into six CSV tables.
    Join,
    /// Run split, extract, parse, check and join in order.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active only errors and per-item warnings are
    // worth interleaving; the bar covers the rest.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StageProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Dispatch ─────────────────────────────────────────────────────────
    match cli.command {
        Command::Split => {
            let stats = split_pdf(&config).await.context("Split failed")?;
            emit(&cli, &stats, print_split)?;
        }
        Command::Extract => {
            let stats = extract_texts(&config).await.context("Extraction failed")?;
            emit(&cli, &stats, print_extract)?;
        }
        Command::Parse => {
            let stats = parse_biographies(&config).await.context("Parsing failed")?;
            emit(&cli, &stats, print_parse)?;
        }
        Command::Check => {
            let report = check_parse_outputs(&config.text_dir, &config.parse_dir)
                .context("Consistency check failed")?;
            emit(&cli, &report, print_check)?;
            if !report.passed {
                std::process::exit(1);
            }
        }
        Command::Join => {
            let stats = join_tables(&config).await.context("Join failed")?;
            emit(&cli, &stats, print_join)?;
        }
        Command::Run => {
            let report = run_pipeline(&config).await.context("Pipeline failed")?;
            emit(&cli, &report, print_report)?;
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .workdir(&cli.workdir)
        .first_content_page(cli.first_content_page)
        .extract_tool(cli.extract_tool.clone());

    if let Some(ref p) = cli.input {
        builder = builder.source_pdf(p);
    }
    if let Some(ref p) = cli.split_dir {
        builder = builder.split_dir(p);
    }
    if let Some(ref p) = cli.text_dir {
        builder = builder.text_dir(p);
    }
    if let Some(ref p) = cli.parse_dir {
        builder = builder.parse_dir(p);
    }
    if let Some(ref p) = cli.join_dir {
        builder = builder.join_dir(p);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref p) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(p);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── Output ───────────────────────────────────────────────────────────────────

/// Print `value` as JSON on stdout, or the human summary on stderr.
fn emit<T: Serialize>(cli: &Cli, value: &T, human: fn(&T)) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(value).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        human(value);
    }
    Ok(())
}

fn tick(ok: bool) -> String {
    if ok {
        green("✔")
    } else {
        cyan("⚠")
    }
}

fn print_split(s: &SplitStats) {
    eprintln!(
        "{}  {} PDFs from {} bookmarks ({} skipped)  →  {}",
        tick(true),
        bold(&s.num_pdfs_created.to_string()),
        s.num_bookmarks,
        s.num_rejected,
        s.output_to.display()
    );
}

fn print_extract(s: &ExtractStats) {
    eprintln!(
        "{}  {}/{} texts  →  {}",
        tick(s.errors.is_empty()),
        bold(&s.num_texts_created.to_string()),
        s.num_pdfs_processed,
        s.output_to.display()
    );
    for e in &s.errors {
        eprintln!("   {} {}", red("✗"), dim(&e.to_string()));
    }
}

fn print_parse(s: &ParseStats) {
    if s.skipped {
        eprintln!(
            "{}  nothing to do, {} records already in {}",
            tick(true),
            s.existing_files,
            s.output_to.display()
        );
        return;
    }
    eprintln!(
        "{}  {}/{} records ({} already present)  →  {}",
        tick(s.num_errors == 0),
        bold(&s.num_jsons_created.to_string()),
        s.num_texts_processed,
        s.existing_files,
        s.output_to.display()
    );
    for e in &s.errors {
        eprintln!("   {} {}", red("✗"), dim(&e.to_string()));
    }
}

fn print_check(r: &ConsistencyReport) {
    eprintln!(
        "{}  {} inputs, {} outputs",
        if r.passed { green("✔") } else { red("✘") },
        r.num_inputs,
        r.num_outputs
    );
    if !r.missing.is_empty() {
        eprintln!("   missing: {}", r.missing.join(", "));
    }
}

fn print_join(s: &JoinStats) {
    eprintln!(
        "{}  {} people  {} degrees  {} jobs  {} visits  {} honors  {} parents  →  {}",
        tick(s.num_load_errors == 0),
        bold(&s.num_people.to_string()),
        s.num_degrees,
        s.num_employment_records,
        s.num_visits,
        s.num_honors,
        s.num_parents,
        s.output_to.display()
    );
    if s.num_load_errors > 0 {
        eprintln!("   {} unreadable records skipped", red(&s.num_load_errors.to_string()));
    }
}

fn print_report(r: &PipelineReport) {
    if let Some(ref s) = r.split {
        print_split(s);
    }
    if let Some(ref s) = r.extract {
        print_extract(s);
    }
    if let Some(ref s) = r.parse {
        print_parse(s);
    }
    if let Some(ref c) = r.check {
        print_check(c);
    }
    if let Some(ref s) = r.join {
        print_join(s);
    }
    eprintln!("   {}", dim(&format!("{}ms total", r.total_duration_ms)));
}
