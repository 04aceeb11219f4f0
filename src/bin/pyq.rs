//! CLI binary for pyq-analyzer.
//!
//! A thin shim over the library crate: maps CLI flags to `AnalysisConfig`,
//! drives a `Session` through one analysis and prints or exports the result.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pyq_analyzer::analyze::{resolve_client, DOWNLOAD_TIMEOUT_SECS};
use pyq_analyzer::export::{export_to_dir, ExportFormat};
use pyq_analyzer::pipeline::intake::load_inputs;
use pyq_analyzer::{
    spawn_analysis, AnalysisConfig, AnalysisProgressCallback, Preferences, ProgressCallback,
    Renderer, ResultTab, Session, SessionState, SharedSession, Theme,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI helpers for status lines on stderr ──────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner on stderr: one line per loaded file, then a live message while
/// the model is working.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let template = "{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}";
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Loading");
        bar.set_message("Reading question papers…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_file_loaded(&self, index: usize, total: usize, name: &str, bytes: u64) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2} {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{:.1} KiB", bytes as f64 / 1024.0)),
        ));
    }

    fn on_request_start(&self, files: usize, model: &str) {
        self.bar.set_prefix("Analysing");
        self.bar
            .set_message(format!("{files} file(s) with {model}… this can take a minute"));
    }

    fn on_response_received(&self, response_chars: usize, elapsed_ms: u64) {
        self.bar.set_prefix("Validating");
        self.bar.set_message(format!(
            "{response_chars} chars in {:.1}s",
            elapsed_ms as f64 / 1000.0
        ));
    }

    fn on_analysis_complete(&self, entries: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} Analysis complete ({} entries)", green("✔"), bold(&entries.to_string()));
    }

    fn on_analysis_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse three papers and show every section
  pyq physics-2021.pdf physics-2022.jpg physics-2023.png

  # Show only the top-15 list
  pyq --section top15 papers/*.pdf

  # Export PDF and text reports into ./reports
  pyq --format both --output-dir reports papers/*.pdf

  # Machine-readable output
  pyq --json papers/*.jpg > analysis.json

  # Switch the saved colour theme
  pyq --toggle-theme

SUPPORTED FILES:
  Images (PNG, JPEG, WebP, GIF, BMP, TIFF, HEIC/HEIF) and PDF, local paths or
  http(s) URLs. All files are sent in a single request, in the given order.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     Google Gemini API key (API_KEY is accepted as a fallback)
  PYQ_MODEL          Override model ID (default: gemini-2.5-flash)
  PYQ_PROVIDER       Use an edgequake-llm provider instead (openai, anthropic, …)
  PYQ_API_TIMEOUT    Analysis call timeout in seconds (default: 120)
  PYQ_OUTPUT_DIR     Directory for exported reports (default: .)
  PYQ_CONFIG_DIR     Directory holding pyq-analyzer/preferences.json
  PDFIUM_LIB_PATH    Path to libpdfium, needed for --format pdf
  PYQ_PDF_FONT       TrueType font for PDF export (maths symbols, non-Latin text)
  RUST_LOG           Override log filter (e.g. pyq_analyzer=debug)
"#;

/// Find repeated and important questions in previous-year exam papers.
#[derive(Parser, Debug)]
#[command(
    name = "pyq",
    version,
    about = "Find repeated and important questions in previous-year exam papers",
    long_about = "Send scanned previous-year question papers (images or PDFs) to a multimodal \
model in one request and get back repeated questions with counts and years, important \
questions, a top-15 list and revision notes. Results can be exported to PDF or text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Question papers: local paths or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "toggle_theme")]
    files: Vec<String>,

    /// Export format.
    #[arg(short, long, env = "PYQ_FORMAT", value_enum, default_value = "none")]
    format: FormatArg,

    /// Directory for exported reports.
    #[arg(short, long, env = "PYQ_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Show one section only: repeated, important, top15, notes.
    #[arg(short, long)]
    section: Option<String>,

    /// Print the result as JSON instead of the formatted sections.
    #[arg(long)]
    json: bool,

    /// Model ID (e.g. gemini-2.5-flash, gemini-2.5-pro).
    #[arg(long, env = "PYQ_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider to use instead of the native Gemini client.
    #[arg(long, env = "PYQ_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Analysis call timeout in seconds.
    #[arg(long, env = "PYQ_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PYQ_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens for the analysis.
    #[arg(long, env = "PYQ_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PYQ_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Colour theme for this run (does not change the saved preference).
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Flip and save the light/dark preference.
    #[arg(long)]
    toggle_theme: bool,

    /// Disable coloured output.
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PYQ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Pdf,
    Txt,
    Both,
    #[value(name = "none")]
    Skip,
}

impl FormatArg {
    fn formats(self) -> Vec<ExportFormat> {
        match self {
            FormatArg::Pdf => vec![ExportFormat::Pdf],
            FormatArg::Txt => vec![ExportFormat::Text],
            FormatArg::Both => vec![ExportFormat::Pdf, ExportFormat::Text],
            FormatArg::Skip => vec![],
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; library INFO logs
    // only show when it is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Preferences ──────────────────────────────────────────────────────
    let mut prefs = Preferences::load();
    if cli.toggle_theme {
        let theme = prefs.toggle_theme();
        let path = prefs.save().context("Failed to save theme preference")?;
        if !cli.quiet {
            eprintln!(
                "Theme set to {} ({})",
                bold(&theme.to_string()),
                dim(&path.display().to_string())
            );
        }
        if cli.files.is_empty() {
            return Ok(());
        }
    }
    let theme = cli.theme.map(Theme::from).unwrap_or(prefs.theme);
    let color = !cli.no_color && io::stdout().is_terminal();
    let renderer = Renderer::new(theme, color);

    let section = cli
        .section
        .as_deref()
        .map(str::parse::<ResultTab>)
        .transpose()
        .context("Invalid --section")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb.clone()).await?;

    // Fail on a missing key before touching any file.
    resolve_client(&config).context("Cannot start analysis")?;

    // ── Intake ───────────────────────────────────────────────────────────
    let files = load_inputs(&cli.files, DOWNLOAD_TIMEOUT_SECS, progress_cb.as_ref())
        .await
        .context("Failed to load question papers")?;

    let session: SharedSession = Arc::new(Mutex::new(Session::new()));
    {
        let mut s = lock(&session)?;
        for file in files {
            s.add_file(file)?;
        }
    }

    // ── Run analysis ─────────────────────────────────────────────────────
    let handle = spawn_analysis(&session, config).context("Cannot submit files")?;
    tokio::select! {
        joined = handle => {
            joined.context("Analysis task panicked")?;
        }
        _ = tokio::signal::ctrl_c() => {
            lock(&session)?.reset();
            eprintln!("{}", dim("Cancelled."));
            std::process::exit(130);
        }
    }

    let result = {
        let s = lock(&session)?;
        match s.state() {
            SessionState::Completed => s
                .result()
                .cloned()
                .ok_or_else(|| anyhow!("session completed without a result"))?,
            SessionState::Error => {
                if !show_progress {
                    eprintln!("{}", renderer.status(&s));
                }
                bail!("Analysis failed: {}", s.error().unwrap_or("unknown error"));
            }
            other => bail!("Analysis ended in unexpected state '{other}'"),
        }
    };

    // ── Present ──────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        let text = match section {
            Some(tab) => renderer.render_tab(&result, tab),
            None => renderer.render_all(&result),
        };
        print!("{text}");
    }

    // ── Export ───────────────────────────────────────────────────────────
    for format in cli.format.formats() {
        let path = export_to_dir(&result, format, &cli.output_dir)
            .await
            .with_context(|| format!("Failed to export {format} report"))?;
        if !cli.quiet {
            eprintln!("{} Saved {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

fn lock(session: &SharedSession) -> Result<std::sync::MutexGuard<'_, Session>> {
    session.lock().map_err(|_| anyhow!("session lock poisoned"))
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
