//! CLI binary for smartreader.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use smartreader::{
    convert_file, Capabilities, ConversionConfig, ConversionProgressCallback, PageSize,
    ProgressCallback, Stage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

/// Spinner that follows the pipeline stages and logs skipped renderers.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let (prefix, msg) = match stage {
            Stage::Classify => ("Reading", "detecting format…"),
            Stage::Extract => ("Extracting", "text and images…"),
            Stage::Assemble => ("Assembling", "paragraphs…"),
            Stage::Render => ("Rendering", "building PDF…"),
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_pages_extracted(&self, pages: usize, images: usize) {
        self.bar.println(format!(
            "  {} {} pages, {} images",
            green("✓"),
            pages,
            images
        ));
    }

    fn on_backend_failed(&self, backend: &str, reason: &str) {
        let msg = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} {:<9} {}", red("✗"), backend, dim(&msg)));
    }

    fn on_conversion_complete(&self, backend: &str, bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} rendered {} bytes with {}",
            green("✔"),
            bold(&bytes.to_string()),
            bold(backend)
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rebuild a PDF (writes reconstructed_handout.pdf.pdf)
  smartreader handout.pdf

  # A phone photo, explicit output path
  smartreader page.jpg -o clean.pdf

  # Skip the browser and use the built-in generator
  smartreader --fallback-only scan.png

  # US Letter with a custom stylesheet
  smartreader --page-size letter --stylesheet print.css notes.pdf

  # Which engines are available on this host?
  smartreader --probe

  # Machine-readable stats (or error report)
  smartreader --json handout.pdf > stats.json

ENVIRONMENT VARIABLES:
  SMARTREADER_CHROMIUM      Browser executable for the primary renderer
  SMARTREADER_PDFIUM_LIB    pdfium shared library (file or directory)
  SMARTREADER_TIMEOUT       Primary renderer timeout in seconds
  SMARTREADER_PASSWORD      Password for encrypted PDFs
  RUST_LOG                  Override log filter (e.g. smartreader=debug)
"#;

/// Rebuild a clean, reflowed PDF from a PDF or image.
#[derive(Parser, Debug)]
#[command(
    name = "smartreader",
    version,
    about = "Rebuild a clean, reflowed PDF from a PDF or image",
    long_about = "Extracts text and images from a PDF or still image, regroups the text into \
paragraphs, and renders a fresh PDF. Uses a headless Chromium-family browser when one is \
installed and falls back to a built-in generator otherwise.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image file to reconstruct.
    #[arg(required_unless_present = "probe")]
    input: Option<PathBuf>,

    /// Output PDF path. Default: reconstructed_<input name>.pdf
    #[arg(short, long, env = "SMARTREADER_OUTPUT")]
    output: Option<PathBuf>,

    /// Never launch a browser; use the built-in generator.
    #[arg(long, env = "SMARTREADER_FALLBACK_ONLY")]
    fallback_only: bool,

    /// Browser executable for the primary renderer.
    #[arg(long, env = "SMARTREADER_CHROMIUM")]
    chromium: Option<PathBuf>,

    /// pdfium shared library, or a directory containing it.
    #[arg(long, env = "SMARTREADER_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Primary renderer timeout in seconds.
    #[arg(long, env = "SMARTREADER_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=600))]
    timeout: u64,

    /// Output paper size: a4 or letter.
    #[arg(long, env = "SMARTREADER_PAGE_SIZE", default_value = "a4")]
    page_size: PageSize,

    /// CSS file replacing the built-in stylesheet of the primary renderer.
    #[arg(long, env = "SMARTREADER_STYLESHEET")]
    stylesheet: Option<PathBuf>,

    /// Document title written into the output.
    #[arg(long, env = "SMARTREADER_TITLE")]
    title: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SMARTREADER_PASSWORD")]
    password: Option<String>,

    /// Print stats (or the error report) as JSON on stdout.
    #[arg(long, env = "SMARTREADER_JSON")]
    json: bool,

    /// Print the capability table and exit.
    #[arg(long)]
    probe: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SMARTREADER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SMARTREADER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives enough feedback by default; library INFO logs are
    // only shown when the spinner is off.
    let show_progress = !cli.quiet && !cli.json && !cli.probe;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Probe mode ───────────────────────────────────────────────────────
    if cli.probe {
        let caps = Capabilities::probe(&config);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&caps).context("Failed to serialise capabilities")?
            );
        } else {
            print_capabilities(&caps);
        }
        return Ok(());
    }

    // clap enforces INPUT unless --probe.
    let input = cli.input.as_deref().context("No input file given")?;
    let output = cli.output.clone().unwrap_or_else(|| default_output(input));

    // ── Run conversion ───────────────────────────────────────────────────
    match convert_file(input, &output, config).await {
        Ok(stats) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {} {} blocks  {}ms  →  {}",
                    green("✔"),
                    stats.source_format,
                    stats.pages,
                    stats.total_duration_ms,
                    bold(&output.display().to_string()),
                );
            }
            Ok(())
        }
        Err(err) if cli.json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&err.to_report())
                    .context("Failed to serialise error report")?
            );
            std::process::exit(1);
        }
        Err(err) => Err(err).context("Conversion failed"),
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .primary_timeout_secs(cli.timeout)
        .disable_primary(cli.fallback_only)
        .page_size(cli.page_size);

    if let Some(ref path) = cli.stylesheet {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stylesheet from {:?}", path))?;
        builder = builder.stylesheet(css);
    }
    if let Some(ref path) = cli.chromium {
        builder = builder.chromium_path(path);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `reconstructed_<input file name>.pdf` in the working directory.
fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("reconstructed_{name}.pdf"))
}

fn print_capabilities(caps: &Capabilities) {
    use smartreader::Availability;

    match &caps.pdf_reader {
        Availability::Available(lib) => println!("pdf_reader:   {} ({})", green("available"), lib),
        Availability::Unavailable(why) => println!("pdf_reader:   {} ({})", red("unavailable"), why),
    }
    match &caps.html_engine {
        Availability::Available(path) => {
            println!("html_engine:  {} ({})", green("available"), path.display())
        }
        Availability::Unavailable(why) => println!("html_engine:  {} ({})", red("unavailable"), why),
    }
    println!("fallback:     {} (built in)", green("available"));
}
