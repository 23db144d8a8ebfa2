//! CLI binary for edgequake-pdf-translate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TranslationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_translate::pipeline::input::default_output_path;
use edgequake_pdf_translate::{
    inspect, translate_pdf, Backend, BlockId, Outcome, PageSelection, ProgressCallback,
    TranslationConfig, TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live block counter. Blocks complete out of order, so only fallbacks get a
/// log line; successes just advance the bar.
struct CliProgressCallback {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting text blocks…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} blocks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_translation_start(&self, total_blocks: usize) {
        self.activate_bar(total_blocks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_blocks} text blocks…"))
        ));
    }

    fn on_block_complete(&self, id: BlockId, _completed: usize, _total: usize, outcome: &Outcome) {
        if let Outcome::Fallback(reason) = outcome {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
            let msg = reason.to_string();
            let msg = if msg.chars().count() > 80 {
                format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
            } else {
                msg
            };
            self.bar.println(format!(
                "  {} Block {:<10}  {}",
                yellow("⚠"),
                id.to_string(),
                dim(&msg)
            ));
        }
        self.bar.inc(1);
    }

    fn on_translation_complete(&self, total_blocks: usize, translated: usize, fallbacks: usize) {
        self.bar.finish_and_clear();
        if fallbacks == 0 {
            eprintln!(
                "{} {} blocks translated",
                green("✔"),
                bold(&translated.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} blocks translated  ({} kept source text)",
                yellow("⚠"),
                bold(&translated.to_string()),
                total_blocks,
                yellow(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # French → English with the free Google endpoint
  pdf-translate rapport.pdf -o rapport_en.pdf

  # German → French, gentler on the endpoint
  pdf-translate --source de --target fr --concurrency 2 --delay-ms 200 doc.pdf

  # Translate with an LLM instead
  pdf-translate --backend llm --provider openai --model gpt-4.1-mini doc.pdf

  # Only pages 1-5, give up on stragglers after two minutes
  pdf-translate --pages 1-5 --deadline 120 doc.pdf

  # Show the text blocks that would be translated (no backend needed)
  pdf-translate --inspect-only doc.pdf

  # Per-block results as JSON
  pdf-translate --json doc.pdf > result.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (LLM backend)
  ANTHROPIC_API_KEY       Anthropic API key (LLM backend)
  GEMINI_API_KEY          Google Gemini API key (LLM backend)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Translate PDF documents in place, keeping the page layout.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate PDF files and URLs in place, keeping the page layout",
    long_about = "Extract the positioned text blocks of a PDF, translate them through Google \
Translate or any edgequake-llm provider, and paint each translation back over its original \
rectangle. Blocks that cannot be translated keep their source text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output PDF path. Default: <input stem>_translated.pdf.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Source language code (e.g. fr, de, auto).
    #[arg(short, long, env = "PDF_TRANSLATE_SOURCE", default_value = "fr")]
    source: String,

    /// Target language code (e.g. en).
    #[arg(short, long, env = "PDF_TRANSLATE_TARGET", default_value = "en")]
    target: String,

    /// Translation backend.
    #[arg(long, env = "PDF_TRANSLATE_BACKEND", value_enum, default_value = "google")]
    backend: BackendArg,

    /// LLM model ID (LLM backend).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure (LLM backend).
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file with a custom system prompt ({source}/{target} placeholders).
    #[arg(long, env = "PDF_TRANSLATE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Number of concurrent backend calls.
    #[arg(short, long, env = "PDF_TRANSLATE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Pause before each block's first backend call, in milliseconds.
    #[arg(long, env = "PDF_TRANSLATE_DELAY_MS", default_value_t = 20)]
    delay_ms: u64,

    /// Retries per block after the first failed call.
    #[arg(long, env = "PDF_TRANSLATE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Delay before the first retry, doubled on each further retry (ms).
    #[arg(long, env = "PDF_TRANSLATE_BACKOFF_MS", default_value_t = 500)]
    backoff_ms: u64,

    /// Per-call backend timeout in seconds.
    #[arg(long, env = "PDF_TRANSLATE_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Overall translation deadline in seconds; unfinished blocks keep source text.
    #[arg(long, env = "PDF_TRANSLATE_DEADLINE")]
    deadline: Option<u64>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_TRANSLATE_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_TRANSLATE_PASSWORD")]
    password: Option<String>,

    /// Starting font size for translated text.
    #[arg(long, env = "PDF_TRANSLATE_FONT_SIZE", default_value_t = 10.0)]
    font_size: f32,

    /// Smallest font size the fitter may shrink to.
    #[arg(long, env = "PDF_TRANSLATE_MIN_FONT_SIZE", default_value_t = 6.0)]
    min_font_size: f32,

    /// Print the extracted text blocks only, no translation.
    #[arg(long)]
    inspect_only: bool,

    /// Print structured JSON results on stdout.
    #[arg(long, env = "PDF_TRANSLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_TRANSLATE_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF_TRANSLATE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Google,
    Llm,
}

impl From<BackendArg> for Backend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Google => Backend::Google,
            BackendArg::Llm => Backend::Llm,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; warnings about fallbacks are
    // printed by the callback itself.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None).await?;
        let pages = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&pages).context("Failed to serialize blocks")?
            );
        } else {
            println!("File:    {}", cli.input);
            for page in &pages {
                println!(
                    "\n{} {}",
                    bold(&format!("Page {}", page.page_index + 1)),
                    dim(&format!("({} blocks)", page.blocks.len()))
                );
                for b in &page.blocks {
                    let preview: String = b.text.chars().take(60).collect();
                    println!(
                        "  {:<8} {}  {}",
                        b.id().to_string(),
                        dim(&format!(
                            "[{:>6.1} {:>6.1} {:>6.1} {:>6.1}]",
                            b.rect.x0, b.rect.y0, b.rect.x1, b.rect.y1
                        )),
                        preview.replace('\n', " ")
                    );
                }
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    // ── Run translation ──────────────────────────────────────────────────
    let output = translate_pdf(&cli.input, &output_path, &config)
        .await
        .context("Translation failed")?;
    let stats = &output.stats;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} blocks  {} pages  {}ms  →  {}",
            if stats.fallback_blocks == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.translated_blocks,
            stats.total_blocks,
            stats.translated_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "{} backend calls, {} blocks shrunk, {} floor-size retries",
                stats.total_attempts, stats.compose.blocks_shrunk, stats.compose.floor_fallbacks
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = TranslationConfig::builder()
        .source_lang(&cli.source)
        .target_lang(&cli.target)
        .backend(cli.backend.clone().into())
        .concurrency(cli.concurrency)
        .per_call_delay_ms(cli.delay_ms)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .deadline_secs(cli.deadline)
        .pages(pages)
        .initial_fontsize(cli.font_size)
        .min_fontsize(cli.min_font_size)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
