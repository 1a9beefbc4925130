//! CLI binary for cardify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ChunkerConfig` / `DispatchConfig` and prints results.

use anyhow::{Context, Result};
use cardify::pipeline::input::{read_markdown, resolve_markdown};
use cardify::pipeline::llm::resolve_provider;
use cardify::{
    chunk_markdown, generate_cards, write_jsonl, CardifyError, ChunkerConfig, ChunkingOutput,
    DispatchConfig, DispatchProgressCallback, LlmQuestionGenerator, ProgressCallback, StudyCard,
};
use clap::Parser;
use edgequake_llm::LLMProvider;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per batch.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-batch wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner-only until `on_dispatch_start` reports the batch count.
    fn new_dynamic(label: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} batches  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, batch: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&batch))
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl DispatchProgressCallback for CliProgressCallback {
    fn on_dispatch_start(&self, total_batches: usize) {
        self.activate_bar(total_batches);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating cards for {total_batches} batches…"))
        ));
    }

    fn on_batch_start(&self, batch: usize, _total: usize) {
        if let Ok(mut t) = self.start_times.lock() {
            t.insert(batch, Instant::now());
        }
        self.bar.set_message(format!("batch {batch}"));
    }

    fn on_batch_complete(&self, batch: usize, total: usize, card_count: usize) {
        let secs = self.elapsed_secs(batch);
        self.bar.println(format!(
            "  {} Batch {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            batch + 1,
            total,
            dim(&format!("{card_count:>4} cards")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_error(&self, batch: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(batch);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Batch {:>3}/{:<3}  {}  {}",
            red("✗"),
            batch + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_dispatch_complete(&self, total_batches: usize, success_count: usize) {
        let failed = total_batches.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} batches generated successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} batches generated  ({} failed)",
                if failed == total_batches {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_batches,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Chunk a converted book, one JSON object per line
  cardify book.md

  # Point at the PDF; book.md / book.markdown next to it is used
  cardify book.pdf -o book.chunks.jsonl

  # Explicit markdown for a single PDF
  cardify scan.pdf --markdown converted/scan.md

  # Smaller chunks, ignore headings deeper than ###
  cardify --max-chunk-chars 2000 --heading-depth 3 book.md

  # Several books into a directory (one file per input)
  cardify a.pdf b.pdf c.pdf -o out/ --optional-markdown

  # Generate study cards
  cardify --generate --model gpt-4.1-mini book.md -o book.cards.jsonl

OUTPUT:
  Without --generate, chunks are printed as JSON Lines. With --generate,
  study cards are printed instead. --json prints a single pretty document
  with statistics. With several inputs, -o names a directory and each input
  gets <stem>.chunks.jsonl or <stem>.cards.jsonl.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  CARDIFY_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  CARDIFY_MODEL           Override model ID
  RUST_LOG                Override the log filter
"#;

/// Split converted markdown into heading-aware chunks and generate study cards.
#[derive(Parser, Debug)]
#[command(
    name = "cardify",
    version,
    about = "Split book markdown into heading-aware chunks and generate study cards",
    long_about = "Split markdown (typically the output of a PDF converter) into contiguous, \
size-bounded chunks tagged with their chapter path, and optionally send them in batches to \
an LLM that writes question/answer study cards.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files, or PDFs with a converted markdown file next to them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Markdown file to use instead of automatic detection (single input only).
    #[arg(long, env = "CARDIFY_MARKDOWN")]
    markdown: Option<PathBuf>,

    /// Don't fail when a PDF has no markdown next to it.
    #[arg(long, env = "CARDIFY_OPTIONAL_MARKDOWN")]
    optional_markdown: bool,

    /// Don't fail on inputs with no non-whitespace text.
    #[arg(long, env = "CARDIFY_SKIP_EMPTY")]
    skip_empty: bool,

    /// Maximum characters per chunk.
    #[arg(long, env = "CARDIFY_MAX_CHUNK_CHARS", default_value_t = 4000)]
    max_chunk_chars: usize,

    /// Sections shorter than this are merged with the following one.
    #[arg(long, env = "CARDIFY_MIN_CHUNK_CHARS", default_value_t = 0)]
    min_chunk_chars: usize,

    /// Deepest heading level that starts a new section (1–6).
    #[arg(long, env = "CARDIFY_HEADING_DEPTH", default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(1..=6))]
    heading_depth: u8,

    /// Write output to this file (or directory, with several inputs).
    #[arg(short, long, env = "CARDIFY_OUTPUT")]
    output: Option<PathBuf>,

    /// Output one pretty JSON document with statistics instead of JSON Lines.
    #[arg(long, env = "CARDIFY_JSON")]
    json: bool,

    /// Send chunks to an LLM and output study cards.
    #[arg(long, env = "CARDIFY_GENERATE")]
    generate: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "CARDIFY_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "CARDIFY_LLM_PROVIDER")]
    provider: Option<String>,

    /// Maximum chunks per request.
    #[arg(long, env = "CARDIFY_BATCH_SIZE", default_value_t = 4)]
    batch_size: usize,

    /// Estimated input-token budget per request (0 disables the budget).
    #[arg(long, env = "CARDIFY_BATCH_TOKENS", default_value_t = 6000)]
    batch_tokens: usize,

    /// Minimum milliseconds between request starts.
    #[arg(long, env = "CARDIFY_MIN_INTERVAL_MS", default_value_t = 1000)]
    min_interval_ms: u64,

    /// Retries per batch on LLM failure.
    #[arg(long, env = "CARDIFY_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Initial retry delay in milliseconds (doubles each attempt).
    #[arg(long, env = "CARDIFY_RETRY_BACKOFF_MS", default_value_t = 500)]
    retry_backoff_ms: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CARDIFY_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per batch.
    #[arg(long, env = "CARDIFY_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CARDIFY_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "CARDIFY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARDIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CARDIFY_QUIET")]
    quiet: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, env = "CARDIFY_LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// What happened to one input.
enum Outcome {
    Chunked { chunks: usize },
    Generated { chunks: usize, cards: usize, failed_batches: usize },
    Skipped,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.markdown.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--markdown can only be used with a single input file");
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback on stderr, so library INFO logs
    // are hidden while it is active unless they go to a log file.
    let show_progress = cli.generate && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || (show_progress && cli.log_file.is_none()) {
        "error"
    } else {
        "info"
    };
    init_logging(filter, cli.log_file.as_deref())?;

    // ── Build config ─────────────────────────────────────────────────────
    let chunker = ChunkerConfig::builder()
        .max_chunk_chars(cli.max_chunk_chars)
        .min_chunk_chars(cli.min_chunk_chars)
        .heading_depth(cli.heading_depth)
        .build()
        .context("Invalid configuration")?;

    let dispatch = if cli.generate {
        let config = build_dispatch_config(&cli).await?;
        let provider = resolve_provider(&config).context("Failed to set up LLM provider")?;
        Some((config, provider))
    } else {
        None
    };

    // ── Process inputs ───────────────────────────────────────────────────
    let total = cli.inputs.len();
    let mut succeeded = 0;

    for input in &cli.inputs {
        info!("Processing: {}", input.display());
        match process_input(&cli, input, &chunker, dispatch.as_ref()).await {
            Ok(outcome) => {
                succeeded += 1;
                if !cli.quiet {
                    report(input, &outcome);
                }
            }
            Err(e) => {
                eprintln!("{} {}: {:#}", red("✘"), input.display(), e);
            }
        }
    }

    if !cli.quiet && total > 1 {
        eprintln!(
            "{}  {}/{} files processed",
            if succeeded == total {
                green("✔")
            } else {
                cyan("⚠")
            },
            succeeded,
            total
        );
    }

    if succeeded < total {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(default_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (writer, ansi) = match log_file {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .init();
    Ok(())
}

/// Create (or truncate) the log file, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    File::create(path).with_context(|| format!("Failed to create log file {:?}", path))
}

/// Map CLI args to `DispatchConfig`.
async fn build_dispatch_config(cli: &Cli) -> Result<DispatchConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let budget = (cli.batch_tokens > 0).then_some(cli.batch_tokens);
    let mut config = DispatchConfig::builder()
        .max_batch_chunks(cli.batch_size)
        .max_batch_tokens(budget)
        .min_request_interval_ms(cli.min_interval_ms)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .build()
        .context("Invalid configuration")?;

    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.system_prompt = system_prompt;
    Ok(config)
}

async fn process_input(
    cli: &Cli,
    input: &Path,
    chunker: &ChunkerConfig,
    dispatch: Option<&(DispatchConfig, Arc<dyn LLMProvider>)>,
) -> Result<Outcome> {
    let chunking = match load_and_chunk(cli, input, chunker) {
        Ok(output) => output,
        Err(e @ CardifyError::MarkdownNotFound { .. }) if cli.optional_markdown => {
            warn!("{e}");
            warn!("Continuing without markdown processing");
            return Ok(Outcome::Skipped);
        }
        Err(e @ CardifyError::EmptyDocument) if cli.skip_empty => {
            warn!("{}: {e}", input.display());
            return Ok(Outcome::Skipped);
        }
        Err(e) => return Err(e.into()),
    };
    let chunk_count = chunking.chunks.len();

    let Some((base, provider)) = dispatch else {
        emit_chunks(cli, input, &chunking).await?;
        return Ok(Outcome::Chunked {
            chunks: chunk_count,
        });
    };

    let mut config = base.clone();
    if !cli.quiet && !cli.no_progress {
        let label = input.display().to_string();
        let cb = CliProgressCallback::new_dynamic(&label);
        config.progress_callback = Some(cb as ProgressCallback);
    }
    let generator = LlmQuestionGenerator::new(Arc::clone(provider), &config);
    let output = generate_cards(&chunking.chunks, &generator, &config)
        .await
        .context("Card generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        emit_text(cli, input, "cards", &json).await?;
    } else {
        let cards: Vec<StudyCard> = output.cards().cloned().collect();
        emit_records(cli, input, "cards", &cards).await?;
    }

    Ok(Outcome::Generated {
        chunks: chunk_count,
        cards: output.stats.total_cards,
        failed_batches: output.stats.failed_batches,
    })
}

fn load_and_chunk(
    cli: &Cli,
    input: &Path,
    chunker: &ChunkerConfig,
) -> Result<ChunkingOutput, CardifyError> {
    let path = resolve_markdown(input, cli.markdown.as_deref())?;
    info!("Reading markdown from: {}", path.display());
    let markdown = read_markdown(&path)?;
    chunk_markdown(&markdown, chunker)
}

async fn emit_chunks(cli: &Cli, input: &Path, chunking: &ChunkingOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(chunking).context("Failed to serialise output")?;
        emit_text(cli, input, "chunks", &json).await
    } else {
        emit_records(cli, input, "chunks", &chunking.chunks).await
    }
}

/// Where output for `input` goes; `None` means stdout.
fn output_path(cli: &Cli, input: &Path, kind: &str, ext: &str) -> Option<PathBuf> {
    let output = cli.output.as_ref()?;
    if cli.inputs.len() == 1 {
        return Some(output.clone());
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    Some(output.join(format!("{stem}.{kind}.{ext}")))
}

async fn emit_records<T: serde::Serialize>(
    cli: &Cli,
    input: &Path,
    kind: &str,
    records: &[T],
) -> Result<()> {
    match output_path(cli, input, kind, "jsonl") {
        Some(path) => write_jsonl(&path, records)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let body = cardify::to_jsonl(records)?;
            io::stdout()
                .lock()
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")
        }
    }
}

async fn emit_text(cli: &Cli, input: &Path, kind: &str, text: &str) -> Result<()> {
    match output_path(cli, input, kind, "json") {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(&path, format!("{text}\n"))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn report(input: &Path, outcome: &Outcome) {
    match outcome {
        Outcome::Chunked { chunks } => {
            eprintln!(
                "{}  {}  {} chunks",
                green("✔"),
                bold(&input.display().to_string()),
                chunks
            );
        }
        Outcome::Generated {
            chunks,
            cards,
            failed_batches,
        } => {
            eprintln!(
                "{}  {}  {} chunks  →  {} cards{}",
                if *failed_batches == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                bold(&input.display().to_string()),
                chunks,
                cards,
                if *failed_batches > 0 {
                    dim(&format!("  ({failed_batches} batches failed)"))
                } else {
                    String::new()
                },
            );
        }
        Outcome::Skipped => {
            eprintln!("{}  {}  skipped", dim("–"), input.display());
        }
    }
}
