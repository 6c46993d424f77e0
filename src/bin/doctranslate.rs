//! CLI binary for edgequake-doctranslate.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service against
//! Supabase, `file` translates one local file or URL without any hosted
//! backend, and `reconcile` completes a record left `processing`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use edgequake_doctranslate::model::original_upload_path;
use edgequake_doctranslate::pipeline::input::resolve_input;
use edgequake_doctranslate::store::local::LocalObjectStore;
use edgequake_doctranslate::store::memory::MemoryRecordStore;
use edgequake_doctranslate::store::supabase::SupabaseClient;
use edgequake_doctranslate::{
    Document, DocumentStatus, GoogleTranslate, ObjectStore, Orchestrator, PipelineConfig,
    ProgressCallback, ReconcileOutcome, Reconciler, TranslateRequest, TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

/// Terminal progress bar over segments. Segments may complete out of order
/// when `--concurrency > 1`; the bar only counts.
struct CliProgressCallback {
    bar: ProgressBar,
    retries: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            retries: AtomicUsize::new(0),
        })
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_translation_start(&self, total_segments: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} segments  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_length(total_segments as u64);
        self.bar.set_prefix("Translating");
    }

    fn on_segment_retry(&self, index: usize, attempt: u32, error: &str) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} segment {index} attempt {attempt}: {}",
            red("↻"),
            dim(error)
        ));
    }

    fn on_segment_complete(&self, _index: usize, _total: usize, _chars: usize) {
        self.bar.inc(1);
    }

    fn on_segment_error(&self, index: usize, _total: usize, error: &str) {
        self.bar
            .println(format!("  {} segment {index}: {}", red("✗"), red(error)));
    }

    fn on_translation_complete(&self, total_segments: usize) {
        self.bar.finish_and_clear();
        let retries = self.retries.load(Ordering::SeqCst);
        eprintln!(
            "{} {} segments translated{}",
            green("✔"),
            bold(&total_segments.to_string()),
            if retries > 0 {
                dim(&format!(" ({retries} retries)"))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service against a Supabase project
  doctranslate serve --supabase-url https://xyz.supabase.co --supabase-key $KEY

  # Translate a local file; artifacts land under ./out/translations/local/
  doctranslate file notes.txt --lang es --out-dir out

  # Translate a remote file with sequential requests
  doctranslate file https://example.com/report.pdf --lang de --concurrency 1

  # Complete a record whose final status update failed
  doctranslate reconcile --document d1 --lang es

ENVIRONMENT VARIABLES:
  SUPABASE_URL               Supabase project URL
  SUPABASE_SERVICE_ROLE_KEY  Service-role key (apikey + bearer token)
  DOCTRANSLATE_BIND          Listen address for `serve` (default 0.0.0.0:8080)
  DOCTRANSLATE_ENDPOINT      Translation endpoint override
  RUST_LOG                   Overrides --verbose / --quiet
"#;

/// Translate documents into PDF and DOCX renditions.
#[derive(Parser, Debug)]
#[command(
    name = "doctranslate",
    version,
    about = "Translate documents into PDF and DOCX renditions",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCTRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCTRANSLATE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `POST /translate-document` backed by Supabase.
    Serve {
        /// Listen address.
        #[arg(long, env = "DOCTRANSLATE_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        #[command(flatten)]
        supabase: SupabaseArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Translate one local file or URL without a hosted backend.
    File {
        /// Local file path or HTTP/HTTPS URL.
        input: String,

        /// Target language code (e.g. es, fr, de).
        #[arg(short, long)]
        lang: String,

        /// Directory receiving the buckets (`documents/`, `translations/`).
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Owner id used as the first path segment.
        #[arg(long, default_value = "local")]
        owner: String,

        /// Disable progress bar.
        #[arg(long, env = "DOCTRANSLATE_NO_PROGRESS")]
        no_progress: bool,

        /// HTTP download timeout in seconds for URL inputs.
        #[arg(long, default_value_t = 120)]
        download_timeout: u64,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Complete a translation left `processing` when both artifacts exist.
    Reconcile {
        /// Document id.
        #[arg(long)]
        document: String,

        /// Target language code.
        #[arg(long)]
        lang: String,

        #[command(flatten)]
        supabase: SupabaseArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args, Debug)]
struct SupabaseArgs {
    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Service-role key.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_key: String,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Max characters per translation request.
    #[arg(long, env = "DOCTRANSLATE_CHUNK_SIZE", default_value_t = 500)]
    chunk_size: usize,

    /// Number of concurrent translation calls.
    #[arg(short, long, env = "DOCTRANSLATE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Attempts per segment.
    #[arg(long, env = "DOCTRANSLATE_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Per-call translation timeout in seconds.
    #[arg(long, env = "DOCTRANSLATE_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Whole-request deadline in seconds.
    #[arg(long, env = "DOCTRANSLATE_DEADLINE", default_value_t = 300)]
    deadline: u64,

    /// Bucket holding originals.
    #[arg(long, env = "DOCTRANSLATE_INPUT_BUCKET", default_value = "documents")]
    input_bucket: String,

    /// Bucket receiving artifacts.
    #[arg(long, env = "DOCTRANSLATE_OUTPUT_BUCKET", default_value = "translations")]
    output_bucket: String,

    /// Translation endpoint (defaults to the public Google endpoint).
    #[arg(long, env = "DOCTRANSLATE_ENDPOINT")]
    endpoint: Option<String>,
}

impl PipelineArgs {
    fn config(&self, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .chunk_size(self.chunk_size)
            .concurrency(self.concurrency)
            .max_attempts(self.max_attempts)
            .api_timeout_secs(self.api_timeout)
            .request_deadline_secs(self.deadline)
            .input_bucket(self.input_bucket.clone())
            .output_bucket(self.output_bucket.clone());
        if let Some(cb) = progress {
            builder = builder.progress_callback(cb);
        }
        builder.build().context("Invalid configuration")
    }

    fn translator(&self) -> Result<GoogleTranslate> {
        let client = match self.endpoint {
            Some(ref url) => GoogleTranslate::with_endpoint(url.clone()),
            None => GoogleTranslate::new(),
        };
        client.context("Failed to create translation client")
    }
}

fn init_logging(cli: &Cli, show_progress: bool) {
    // The progress bar provides the feedback that matters; keep INFO quiet.
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
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let show_progress = matches!(
        cli.command,
        Command::File { no_progress: false, .. }
    ) && !cli.quiet;
    init_logging(&cli, show_progress);

    match cli.command {
        Command::Serve {
            bind,
            supabase,
            pipeline,
        } => {
            let client = Arc::new(
                SupabaseClient::new(&supabase.supabase_url, &supabase.supabase_key)
                    .context("Failed to create Supabase client")?,
            );
            let orchestrator = Orchestrator::new(
                client.clone(),
                client,
                Arc::new(pipeline.translator()?),
                pipeline.config(None)?,
            );
            edgequake_doctranslate::server::serve(bind, Arc::new(orchestrator))
                .await
                .context("Server failed")?;
        }

        Command::File {
            input,
            lang,
            out_dir,
            owner,
            no_progress: _,
            download_timeout,
            pipeline,
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn TranslationProgressCallback>)
            } else {
                None
            };
            let config = pipeline.config(progress)?;
            translate_file(&input, &lang, out_dir, &owner, download_timeout, config, &pipeline, cli.quiet)
                .await?;
        }

        Command::Reconcile {
            document,
            lang,
            supabase,
            pipeline,
        } => {
            let client = Arc::new(
                SupabaseClient::new(&supabase.supabase_url, &supabase.supabase_key)
                    .context("Failed to create Supabase client")?,
            );
            let reconciler = Reconciler::new(client.clone(), client, &pipeline.config(None)?);
            let outcome = reconciler
                .reconcile(&TranslateRequest::new(document, lang))
                .await
                .context("Reconcile failed")?;
            match outcome {
                ReconcileOutcome::Completed(t) => {
                    println!("{} translation {} completed", green("✔"), t.id)
                }
                ReconcileOutcome::Incomplete {
                    translation_id,
                    missing,
                } => println!(
                    "{} translation {} still processing; missing {:?}",
                    red("✗"),
                    translation_id,
                    missing
                ),
                ReconcileOutcome::NothingPending => println!("Nothing to reconcile"),
            }
        }
    }

    Ok(())
}

/// Run the full pipeline on one input with a local object store and an
/// in-memory record store.
#[allow(clippy::too_many_arguments)]
async fn translate_file(
    input: &str,
    lang: &str,
    out_dir: PathBuf,
    owner: &str,
    download_timeout: u64,
    config: PipelineConfig,
    pipeline: &PipelineArgs,
    quiet: bool,
) -> Result<()> {
    let original = resolve_input(input, download_timeout)
        .await
        .with_context(|| format!("Failed to read {input}"))?;

    let objects = Arc::new(LocalObjectStore::new(&out_dir));
    let records = Arc::new(MemoryRecordStore::new());

    let now = Utc::now();
    let stored_path = original_upload_path(owner, now.timestamp_millis(), original.extension());
    let size = original.bytes.len();
    objects
        .upload(
            &config.input_bucket,
            &stored_path,
            original.bytes,
            "application/octet-stream",
            true,
        )
        .await
        .with_context(|| format!("Failed to stage original at {stored_path}"))?;

    let document = Document {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: owner.to_string(),
        original_filename: original.filename.clone(),
        original_file_path: stored_path,
        original_language: config.source_language.clone(),
        file_size: size as i64,
        mime_type: String::new(),
        upload_date: now,
        status: DocumentStatus::Uploaded,
    };
    let document_id = document.id.clone();
    records.insert_document(document).await;

    let output_root = out_dir.join(&config.output_bucket);
    let orchestrator = Orchestrator::new(
        objects,
        records,
        Arc::new(pipeline.translator()?),
        config,
    );
    let outcome = orchestrator
        .translate(&TranslateRequest::new(document_id, lang))
        .await
        .context("Translation failed")?;

    println!("{}", output_root.join(&outcome.paths.pdf).display());
    println!("{}", output_root.join(&outcome.paths.docx).display());
    if !quiet {
        eprintln!(
            "   {} segments  {} → {} chars :  {}ms total",
            dim(&outcome.segments.to_string()),
            outcome.source_chars,
            outcome.translated_chars,
            outcome.duration.as_millis(),
        );
    }
    Ok(())
}
