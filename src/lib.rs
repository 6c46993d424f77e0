//! # edgequake-doctranslate
//!
//! Translate uploaded documents into another language and store the result
//! as both a PDF and a Word (`.docx`) rendition.
//!
//! ## Why this crate?
//!
//! Users upload originals in whatever format they have. Rather than wiring a
//! format-specific parser per type, the pipeline recovers readable text from
//! the raw bytes, sends it to a machine-translation service in bounded
//! segments, and renders the translation into two formats every office suite
//! opens. Everything runs against injected collaborators (object store,
//! record store, translation service) so the same code serves HTTP requests,
//! the CLI, and tests.
//!
//! ## Pipeline Overview
//!
//! ```text
//! TranslateRequest { documentId, targetLanguage }
//!  │
//!  ├─ 1. Load     document record, claim a `processing` translation
//!  ├─ 2. Fetch    original bytes from the input bucket
//!  ├─ 3. Extract  printable lines from arbitrary bytes
//!  ├─ 4. Chunk    ≤500-char segments on code-point boundaries
//!  ├─ 5. Translate concurrent calls with retry, reassembled by index
//!  ├─ 6. Render   paginated PDF + packaged DOCX
//!  ├─ 7. Store    {owner}/{document}_{lang}.pdf / .docx (overwrite)
//!  └─ 8. Complete translation record → `completed`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doctranslate::store::supabase::SupabaseClient;
//! use edgequake_doctranslate::{GoogleTranslate, Orchestrator, PipelineConfig, TranslateRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let supabase = Arc::new(SupabaseClient::new("https://xyz.supabase.co", "service-key")?);
//!     let orchestrator = Orchestrator::new(
//!         supabase.clone(),
//!         supabase,
//!         Arc::new(GoogleTranslate::new()?),
//!         PipelineConfig::default(),
//!     );
//!     let outcome = orchestrator
//!         .translate(&TranslateRequest::new("d1", "es"))
//!         .await?;
//!     println!("{} / {}", outcome.paths.pdf, outcome.paths.docx);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router for `POST /translate-document` and `GET /health` |
//! | `cli`    | on      | Enables the `doctranslate` binary (clap + anyhow + tracing-subscriber); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-doctranslate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_TRANSLATE_ENDPOINT};
pub use error::{ErrorKind, SegmentError, StoreError, TranslateError};
pub use model::{
    ArtifactKind, ArtifactPaths, Document, DocumentStatus, NewTranslation, TranslateRequest,
    TranslateResponse, Translation, TranslationStatus, TranslationUpdate,
};
pub use orchestrator::{Orchestrator, ReconcileOutcome, Reconciler, TranslationOutcome};
pub use pipeline::pdf::PdfLayout;
pub use pipeline::translate::{GoogleTranslate, TranslationService};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use store::{ObjectStore, RecordStore};
