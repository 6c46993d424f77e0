//! Orchestrator: one translation request from record lookup to stored artifacts.
//!
//! ## State machine
//!
//! ```text
//!            claim                 artifacts stored + update ok
//!  (none) ─────────▶ processing ─────────────────────────────▶ completed
//!                        │
//!                        │ any step fails (except the final update)
//!                        ▼
//!                      failed
//! ```
//!
//! Steps run strictly in order: load document → claim translation → download
//! original → extract → translate → render PDF and DOCX → upload PDF then
//! DOCX → mark completed. A failure aborts the remaining steps and is written
//! to the claimed record as `failed` on a best-effort basis.
//!
//! Two failure modes are deliberately not written back:
//!
//! * invalid requests never reach a record;
//! * a failed final update means the artifacts exist but the record still
//!   says `processing`. Marking it `failed` would be wrong too, so it is left
//!   alone and [`Orchestrator::reconcile`] completes it later.
//!
//! Writes are at-least-once, not atomic: if the DOCX upload fails the PDF
//! stays in the bucket, and a re-run overwrites both at the same paths.

use crate::config::PipelineConfig;
use crate::error::{StoreError, TranslateError};
use crate::model::{
    ArtifactKind, ArtifactPaths, Document, DocumentStatus, NewTranslation, TranslateRequest,
    Translation, TranslationStatus, TranslationUpdate,
};
use crate::pipeline::docx::build_docx;
use crate::pipeline::extract::extract_text;
use crate::pipeline::pdf::build_pdf;
use crate::pipeline::translate::{translate_text, TranslationService};
use crate::store::{ObjectStore, RecordStore};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Summary of a completed request.
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub translation_id: String,
    pub paths: ArtifactPaths,
    /// Number of segments sent to the translation service.
    pub segments: usize,
    /// Characters of extracted text.
    pub source_chars: usize,
    /// Characters of translated text.
    pub translated_chars: usize,
    pub duration: Duration,
}

/// Result of [`Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Both artifacts were present; the record is now `completed`.
    Completed(Translation),
    /// The record stays `processing`; these artifacts are not stored.
    Incomplete {
        translation_id: String,
        missing: Vec<ArtifactKind>,
    },
    /// The latest record for the pair is terminal, or there is none.
    NothingPending,
}

/// Runs translation requests against injected collaborators.
///
/// Cheap to share: clone the `Arc`s into as many orchestrators as needed or
/// wrap one in an `Arc` for a server.
pub struct Orchestrator {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    translator: Arc<dyn TranslationService>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        translator: Arc<dyn TranslationService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            objects,
            records,
            translator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Translate one document into one language and store both artifacts.
    ///
    /// Bounded by `request_deadline_secs`. On failure the claimed record is
    /// marked `failed` where appropriate (see module docs) and the error is
    /// returned either way.
    pub async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        validate(request)?;
        info!(
            "Translating document {} → {}",
            request.document_id, request.target_language
        );

        let claimed = OnceLock::new();
        let deadline = Duration::from_secs(self.config.request_deadline_secs);
        let result = match tokio::time::timeout(deadline, self.run(request, &claimed)).await {
            Ok(r) => r,
            Err(_) => Err(TranslateError::DeadlineExceeded {
                secs: self.config.request_deadline_secs,
            }),
        };

        match result {
            Ok(outcome) => {
                info!(
                    "Translation {} completed: {} segments, {} → {} chars in {}ms",
                    outcome.translation_id,
                    outcome.segments,
                    outcome.source_chars,
                    outcome.translated_chars,
                    outcome.duration.as_millis()
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    "Translation of {} → {} failed: {}",
                    request.document_id, request.target_language, e
                );
                if e.marks_failed() {
                    self.mark_failed(request, claimed.get().map(String::as_str), &e)
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &TranslateRequest,
        claimed: &OnceLock<String>,
    ) -> Result<TranslationOutcome, TranslateError> {
        let start = Instant::now();
        let document = load_document(&*self.records, &request.document_id).await?;

        let translation = self.claim(request).await?;
        let _ = claimed.set(translation.id.clone());
        set_document_status(&*self.records, &document.id, DocumentStatus::Processing).await;

        let original = self
            .objects
            .download(&self.config.input_bucket, &document.original_file_path)
            .await
            .map_err(|source| TranslateError::Storage {
                operation: "download",
                path: document.original_file_path.clone(),
                source,
            })?;
        debug!(
            "Fetched {} bytes of '{}'",
            original.len(),
            document.original_filename
        );

        let text = extract_text(&original);
        let translated = translate_text(
            self.translator.as_ref(),
            &text,
            &request.target_language,
            &self.config,
        )
        .await?;

        let pdf = build_pdf(&translated.text, &self.config.pdf_layout).to_bytes();
        let docx = build_docx(&translated.text).to_bytes()?;

        let paths =
            ArtifactPaths::for_request(&document.user_id, &document.id, &request.target_language);
        self.store_artifact(ArtifactKind::Pdf, &paths, pdf).await?;
        self.store_artifact(ArtifactKind::Docx, &paths, docx).await?;

        self.records
            .update_translation(&translation.id, &TranslationUpdate::completed(&paths, Utc::now()))
            .await
            .map_err(|source| {
                error!(
                    "Artifacts for translation {} are stored but the record is still processing; \
                     run reconcile for {} → {}",
                    translation.id, request.document_id, request.target_language
                );
                TranslateError::Update {
                    translation_id: translation.id.clone(),
                    source,
                }
            })?;
        set_document_status(&*self.records, &document.id, DocumentStatus::Completed).await;

        Ok(TranslationOutcome {
            translation_id: translation.id,
            paths,
            segments: translated.segments.len(),
            source_chars: text.chars().count(),
            translated_chars: translated.text.chars().count(),
            duration: start.elapsed(),
        })
    }

    /// Complete a record left `processing` by a failed final update.
    ///
    /// Same as [`Reconciler::reconcile`] over this orchestrator's stores.
    pub async fn reconcile(
        &self,
        request: &TranslateRequest,
    ) -> Result<ReconcileOutcome, TranslateError> {
        reconcile(
            &*self.objects,
            &*self.records,
            &self.config.output_bucket,
            request,
        )
        .await
    }

    // ── Steps ─────────────────────────────────────────────────────────────

    /// Reuse the latest record if it is still `processing`, otherwise start
    /// a new attempt.
    async fn claim(&self, request: &TranslateRequest) -> Result<Translation, TranslateError> {
        let latest = self
            .records
            .latest_translation(&request.document_id, &request.target_language)
            .await
            .map_err(database("find translation"))?;

        match latest {
            Some(t) if t.status == TranslationStatus::Processing => {
                debug!("Claimed existing translation {}", t.id);
                Ok(t)
            }
            _ => {
                let t = self
                    .records
                    .insert_translation(&NewTranslation::processing(
                        &request.document_id,
                        &request.target_language,
                    ))
                    .await
                    .map_err(database("create translation"))?;
                debug!("Created translation {}", t.id);
                Ok(t)
            }
        }
    }

    async fn store_artifact(
        &self,
        kind: ArtifactKind,
        paths: &ArtifactPaths,
        data: Vec<u8>,
    ) -> Result<(), TranslateError> {
        let path = paths.path(kind);
        let size = data.len();
        self.objects
            .upload(&self.config.output_bucket, path, data, kind.content_type(), true)
            .await
            .map_err(|source| TranslateError::Storage {
                operation: "upload",
                path: path.to_string(),
                source,
            })?;
        debug!("Stored {} ({} bytes) at {}", kind.extension(), size, path);
        Ok(())
    }

    async fn mark_failed(
        &self,
        request: &TranslateRequest,
        claimed: Option<&str>,
        cause: &TranslateError,
    ) {
        let id = match claimed {
            Some(id) => Some(id.to_string()),
            None => match self
                .records
                .latest_translation(&request.document_id, &request.target_language)
                .await
            {
                Ok(latest) => latest
                    .filter(|t| t.status == TranslationStatus::Processing)
                    .map(|t| t.id),
                Err(e) => {
                    error!(
                        "Could not look up translation for {} → {} to mark it failed: {}",
                        request.document_id, request.target_language, e
                    );
                    None
                }
            },
        };

        if let Some(id) = id {
            match self
                .records
                .update_translation(&id, &TranslationUpdate::failed(cause.to_string()))
                .await
            {
                Ok(_) => debug!("Marked translation {} failed", id),
                Err(e) => error!("Could not mark translation {} failed: {}", id, e),
            }
        }

        if !matches!(cause, TranslateError::NotFound { .. }) {
            set_document_status(&*self.records, &request.document_id, DocumentStatus::Failed)
                .await;
        }
    }
}

/// Completes translation records left `processing` after their artifacts
/// were stored. Needs no translation service.
pub struct Reconciler {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    output_bucket: String,
}

impl Reconciler {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            objects,
            records,
            output_bucket: config.output_bucket.clone(),
        }
    }

    /// Complete the latest `processing` record for the pair when both
    /// artifacts are present in the output bucket; otherwise report what is
    /// missing and leave the record alone.
    pub async fn reconcile(
        &self,
        request: &TranslateRequest,
    ) -> Result<ReconcileOutcome, TranslateError> {
        reconcile(&*self.objects, &*self.records, &self.output_bucket, request).await
    }
}

async fn reconcile(
    objects: &dyn ObjectStore,
    records: &dyn RecordStore,
    output_bucket: &str,
    request: &TranslateRequest,
) -> Result<ReconcileOutcome, TranslateError> {
    validate(request)?;
    let document = load_document(records, &request.document_id).await?;

    let pending = records
        .latest_translation(&request.document_id, &request.target_language)
        .await
        .map_err(database("find translation"))?
        .filter(|t| t.status == TranslationStatus::Processing);
    let Some(translation) = pending else {
        debug!(
            "Nothing to reconcile for {} → {}",
            request.document_id, request.target_language
        );
        return Ok(ReconcileOutcome::NothingPending);
    };

    let paths =
        ArtifactPaths::for_request(&document.user_id, &document.id, &request.target_language);
    let mut missing = Vec::new();
    for kind in [ArtifactKind::Pdf, ArtifactKind::Docx] {
        let path = paths.path(kind);
        let present = objects
            .exists(output_bucket, path)
            .await
            .map_err(|source| TranslateError::Storage {
                operation: "check",
                path: path.to_string(),
                source,
            })?;
        if !present {
            missing.push(kind);
        }
    }

    if !missing.is_empty() {
        warn!(
            "Translation {} stays processing; missing artifacts: {:?}",
            translation.id, missing
        );
        return Ok(ReconcileOutcome::Incomplete {
            translation_id: translation.id,
            missing,
        });
    }

    let updated = records
        .update_translation(&translation.id, &TranslationUpdate::completed(&paths, Utc::now()))
        .await
        .map_err(|source| TranslateError::Update {
            translation_id: translation.id.clone(),
            source,
        })?;
    set_document_status(records, &document.id, DocumentStatus::Completed).await;
    info!("Reconciled translation {} to completed", updated.id);
    Ok(ReconcileOutcome::Completed(updated))
}

async fn load_document(records: &dyn RecordStore, id: &str) -> Result<Document, TranslateError> {
    records
        .get_document(id)
        .await
        .map_err(database("load document"))?
        .ok_or_else(|| TranslateError::NotFound {
            document_id: id.to_string(),
        })
}

/// Document status is informational; failures are logged, never raised.
async fn set_document_status(records: &dyn RecordStore, id: &str, status: DocumentStatus) {
    if let Err(e) = records.update_document_status(id, status).await {
        warn!("Could not set document {} status to {:?}: {}", id, status, e);
    }
}

/// BCP 47-style code: a 2-3 letter language plus optional subtags
/// (`es`, `pt-BR`, `zh-TW`, `mni-Mtei`). The code ends up in artifact keys.
static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$").unwrap()
});

fn validate(request: &TranslateRequest) -> Result<(), TranslateError> {
    if request.document_id.trim().is_empty() {
        return Err(TranslateError::InvalidRequest(
            "documentId must not be empty".into(),
        ));
    }
    if request.target_language.trim().is_empty() {
        return Err(TranslateError::InvalidRequest(
            "targetLanguage must not be empty".into(),
        ));
    }
    if !LANGUAGE_CODE.is_match(&request.target_language) {
        return Err(TranslateError::InvalidRequest(format!(
            "targetLanguage {:?} is not a language code",
            request.target_language
        )));
    }
    Ok(())
}

fn database(operation: &'static str) -> impl FnOnce(StoreError) -> TranslateError {
    move |source| TranslateError::Database { operation, source }
}
