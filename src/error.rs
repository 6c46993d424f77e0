//! Error types for the edgequake-doctranslate library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`TranslateError`]: **Fatal** for one request: the translation cannot
//!   complete (document missing, storage down, translation service exhausted
//!   its retries). Returned from [`crate::orchestrator::Orchestrator::translate`]
//!   after the `failed` status has been written on a best-effort basis.
//!
//! * [`SegmentError`]: **Non-fatal**: a single attempt to translate one
//!   segment failed. The translation client retries; only when every attempt
//!   fails is the last `SegmentError` folded into a [`TranslateError`].
//!
//! * [`StoreError`]: a collaborator (object store or record store) rejected
//!   an operation. The orchestrator maps it onto the step that issued it.

use thiserror::Error;

/// All fatal errors returned by a translation request.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request is missing a document id or a target language.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No document record exists for the requested id.
    #[error("Document '{document_id}' not found")]
    NotFound { document_id: String },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The record store failed while reading or claiming records.
    #[error("Record store error during {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// The object store failed to read the original or write an artifact.
    #[error("Storage error during {operation} of '{path}': {source}")]
    Storage {
        operation: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    // ── Translation errors ────────────────────────────────────────────────
    /// Every attempt for one segment failed.
    #[error("Translation service failed on segment {segment} after {attempts} attempts: {detail}")]
    TranslationService {
        segment: usize,
        attempts: u32,
        detail: String,
    },

    /// The last attempt for a segment hit the per-call timeout.
    #[error("Translation service timed out after {secs}s on segment {segment}")]
    ApiTimeout { segment: usize, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A renderer could not serialise the translated text.
    #[error("Failed to render {format}: {detail}")]
    Render { format: &'static str, detail: String },

    /// Artifacts were written but the final status update failed.
    ///
    /// The translation record is left in `processing`; run
    /// [`crate::orchestrator::Orchestrator::reconcile`] to complete it.
    #[error("Artifacts stored but status update of translation '{translation_id}' failed: {source}")]
    Update {
        translation_id: String,
        #[source]
        source: StoreError,
    },

    /// The whole request ran past its deadline.
    #[error("Request exceeded its deadline of {secs}s")]
    DeadlineExceeded { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable classification of a [`TranslateError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Database,
    Storage,
    TranslationService,
    Timeout,
    Render,
    Update,
    Config,
    Internal,
}

impl TranslateError {
    /// Classify this error.
    ///
    /// Both the per-call timeout and the request deadline map to
    /// [`ErrorKind::Timeout`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            TranslateError::NotFound { .. } => ErrorKind::NotFound,
            TranslateError::Database { .. } => ErrorKind::Database,
            TranslateError::Storage { .. } => ErrorKind::Storage,
            TranslateError::TranslationService { .. } => ErrorKind::TranslationService,
            TranslateError::ApiTimeout { .. } | TranslateError::DeadlineExceeded { .. } => {
                ErrorKind::Timeout
            }
            TranslateError::Render { .. } => ErrorKind::Render,
            TranslateError::Update { .. } => ErrorKind::Update,
            TranslateError::InvalidConfig(_) => ErrorKind::Config,
            TranslateError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the orchestrator should persist a `failed` status for this error.
    ///
    /// `Update` failures leave the record in `processing` (artifacts exist and
    /// reconcile can complete it); invalid requests never reach a record.
    pub fn marks_failed(&self) -> bool {
        !matches!(
            self,
            TranslateError::Update { .. }
                | TranslateError::InvalidRequest(_)
                | TranslateError::InvalidConfig(_)
        )
    }
}

/// A non-fatal error for one attempt at one segment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SegmentError {
    /// Connection, TLS or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from translation service")]
    Http { status: u16 },

    /// The body did not have the expected nested-array shape.
    #[error("unparseable response: {0}")]
    Unparseable(String),

    /// The call did not finish within the per-call timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Errors raised by object-store and record-store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object or record does not exist.
    #[error("'{0}' not found")]
    NotFound(String),

    /// Upload without overwrite hit an existing object.
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    /// A translation status change would leave a terminal state.
    #[error("invalid status transition {from} → {to}")]
    InvalidTransition { from: String, to: String },

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Remote store could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote store returned a body that does not match the record schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// Injected or backend-specific failure.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_service_display() {
        let e = TranslateError::TranslationService {
            segment: 4,
            attempts: 3,
            detail: "HTTP 503 from translation service".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("segment 4"), "got: {msg}");
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
    }

    #[test]
    fn storage_display_includes_path_and_source() {
        let e = TranslateError::Storage {
            operation: "download",
            path: "u1/123.pdf".into(),
            source: StoreError::NotFound("documents/u1/123.pdf".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("download"));
        assert!(msg.contains("u1/123.pdf"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn timeouts_share_a_kind() {
        let api = TranslateError::ApiTimeout { segment: 0, secs: 30 };
        let deadline = TranslateError::DeadlineExceeded { secs: 300 };
        assert_eq!(api.kind(), ErrorKind::Timeout);
        assert_eq!(deadline.kind(), ErrorKind::Timeout);
        assert!(api.to_string().contains("30s"));
    }

    #[test]
    fn update_errors_do_not_mark_failed() {
        let e = TranslateError::Update {
            translation_id: "t1".into(),
            source: StoreError::Transport("connection reset".into()),
        };
        assert_eq!(e.kind(), ErrorKind::Update);
        assert!(!e.marks_failed());
        assert!(TranslateError::NotFound {
            document_id: "d1".into()
        }
        .marks_failed());
        assert!(!TranslateError::InvalidRequest("empty".into()).marks_failed());
    }

    #[test]
    fn segment_error_display() {
        assert_eq!(
            SegmentError::Http { status: 429 }.to_string(),
            "HTTP 429 from translation service"
        );
        assert!(SegmentError::Timeout { secs: 5 }.to_string().contains("5s"));
    }
}
