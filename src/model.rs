//! Records, requests and artifact naming.
//!
//! Field names follow the `documents` / `translations` table columns so the
//! same structs round-trip through PostgREST without a mapping layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an uploaded original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Processing,
    Completed,
    Failed,
}

/// One uploaded original file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Owner identity; also the first path segment of every stored object.
    pub user_id: String,
    pub original_filename: String,
    /// Path of the original inside the input bucket.
    pub original_file_path: String,
    /// Declared source language. Usually `"auto"` and never validated.
    #[serde(default = "auto_language")]
    pub original_language: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: String,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub status: DocumentStatus,
}

fn auto_language() -> String {
    "auto".to_string()
}

/// Lifecycle of one (document, target language) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl TranslationStatus {
    /// `processing` is the only non-terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TranslationStatus::Processing)
    }

    /// Transitions are monotone: `processing → completed | failed`.
    ///
    /// Re-asserting the current status is allowed so that partial updates
    /// which only touch paths or messages stay valid.
    pub fn can_transition_to(self, next: TranslationStatus) -> bool {
        self == next || self == TranslationStatus::Processing
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TranslationStatus::Processing => "processing",
            TranslationStatus::Completed => "completed",
            TranslationStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One requested conversion of a document into a target language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: String,
    pub document_id: String,
    pub target_language: String,
    #[serde(default)]
    pub translated_pdf_path: Option<String>,
    #[serde(default)]
    pub translated_word_path: Option<String>,
    /// Creation timestamp.
    pub translation_date: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TranslationStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Translation {
    /// Apply a partial update in place, enforcing monotone status changes.
    ///
    /// Returns the rejected `(from, to)` pair on an illegal transition.
    pub fn apply(
        &mut self,
        update: &TranslationUpdate,
    ) -> Result<(), (TranslationStatus, TranslationStatus)> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err((self.status, next));
            }
            self.status = next;
        }
        if let Some(ref p) = update.translated_pdf_path {
            self.translated_pdf_path = Some(p.clone());
        }
        if let Some(ref p) = update.translated_word_path {
            self.translated_word_path = Some(p.clone());
        }
        if let Some(t) = update.completed_at {
            self.completed_at = Some(t);
        }
        if let Some(ref m) = update.error_message {
            self.error_message = Some(m.clone());
        }
        Ok(())
    }
}

/// Insert payload for a fresh `processing` translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTranslation {
    pub document_id: String,
    pub target_language: String,
    pub status: TranslationStatus,
}

impl NewTranslation {
    pub fn processing(document_id: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            target_language: target_language.into(),
            status: TranslationStatus::Processing,
        }
    }
}

/// Partial-field update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TranslationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_pdf_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_word_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TranslationUpdate {
    /// Terminal success: both artifact paths plus the completion time.
    pub fn completed(paths: &ArtifactPaths, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(TranslationStatus::Completed),
            translated_pdf_path: Some(paths.pdf.clone()),
            translated_word_path: Some(paths.docx.clone()),
            completed_at: Some(at),
            error_message: None,
        }
    }

    /// Terminal failure carrying the error text.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TranslationStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

// ── Service boundary ─────────────────────────────────────────────────────

/// Body of the translate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub document_id: String,
    pub target_language: String,
}

impl TranslateRequest {
    pub fn new(document_id: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            target_language: target_language.into(),
        }
    }
}

/// Body returned by the translate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslateResponse {
    Success { success: bool, message: String },
    Failure { error: String },
}

impl TranslateResponse {
    pub fn completed() -> Self {
        TranslateResponse::Success {
            success: true,
            message: "Translation completed".to_string(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        TranslateResponse::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslateResponse::Success { .. })
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────

/// The two rendered outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Pdf,
    Docx,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "application/pdf",
            ArtifactKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Deterministic output-bucket paths for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub pdf: String,
    pub docx: String,
}

impl ArtifactPaths {
    /// `{owner}/{document}_{language}.pdf` and the `.docx` sibling.
    pub fn for_request(owner_id: &str, document_id: &str, target_language: &str) -> Self {
        let stem = format!("{owner_id}/{document_id}_{target_language}");
        Self {
            pdf: format!("{stem}.{}", ArtifactKind::Pdf.extension()),
            docx: format!("{stem}.{}", ArtifactKind::Docx.extension()),
        }
    }

    pub fn path(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Pdf => &self.pdf,
            ArtifactKind::Docx => &self.docx,
        }
    }
}

/// Input-bucket path convention for originals: `{owner}/{timestamp}.{ext}`.
pub fn original_upload_path(owner_id: &str, timestamp_ms: i64, extension: &str) -> String {
    format!("{owner_id}/{timestamp_ms}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation() -> Translation {
        Translation {
            id: "t1".into(),
            document_id: "d1".into(),
            target_language: "es".into(),
            translated_pdf_path: None,
            translated_word_path: None,
            translation_date: Utc::now(),
            completed_at: None,
            status: TranslationStatus::Processing,
            error_message: None,
        }
    }

    #[test]
    fn artifact_paths_are_deterministic() {
        let a = ArtifactPaths::for_request("u1", "d1", "es");
        assert_eq!(a.pdf, "u1/d1_es.pdf");
        assert_eq!(a.docx, "u1/d1_es.docx");
        assert_eq!(a, ArtifactPaths::for_request("u1", "d1", "es"));
        assert_eq!(a.path(ArtifactKind::Docx), "u1/d1_es.docx");
    }

    #[test]
    fn original_path_convention() {
        assert_eq!(original_upload_path("u1", 123, "pdf"), "u1/123.pdf");
    }

    #[test]
    fn status_transitions_are_monotone() {
        use TranslationStatus::*;
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn apply_completed_sets_paths() {
        let mut t = translation();
        let paths = ArtifactPaths::for_request("u1", "d1", "es");
        t.apply(&TranslationUpdate::completed(&paths, Utc::now()))
            .unwrap();
        assert_eq!(t.status, TranslationStatus::Completed);
        assert_eq!(t.translated_pdf_path.as_deref(), Some("u1/d1_es.pdf"));
        assert_eq!(t.translated_word_path.as_deref(), Some("u1/d1_es.docx"));
        assert!(t.completed_at.is_some());

        let err = t.apply(&TranslationUpdate::failed("late")).unwrap_err();
        assert_eq!(err, (TranslationStatus::Completed, TranslationStatus::Failed));
        assert_eq!(t.error_message, None);
    }

    #[test]
    fn update_serialises_only_set_fields() {
        let json = serde_json::to_value(TranslationUpdate::failed("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "error_message": "boom"}));
    }

    #[test]
    fn request_uses_camel_case() {
        let req: TranslateRequest =
            serde_json::from_str(r#"{"documentId":"d1","targetLanguage":"es"}"#).unwrap();
        assert_eq!(req, TranslateRequest::new("d1", "es"));
    }

    #[test]
    fn response_shapes() {
        let ok = serde_json::to_value(TranslateResponse::completed()).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["message"], "Translation completed");
        let err = serde_json::to_value(TranslateResponse::failure("nope")).unwrap();
        assert_eq!(err, serde_json::json!({"error": "nope"}));
    }

    #[test]
    fn document_defaults_for_sparse_rows() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "id": "d1",
            "user_id": "u1",
            "original_filename": "report.pdf",
            "original_file_path": "u1/123.pdf",
            "upload_date": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(doc.original_language, "auto");
        assert_eq!(doc.status, DocumentStatus::Uploaded);
    }
}
