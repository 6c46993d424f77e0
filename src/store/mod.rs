//! Storage collaborators: blob storage for originals and artifacts, and the
//! record store for documents and translations.
//!
//! Both are traits so the orchestrator can run against the hosted backend
//! ([`supabase::SupabaseClient`]), the filesystem ([`local::LocalObjectStore`])
//! or in-memory fakes ([`memory`]) without knowing which. Implementations are
//! shared across requests behind an `Arc` and must hold no per-request state.

use crate::error::StoreError;
use crate::model::{Document, DocumentStatus, NewTranslation, Translation, TranslationUpdate};
use async_trait::async_trait;

pub mod local;
pub mod memory;
pub mod supabase;

pub type StoreResult<T> = Result<T, StoreError>;

/// Bucketed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. A missing object is [`StoreError::NotFound`].
    async fn download(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>>;

    /// Store an object. Without `overwrite`, an existing object is
    /// [`StoreError::AlreadyExists`].
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> StoreResult<()>;

    /// Whether an object exists. The default downloads it.
    async fn exists(&self, bucket: &str, path: &str) -> StoreResult<bool> {
        match self.download(bucket, path).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Document and translation records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `None` when no document has this id.
    async fn get_document(&self, id: &str) -> StoreResult<Option<Document>>;

    async fn update_document_status(&self, id: &str, status: DocumentStatus) -> StoreResult<()>;

    /// Insert and return the stored record with its generated id.
    async fn insert_translation(&self, new: &NewTranslation) -> StoreResult<Translation>;

    /// Most recently created translation for the pair, whatever its status.
    async fn latest_translation(
        &self,
        document_id: &str,
        target_language: &str,
    ) -> StoreResult<Option<Translation>>;

    /// Apply a partial update by id and return the updated record.
    ///
    /// Status changes out of a terminal state are rejected.
    async fn update_translation(
        &self,
        id: &str,
        update: &TranslationUpdate,
    ) -> StoreResult<Translation>;
}
