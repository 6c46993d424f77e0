//! In-memory stores for tests and the CLI's `file` mode.
//!
//! Both stores honour the same contracts as the hosted backend, including
//! monotone status transitions, and expose a few failure switches so
//! collaborator errors can be provoked deterministically.

use super::{ObjectStore, RecordStore, StoreResult};
use crate::error::StoreError;
use crate::model::{Document, DocumentStatus, NewTranslation, Translation, TranslationUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Object store backed by a map of `(bucket, path)` keys.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly.
    pub async fn put(&self, bucket: &str, path: &str, data: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data: data.into(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub async fn get(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.data.clone())
    }

    pub async fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.content_type.clone())
    }

    /// Sorted paths in one bucket.
    pub async fn paths(&self, bucket: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Make every subsequent upload fail.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        self.get(bucket, path)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{path}")))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> StoreResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Other(format!("injected upload failure for {bucket}/{path}")));
        }
        let key = (bucket.to_string(), path.to_string());
        let mut objects = self.objects.write().await;
        if !overwrite && objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!("{bucket}/{path}")));
        }
        objects.insert(
            key,
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn exists(&self, bucket: &str, path: &str) -> StoreResult<bool> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), path.to_string())))
    }
}

/// Record store holding documents by id and translations in insert order.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    documents: RwLock<HashMap<String, Document>>,
    translations: RwLock<Vec<Translation>>,
    fail_completion: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_document(&self, document: Document) {
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document);
    }

    pub async fn document(&self, id: &str) -> Option<Document> {
        self.documents.read().await.get(id).cloned()
    }

    /// Every translation record, oldest first.
    pub async fn translations(&self) -> Vec<Translation> {
        self.translations.read().await.clone()
    }

    /// Make updates that set `completed` fail, leaving the record untouched.
    pub fn set_fail_completion(&self, fail: bool) {
        self.fail_completion.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_document(&self, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.document(id).await)
    }

    async fn update_document_status(&self, id: &str, status: DocumentStatus) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let doc = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("documents/{id}")))?;
        doc.status = status;
        Ok(())
    }

    async fn insert_translation(&self, new: &NewTranslation) -> StoreResult<Translation> {
        let record = Translation {
            id: Uuid::new_v4().to_string(),
            document_id: new.document_id.clone(),
            target_language: new.target_language.clone(),
            translated_pdf_path: None,
            translated_word_path: None,
            translation_date: Utc::now(),
            completed_at: None,
            status: new.status,
            error_message: None,
        };
        self.translations.write().await.push(record.clone());
        Ok(record)
    }

    async fn latest_translation(
        &self,
        document_id: &str,
        target_language: &str,
    ) -> StoreResult<Option<Translation>> {
        // Ties on the timestamp resolve to the later insert.
        Ok(self
            .translations
            .read()
            .await
            .iter()
            .filter(|t| t.document_id == document_id && t.target_language == target_language)
            .max_by_key(|t| t.translation_date)
            .cloned())
    }

    async fn update_translation(
        &self,
        id: &str,
        update: &TranslationUpdate,
    ) -> StoreResult<Translation> {
        if self.fail_completion.load(Ordering::SeqCst)
            && update.status == Some(crate::model::TranslationStatus::Completed)
        {
            return Err(StoreError::Other(format!(
                "injected completion failure for translations/{id}"
            )));
        }
        let mut translations = self.translations.write().await;
        let record = translations
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("translations/{id}")))?;
        record
            .apply(update)
            .map_err(|(from, to)| StoreError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        Ok(record.clone())
    }
}
