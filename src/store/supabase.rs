//! Hosted backend: Supabase Storage and PostgREST over HTTP.
//!
//! One client implements both store traits. Every request carries the
//! service-role key twice, as the `apikey` header and as a bearer token,
//! which is what both gateways expect.
//!
//! | operation                  | request                                            |
//! |----------------------------|----------------------------------------------------|
//! | download                   | `GET  /storage/v1/object/{bucket}/{path}`          |
//! | upload                     | `POST /storage/v1/object/{bucket}/{path}` + `x-upsert` |
//! | get_document               | `GET  /rest/v1/documents?id=eq.{id}`               |
//! | update_document_status     | `PATCH /rest/v1/documents?id=eq.{id}`              |
//! | insert_translation         | `POST /rest/v1/translations`                       |
//! | latest_translation         | `GET  /rest/v1/translations?…&order=translation_date.desc&limit=1` |
//! | update_translation         | `PATCH /rest/v1/translations?id=eq.{id}`           |

use super::{ObjectStore, RecordStore, StoreResult};
use crate::error::StoreError;
use crate::model::{
    Document, DocumentStatus, NewTranslation, Translation, TranslationStatus, TranslationUpdate,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Client for one Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SupabaseClient {
    /// `base_url` is the project URL, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: impl Into<String>, service_key: &str) -> StoreResult<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Other(format!("invalid project URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Other(format!(
                "project URL {base_url} cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|_| StoreError::Other("service key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|_| StoreError::Other("service key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
        })
    }

    /// Object keys are percent-encoded segment by segment, so `#`, `?` and
    /// `%` stay part of the key instead of ending the path.
    fn object_url(&self, bucket: &str, path: &str) -> StoreResult<Url> {
        self.url_with(
            ["storage", "v1", "object", bucket]
                .into_iter()
                .chain(path.split('/')),
        )
    }

    fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.url_with(["rest", "v1", table])
    }

    fn url_with<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Other("project URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn rows<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> StoreResult<Vec<T>> {
        self.send(request)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Storage answers a missing object with 404, or with 400 and a JSON body
/// whose `statusCode` is `"404"`, depending on the version.
fn is_missing_object(status: u16, body: &str) -> bool {
    status == 404 || (status == 400 && body.contains("\"404\""))
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn download(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        let request = self.http.get(self.object_url(bucket, path)?);
        match self.send(request).await {
            Ok(response) => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| StoreError::Transport(e.to_string()))?;
                debug!("Downloaded {} bytes from {bucket}/{path}", bytes.len());
                Ok(bytes.to_vec())
            }
            Err(StoreError::Http { status, body }) if is_missing_object(status, &body) => {
                Err(StoreError::NotFound(format!("{bucket}/{path}")))
            }
            Err(e) => Err(e),
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> StoreResult<()> {
        let size = data.len();
        let request = self
            .http
            .post(self.object_url(bucket, path)?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .body(data);
        match self.send(request).await {
            Ok(_) => {
                debug!("Uploaded {size} bytes to {bucket}/{path}");
                Ok(())
            }
            Err(StoreError::Http { status: 409, .. }) => {
                Err(StoreError::AlreadyExists(format!("{bucket}/{path}")))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn get_document(&self, id: &str) -> StoreResult<Option<Document>> {
        let request = self
            .http
            .get(self.table_url("documents")?)
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())]);
        Ok(self.rows::<Document>(request).await?.into_iter().next())
    }

    async fn update_document_status(&self, id: &str, status: DocumentStatus) -> StoreResult<()> {
        let request = self
            .http
            .patch(self.table_url("documents")?)
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "status": status }));
        self.send(request).await?;
        Ok(())
    }

    async fn insert_translation(&self, new: &NewTranslation) -> StoreResult<Translation> {
        let request = self
            .http
            .post(self.table_url("translations")?)
            .header("Prefer", "return=representation")
            .json(new);
        self.rows::<Translation>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".into()))
    }

    async fn latest_translation(
        &self,
        document_id: &str,
        target_language: &str,
    ) -> StoreResult<Option<Translation>> {
        let request = self.http.get(self.table_url("translations")?).query(&[
            ("document_id", format!("eq.{document_id}")),
            ("target_language", format!("eq.{target_language}")),
            ("select", "*".to_string()),
            ("order", "translation_date.desc".to_string()),
            ("limit", "1".to_string()),
        ]);
        Ok(self.rows::<Translation>(request).await?.into_iter().next())
    }

    async fn update_translation(
        &self,
        id: &str,
        update: &TranslationUpdate,
    ) -> StoreResult<Translation> {
        let mut filters = vec![("id", format!("eq.{id}"))];
        // The row filter makes the terminal transition conditional, so a
        // completed record cannot be flipped to failed (or back).
        if let Some(next) = update.status.filter(|s| s.is_terminal()) {
            filters.push((
                "status",
                format!("in.({},{next})", TranslationStatus::Processing),
            ));
        }
        let request = self
            .http
            .patch(self.table_url("translations")?)
            .query(&filters)
            .header("Prefer", "return=representation")
            .json(&TranslationPatch::from(update));
        self.rows::<Translation>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| match update.status {
                Some(next) if next.is_terminal() => StoreError::InvalidTransition {
                    from: "unknown or terminal".into(),
                    to: next.to_string(),
                },
                _ => StoreError::NotFound(format!("translations/{id}")),
            })
    }
}

/// Wire form of [`TranslationUpdate`] for the `translations` table.
///
/// The table has no completion-time column; `completed_at` is only kept by
/// the local stores.
#[derive(Debug, Serialize)]
struct TranslationPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TranslationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translated_pdf_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translated_word_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

impl<'a> From<&'a TranslationUpdate> for TranslationPatch<'a> {
    fn from(update: &'a TranslationUpdate) -> Self {
        Self {
            status: update.status,
            translated_pdf_path: update.translated_pdf_path.as_deref(),
            translated_word_path: update.translated_word_path.as_deref(),
            error_message: update.error_message.as_deref(),
        }
    }
}
