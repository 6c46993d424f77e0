//! Filesystem object store: `{root}/{bucket}/{path}`.

use super::{ObjectStore, StoreResult};
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Object store rooted at a local directory. Content types are not kept.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a file path, rejecting anything that could escape
    /// the root (absolute paths, `..`, prefixes).
    pub fn object_path(&self, bucket: &str, path: &str) -> StoreResult<PathBuf> {
        for part in [bucket, path] {
            let p = Path::new(part);
            if part.is_empty() || !p.components().all(|c| matches!(c, Component::Normal(_))) {
                return Err(StoreError::Other(format!(
                    "invalid object key '{bucket}/{path}'"
                )));
            }
        }
        Ok(self.root.join(bucket).join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        let file = self.object_path(bucket, path)?;
        fs::read(&file).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(format!("{bucket}/{path}"))
            } else {
                StoreError::Io(e)
            }
        })
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
        overwrite: bool,
    ) -> StoreResult<()> {
        let file = self.object_path(bucket, path)?;
        if !overwrite && fs::try_exists(&file).await? {
            return Err(StoreError::AlreadyExists(format!("{bucket}/{path}")));
        }
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file, &data).await?;
        debug!("Wrote {} bytes to {}", data.len(), file.display());
        Ok(())
    }

    async fn exists(&self, bucket: &str, path: &str) -> StoreResult<bool> {
        let file = self.object_path(bucket, path)?;
        Ok(fs::try_exists(&file).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trip_under_bucket_directory() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store
            .upload("translations", "u1/d1_es.pdf", b"%PDF".to_vec(), "application/pdf", true)
            .await
            .unwrap();

        assert!(dir.path().join("translations/u1/d1_es.pdf").is_file());
        assert_eq!(
            store.download("translations", "u1/d1_es.pdf").await.unwrap(),
            b"%PDF"
        );
        assert!(store.exists("translations", "u1/d1_es.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn overwrite_false_keeps_existing_object() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.upload("b", "k", b"1".to_vec(), "", false).await.unwrap();
        let err = store.upload("b", "k", b"2".to_vec(), "", false).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.download("b", "k").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.download("b", "nope").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists("b", "nope").await.unwrap());
    }

    #[test]
    fn traversal_is_rejected() {
        let store = LocalObjectStore::new("/srv/objects");
        assert!(store.object_path("b", "../etc/passwd").is_err());
        assert!(store.object_path("b", "/etc/passwd").is_err());
        assert!(store.object_path("..", "x").is_err());
        assert!(store.object_path("b", "").is_err());
        assert_eq!(
            store.object_path("b", "u1/x.pdf").unwrap(),
            PathBuf::from("/srv/objects/b/u1/x.pdf")
        );
    }
}
