//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Used by the CLI's `file` mode, which feeds a document from outside any
//! object store into the same pipeline the service runs. The bytes are not
//! checked against any format; the extractor accepts anything.

use crate::error::{StoreError, TranslateError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A loaded original plus the name it should be stored under.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub bytes: Vec<u8>,
    /// Last path component, e.g. `report.pdf`.
    pub filename: String,
}

impl ResolvedInput {
    /// Extension of `filename` without the dot, `"bin"` when there is none.
    pub fn extension(&self) -> &str {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("bin")
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` from the local filesystem or over HTTP(S).
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, TranslateError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, TranslateError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        let source = if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path_str.to_string())
        } else {
            StoreError::Io(e)
        };
        TranslateError::Storage {
            operation: "read",
            path: path_str.to_string(),
            source,
        }
    })?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input")
        .to_string();
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(ResolvedInput { bytes, filename })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, TranslateError> {
    info!("Downloading original from: {}", url);
    let fail = |source: StoreError| TranslateError::Storage {
        operation: "download",
        path: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TranslateError::Internal(format!("Failed to build HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(StoreError::Transport(e.to_string())))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(StoreError::Http {
            status: status.as_u16(),
            body: String::new(),
        }));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fail(StoreError::Transport(e.to_string())))?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ResolvedInput {
        bytes: bytes.to_vec(),
        filename: filename_from_url(url),
    })
}

/// Last non-empty path segment containing a dot, else `downloaded.bin`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.bin".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_comes_from_last_segment() {
        assert_eq!(filename_from_url("https://x.test/a/b/report.pdf?x=1"), "report.pdf");
        assert_eq!(filename_from_url("https://x.test/a/b/"), "downloaded.bin");
        assert_eq!(filename_from_url("not a url"), "downloaded.bin");
    }

    #[test]
    fn extension_falls_back_to_bin() {
        let with = ResolvedInput {
            bytes: vec![],
            filename: "notes.txt".into(),
        };
        let without = ResolvedInput {
            bytes: vec![],
            filename: "README".into(),
        };
        assert_eq!(with.extension(), "txt");
        assert_eq!(without.extension(), "bin");
    }

    #[tokio::test]
    async fn reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"Hello\nWorld").unwrap();

        let input = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(input.bytes, b"Hello\nWorld");
        assert_eq!(input.filename, "hello.txt");
    }

    #[tokio::test]
    async fn missing_local_file_is_a_storage_error() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(
            err,
            TranslateError::Storage {
                source: StoreError::NotFound(_),
                ..
            }
        ));
    }
}
