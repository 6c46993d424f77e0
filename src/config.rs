//! Configuration types for document translation.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. One struct holds every knob so the same
//! config can be shared by the HTTP service, the CLI, and tests, and so two
//! runs can be compared field by field.

use crate::error::TranslateError;
use crate::pipeline::pdf::PdfLayout;
use crate::progress::ProgressCallback;
use std::fmt;

/// Public Google endpoint used by [`crate::pipeline::translate::GoogleTranslate`].
pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Configuration for a translation request.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doctranslate::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .concurrency(2)
///     .max_attempts(5)
///     .output_bucket("renditions")
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_size, 500);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum characters per segment sent to the translation service. Default: 500.
    ///
    /// The public endpoint rejects or truncates long `q` parameters; 500
    /// characters keeps every request URL comfortably under common limits.
    pub chunk_size: usize,

    /// Number of segments translated at once. Default: 4. `1` is strictly sequential.
    pub concurrency: usize,

    /// Attempts per segment before the request fails. Default: 3.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds, doubled per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for the translation service in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Deadline for a whole request in seconds. Default: 300.
    pub request_deadline_secs: u64,

    /// Source language sent with every segment. Default: `"auto"`.
    pub source_language: String,

    /// Bucket holding uploaded originals. Default: `"documents"`.
    pub input_bucket: String,

    /// Bucket receiving rendered artifacts. Default: `"translations"`.
    pub output_bucket: String,

    /// Page geometry and typography for the PDF renderer.
    pub pdf_layout: PdfLayout,

    /// Optional per-segment progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            concurrency: 4,
            max_attempts: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 30,
            request_deadline_secs: 300,
            source_language: "auto".to_string(),
            input_bucket: "documents".to_string(),
            output_bucket: "translations".to_string(),
            pdf_layout: PdfLayout::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("request_deadline_secs", &self.request_deadline_secs)
            .field("source_language", &self.source_language)
            .field("input_bucket", &self.input_bucket)
            .field("output_bucket", &self.output_bucket)
            .field("pdf_layout", &self.pdf_layout)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TranslationProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn request_deadline_secs(mut self, secs: u64) -> Self {
        self.config.request_deadline_secs = secs;
        self
    }

    pub fn source_language(mut self, lang: impl Into<String>) -> Self {
        self.config.source_language = lang.into();
        self
    }

    pub fn input_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.input_bucket = bucket.into();
        self
    }

    pub fn output_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.output_bucket = bucket.into();
        self
    }

    pub fn pdf_layout(mut self, layout: PdfLayout) -> Self {
        self.config.pdf_layout = layout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, TranslateError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(TranslateError::InvalidConfig(
                "Chunk size must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(TranslateError::InvalidConfig(
                "Max attempts must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.request_deadline_secs == 0 {
            return Err(TranslateError::InvalidConfig(
                "Timeouts must be ≥ 1s".into(),
            ));
        }
        if c.input_bucket.is_empty() || c.output_bucket.is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Bucket names must not be empty".into(),
            ));
        }
        c.pdf_layout.validate()?;
        Ok(self.config)
    }
}
