//! Translation client: send segments to the external service and reassemble.
//!
//! ## Ordering
//!
//! Segments may be translated concurrently (`concurrency > 1`), so results
//! arrive in completion order. Each result is written into a pre-sized slot
//! addressed by its segment index and the final text is the concatenation of
//! the slots in index order, never the order in which calls finished.
//!
//! ## Retry Strategy
//!
//! The public endpoint throttles aggressively (HTTP 429) and occasionally
//! returns truncated bodies. Each segment gets `max_attempts` attempts with
//! exponential backoff (`retry_backoff_ms * 2^(attempt-1)`): with the
//! defaults the waits are 500 ms → 1 s. Every attempt is bounded by
//! `api_timeout_secs`. When a segment runs out of attempts the whole request
//! fails; a document with a hole in the middle is worse than no document.

use crate::config::{PipelineConfig, DEFAULT_TRANSLATE_ENDPOINT};
use crate::error::{SegmentError, TranslateError};
use crate::pipeline::chunk::chunk_text;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// An external machine-translation backend.
///
/// Implementations must be stateless with respect to requests: one instance
/// is shared by every request the service handles.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Translate one segment. `source` is usually `"auto"`.
    async fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, SegmentError>;
}

/// Client for the public `translate_a/single` endpoint (`client=gtx`).
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    http: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslate {
    /// Client for the public endpoint.
    pub fn new() -> Result<Self, TranslateError> {
        Self::with_endpoint(DEFAULT_TRANSLATE_ENDPOINT)
    }

    /// Client for a compatible endpoint (proxies, test servers).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("edgequake-doctranslate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslateError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationService for GoogleTranslate {
    fn name(&self) -> &str {
        "google-gtx"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, SegmentError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| SegmentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SegmentError::Http {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SegmentError::Unparseable(e.to_string()))?;
        parse_translation(&body)
    }
}

/// Extract the translated text from the service's nested-array response.
///
/// Expected shape: `[[["piece", "original", …], ["piece", …], …], …]`.
/// The schema is not contractual, so:
/// - a `null` first element means nothing was translated → `""`
/// - pieces whose first member is not a string are skipped
/// - anything else that is not an array is unparseable
pub fn parse_translation(body: &Value) -> Result<String, SegmentError> {
    let top = body.as_array().ok_or_else(|| {
        SegmentError::Unparseable(format!("expected a top-level array, got {}", json_kind(body)))
    })?;

    match top.first() {
        Some(Value::Array(pieces)) => Ok(pieces
            .iter()
            .filter_map(|piece| piece.get(0).and_then(Value::as_str))
            .collect()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(SegmentError::Unparseable(format!(
            "expected an array of pieces, got {}",
            json_kind(other)
        ))),
        None => Err(SegmentError::Unparseable("empty response array".into())),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result of translating a whole text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText {
    /// Concatenation of `segments` in index order.
    pub text: String,
    /// Per-segment outputs, index-aligned with the input segments.
    pub segments: Vec<String>,
}

/// Chunk `text`, translate every segment into `target`, and reassemble.
///
/// Empty text makes no calls and yields empty output.
pub async fn translate_text(
    service: &dyn TranslationService,
    text: &str,
    target: &str,
    config: &PipelineConfig,
) -> Result<TranslatedText, TranslateError> {
    let segments = chunk_text(text, config.chunk_size);
    let start = Instant::now();
    info!(
        "Translating {} chars in {} segments via {} → {}",
        text.chars().count(),
        segments.len(),
        service.name(),
        target
    );

    let translated = translate_segments(service, &segments, target, config).await?;
    let text: String = translated.concat();

    info!(
        "Translated {} segments in {}ms",
        translated.len(),
        start.elapsed().as_millis()
    );
    Ok(TranslatedText {
        text,
        segments: translated,
    })
}

/// Translate `segments` with bounded concurrency, preserving index order.
///
/// Returns a vector of the same length as `segments` where element `i` is
/// the translation of `segments[i]`. Aborts on the first segment that
/// exhausts its attempts; in-flight calls are dropped.
pub async fn translate_segments(
    service: &dyn TranslationService,
    segments: &[&str],
    target: &str,
    config: &PipelineConfig,
) -> Result<Vec<String>, TranslateError> {
    let total = segments.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_start(total);
    }

    let mut slots: Vec<Option<String>> = vec![None; total];
    let mut completions = stream::iter(0..total)
        .map(|index| translate_indexed(service, index, segments[index], total, target, config))
        .buffer_unordered(config.concurrency.max(1));

    while let Some((index, result)) = completions.next().await {
        match result {
            Ok(translated) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_segment_complete(index, total, translated.chars().count());
                }
                slots[index] = Some(translated);
            }
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_segment_error(index, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_complete(total);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| TranslateError::Internal(format!("segment {i} produced no result")))
        })
        .collect()
}

async fn translate_indexed(
    service: &dyn TranslationService,
    index: usize,
    segment: &str,
    total: usize,
    target: &str,
    config: &PipelineConfig,
) -> (usize, Result<String, TranslateError>) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_segment_start(index, total);
    }
    (index, translate_segment(service, index, segment, target, config).await)
}

/// Translate one segment with retries, keeping its edge whitespace.
///
/// The service trims leading and trailing whitespace, which would swallow
/// line breaks that fall on a segment boundary, so edges are split off
/// before the call and re-attached afterwards. Whitespace-only segments are
/// returned unchanged without a call.
async fn translate_segment(
    service: &dyn TranslationService,
    index: usize,
    segment: &str,
    target: &str,
    config: &PipelineConfig,
) -> Result<String, TranslateError> {
    let core = segment.trim();
    if core.is_empty() {
        return Ok(segment.to_string());
    }
    let lead = &segment[..segment.len() - segment.trim_start().len()];
    let trail = &segment[segment.trim_end().len()..];

    let translated = translate_with_retry(service, index, core, target, config).await?;
    Ok(format!("{lead}{translated}{trail}"))
}

async fn translate_with_retry(
    service: &dyn TranslationService,
    index: usize,
    text: &str,
    target: &str,
    config: &PipelineConfig,
) -> Result<String, TranslateError> {
    let max_attempts = config.max_attempts.max(1);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<SegmentError> = None;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(1u64 << (attempt - 2).min(16));
            warn!(
                "Segment {}: retry {}/{} after {}ms",
                index,
                attempt - 1,
                max_attempts - 1,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = service.translate(text, &config.source_language, target);
        let result = match timeout(call_timeout, call).await {
            Ok(r) => r,
            Err(_) => Err(SegmentError::Timeout {
                secs: config.api_timeout_secs,
            }),
        };

        match result {
            Ok(translated) => {
                debug!(
                    "Segment {}: {} → {} chars on attempt {}",
                    index,
                    text.chars().count(),
                    translated.chars().count(),
                    attempt
                );
                return Ok(translated);
            }
            Err(e) => {
                warn!("Segment {}: attempt {} failed: {}", index, attempt, e);
                if attempt < max_attempts {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_segment_retry(index, attempt, &e.to_string());
                    }
                }
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(SegmentError::Timeout { secs }) => TranslateError::ApiTimeout {
            segment: index,
            secs,
        },
        Some(e) => TranslateError::TranslationService {
            segment: index,
            attempts: max_attempts,
            detail: e.to_string(),
        },
        None => TranslateError::Internal(format!("segment {index}: no attempt was made")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Uppercases its input; records every call.
    #[derive(Default)]
    struct Upper {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TranslationService for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, SegmentError> {
            self.calls.lock().unwrap().push(text.to_string());
            Ok(text.to_uppercase())
        }
    }

    /// Fails the first `failures` calls with the given error.
    struct Flaky {
        failures: u32,
        error: SegmentError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TranslationService for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, SegmentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(format!("<{text}>"))
            }
        }
    }

    /// Later segments finish first.
    struct ReverseLatency {
        total: u64,
    }

    #[async_trait]
    impl TranslationService for ReverseLatency {
        fn name(&self) -> &str {
            "reverse-latency"
        }

        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, SegmentError> {
            let index: u64 = text.trim_start_matches('s').parse().unwrap();
            sleep(Duration::from_millis((self.total - index) * 10)).await;
            Ok(format!("[{text}]"))
        }
    }

    struct Hangs;

    #[async_trait]
    impl TranslationService for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }

        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, SegmentError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn config(concurrency: usize) -> PipelineConfig {
        PipelineConfig::builder()
            .concurrency(concurrency)
            .retry_backoff_ms(100)
            .api_timeout_secs(5)
            .build()
            .unwrap()
    }

    // ── parse_translation ────────────────────────────────────────────────

    #[test]
    fn parses_nested_pieces() {
        let body = json!([[["Hola ", "Hello ", null], ["mundo", "world", null]], null, "en"]);
        assert_eq!(parse_translation(&body).unwrap(), "Hola mundo");
    }

    #[test]
    fn skips_malformed_pieces() {
        let body = json!([[["uno"], 42, [null, "x"], [], ["dos"]]]);
        assert_eq!(parse_translation(&body).unwrap(), "unodos");
    }

    #[test]
    fn null_first_element_is_empty() {
        assert_eq!(parse_translation(&json!([null, null, "en"])).unwrap(), "");
    }

    #[test]
    fn rejects_reshaped_bodies() {
        for body in [json!({"error": "quota"}), json!("text"), json!([]), json!(["flat"])] {
            assert!(
                matches!(parse_translation(&body), Err(SegmentError::Unparseable(_))),
                "accepted {body}"
            );
        }
    }

    // ── driver ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_text_makes_no_calls() {
        let svc = Upper::default();
        let out = translate_text(&svc, "", "es", &config(4)).await.unwrap();
        assert_eq!(out.text, "");
        assert!(out.segments.is_empty());
        assert!(svc.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn output_is_literal_concatenation_of_segments() {
        let svc = Upper::default();
        let text = "abc".repeat(400); // 1200 chars → 3 segments
        let out = translate_text(&svc, &text, "es", &config(2)).await.unwrap();
        assert_eq!(out.segments.len(), 3);
        assert_eq!(out.text, out.segments.concat());
        assert_eq!(out.text, text.to_uppercase());
    }

    #[tokio::test(start_paused = true)]
    async fn order_survives_out_of_order_completion() {
        let total = 8u64;
        let segments: Vec<String> = (0..total).map(|i| format!("s{i}")).collect();
        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let svc = ReverseLatency { total };

        let out = translate_segments(&svc, &refs, "de", &config(8)).await.unwrap();
        let expected: Vec<String> = (0..total).map(|i| format!("[s{i}]")).collect();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn whitespace_edges_are_kept_and_blank_segments_skip_the_call() {
        let svc = Upper::default();
        let out = translate_segments(&svc, &["\n  ", " ab\n", "cd"], "es", &config(1))
            .await
            .unwrap();
        assert_eq!(out, vec!["\n  ", " AB\n", "CD"]);
        assert_eq!(*svc.calls.lock().unwrap(), vec!["ab", "cd"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let svc = Flaky {
            failures: 2,
            error: SegmentError::Http { status: 503 },
            calls: AtomicU32::new(0),
        };
        let out = translate_segments(&svc, &["hi"], "fr", &config(1)).await.unwrap();
        assert_eq!(out, vec!["<hi>"]);
        assert_eq!(svc.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_abort_with_last_detail() {
        let svc = Flaky {
            failures: u32::MAX,
            error: SegmentError::Unparseable("expected a top-level array, got object".into()),
            calls: AtomicU32::new(0),
        };
        let err = translate_segments(&svc, &["hi"], "fr", &config(1))
            .await
            .unwrap_err();
        match err {
            TranslateError::TranslationService {
                segment,
                attempts,
                detail,
            } => {
                assert_eq!(segment, 0);
                assert_eq!(attempts, 3);
                assert!(detail.contains("got object"), "detail: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(svc.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_surface_as_api_timeout() {
        let err = translate_segments(&Hangs, &["slow"], "it", &config(1))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TranslateError::ApiTimeout { segment: 0, secs: 5 }),
            "got {err:?}"
        );
    }
}
