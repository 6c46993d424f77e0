//! Wire-format tests for the Google translation client against a mock server.

use edgequake_doctranslate::pipeline::translate::translate_text;
use edgequake_doctranslate::{
    GoogleTranslate, PipelineConfig, SegmentError, TranslateError, TranslationService,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> GoogleTranslate {
    GoogleTranslate::with_endpoint(format!("{}/translate_a/single", server.uri())).unwrap()
}

#[tokio::test]
async fn sends_gtx_query_and_concatenates_pieces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("client", "gtx"))
        .and(query_param("sl", "auto"))
        .and(query_param("tl", "es"))
        .and(query_param("dt", "t"))
        .and(query_param("q", "Hello\nWorld & more"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [["Hola\n", "Hello\n", null, null, 10], ["Mundo y más", "World & more", null, null, 10]],
            null,
            "en"
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let out = client(&server)
        .await
        .translate("Hello\nWorld & more", "auto", "es")
        .await
        .unwrap();
    assert_eq!(out, "Hola\nMundo y más");
}

#[tokio::test]
async fn null_first_element_is_empty_translation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([null, null, "en"])))
        .mount(&server)
        .await;

    let out = client(&server).await.translate("   x", "auto", "fr").await.unwrap();
    assert_eq!(out, "");
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .translate("Hello", "auto", "de")
        .await
        .unwrap_err();
    assert_eq!(err, SegmentError::Http { status: 429 });
}

#[tokio::test]
async fn reshaped_body_is_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "quota"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .translate("Hello", "auto", "de")
        .await
        .unwrap_err();
    assert!(matches!(err, SegmentError::Unparseable(_)));
}

#[tokio::test]
async fn driver_retries_then_reports_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = PipelineConfig::builder()
        .retry_backoff_ms(1)
        .max_attempts(3)
        .build()
        .unwrap();
    let err = translate_text(&client(&server).await, "Hello", "es", &config)
        .await
        .unwrap_err();
    match err {
        TranslateError::TranslationService {
            segment, attempts, detail,
        } => {
            assert_eq!(segment, 0);
            assert_eq!(attempts, 3);
            assert!(detail.contains("503"), "detail: {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
