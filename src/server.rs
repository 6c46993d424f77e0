//! HTTP surface: `POST /translate-document` and `GET /health`.
//!
//! The handler is a thin adapter: parse the body, run the orchestrator, map
//! the outcome onto a status code and a JSON body. Browsers call the service
//! directly from the upload page, hence the permissive CORS policy.

use crate::error::{ErrorKind, TranslateError};
use crate::model::{TranslateRequest, TranslateResponse};
use crate::orchestrator::Orchestrator;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the router. Exposed separately from [`serve`] for tests.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route(
            "/translate-document",
            post(translate_document).options(preflight),
        )
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind TCP listener to {}: {}", addr, e);
        e
    })?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

/// HTTP status for a failed request.
pub fn status_for(err: &TranslateError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn translate_document(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> (StatusCode, Json<TranslateResponse>) {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(TranslateResponse::failure(rejection.body_text())),
            )
        }
    };

    match state.orchestrator.translate(&request).await {
        Ok(_) => (StatusCode::OK, Json(TranslateResponse::completed())),
        Err(e) => (status_for(&e), Json(TranslateResponse::failure(e.to_string()))),
    }
}

/// Plain `OPTIONS` without CORS request headers still succeeds.
async fn preflight() -> &'static str {
    "ok"
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
