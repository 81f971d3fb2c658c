//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for ingestion, search and question answering.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::dispatch::ContentKind;
use crate::error::MedleyError;
use crate::orchestrator::{AskOutcome, IngestResult, Orchestrator};
use crate::store::{ContentMatch, SourceRecord};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check_api_key(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'medley doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Medley API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ingest", "POST /ingest");
    Output::kv("Search", "POST /search");
    Output::kv("Recent", "GET  /recent?limit=N");
    Output::kv("Ask", "POST /ask");
    Output::kv("Ask about image", "POST /ask-image");
    Output::kv("Sources", "GET  /sources");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/search", post(search))
        .route("/recent", get(recent))
        .route("/ask", post(ask))
        .route("/ask-image", post(ask_image))
        .route("/sources", get(sources))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IngestRequest {
    /// Local file path or YouTube URL
    reference: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
struct MatchesResponse {
    results: Vec<ContentMatch>,
}

#[derive(Deserialize)]
struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    limit: usize,
}

fn default_recent_limit() -> usize {
    5
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Deserialize)]
struct AskImageRequest {
    /// Local path of a png or jpg image
    path: String,
    question: String,
    #[serde(default)]
    hint: Option<String>,
    /// Run OCR and use the result as the hint
    #[serde(default)]
    ocr: bool,
}

#[derive(Serialize)]
struct AskImageResponse {
    answer: String,
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceRecord>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map library errors onto HTTP statuses.
fn error_response(e: MedleyError) -> Response {
    let status = match &e {
        MedleyError::UnsupportedFormat(_) | MedleyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MedleyError::DecodeFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MedleyError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Response {
    match state.orchestrator.ingest(req.reference.trim()).await {
        Ok(result) => Json::<IngestResult>(result).into_response(),
        Err(e) => error_response(e),
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    if req.query.is_empty() {
        return bad_request("query must not be empty");
    }

    match state.orchestrator.search(&req.query).await {
        Ok(results) => Json(MatchesResponse { results }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Response {
    match state.orchestrator.most_recent(query.limit).await {
        Ok(results) => Json(MatchesResponse { results }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    if req.question.trim().is_empty() {
        return bad_request("question must not be empty");
    }

    match state.orchestrator.ask(&req.question).await {
        Ok(outcome) => Json::<AskOutcome>(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

async fn ask_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskImageRequest>,
) -> Response {
    if req.question.trim().is_empty() {
        return bad_request("question must not be empty");
    }

    let path = Path::new(&req.path);
    if crate::dispatch::classify(&req.path).ok() != Some(ContentKind::Image) {
        return bad_request("path must be a png or jpg image");
    }

    let hint = if req.ocr {
        state
            .orchestrator
            .ocr(path)
            .await
            .ok()
            .filter(|text| !text.trim().is_empty())
    } else {
        req.hint
    };

    match state
        .orchestrator
        .ask_about_image(path, &req.question, hint.as_deref())
        .await
    {
        Ok(answer) => Json(AskImageResponse { answer }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn sources(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.list_sources().await {
        Ok(sources) => Json(SourcesResponse {
            total: sources.len(),
            sources,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let status = |e| error_response(e).status();
        assert_eq!(
            status(MedleyError::UnsupportedFormat(".csv".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(MedleyError::Config("No API key".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(MedleyError::Store("locked".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
