use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use super::memory::render_memory;
use super::models::{ErrorResponse, MemoryRequest, MemoryResponse};
use super::state::ServerState;
use crate::card::{CardFonts, CardRenderer};
use crate::settings;

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let font_settings = settings.font.clone();
    let fonts = tokio::task::spawn_blocking(move || CardFonts::resolve(&font_settings))
        .await
        .with_context(|| "font loading task failed")?;
    tracing::info!("card fonts: {}", fonts.source());

    let app = router(CardRenderer::new(Arc::new(fonts)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(renderer: CardRenderer) -> Router {
    let state = Arc::new(ServerState { renderer });
    Router::new()
        .route("/health", get(health))
        .route("/memory", post(memory))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn memory(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<MemoryRequest>,
) -> Result<Json<MemoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let result = tokio::task::spawn_blocking(move || render_memory(state.as_ref(), payload))
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("render task failed: {}", err),
                }),
            )
        })?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err((err.status, Json(ErrorResponse { error: err.message }))),
    }
}
