//! HTTP API
//!
//! - `GET /api/chapters`: catalog entries in order
//! - `GET /api/chapter/{id}`: one normalized chapter
//! - `GET /api/ref/{file}`: an auxiliary page from the source site
//! - `GET /api/style.css`: presentation rules for normalized fragments

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;
use url::Url;

use crate::catalog::{ChapterCatalog, ChapterDescriptor};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::images::RESPONSIVE_IMAGE_CSS;
use crate::margin_tables::FLOW_CLASS;
use crate::upstream::{self, NormalizedChapter, ReferencePage};

type SharedState = Arc<AppState>;

/// Read-only state shared by every request
pub struct AppState {
    pub catalog: ChapterCatalog,
    pub source_base: Url,
}

impl AppState {
    pub fn new(source_base: Url) -> Self {
        Self {
            catalog: ChapterCatalog::build(&source_base),
            source_base,
        }
    }
}

/// Catalog entry as listed by `/api/chapters`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary<'a> {
    id: &'a str,
    title: &'a str,
    text_url: &'a str,
    notes_url: Option<&'a str>,
}

impl<'a> From<&'a ChapterDescriptor> for ChapterSummary<'a> {
    fn from(chapter: &'a ChapterDescriptor) -> Self {
        Self {
            id: &chapter.id,
            title: &chapter.title,
            text_url: chapter.text_url.as_str(),
            notes_url: chapter.notes_url.as_ref().map(Url::as_str),
        }
    }
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.source_base.clone()));
    let router = build_router(state);

    info!(addr = %config.bind, source = %config.source_base, "Binding HTTP listener");
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("HTTP server exited");
    Ok(())
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/chapters", get(list_chapters))
        .route("/api/chapter/{id}", get(chapter))
        // Wildcard so traversal attempts reach validation instead of 404ing
        .route("/api/ref/{*file}", get(reference))
        .route("/api/style.css", get(stylesheet))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn list_chapters(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let summaries: Vec<ChapterSummary> = state
        .catalog
        .chapters()
        .iter()
        .map(ChapterSummary::from)
        .collect();
    serde_json::to_value(&summaries)
        .map(Json)
        .map_err(|e| ApiError::Unexpected(e.to_string()))
}

async fn chapter(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<NormalizedChapter>, ApiError> {
    upstream::get_chapter(&state.catalog, &id).await.map(Json)
}

async fn reference(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> Result<Json<ReferencePage>, ApiError> {
    upstream::get_reference(&state.source_base, &file)
        .await
        .map(Json)
}

async fn stylesheet() -> impl IntoResponse {
    let css = format!(
        "{}div.{} {{ line-height: 1.6; }}\n",
        RESPONSIVE_IMAGE_CSS, FLOW_CLASS
    );
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css)
}
