use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::api::health::{HealthReport, HealthState};
use crate::api::latency::{CycleLatency, LatencySummary};
use crate::api::page;
use crate::config::{REPORT_FILE, SPREADSHEET_FILE};
use crate::error::AppError;
use crate::state::SnapshotStore;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SnapshotStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<CycleLatency>,
    pub refresh_interval: Duration,
    pub output_dir: PathBuf,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/api/snapshot", get(get_snapshot))
        .route(&format!("/{SPREADSHEET_FILE}"), get(get_spreadsheet))
        .route(&format!("/{REPORT_FILE}"), get(get_report))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_index(State(state): State<ApiState>) -> Html<String> {
    match state.store.latest() {
        Some(snapshot) => Html(page::render(&snapshot, state.refresh_interval)),
        None => Html(page::LOADING_PAGE.to_string()),
    }
}

async fn get_snapshot(State(state): State<ApiState>) -> Response {
    match state.store.latest() {
        Some(snapshot) => Json(snapshot.as_ref()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading" })),
        )
            .into_response(),
    }
}

async fn get_spreadsheet(State(state): State<ApiState>) -> Result<Response, AppError> {
    download(state.output_dir.join(SPREADSHEET_FILE), SPREADSHEET_FILE, XLSX_CONTENT_TYPE).await
}

async fn get_report(State(state): State<ApiState>) -> Result<Response, AppError> {
    download(state.output_dir.join(REPORT_FILE), REPORT_FILE, DOCX_CONTENT_TYPE).await
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(state.health.report())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}

/// Serve a published artifact as an attachment; 404 until the first write.
async fn download(
    path: PathBuf,
    file_name: &str,
    content_type: &'static str,
) -> Result<Response, AppError> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((StatusCode::NOT_FOUND, format!("{file_name} not generated yet")).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
