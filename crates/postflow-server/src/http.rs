//! HTTP surface: approval callbacks, workflow trigger and health

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use postflow_core::auth::{SignatureHeaders, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use postflow_core::workflow::{
    CallbackRouter, CampaignSource, PendingApprovalRegistry, PendingSummary, WorkflowOrchestrator,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub callbacks: Arc<CallbackRouter>,
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub campaigns: Arc<dyn CampaignSource>,
    pub registry: Arc<PendingApprovalRegistry>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        callbacks: Arc<CallbackRouter>,
        orchestrator: Arc<WorkflowOrchestrator>,
        campaigns: Arc<dyn CampaignSource>,
    ) -> Self {
        let registry = orchestrator.registry().clone();
        Self {
            callbacks,
            orchestrator,
            campaigns,
            registry,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub pending_approvals: usize,
    pub pending: Vec<PendingSummary>,
    pub uptime_secs: i64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/slack/interactions", post(slack_interactions))
        .route("/run-workflow", post(run_workflow))
        .route("/health", get(health))
        .with_state(state)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Verify the signature, acknowledge, and resolve in the background
async fn slack_interactions(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = SignatureHeaders::new(
        header_str(&headers, TIMESTAMP_HEADER),
        header_str(&headers, SIGNATURE_HEADER),
    );

    match state.callbacks.accept(body.to_vec(), &signature) {
        Ok(_processing) => StatusCode::OK.into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Invalid signature").into_response(),
    }
}

/// Run one campaign to completion and return its report.
///
/// The run lives on its own task: a client that disconnects while the run
/// waits for approval must not cancel it.
async fn run_workflow(State(state): State<AppState>) -> Response {
    log::info!("Workflow run requested over HTTP");
    let orchestrator = state.orchestrator.clone();
    let campaigns = state.campaigns.clone();
    let run = tokio::spawn(async move { orchestrator.run_from_source(campaigns.as_ref()).await });

    match run.await {
        Ok(report) => {
            let status = if report.outcome.is_published() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(report)).into_response()
        }
        Err(e) => {
            log::error!("Workflow task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Workflow task failed").into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending = state.registry.pending();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        pending_approvals: pending.len(),
        pending,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}
