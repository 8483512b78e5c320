//! REST endpoint the wizard submits leads to.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, warn};

use super::intake::LeadIntake;
use super::model::{ClientInfo, LeadSubmission, SubmitResponse};

const SUCCESS_MESSAGE: &str = "Submission received successfully. Our team will analyze your information and send your custom growth plan within 24 hours.";
const FAILURE_MESSAGE: &str = "Failed to process submission. Please try again.";

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub intake: Arc<LeadIntake>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "playbook-funnel"
    }))
}

/// POST /api/playbook-submit
async fn submit_playbook(
    State(state): State<IntakeRouteState>,
    headers: HeaderMap,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> impl IntoResponse {
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Malformed playbook submission"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(SubmitResponse::failed(FAILURE_MESSAGE)),
            );
        }
    };
    let client = client_info(&headers);
    match state.intake.accept(&submission, &client).await {
        Ok(record) => (
            StatusCode::OK,
            Json(SubmitResponse::ok(record.id.to_string()).with_message(SUCCESS_MESSAGE)),
        ),
        Err(e) => {
            error!(error = %e, "Playbook submission failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SubmitResponse::failed(FAILURE_MESSAGE)),
            )
        }
    }
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header("x-real-ip"))
        .unwrap_or("Unknown")
        .to_string();

    ClientInfo {
        user_agent: header("user-agent").unwrap_or("Unknown").to_string(),
        ip_address,
        referer: header("referer").map(String::from),
    }
}

/// Build the intake routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/playbook-submit", post(submit_playbook))
        .with_state(state)
}
