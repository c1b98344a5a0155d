use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::job::{JobId, JobStatus};
use crate::service::{ResultOutcome, ServiceError, SummaryRequest};

use super::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
}

#[derive(Serialize)]
pub struct ResultResponse {
    pub result: String,
    pub processing_time_ms: Option<u64>,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

fn internal_error(e: ServiceError) -> Response {
    tracing::error!("Request failed: {}", e);
    detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Response {
    let input = match req.validate() {
        Ok(input) => input,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    match state.service.submit(&input).await {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_status(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.status(JobId(id)).await {
        Ok(Some(status)) => Json(StatusResponse { status }).into_response(),
        Ok(None) => detail(StatusCode::NOT_FOUND, "Job not found"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_result(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.result(JobId(id)).await {
        Ok(ResultOutcome::Ready {
            result,
            processing_time_ms,
        }) => Json(ResultResponse {
            result,
            processing_time_ms,
        })
        .into_response(),
        Ok(ResultOutcome::NotComplete(_)) => detail(StatusCode::BAD_REQUEST, "Job not completed"),
        Ok(ResultOutcome::Failed) => detail(StatusCode::SERVICE_UNAVAILABLE, "Job failed"),
        Ok(ResultOutcome::NotFound) => detail(StatusCode::NOT_FOUND, "Job not found"),
        Ok(ResultOutcome::MissingResult) => {
            tracing::error!("Job {} succeeded without a result", id);
            detail(StatusCode::INTERNAL_SERVER_ERROR, "Result is missing")
        }
        Err(e) => internal_error(e),
    }
}
