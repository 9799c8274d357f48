//! Job submission, polling, download and cancellation.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::info;
use vshort_models::JobStatus;

use crate::error::{ApiError, ApiResult};
use crate::security::validate_video_url;
use crate::state::AppState;

/// Body of `POST /api/process`.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Reply to an accepted or signalled job.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub success: bool,
    pub message: String,
    pub job_id: String,
    pub step: u8,
    pub progress: u8,
}

/// Start processing a video. One job runs at a time.
pub async fn process(
    State(state): State<AppState>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing URL"))?;
    let api_key = request
        .api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing API key"))?;
    let url = validate_video_url(&url)
        .into_result()
        .map_err(ApiError::BadRequest)?;

    let job_id = state.controller.submit(&url, &api_key)?;
    info!(job_id = %job_id, url = %url, "Job accepted");

    let status = state.controller.status();
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            success: true,
            message: "Processing started".to_string(),
            job_id: job_id.to_string(),
            step: status.current_step,
            progress: status.progress,
        }),
    ))
}

/// Current job status snapshot.
pub async fn status(State(state): State<AppState>) -> Json<JobStatus> {
    Json(state.controller.status())
}

/// Download the finished short, streamed from disk.
pub async fn download(State(state): State<AppState>) -> ApiResult<Response> {
    let path = state.controller.fetch_output()?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::not_found("Video not found"),
        _ => ApiError::Io(e),
    })?;
    let length = file.metadata().await?.len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "short.mp4".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Ask the running job to stop.
pub async fn cancel(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let job_id = state.controller.cancel()?;
    let status = state.controller.status();

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            success: true,
            message: "Cancellation requested".to_string(),
            job_id: job_id.to_string(),
            step: status.current_step,
            progress: status.progress,
        }),
    ))
}
