//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vshort_media::{check_ffmpeg, check_ffprobe, check_ytdlp};

use crate::state::AppState;

/// Root banner.
#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "VShort API Server".to_string(),
        status: "running".to_string(),
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub yt_dlp: CheckStatus,
    pub font: CheckStatus,
    /// Missing model only degrades reframing to a center crop
    pub face_model: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }

    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::error(e.to_string()),
        }
    }

    fn file(path: &std::path::Path) -> Self {
        if path.is_file() {
            Self::ok()
        } else {
            Self::error(format!("{} not found", path.display()))
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
///
/// External tools are required. A missing font or model only degrades output.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let config = state.controller.config();

    let checks = ReadinessChecks {
        ffmpeg: CheckStatus::from_result(check_ffmpeg().map(|_| ())),
        ffprobe: CheckStatus::from_result(check_ffprobe().map(|_| ())),
        yt_dlp: CheckStatus::from_result(check_ytdlp().map(|_| ())),
        font: CheckStatus::file(&config.font_path),
        face_model: CheckStatus::file(&config.face_model_path),
    };

    let tools_ok = checks.ffmpeg.is_ok() && checks.ffprobe.is_ok() && checks.yt_dlp.is_ok();
    let all_ok = tools_ok && checks.font.is_ok() && checks.face_model.is_ok();

    let response = ReadinessResponse {
        status: if all_ok {
            "ready"
        } else if tools_ok {
            "degraded"
        } else {
            "unavailable"
        }
        .to_string(),
        checks,
    };

    if tools_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
