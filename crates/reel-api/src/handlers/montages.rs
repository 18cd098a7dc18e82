//! Montage submission, status and download handlers.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reel_models::{MontageRequest, Run, RunId, RunStatus};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Submission response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: &'static str,
    pub run_id: RunId,
}

/// Run status as polled by the montage viewer.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub progress: u8,
    pub progress_message: String,
    /// Download URL, set once the montage is rendered
    pub finished_montage_url: Option<String>,
}

impl From<Run> for StatusResponse {
    fn from(run: Run) -> Self {
        let finished_montage_url = (run.status == RunStatus::Completed)
            .then(|| format!("/api/montages/{}/video", run.id));
        Self {
            run_id: run.id,
            status: run.status,
            progress: run.progress,
            progress_message: run.message,
            finished_montage_url,
        }
    }
}

/// Start a montage run.
pub async fn submit_montage(
    State(state): State<AppState>,
    payload: Result<Json<MontageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let run_id = state.manager.submit(request).await?;
    info!(run_id = %run_id, "Accepted montage request");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "success",
            run_id,
        }),
    ))
}

/// Poll a run.
pub async fn get_montage_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let run = state.manager.get_status(&RunId::from_string(run_id)).await?;
    Ok(Json(run.into()))
}

/// Stream a finished montage as an attachment.
pub async fn download_montage(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Response> {
    let run_id = RunId::from_string(run_id);
    let path = state.manager.result_path(&run_id).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Video file not found"))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"montage_{}.mp4\"", run_id),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
