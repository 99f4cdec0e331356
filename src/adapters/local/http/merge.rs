use super::AppState;
use crate::application::JobError;
use crate::domain::av::cmd::FfmpegRunner;
use crate::ports::fetcher::FetcherPort;
use crate::ports::storage::StoragePort;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct MergeResponse {
    pub merged_url: String,
    pub size_mb: f64,
}

/// `POST /merge`: run a job to completion and point at the artifact.
///
/// The body is taken raw so that a malformed payload gets the same JSON
/// error shape as an insufficient one.
pub async fn handle<F, S, R>(
    State(state): State<AppState<F, S, R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MergeResponse>, JobError>
where
    F: FetcherPort,
    S: StoragePort,
    R: FfmpegRunner,
{
    let outcome = state.service.handle_json(&body).await?;

    let base_url = match &state.public_base_url {
        Some(url) => url.clone(),
        None => base_url_from(&headers),
    };

    Ok(Json(MergeResponse {
        merged_url: format!("{}/output/{}", base_url, outcome.artifact.name),
        size_mb: size_in_mb(outcome.artifact.size_bytes),
    }))
}

fn base_url_from(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
