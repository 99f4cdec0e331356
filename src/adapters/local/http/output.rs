use super::AppState;
use crate::domain::av::cmd::FfmpegRunner;
use crate::ports::fetcher::FetcherPort;
use crate::ports::storage::StoragePort;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::warn;

/// `GET /output/:filename`: stream a published artifact.
pub async fn handle<F, S, R>(
    State(state): State<AppState<F, S, R>>,
    Path(filename): Path<String>,
) -> Result<Response, StatusCode>
where
    F: FetcherPort,
    S: StoragePort,
    R: FfmpegRunner,
{
    let path = state
        .service
        .storage()
        .locate(&filename)
        .await
        .map_err(|e| {
            warn!(%filename, error = %e, "failed to look up artifact");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let file = File::open(&path).await.map_err(|_| StatusCode::NOT_FOUND)?;
    let length = file.metadata().await.map(|meta| meta.len()).ok();

    // Basic mime detection
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    let mut builder = Response::builder().header(header::CONTENT_TYPE, content_type.as_ref());
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }
    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
