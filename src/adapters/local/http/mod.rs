//! HTTP inbound adapter.
//!
//! Routes:
//! - `GET /`: service descriptor
//! - `POST /merge`: concatenate videos or burn captions
//! - `GET /output/:filename`: published artifacts

mod error;
pub mod merge;
pub mod output;
pub mod root;

use crate::application::MergeService;
use crate::domain::av::cmd::FfmpegRunner;
use crate::ports::fetcher::FetcherPort;
use crate::ports::storage::StoragePort;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState<F, S, R> {
    pub service: Arc<MergeService<F, S, R>>,
    /// Overrides the header-derived prefix of `merged_url`
    pub public_base_url: Option<String>,
    pub service_name: String,
}

// Not derived: the ports themselves need not be Clone
impl<F, S, R> Clone for AppState<F, S, R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            public_base_url: self.public_base_url.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

pub fn build_router<F, S, R>(state: AppState<F, S, R>, max_body_bytes: usize) -> Router
where
    F: FetcherPort + 'static,
    S: StoragePort + 'static,
    R: FfmpegRunner + 'static,
{
    Router::new()
        .route("/", get(root::handle::<F, S, R>))
        .route("/merge", post(merge::handle::<F, S, R>))
        .route("/output/:filename", get(output::handle::<F, S, R>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
