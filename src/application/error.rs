use crate::domain::av::MediaError;
use crate::domain::jobs::InvalidRequest;
use crate::ports::fetcher::FetchError;
use std::io;
use thiserror::Error;

/// Why a merge job did not produce an artifact.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] io::Error),
    #[error("download {index} failed: {source}")]
    Fetch {
        index: usize,
        #[source]
        source: FetchError,
    },
    #[error("failed to write subtitles: {0}")]
    Subtitles(#[source] io::Error),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("failed to publish output: {0}")]
    Publish(#[source] io::Error),
}

impl JobError {
    /// The caller sent something unusable, as opposed to the job failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, JobError::InvalidRequest(_))
    }
}
