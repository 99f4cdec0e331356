use crate::ports::fetcher::{FetchError, FetcherPort};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use reqwest::Url;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::debug;

/// Write buffer used while streaming a download to disk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// HTTP(S) fetcher streaming response bodies straight to disk.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clipjoin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetcherPort for ReqwestFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        let written = stream_to_file(dest, response.bytes_stream())
            .await
            .map_err(|e| body_error(url, e))?;
        debug!(%url, bytes = written, "download complete");
        Ok(written)
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { url: url.clone() }
    } else {
        FetchError::Transport {
            url: url.clone(),
            source: err,
        }
    }
}

// Body errors arrive wrapped in io::Error by the StreamReader
fn body_error(url: &Url, err: io::Error) -> FetchError {
    let is_reqwest = err
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>());
    if !is_reqwest {
        return FetchError::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(inner)) => transport_error(url, *inner),
        _ => FetchError::Io(io::Error::new(io::ErrorKind::Other, "download interrupted")),
    }
}

/// Save a `Stream` to a file, returning the number of bytes written.
pub async fn stream_to_file<S, E>(path: &Path, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::with_capacity(CHUNK_SIZE, File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;

    Ok(written)
}
