use super::captions::CaptionBlock;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

/// Extension used when a source URL does not carry a usable one.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Containers a burned video may keep; its audio is copied from the source as is.
const BURN_CONTAINERS: &[&str] = &["mp4", "mov", "m4v", "mkv", "webm"];

const SUBTITLE_FILE: &str = "captions.srt";

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,5}$").expect("valid extension regex"));

/// The request was malformed or insufficient; nothing was started.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidRequest(pub String);

impl InvalidRequest {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raw `POST /merge` body, accepting both payload shapes.
#[derive(Debug, Default, Deserialize)]
pub struct MergeRequestBody {
    #[serde(default, alias = "video_urls")]
    pub urls: Option<Vec<String>>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub captions: Option<Vec<CaptionBlock>>,
}

/// A validated job request.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeRequest {
    /// Join two or more videos in order.
    Concat { urls: Vec<Url> },
    /// Burn captions onto a single video.
    Subtitles {
        video_url: Url,
        captions: Vec<CaptionBlock>,
    },
}

impl MergeRequest {
    /// Parse and validate a raw request body.
    ///
    /// An empty body counts as an empty request so it gets the same answer
    /// as any other insufficient one.
    pub fn from_json(body: &[u8]) -> Result<Self, InvalidRequest> {
        let raw: MergeRequestBody = if body.iter().all(u8::is_ascii_whitespace) {
            MergeRequestBody::default()
        } else {
            serde_json::from_slice(body)
                .map_err(|e| InvalidRequest::new(format!("Invalid JSON body: {}", e)))?
        };
        Self::try_from(raw)
    }

    pub fn mode(&self) -> &'static str {
        match self {
            MergeRequest::Concat { .. } => "concat",
            MergeRequest::Subtitles { .. } => "subtitles",
        }
    }

    /// Every URL that has to be downloaded, in staging order.
    pub fn sources(&self) -> Vec<&Url> {
        match self {
            MergeRequest::Concat { urls } => urls.iter().collect(),
            MergeRequest::Subtitles { video_url, .. } => vec![video_url],
        }
    }

    /// Extension of the published artifact.
    ///
    /// Concatenations are always mp4, the container the H.264/AAC re-encode
    /// writes. A burned video keeps its source container when it is a known one.
    pub fn output_extension(&self) -> String {
        match self {
            MergeRequest::Concat { .. } => DEFAULT_EXTENSION.to_string(),
            MergeRequest::Subtitles { video_url, .. } => url_extension(video_url)
                .filter(|ext| BURN_CONTAINERS.contains(&ext.as_str()))
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        }
    }
}

impl TryFrom<MergeRequestBody> for MergeRequest {
    type Error = InvalidRequest;

    fn try_from(body: MergeRequestBody) -> Result<Self, Self::Error> {
        if body.video_url.is_some() || body.captions.is_some() {
            if body.urls.is_some() {
                return Err(InvalidRequest::new(
                    "Send either urls or video_url with captions, not both",
                ));
            }
            let video_url = body
                .video_url
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| InvalidRequest::new("Send a video_url together with captions"))?;
            let captions = body
                .captions
                .filter(|captions| !captions.is_empty())
                .ok_or_else(|| InvalidRequest::new("Send a non-empty captions list"))?;

            return Ok(MergeRequest::Subtitles {
                video_url: parse_source(&video_url)?,
                captions,
            });
        }

        let urls = body.urls.unwrap_or_default();
        if urls.len() < 2 {
            return Err(InvalidRequest::new("Send at least 2 URLs"));
        }

        Ok(MergeRequest::Concat {
            urls: urls
                .iter()
                .map(|url| parse_source(url))
                .collect::<Result<_, _>>()?,
        })
    }
}

fn parse_source(raw: &str) -> Result<Url, InvalidRequest> {
    let url = Url::parse(raw.trim())
        .map_err(|e| InvalidRequest::new(format!("Invalid URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(InvalidRequest::new(format!(
            "Unsupported URL scheme {:?} in {:?}",
            other, raw
        ))),
    }
}

/// Lower-cased extension of the last path segment, if it looks like one.
pub fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || !EXTENSION_RE.is_match(ext) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// One request's worth of staged files, alive until its workspace is removed.
#[derive(Debug)]
pub struct MergeJob {
    pub id: String,
    pub request: MergeRequest,
    pub workspace: PathBuf,
    pub staged: Vec<PathBuf>,
    pub output_id: String,
    pub extension: String,
}

impl MergeJob {
    pub fn new(request: MergeRequest, workspace: &Path) -> Self {
        let extension = request.output_extension();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            request,
            workspace: workspace.to_path_buf(),
            staged: Vec::new(),
            output_id: Uuid::new_v4().simple().to_string(),
            extension,
        }
    }

    /// Local file for the `index`-th source.
    pub fn staging_path(&self, index: usize, url: &Url) -> PathBuf {
        let ext = url_extension(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        self.workspace.join(format!("part{}.{}", index, ext))
    }

    pub fn subtitle_path(&self) -> PathBuf {
        self.workspace.join(SUBTITLE_FILE)
    }

    /// Where ffmpeg writes the product, before publication.
    pub fn product_path(&self) -> PathBuf {
        self.workspace.join(format!("output.{}", self.extension))
    }

    /// Public file name of the artifact.
    pub fn output_name(&self) -> String {
        format!("{}.{}", self.output_id, self.extension)
    }
}
