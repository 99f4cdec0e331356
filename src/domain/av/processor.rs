use super::cmd::FfmpegRunner;
use super::manifest::concat_manifest;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Video settings used when stream copy cannot join the inputs.
pub const REENCODE_VIDEO_CODEC: &str = "libx264";
pub const REENCODE_PRESET: &str = "veryfast";
pub const REENCODE_CRF: &str = "23";
pub const REENCODE_AUDIO_CODEC: &str = "aac";
pub const REENCODE_AUDIO_BITRATE: &str = "128k";

const MANIFEST_NAME: &str = "videos.txt";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to write concat manifest: {0}")]
    Manifest(#[source] io::Error),
    #[error("merge failed: {0}")]
    Merge(String),
    #[error("subtitle burn failed: {0}")]
    Burn(String),
}

/// How a concatenation ended up being produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    StreamCopy,
    Reencode,
}

pub struct MediaProcessor<R> {
    runner: R,
}

impl<R> MediaProcessor<R>
where
    R: FfmpegRunner,
{
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Join `inputs` in order into `output`.
    ///
    /// Stream copy is tried first. Any failure there, including ffmpeg not
    /// starting at all, falls back to a full re-encode; only a failing
    /// re-encode is reported.
    pub async fn concatenate(
        &self,
        inputs: &[PathBuf],
        work_dir: &Path,
        output: &Path,
    ) -> Result<MergeStrategy, MediaError> {
        let manifest = work_dir.join(MANIFEST_NAME);
        tokio::fs::write(&manifest, concat_manifest(inputs))
            .await
            .map_err(MediaError::Manifest)?;

        match self
            .runner
            .run(stream_copy_args(&manifest, output), work_dir.to_path_buf())
            .await
        {
            Ok(out) if out.success => {
                info!(inputs = inputs.len(), "joined with stream copy");
                return Ok(MergeStrategy::StreamCopy);
            }
            Ok(out) => warn!(reason = %out.diagnostic(), "stream copy failed, re-encoding"),
            Err(e) => warn!(error = %e, "stream copy could not run, re-encoding"),
        }

        // -y lets the re-encode overwrite whatever the failed copy left behind
        match self
            .runner
            .run(reencode_args(&manifest, output), work_dir.to_path_buf())
            .await
        {
            Ok(out) if out.success => {
                info!(inputs = inputs.len(), "joined with re-encode");
                Ok(MergeStrategy::Reencode)
            }
            Ok(out) => Err(MediaError::Merge(out.diagnostic())),
            Err(e) => Err(MediaError::Merge(e.to_string())),
        }
    }

    /// Render `subtitles` onto the video stream of `video`, copying audio.
    ///
    /// ffmpeg runs from the directory of the subtitle file so the filter only
    /// ever sees a bare file name.
    pub async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        let (dir, name) = split_filter_path(subtitles)?;

        let out = self
            .runner
            .run(burn_args(video, &name, output), dir)
            .await
            .map_err(|e| MediaError::Burn(e.to_string()))?;

        if !out.success {
            return Err(MediaError::Burn(out.diagnostic()));
        }
        info!(video = ?video, "subtitles burned");
        Ok(())
    }
}

fn split_filter_path(subtitles: &Path) -> Result<(PathBuf, String), MediaError> {
    let name = subtitles
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| {
            n.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        })
        .ok_or_else(|| {
            MediaError::Burn(format!(
                "subtitle file name {:?} cannot be used in a filter",
                subtitles
            ))
        })?;
    let dir = subtitles
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir.to_path_buf(), name.to_string()))
}

fn concat_input_args(manifest: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        manifest.into(),
    ]
}

pub(crate) fn stream_copy_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args = concat_input_args(manifest);
    let tail: [OsString; 3] = ["-c".into(), "copy".into(), output.into()];
    args.extend(tail);
    args
}

pub(crate) fn reencode_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args = concat_input_args(manifest);
    let tail: [OsString; 13] = [
        "-c:v".into(),
        REENCODE_VIDEO_CODEC.into(),
        "-preset".into(),
        REENCODE_PRESET.into(),
        "-crf".into(),
        REENCODE_CRF.into(),
        "-c:a".into(),
        REENCODE_AUDIO_CODEC.into(),
        "-b:a".into(),
        REENCODE_AUDIO_BITRATE.into(),
        "-movflags".into(),
        "+faststart".into(),
        output.into(),
    ];
    args.extend(tail);
    args
}

pub(crate) fn burn_args(video: &Path, subtitle_name: &str, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-i".into(),
        video.into(),
        "-vf".into(),
        format!("subtitles={}", subtitle_name).into(),
        "-c:a".into(),
        "copy".into(),
        output.into(),
    ]
}
