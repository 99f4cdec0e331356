use super::error::JobError;
use crate::domain::av::cmd::FfmpegRunner;
use crate::domain::av::{MediaError, MediaProcessor, MergeStrategy};
use crate::domain::captions::write_srt;
use crate::domain::jobs::{MergeJob, MergeRequest};
use crate::ports::fetcher::FetcherPort;
use crate::ports::storage::{Artifact, StoragePort};
use reqwest::Url;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{info, warn};

/// Result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub job_id: String,
    pub artifact: Artifact,
    /// Set for concatenations only.
    pub strategy: Option<MergeStrategy>,
}

pub struct MergeService<F, S, R> {
    fetcher: F,
    storage: S,
    media: MediaProcessor<R>,
    work_dir: Option<PathBuf>,
}

impl<F, S, R> MergeService<F, S, R>
where
    F: FetcherPort,
    S: StoragePort,
    R: FfmpegRunner,
{
    pub fn new(fetcher: F, storage: S, runner: R, work_dir: Option<PathBuf>) -> Self {
        Self {
            fetcher,
            storage,
            media: MediaProcessor::new(runner),
            work_dir,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Validate a raw request body, then run it.
    pub async fn handle_json(&self, body: &[u8]) -> Result<MergeOutcome, JobError> {
        let request = MergeRequest::from_json(body)?;
        self.handle_request(request).await
    }

    /// Run one job end to end. The workspace is removed whatever the outcome.
    pub async fn handle_request(&self, request: MergeRequest) -> Result<MergeOutcome, JobError> {
        let workspace = self.create_workspace().await.map_err(JobError::Workspace)?;
        let mut job = MergeJob::new(request, workspace.path());
        info!(
            job = %job.id,
            mode = job.request.mode(),
            sources = job.request.sources().len(),
            "job accepted"
        );

        let result = self.run(&mut job).await;
        match &result {
            Ok(outcome) => info!(
                job = %job.id,
                artifact = %outcome.artifact.name,
                size_bytes = outcome.artifact.size_bytes,
                "job published"
            ),
            Err(e) => warn!(job = %job.id, error = %e, "job failed"),
        }

        cleanup(workspace, &job.id).await;
        result
    }

    async fn create_workspace(&self) -> std::io::Result<TempDir> {
        let work_dir = self.work_dir.clone();
        tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix("merge-");
            match work_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)?;
                    builder.tempdir_in(&dir)
                }
                None => builder.tempdir(),
            }
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }

    async fn run(&self, job: &mut MergeJob) -> Result<MergeOutcome, JobError> {
        // 1. Stage every source, in order
        let sources: Vec<Url> = job.request.sources().into_iter().cloned().collect();
        for (index, url) in sources.iter().enumerate() {
            let dest = job.staging_path(index, url);
            let bytes = self
                .fetcher
                .fetch(url, &dest)
                .await
                .map_err(|source| JobError::Fetch { index, source })?;
            info!(job = %job.id, index, bytes, "input staged");
            job.staged.push(dest);
        }

        // 2. Process
        let product = job.product_path();
        let strategy = match &job.request {
            MergeRequest::Concat { .. } => Some(
                self.media
                    .concatenate(&job.staged, &job.workspace, &product)
                    .await?,
            ),
            MergeRequest::Subtitles { captions, .. } => {
                let subtitles = job.subtitle_path();
                let written = write_srt(captions, &subtitles)
                    .await
                    .map_err(JobError::Subtitles)?;
                info!(job = %job.id, bytes = written, "subtitles built");

                let video = job
                    .staged
                    .first()
                    .ok_or_else(|| MediaError::Burn(String::from("no staged video")))?;
                self.media
                    .burn_subtitles(video, &subtitles, &product)
                    .await?;
                None
            }
        };

        // 3. Publish
        let artifact = self
            .storage
            .publish(&product, &job.output_name())
            .await
            .map_err(JobError::Publish)?;

        Ok(MergeOutcome {
            job_id: job.id.clone(),
            artifact,
            strategy,
        })
    }
}

async fn cleanup(workspace: TempDir, job_id: &str) {
    let path = workspace.path().to_path_buf();
    match tokio::task::spawn_blocking(move || workspace.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(job = %job_id, ?path, error = %e, "failed to remove workspace"),
        Err(e) => warn!(job = %job_id, ?path, error = %e, "workspace cleanup task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::fs::FsAdapter;
    use crate::domain::av::cmd::{FfmpegOutput, MockFfmpegRunner};
    use crate::ports::fetcher::{FetchError, MockFetcherPort};
    use mockall::Sequence;
    use reqwest::StatusCode;
    use std::ffi::OsString;
    use std::io;
    use std::path::Path;
    use tempfile::tempdir;

    fn fetcher_writing(times: usize) -> MockFetcherPort {
        let mut fetcher = MockFetcherPort::new();
        fetcher
            .expect_fetch()
            .times(times)
            .returning(|url, dest| {
                std::fs::write(dest, url.as_str()).unwrap();
                Ok(url.as_str().len() as u64)
            });
        fetcher
    }

    fn writes_output(args: &[OsString]) -> io::Result<FfmpegOutput> {
        std::fs::write(args.last().unwrap(), b"product").unwrap();
        Ok(FfmpegOutput {
            success: true,
            code: Some(0),
            stderr: String::new(),
        })
    }

    fn failure() -> io::Result<FfmpegOutput> {
        Ok(FfmpegOutput {
            success: false,
            code: Some(1),
            stderr: String::from("Conversion failed!"),
        })
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    const CONCAT_BODY: &[u8] =
        br#"{"urls": ["https://cdn.test/a.mp4", "https://cdn.test/b.mp4", "https://cdn.test/c.mp4"]}"#;

    #[tokio::test]
    async fn test_concat_job_publishes_and_cleans_up() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(3),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let outcome = service.handle_json(CONCAT_BODY).await.unwrap();

        assert_eq!(outcome.strategy, Some(MergeStrategy::StreamCopy));
        assert!(outcome.artifact.name.ends_with(".mp4"));
        assert_eq!(outcome.artifact.size_bytes, 7);
        assert_eq!(
            std::fs::read(out.path().join(&outcome.artifact.name)).unwrap(),
            b"product"
        );
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_concat_job_stages_inputs_in_order() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut seq = Sequence::new();
        let mut fetcher = MockFetcherPort::new();
        for (i, name) in ["a.mp4", "b.mp4", "c.mp4"].into_iter().enumerate() {
            fetcher
                .expect_fetch()
                .withf(move |url, dest| {
                    url.path().ends_with(name)
                        && dest.file_name().unwrap() == format!("part{}.mp4", i).as_str()
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, dest| {
                    std::fs::write(dest, b"v").unwrap();
                    Ok(1)
                });
        }

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher,
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        service.handle_json(CONCAT_BODY).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        // No expectations: any download or ffmpeg call panics
        let service = MergeService::new(
            MockFetcherPort::new(),
            FsAdapter::new(out.path()),
            MockFfmpegRunner::new(),
            Some(work.path().to_path_buf()),
        );

        let err = service
            .handle_json(br#"{"urls": ["https://cdn.test/a.mp4"]}"#)
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        let err = service
            .handle_json(br#"{"video_url": "https://cdn.test/a.mp4"}"#)
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        assert!(dir_is_empty(work.path()));
        assert!(dir_is_empty(out.path()));
    }

    #[tokio::test]
    async fn test_download_failure_aborts_job() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut seq = Sequence::new();
        let mut fetcher = MockFetcherPort::new();
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, dest| {
                std::fs::write(dest, b"v").unwrap();
                Ok(1)
            });
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, _| {
                Err(FetchError::Status {
                    url: url.clone(),
                    status: StatusCode::FORBIDDEN,
                })
            });

        let service = MergeService::new(
            fetcher,
            FsAdapter::new(out.path()),
            MockFfmpegRunner::new(),
            Some(work.path().to_path_buf()),
        );
        let err = service.handle_json(CONCAT_BODY).await.unwrap_err();

        assert!(matches!(err, JobError::Fetch { index: 1, .. }));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("403"));
        assert!(dir_is_empty(work.path()));
        assert!(dir_is_empty(out.path()));
    }

    #[tokio::test]
    async fn test_merge_failure_publishes_nothing() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(2).returning(|_, _| failure());

        let service = MergeService::new(
            fetcher_writing(3),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let err = service.handle_json(CONCAT_BODY).await.unwrap_err();

        assert!(matches!(err, JobError::Media(MediaError::Merge(_))));
        assert!(dir_is_empty(work.path()));
        assert!(dir_is_empty(out.path()));
    }

    #[tokio::test]
    async fn test_subtitle_job_builds_srt_then_burns() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .withf(|args, cwd| {
                let srt = std::fs::read_to_string(cwd.join("captions.srt")).unwrap();
                srt == "1\n00:00:01,000 --> 00:00:01,500\nHELLO there\n\n"
                    && args.iter().any(|a| a == "subtitles=captions.srt")
            })
            .times(1)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(1),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let outcome = service
            .handle_json(
                br#"{"video_url": "https://cdn.test/talk.mov",
                     "captions": [
                        {"words": []},
                        {"words": [{"text": "hello", "start": 1.0, "highlight": true},
                                   {"text": "there", "start": 1.2}]}
                     ]}"#,
            )
            .await
            .unwrap();

        assert_eq!(outcome.strategy, None);
        assert!(outcome.artifact.name.ends_with(".mov"));
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_burn_failure_is_reported() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(1).returning(|_, _| failure());

        let service = MergeService::new(
            fetcher_writing(1),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let err = service
            .handle_json(
                br#"{"video_url": "https://cdn.test/talk.mp4",
                     "captions": [{"words": [{"text": "x", "start": 0.0, "end": 1.0}]}]}"#,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Media(MediaError::Burn(_))));
        assert!(dir_is_empty(work.path()));
        assert!(dir_is_empty(out.path()));
    }

    #[tokio::test]
    async fn test_captions_without_words_burn_an_empty_track() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .withf(|_, cwd| std::fs::read(cwd.join("captions.srt")).unwrap().is_empty())
            .times(1)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(1),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let outcome = service
            .handle_json(
                br#"{"video_url": "https://cdn.test/talk.mp4", "captions": [{"words": []}, {}]}"#,
            )
            .await
            .unwrap();

        assert!(outcome.artifact.name.ends_with(".mp4"));
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_concat_of_webm_sources_publishes_mp4() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .withf(|args, _| {
                args.last()
                    .is_some_and(|a| a.to_string_lossy().ends_with("output.mp4"))
            })
            .times(1)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(2),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let outcome = service
            .handle_json(br#"{"urls": ["https://cdn.test/a.webm", "https://cdn.test/b.webm"]}"#)
            .await
            .unwrap();

        assert!(outcome.artifact.name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_created() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();
        let nested = work.path().join("nested").join("jobs");

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(3),
            FsAdapter::new(out.path()),
            runner,
            Some(nested.clone()),
        );
        service.handle_json(CONCAT_BODY).await.unwrap();

        assert!(nested.is_dir());
        assert!(dir_is_empty(&nested));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_do_not_collide() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .times(2)
            .returning(|args, _| writes_output(&args));

        let service = MergeService::new(
            fetcher_writing(6),
            FsAdapter::new(out.path()),
            runner,
            Some(work.path().to_path_buf()),
        );
        let (a, b) = tokio::join!(service.handle_json(CONCAT_BODY), service.handle_json(CONCAT_BODY));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.artifact.name, b.artifact.name);
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 2);
        assert!(dir_is_empty(work.path()));
    }
}
