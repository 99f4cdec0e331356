use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;

/// Where the ffmpeg executable was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfmpegSource {
    /// `FFMPEG_BIN` pointed at it
    Override,
    /// Shipped next to the server executable
    Bundled,
    /// Left to the `PATH` lookup of the OS
    SearchPath,
}

/// The ffmpeg executable, resolved once at start-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegBinary {
    pub path: PathBuf,
    pub source: FfmpegSource,
}

impl FfmpegBinary {
    /// Resolve the executable: explicit override, then a bundled binary in
    /// `bundled_dir`, then plain `ffmpeg` from the search path.
    pub fn resolve(override_path: Option<String>, bundled_dir: Option<&Path>) -> Self {
        if let Some(path) = override_path.filter(|p| !p.trim().is_empty()) {
            return Self {
                path: PathBuf::from(path),
                source: FfmpegSource::Override,
            };
        }

        if let Some(dir) = bundled_dir {
            let candidate = dir.join(if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" });
            if candidate.is_file() {
                return Self {
                    path: candidate,
                    source: FfmpegSource::Bundled,
                };
            }
        }

        Self {
            path: PathBuf::from("ffmpeg"),
            source: FfmpegSource::SearchPath,
        }
    }
}

/// Exit state and diagnostics of one ffmpeg run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FfmpegOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

impl FfmpegOutput {
    /// Last lines of stderr, which is where ffmpeg puts the actual failure.
    pub fn diagnostic(&self) -> String {
        let lines: Vec<&str> = self
            .stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let tail = &lines[lines.len().saturating_sub(5)..];
        match (tail.is_empty(), self.code) {
            (true, Some(code)) => format!("ffmpeg exited with status {}", code),
            (true, None) => String::from("ffmpeg was terminated by a signal"),
            (false, _) => tail.join("\n"),
        }
    }
}

// Seam around the external tool so the media policy can be tested without ffmpeg
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    /// Run ffmpeg with `args`, using `cwd` as working directory.
    async fn run(&self, args: Vec<OsString>, cwd: PathBuf) -> io::Result<FfmpegOutput>;
}

#[derive(Clone, Debug)]
pub struct RealFfmpegRunner {
    binary: FfmpegBinary,
    timeout: Option<Duration>,
}

impl RealFfmpegRunner {
    pub fn new(binary: FfmpegBinary, timeout: Option<Duration>) -> Self {
        Self { binary, timeout }
    }
}

#[async_trait]
impl FfmpegRunner for RealFfmpegRunner {
    async fn run(&self, args: Vec<OsString>, cwd: PathBuf) -> io::Result<FfmpegOutput> {
        let mut command = TokioCommand::new(&self.binary.path);
        command
            .args(&args)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            // Dropping the future on timeout kills the child
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("ffmpeg did not finish within {}s", limit.as_secs()),
                    )
                })??,
            None => command.output().await?,
        };

        Ok(FfmpegOutput {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
