//! Configuration loaded from the process environment.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::domain::av::cmd::FfmpegBinary;

/// Configuration for the merge server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory holding published artifacts
    pub output_dir: PathBuf,
    /// Parent directory for per-job workspaces (system temp dir when unset)
    pub work_dir: Option<PathBuf>,
    /// Prefix used when building `merged_url`; derived from request headers when unset
    pub public_base_url: Option<String>,
    /// Name reported by the service descriptor
    pub service_name: String,
    /// Upper bound for a single download
    pub download_timeout: Duration,
    /// Upper bound for a single ffmpeg invocation, `None` waits forever
    pub ffmpeg_timeout: Option<Duration>,
    /// Resolved ffmpeg executable
    pub ffmpeg: FfmpegBinary,
    /// Request body limit in bytes
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let ffmpeg_timeout = match parse_var::<u64>("FFMPEG_TIMEOUT_SECS", 1800) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let bundled_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/output")),
            work_dir: env::var("WORK_DIR").ok().map(PathBuf::from),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| String::from("clipjoin")),
            download_timeout: Duration::from_secs(parse_var("DOWNLOAD_TIMEOUT_SECS", 120)),
            ffmpeg_timeout,
            ffmpeg: FfmpegBinary::resolve(env::var("FFMPEG_BIN").ok(), bundled_dir.as_deref()),
            max_body_bytes: parse_var("MAX_BODY_BYTES", 16 * 1024 * 1024),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "invalid value, using default {}", default);
            default
        }),
        Err(_) => default,
    }
}
