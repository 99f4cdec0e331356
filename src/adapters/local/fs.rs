use crate::ports::storage::{Artifact, StoragePort};
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Publishes artifacts into a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsAdapter {
    output_dir: PathBuf,
}

impl FsAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create the output directory if needed.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await
    }
}

/// Artifact names are a single plain file name; hidden names are in-flight copies.
pub fn name_is_valid(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}

#[async_trait]
impl StoragePort for FsAdapter {
    async fn publish(&self, local_path: &Path, name: &str) -> io::Result<Artifact> {
        if !name_is_valid(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact name {:?}", name),
            ));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;

        // Copy under a hidden name first so readers never see a partial file
        let staging = self.output_dir.join(format!(".{}.partial", name));
        let target = self.output_dir.join(name);
        let size_bytes = match tokio::fs::copy(local_path, &staging).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }

        debug!(?target, size_bytes, "artifact published");
        Ok(Artifact {
            name: name.to_string(),
            size_bytes,
        })
    }

    async fn locate(&self, name: &str) -> io::Result<Option<PathBuf>> {
        if !name_is_valid(name) {
            return Ok(None);
        }
        let path = self.output_dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
