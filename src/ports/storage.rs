use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// A published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Make the file at `local_path` retrievable under `name`.
    async fn publish(&self, local_path: &Path, name: &str) -> io::Result<Artifact>;

    /// Location of a previously published artifact, if it exists.
    async fn locate(&self, name: &str) -> io::Result<Option<PathBuf>>;
}
