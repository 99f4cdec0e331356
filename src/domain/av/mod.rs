//! Media operations backed by the external ffmpeg executable.

pub mod cmd;
pub mod manifest;
pub mod processor;

pub use processor::{MediaError, MediaProcessor, MergeStrategy};
