//! Local adapters for single-server deployment.

pub mod fs;
pub mod http;

pub use fs::FsAdapter;
pub use http::{build_router, AppState};
