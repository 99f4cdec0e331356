//! Clipjoin - Video merge service library
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (captions, jobs, av)
//! - ports/: Trait definitions (fetcher, storage)
//! - adapters/: Concrete implementations (reqwest fetcher, filesystem, HTTP)
//! - application/: The merge orchestrator
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use adapters::local::{build_router, AppState, FsAdapter};
pub use adapters::remote::ReqwestFetcher;
pub use application::{JobError, MergeOutcome, MergeService};
pub use config::ServerConfig;
pub use domain::captions;
