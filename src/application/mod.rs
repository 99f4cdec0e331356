//! Application layer - Generic services that use ports.

pub mod error;
pub mod merger;

pub use error::JobError;
pub use merger::{MergeOutcome, MergeService};
