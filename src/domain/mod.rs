//! Domain layer - Pure business logic.

pub mod av;
pub mod captions;
pub mod jobs;
