//! Ports - Trait definitions for the outside world.

pub mod fetcher;
pub mod storage;
