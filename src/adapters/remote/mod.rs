//! Outbound adapters reaching remote hosts.

pub mod fetcher;

pub use fetcher::ReqwestFetcher;
