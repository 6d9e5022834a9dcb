//! Downloader module
//!
//! Fetches archives of missing dependencies over HTTP and remembers where
//! they were stored, implementing the download collaborator.

pub mod config;
pub mod http;

pub use config::DownloadConfig;
pub use http::HttpDownloader;

#[cfg(test)]
mod tests;
