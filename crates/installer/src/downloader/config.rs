//! Configuration for the dependency downloader

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for download operations
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory finished archives are stored in
    pub downloads_dir: PathBuf,
    /// Attempts per URI after the first one fails
    pub max_retries: usize,
    pub timeout: Duration,
    pub user_agent: String,
    /// Initial delay between retries (doubles each retry)
    pub retry_delay: Duration,
}

impl DownloadConfig {
    pub fn new<P: Into<PathBuf>>(downloads_dir: P) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("./downloads"),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            user_agent: concat!("modinstall/", env!("CARGO_PKG_VERSION")).to_string(),
            retry_delay: Duration::from_millis(1000),
        }
    }
}
