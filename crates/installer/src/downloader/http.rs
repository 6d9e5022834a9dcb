//! HTTP download collaborator

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};
use url::Url;
use xxhash_rust::xxh64::xxh64;

use crate::collaborators::{DownloadInfo, DownloadProvider, ModReference};
use crate::downloader::config::DownloadConfig;
use crate::install::error::{FileOperation, InstallError, Result};

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Install(#[from] InstallError),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            FetchError::Install(_) => false,
        }
    }
}

/// Downloads archives over HTTP(S) into the configured downloads directory
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
    game_id: Option<String>,
    downloads: Mutex<HashMap<String, DownloadInfo>>,
}

impl HttpDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| InstallError::Download(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            game_id: None,
            downloads: Mutex::new(HashMap::new()),
        })
    }

    /// Game every download of this instance is attributed to
    pub fn with_game<S: Into<String>>(mut self, game_id: S) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Make an archive that is already on disk known, returning its id
    pub fn register_existing(&self, path: &Path) -> String {
        let id = download_id(&path.to_string_lossy());
        self.remember(DownloadInfo {
            id: id.clone(),
            path: path.to_path_buf(),
            game_id: self.game_id.clone(),
        });
        id
    }

    fn remember(&self, info: DownloadInfo) {
        if let Ok(mut downloads) = self.downloads.lock() {
            downloads.insert(info.id.clone(), info);
        }
    }

    /// Stored as `<id>-<name>` so sources sharing a file name never collide
    async fn fetch(&self, url: &Url, id: &str) -> std::result::Result<PathBuf, FetchError> {
        let file_name = format!("{}-{}", id, file_name_for(url));
        let dest_path = self.config.downloads_dir.join(&file_name);
        let temp_path = self.config.downloads_dir.join(format!("{}.part", file_name));

        fs::create_dir_all(&self.config.downloads_dir)
            .await
            .map_err(|e| InstallError::fs(&self.config.downloads_dir, FileOperation::CreateDir, e))?;

        let response = self.client.get(url.as_str()).send().await?;
        response.error_for_status_ref()?;

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| InstallError::fs(&temp_path, FileOperation::Write, e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| InstallError::fs(&temp_path, FileOperation::Write, e))?;
            downloaded += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| InstallError::fs(&temp_path, FileOperation::Write, e))?;

        fs::rename(&temp_path, &dest_path)
            .await
            .map_err(|e| InstallError::fs(&temp_path, FileOperation::Move, e))?;

        debug!("Download completed: {} bytes", downloaded);
        Ok(dest_path)
    }

    async fn fetch_with_retry(&self, url: &Url, id: &str) -> std::result::Result<PathBuf, FetchError> {
        let factor = (self.config.retry_delay.as_millis() as u64 / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .take(self.config.max_retries);

        RetryIf::spawn(
            strategy,
            || self.fetch(url, id),
            |err: &FetchError| {
                let transient = err.is_transient();
                if transient {
                    warn!("Retrying {} after: {}", url, err);
                }
                transient
            },
        )
        .await
    }
}

fn download_id(key: &str) -> String {
    hex::encode(xxh64(key.as_bytes(), 0).to_be_bytes())
}

fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string()
}

#[async_trait]
impl DownloadProvider for HttpDownloader {
    async fn start_download(&self, uris: &[String]) -> Result<String> {
        let mut last_error = String::from("no source URI given");

        for uri in uris {
            let url = match Url::parse(uri) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => url,
                Ok(url) => {
                    last_error = format!("unsupported scheme '{}' in {}", url.scheme(), uri);
                    warn!("{}", last_error);
                    continue;
                }
                Err(e) => {
                    last_error = format!("invalid URI {}: {}", uri, e);
                    warn!("{}", last_error);
                    continue;
                }
            };

            info!("Downloading {}", url);
            let id = download_id(url.as_str());
            match self.fetch_with_retry(&url, &id).await {
                Ok(path) => {
                    self.remember(DownloadInfo {
                        id: id.clone(),
                        path,
                        game_id: self.game_id.clone(),
                    });
                    return Ok(id);
                }
                Err(e) => {
                    last_error = format!("{}: {}", url, e);
                    warn!("Download failed, trying next source: {}", last_error);
                }
            }
        }

        Err(InstallError::Download(last_error))
    }

    async fn find_download(&self, reference: &ModReference) -> Option<String> {
        let name = reference.logical_file_name.as_deref()?;
        let downloads = self.downloads.lock().ok()?;
        downloads
            .values()
            .find(|info| {
                info.path.file_stem().is_some_and(|stem| {
                    let stem = stem.to_string_lossy();
                    let prefix = format!("{}-", info.id);
                    stem.strip_prefix(prefix.as_str()).unwrap_or(stem.as_ref()).eq_ignore_ascii_case(name)
                })
            })
            .map(|info| info.id.clone())
    }

    async fn download_info(&self, id: &str) -> Option<DownloadInfo> {
        self.downloads.lock().ok()?.get(id).cloned()
    }
}
