//! Installer registry for managing pluggable installer strategies
//!
//! Installers are tried in ascending priority. Each `test_supported` call is
//! awaited before the next installer is asked, so a slow high-precedence
//! installer always wins over a fast low-precedence one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::install::archive::ArchiveEntry;
use crate::install::error::Result;
use crate::install::instructions::InstallOutcome;
use crate::install::progress::ProgressCallback;

/// Answer of an installer asked whether it can handle a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedResult {
    pub supported: bool,
    #[serde(rename = "requiredFiles", default)]
    pub required_files: Vec<String>,
}

impl SupportedResult {
    pub fn supported(required_files: Vec<String>) -> Self {
        Self { supported: true, required_files }
    }

    pub fn unsupported() -> Self {
        Self::default()
    }
}

/// A strategy that turns an archive listing into install instructions.
///
/// Implementations are stateless and registered once at startup.
#[async_trait]
pub trait ModInstaller: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    async fn test_supported(&self, files: &[ArchiveEntry], game_id: &str) -> Result<SupportedResult>;

    async fn install(
        &self,
        files: &[ArchiveEntry],
        staging_path: &Path,
        game_id: &str,
        progress: ProgressCallback,
    ) -> Result<InstallOutcome>;
}

struct RegisteredInstaller {
    priority: i32,
    installer: Arc<dyn ModInstaller>,
}

/// The installer chosen for an archive
#[derive(Clone)]
pub struct SelectedInstaller {
    pub installer: Arc<dyn ModInstaller>,
    pub required_files: Vec<String>,
}

impl std::fmt::Debug for SelectedInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedInstaller")
            .field("installer", &self.installer.name())
            .field("required_files", &self.required_files)
            .finish()
    }
}

/// Ordered collection of installers
#[derive(Default)]
pub struct InstallerRegistry {
    installers: Vec<RegisteredInstaller>,
}

impl InstallerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an installer; lower priority values are tried first, ties keep
    /// registration order
    pub fn register(&mut self, priority: i32, installer: Arc<dyn ModInstaller>) {
        self.installers.push(RegisteredInstaller { priority, installer });
        // sort_by_key is stable
        self.installers.sort_by_key(|entry| entry.priority);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_installer<I: ModInstaller + 'static>(mut self, priority: i32, installer: I) -> Self {
        self.register(priority, Arc::new(installer));
        self
    }

    /// Names in the order they are tried
    pub fn names(&self) -> Vec<&str> {
        self.installers.iter().map(|e| e.installer.name()).collect()
    }

    /// First installer supporting the listing, or `None`
    pub async fn select(&self, files: &[ArchiveEntry], game_id: &str) -> Result<Option<SelectedInstaller>> {
        for entry in &self.installers {
            let result = entry.installer.test_supported(files, game_id).await?;
            debug!(
                installer = entry.installer.name(),
                priority = entry.priority,
                supported = result.supported,
                "tested installer"
            );
            if result.supported {
                return Ok(Some(SelectedInstaller {
                    installer: Arc::clone(&entry.installer),
                    required_files: result.required_files,
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct LoggingInstaller {
        name: &'static str,
        supported: bool,
        delay: Duration,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ModInstaller for LoggingInstaller {
        fn name(&self) -> &str {
            self.name
        }

        async fn test_supported(&self, _files: &[ArchiveEntry], _game_id: &str) -> Result<SupportedResult> {
            self.log.lock().unwrap().push(format!("start {}", self.name));
            tokio::time::sleep(self.delay).await;
            self.log.lock().unwrap().push(format!("end {}", self.name));
            Ok(SupportedResult {
                supported: self.supported,
                required_files: vec![format!("{}.txt", self.name)],
            })
        }

        async fn install(
            &self,
            _files: &[ArchiveEntry],
            _staging_path: &Path,
            _game_id: &str,
            _progress: ProgressCallback,
        ) -> Result<InstallOutcome> {
            Ok(InstallOutcome::new(vec![]))
        }
    }

    fn logging(name: &'static str, supported: bool, delay_ms: u64, log: &Arc<Mutex<Vec<String>>>) -> LoggingInstaller {
        LoggingInstaller {
            name,
            supported,
            delay: Duration::from_millis(delay_ms),
            log: Arc::clone(log),
        }
    }

    #[tokio::test]
    async fn test_lowest_priority_supporting_installer_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = InstallerRegistry::new()
            .with_installer(50, logging("fallback", true, 0, &log))
            .with_installer(10, logging("script", false, 0, &log))
            .with_installer(20, logging("slow", true, 30, &log))
            .with_installer(20, logging("tied", true, 0, &log));

        assert_eq!(registry.names(), vec!["script", "slow", "tied", "fallback"]);

        let selected = registry
            .select(&[ArchiveEntry::file("a.esp")], "skyrimse")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.installer.name(), "slow");
        assert_eq!(selected.required_files, vec!["slow.txt"]);

        // never asks the next installer before the previous one answered
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start script", "end script", "start slow", "end slow"]
        );
    }

    #[tokio::test]
    async fn test_no_installer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = InstallerRegistry::new().with_installer(1, logging("picky", false, 0, &log));

        let selected = registry.select(&[], "skyrimse").await.unwrap();
        assert!(selected.is_none());
        tokio_test::assert_ok!(registry.select(&[], "fallout4").await);
    }
}
