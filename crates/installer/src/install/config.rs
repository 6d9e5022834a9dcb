//! Configuration types for the install manager

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::install::naming::sanitize;

/// Name of the sub-directory ini fragments are written to
pub const INI_TWEAKS_PATH: &str = "Ini Tweaks";

/// Configuration for install operations
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Packages for a game go to `<install_root>/<game id>` unless overridden
    pub install_root: PathBuf,
    /// Per-game install path overrides
    pub game_paths: HashMap<String, PathBuf>,
    /// Appended to the destination path to form the staging path
    pub staging_suffix: String,
    /// Sub-directory of the destination receiving generated ini fragments
    pub ini_tweaks_dir: String,
    /// Delay before the single retry of a file operation hitting a busy file
    pub busy_retry_delay: Duration,
    /// Extraction diagnostics containing one of these (case-insensitive) mean
    /// the archive is damaged beyond recovery
    pub critical_extraction_errors: Vec<String>,
    /// 7-Zip executable used by the default extractor
    pub seven_zip_path: PathBuf,
}

impl InstallConfig {
    pub fn new<P: Into<PathBuf>>(install_root: P) -> Self {
        Self {
            install_root: install_root.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `MODINSTALL_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var("MODINSTALL_ROOT") {
            config.install_root = PathBuf::from(root);
        }
        if let Ok(seven_zip) = std::env::var("MODINSTALL_SEVEN_ZIP") {
            config.seven_zip_path = PathBuf::from(seven_zip);
        }
        if let Some(delay) = std::env::var("MODINSTALL_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.busy_retry_delay = Duration::from_millis(delay);
        }
        config
    }

    pub fn with_game_path<S: Into<String>, P: Into<PathBuf>>(mut self, game_id: S, path: P) -> Self {
        self.game_paths.insert(game_id.into(), path.into());
        self
    }

    pub fn with_busy_retry_delay(mut self, delay: Duration) -> Self {
        self.busy_retry_delay = delay;
        self
    }

    pub fn with_seven_zip<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.seven_zip_path = path.into();
        self
    }

    /// Directory all packages of a game are installed into
    pub fn install_path(&self, game_id: &str) -> PathBuf {
        self.game_paths
            .get(game_id)
            .cloned()
            .unwrap_or_else(|| self.install_root.join(game_id))
    }

    /// `<path><suffix>` without treating the suffix as an extension
    pub fn staging_path_for(&self, destination: &Path) -> PathBuf {
        let mut staging = destination.as_os_str().to_owned();
        staging.push(&self.staging_suffix);
        PathBuf::from(staging)
    }

    /// Staging path of a nested archive referenced by a submodule instruction,
    /// always a sibling of the destination
    pub fn submodule_staging_path(&self, destination: &Path, key: &str) -> PathBuf {
        let key = match sanitize(key) {
            key if key.is_empty() => "submodule".to_string(),
            key => key,
        };
        let mut staging = destination.as_os_str().to_owned();
        staging.push(".");
        staging.push(&key);
        staging.push(&self.staging_suffix);
        PathBuf::from(staging)
    }

    /// Check whether extraction diagnostics indicate an unrecoverable archive
    pub fn is_critical_extraction_error(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.critical_extraction_errors
            .iter()
            .any(|needle| lower.contains(&needle.to_lowercase()))
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("./mods"),
            game_paths: HashMap::new(),
            staging_suffix: ".installing".to_string(),
            ini_tweaks_dir: INI_TWEAKS_PATH.to_string(),
            busy_retry_delay: Duration::from_millis(100),
            critical_extraction_errors: vec![
                "Unexpected end of archive".to_string(),
                "Data Error".to_string(),
            ],
            seven_zip_path: PathBuf::from("7z"),
        }
    }
}
