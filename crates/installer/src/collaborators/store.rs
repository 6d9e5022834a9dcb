//! Package records and the store that keeps them

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::install::error::{FileOperation, InstallError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModState {
    Installing,
    Installed,
}

/// An installed (or installing) package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRecord {
    pub id: String,
    pub state: ModState,
    #[serde(rename = "type", default)]
    pub mod_type: String,
    #[serde(rename = "installPath", default)]
    pub install_path: Option<PathBuf>,
    #[serde(rename = "archiveId", default)]
    pub archive_id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ModRecord {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            state: ModState::Installing,
            mod_type: String::new(),
            install_path: None,
            archive_id: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_archive_id(mut self, archive_id: Option<String>) -> Self {
        self.archive_id = archive_id;
        self
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(rename = "gameId")]
    pub game_id: String,
}

/// Persistent state of installed packages and per-profile enabled flags
#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn mods(&self, game_id: &str) -> Vec<ModRecord>;

    async fn get_mod(&self, game_id: &str, mod_id: &str) -> Option<ModRecord>;

    async fn add_mod(&self, game_id: &str, record: ModRecord) -> Result<()>;

    /// Deactivate the package in every profile and delete its files
    async fn remove_mod(&self, game_id: &str, mod_id: &str) -> Result<()>;

    async fn set_state(&self, game_id: &str, mod_id: &str, state: ModState) -> Result<()>;

    async fn set_install_path(&self, game_id: &str, mod_id: &str, path: &Path) -> Result<()>;

    async fn set_mod_type(&self, game_id: &str, mod_id: &str, mod_type: &str) -> Result<()>;

    async fn set_attribute(&self, game_id: &str, mod_id: &str, key: &str, value: serde_json::Value) -> Result<()>;

    async fn active_profile(&self) -> Option<Profile>;

    async fn is_enabled(&self, profile_id: &str, mod_id: &str) -> bool;

    async fn set_enabled(&self, profile_id: &str, mod_id: &str, enabled: bool) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileState {
    #[serde(rename = "gameId")]
    game_id: String,
    #[serde(default)]
    enabled: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    mods: BTreeMap<String, BTreeMap<String, ModRecord>>,
    #[serde(default)]
    profiles: BTreeMap<String, ProfileState>,
    #[serde(rename = "activeProfile", default)]
    active_profile: Option<String>,
}

/// Store kept in memory, optionally mirrored to a JSON file after every change
#[derive(Debug, Default)]
pub struct JsonPackageStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl JsonPackageStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`; a missing file starts empty
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|e| InstallError::Store(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(InstallError::fs(&path, FileOperation::Read, e)),
        };
        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    /// Create (or replace) a profile and make it the active one
    pub async fn activate_profile(&self, profile_id: &str, game_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state
                .profiles
                .entry(profile_id.to_string())
                .or_default()
                .game_id = game_id.to_string();
            state.active_profile = Some(profile_id.to_string());
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&*state).map_err(|e| InstallError::Store(e.to_string()))?
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallError::fs(parent, FileOperation::CreateDir, e))?;
        }
        tokio::fs::write(path, data)
            .await
            .map_err(|e| InstallError::fs(path, FileOperation::Write, e))
    }

    async fn update_mod<F>(&self, game_id: &str, mod_id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut ModRecord) + Send,
    {
        {
            let mut state = self.state.write().await;
            let record = state
                .mods
                .get_mut(game_id)
                .and_then(|mods| mods.get_mut(mod_id))
                .ok_or_else(|| InstallError::Store(format!("unknown mod {}/{}", game_id, mod_id)))?;
            update(record);
        }
        self.persist().await
    }
}

#[async_trait]
impl PackageStore for JsonPackageStore {
    async fn mods(&self, game_id: &str) -> Vec<ModRecord> {
        let state = self.state.read().await;
        state
            .mods
            .get(game_id)
            .map(|mods| mods.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn get_mod(&self, game_id: &str, mod_id: &str) -> Option<ModRecord> {
        let state = self.state.read().await;
        state.mods.get(game_id).and_then(|mods| mods.get(mod_id)).cloned()
    }

    async fn add_mod(&self, game_id: &str, record: ModRecord) -> Result<()> {
        {
            let mut state = self.state.write().await;
            debug!(game_id, mod_id = %record.id, "adding mod record");
            state
                .mods
                .entry(game_id.to_string())
                .or_default()
                .insert(record.id.clone(), record);
        }
        self.persist().await
    }

    async fn remove_mod(&self, game_id: &str, mod_id: &str) -> Result<()> {
        let removed = {
            let mut state = self.state.write().await;
            for profile in state.profiles.values_mut() {
                if profile.game_id == game_id {
                    profile.enabled.remove(mod_id);
                }
            }
            state.mods.get_mut(game_id).and_then(|mods| mods.remove(mod_id))
        };

        if let Some(path) = removed.and_then(|r| r.install_path) {
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("install path of {} already gone: {}", mod_id, path.display());
                }
                Err(e) => return Err(InstallError::fs(&path, FileOperation::Delete, e)),
            }
        }
        self.persist().await
    }

    async fn set_state(&self, game_id: &str, mod_id: &str, mod_state: ModState) -> Result<()> {
        self.update_mod(game_id, mod_id, |r| r.state = mod_state).await
    }

    async fn set_install_path(&self, game_id: &str, mod_id: &str, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        self.update_mod(game_id, mod_id, move |r| r.install_path = Some(path)).await
    }

    async fn set_mod_type(&self, game_id: &str, mod_id: &str, mod_type: &str) -> Result<()> {
        let mod_type = mod_type.to_string();
        self.update_mod(game_id, mod_id, move |r| r.mod_type = mod_type).await
    }

    async fn set_attribute(&self, game_id: &str, mod_id: &str, key: &str, value: serde_json::Value) -> Result<()> {
        let key = key.to_string();
        self.update_mod(game_id, mod_id, move |r| {
            r.attributes.insert(key, value);
        })
        .await
    }

    async fn active_profile(&self) -> Option<Profile> {
        let state = self.state.read().await;
        let id = state.active_profile.clone()?;
        let profile = state.profiles.get(&id)?;
        Some(Profile {
            id,
            game_id: profile.game_id.clone(),
        })
    }

    async fn is_enabled(&self, profile_id: &str, mod_id: &str) -> bool {
        let state = self.state.read().await;
        state
            .profiles
            .get(profile_id)
            .and_then(|p| p.enabled.get(mod_id).copied())
            .unwrap_or(false)
    }

    async fn set_enabled(&self, profile_id: &str, mod_id: &str, enabled: bool) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let profile = state
                .profiles
                .get_mut(profile_id)
                .ok_or_else(|| InstallError::Store(format!("unknown profile {}", profile_id)))?;
            profile.enabled.insert(mod_id.to_string(), enabled);
        }
        self.persist().await
    }
}
