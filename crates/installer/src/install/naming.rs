//! Install id derivation and conflict resolution
//!
//! Two independent negotiations happen before an install id is final: a
//! name collision with an installed package, and an older version of the
//! same file being installed already. Both talk to the user through the
//! decision collaborator.

use std::path::Path;
use tracing::{debug, info};

use crate::collaborators::{
    DecisionProvider, InputKind, ModMetadata, ModRecord, PackageStore, Prompt,
};
use crate::install::error::{InstallError, Result};

const EXISTS_MESSAGE: &str = "This mod seems to be installed already. You can replace the existing one \
    or install the new one under a different name (this name is used internally, you can still change \
    the display name to anything you want later).";

const OLDER_VERSION_MESSAGE: &str = "An older version of this mod is already installed. You can replace \
    the existing one or install this one alongside it. If you have other profiles they will continue \
    using the old version.";

/// Used when neither metadata nor the archive name yield a usable id
pub const DEFAULT_INSTALL_ID: &str = "mod";

/// Install id for an archive: its base name, or the metadata's logical name
/// and version when known. Never empty.
pub fn derive_install_id(archive: &Path, metadata: Option<&ModMetadata>) -> String {
    let lossy = |name: Option<&std::ffi::OsStr>| name.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let stem = lossy(archive.file_stem());
    let file_name = lossy(archive.file_name());

    let derived = metadata.and_then(|meta| {
        let name = meta.logical_file_name.as_deref()?;
        Some(match meta.file_version.as_deref() {
            Some(version) => format!("{}-{}", name, version),
            None => name.to_string(),
        })
    });

    derived
        .iter()
        .chain([&stem, &file_name])
        .map(|candidate| sanitize(candidate))
        .find(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_INSTALL_ID.to_string())
}

/// Make a name usable as a single path component. May return an empty
/// string, callers pick a fallback.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Final id plus whether the package should end up enabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolution {
    pub mod_id: String,
    pub enable: bool,
}

pub struct NameResolver<'a> {
    store: &'a dyn PackageStore,
    decisions: &'a dyn DecisionProvider,
    game_id: &'a str,
}

impl<'a> NameResolver<'a> {
    pub fn new(store: &'a dyn PackageStore, decisions: &'a dyn DecisionProvider, game_id: &'a str) -> Self {
        Self { store, decisions, game_id }
    }

    /// Run the name loop, then the previous-version check
    pub async fn resolve(&self, candidate: String, file_id: Option<&str>, enable: bool) -> Result<NameResolution> {
        let mut resolution = self.resolve_name(candidate, enable).await?;
        if let Some(file_id) = file_id {
            if let Some(old) = self.find_previous_version(file_id).await {
                self.resolve_previous_version(&old, &mut resolution).await?;
            }
        }
        Ok(resolution)
    }

    /// Ask until the id is free, the user replaces the existing package, or
    /// cancels. The store is re-read on every pass.
    pub async fn resolve_name(&self, candidate: String, mut enable: bool) -> Result<NameResolution> {
        let mut mod_id = candidate;
        while self.store.get_mod(self.game_id, &mod_id).await.is_some() {
            let prompt = Prompt::question("Mod exists", EXISTS_MESSAGE)
                .with_input("newName", "Name", &mod_id, InputKind::Text)
                .with_choices(["Cancel", "Rename", "Replace"]);

            let decision = self.decisions.decide(prompt).await.ok_or(InstallError::UserCanceled)?;
            match decision.choice.as_str() {
                "Rename" => {
                    let new_name = sanitize(decision.input("newName").unwrap_or_default());
                    if !new_name.is_empty() {
                        debug!("renaming install from {} to {}", mod_id, new_name);
                        mod_id = new_name;
                    }
                }
                "Replace" => {
                    enable |= self.was_enabled(&mod_id).await;
                    info!("replacing installed mod {}", mod_id);
                    self.store.remove_mod(self.game_id, &mod_id).await?;
                }
                _ => return Err(InstallError::UserCanceled),
            }
        }
        Ok(NameResolution { mod_id, enable })
    }

    /// An installed package whose newest known file is the one being
    /// installed, while it still has an older one
    pub async fn find_previous_version(&self, file_id: &str) -> Option<ModRecord> {
        self.store.mods(self.game_id).await.into_iter().find(|record| {
            let newest = record.attribute_str("newestFileId");
            newest == Some(file_id) && newest != record.attribute_str("fileId")
        })
    }

    pub async fn resolve_previous_version(&self, old: &ModRecord, resolution: &mut NameResolution) -> Result<()> {
        let title = old.attribute_str("logicalFileName").unwrap_or(&old.id).to_string();
        let prompt = Prompt::question(title, OLDER_VERSION_MESSAGE).with_choices(["Cancel", "Replace", "Install"]);
        let decision = self.decisions.decide(prompt).await.ok_or(InstallError::UserCanceled)?;
        let was_enabled = self.was_enabled(&old.id).await;

        match decision.choice.as_str() {
            // keeps the old package exactly as it is
            "Install" => {
                resolution.enable |= was_enabled;
                Ok(())
            }
            "Replace" => {
                info!("replacing older version {}", old.id);
                self.store.remove_mod(self.game_id, &old.id).await?;
                // same id so other profiles keep referencing it
                resolution.mod_id = old.id.clone();
                resolution.enable |= was_enabled;
                Ok(())
            }
            _ => Err(InstallError::UserCanceled),
        }
    }

    async fn was_enabled(&self, mod_id: &str) -> bool {
        match self.store.active_profile().await {
            Some(profile) if profile.game_id == self.game_id => self.store.is_enabled(&profile.id, mod_id).await,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Decision, JsonPackageStore};
    use crate::install::test_support::ScriptedDecisions;
    use serde_json::json;
    use std::path::PathBuf;

    async fn store_with(ids: &[&str]) -> JsonPackageStore {
        let store = JsonPackageStore::in_memory();
        store.activate_profile("default", "skyrimse").await.unwrap();
        for id in ids {
            store.add_mod("skyrimse", ModRecord::new(*id)).await.unwrap();
        }
        store
    }

    #[test]
    fn test_derive_install_id() {
        assert_eq!(derive_install_id(&PathBuf::from("/dl/SkyUI_5_2-3863.7z"), None), "SkyUI_5_2-3863");

        let meta = ModMetadata {
            logical_file_name: Some("SkyUI: Main".into()),
            file_version: Some("5.2".into()),
            ..ModMetadata::default()
        };
        assert_eq!(derive_install_id(&PathBuf::from("/dl/x.7z"), Some(&meta)), "SkyUI_ Main-5.2");
    }

    #[test]
    fn test_derive_install_id_never_empty() {
        let blank = ModMetadata {
            logical_file_name: Some("   ".into()),
            ..ModMetadata::default()
        };
        assert_eq!(derive_install_id(&PathBuf::from("/dl/Bad.7z"), Some(&blank)), "Bad");
        assert_eq!(derive_install_id(&PathBuf::from("/dl/..."), None), DEFAULT_INSTALL_ID);
        assert_eq!(derive_install_id(&PathBuf::from("/dl/ .7z"), Some(&blank)), ".7z");
        assert_eq!(sanitize(".."), "");
    }

    #[tokio::test]
    async fn test_free_name_needs_no_prompt() {
        let store = store_with(&[]).await;
        let decisions = ScriptedDecisions::new();
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let resolution = resolver.resolve("ModA".into(), None, false).await.unwrap();
        assert_eq!(resolution, NameResolution { mod_id: "ModA".into(), enable: false });
        assert!(decisions.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_rename_to_same_name_prompts_again() {
        let store = store_with(&["ModA"]).await;
        let decisions = ScriptedDecisions::new()
            .answer(Decision::new("Rename").with_input("newName", "ModA"))
            .answer(Decision::new("Rename").with_input("newName", "ModA2"));
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let resolution = resolver.resolve_name("ModA".into(), false).await.unwrap();
        assert_eq!(resolution.mod_id, "ModA2");
        assert_eq!(decisions.titles(), vec!["Mod exists", "Mod exists"]);
        assert_eq!(decisions.prompts()[0].inputs[0].value, "ModA");
    }

    #[tokio::test]
    async fn test_replace_removes_and_keeps_enabled_state() {
        let store = store_with(&["ModA"]).await;
        store.set_enabled("default", "ModA", true).await.unwrap();
        let decisions = ScriptedDecisions::new().choose("Replace");
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let resolution = resolver.resolve_name("ModA".into(), false).await.unwrap();
        assert_eq!(resolution, NameResolution { mod_id: "ModA".into(), enable: true });
        assert!(store.get_mod("skyrimse", "ModA").await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_and_dismiss_abort() {
        let store = store_with(&["ModA"]).await;
        let decisions = ScriptedDecisions::new().choose("Cancel").dismiss();
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let canceled = resolver.resolve_name("ModA".into(), false).await;
        assert!(matches!(canceled, Err(InstallError::UserCanceled)));
        let dismissed = resolver.resolve_name("ModA".into(), false).await;
        assert!(matches!(dismissed, Err(InstallError::UserCanceled)));
    }

    #[tokio::test]
    async fn test_previous_version_install_alongside() {
        let store = store_with(&["SkyUI-5.1"]).await;
        store.set_attribute("skyrimse", "SkyUI-5.1", "fileId", json!("100")).await.unwrap();
        store.set_attribute("skyrimse", "SkyUI-5.1", "newestFileId", json!("200")).await.unwrap();
        store.set_enabled("default", "SkyUI-5.1", true).await.unwrap();

        let decisions = ScriptedDecisions::new().choose("Install");
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let resolution = resolver.resolve("SkyUI-5.2".into(), Some("200"), false).await.unwrap();
        assert_eq!(resolution, NameResolution { mod_id: "SkyUI-5.2".into(), enable: true });
        assert!(store.get_mod("skyrimse", "SkyUI-5.1").await.is_some());
        assert!(store.is_enabled("default", "SkyUI-5.1").await);
    }

    #[tokio::test]
    async fn test_previous_version_replace_reuses_id() {
        let store = store_with(&["SkyUI-5.1"]).await;
        store.set_attribute("skyrimse", "SkyUI-5.1", "fileId", json!("100")).await.unwrap();
        store.set_attribute("skyrimse", "SkyUI-5.1", "newestFileId", json!("200")).await.unwrap();

        let decisions = ScriptedDecisions::new().choose("Replace");
        let resolver = NameResolver::new(&store, &decisions, "skyrimse");

        let resolution = resolver.resolve("SkyUI-5.2".into(), Some("200"), false).await.unwrap();
        assert_eq!(resolution.mod_id, "SkyUI-5.1");
        assert!(store.get_mod("skyrimse", "SkyUI-5.1").await.is_none());

        // up to date packages are not offered
        assert!(resolver.find_previous_version("100").await.is_none());
    }
}
