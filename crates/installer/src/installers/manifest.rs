//! Installer for archives that describe their own installation
//!
//! The archive root carries `modinstall.json`, a JSON array of instructions in
//! the same tagged format installers exchange, e.g.
//!
//! ```json
//! [
//!   {"type": "copy", "source": "core/plugin.esp", "destination": "plugin.esp"},
//!   {"type": "submodule", "path": "extras.7z", "key": "extras"}
//! ]
//! ```
//!
//! Relative submodule paths are resolved against the extracted archive.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::install::archive::ArchiveEntry;
use crate::install::error::{FileOperation, InstallError, Result};
use crate::install::instructions::{InstallOutcome, Instruction};
use crate::install::progress::ProgressCallback;
use crate::install::registry::{ModInstaller, SupportedResult};

pub const MANIFEST_FILE: &str = "modinstall.json";

#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestInstaller;

fn find_manifest(files: &[ArchiveEntry]) -> Option<&ArchiveEntry> {
    files
        .iter()
        .find(|entry| !entry.is_dir && entry.path.eq_ignore_ascii_case(MANIFEST_FILE))
}

#[async_trait]
impl ModInstaller for ManifestInstaller {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn test_supported(&self, files: &[ArchiveEntry], _game_id: &str) -> Result<SupportedResult> {
        Ok(match find_manifest(files) {
            Some(manifest) => SupportedResult::supported(vec![manifest.path.clone()]),
            None => SupportedResult::unsupported(),
        })
    }

    async fn install(
        &self,
        files: &[ArchiveEntry],
        staging_path: &Path,
        _game_id: &str,
        progress: ProgressCallback,
    ) -> Result<InstallOutcome> {
        let manifest = find_manifest(files)
            .ok_or_else(|| InstallError::InvalidInstruction(format!("{} not found in archive", MANIFEST_FILE)))?;
        let manifest_path = staging_path.join(&manifest.path);

        let raw = fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| InstallError::fs(&manifest_path, FileOperation::Read, e))?;
        let mut instructions: Vec<Instruction> = serde_json::from_str(&raw).map_err(|e| {
            warn!("unreadable manifest {}: {}", manifest_path.display(), e);
            InstallError::InvalidInstruction(format!("{}: {}", MANIFEST_FILE, e))
        })?;
        progress(50.0);

        for instruction in &mut instructions {
            if let Instruction::Submodule(submodule) = instruction {
                if submodule.path.is_relative() {
                    submodule.path = staging_path.join(&submodule.path);
                }
            }
        }
        debug!(count = instructions.len(), "read manifest instructions");

        progress(100.0);
        Ok(InstallOutcome::new(instructions))
    }
}
