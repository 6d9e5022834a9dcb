//! Installer of last resort: the archive layout is the package layout

use async_trait::async_trait;
use std::path::Path;

use crate::install::archive::ArchiveEntry;
use crate::install::error::Result;
use crate::install::instructions::{InstallOutcome, Instruction};
use crate::install::progress::ProgressCallback;
use crate::install::registry::{ModInstaller, SupportedResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackInstaller;

#[async_trait]
impl ModInstaller for FallbackInstaller {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn test_supported(&self, _files: &[ArchiveEntry], _game_id: &str) -> Result<SupportedResult> {
        Ok(SupportedResult::supported(Vec::new()))
    }

    async fn install(
        &self,
        files: &[ArchiveEntry],
        _staging_path: &Path,
        _game_id: &str,
        progress: ProgressCallback,
    ) -> Result<InstallOutcome> {
        let instructions = files
            .iter()
            .map(|entry| {
                if entry.is_dir {
                    Instruction::mkdir(entry.path.clone())
                } else {
                    Instruction::copy(entry.path.clone(), entry.path.clone())
                }
            })
            .collect();
        progress(100.0);
        Ok(InstallOutcome::new(instructions))
    }
}
