//! Instruction executor
//!
//! Applies an installer's instruction list to the filesystem and the package
//! store. Groups run in a fixed order: mkdir, copy, generated files, ini
//! fragments, submodules, attributes, mod type. Any `error` instruction
//! aborts before anything is written.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::collaborators::PackageStore;
use crate::install::config::InstallConfig;
use crate::install::error::{InstallError, Result};
use crate::install::instructions::attribute::effective_mod_type;
use crate::install::instructions::copy::transfer_all;
use crate::install::instructions::diagnostics::distinct_functions;
use crate::install::instructions::ini_edit::write_fragments;
use crate::install::instructions::{Instruction, InstructionGroups, SubmoduleInstruction};
use crate::install::progress::{InstallReporter, Notification};

/// Where one (possibly nested) install writes to
#[derive(Debug, Clone, Copy)]
pub struct InstallTarget<'a> {
    pub game_id: &'a str,
    /// Package record receiving attributes and type
    pub mod_id: &'a str,
    pub archive_path: &'a Path,
    pub staging_path: &'a Path,
    pub destination_path: &'a Path,
}

impl InstallTarget<'_> {
    pub fn archive_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Runs the full pipeline for a nested archive into the parent's destination
#[async_trait]
pub trait SubmoduleRunner: Send + Sync {
    async fn run_submodule(&self, parent: &InstallTarget<'_>, submodule: &SubmoduleInstruction) -> Result<()>;
}

/// What applying an instruction list did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub transferred: usize,
    pub missing: Vec<String>,
    pub unsupported: Vec<String>,
    pub mod_type: Option<String>,
}

pub struct InstructionExecutor<'a> {
    config: &'a InstallConfig,
    store: &'a dyn PackageStore,
    reporter: &'a dyn InstallReporter,
}

impl<'a> InstructionExecutor<'a> {
    pub fn new(config: &'a InstallConfig, store: &'a dyn PackageStore, reporter: &'a dyn InstallReporter) -> Self {
        Self { config, store, reporter }
    }

    pub async fn apply(
        &self,
        target: &InstallTarget<'_>,
        instructions: &[Instruction],
        submodules: &dyn SubmoduleRunner,
    ) -> Result<ExecutionSummary> {
        let groups = InstructionGroups::from_instructions(instructions);
        let delay = self.config.busy_retry_delay;

        if groups.has_errors() {
            let messages: Vec<String> = groups.error.iter().map(|e| e.message.clone()).collect();
            self.reporter
                .on_notification(&Notification::error("Installer failed", messages.join("\n")));
            return Err(InstallError::InstallerFailed { messages });
        }

        debug!(
            mkdir = groups.mkdir.len(),
            copy = groups.copy.len(),
            generate_file = groups.generate_file.len(),
            ini_edit = groups.ini_edit.len(),
            submodule = groups.submodule.len(),
            attribute = groups.attribute.len(),
            "installer instructions"
        );

        let mut summary = ExecutionSummary {
            unsupported: distinct_functions(&groups.unsupported),
            ..ExecutionSummary::default()
        };
        if !summary.unsupported.is_empty() {
            self.reporter.on_notification(&Notification::info(
                "Installer unsupported",
                format!(
                    "The installer in \"{}\" uses functions that are not implemented: {}",
                    target.archive_name(),
                    summary.unsupported.join(", ")
                ),
            ));
        }

        for mkdir in &groups.mkdir {
            mkdir.execute(target.destination_path, delay).await?;
        }

        let copies = transfer_all(&groups.copy, target.staging_path, target.destination_path, delay).await?;
        summary.transferred = copies.transferred;
        if !copies.missing.is_empty() {
            let listing: Vec<String> = copies.missing.iter().map(|m| format!("- {}", m)).collect();
            self.reporter.on_notification(&Notification::warning(
                "Invalid installer",
                format!(
                    "The installer in \"{}\" tried to install files that were not part of the archive.\n\
                     This is a bug in the mod, please report it to the mod author.\n\n{}",
                    target.archive_name(),
                    listing.join("\n")
                ),
            ));
            summary.missing = copies.missing;
        }

        for generated in &groups.generate_file {
            generated.execute(target.destination_path, delay).await?;
        }

        write_fragments(&groups.ini_edit, target.destination_path, &self.config.ini_tweaks_dir, delay).await?;

        // Later submodules may rely on files placed by earlier ones
        for submodule in &groups.submodule {
            info!(key = %submodule.key, "installing submodule {}", submodule.path.display());
            submodules.run_submodule(target, submodule).await?;
        }

        for attribute in &groups.attribute {
            self.store
                .set_attribute(target.game_id, target.mod_id, &attribute.key, attribute.value.clone())
                .await?;
        }

        if let Some(mod_type) = effective_mod_type(&groups.set_mod_type) {
            self.store.set_mod_type(target.game_id, target.mod_id, mod_type).await?;
            summary.mod_type = Some(mod_type.to_string());
        }

        Ok(summary)
    }
}
