//! Mod Installer Library
//!
//! Installs archives ("mods") into a per-game directory tree. Each archive is
//! extracted to a staging directory, handed to the first installer plugin
//! that supports its layout, and the resulting instruction list is applied
//! to the destination. Name conflicts and older versions are negotiated with
//! the user, declared dependencies are installed in the background.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mod_installer::collaborators::{JsonPackageStore, SevenZipExtractor, StaticGameCatalog};
//! use mod_installer::installers::{FallbackInstaller, ManifestInstaller, FALLBACK_PRIORITY, MANIFEST_PRIORITY};
//! use mod_installer::{InstallConfig, InstallManager, InstallRequest, InstallServices, TracingReporter};
//! # use mod_installer::collaborators::{Decision, DecisionProvider, Prompt};
//! # struct AlwaysYes;
//! # #[async_trait::async_trait]
//! # impl DecisionProvider for AlwaysYes {
//! #     async fn decide(&self, prompt: Prompt) -> Option<Decision> {
//! #         prompt.choices.last().map(|c| Decision::new(c.clone()))
//! #     }
//! # }
//! use std::sync::Arc;
//!
//! # async fn example() -> mod_installer::Result<()> {
//! let config = InstallConfig::new("./mods");
//! let store = JsonPackageStore::open("./mods/state.json").await?;
//! let games = StaticGameCatalog::new().with_game("skyrimse", "Skyrim Special Edition").with_active("skyrimse");
//!
//! let services = InstallServices::new(
//!     config,
//!     Arc::new(store),
//!     Arc::new(games),
//!     Arc::new(AlwaysYes),
//!     Arc::new(SevenZipExtractor::default()),
//! )
//! .with_installer(MANIFEST_PRIORITY, ManifestInstaller)
//! .with_installer(FALLBACK_PRIORITY, FallbackInstaller)
//! .with_reporter(Arc::new(TracingReporter));
//!
//! let manager = InstallManager::new(services);
//! let result = manager
//!     .install(InstallRequest::new("SkyUI_5_2.7z").enabled(true).with_dependencies(true))
//!     .await;
//! println!("{:?}", result);
//! manager.wait_for_dependencies().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Serialized queue**: one install at a time, in request order
//! - **Installer plugins**: priority-ordered, first supporting installer wins
//! - **Declarative instructions**: copy, mkdir, generated files, ini edits, nested archives
//! - **Conflict handling**: rename/replace prompts and previous-version detection
//! - **Rollback**: staging always removed, failed installs leave no record
//! - **Dependencies**: `requires` rules downloaded and installed in the background

pub mod collaborators;
pub mod downloader;
pub mod install;
pub mod installers;

// Re-export commonly used types for convenience
pub use install::{
    InstallConfig, InstallError, InstallManager, InstallPhase, InstallReporter, InstallRequest, InstallResult,
    InstallServices, Instruction, ModInstaller, NullReporter, Result, TracingReporter,
};
