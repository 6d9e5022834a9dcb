//! Installation module
//!
//! Turns an archive into an installed package: the queue and pipeline live in
//! [`manager`], the pieces it drives in the sibling modules.

pub mod archive;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod executor;
pub mod instructions;
pub mod manager;
pub mod mod_types;
pub mod naming;
pub mod progress;
pub mod registry;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use archive::ArchiveEntry;
pub use config::InstallConfig;
pub use error::{InstallError, Result};
pub use executor::{ExecutionSummary, InstallTarget, InstructionExecutor};
pub use instructions::{InstallOutcome, Instruction};
pub use manager::{InstallManager, InstallRequest, InstallResult, InstallServices};
pub use mod_types::{ModType, ModTypeRegistry, PredicateModType, DEFAULT_MOD_TYPE};
pub use progress::{
    ErrorReport, InstallPhase, InstallReporter, Notification, NotificationKind, NullReporter, ProgressCallback,
    TracingReporter,
};
pub use registry::{InstallerRegistry, ModInstaller, SupportedResult};
