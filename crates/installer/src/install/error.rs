//! Installation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during installation
#[derive(Debug, Error)]
pub enum InstallError {
    /// The user explicitly opted out at one of the prompts
    #[error("Canceled by user")]
    UserCanceled,

    /// Internal abort that is treated like a cancellation
    #[error("Process canceled: {0}")]
    ProcessCanceled(String),

    #[error("The archive '{}' is damaged and couldn't be installed", archive.display())]
    ArchiveBroken { archive: PathBuf },

    /// Extraction finished with a non-zero code but no known-fatal diagnostics
    #[error("Encountered errors extracting '{}' (code {code})", archive.display())]
    RecoverableExtraction {
        archive: PathBuf,
        code: i32,
        errors: Vec<String>,
    },

    #[error("No installer supporting this file")]
    NoSupportingInstaller,

    #[error("Installer returned no instructions")]
    EmptyInstructions,

    /// The installer produced `Error` instructions
    #[error("Installer failed: {}", messages.join("; "))]
    InstallerFailed { messages: Vec<String> },

    #[error("File operation failed: {operation} '{}'", path.display())]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive extraction failed: {0}")]
    Extraction(String),

    #[error("Installer '{name}' failed: {message}")]
    Installer { name: String, message: String },

    #[error("Package store error: {0}")]
    Store(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Metadata lookup failed: {0}")]
    Metadata(String),

    #[error("Invalid instruction data: {0}")]
    InvalidInstruction(String),

    /// Install ids name exactly one directory below the game's install path
    #[error("'{0}' can't be used as an install id")]
    InvalidModId(String),
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Copy,
    Move,
    Delete,
    CreateDir,
    List,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Copy => write!(f, "copying"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::List => write!(f, "listing"),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    /// Wrap an io error with the path and operation it failed on
    pub fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        InstallError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Cancellation-class errors end an install as `Canceled`, not `Failed`
    pub fn is_canceled(&self) -> bool {
        matches!(self, InstallError::UserCanceled | InstallError::ProcessCanceled(_))
    }

    /// Anti-virus scanners and indexers hold short-lived locks on fresh files
    pub fn is_transient_lock(&self) -> bool {
        match self {
            InstallError::FileSystem { source, .. } => is_busy(source),
            _ => false,
        }
    }

    /// Whether the error is a missing file, used for missing archive members
    pub fn is_not_found(&self) -> bool {
        matches!(self, InstallError::FileSystem { source, .. }
            if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Permission problems are the user's environment, not an installer bug
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, InstallError::FileSystem { source, .. }
            if source.kind() == std::io::ErrorKind::PermissionDenied)
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::UserCanceled => "user_canceled",
            InstallError::ProcessCanceled(_) => "process_canceled",
            InstallError::ArchiveBroken { .. } => "archive_broken",
            InstallError::RecoverableExtraction { .. } => "recoverable_extraction",
            InstallError::NoSupportingInstaller => "no_installer",
            InstallError::EmptyInstructions => "empty_instructions",
            InstallError::InstallerFailed { .. } => "installer_failed",
            InstallError::FileSystem { .. } => "filesystem",
            InstallError::Extraction(_) => "extraction",
            InstallError::Installer { .. } => "installer",
            InstallError::Store(_) => "store",
            InstallError::Download(_) => "download",
            InstallError::Metadata(_) => "metadata",
            InstallError::InvalidInstruction(_) => "invalid_instruction",
            InstallError::InvalidModId(_) => "invalid_mod_id",
        }
    }
}

/// "Resource busy" class of io errors. Windows reports sharing violations
/// as permission denied, so that counts too.
pub fn is_busy(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::ResourceBusy | std::io::ErrorKind::PermissionDenied
    )
}
