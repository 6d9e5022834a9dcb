//! Contracts with the systems around the install core
//!
//! The install pipeline never talks to a GUI, a 7-Zip process, the download
//! manager or the persistent state directly. It goes through these traits.
//! Default implementations live in the sub-modules.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::install::error::Result;

pub mod games;
pub mod metadata;
pub mod sevenzip;
pub mod store;

pub use games::{GameCatalog, StaticGameCatalog};
pub use metadata::{JsonMetadata, MetadataLookup, ModMetadata, ModReference, ModRule, NoMetadata, RuleKind};
pub use sevenzip::SevenZipExtractor;
pub use store::{JsonPackageStore, ModRecord, ModState, PackageStore, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Question,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInput {
    pub id: String,
    pub label: String,
    /// Prefilled value
    pub value: String,
    pub kind: InputKind,
}

/// A titled question with a fixed set of labeled choices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub inputs: Vec<PromptInput>,
    pub choices: Vec<String>,
}

impl Prompt {
    pub fn new<T: Into<String>, M: Into<String>>(kind: PromptKind, title: T, message: M) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            inputs: Vec::new(),
            choices: Vec::new(),
        }
    }

    pub fn question<T: Into<String>, M: Into<String>>(title: T, message: M) -> Self {
        Self::new(PromptKind::Question, title, message)
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input(mut self, id: &str, label: &str, value: &str, kind: InputKind) -> Self {
        self.inputs.push(PromptInput {
            id: id.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            kind,
        });
        self
    }
}

/// The user's answer to a [`Prompt`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub choice: String,
    pub inputs: HashMap<String, String>,
}

impl Decision {
    pub fn new<S: Into<String>>(choice: S) -> Self {
        Self {
            choice: choice.into(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_input<K: Into<String>, V: Into<String>>(mut self, id: K, value: V) -> Self {
        self.inputs.insert(id.into(), value.into());
        self
    }

    pub fn input(&self, id: &str) -> Option<&str> {
        self.inputs.get(id).map(String::as_str)
    }
}

/// Presents prompts to the user
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// `None` when the user dismissed the prompt
    async fn decide(&self, prompt: Prompt) -> Option<Decision>;
}

/// Result of running the archive tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub code: i32,
    pub errors: Vec<String>,
}

/// Supplies the password of an encrypted archive
#[async_trait]
pub trait PasswordProvider: Send + Sync {
    /// Fails with `UserCanceled` if the user declines
    async fn password(&self) -> Result<String>;
}

/// Unpacks archives into a staging directory
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `destination`. A non-zero `code` in the report is
    /// not an error by itself; the caller classifies the diagnostics.
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        passwords: &dyn PasswordProvider,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport>;
}

/// A finished download known to the download manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub id: String,
    pub path: PathBuf,
    pub game_id: Option<String>,
}

/// Fetches archives for missing dependencies
#[async_trait]
pub trait DownloadProvider: Send + Sync {
    /// Download from the first usable URI, returning the download id once done
    async fn start_download(&self, uris: &[String]) -> Result<String>;

    /// Id of an existing download matching the reference
    async fn find_download(&self, reference: &ModReference) -> Option<String>;

    async fn download_info(&self, id: &str) -> Option<DownloadInfo>;
}

/// Download collaborator for setups without a download manager
#[derive(Debug, Default)]
pub struct OfflineDownloads;

#[async_trait]
impl DownloadProvider for OfflineDownloads {
    async fn start_download(&self, uris: &[String]) -> Result<String> {
        Err(crate::install::error::InstallError::Download(format!(
            "downloads are disabled, can't fetch {}",
            uris.join(", ")
        )))
    }

    async fn find_download(&self, _reference: &ModReference) -> Option<String> {
        None
    }

    async fn download_info(&self, _id: &str) -> Option<DownloadInfo> {
        None
    }
}
