//! Listing of an extracted archive

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::install::error::{FileOperation, InstallError, Result};

/// One member of an archive, relative to the archive root with `/` separators
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub path: String,
    #[serde(rename = "isDirectory", default)]
    pub is_dir: bool,
}

impl ArchiveEntry {
    pub fn file<S: Into<String>>(path: S) -> Self {
        Self { path: path.into(), is_dir: false }
    }

    pub fn dir<S: Into<String>>(path: S) -> Self {
        Self { path: path.into(), is_dir: true }
    }

    /// Last path component
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Walk an extracted staging directory. Directories are listed too so that
/// empty folders survive.
pub async fn list_staged(root: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut reader = fs::read_dir(&dir)
            .await
            .map_err(|e| InstallError::fs(&dir, FileOperation::List, e))?;

        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| InstallError::fs(&dir, FileOperation::List, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| InstallError::fs(&path, FileOperation::List, e))?;

            let Some(relative) = relative_path(root, &path) else {
                continue;
            };
            if file_type.is_dir() {
                entries.push(ArchiveEntry::dir(relative));
                pending.push(path);
            } else {
                entries.push(ArchiveEntry::file(relative));
            }
        }
    }

    entries.sort();
    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
