//! Copy instruction implementation
//!
//! Transfers files from the staging path into the destination. Several
//! destinations may name the same source; all but the last are copied and the
//! last one is moved.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::install::error::Result;
use crate::install::instructions::common_instruction_utils::{ensure_dir, resolve_relative, transfer_file};

/// Place a file from the archive at a destination inside the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyInstruction {
    /// Path relative to the staging directory
    pub source: String,
    /// Path relative to the package destination
    pub destination: String,
}

impl CopyInstruction {
    pub fn new<S: Into<String>, D: Into<String>>(source: S, destination: D) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Outcome of applying the copy group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub transferred: usize,
    /// Sources the installer referenced that were not in the archive
    pub missing: Vec<String>,
}

/// Destinations keyed by source, sources in order of first appearance
fn group_by_source(copies: &[CopyInstruction]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for copy in copies {
        match groups.iter_mut().find(|(source, _)| *source == copy.source) {
            Some((_, destinations)) => destinations.push(&copy.destination),
            None => groups.push((&copy.source, vec![&copy.destination])),
        }
    }
    groups
}

/// Apply every copy instruction. Missing sources are collected in the report
/// instead of failing the install.
pub async fn transfer_all(
    copies: &[CopyInstruction],
    staging_path: &Path,
    destination_path: &Path,
    retry_delay: Duration,
) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    if copies.is_empty() {
        return Ok(report);
    }

    ensure_dir(destination_path, retry_delay).await?;

    // Sequential per source: the index decides copy vs. move
    for (source, destinations) in group_by_source(copies) {
        let source_path = resolve_relative(staging_path, source)?;

        if tokio::fs::metadata(&source_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            for destination in &destinations {
                ensure_dir(&resolve_relative(destination_path, destination)?, retry_delay).await?;
            }
            continue;
        }

        let last = destinations.len() - 1;
        for (idx, destination) in destinations.iter().enumerate() {
            let dest_path = resolve_relative(destination_path, destination)?;
            match transfer_file(&source_path, &dest_path, idx == last, retry_delay).await {
                Ok(()) => {
                    debug!("Installed {} -> {}", source, destination);
                    report.transferred += 1;
                }
                Err(err) if err.is_not_found() => {
                    warn!("Installer referenced a file not in the archive: {}", source);
                    report.missing.push(source.to_string());
                    break;
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(report)
}
