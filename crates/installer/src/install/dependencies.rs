//! Dependency discovery and installation
//!
//! `requires` rules of a freshly installed package are checked against the
//! installed set. Everything unsatisfied is downloaded if necessary and
//! installed through the regular install queue. Dependencies are best
//! effort: each one succeeds or fails on its own.

use futures::future::join_all;
use std::future::Future;
use tracing::{debug, warn};

use crate::collaborators::{
    DownloadProvider, MetadataLookup, ModMetadata, ModRecord, ModReference, ModRule, Prompt, RuleKind,
};
use crate::install::error::{InstallError, Result};

/// An unsatisfied requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub reference: ModReference,
    pub lookup_results: Vec<ModMetadata>,
    /// Download already known to satisfy the reference
    pub download_id: Option<String>,
}

impl Dependency {
    pub fn needs_download(&self) -> bool {
        self.download_id.is_none()
    }

    /// First source URI any lookup result declares
    pub fn source_uri(&self) -> Option<&str> {
        self.lookup_results.iter().find_map(|m| m.source_uri.as_deref())
    }
}

/// Collect the `requires` rules no installed package satisfies. A failed
/// lookup only leaves that dependency without sources.
pub async fn gather_dependencies(
    rules: &[ModRule],
    installed: &[ModRecord],
    metadata: &dyn MetadataLookup,
    downloads: &dyn DownloadProvider,
) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    for rule in rules.iter().filter(|r| r.kind == RuleKind::Requires) {
        if installed.iter().any(|record| rule.reference.matches(record)) {
            debug!("dependency {} already installed", rule.reference);
            continue;
        }
        let lookup_results = match metadata.lookup_reference(&rule.reference).await {
            Ok(results) => results,
            Err(e) => {
                warn!("failed to look up dependency {}: {}", rule.reference, e);
                Vec::new()
            }
        };
        let download_id = downloads.find_download(&rule.reference).await;
        dependencies.push(Dependency {
            reference: rule.reference.clone(),
            lookup_results,
            download_id,
        });
    }
    dependencies
}

/// The question asked before installing anything
pub fn dependency_prompt(dependencies: &[Dependency]) -> Prompt {
    let downloads = dependencies.iter().filter(|d| d.needs_download()).count();
    Prompt::question(
        "Install Dependencies",
        format!(
            "This mod has unresolved dependencies. {} mods have to be installed, {} of them have to be downloaded first.",
            dependencies.len(),
            downloads
        ),
    )
    .with_choices(["Don't install", "Install"])
}

/// Download id for a dependency, starting a download when none is known
pub async fn resolve_download(dependency: &Dependency, downloads: &dyn DownloadProvider) -> Result<String> {
    if let Some(id) = &dependency.download_id {
        return Ok(id.clone());
    }
    let source = dependency.source_uri().ok_or_else(|| {
        InstallError::Download(format!("no source known for {}", dependency.reference))
    })?;
    downloads.start_download(&[source.to_string()]).await
}

/// Install every dependency concurrently; `install` receives a download id
/// and returns the installed id. Results come back in input order.
pub async fn install_all<F, Fut>(
    dependencies: &[Dependency],
    downloads: &dyn DownloadProvider,
    install: F,
) -> Vec<Result<String>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let install = &install;
    join_all(dependencies.iter().map(|dependency| async move {
        let download_id = resolve_download(dependency, downloads).await?;
        let result = install(download_id).await;
        if let Err(e) = &result {
            warn!("dependency {} failed: {}", dependency.reference, e);
        }
        result
    }))
    .await
}
