//! Archive extraction through the 7-Zip command line tool

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborators::{ArchiveExtractor, ExtractionReport, PasswordProvider};
use crate::install::error::{InstallError, Result};

/// Runs `7z x` as a subordinate process
#[derive(Debug, Clone)]
pub struct SevenZipExtractor {
    executable: PathBuf,
}

impl SevenZipExtractor {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    fn command(&self, archive: &Path, destination: &Path, password: &str) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("x")
            .arg(archive)
            .arg(format!("-o{}", destination.display()))
            .arg("-y")
            .arg("-bd")
            // An explicit (possibly empty) password keeps 7z from reading stdin
            .arg(format!("-p{}", password))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_once(
        &self,
        archive: &Path,
        destination: &Path,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport> {
        let child = self.command(archive, destination, password).spawn().map_err(|e| {
            InstallError::Extraction(format!("failed to run {}: {}", self.executable.display(), e))
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|e| InstallError::Extraction(format!("7z did not finish: {}", e)))?,
            _ = cancel.cancelled() => {
                info!("Extraction of {} canceled", archive.display());
                return Err(InstallError::UserCanceled);
            }
        };

        Ok(ExtractionReport {
            code: output.status.code().unwrap_or(-1),
            errors: collect_diagnostics(&output.stdout, &output.stderr),
        })
    }
}

impl Default for SevenZipExtractor {
    fn default() -> Self {
        Self::new("7z")
    }
}

fn collect_diagnostics(stdout: &[u8], stderr: &[u8]) -> Vec<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    stdout
        .lines()
        .filter(|line| line.trim_start().starts_with("ERROR"))
        .chain(stderr.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn needs_password(report: &ExtractionReport) -> bool {
    report.code != 0
        && report.errors.iter().any(|e| {
            let lower = e.to_lowercase();
            lower.contains("wrong password") || lower.contains("encrypted")
        })
}

#[async_trait]
impl ArchiveExtractor for SevenZipExtractor {
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        passwords: &dyn PasswordProvider,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport> {
        debug!("Extracting {} to {}", archive.display(), destination.display());
        let mut password = String::new();
        loop {
            let report = self.run_once(archive, destination, &password, cancel).await?;
            if !needs_password(&report) {
                if report.code != 0 {
                    warn!(code = report.code, "7z reported errors for {}", archive.display());
                }
                return Ok(report);
            }
            // Fails with UserCanceled once the user gives up
            password = passwords.password().await?;
        }
    }
}
