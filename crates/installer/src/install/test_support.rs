//! Test doubles for the install collaborators

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{
    ArchiveExtractor, Decision, DecisionProvider, ExtractionReport, PasswordProvider, Prompt,
};
use crate::install::error::{InstallError, Result};
use crate::install::progress::{ErrorReport, InstallPhase, InstallReporter, Notification};

/// Answers prompts from a script, in order; dismisses once the script runs out
#[derive(Default)]
pub struct ScriptedDecisions {
    answers: Mutex<VecDeque<Option<Decision>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, decision: Decision) -> Self {
        self.answers.lock().unwrap().push_back(Some(decision));
        self
    }

    pub fn choose(self, choice: &str) -> Self {
        self.answer(Decision::new(choice))
    }

    pub fn dismiss(self) -> Self {
        self.answers.lock().unwrap().push_back(None);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.prompts().into_iter().map(|p| p.title).collect()
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisions {
    async fn decide(&self, prompt: Prompt) -> Option<Decision> {
        self.prompts.lock().unwrap().push(prompt);
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

/// Keeps everything reported, for assertions
#[derive(Default)]
pub struct RecordingReporter {
    pub phases: Mutex<Vec<(String, InstallPhase)>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub errors: Mutex<Vec<ErrorReport>>,
    pub activities: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn phases_of(&self, name: &str) -> Vec<InstallPhase> {
        self.phases
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl InstallReporter for RecordingReporter {
    fn on_phase(&self, name: &str, phase: InstallPhase) {
        self.phases.lock().unwrap().push((name.to_string(), phase));
    }

    fn on_activity_started(&self, _id: &str, message: &str) {
        self.activities.lock().unwrap().push(message.to_string());
    }

    fn on_notification(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }

    fn on_error_report(&self, report: &ErrorReport) {
        self.errors.lock().unwrap().push(report.clone());
    }
}

/// "Extracts" an archive that is really a directory by copying its tree.
/// A regular file is treated as a damaged archive with the given report.
#[derive(Default)]
pub struct DirectoryExtractor {
    pub file_report: Option<ExtractionReport>,
    /// Ask for a password first and refuse anything else
    pub password: Option<String>,
    supplied: Mutex<Vec<String>>,
}

impl DirectoryExtractor {
    pub fn failing_with(code: i32, errors: &[&str]) -> Self {
        Self {
            file_report: Some(ExtractionReport {
                code,
                errors: errors.iter().map(|e| e.to_string()).collect(),
            }),
            ..Self::default()
        }
    }

    pub fn protected(password: &str) -> Self {
        Self {
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    /// Passwords handed over by the provider, in order
    pub fn supplied_passwords(&self) -> Vec<String> {
        self.supplied.lock().unwrap().clone()
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl ArchiveExtractor for DirectoryExtractor {
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        passwords: &dyn PasswordProvider,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport> {
        if cancel.is_cancelled() {
            return Err(InstallError::UserCanceled);
        }
        if let Some(expected) = &self.password {
            let given = passwords.password().await?;
            self.supplied.lock().unwrap().push(given.clone());
            if &given != expected {
                return Err(InstallError::Extraction("Wrong password".into()));
            }
        }
        if archive.is_dir() {
            copy_tree(archive, destination)
                .map_err(|e| InstallError::Extraction(e.to_string()))?;
            return Ok(ExtractionReport::default());
        }
        std::fs::create_dir_all(destination).map_err(|e| InstallError::Extraction(e.to_string()))?;
        Ok(self.file_report.clone().unwrap_or(ExtractionReport {
            code: 2,
            errors: vec!["Can not open the file as archive".into()],
        }))
    }
}

/// Write a fake archive (a directory) containing the given files
pub fn make_archive(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let archive = root.join(name);
    for (path, content) in files {
        let file = archive.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
    }
    archive
}
