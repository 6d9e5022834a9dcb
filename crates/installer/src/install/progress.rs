//! Progress tracking and user-facing reporting for install operations

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Progress callback handed to installers, receives a percentage
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// States an install request moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallPhase {
    Queued,
    ResolvingGame,
    Extracting,
    SelectingInstaller,
    Installing,
    ApplyingInstructions,
    Finalizing,
    Succeeded,
    Canceled,
    Failed,
}

impl InstallPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallPhase::Succeeded | InstallPhase::Canceled | InstallPhase::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// Dismissible, non-fatal message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info<T: Into<String>, M: Into<String>>(title: T, message: M) -> Self {
        Self { kind: NotificationKind::Info, title: title.into(), message: message.into() }
    }

    pub fn warning<T: Into<String>, M: Into<String>>(title: T, message: M) -> Self {
        Self { kind: NotificationKind::Warning, title: title.into(), message: message.into() }
    }

    pub fn error<T: Into<String>, M: Into<String>>(title: T, message: M) -> Self {
        Self { kind: NotificationKind::Error, title: title.into(), message: message.into() }
    }
}

/// Report for a fatal install failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
    /// xxHash64 of the archive, for correlating reports
    pub checksum: Option<String>,
    /// Whether offering to send a bug report makes sense
    pub allow_report: bool,
}

/// Receives everything the install pipeline wants the user to see
pub trait InstallReporter: Send + Sync {
    fn on_phase(&self, _name: &str, _phase: InstallPhase) {}
    fn on_progress(&self, _name: &str, _percent: f64) {}
    fn on_activity_started(&self, _id: &str, _message: &str) {}
    fn on_activity_stopped(&self, _id: &str) {}
    fn on_notification(&self, _notification: &Notification) {}
    fn on_error_report(&self, _report: &ErrorReport) {}
}

/// Reporter that drops everything
#[derive(Debug, Default)]
pub struct NullReporter;

impl InstallReporter for NullReporter {}

/// Reporter that forwards to `tracing`
#[derive(Debug, Default)]
pub struct TracingReporter;

impl InstallReporter for TracingReporter {
    fn on_phase(&self, name: &str, phase: InstallPhase) {
        if phase.is_terminal() {
            info!(name, ?phase, "install finished");
        } else {
            debug!(name, ?phase, "install phase");
        }
    }

    fn on_activity_started(&self, id: &str, message: &str) {
        info!(id, "{}", message);
    }

    fn on_notification(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Info => info!("{}: {}", notification.title, notification.message),
            NotificationKind::Warning => warn!("{}: {}", notification.title, notification.message),
            NotificationKind::Error => error!("{}: {}", notification.title, notification.message),
        }
    }

    fn on_error_report(&self, report: &ErrorReport) {
        error!(checksum = ?report.checksum, "{}: {}", report.title, report.message);
    }
}

/// Convert a reporter into the progress callback installers receive
pub fn progress_callback_for(reporter: Arc<dyn InstallReporter>, name: &str) -> ProgressCallback {
    let name = name.to_string();
    Arc::new(move |percent| reporter.on_progress(&name, percent))
}
