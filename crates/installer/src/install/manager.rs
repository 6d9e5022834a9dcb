//! Install orchestration
//!
//! [`InstallManager`] owns a single worker task that takes install requests
//! off a queue one at a time. Each request runs the full pipeline (game
//! resolution, extraction, installer selection, instruction application,
//! finalization) and ends in exactly one [`InstallResult`]. The staging
//! directory is removed before the result is delivered, whatever the result.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::collaborators::{
    ArchiveExtractor, DecisionProvider, DownloadProvider, GameCatalog, InputKind, MetadataLookup, ModMetadata,
    ModRecord, ModRule, ModState, NoMetadata, OfflineDownloads, PackageStore, PasswordProvider, Prompt, PromptKind,
};
use crate::install::archive::list_staged;
use crate::install::config::InstallConfig;
use crate::install::dependencies::{dependency_prompt, gather_dependencies, install_all};
use crate::install::error::{InstallError, Result};
use crate::install::executor::{InstallTarget, InstructionExecutor, SubmoduleRunner};
use crate::install::instructions::common_instruction_utils::{compute_file_checksum, remove_dir_if_exists};
use crate::install::instructions::{InstallOutcome, Instruction, SubmoduleInstruction};
use crate::install::mod_types::{ModType, ModTypeRegistry};
use crate::install::naming::{derive_install_id, NameResolver};
use crate::install::progress::{
    progress_callback_for, ErrorReport, InstallPhase, InstallReporter, Notification, NullReporter,
};
use crate::install::registry::{InstallerRegistry, ModInstaller};

/// One request to install an archive
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub archive_path: PathBuf,
    /// Download the archive came from, if any
    pub download_id: Option<String>,
    /// Game the download was made for
    pub download_game_id: Option<String>,
    pub process_dependencies: bool,
    pub enable: bool,
    pub cancellation: CancellationToken,
}

impl InstallRequest {
    pub fn new<P: Into<PathBuf>>(archive_path: P) -> Self {
        Self {
            archive_path: archive_path.into(),
            download_id: None,
            download_game_id: None,
            process_dependencies: false,
            enable: false,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_download<S: Into<String>>(mut self, download_id: S, game_id: Option<String>) -> Self {
        self.download_id = Some(download_id.into());
        self.download_game_id = game_id;
        self
    }

    pub fn for_game<S: Into<String>>(mut self, game_id: S) -> Self {
        self.download_game_id = Some(game_id.into());
        self
    }

    pub fn with_dependencies(mut self, process: bool) -> Self {
        self.process_dependencies = process;
        self
    }

    pub fn enabled(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Archive base name, used to label progress
    pub fn name(&self) -> String {
        self.archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Terminal state of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Succeeded { mod_id: String },
    Canceled { reason: String },
    Failed { cause: String, checksum: Option<String> },
}

impl InstallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallResult::Succeeded { .. })
    }

    pub fn mod_id(&self) -> Option<&str> {
        match self {
            InstallResult::Succeeded { mod_id } => Some(mod_id),
            _ => None,
        }
    }

    pub fn phase(&self) -> InstallPhase {
        match self {
            InstallResult::Succeeded { .. } => InstallPhase::Succeeded,
            InstallResult::Canceled { .. } => InstallPhase::Canceled,
            InstallResult::Failed { .. } => InstallPhase::Failed,
        }
    }
}

/// Everything the pipeline talks to. Registries are read-only once the
/// manager is running.
pub struct InstallServices {
    pub config: InstallConfig,
    pub installers: InstallerRegistry,
    pub mod_types: ModTypeRegistry,
    pub store: Arc<dyn PackageStore>,
    pub games: Arc<dyn GameCatalog>,
    pub decisions: Arc<dyn DecisionProvider>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub downloads: Arc<dyn DownloadProvider>,
    pub reporter: Arc<dyn InstallReporter>,
}

impl InstallServices {
    pub fn new(
        config: InstallConfig,
        store: Arc<dyn PackageStore>,
        games: Arc<dyn GameCatalog>,
        decisions: Arc<dyn DecisionProvider>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            config,
            installers: InstallerRegistry::new(),
            mod_types: ModTypeRegistry::new(),
            store,
            games,
            decisions,
            extractor,
            metadata: Arc::new(NoMetadata),
            downloads: Arc::new(OfflineDownloads),
            reporter: Arc::new(NullReporter),
        }
    }

    pub fn with_installer<I: ModInstaller + 'static>(mut self, priority: i32, installer: I) -> Self {
        self.installers.register(priority, Arc::new(installer));
        self
    }

    pub fn with_mod_type<T: ModType + 'static>(mut self, mod_type: T) -> Self {
        self.mod_types.register(Arc::new(mod_type));
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataLookup>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_downloads(mut self, downloads: Arc<dyn DownloadProvider>) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn InstallReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

struct Job {
    request: InstallRequest,
    reply: oneshot::Sender<InstallResult>,
}

struct Shared {
    services: InstallServices,
    dependency_tasks: TaskTracker,
    /// Held across close/wait/reopen of `dependency_tasks`
    dependency_wait: Mutex<()>,
}

/// Handle to the install queue. Cheap to clone; the worker stops once every
/// handle is gone.
#[derive(Clone)]
pub struct InstallManager {
    queue: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

impl InstallManager {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn new(services: InstallServices) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            services,
            dependency_tasks: TaskTracker::new(),
            dependency_wait: Mutex::new(()),
        });
        tokio::spawn(run_queue(Arc::clone(&shared), jobs, queue.downgrade()));
        Self { queue, shared }
    }

    pub fn services(&self) -> &InstallServices {
        &self.shared.services
    }

    /// Queue an install and wait for its terminal result. Requests start in
    /// the order they were queued.
    pub async fn install(&self, request: InstallRequest) -> InstallResult {
        let name = request.name();
        let (reply, result) = oneshot::channel();
        self.shared.services.reporter.on_phase(&name, InstallPhase::Queued);

        if self.queue.send(Job { request, reply }).is_err() {
            return InstallResult::Failed {
                cause: "install queue is shut down".to_string(),
                checksum: None,
            };
        }
        result.await.unwrap_or_else(|_| InstallResult::Failed {
            cause: "install worker stopped".to_string(),
            checksum: None,
        })
    }

    /// Install a finished download, as done for dependencies
    pub async fn install_download(&self, download_id: &str) -> Result<String> {
        let info = self
            .shared
            .services
            .downloads
            .download_info(download_id)
            .await
            .ok_or_else(|| InstallError::Download(format!("unknown download {}", download_id)))?;

        let request = InstallRequest::new(&info.path).with_download(download_id, info.game_id);
        match self.install(request).await {
            InstallResult::Succeeded { mod_id } => Ok(mod_id),
            InstallResult::Canceled { reason } => Err(InstallError::ProcessCanceled(reason)),
            InstallResult::Failed { cause, .. } => Err(InstallError::Installer {
                name: info.path.display().to_string(),
                message: cause,
            }),
        }
    }

    /// Wait until all background dependency installs have finished.
    /// Concurrent callers take turns.
    pub async fn wait_for_dependencies(&self) {
        let _turn = self.shared.dependency_wait.lock().await;
        let tracker = &self.shared.dependency_tasks;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }
}

async fn run_queue(
    shared: Arc<Shared>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    queue: mpsc::WeakUnboundedSender<Job>,
) {
    while let Some(job) = jobs.recv().await {
        let span = info_span!("install", archive = %job.request.archive_path.display());
        let result = shared.process(job.request, &queue).instrument(span).await;
        if job.reply.send(result).is_err() {
            debug!("install requester went away before the result arrived");
        }
    }
    debug!("install queue closed");
}

/// Per-request bookkeeping needed for cleanup
#[derive(Debug, Default)]
struct RequestState {
    game_id: Option<String>,
    mod_id: Option<String>,
    destination: Option<PathBuf>,
    staging: Option<PathBuf>,
    record_created: bool,
}

/// What a successful pipeline run hands to the post-success steps
struct Finalized {
    mod_id: String,
    game_id: String,
    rules: Vec<ModRule>,
}

impl Shared {
    async fn process(self: &Arc<Self>, request: InstallRequest, queue: &mpsc::WeakUnboundedSender<Job>) -> InstallResult {
        let name = request.name();
        let reporter = &self.services.reporter;
        let delay = self.services.config.busy_retry_delay;
        let mut state = RequestState::default();

        reporter.on_activity_started(&name, &format!("Installing {}", name));
        let outcome = self.run_pipeline(&request, &name, &mut state).await;

        if let Some(staging) = &state.staging {
            if let Err(e) = remove_dir_if_exists(staging, delay).await {
                warn!("failed to remove staging directory: {}", e);
            }
        }

        let result = match outcome {
            Ok(finalized) => {
                info!(mod_id = %finalized.mod_id, "install succeeded");
                if request.process_dependencies {
                    self.spawn_dependencies(&finalized, queue);
                }
                InstallResult::Succeeded { mod_id: finalized.mod_id }
            }
            Err(err) => {
                self.roll_back(&state).await;
                self.report_failure(&request, err).await
            }
        };

        reporter.on_activity_stopped(&name);
        reporter.on_phase(&name, result.phase());
        result
    }

    async fn run_pipeline(&self, request: &InstallRequest, name: &str, state: &mut RequestState) -> Result<Finalized> {
        let services = &self.services;
        let cancel = &request.cancellation;

        services.reporter.on_phase(name, InstallPhase::ResolvingGame);
        let game_id = self.resolve_game(request.download_game_id.as_deref()).await?;
        state.game_id = Some(game_id.clone());
        check_canceled(cancel)?;

        let metadata = match services.metadata.lookup(&request.archive_path, &game_id).await {
            Ok(mut found) if !found.is_empty() => Some(found.swap_remove(0)),
            Ok(_) => None,
            Err(e) => {
                warn!("metadata lookup failed, continuing without: {}", e);
                None
            }
        };

        let candidate = derive_install_id(&request.archive_path, metadata.as_ref());
        let file_id = metadata.as_ref().and_then(|m| m.file_id.as_deref());
        let resolution = NameResolver::new(services.store.as_ref(), services.decisions.as_ref(), &game_id)
            .resolve(candidate, file_id, request.enable)
            .await?;
        check_canceled(cancel)?;

        let mod_id = checked_mod_id(resolution.mod_id)?;
        let destination = services.config.install_path(&game_id).join(&mod_id);
        let staging = services.config.staging_path_for(&destination);
        state.mod_id = Some(mod_id.clone());
        state.destination = Some(destination.clone());
        state.staging = Some(staging.clone());

        services
            .store
            .add_mod(&game_id, ModRecord::new(&mod_id).with_archive_id(request.download_id.clone()))
            .await?;
        state.record_created = true;

        let pipeline = Pipeline {
            shared: self,
            game_id: &game_id,
            cancel,
        };
        let outcome = pipeline.install_inner(&request.archive_path, &staging, name, true).await?;
        services.store.set_install_path(&game_id, &mod_id, &destination).await?;
        let instructions = checked_instructions(outcome)?;

        let needs_type = services
            .store
            .get_mod(&game_id, &mod_id)
            .await
            .is_some_and(|record| record.mod_type.is_empty());
        if needs_type {
            let mod_type = services.mod_types.classify(&game_id, &instructions).await;
            services.store.set_mod_type(&game_id, &mod_id, &mod_type).await?;
        }

        services.reporter.on_phase(name, InstallPhase::ApplyingInstructions);
        let target = InstallTarget {
            game_id: &game_id,
            mod_id: &mod_id,
            archive_path: &request.archive_path,
            staging_path: &staging,
            destination_path: &destination,
        };
        InstructionExecutor::new(&services.config, services.store.as_ref(), services.reporter.as_ref())
            .apply(&target, &instructions, &pipeline)
            .await?;

        services.reporter.on_phase(name, InstallPhase::Finalizing);
        self.commit_record(&game_id, &mod_id, metadata.as_ref(), request.download_id.as_deref())
            .await?;
        if resolution.enable {
            self.enable(&game_id, &mod_id).await?;
        }

        Ok(Finalized {
            mod_id,
            game_id,
            rules: metadata.map(|m| m.rules).unwrap_or_default(),
        })
    }

    /// Decide which game the archive is installed for
    async fn resolve_game(&self, download_game: Option<&str>) -> Result<String> {
        let games = &self.services.games;
        let Some(active) = games.active_game() else {
            return download_game
                .map(str::to_string)
                .ok_or_else(|| InstallError::ProcessCanceled("You need to select a game before installing this mod".into()));
        };

        let download_game = match download_game {
            None => return Ok(active),
            Some(game) if game == active => return Ok(active),
            Some(game) => game,
        };

        if !games.is_discovered(download_game) {
            let install_here = format!("Install for \"{}\"", games.game_name(&active));
            let prompt = Prompt::question("Game not installed", "The game associated with this download is not discovered.")
                .with_choices(["Cancel".to_string(), install_here.clone()]);
            return match self.services.decisions.decide(prompt).await {
                Some(decision) if decision.choice == install_here => Ok(active),
                _ => Err(InstallError::UserCanceled),
            };
        }

        let active_name = games.game_name(&active);
        let download_name = games.game_name(download_game);
        let prompt = Prompt::question(
            "Download is for a different game",
            "This download is associated with a different game than the current. Which one do you want to install it for?",
        )
        .with_choices(["Cancel".to_string(), active_name.clone(), download_name.clone()]);

        match self.services.decisions.decide(prompt).await {
            Some(decision) if decision.choice == active_name => Ok(active),
            Some(decision) if decision.choice == download_name => Ok(download_game.to_string()),
            _ => Err(InstallError::UserCanceled),
        }
    }

    async fn commit_record(
        &self,
        game_id: &str,
        mod_id: &str,
        metadata: Option<&ModMetadata>,
        download_id: Option<&str>,
    ) -> Result<()> {
        let store = &self.services.store;
        let mut attributes: Vec<(&str, Option<&str>)> = vec![("downloadId", download_id)];
        if let Some(meta) = metadata {
            attributes.extend([
                ("fileId", meta.file_id.as_deref()),
                ("newestFileId", meta.file_id.as_deref()),
                ("logicalFileName", meta.logical_file_name.as_deref()),
                ("version", meta.file_version.as_deref()),
                ("source", meta.source_uri.as_deref()),
            ]);
        }
        for (key, value) in attributes {
            if let Some(value) = value {
                store.set_attribute(game_id, mod_id, key, Value::String(value.to_string())).await?;
            }
        }
        store.set_state(game_id, mod_id, ModState::Installed).await
    }

    async fn enable(&self, game_id: &str, mod_id: &str) -> Result<()> {
        let store = &self.services.store;
        match store.active_profile().await {
            Some(profile) if profile.game_id == game_id => store.set_enabled(&profile.id, mod_id, true).await,
            _ => {
                warn!("no active profile for {}, {} stays disabled", game_id, mod_id);
                Ok(())
            }
        }
    }

    /// Remove whatever a failed or canceled request left behind
    async fn roll_back(&self, state: &RequestState) {
        let delay = self.services.config.busy_retry_delay;
        if let (true, Some(game_id), Some(mod_id)) = (state.record_created, &state.game_id, &state.mod_id) {
            if let Err(e) = self.services.store.remove_mod(game_id, mod_id).await {
                warn!("failed to drop record of {}: {}", mod_id, e);
            }
        }
        if let Some(destination) = &state.destination {
            if let Err(e) = remove_dir_if_exists(destination, delay).await {
                warn!("failed to remove {}: {}", destination.display(), e);
            }
        }
    }

    async fn report_failure(&self, request: &InstallRequest, err: InstallError) -> InstallResult {
        let reporter = &self.services.reporter;
        let archive_name = request
            .archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if err.is_canceled() {
            info!("install canceled: {}", err);
            return InstallResult::Canceled { reason: err.to_string() };
        }

        error!(category = err.category(), "install failed: {}", err);
        match &err {
            // the installer's messages were shown already
            InstallError::InstallerFailed { .. } => InstallResult::Failed {
                cause: err.to_string(),
                checksum: None,
            },
            InstallError::ArchiveBroken { .. } => {
                reporter.on_error_report(&ErrorReport {
                    title: "Installation failed".to_string(),
                    message: format!(
                        "The archive {} is damaged and couldn't be installed. This is most likely fixed by re-downloading the file.",
                        archive_name
                    ),
                    checksum: None,
                    allow_report: false,
                });
                InstallResult::Failed {
                    cause: err.to_string(),
                    checksum: None,
                }
            }
            _ => {
                let checksum = compute_file_checksum(&request.archive_path).await.ok();
                let id = match &checksum {
                    Some(sum) => format!("{} (xxh64: {})", archive_name, sum),
                    None => archive_name,
                };
                reporter.on_error_report(&ErrorReport {
                    title: "Installation failed".to_string(),
                    message: format!("The installer \"{}\" failed: {}", id, err),
                    checksum: checksum.clone(),
                    allow_report: !err.is_permission_denied(),
                });
                InstallResult::Failed {
                    cause: err.to_string(),
                    checksum,
                }
            }
        }
    }

    fn spawn_dependencies(self: &Arc<Self>, finalized: &Finalized, queue: &mpsc::WeakUnboundedSender<Job>) {
        let shared = Arc::clone(self);
        let queue = queue.clone();
        let game_id = finalized.game_id.clone();
        let mod_id = finalized.mod_id.clone();
        let rules = finalized.rules.clone();
        let span = info_span!("dependencies", mod_id = %mod_id);

        self.dependency_tasks.spawn(
            async move {
                shared.install_dependencies(&game_id, &mod_id, &rules, queue).await;
            }
            .instrument(span),
        );
    }

    async fn install_dependencies(
        self: Arc<Self>,
        game_id: &str,
        mod_id: &str,
        rules: &[ModRule],
        queue: mpsc::WeakUnboundedSender<Job>,
    ) {
        let services = &self.services;
        let reporter = &services.reporter;
        let activity = format!("{}_dependencies", mod_id);

        reporter.on_activity_started(&activity, "Checking dependencies");
        let installed = services.store.mods(game_id).await;
        let dependencies =
            gather_dependencies(rules, &installed, services.metadata.as_ref(), services.downloads.as_ref()).await;
        reporter.on_activity_stopped(&activity);

        if dependencies.is_empty() {
            return;
        }

        let install = services
            .decisions
            .decide(dependency_prompt(&dependencies))
            .await
            .is_some_and(|d| d.choice == "Install");
        if !install {
            info!("{} dependencies of {} not installed", dependencies.len(), mod_id);
            return;
        }

        let Some(sender) = queue.upgrade() else {
            warn!("install queue closed before dependencies of {} could be installed", mod_id);
            return;
        };
        let manager = InstallManager {
            queue: sender,
            shared: Arc::clone(&self),
        };

        let results = install_all(&dependencies, services.downloads.as_ref(), |download_id| {
            let manager = manager.clone();
            async move { manager.install_download(&download_id).await }
        })
        .await;

        for (dependency, result) in dependencies.iter().zip(results) {
            match result {
                Ok(installed_id) => info!("installed dependency {} as {}", dependency.reference, installed_id),
                Err(e) => reporter.on_notification(&Notification::error(
                    "Failed to install dependency",
                    format!("{}: {}", dependency.reference, e),
                )),
            }
        }
    }
}

fn check_canceled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(InstallError::UserCanceled)
    } else {
        Ok(())
    }
}

/// The id is joined onto the game's install path, anything but a single
/// plain component would point elsewhere
fn checked_mod_id(mod_id: String) -> Result<String> {
    let mut components = Path::new(&mod_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(mod_id),
        _ => Err(InstallError::InvalidModId(mod_id)),
    }
}

/// `None` means the installer reported the problem itself
fn checked_instructions(outcome: InstallOutcome) -> Result<Vec<Instruction>> {
    match outcome.instructions {
        None => Err(InstallError::ProcessCanceled("the installer reported the problem itself".into())),
        Some(instructions) if instructions.is_empty() => Err(InstallError::EmptyInstructions),
        Some(instructions) => Ok(instructions),
    }
}

/// Extraction and installer steps shared by top-level installs and submodules
struct Pipeline<'a> {
    shared: &'a Shared,
    game_id: &'a str,
    cancel: &'a CancellationToken,
}

impl Pipeline<'_> {
    async fn install_inner(&self, archive: &Path, staging: &Path, name: &str, top_level: bool) -> Result<InstallOutcome> {
        let services = &self.shared.services;
        let phase = |phase| {
            if top_level {
                services.reporter.on_phase(name, phase);
            }
        };

        phase(InstallPhase::Extracting);
        self.extract(archive, staging).await?;
        check_canceled(self.cancel)?;

        phase(InstallPhase::SelectingInstaller);
        let files = list_staged(staging).await?;
        let selected = services
            .installers
            .select(&files, self.game_id)
            .await?
            .ok_or(InstallError::NoSupportingInstaller)?;
        debug!(installer = selected.installer.name(), required = ?selected.required_files, "selected installer");

        phase(InstallPhase::Installing);
        let progress = progress_callback_for(Arc::clone(&services.reporter), name);
        selected.installer.install(&files, staging, self.game_id, progress).await
    }

    /// Extract, asking the user whether to go on when the archive has
    /// errors that are not known to be fatal
    async fn extract(&self, archive: &Path, staging: &Path) -> Result<()> {
        let errors = match self.run_extractor(archive, staging).await {
            Err(InstallError::RecoverableExtraction { code, errors, .. }) => {
                warn!(code, ?errors, "extraction finished with errors");
                errors
            }
            other => return other,
        };

        let listing: Vec<String> = errors.iter().map(|e| format!("- {}", e)).collect();
        let prompt = Prompt::new(
            PromptKind::Error,
            "Archive damaged",
            format!(
                "Encountered errors extracting this archive. Please verify this file was downloaded correctly.\n{}",
                listing.join("\n")
            ),
        )
        .with_choices(["Cancel", "Continue"]);

        match self.shared.services.decisions.decide(prompt).await {
            Some(decision) if decision.choice == "Continue" => Ok(()),
            _ => Err(InstallError::UserCanceled),
        }
    }

    async fn run_extractor(&self, archive: &Path, staging: &Path) -> Result<()> {
        let services = &self.shared.services;
        let passwords = PromptPassword {
            decisions: services.decisions.as_ref(),
        };
        let broken = || InstallError::ArchiveBroken {
            archive: archive.to_path_buf(),
        };

        let report = match services.extractor.extract(archive, staging, &passwords, self.cancel).await {
            Ok(report) => report,
            Err(InstallError::Extraction(message)) if services.config.is_critical_extraction_error(&message) => {
                return Err(broken());
            }
            Err(e) => return Err(e),
        };
        if report.code == 0 {
            return Ok(());
        }
        if report.errors.iter().any(|e| services.config.is_critical_extraction_error(e)) {
            return Err(broken());
        }
        Err(InstallError::RecoverableExtraction {
            archive: archive.to_path_buf(),
            code: report.code,
            errors: report.errors,
        })
    }
}

#[async_trait]
impl SubmoduleRunner for Pipeline<'_> {
    async fn run_submodule(&self, parent: &InstallTarget<'_>, submodule: &SubmoduleInstruction) -> Result<()> {
        let services = &self.shared.services;
        let staging = services
            .config
            .submodule_staging_path(parent.destination_path, &submodule.key);

        let result = async {
            let outcome = self.install_inner(&submodule.path, &staging, &submodule.key, false).await?;
            let instructions = checked_instructions(outcome)?;
            let target = InstallTarget {
                game_id: parent.game_id,
                mod_id: parent.mod_id,
                archive_path: &submodule.path,
                staging_path: &staging,
                destination_path: parent.destination_path,
            };
            InstructionExecutor::new(&services.config, services.store.as_ref(), services.reporter.as_ref())
                .apply(&target, &instructions, self)
                .await?;
            if let Some(submodule_type) = &submodule.submodule_type {
                services
                    .store
                    .set_mod_type(parent.game_id, parent.mod_id, submodule_type)
                    .await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = remove_dir_if_exists(&staging, services.config.busy_retry_delay).await {
            warn!("failed to remove submodule staging directory: {}", e);
        }
        result
    }
}

/// Asks the user for an archive password
struct PromptPassword<'a> {
    decisions: &'a dyn DecisionProvider,
}

#[async_trait]
impl PasswordProvider for PromptPassword<'_> {
    async fn password(&self) -> Result<String> {
        let prompt = Prompt::new(PromptKind::Info, "Password Protected", "")
            .with_input("password", "A password is required to extract this archive", "", InputKind::Password)
            .with_choices(["Cancel", "Continue"]);
        match self.decisions.decide(prompt).await {
            Some(decision) if decision.choice == "Continue" => {
                Ok(decision.input("password").unwrap_or_default().to_string())
            }
            _ => Err(InstallError::UserCanceled),
        }
    }
}
