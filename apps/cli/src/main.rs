//! modinstall - install mod archives from the command line
//!
//! Usage:
//!   modinstall install <ARCHIVE> --game <ID>   Install an archive
//!   modinstall list --game <ID>                List installed packages

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use mod_installer::collaborators::{
    Decision, DecisionProvider, InputKind, JsonMetadata, JsonPackageStore, MetadataLookup, NoMetadata, PackageStore,
    Prompt, SevenZipExtractor, StaticGameCatalog,
};
use mod_installer::downloader::{DownloadConfig, HttpDownloader};
use mod_installer::installers::{FallbackInstaller, ManifestInstaller, FALLBACK_PRIORITY, MANIFEST_PRIORITY};
use mod_installer::{InstallConfig, InstallManager, InstallRequest, InstallResult, InstallServices, TracingReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, warn, Level};

#[derive(Parser)]
#[command(name = "modinstall")]
#[command(about = "Install mod archives into a managed directory tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory packages are installed into, one sub-directory per game
    #[arg(short, long, global = true, env = "MODINSTALL_ROOT", default_value = "./mods")]
    root: PathBuf,

    /// Package state file (defaults to <root>/state.json)
    #[arg(short, long, global = true, env = "MODINSTALL_STORE")]
    store: Option<PathBuf>,

    /// More output, repeat for debug logs
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Install an archive
    Install(InstallArgs),

    /// List installed packages
    List {
        /// Game to list packages of
        #[arg(short, long)]
        game: String,
    },
}

#[derive(Args)]
struct InstallArgs {
    /// Archive to install
    archive: PathBuf,

    /// Game to install for
    #[arg(short, long)]
    game: String,

    /// Enable the package in the game's profile
    #[arg(long)]
    enable: bool,

    /// Also install dependencies declared in the metadata file
    #[arg(short = 'd', long = "deps")]
    with_deps: bool,

    /// JSON metadata file keyed by archive file name
    #[arg(short, long, env = "MODINSTALL_METADATA")]
    metadata: Option<PathBuf>,

    /// Answer every question with the affirmative choice
    #[arg(short, long)]
    yes: bool,

    /// 7-Zip executable
    #[arg(long, env = "MODINSTALL_SEVEN_ZIP")]
    seven_zip: Option<PathBuf>,
}

/// Asks on the terminal; with `assume_yes` the last choice is taken
struct ConsoleDecisions {
    assume_yes: bool,
    stdin: Mutex<BufReader<Stdin>>,
}

impl ConsoleDecisions {
    fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn ask(&self, question: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;

        let mut line = String::new();
        match self.stdin.lock().await.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

#[async_trait]
impl DecisionProvider for ConsoleDecisions {
    async fn decide(&self, prompt: Prompt) -> Option<Decision> {
        println!("\n== {} ==", prompt.title);
        if !prompt.message.is_empty() {
            println!("{}", prompt.message);
        }

        if self.assume_yes {
            let choice = prompt.choices.last()?;
            println!("-> {}", choice);
            let decision = prompt
                .inputs
                .iter()
                .fold(Decision::new(choice.clone()), |d, input| d.with_input(&input.id, &input.value));
            return Some(decision);
        }

        let mut decision = Decision::default();
        for input in &prompt.inputs {
            let shown = match input.kind {
                InputKind::Password => String::new(),
                InputKind::Text => format!(" [{}]", input.value),
            };
            let answer = self.ask(&format!("{}{}: ", input.label, shown)).await?;
            let value = if answer.is_empty() { input.value.clone() } else { answer };
            decision = decision.with_input(&input.id, value);
        }

        for (i, choice) in prompt.choices.iter().enumerate() {
            println!("  {}) {}", i + 1, choice);
        }
        loop {
            let answer = self.ask("> ").await?;
            match answer.parse::<usize>().ok().and_then(|i| prompt.choices.get(i.wrapping_sub(1))) {
                Some(choice) => {
                    decision.choice = choice.clone();
                    return Some(decision);
                }
                None => println!("Pick a number between 1 and {}", prompt.choices.len()),
            }
        }
    }
}

async fn open_store(store: Option<PathBuf>, root: &Path) -> Result<JsonPackageStore> {
    let path = store.unwrap_or_else(|| root.join("state.json"));
    debug!("using package state {}", path.display());
    JsonPackageStore::open(&path)
        .await
        .with_context(|| format!("Failed to open package state: {}", path.display()))
}

async fn install(root: PathBuf, store: Option<PathBuf>, args: InstallArgs) -> Result<()> {
    let InstallArgs {
        archive,
        game,
        enable,
        with_deps,
        metadata,
        yes,
        seven_zip,
    } = args;

    let mut config = InstallConfig::from_env();
    config.install_root = root.clone();
    if let Some(seven_zip) = seven_zip {
        config = config.with_seven_zip(seven_zip);
    }

    let store = open_store(store, &root).await?;
    store.activate_profile(&game, &game).await?;

    let metadata: Arc<dyn MetadataLookup> = match metadata {
        Some(path) => Arc::new(
            JsonMetadata::open(&path)
                .await
                .with_context(|| format!("Failed to read metadata: {}", path.display()))?,
        ),
        None => {
            if with_deps {
                warn!("--deps without --metadata: no dependency rules are known");
            }
            Arc::new(NoMetadata)
        }
    };

    let downloader = HttpDownloader::new(DownloadConfig::new(root.join("downloads")))?.with_game(&game);
    let games = StaticGameCatalog::new().with_game(&game, &game).with_active(&game);
    let extractor = SevenZipExtractor::new(config.seven_zip_path.clone());

    let services = InstallServices::new(
        config,
        Arc::new(store),
        Arc::new(games),
        Arc::new(ConsoleDecisions::new(yes)),
        Arc::new(extractor),
    )
    .with_installer(MANIFEST_PRIORITY, ManifestInstaller)
    .with_installer(FALLBACK_PRIORITY, FallbackInstaller)
    .with_metadata(metadata)
    .with_downloads(Arc::new(downloader))
    .with_reporter(Arc::new(TracingReporter));

    let manager = InstallManager::new(services);
    let request = InstallRequest::new(&archive)
        .for_game(&game)
        .enabled(enable)
        .with_dependencies(with_deps);

    let result = manager.install(request).await;
    manager.wait_for_dependencies().await;

    match result {
        InstallResult::Succeeded { mod_id } => {
            println!("Installed {} as {}", archive.display(), mod_id);
            Ok(())
        }
        InstallResult::Canceled { reason } => {
            println!("Installation canceled: {}", reason);
            Ok(())
        }
        InstallResult::Failed { cause, checksum } => match checksum {
            Some(checksum) => anyhow::bail!("Installation failed: {} (xxh64 {})", cause, checksum),
            None => anyhow::bail!("Installation failed: {}", cause),
        },
    }
}

async fn list(root: PathBuf, store: Option<PathBuf>, game: String) -> Result<()> {
    let store = open_store(store, &root).await?;
    let profile = store.active_profile().await.filter(|p| p.game_id == game);

    let mods = store.mods(&game).await;
    if mods.is_empty() {
        println!("No packages installed for {}", game);
        return Ok(());
    }
    for record in mods {
        let enabled = match &profile {
            Some(profile) if store.is_enabled(&profile.id, &record.id).await => "enabled",
            _ => "disabled",
        };
        let mod_type = if record.mod_type.is_empty() { "default" } else { record.mod_type.as_str() };
        println!("{:<40} {:<10} {:<10} {:?}", record.id, mod_type, enabled, record.state);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Install(args) => install(cli.root, cli.store, args).await,
        Commands::List { game } => list(cli.root, cli.store, game).await,
    }
}
