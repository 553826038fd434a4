//! chs-ingest - Chess game archive ingest
//!
//! Pulls a player's monthly PGN archives, replays each game into moves and
//! positions, stores them in SQLite and records one catalog version per month.
//!
//! ```text
//! chs-ingest --subject hikaru --month 2024-01 --month 2024-02
//! chs-ingest --subject hikaru --from 2023-06 --to 2023-12
//! ```

use anyhow::{bail, Context, Result};
use chs_common::config::{self, TomlConfig};
use chs_common::events::{EventBus, IngestEvent, RunStatus};
use chs_ingest::models::YearMonth;
use chs_ingest::services::{ChessComClient, Collaborators, FsArtifactSink, IngestOrchestrator};
use chs_ingest::SqliteStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "chs-ingest", version, about = "Ingest monthly chess game archives")]
struct Args {
    /// Archive user name
    #[arg(long, env = "CHS_INGEST_SUBJECT")]
    subject: String,

    /// Month to ingest (YYYY-MM); repeatable
    #[arg(long = "month", value_name = "YYYY-MM", conflicts_with_all = ["from", "to"])]
    months: Vec<YearMonth>,

    /// First archived month to ingest (inclusive)
    #[arg(long, value_name = "YYYY-MM")]
    from: Option<YearMonth>,

    /// Last archived month to ingest (inclusive)
    #[arg(long, value_name = "YYYY-MM")]
    to: Option<YearMonth>,

    /// Folder holding the database and artifacts
    #[arg(long, env = "CHS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "CHS_INGEST_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let mut toml_config = match &config_path {
        Some(path) => config::load_toml_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config.logging.level);

    info!("Starting chs-ingest v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    toml_config.ingest.apply_env_overrides();
    toml_config
        .ingest
        .validate()
        .context("Invalid ingest settings")?;
    let settings = &toml_config.ingest;

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let store = SqliteStore::open(&db_path)
        .await
        .context("Failed to open database")?;

    let artifacts = Arc::new(FsArtifactSink::new(config::artifact_dir(&root_folder)));
    let client = ChessComClient::from_settings(settings).context("Failed to build HTTP client")?;
    info!(
        "Archive: {} (min interval {:?} per subject)",
        settings.base_url,
        client.throttle().min_interval()
    );

    let event_bus = EventBus::new(100);
    spawn_progress_logger(&event_bus);

    let deps = Collaborators::with_store(Arc::new(client), store, artifacts);
    let orchestrator = IngestOrchestrator::from_settings(deps, settings, event_bus);

    let run_id = if args.months.is_empty() {
        orchestrator
            .start_run_range(&args.subject, args.from, args.to)
            .await
            .context("Failed to start ingest run")?
    } else {
        orchestrator
            .start_run(&args.subject, args.months.clone())
            .await
            .context("Failed to start ingest run")?
    };

    let run = orchestrator
        .wait_for_run(run_id)
        .await
        .context("Failed to load run state")?
        .with_context(|| format!("Run {} disappeared from the database", run_id))?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    if run.status != RunStatus::Succeeded {
        bail!(
            "Ingest run {} failed: {}",
            run.id,
            run.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level for this workspace's crates
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chs_ingest={0},chs_common={0}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn spawn_progress_logger(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(IngestEvent::MonthIngested {
                    month,
                    games_added,
                    games_skipped,
                    ..
                }) => info!(%month, games_added, games_skipped, "Progress"),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Progress logger lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
