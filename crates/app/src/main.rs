use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use sidekick::{Collaborators, FixtureThreadsApi, LoggingReadApi, Replay, SidebarHost};
use sidekick_panel::{ReaderIdentity, SettingsStore, SystemClock};

/// Replays a JSON-lines transcript against a headless sidebar and logs what it does.
#[derive(Debug, Parser)]
#[command(name = "sidekick-replay", version)]
struct Args {
    /// Transcript with one step per line.
    transcript: PathBuf,
    /// Settings file; defaults to the per-user config directory.
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long, default_value = "user")]
    user_id: String,
    #[arg(long, default_value = "team")]
    team_id: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let store = Arc::new(
        args.settings
            .map(SettingsStore::open)
            .unwrap_or_else(SettingsStore::open_default),
    );
    let settings = store.settings();
    tracing::info!(plugin_id = %settings.plugin_id, config = ?store.path(), "settings loaded");

    let threads = Arc::new(FixtureThreadsApi::default());
    let collaborators = Collaborators {
        threads: threads.clone(),
        reads: Arc::new(LoggingReadApi::default()),
        clock: Arc::new(SystemClock),
        runtime: Handle::current(),
    };
    let host = SidebarHost::from_store(
        store,
        collaborators,
        ReaderIdentity::new(args.user_id, args.team_id),
    );

    let mut replay = Replay::new(host, threads);
    if let Err(error) = replay.run_file(&args.transcript).await {
        tracing::error!(error = %error, "replay failed");
        return ExitCode::FAILURE;
    }

    tracing::info!(deliveries = replay.deliveries().len(), "replay finished");
    ExitCode::SUCCESS
}
