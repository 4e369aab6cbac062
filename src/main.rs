// draftdeck entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (created from defaults on first run)
// 3. Open the saved-rankings database
// 4. Build the catalog client and draft feed
// 5. Create mpsc channels
// 6. Kick off the initial catalog fetch (failure is non-fatal)
// 7. Spawn the app logic task
// 8. Wait for Ctrl+C, then shut down

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use draftdeck::app::{self, UiUpdate, UserCommand};
use draftdeck::catalog::CatalogClient;
use draftdeck::config;
use draftdeck::db::Database;
use draftdeck::sync::feed::{DraftFeed, HttpDraftFeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file)
    init_tracing()?;
    info!("draftdeck starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: catalog={}, feed={}",
        config.catalog_url, config.feed_api_url
    );

    // 3. Open database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Catalog client and draft feed share one HTTP client
    let http = reqwest::Client::builder()
        .user_agent(concat!("draftdeck/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let catalog = CatalogClient::new(http.clone(), &config.catalog_url);
    let feed: Arc<dyn DraftFeed> = Arc::new(HttpDraftFeed::new(
        http,
        &config.feed_api_url,
        &config.feed_ws_url,
    ));

    // 5. Create mpsc channels
    let (events_tx, feed_rx) = mpsc::channel(256);
    let (catalog_tx, catalog_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    let state = app::AppState::new(config, db, catalog, feed, events_tx, catalog_tx);

    // 6. Initial catalog fetch. A failure surfaces as an Error update and
    // leaves the board empty until a manual refresh succeeds.
    state.spawn_catalog_fetch();

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(feed_rx, catalog_rx, cmd_rx, ui_tx, state).await {
            error!("Application loop error: {e}");
        }
    });

    // Drain UI updates into the log until a frontend consumes them.
    let ui_handle = tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            match update {
                UiUpdate::Board(board) => info!("Board updated: {} players in view", board.len()),
                UiUpdate::SyncStatus(phase) => info!("Sync status: {phase:?}"),
                UiUpdate::Rankings(entries) => info!("{} saved ranking(s)", entries.len()),
                UiUpdate::RankingSaved { name, outcome } => {
                    info!("Save {name:?}: {outcome:?}")
                }
                UiUpdate::ExportReady(json) => info!("Export ready ({} bytes)", json.len()),
                UiUpdate::Notice(msg) => info!("{msg}"),
                UiUpdate::Error(msg) => warn!("{msg}"),
            }
        }
    });

    // 8. Wait for Ctrl+C
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = cmd_tx.send(UserCommand::Quit).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;
    ui_handle.abort();

    info!("draftdeck shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout free for a
/// frontend.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftdeck.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draftdeck=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
