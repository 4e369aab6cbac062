// Application state and orchestration logic.
//
// The central event loop that coordinates draft-feed events, catalog
// fetch results, and user commands. Owns the roster store and the sync
// state machine, and pushes view updates to the presentation layer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::board::player::{Player, PlayerId, PositionFilter, Tag};
use crate::board::project::project;
use crate::board::store::{RosterStore, StoreOutcome};
use crate::catalog::{normalize, CatalogClient, CatalogError};
use crate::config::Config;
use crate::db::{Database, RankingEntry, SaveOutcome};
use crate::export::{export_board, import_board};
use crate::sync::feed::{DraftFeed, FeedEvent};
use crate::sync::{SyncManager, SyncPhase};

// ---------------------------------------------------------------------------
// Command and update types
// ---------------------------------------------------------------------------

/// Commands from the presentation layer.
#[derive(Debug, Clone)]
pub enum UserCommand {
    SetSearch(String),
    SetPositionFilter(PositionFilter),
    ToggleTag { id: PlayerId, tag: Tag },
    ToggleDrafted(PlayerId),
    Reorder { dragged: PlayerId, target: PlayerId },
    StartSync(String),
    PauseSync,
    ResumeSync,
    StopSync,
    RefreshCatalog,
    SaveRanking { name: String, overwrite: bool },
    LoadRanking(String),
    DeleteRanking(String),
    ListRankings,
    ExportBoard,
    ImportBoard(String),
    Quit,
}

/// Updates pushed to the presentation layer.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// The projected board view (search + position filter applied,
    /// undrafted first in rank order, drafted trailing).
    Board(Vec<Player>),
    SyncStatus(SyncPhase),
    Rankings(Vec<RankingEntry>),
    RankingSaved { name: String, outcome: SaveOutcome },
    ExportReady(String),
    Notice(String),
    Error(String),
}

/// Result of a background catalog fetch-and-normalize.
pub type CatalogResult = Result<Vec<Player>, CatalogError>;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub store: RosterStore,
    pub sync: SyncManager,
    pub db: Database,
    pub search_term: String,
    pub position_filter: PositionFilter,
    /// Catalog client for bulk player fetches. Wrapped in Arc for
    /// sharing with spawned fetch tasks.
    pub catalog: Arc<CatalogClient>,
    /// Draft-room feed shared with the sync transport tasks.
    pub feed: Arc<dyn DraftFeed>,
    /// Sender for catalog fetch results; spawned tasks use a clone of
    /// this sender to hand results back to the main event loop.
    pub catalog_tx: mpsc::Sender<CatalogResult>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        catalog: CatalogClient,
        feed: Arc<dyn DraftFeed>,
        events_tx: mpsc::Sender<FeedEvent>,
        catalog_tx: mpsc::Sender<CatalogResult>,
    ) -> Self {
        AppState {
            config,
            store: RosterStore::new(),
            sync: SyncManager::new(events_tx),
            db,
            search_term: String::new(),
            position_filter: PositionFilter::All,
            catalog: Arc::new(catalog),
            feed,
            catalog_tx,
        }
    }

    /// Project the current roster through the active search term and
    /// position filter into an owned view snapshot.
    pub fn view(&self) -> Vec<Player> {
        let roster = self.store.snapshot();
        project(&roster, &self.search_term, self.position_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Spawn a background catalog fetch. The result lands on the main
    /// loop through `catalog_tx`; the roster is never touched from the
    /// fetch task itself.
    pub fn spawn_catalog_fetch(&self) {
        let catalog = self.catalog.clone();
        let tx = self.catalog_tx.clone();
        tokio::spawn(async move {
            let result = match catalog.fetch_catalog().await {
                Ok(records) => normalize(records),
                Err(e) => Err(e),
            };
            let _ = tx.send(result).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on three channels using `tokio::select!`:
/// 1. Draft-feed events from the sync transport
/// 2. Catalog fetch results
/// 3. User commands from the presentation layer
///
/// A poll timer fires while a sync is active to reconcile against the
/// pick snapshot endpoint in case push frames were missed.
pub async fn run(
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    mut catalog_rx: mpsc::Receiver<CatalogResult>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut poll_interval = tokio::time::interval(state.config.poll_interval);
    // The first tick completes immediately; consume it so the first
    // real poll happens after one full interval.
    poll_interval.tick().await;

    loop {
        tokio::select! {
            // --- Draft feed events ---
            feed_event = feed_rx.recv() => {
                match feed_event {
                    Some(event) => {
                        handle_feed_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Feed channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Catalog fetch results ---
            catalog_result = catalog_rx.recv() => {
                match catalog_result {
                    Some(result) => {
                        handle_catalog_result(&mut state, result, &ui_tx).await;
                    }
                    None => {
                        info!("Catalog channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Poll reconciliation (only while the sync is live) ---
            _ = poll_interval.tick(), if state.sync.phase().is_active() => {
                state.sync.poll(state.feed.clone());
            }
        }
    }

    state.sync.stop();
    info!("Application event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

/// Feed an event through the sync state machine and apply any picks it
/// releases to the roster store.
async fn handle_feed_event(state: &mut AppState, event: FeedEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    let phase_before = state.sync.phase().clone();

    if let Some(picks) = state.sync.on_event(event) {
        let drafted = state.store.apply_external_pick_set(&picks);
        if drafted > 0 {
            info!("Applied {drafted} external pick(s)");
            let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
        }
    }

    if *state.sync.phase() != phase_before {
        let _ = ui_tx
            .send(UiUpdate::SyncStatus(state.sync.phase().clone()))
            .await;
    }
}

/// Merge (or initially populate) the roster from a finished catalog
/// fetch. A failed fetch leaves the roster untouched.
async fn handle_catalog_result(
    state: &mut AppState,
    result: CatalogResult,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match result {
        Ok(players) => {
            if state.store.is_empty() {
                match state.store.replace_all(players) {
                    Ok(()) => {
                        info!("Catalog loaded: {} players", state.store.len());
                        let _ = ui_tx
                            .send(UiUpdate::Notice(format!(
                                "Loaded {} players",
                                state.store.len()
                            )))
                            .await;
                    }
                    Err(e) => {
                        warn!("Rejected catalog load: {e}");
                        let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                        return;
                    }
                }
            } else {
                let summary = state.store.merge_catalog_refresh(players);
                info!(
                    "Catalog refresh merged: {} updated, {} added, {} removed",
                    summary.updated, summary.added, summary.removed
                );
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!(
                        "Catalog refreshed: {} added, {} removed",
                        summary.added, summary.removed
                    )))
                    .await;
            }
            let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
        }
        Err(e) => {
            warn!("Catalog fetch failed: {e}");
            let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
        }
    }
}

/// Handle a user command (everything except Quit, which the loop
/// consumes directly).
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SetSearch(term) => {
            state.search_term = term;
            let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
        }
        UserCommand::SetPositionFilter(filter) => {
            state.position_filter = filter;
            let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
        }
        UserCommand::ToggleTag { id, tag } => {
            match state.store.toggle_tag(&id, tag) {
                StoreOutcome::Committed | StoreOutcome::NoOp => {
                    let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
                }
                StoreOutcome::NotFound => {
                    let _ = ui_tx
                        .send(UiUpdate::Error(format!("no player with id {id}")))
                        .await;
                }
            }
        }
        UserCommand::ToggleDrafted(id) => match state.store.toggle_drafted(&id) {
            StoreOutcome::Committed | StoreOutcome::NoOp => {
                let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
            }
            StoreOutcome::NotFound => {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!("no player with id {id}")))
                    .await;
            }
        },
        UserCommand::Reorder { dragged, target } => {
            match state.store.apply_reorder(&dragged, &target) {
                StoreOutcome::Committed => {
                    let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
                }
                // Dropping onto itself or onto a drafted row changes nothing;
                // no update needed.
                StoreOutcome::NoOp => {}
                StoreOutcome::NotFound => {
                    let _ = ui_tx
                        .send(UiUpdate::Error("reorder references an unknown player".into()))
                        .await;
                }
            }
        }
        UserCommand::StartSync(input) => {
            // A failed parse already moved the phase to Error; the status
            // push below carries the message either way.
            let _ = state.sync.start(&input, state.feed.clone());
            let _ = ui_tx
                .send(UiUpdate::SyncStatus(state.sync.phase().clone()))
                .await;
        }
        UserCommand::PauseSync => {
            if state.sync.pause() {
                let _ = ui_tx
                    .send(UiUpdate::SyncStatus(state.sync.phase().clone()))
                    .await;
            }
        }
        UserCommand::ResumeSync => {
            if state.sync.resume(state.feed.clone()) {
                let _ = ui_tx
                    .send(UiUpdate::SyncStatus(state.sync.phase().clone()))
                    .await;
            }
        }
        UserCommand::StopSync => {
            state.sync.stop();
            let cleared = state.store.reset_drafted();
            info!("Sync stopped; cleared drafted status on {cleared} player(s)");
            let _ = ui_tx
                .send(UiUpdate::SyncStatus(state.sync.phase().clone()))
                .await;
            let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
        }
        UserCommand::RefreshCatalog => {
            info!("Catalog refresh requested");
            state.spawn_catalog_fetch();
        }
        UserCommand::SaveRanking { name, overwrite } => {
            let roster = state.store.snapshot();
            match state.db.save_ranking(&name, &roster, overwrite) {
                Ok(outcome) => {
                    let _ = ui_tx.send(UiUpdate::RankingSaved { name, outcome }).await;
                }
                Err(e) => {
                    warn!("Failed to save ranking: {e}");
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                }
            }
        }
        UserCommand::LoadRanking(name) => match state.db.load_ranking(&name) {
            Ok(Some(players)) => match state.store.replace_all(players) {
                Ok(()) => {
                    info!("Loaded ranking {name:?}");
                    let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
                }
                Err(e) => {
                    warn!("Rejected saved ranking {name:?}: {e}");
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                }
            },
            Ok(None) => {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!("no saved ranking named {name:?}")))
                    .await;
            }
            Err(e) => {
                warn!("Failed to load ranking: {e}");
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::DeleteRanking(name) => match state.db.delete_ranking(&name) {
            Ok(true) => {
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!("Deleted ranking {name:?}")))
                    .await;
            }
            Ok(false) => {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!("no saved ranking named {name:?}")))
                    .await;
            }
            Err(e) => {
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::ListRankings => match state.db.list_rankings() {
            Ok(entries) => {
                let _ = ui_tx.send(UiUpdate::Rankings(entries)).await;
            }
            Err(e) => {
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::ExportBoard => {
            let roster = state.store.snapshot();
            let _ = ui_tx.send(UiUpdate::ExportReady(export_board(&roster))).await;
        }
        UserCommand::ImportBoard(json) => match import_board(&json) {
            Ok(players) => match state.store.replace_all(players) {
                Ok(()) => {
                    info!("Imported board document: {} players", state.store.len());
                    let _ = ui_tx.send(UiUpdate::Board(state.view())).await;
                }
                Err(e) => {
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                }
            },
            Err(e) => {
                warn!("Rejected board document: {e}");
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::Quit => unreachable!("Quit is consumed by the event loop"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
