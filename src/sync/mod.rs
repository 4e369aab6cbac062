// Draft-room sync: identifier validation, the connection state machine,
// and the manager that owns the transport task.
//
// The state machine is driven by discrete feed events fed into
// `SyncManager::on_event`. Every transport task is tagged with a
// generation; starting a new sync (or stopping) bumps the generation so
// events from a superseded connection are discarded instead of being
// applied against the wrong draft.

pub mod feed;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::board::player::PlayerId;
use feed::{DraftFeed, FeedEvent, FeedEventKind};

/// Numeric draft-room handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftId(pub u64);

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid draft identifier {input:?}: expected a numeric draft id or a draft-room URL")]
    InvalidIdentifier { input: String },
}

/// Parse user input into a draft handle. Accepts bare digits or a
/// draft-room URL whose last path segment is the numeric id (query
/// strings are stripped). Fails synchronously; no connection is
/// attempted for malformed input.
pub fn parse_draft_identifier(input: &str) -> Result<DraftId, SyncError> {
    let trimmed = input.trim();
    let invalid = || SyncError::InvalidIdentifier {
        input: input.to_string(),
    };

    let candidate = if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        trimmed
    } else {
        trimmed
            .rsplit('/')
            .find(|seg| !seg.is_empty())
            .and_then(|seg| seg.split('?').next())
            .ok_or_else(invalid)?
    };

    candidate.parse::<u64>().map(DraftId).map_err(|_| invalid())
}

/// Connection state of the draft-room sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync configured.
    Idle,
    /// Identifier accepted; snapshot fetched and/or channel opening.
    Connecting,
    /// Live channel confirmed; incoming picks are applied.
    Active,
    /// Transport stays open; incoming picks are received but discarded.
    Paused,
    /// Transport or validation failure. The board remains usable with
    /// the last successfully merged draft state.
    Error(String),
}

impl SyncPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, SyncPhase::Active)
    }
}

/// Owns the feed transport task and the sync state machine.
///
/// A single transport is live at a time: `start` tears down any prior
/// task before spawning the new one, and `stop` severs the transport
/// explicitly rather than leaving it to be garbage-collected.
pub struct SyncManager {
    phase: SyncPhase,
    generation: u64,
    draft: Option<DraftId>,
    task: Option<JoinHandle<()>>,
    events_tx: mpsc::Sender<FeedEvent>,
}

impl SyncManager {
    pub fn new(events_tx: mpsc::Sender<FeedEvent>) -> Self {
        SyncManager {
            phase: SyncPhase::Idle,
            generation: 0,
            draft: None,
            task: None,
            events_tx,
        }
    }

    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    pub fn draft(&self) -> Option<DraftId> {
        self.draft
    }

    /// Start (or restart) syncing against the draft identified by `input`.
    ///
    /// Malformed input transitions straight to `Error` without touching
    /// any existing transport. Valid input tears down the prior transport,
    /// bumps the generation, and spawns a task that fetches the initial
    /// pick snapshot and then runs the push channel.
    pub fn start(&mut self, input: &str, feed: Arc<dyn DraftFeed>) -> Result<DraftId, SyncError> {
        let draft = match parse_draft_identifier(input) {
            Ok(d) => d,
            Err(e) => {
                warn!("Rejected draft identifier: {e}");
                self.phase = SyncPhase::Error(e.to_string());
                return Err(e);
            }
        };

        self.teardown_transport();
        self.generation += 1;
        self.draft = Some(draft);
        self.phase = SyncPhase::Connecting;
        info!("Starting sync for draft {draft} (generation {})", self.generation);

        let generation = self.generation;
        let tx = self.events_tx.clone();
        self.task = Some(tokio::spawn(async move {
            match feed.fetch_picks(draft).await {
                Ok(picks) => {
                    let event = FeedEvent {
                        generation,
                        kind: FeedEventKind::SnapshotPicks(picks),
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx
                        .send(FeedEvent {
                            generation,
                            kind: FeedEventKind::Failed(e.to_string()),
                        })
                        .await;
                    return;
                }
            }

            let result = feed.run_push_channel(draft, generation, tx.clone()).await;
            let kind = match result {
                Ok(()) => FeedEventKind::Closed,
                Err(e) => FeedEventKind::Failed(e.to_string()),
            };
            let _ = tx.send(FeedEvent { generation, kind }).await;
        }));

        Ok(draft)
    }

    /// Suspend applying incoming events. The transport stays open.
    pub fn pause(&mut self) -> bool {
        if self.phase == SyncPhase::Active {
            info!("Sync paused");
            self.phase = SyncPhase::Paused;
            true
        } else {
            false
        }
    }

    /// Resume applying events. Picks that arrived while paused were
    /// discarded, so a one-shot snapshot fetch reconciles the gap.
    pub fn resume(&mut self, feed: Arc<dyn DraftFeed>) -> bool {
        if self.phase != SyncPhase::Paused {
            return false;
        }
        self.phase = SyncPhase::Active;
        info!("Sync resumed; fetching catch-up snapshot");

        if let Some(draft) = self.draft {
            self.spawn_snapshot_fetch(draft, feed);
        }
        true
    }

    /// Request a pick snapshot on the current generation (periodic poll
    /// catch-up). No-op unless the sync is active.
    pub fn poll(&self, feed: Arc<dyn DraftFeed>) {
        if !self.phase.is_active() {
            return;
        }
        if let Some(draft) = self.draft {
            self.spawn_snapshot_fetch(draft, feed);
        }
    }

    /// Stop the sync and sever the transport. The caller is responsible
    /// for clearing feed-derived board state (`reset_drafted`).
    pub fn stop(&mut self) {
        info!("Sync stopped");
        self.teardown_transport();
        // Bump the generation so any event already in flight from the
        // aborted task is discarded as stale.
        self.generation += 1;
        self.draft = None;
        self.phase = SyncPhase::Idle;
    }

    /// Feed an event into the state machine. Returns the picks the caller
    /// should apply to the roster store, if any.
    pub fn on_event(&mut self, event: FeedEvent) -> Option<Vec<PlayerId>> {
        if event.generation != self.generation {
            debug!(
                "Discarding stale feed event (generation {} != {})",
                event.generation, self.generation
            );
            return None;
        }

        match event.kind {
            FeedEventKind::SnapshotPicks(picks) => match self.phase {
                SyncPhase::Connecting | SyncPhase::Active => Some(picks),
                _ => None,
            },
            FeedEventKind::ChannelConfirmed => {
                if self.phase == SyncPhase::Connecting {
                    info!("Push channel confirmed; sync active");
                    self.phase = SyncPhase::Active;
                }
                None
            }
            FeedEventKind::Pick(id) => match self.phase {
                SyncPhase::Active => Some(vec![id]),
                SyncPhase::Connecting => {
                    // A pick frame is itself a confirmed live message.
                    self.phase = SyncPhase::Active;
                    Some(vec![id])
                }
                SyncPhase::Paused => {
                    debug!("Sync paused; discarding pick for {id}");
                    None
                }
                _ => None,
            },
            FeedEventKind::Closed => {
                if self.phase != SyncPhase::Idle {
                    warn!("Feed transport closed unexpectedly");
                    self.phase = SyncPhase::Error("feed transport closed".into());
                }
                None
            }
            FeedEventKind::Failed(msg) => {
                warn!("Feed failure: {msg}");
                self.phase = SyncPhase::Error(msg);
                None
            }
        }
    }

    fn spawn_snapshot_fetch(&self, draft: DraftId, feed: Arc<dyn DraftFeed>) {
        let generation = self.generation;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let kind = match feed.fetch_picks(draft).await {
                Ok(picks) => FeedEventKind::SnapshotPicks(picks),
                Err(e) => FeedEventKind::Failed(e.to_string()),
            };
            let _ = tx.send(FeedEvent { generation, kind }).await;
        });
    }

    fn teardown_transport(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Aborted previous feed transport task");
        }
    }
}
