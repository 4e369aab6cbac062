// Integration tests for draftdeck.
//
// These tests exercise the full system end-to-end using the library
// crate's public API. They verify that the major subsystems (catalog
// normalization, roster store, reorder engine, view projection,
// draft-room sync, export/import, and the saved-rankings database) work
// together correctly.

use std::sync::Arc;

use draftdeck::board::player::{Player, PlayerId, Position, PositionFilter, Tag};
use draftdeck::board::project::project;
use draftdeck::board::store::{RosterStore, StoreOutcome};
use draftdeck::catalog::{normalize, RawPlayerRecord};
use draftdeck::db::{Database, SaveOutcome};
use draftdeck::export::{export_board, import_board};
use draftdeck::sync::feed::{DraftFeed, FeedError, FeedEvent, FeedEventKind};
use draftdeck::sync::{DraftId, SyncManager, SyncPhase};

use async_trait::async_trait;
use tokio::sync::mpsc;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Build a raw catalog record the way the bulk fetch endpoint shapes them.
fn raw(
    id: &str,
    first: &str,
    last: &str,
    team: Option<&str>,
    position: &str,
    search_rank: Option<u32>,
    years_exp: Option<u8>,
) -> RawPlayerRecord {
    RawPlayerRecord {
        player_id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        team: team.map(str::to_string),
        position: Some(position.to_string()),
        search_rank,
        years_exp,
        active: true,
    }
}

/// Normalize a small fixed catalog and populate a store with it.
fn seeded_store() -> RosterStore {
    let records = vec![
        raw("qb1", "Pat", "Mahomes", Some("KC"), "QB", Some(12), Some(8)),
        raw("rb1", "Bijan", "Robinson", Some("ATL"), "RB", Some(1), Some(2)),
        raw("rb2", "Jahmyr", "Gibbs", Some("DET"), "RB", Some(2), Some(2)),
        raw("wr1", "Justin", "Jefferson", Some("MIN"), "WR", Some(3), Some(5)),
        raw("te1", "Brock", "Bowers", Some("LV"), "TE", Some(8), Some(0)),
    ];
    let players = normalize(records).expect("fixture catalog must normalize");

    let mut store = RosterStore::new();
    store.replace_all(players).expect("fixture roster must validate");
    store
}

fn ids(players: &[Player]) -> Vec<&str> {
    players.iter().map(|p| p.id.as_str()).collect()
}

fn assert_dense_undrafted(store: &RosterStore) {
    let snapshot = store.snapshot();
    let undrafted: Vec<&Player> = snapshot.iter().filter(|p| !p.drafted).collect();
    for (i, p) in undrafted.iter().enumerate() {
        assert_eq!(
            p.rank,
            (i + 1) as u32,
            "rank gap at {} in {:?}",
            p.id,
            ids(&snapshot)
        );
    }
}

// ===========================================================================
// Catalog -> store pipeline
// ===========================================================================

#[test]
fn catalog_normalization_orders_by_search_rank_and_tags_rookies() {
    let store = seeded_store();
    let snapshot = store.snapshot();

    // search_rank ascending: rb1(1), rb2(2), wr1(3), te1(8), qb1(12)
    assert_eq!(ids(&snapshot), vec!["rb1", "rb2", "wr1", "te1", "qb1"]);
    assert_dense_undrafted(&store);

    // te1 has zero years of experience.
    let te = store.get(&PlayerId::new("te1")).unwrap();
    assert!(te.tags.contains(&Tag::Rookie));
    let qb = store.get(&PlayerId::new("qb1")).unwrap();
    assert!(!qb.tags.contains(&Tag::Rookie));
}

#[test]
fn unranked_catalog_records_sort_after_ranked_ones() {
    let records = vec![
        raw("a", "A", "A", None, "QB", None, Some(1)),
        raw("b", "B", "B", None, "QB", Some(5), Some(1)),
        raw("c", "C", "C", None, "QB", Some(2), Some(1)),
    ];
    let players = normalize(records).unwrap();
    let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
    let ranks: Vec<u32> = players.iter().map(|p| p.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn catalog_refresh_preserves_user_edits() {
    let mut store = seeded_store();

    // User edits: tag a player, drag another up, draft a third.
    store.toggle_tag(&PlayerId::new("wr1"), Tag::Target);
    assert_eq!(
        store.apply_reorder(&PlayerId::new("qb1"), &PlayerId::new("rb1")),
        StoreOutcome::Committed
    );
    store.toggle_drafted(&PlayerId::new("rb2"));

    // Refresh: wr1 changes teams, te1 vanishes, a new kicker appears.
    let refreshed = normalize(vec![
        raw("qb1", "Pat", "Mahomes", Some("KC"), "QB", Some(12), Some(8)),
        raw("rb1", "Bijan", "Robinson", Some("ATL"), "RB", Some(1), Some(2)),
        raw("rb2", "Jahmyr", "Gibbs", Some("DET"), "RB", Some(2), Some(2)),
        raw("wr1", "Justin", "Jefferson", Some("CAR"), "WR", Some(3), Some(5)),
        raw("k1", "Harrison", "Butker", Some("KC"), "K", Some(40), Some(7)),
    ])
    .unwrap();
    let summary = store.merge_catalog_refresh(refreshed);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.removed, 1);

    let snapshot = store.snapshot();
    // User ordering survives: qb1 still ahead of rb1; rb2 still drafted
    // at the tail; the new player lands at the end of the undrafted
    // partition.
    assert_eq!(ids(&snapshot), vec!["qb1", "rb1", "wr1", "k1", "rb2"]);
    assert!(snapshot[4].drafted);
    // Descriptive fields take the refreshed values.
    assert_eq!(
        store.get(&PlayerId::new("wr1")).unwrap().team.as_deref(),
        Some("CAR")
    );
    // Tags are user-owned and untouched.
    assert!(store
        .get(&PlayerId::new("wr1"))
        .unwrap()
        .tags
        .contains(&Tag::Target));
    assert_dense_undrafted(&store);
}

// ===========================================================================
// Reorder + draft + projection flows
// ===========================================================================

#[test]
fn drag_drop_then_draft_then_undraft_restores_position() {
    let mut store = seeded_store();

    // Drag the QB to the top of the board.
    store.apply_reorder(&PlayerId::new("qb1"), &PlayerId::new("rb1"));
    assert_eq!(
        ids(&store.snapshot()),
        vec!["qb1", "rb1", "rb2", "wr1", "te1"]
    );

    // Draft him, then undraft: his slot comes back.
    store.toggle_drafted(&PlayerId::new("qb1"));
    assert_eq!(
        ids(&store.snapshot()),
        vec!["rb1", "rb2", "wr1", "te1", "qb1"]
    );
    store.toggle_drafted(&PlayerId::new("qb1"));
    assert_eq!(
        ids(&store.snapshot()),
        vec!["qb1", "rb1", "rb2", "wr1", "te1"]
    );
    assert_dense_undrafted(&store);
}

#[test]
fn drafted_players_cannot_be_reordered() {
    let mut store = seeded_store();
    store.toggle_drafted(&PlayerId::new("rb1"));
    let before = store.snapshot();

    assert_eq!(
        store.apply_reorder(&PlayerId::new("rb1"), &PlayerId::new("wr1")),
        StoreOutcome::NoOp
    );
    assert_eq!(
        store.apply_reorder(&PlayerId::new("wr1"), &PlayerId::new("rb1")),
        StoreOutcome::NoOp
    );
    assert_eq!(store.snapshot(), before);
}

#[test]
fn projection_filters_compose_and_never_mutate_the_store() {
    let mut store = seeded_store();
    store.toggle_drafted(&PlayerId::new("rb1"));
    let snapshot = store.snapshot();

    // Position filter alone.
    let rbs = project(&snapshot, "", PositionFilter::Only(Position::Rb));
    assert_eq!(
        rbs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec!["rb2", "rb1"] // drafted rb1 trails
    );

    // Search narrows by name or team, case-insensitive.
    let det = project(&snapshot, "det", PositionFilter::All);
    assert_eq!(det.len(), 1);
    assert_eq!(det[0].id, PlayerId::new("rb2"));

    // Search AND position together.
    let none = project(&snapshot, "det", PositionFilter::Only(Position::Qb));
    assert!(none.is_empty());

    // The projection borrowed; the store is unchanged.
    assert_eq!(store.snapshot(), snapshot);
}

// ===========================================================================
// Draft-room sync end-to-end
// ===========================================================================

/// Feed that serves a scripted snapshot, confirms its channel, then
/// emits one live pick and parks.
struct ScriptedFeed {
    snapshot: Vec<PlayerId>,
    live_pick: Option<PlayerId>,
}

#[async_trait]
impl DraftFeed for ScriptedFeed {
    async fn fetch_picks(&self, _draft: DraftId) -> Result<Vec<PlayerId>, FeedError> {
        Ok(self.snapshot.clone())
    }

    async fn run_push_channel(
        &self,
        _draft: DraftId,
        generation: u64,
        tx: mpsc::Sender<FeedEvent>,
    ) -> Result<(), FeedError> {
        let _ = tx
            .send(FeedEvent {
                generation,
                kind: FeedEventKind::ChannelConfirmed,
            })
            .await;
        if let Some(id) = &self.live_pick {
            let _ = tx
                .send(FeedEvent {
                    generation,
                    kind: FeedEventKind::Pick(id.clone()),
                })
                .await;
        }
        futures_util::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn sync_session_drafts_snapshot_and_live_picks() {
    let mut store = seeded_store();
    let (tx, mut rx) = mpsc::channel(32);
    let mut sync = SyncManager::new(tx);

    let feed: Arc<dyn DraftFeed> = Arc::new(ScriptedFeed {
        snapshot: vec![PlayerId::new("rb1"), PlayerId::new("wr1")],
        live_pick: Some(PlayerId::new("qb1")),
    });
    sync.start("https://draftroom.example/draft/nfl/777", feed)
        .unwrap();
    assert_eq!(sync.draft(), Some(DraftId(777)));

    // Snapshot, confirmation, then the live pick.
    for _ in 0..3 {
        let event = rx.recv().await.unwrap();
        if let Some(picks) = sync.on_event(event) {
            store.apply_external_pick_set(&picks);
        }
    }

    assert_eq!(*sync.phase(), SyncPhase::Active);
    let snapshot = store.snapshot();
    let drafted: Vec<&str> = snapshot
        .iter()
        .filter(|p| p.drafted)
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(drafted.len(), 3);
    assert!(drafted.contains(&"rb1"));
    assert!(drafted.contains(&"wr1"));
    assert!(drafted.contains(&"qb1"));
    assert_dense_undrafted(&store);
}

#[tokio::test]
async fn duplicate_external_picks_are_idempotent() {
    let mut store = seeded_store();

    assert_eq!(store.apply_external_pick(&PlayerId::new("rb1")), StoreOutcome::Committed);
    // Re-announcement of the same pick (poll overlap with push).
    assert_eq!(store.apply_external_pick(&PlayerId::new("rb1")), StoreOutcome::NoOp);
    // Unknown player in the pick feed is skipped, not fatal.
    assert_eq!(
        store.apply_external_pick(&PlayerId::new("mystery")),
        StoreOutcome::NotFound
    );

    assert_eq!(store.snapshot().iter().filter(|p| p.drafted).count(), 1);
}

#[tokio::test]
async fn restarting_sync_discards_events_from_the_old_connection() {
    let (tx, mut rx) = mpsc::channel(32);
    let mut sync = SyncManager::new(tx);

    let first: Arc<dyn DraftFeed> = Arc::new(ScriptedFeed {
        snapshot: vec![PlayerId::new("rb1")],
        live_pick: None,
    });
    sync.start("111", first).unwrap();
    let stale_snapshot = rx.recv().await.unwrap();

    // Supersede before the first connection's snapshot is applied.
    let second: Arc<dyn DraftFeed> = Arc::new(ScriptedFeed {
        snapshot: vec![],
        live_pick: None,
    });
    sync.start("222", second).unwrap();

    // The superseded connection's snapshot releases no picks to apply.
    assert!(sync.on_event(stale_snapshot).is_none());
    assert_eq!(*sync.phase(), SyncPhase::Connecting);
}

// ===========================================================================
// Export / import / persistence
// ===========================================================================

#[test]
fn export_import_round_trip_preserves_order_and_tags() {
    let mut store = seeded_store();
    store.toggle_tag(&PlayerId::new("wr1"), Tag::Avoid);
    store.apply_reorder(&PlayerId::new("te1"), &PlayerId::new("rb2"));
    store.toggle_drafted(&PlayerId::new("rb1"));
    let exported_order = ids(&store.snapshot())
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let json = export_board(&store.snapshot());
    let imported = import_board(&json).unwrap();

    let mut fresh = RosterStore::new();
    fresh.replace_all(imported).unwrap();

    // Same board order, but draft status is reset on import.
    assert_eq!(
        ids(&fresh.snapshot()),
        exported_order.iter().map(String::as_str).collect::<Vec<_>>()
    );
    assert!(fresh.snapshot().iter().all(|p| !p.drafted));
    assert!(fresh
        .get(&PlayerId::new("wr1"))
        .unwrap()
        .tags
        .contains(&Tag::Avoid));
    assert_dense_undrafted(&fresh);
}

#[test]
fn saved_ranking_round_trips_through_sqlite() {
    let mut store = seeded_store();
    store.apply_reorder(&PlayerId::new("wr1"), &PlayerId::new("rb1"));

    let db = Database::open(":memory:").unwrap();
    assert_eq!(
        db.save_ranking("my big board", &store.snapshot(), false).unwrap(),
        SaveOutcome::Saved
    );

    // Keep editing, then restore the saved version.
    store.apply_reorder(&PlayerId::new("qb1"), &PlayerId::new("wr1"));
    let saved = db.load_ranking("my big board").unwrap().unwrap();
    let mut restored = RosterStore::new();
    restored.replace_all(saved).unwrap();

    assert_eq!(
        ids(&restored.snapshot()),
        vec!["wr1", "rb1", "rb2", "te1", "qb1"]
    );
    assert_dense_undrafted(&restored);
}
