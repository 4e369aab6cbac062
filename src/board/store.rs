// The roster store: single owner of the authoritative ordered player
// collection. Every public operation is atomic from the caller's point of
// view and re-establishes the dense-rank invariant before returning.
//
// Ranking policy: drafted players live in a trailing partition with their
// rank frozen at time-of-draft; undrafted ranks are re-compacted to a
// dense 1..N after every committed mutation. Un-drafting reinserts the
// player at its frozen rank position (clamped to the partition length).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::player::{Player, PlayerId, Tag};
use super::reorder::compute_reorder;

/// Soft result of a targeted store operation. `NotFound` is a signal,
/// not an error: feeds may reference players outside the loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The operation changed state and invariants were re-established.
    Committed,
    /// The request was valid but changed nothing (idempotent replay,
    /// drafted reorder endpoint, equal drag ids).
    NoOp,
    /// The referenced player id is not in the roster.
    NotFound,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate player id in roster: {0}")]
    DuplicateId(PlayerId),

    #[error("undrafted ranks are not a dense 1..{expected} permutation")]
    NonDenseRanks { expected: usize },
}

/// Counts from a catalog-refresh merge, for logging and UI banners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub updated: usize,
    pub added: usize,
    pub removed: usize,
}

/// The authoritative roster. Internally kept in board order: the
/// undrafted partition sorted by rank, then the drafted partition in
/// the order players were drafted.
#[derive(Debug, Default, Clone)]
pub struct RosterStore {
    players: Vec<Player>,
}

impl RosterStore {
    pub fn new() -> Self {
        RosterStore { players: Vec::new() }
    }

    /// Full overwrite, used for initial load and "load saved state".
    /// Input may arrive in any order; it is validated (unique ids, dense
    /// undrafted ranks) and normalized into board order before being
    /// accepted. On error the previous roster is left untouched.
    pub fn replace_all(&mut self, players: Vec<Player>) -> Result<(), StoreError> {
        validate_roster(&players)?;

        let (mut undrafted, mut drafted): (Vec<Player>, Vec<Player>) =
            players.into_iter().partition(|p| !p.drafted);
        undrafted.sort_by_key(|p| p.rank);
        drafted.sort_by_key(|p| p.rank);

        self.players = undrafted;
        self.players.append(&mut drafted);
        self.recompact();
        Ok(())
    }

    /// Immutable read view for the projector. Never exposes the internal
    /// vector.
    pub fn snapshot(&self) -> Vec<Player> {
        self.players.clone()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn undrafted_count(&self) -> usize {
        self.players.iter().filter(|p| !p.drafted).count()
    }

    /// Set or unset a tag. Unknown ids report `NotFound` without touching
    /// state; setting an already-present tag is a `NoOp`.
    pub fn set_tag(&mut self, id: &PlayerId, tag: Tag, present: bool) -> StoreOutcome {
        match self.players.iter_mut().find(|p| &p.id == id) {
            Some(player) => {
                if player.set_tag(tag, present) {
                    StoreOutcome::Committed
                } else {
                    StoreOutcome::NoOp
                }
            }
            None => {
                warn!("set_tag: unknown player id {id}");
                StoreOutcome::NotFound
            }
        }
    }

    /// Flip tag membership. Two toggles restore the original set.
    pub fn toggle_tag(&mut self, id: &PlayerId, tag: Tag) -> StoreOutcome {
        let present = match self.get(id) {
            Some(p) => p.tags.contains(&tag),
            None => {
                warn!("toggle_tag: unknown player id {id}");
                return StoreOutcome::NotFound;
            }
        };
        self.set_tag(id, tag, !present)
    }

    /// Flip a player's draft status by direct user action.
    ///
    /// Drafting freezes the player's current rank, moves it to the end of
    /// the drafted partition, and re-compacts the undrafted ranks.
    /// Un-drafting reinserts at the frozen rank position so an immediate
    /// double toggle restores the previous ordering exactly.
    pub fn toggle_drafted(&mut self, id: &PlayerId) -> StoreOutcome {
        let idx = match self.players.iter().position(|p| &p.id == id) {
            Some(i) => i,
            None => {
                warn!("toggle_drafted: unknown player id {id}");
                return StoreOutcome::NotFound;
            }
        };

        let mut player = self.players.remove(idx);
        if player.drafted {
            player.drafted = false;
            let undrafted_len = self.players.iter().filter(|p| !p.drafted).count();
            let pos = (player.rank.saturating_sub(1) as usize).min(undrafted_len);
            self.players.insert(pos, player);
        } else {
            player.drafted = true;
            self.players.push(player);
        }
        self.recompact();
        StoreOutcome::Committed
    }

    /// Commit a manual drag-reorder within the undrafted partition.
    ///
    /// Rejected (no-op) when either endpoint is drafted or the ids are
    /// equal; the intent-dispatch layer prevents these, but the store
    /// re-checks defensively. Unknown ids report `NotFound`.
    pub fn apply_reorder(&mut self, dragged: &PlayerId, target: &PlayerId) -> StoreOutcome {
        let (dragged_player, target_player) = match (self.get(dragged), self.get(target)) {
            (Some(d), Some(t)) => (d, t),
            _ => {
                warn!("apply_reorder: unknown endpoint ({dragged} -> {target})");
                return StoreOutcome::NotFound;
            }
        };
        if dragged == target || dragged_player.drafted || target_player.drafted {
            return StoreOutcome::NoOp;
        }

        let undrafted_ids: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| !p.drafted)
            .map(|p| p.id.clone())
            .collect();

        let new_order = match compute_reorder(&undrafted_ids, dragged, target) {
            Some(order) => order,
            None => return StoreOutcome::NoOp,
        };

        self.reorder_undrafted(&new_order);
        self.recompact();
        StoreOutcome::Committed
    }

    /// Merge a freshly normalized catalog into the live roster.
    ///
    /// For surviving ids only `name`/`team`/`position` are overwritten;
    /// `rank`, `tags`, and `drafted` are user/board-owned and preserved.
    /// Ids absent from the new catalog are removed; ids new to the board
    /// are appended after all retained undrafted entries, in catalog
    /// order, keeping any normalizer-derived default tags.
    pub fn merge_catalog_refresh(&mut self, catalog: Vec<Player>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut incoming: Vec<Option<Player>> = catalog.into_iter().map(Some).collect();

        let before = self.players.len();
        self.players.retain_mut(|existing| {
            let slot = incoming
                .iter_mut()
                .find(|c| c.as_ref().is_some_and(|c| c.id == existing.id));
            match slot {
                Some(slot) => {
                    let fresh = slot.take().expect("slot checked non-empty");
                    existing.name = fresh.name;
                    existing.team = fresh.team;
                    existing.position = fresh.position;
                    true
                }
                None => false,
            }
        });
        summary.removed = before - self.players.len();
        summary.updated = self.players.len();

        // Remaining incoming entries are new to the board: append to the
        // end of the undrafted partition in catalog order.
        let first_drafted = self
            .players
            .iter()
            .position(|p| p.drafted)
            .unwrap_or(self.players.len());
        let mut insert_at = first_drafted;
        for fresh in incoming.into_iter().flatten() {
            self.players.insert(insert_at, fresh);
            insert_at += 1;
            summary.added += 1;
        }

        self.recompact();
        debug!(
            "catalog merge: {} updated, {} added, {} removed",
            summary.updated, summary.added, summary.removed
        );
        summary
    }

    /// Mark a player drafted from an external feed event. Idempotent:
    /// re-applying the same pick is a `NoOp`. Unknown ids are ignored
    /// (the draft room may include players outside the tracked catalog).
    /// This direction is monotonic; only [`RosterStore::reset_drafted`]
    /// un-drafts.
    pub fn apply_external_pick(&mut self, id: &PlayerId) -> StoreOutcome {
        let idx = match self.players.iter().position(|p| &p.id == id) {
            Some(i) => i,
            None => {
                debug!("external pick for untracked player {id}, ignoring");
                return StoreOutcome::NotFound;
            }
        };
        if self.players[idx].drafted {
            return StoreOutcome::NoOp;
        }
        let mut player = self.players.remove(idx);
        player.drafted = true;
        self.players.push(player);
        self.recompact();
        StoreOutcome::Committed
    }

    /// Apply a polled pick snapshot. Returns the number of players newly
    /// marked drafted; replaying a snapshot already applied returns 0.
    pub fn apply_external_pick_set(&mut self, ids: &[PlayerId]) -> usize {
        ids.iter()
            .filter(|id| self.apply_external_pick(id) == StoreOutcome::Committed)
            .count()
    }

    /// Clear all feed-derived draft state ("remove sync").
    ///
    /// Un-drafts the drafted partition tail first (reverse draft order),
    /// reinserting each player at its frozen rank position exactly like
    /// the [`RosterStore::toggle_drafted`] undraft branch, re-compacting
    /// after each reinsertion. A frozen rank refers to the partition
    /// layout at the moment that player was drafted, so unwinding in
    /// reverse is what makes a pure pick sequence restore the pre-sync
    /// ordering. Returns the number of players un-drafted.
    pub fn reset_drafted(&mut self) -> usize {
        let mut cleared = 0;
        while let Some(idx) = self.players.iter().rposition(|p| p.drafted) {
            let mut player = self.players.remove(idx);
            player.drafted = false;
            let undrafted_len = self.players.iter().filter(|p| !p.drafted).count();
            let pos = (player.rank.saturating_sub(1) as usize).min(undrafted_len);
            self.players.insert(pos, player);
            self.recompact();
            cleared += 1;
        }
        cleared
    }

    /// Reassign dense ranks over the undrafted partition in its current
    /// vector order. Drafted players keep their frozen rank and are moved
    /// behind the undrafted partition, preserving relative order.
    fn recompact(&mut self) {
        let (mut undrafted, mut drafted): (Vec<Player>, Vec<Player>) =
            std::mem::take(&mut self.players)
                .into_iter()
                .partition(|p| !p.drafted);
        for (i, p) in undrafted.iter_mut().enumerate() {
            p.rank = (i + 1) as u32;
        }
        self.players = undrafted;
        self.players.append(&mut drafted);
    }

    /// Rearrange the undrafted partition to match `order` (a permutation
    /// of its ids). Drafted entries are untouched.
    fn reorder_undrafted(&mut self, order: &[PlayerId]) {
        let mut by_id: Vec<Option<Player>> = std::mem::take(&mut self.players)
            .into_iter()
            .map(Some)
            .collect();

        let mut reordered = Vec::with_capacity(by_id.len());
        for id in order {
            let slot = by_id
                .iter_mut()
                .find(|p| p.as_ref().is_some_and(|p| &p.id == id))
                .expect("reorder id taken from the live roster");
            reordered.push(slot.take().expect("slot checked non-empty"));
        }
        // Drafted players (and nothing else) remain; keep them trailing.
        reordered.extend(by_id.into_iter().flatten());
        self.players = reordered;
    }
}

/// Validate unique ids and dense undrafted ranks over a candidate
/// roster.
fn validate_roster(players: &[Player]) -> Result<(), StoreError> {
    let mut seen = std::collections::HashSet::new();
    for p in players {
        if !seen.insert(&p.id) {
            return Err(StoreError::DuplicateId(p.id.clone()));
        }
    }

    let mut ranks: Vec<u32> = players
        .iter()
        .filter(|p| !p.drafted)
        .map(|p| p.rank)
        .collect();
    ranks.sort_unstable();
    let dense = ranks.iter().enumerate().all(|(i, r)| *r == (i + 1) as u32);
    if !dense {
        return Err(StoreError::NonDenseRanks { expected: ranks.len() });
    }
    Ok(())
}
