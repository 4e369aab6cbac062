// Player catalog source: HTTP client for the bulk player fetch and the
// normalizer that turns raw catalog records into the canonical ranked
// board population.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::board::player::{Player, PlayerId, Position, Tag};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("malformed catalog record: {reason}")]
    Parse { reason: String },
}

/// A raw player record as returned by the catalog API. Fields the board
/// does not consume are simply not deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayerRecord {
    pub player_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// `None` for free agents.
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// External desirability score; lower is more desirable. `None` for
    /// fringe players the source has not ranked.
    #[serde(default)]
    pub search_rank: Option<u32>,
    #[serde(default)]
    pub years_exp: Option<u8>,
    #[serde(default)]
    pub active: bool,
}

/// HTTP client for the catalog bulk-fetch endpoint.
///
/// The endpoint returns a JSON object keyed by player id; a `BTreeMap`
/// keeps the encounter order deterministic, which matters because the
/// normalizer's null-score tie-break is encounter order.
pub struct CatalogClient {
    http: reqwest::Client,
    url: String,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        CatalogClient { http, url: url.into() }
    }

    /// Fetch the full catalog. Network and non-2xx failures surface as
    /// `CatalogError::Fetch`; the caller must leave any prior roster
    /// untouched on failure.
    pub async fn fetch_catalog(&self) -> Result<Vec<RawPlayerRecord>, CatalogError> {
        let records: BTreeMap<String, RawPlayerRecord> = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!("Fetched {} raw catalog records", records.len());
        Ok(records.into_values().collect())
    }
}

/// Normalize raw catalog records into the canonical ranked player list.
///
/// - Drops records outside the tracked position allow-list or without an
///   active flag (silently; the catalog carries thousands of them).
/// - Orders by `search_rank` ascending; unscored records sort after all
///   scored ones, stable in encounter order.
/// - Assigns dense 1-based ranks in that order.
/// - Derives the `rookie` tag for first-year players; every other tag is
///   user-owned.
///
/// Pure function of its input. Fails with `CatalogError::Parse` on a
/// record that is structurally unusable (empty id or no name at all).
pub fn normalize(records: Vec<RawPlayerRecord>) -> Result<Vec<Player>, CatalogError> {
    let mut kept: Vec<(RawPlayerRecord, Position)> = Vec::new();

    for record in records {
        if record.player_id.trim().is_empty() {
            return Err(CatalogError::Parse {
                reason: "record with empty player_id".into(),
            });
        }
        if record.first_name.trim().is_empty() && record.last_name.trim().is_empty() {
            return Err(CatalogError::Parse {
                reason: format!("record {} has no name", record.player_id),
            });
        }

        if !record.active {
            continue;
        }
        let Some(position) = record.position.as_deref().and_then(Position::from_str_pos) else {
            continue;
        };
        kept.push((record, position));
    }

    // Stable sort: None scores keep encounter order behind all scored records.
    kept.sort_by_key(|(r, _)| r.search_rank.map_or((1, 0), |s| (0, s)));

    let players = kept
        .into_iter()
        .enumerate()
        .map(|(i, (record, position))| {
            let name = format!("{} {}", record.first_name.trim(), record.last_name.trim())
                .trim()
                .to_string();
            let mut tags = std::collections::BTreeSet::new();
            if record.years_exp == Some(0) {
                tags.insert(Tag::Rookie);
            }
            Player {
                id: PlayerId::new(record.player_id),
                rank: (i + 1) as u32,
                name,
                team: record.team.filter(|t| !t.is_empty()),
                position,
                drafted: false,
                tags,
            }
        })
        .collect();

    Ok(players)
}
