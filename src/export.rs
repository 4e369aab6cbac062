// Board export/import: a self-describing JSON document carrying the full
// player array. Import re-derives dense ranks from array order and resets
// draft status, so a document survives being hand-edited or truncated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::player::{Player, PlayerId};

/// Document schema identifier, checked on import.
const EXPORT_SCHEMA: &str = "draftdeck-board";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid board document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported document schema {found:?} (expected {EXPORT_SCHEMA:?})")]
    Schema { found: String },

    #[error("board document contains duplicate player id {0}")]
    DuplicateId(PlayerId),
}

/// The on-disk board document.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardDocument {
    pub schema: String,
    pub exported_at: DateTime<Utc>,
    pub players: Vec<Player>,
}

/// Serialize a roster snapshot for download. Players are written in board
/// order with all fields, so the document is also a readable record of
/// the session.
pub fn export_board(roster: &[Player]) -> String {
    let doc = BoardDocument {
        schema: EXPORT_SCHEMA.to_string(),
        exported_at: Utc::now(),
        players: roster.to_vec(),
    };
    serde_json::to_string_pretty(&doc).expect("board document serialization cannot fail")
}

/// Parse a board document back into a roster population.
///
/// Ranks are re-derived dense (1..N) from the array's order and
/// `drafted` is reset to false; tags and descriptive fields are taken
/// as-is. The result is ready for `RosterStore::replace_all`.
pub fn import_board(json: &str) -> Result<Vec<Player>, ExportError> {
    let doc: BoardDocument = serde_json::from_str(json)?;
    if doc.schema != EXPORT_SCHEMA {
        return Err(ExportError::Schema { found: doc.schema });
    }

    let mut seen = std::collections::HashSet::new();
    let mut players = doc.players;
    for (i, player) in players.iter_mut().enumerate() {
        if !seen.insert(player.id.clone()) {
            return Err(ExportError::DuplicateId(player.id.clone()));
        }
        player.rank = (i + 1) as u32;
        player.drafted = false;
    }
    Ok(players)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::player::{Position, Tag};
    use std::collections::BTreeSet;

    fn player(id: &str, rank: u32, drafted: bool) -> Player {
        let mut tags = BTreeSet::new();
        if id == "B" {
            tags.insert(Tag::Target);
        }
        Player {
            id: PlayerId::new(id),
            rank,
            name: format!("Player {id}"),
            team: Some("DAL".into()),
            position: Position::Rb,
            drafted,
            tags,
        }
    }

    #[test]
    fn export_then_import_re_derives_ranks_and_resets_drafted() {
        let roster = vec![player("A", 1, false), player("B", 2, true), player("C", 3, false)];

        let json = export_board(&roster);
        let imported = import_board(&json).unwrap();

        assert_eq!(imported.len(), 3);
        let ranks: Vec<u32> = imported.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(imported.iter().all(|p| !p.drafted));
        // Tags survive the round trip.
        assert!(imported[1].tags.contains(&Tag::Target));
    }

    #[test]
    fn import_ranks_follow_array_order_not_stored_ranks() {
        // Hand-edited document with shuffled rank values: array order wins.
        let doc = BoardDocument {
            schema: "draftdeck-board".into(),
            exported_at: Utc::now(),
            players: vec![player("X", 9, false), player("Y", 4, false)],
        };
        let json = serde_json::to_string(&doc).unwrap();

        let imported = import_board(&json).unwrap();
        assert_eq!(imported[0].id, PlayerId::new("X"));
        assert_eq!(imported[0].rank, 1);
        assert_eq!(imported[1].rank, 2);
    }

    #[test]
    fn import_rejects_wrong_schema() {
        let json = r#"{"schema":"something-else","exported_at":"2025-09-01T00:00:00Z","players":[]}"#;
        let err = import_board(json).unwrap_err();
        assert!(matches!(err, ExportError::Schema { .. }));
    }

    #[test]
    fn import_rejects_duplicate_ids() {
        let doc = BoardDocument {
            schema: "draftdeck-board".into(),
            exported_at: Utc::now(),
            players: vec![player("A", 1, false), player("A", 2, false)],
        };
        let json = serde_json::to_string(&doc).unwrap();
        let err = import_board(&json).unwrap_err();
        assert!(matches!(err, ExportError::DuplicateId(_)));
    }

    #[test]
    fn import_rejects_malformed_json() {
        let err = import_board("{not json").unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }
}
