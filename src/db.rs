// SQLite persistence for named saved rankings.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::board::player::Player;

/// A saved-ranking directory entry (without the player payload).
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub player_count: usize,
}

/// Result of a save request. `NameTaken` is returned instead of
/// overwriting so the presentation layer can ask for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NameTaken,
}

/// SQLite-backed store for named ranking lists. The player array is
/// stored as a JSON column; rankings are keyed by user-chosen name.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database in tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rankings (
                name     TEXT PRIMARY KEY,
                players  TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Save a ranking under `name`. When a ranking with that name already
    /// exists and `overwrite` is false, nothing is written and
    /// `NameTaken` is returned; with `overwrite` set the row is replaced.
    pub fn save_ranking(
        &self,
        name: &str,
        players: &[Player],
        overwrite: bool,
    ) -> Result<SaveOutcome> {
        let conn = self.conn();
        let payload =
            serde_json::to_string(players).context("failed to serialize ranking players")?;
        let saved_at = Utc::now().to_rfc3339();

        let sql = if overwrite {
            "INSERT OR REPLACE INTO rankings (name, players, saved_at) VALUES (?1, ?2, ?3)"
        } else {
            "INSERT OR IGNORE INTO rankings (name, players, saved_at) VALUES (?1, ?2, ?3)"
        };
        let changed = conn
            .execute(sql, params![name, payload, saved_at])
            .context("failed to save ranking")?;

        if changed == 0 {
            Ok(SaveOutcome::NameTaken)
        } else {
            Ok(SaveOutcome::Saved)
        }
    }

    /// Load the player array saved under `name`. `None` if no ranking
    /// with that name exists.
    pub fn load_ranking(&self, name: &str) -> Result<Option<Vec<Player>>> {
        let conn = self.conn();
        let payload: Option<String> = conn
            .query_row(
                "SELECT players FROM rankings WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query ranking")?;

        match payload {
            Some(json) => {
                let players: Vec<Player> = serde_json::from_str(&json)
                    .context("failed to deserialize ranking players")?;
                Ok(Some(players))
            }
            None => Ok(None),
        }
    }

    /// List saved rankings, most recent first.
    pub fn list_rankings(&self) -> Result<Vec<RankingEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name, players, saved_at FROM rankings ORDER BY saved_at DESC")
            .context("failed to prepare ranking list query")?;

        let entries = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let payload: String = row.get(1)?;
                let saved_at: String = row.get(2)?;
                Ok((name, payload, saved_at))
            })
            .context("failed to query rankings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ranking rows")?;

        entries
            .into_iter()
            .map(|(name, payload, saved_at)| {
                let players: Vec<Player> = serde_json::from_str(&payload)
                    .context("failed to deserialize ranking players")?;
                let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                    .context("failed to parse saved_at timestamp")?
                    .with_timezone(&Utc);
                Ok(RankingEntry {
                    name,
                    saved_at,
                    player_count: players.len(),
                })
            })
            .collect()
    }

    /// Delete the ranking saved under `name`. Returns whether a row was
    /// actually removed.
    pub fn delete_ranking(&self, name: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM rankings WHERE name = ?1", params![name])
            .context("failed to delete ranking")?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::player::{PlayerId, Position};
    use std::collections::BTreeSet;

    fn players(ids: &[&str]) -> Vec<Player> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Player {
                id: PlayerId::new(*id),
                rank: (i + 1) as u32,
                name: format!("Player {id}"),
                team: None,
                position: Position::Qb,
                drafted: false,
                tags: BTreeSet::new(),
            })
            .collect()
    }

    #[test]
    fn save_and_load_round_trip() {
        let db = Database::open(":memory:").unwrap();
        let roster = players(&["A", "B", "C"]);

        assert_eq!(
            db.save_ranking("week one", &roster, false).unwrap(),
            SaveOutcome::Saved
        );
        let loaded = db.load_ranking("week one").unwrap().unwrap();
        assert_eq!(loaded, roster);
    }

    #[test]
    fn load_missing_name_returns_none() {
        let db = Database::open(":memory:").unwrap();
        assert!(db.load_ranking("nope").unwrap().is_none());
    }

    #[test]
    fn save_without_overwrite_reports_name_taken() {
        let db = Database::open(":memory:").unwrap();
        let first = players(&["A"]);
        let second = players(&["B"]);

        db.save_ranking("mine", &first, false).unwrap();
        assert_eq!(
            db.save_ranking("mine", &second, false).unwrap(),
            SaveOutcome::NameTaken
        );
        // Original payload untouched.
        let loaded = db.load_ranking("mine").unwrap().unwrap();
        assert_eq!(loaded, first);
    }

    #[test]
    fn save_with_overwrite_replaces_payload() {
        let db = Database::open(":memory:").unwrap();
        let first = players(&["A"]);
        let second = players(&["B", "C"]);

        db.save_ranking("mine", &first, false).unwrap();
        assert_eq!(
            db.save_ranking("mine", &second, true).unwrap(),
            SaveOutcome::Saved
        );
        let loaded = db.load_ranking("mine").unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn list_reports_names_and_counts() {
        let db = Database::open(":memory:").unwrap();
        db.save_ranking("alpha", &players(&["A", "B"]), false).unwrap();
        db.save_ranking("beta", &players(&["C"]), false).unwrap();

        let entries = db.list_rankings().unwrap();
        assert_eq!(entries.len(), 2);
        let counts: Vec<(String, usize)> = entries
            .iter()
            .map(|e| (e.name.clone(), e.player_count))
            .collect();
        assert!(counts.contains(&("alpha".to_string(), 2)));
        assert!(counts.contains(&("beta".to_string(), 1)));
    }

    #[test]
    fn delete_removes_row_and_reports_missing() {
        let db = Database::open(":memory:").unwrap();
        db.save_ranking("gone soon", &players(&["A"]), false).unwrap();

        assert!(db.delete_ranking("gone soon").unwrap());
        assert!(db.load_ranking("gone soon").unwrap().is_none());
        assert!(!db.delete_ranking("gone soon").unwrap());
    }
}
