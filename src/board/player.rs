// Core player model: identifiers, positions, tags, and the Player record
// that the roster store owns.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable external player identifier (opaque string from the catalog
/// source). Immutable once a player is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Football positions tracked on the board. Records with any other
/// position string are dropped at normalization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Qb,
    Rb,
    Wr,
    Te,
    K,
    Def,
}

impl Position {
    /// Parse a catalog position string. Returns `None` for positions
    /// outside the tracked allow-list (IDP slots, offensive linemen, etc.).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QB" => Some(Position::Qb),
            "RB" => Some(Position::Rb),
            "WR" => Some(Position::Wr),
            "TE" => Some(Position::Te),
            "K" => Some(Position::K),
            "DEF" | "DST" => Some(Position::Def),
            _ => None,
        }
    }

    /// Display string matching the catalog's abbreviations.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Qb => "QB",
            Position::Rb => "RB",
            Position::Wr => "WR",
            Position::Te => "TE",
            Position::K => "K",
            Position::Def => "DEF",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Position filter for board projection. `All` is the sentinel that
/// disables the position predicate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFilter {
    All,
    Only(Position),
}

impl PositionFilter {
    pub fn matches(&self, pos: Position) -> bool {
        match self {
            PositionFilter::All => true,
            PositionFilter::Only(p) => *p == pos,
        }
    }
}

/// User-applied board tags. Fixed small vocabulary; purely user-owned
/// and never touched by catalog or feed sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Rookie,
    Target,
    Avoid,
    Sleeper,
}

impl Tag {
    pub fn display_str(&self) -> &'static str {
        match self {
            Tag::Rookie => "rookie",
            Tag::Target => "target",
            Tag::Avoid => "avoid",
            Tag::Sleeper => "sleeper",
        }
    }
}

/// A single player on the board.
///
/// `rank` is dense (1..N, no gaps) across the undrafted partition after
/// every committed store operation. For drafted players the rank is frozen
/// at its time-of-draft value and used to restore board position if the
/// player is un-drafted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub rank: u32,
    pub name: String,
    /// `None` for free agents; the catalog reports no team for them.
    pub team: Option<String>,
    pub position: Position,
    pub drafted: bool,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
}

impl Player {
    /// Toggle tag membership. Idempotent in the sense that toggling the
    /// same tag twice restores the original set.
    pub fn toggle_tag(&mut self, tag: Tag) {
        if !self.tags.remove(&tag) {
            self.tags.insert(tag);
        }
    }

    /// Set or unset a tag explicitly. Returns whether the set changed.
    pub fn set_tag(&mut self, tag: Tag, present: bool) -> bool {
        if present {
            self.tags.insert(tag)
        } else {
            self.tags.remove(&tag)
        }
    }
}
