//! Top-10 leaderboard per game
//!
//! Stored through the persistence port as a JSON array of
//! `{identifier, score}` sorted by score, highest first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::LEADERBOARD_SIZE;
use crate::persistence::{self, ScoreStore};

/// Characters an identifier may use, in the order the entry screen cycles them
pub const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// A 3-character player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Initials([u8; 3]);

impl Initials {
    pub fn new(text: &str) -> Option<Self> {
        let bytes: [u8; 3] = text.as_bytes().try_into().ok()?;
        bytes
            .iter()
            .all(|b| CHARSET.contains(b))
            .then_some(Self(bytes))
    }

    pub fn as_str(&self) -> &str {
        // CHARSET is ASCII, so this never fails
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl Default for Initials {
    fn default() -> Self {
        Self(*b"AAA")
    }
}

impl fmt::Display for Initials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Initials {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| format!("invalid identifier {value:?}"))
    }
}

impl From<Initials> for String {
    fn from(value: Initials) -> Self {
        value.as_str().to_string()
    }
}

/// In-progress initials on the entry screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitialsEditor {
    slots: [usize; 3],
    cursor: usize,
}

impl InitialsEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Step the character under the cursor through the charset (wrapping)
    pub fn cycle(&mut self, forward: bool) {
        let n = CHARSET.len();
        let slot = &mut self.slots[self.cursor];
        *slot = if forward { (*slot + 1) % n } else { (*slot + n - 1) % n };
    }

    pub fn move_cursor(&mut self, right: bool) {
        self.cursor = if right {
            (self.cursor + 1).min(2)
        } else {
            self.cursor.saturating_sub(1)
        };
    }

    /// Confirm the current slot; returns the initials once the last slot is confirmed
    pub fn advance(&mut self) -> Option<Initials> {
        if self.cursor < 2 {
            self.cursor += 1;
            None
        } else {
            Some(self.current())
        }
    }

    pub fn current(&self) -> Initials {
        Initials(self.slots.map(|i| CHARSET[i % CHARSET.len()]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub identifier: Initials,
    pub score: u64,
}

/// Descending, capped list of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Check if a score earns a place
    pub fn qualifies(&self, score: u64) -> bool {
        if self.entries.len() < LEADERBOARD_SIZE {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Rank (1-based) a score would take, None if it doesn't qualify
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert, keep sorted, truncate. Returns the rank taken.
    pub fn insert(&mut self, identifier: Initials, score: u64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.entries.insert(rank - 1, LeaderboardEntry { identifier, score });
        self.entries.truncate(LEADERBOARD_SIZE);
        Some(rank)
    }

    /// Parse stored JSON; anything malformed yields an empty board
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<Vec<LeaderboardEntry>>(text) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.score.cmp(&a.score));
                entries.truncate(LEADERBOARD_SIZE);
                Self { entries }
            }
            Err(err) => {
                log::warn!("malformed leaderboard ({err}), starting fresh");
                Self::new()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }

    /// Read from the store; unavailable or malformed data gives an empty board
    pub fn load(store: &dyn ScoreStore, key: &str) -> Self {
        match store.load(key) {
            Ok(Some(text)) => {
                let board = Self::from_json(&text);
                log::info!("loaded {} leaderboard entries from {key}", board.len());
                board
            }
            Ok(None) => Self::new(),
            Err(err) => {
                log::warn!("leaderboard {key} unavailable: {err}");
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn ScoreStore, key: &str) -> persistence::Result<()> {
        store.save(key, &self.to_json()?)?;
        log::info!("leaderboard saved to {key} ({} entries)", self.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{FailingStore, MemoryStore};
    use proptest::prelude::*;

    fn initials(s: &str) -> Initials {
        Initials::new(s).expect("valid initials")
    }

    fn full_board() -> Leaderboard {
        let mut board = Leaderboard::new();
        for i in 0..10u64 {
            board.insert(initials("ABC"), 1_000 + i * 100);
        }
        board
    }

    #[test]
    fn test_initials_validation() {
        assert!(Initials::new("A1 ").is_some());
        assert!(Initials::new("ab1").is_none());
        assert!(Initials::new("ABCD").is_none());
        assert!(Initials::new("AB").is_none());
    }

    #[test]
    fn test_qualifies_until_full() {
        let mut board = Leaderboard::new();
        assert!(board.qualifies(0));
        assert_eq!(board.potential_rank(0), Some(1));
        board.insert(initials("ONE"), 5);
        assert_eq!(board.potential_rank(0), Some(2));
        assert_eq!(board.insert(initials("NIL"), 0), Some(2));

        board = full_board();
        assert!(!board.qualifies(0));
        assert!(!board.qualifies(999));
        assert!(!board.qualifies(1_000));
        assert!(board.qualifies(1_001));
    }

    #[test]
    fn test_evicts_lowest_when_full() {
        let mut board = full_board();
        assert_eq!(board.entries().last().map(|e| e.score), Some(1_000));
        let rank = board.insert(initials("NEW"), 1_001);
        assert_eq!(rank, Some(10));
        assert_eq!(board.len(), 10);
        assert!(board.entries().iter().all(|e| e.score != 1_000));
        assert_eq!(board.entries().last().map(|e| e.identifier), Some(initials("NEW")));
    }

    #[test]
    fn test_ties_rank_below_existing() {
        let mut board = Leaderboard::new();
        board.insert(initials("OLD"), 500);
        assert_eq!(board.insert(initials("NEW"), 500), Some(2));
    }

    #[test]
    fn test_json_format() {
        let mut board = Leaderboard::new();
        board.insert(initials("ZED"), 42);
        let json = board.to_json().unwrap_or_default();
        assert_eq!(json, r#"[{"identifier":"ZED","score":42}]"#);
        assert_eq!(Leaderboard::from_json(&json), board);
    }

    #[test]
    fn test_malformed_is_empty() {
        assert!(Leaderboard::from_json("not json").is_empty());
        assert!(Leaderboard::from_json(r#"[{"identifier":"TOOLONG","score":1}]"#).is_empty());
        assert!(Leaderboard::from_json(r#"[{"identifier":"ABC","score":-5}]"#).is_empty());
    }

    #[test]
    fn test_load_save_through_store() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        let mut board = Leaderboard::new();
        board.insert(initials("AAA"), 10);
        assert!(board.save(&mut writer, "snake_scores").is_ok());
        assert_eq!(Leaderboard::load(&store, "snake_scores"), board);

        let mut failing = FailingStore::new();
        assert!(board.save(&mut failing, "snake_scores").is_err());
        failing.fail_reads = true;
        assert!(Leaderboard::load(&failing, "snake_scores").is_empty());
    }

    #[test]
    fn test_editor_cycles_and_confirms() {
        let mut editor = InitialsEditor::new();
        editor.cycle(false);
        assert_eq!(editor.current().as_str(), " AA");
        assert_eq!(editor.advance(), None);
        editor.cycle(true);
        editor.move_cursor(false);
        editor.move_cursor(true);
        assert_eq!(editor.advance(), None);
        let done = editor.advance();
        assert_eq!(done.map(|i| i.to_string()), Some(" BA".to_string()));
    }

    proptest! {
        #[test]
        fn prop_board_invariants(scores in proptest::collection::vec(0u64..100_000, 0..40)) {
            let mut board = Leaderboard::new();
            for score in scores {
                board.insert(initials("XYZ"), score);
                prop_assert!(board.len() <= LEADERBOARD_SIZE);
                prop_assert!(board.entries().windows(2).all(|w| w[0].score >= w[1].score));
                prop_assert!(board.entries().iter().all(|e| e.identifier.as_str().len() == 3));
            }
        }
    }
}
