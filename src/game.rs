//! The persisted run record: game metadata, attempt counters and split
//! definitions
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

fn default_display_pb() -> bool {
    true
}

/// One checkpoint definition with its stored best times. The `*_total_ms`
/// fields are running sums derived on load and after reconciliation, never
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub split_name: String,
    /// Cumulative time-from-start at this checkpoint on the best overall run
    pub pb_time_ms: i64,
    /// This segment's own duration on the best overall run
    pub pb_segment_ms: i64,
    /// Best-ever duration for this segment, independent of any full run
    pub gold_segment_ms: i64,
    #[serde(skip)]
    pub pb_segment_total_ms: i64,
    #[serde(skip)]
    pub gold_segment_total_ms: i64,
}

impl SplitRecord {
    pub fn new(split_name: &str, pb_time_ms: i64, pb_segment_ms: i64, gold_segment_ms: i64) -> Self {
        Self {
            split_name: split_name.to_string(),
            pb_time_ms,
            pb_segment_ms,
            gold_segment_ms,
            pb_segment_total_ms: 0,
            gold_segment_total_ms: 0,
        }
    }
}

/// A game and the splits tracked during a run of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub title: String,
    pub sub_title: String,
    pub lifetime_attempts: u64,
    #[serde(default)]
    pub session_attempts: u64,
    #[serde(default = "default_display_pb")]
    pub display_pb: bool,
    pub splits: Vec<SplitRecord>,
}

impl Game {
    pub fn new(title: &str, sub_title: &str, splits: Vec<SplitRecord>) -> Result<Game, Error> {
        let mut game = Game {
            title: title.to_string(),
            sub_title: sub_title.to_string(),
            lifetime_attempts: 0,
            session_attempts: 0,
            display_pb: true,
            splits,
        };
        game.validate()?;
        game.recompute_totals();
        Ok(game)
    }

    /// Parse a game from its JSON representation. Fails on malformed JSON or
    /// missing required fields rather than defaulting, so a corrupt record
    /// never silently wipes stored bests.
    pub fn from_json_str(json: &str) -> Result<Game, Error> {
        let mut game: Game =
            serde_json::from_str(json).map_err(|e| Error::Game(format!("invalid game record: {e}")))?;
        game.validate()?;
        game.recompute_totals();
        Ok(game)
    }

    pub fn from_json_file(path: &Path) -> Result<Game, Error> {
        let file = File::open(path)
            .map_err(|e| Error::Game(format!("could not open {}: {e}", path.display())))?;
        let mut reader = BufReader::new(file);
        let mut json = String::new();
        reader
            .read_to_string(&mut json)
            .map_err(|e| Error::Game(format!("could not read {}: {e}", path.display())))?;
        Game::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Game(format!("{e}")))
    }

    pub fn to_json_file(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path)
            .map_err(|e| Error::Game(format!("could not create {}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);
        let json = self.to_json()?;
        writer
            .write_all(json.as_bytes())
            .map_err(|e| Error::Game(format!("could not write {}: {e}", path.display())))
    }

    fn validate(&self) -> Result<(), Error> {
        if self.splits.is_empty() {
            return Err(Error::Game("a game needs at least one split".to_string()));
        }
        Ok(())
    }

    /// Rebuild the derived segment totals:
    /// `pb_segment_total_ms[i] = pb_segment_total_ms[i-1] + pb_segment_ms[i]`
    /// and the same recurrence for gold. Must run after every full reload and
    /// after reconciliation mutates segment times.
    pub fn recompute_totals(&mut self) {
        let mut pb_total = 0;
        let mut gold_total = 0;
        for split in &mut self.splits {
            pb_total += split.pb_segment_ms;
            gold_total += split.gold_segment_ms;
            split.pb_segment_total_ms = pb_total;
            split.gold_segment_total_ms = gold_total;
        }
    }

    /// Count one attempt, both for this session and for the record's lifetime
    pub fn add_attempt(&mut self) {
        self.session_attempts += 1;
        self.lifetime_attempts += 1;
    }
}
