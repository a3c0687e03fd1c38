use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Language, WritingSystem};
use crate::store::json_store::KeyValueStorage;

/// Storage key the whole table is persisted under.
pub const SCORES_KEY: &str = "scores";

/// Highest mistake count kept per character. Larger persisted values are
/// treated as corrupt.
pub const MAX_SCORE: u32 = 1000;

/// Character id -> mistake count.
pub type CharacterScores = BTreeMap<String, u32>;

pub fn score_key(language: &Language, writing_system: &WritingSystem) -> String {
    format!("{}:{}", language.code, writing_system.name)
}

/// Mistake counters per `"{language}:{writing_system}"` key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    entries: BTreeMap<String, CharacterScores>,
}

impl ScoreTable {
    /// Parse persisted JSON, keeping every entry that is well formed.
    /// Anything that is not an object of objects of integers in
    /// `0..=MAX_SCORE` is dropped rather than failing the whole table.
    pub fn from_json_lenient(content: &str) -> Self {
        let Ok(Value::Object(root)) = serde_json::from_str::<Value>(content) else {
            return Self::default();
        };

        let mut entries = BTreeMap::new();
        for (key, value) in root {
            let Value::Object(scores) = value else {
                continue;
            };
            let scores: CharacterScores = scores
                .into_iter()
                .filter_map(|(id, n)| {
                    let n = u32::try_from(n.as_u64()?).ok()?;
                    if n > MAX_SCORE {
                        log::warn!("dropping out-of-range score {n} for {id}");
                        return None;
                    }
                    Some((id, n))
                })
                .collect();
            entries.insert(key, scores);
        }
        Self { entries }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&CharacterScores> {
        self.entries.get(key)
    }

    pub fn score(&self, key: &str, character_id: &str) -> u32 {
        self.entries
            .get(key)
            .and_then(|scores| scores.get(character_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Score persistence on top of a key-value storage. Every mutation is
/// written through immediately; storage failures are logged and the
/// in-memory table stays authoritative for the rest of the run.
pub struct ScoreStore {
    storage: Box<dyn KeyValueStorage>,
}

impl ScoreStore {
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> ScoreTable {
        match self.storage.get(SCORES_KEY) {
            Some(content) => ScoreTable::from_json_lenient(&content),
            None => ScoreTable::default(),
        }
    }

    pub fn save(&mut self, table: &ScoreTable) {
        let json = match serde_json::to_string_pretty(table) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not serialize scores: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(SCORES_KEY, &json) {
            log::warn!("could not persist scores, continuing in memory: {e}");
        }
    }

    /// Seed a zero score for every character of the writing system.
    /// Returns whether an entry already existed before the call.
    pub fn ensure_seeded(
        &mut self,
        table: &mut ScoreTable,
        language: &Language,
        writing_system: &WritingSystem,
    ) -> bool {
        let key = score_key(language, writing_system);
        let existed = table.contains(&key);
        let scores = table.entries.entry(key).or_default();

        let mut changed = !existed;
        for character in &writing_system.characters {
            if !scores.contains_key(character.id()) {
                scores.insert(character.id().to_string(), 0);
                changed = true;
            }
        }

        if changed {
            self.save(table);
        }
        existed
    }

    /// Increment on failure (capped at `MAX_SCORE`), decrement (floored at
    /// zero) on success.
    /// Returns the new score.
    pub fn update(
        &mut self,
        table: &mut ScoreTable,
        language: &Language,
        writing_system: &WritingSystem,
        character_id: &str,
        failed: bool,
    ) -> u32 {
        let key = score_key(language, writing_system);
        let score = table
            .entries
            .entry(key)
            .or_default()
            .entry(character_id.to_string())
            .or_insert(0);
        *score = if failed {
            score.saturating_add(1).min(MAX_SCORE)
        } else {
            score.saturating_sub(1)
        };
        let new_score = *score;

        self.save(table);
        new_score
    }
}
