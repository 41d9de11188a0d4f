//! Stats aggregator - lifetime combat statistics per participant

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::json::{load_json, save_json, StoreError};
use crate::game::{DamageLog, HitTally, RankingEntry};

/// Residue below this counts as zero after subtraction
const DAMAGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsEntry {
    #[serde(default)]
    pub matches: u64,
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub total_damage_dealt: f64,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub damage_to: BTreeMap<String, HitTally>,
    #[serde(default)]
    pub biggest_rival: String,
    /// Unix seconds of the most recent match
    #[serde(default)]
    pub last_played: i64,
}

impl StatsEntry {
    /// Opponent with the most cumulative damage; first in key order on ties
    pub fn rival(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (opponent, tally) in &self.damage_to {
            match best {
                Some((_, damage)) if tally.damage <= damage => {}
                _ => best = Some((opponent.as_str(), tally.damage)),
            }
        }
        best.map(|(opponent, _)| opponent)
    }

    fn refresh_rival(&mut self) {
        self.biggest_rival = self.rival().unwrap_or_default().to_string();
    }

    /// Nothing left worth keeping (last_played alone does not count)
    fn is_blank(&self) -> bool {
        self.matches == 0
            && self.wins == 0
            && self.total_hits == 0
            && self.total_damage_dealt <= DAMAGE_EPSILON
            && self.damage_to.is_empty()
    }
}

/// participant -> stats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsBook {
    entries: BTreeMap<String, StatsEntry>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&StatsEntry> {
        self.entries.get(username)
    }

    pub fn insert(&mut self, username: impl Into<String>, entry: StatsEntry) {
        self.entries.insert(username.into(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatsEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one run into the book. No deduplication: folding the same run
    /// twice counts it twice.
    pub fn apply_battle(&mut self, ranking: &[RankingEntry], damage_log: &DamageLog, now: i64) {
        for fighter in ranking {
            let username = fighter.username.trim();
            if username.is_empty() {
                continue;
            }
            let entry = self.entries.entry(username.to_string()).or_default();
            entry.matches += 1;
            if fighter.order == 1 {
                entry.wins += 1;
            }
            entry.last_played = now;
        }

        for (attacker, defender, tally) in damage_log.iter() {
            let entry = self.entries.entry(attacker.to_string()).or_default();
            entry.total_damage_dealt += tally.damage;
            entry.total_hits += tally.hits as u64;
            let against = entry.damage_to.entry(defender.to_string()).or_default();
            against.damage += tally.damage;
            against.hits += tally.hits;
        }

        self.refresh_rivals();
    }

    /// Subtract one run, flooring at zero. Opponent tallies and whole
    /// entries that drop back to zero are removed.
    pub fn revert_battle(&mut self, ranking: &[RankingEntry], damage_log: &DamageLog) {
        for fighter in ranking {
            let Some(entry) = self.entries.get_mut(fighter.username.trim()) else {
                continue;
            };
            entry.matches = entry.matches.saturating_sub(1);
            if fighter.order == 1 {
                entry.wins = entry.wins.saturating_sub(1);
            }
        }

        for (attacker, defender, tally) in damage_log.iter() {
            let Some(entry) = self.entries.get_mut(attacker) else {
                continue;
            };
            entry.total_damage_dealt = floor_damage(entry.total_damage_dealt - tally.damage);
            entry.total_hits = entry.total_hits.saturating_sub(tally.hits as u64);
            if let Some(against) = entry.damage_to.get_mut(defender) {
                against.damage = floor_damage(against.damage - tally.damage);
                against.hits = against.hits.saturating_sub(tally.hits);
                if against.is_empty() {
                    entry.damage_to.remove(defender);
                }
            }
        }

        self.entries.retain(|_, entry| !entry.is_blank());
        self.refresh_rivals();
    }

    fn refresh_rivals(&mut self) {
        for entry in self.entries.values_mut() {
            entry.refresh_rival();
        }
    }
}

fn floor_damage(value: f64) -> f64 {
    if value <= DAMAGE_EPSILON {
        0.0
    } else {
        value
    }
}

/// Stats document operations
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> StatsBook {
        load_json(&self.path)
    }

    pub fn save(&self, book: &StatsBook) -> Result<(), StoreError> {
        save_json(&self.path, book)
    }

    pub fn record_battle(
        &self,
        ranking: &[RankingEntry],
        damage_log: &DamageLog,
        now: i64,
    ) -> Result<StatsBook, StoreError> {
        let mut book = self.load();
        book.apply_battle(ranking, damage_log, now);
        self.save(&book)?;
        info!(
            participants = ranking.len(),
            hits = damage_log.total_hits(),
            "Stats updated"
        );
        Ok(book)
    }

    pub fn revert_battle(
        &self,
        ranking: &[RankingEntry],
        damage_log: &DamageLog,
    ) -> Result<StatsBook, StoreError> {
        let mut book = self.load();
        book.revert_battle(ranking, damage_log);
        self.save(&book)?;
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scratch_dir;

    fn entry(name: &str, order: u32) -> RankingEntry {
        RankingEntry {
            username: name.to_string(),
            order,
            final_health: 0.0,
        }
    }

    fn sample_run() -> (Vec<RankingEntry>, DamageLog) {
        let ranking = vec![entry("ana", 1), entry("bo", 2), entry("cy", 3)];
        let mut log = DamageLog::new();
        log.record("ana", "bo", 12.0);
        log.record("ana", "bo", 7.0);
        log.record("ana", "cy", 9.0);
        log.record("bo", "ana", 5.0);
        log.record("cy", "ana", 3.0);
        (ranking, log)
    }

    #[test]
    fn test_apply_battle_totals() {
        let (ranking, log) = sample_run();
        let mut book = StatsBook::new();
        book.apply_battle(&ranking, &log, 1_700_000_000);

        let ana = book.get("ana").unwrap();
        assert_eq!(ana.matches, 1);
        assert_eq!(ana.wins, 1);
        assert_eq!(ana.total_damage_dealt, 28.0);
        assert_eq!(ana.total_hits, 3);
        assert_eq!(ana.damage_to["bo"], HitTally { damage: 19.0, hits: 2 });
        assert_eq!(ana.biggest_rival, "bo");
        assert_eq!(ana.last_played, 1_700_000_000);

        let bo = book.get("bo").unwrap();
        assert_eq!(bo.wins, 0);
        assert_eq!(bo.biggest_rival, "ana");
    }

    #[test]
    fn test_totals_match_damage_to() {
        let (ranking, log) = sample_run();
        let mut book = StatsBook::new();
        book.apply_battle(&ranking, &log, 0);
        for (_, stats) in book.iter() {
            let damage: f64 = stats.damage_to.values().map(|t| t.damage).sum();
            let hits: u64 = stats.damage_to.values().map(|t| t.hits as u64).sum();
            assert_eq!(stats.total_damage_dealt, damage);
            assert_eq!(stats.total_hits, hits);
        }
    }

    #[test]
    fn test_applying_twice_doubles_counters() {
        let (ranking, log) = sample_run();
        let mut once = StatsBook::new();
        once.apply_battle(&ranking, &log, 0);
        let mut twice = StatsBook::new();
        twice.apply_battle(&ranking, &log, 0);
        twice.apply_battle(&ranking, &log, 0);

        for (name, single) in once.iter() {
            let double = twice.get(name).unwrap();
            assert_eq!(double.matches, single.matches * 2);
            assert_eq!(double.wins, single.wins * 2);
            assert_eq!(double.total_hits, single.total_hits * 2);
            assert_eq!(double.total_damage_dealt, single.total_damage_dealt * 2.0);
        }
    }

    #[test]
    fn test_rival_tie_takes_first_key() {
        let mut stats = StatsEntry::default();
        stats.damage_to.insert("zed".into(), HitTally { damage: 10.0, hits: 1 });
        stats.damage_to.insert("amy".into(), HitTally { damage: 10.0, hits: 2 });
        assert_eq!(stats.rival(), Some("amy"));
        assert_eq!(StatsEntry::default().rival(), None);
    }

    #[test]
    fn test_revert_restores_previous_book() {
        let (ranking, log) = sample_run();
        let mut book = StatsBook::new();
        book.apply_battle(&[entry("ana", 1), entry("dee", 2)], &DamageLog::new(), 5);
        let before = book.clone();

        book.apply_battle(&ranking, &log, 9);
        book.revert_battle(&ranking, &log);

        assert!(book.get("bo").is_none());
        assert!(book.get("cy").is_none());
        let ana = book.get("ana").unwrap();
        let prior = before.get("ana").unwrap();
        assert_eq!(ana.matches, prior.matches);
        assert_eq!(ana.wins, prior.wins);
        assert!(ana.damage_to.is_empty());
        assert_eq!(ana.biggest_rival, "");
        assert_eq!(book.get("dee"), before.get("dee"));
    }

    #[test]
    fn test_store_round_trip_tolerates_partial_entries() {
        let dir = scratch_dir();
        let store = StatsStore::new(dir.join("stats.json"));
        std::fs::write(store.path(), br#"{"ana": {"matches": 3}}"#).unwrap();

        let (ranking, log) = sample_run();
        store.record_battle(&ranking, &log, 42).unwrap();
        let book = store.load();
        assert_eq!(book.get("ana").unwrap().matches, 4);
        assert_eq!(book.get("cy").unwrap().last_played, 42);
    }
}
