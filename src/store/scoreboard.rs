//! Score ledger - cumulative points and runs per participant

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::json::{load_json, save_json, StoreError};
use super::stats::StatsBook;
use crate::game::RankingEntry;

/// Points for finishing at `order` out of `total`: N - k + 1.
/// Orders outside 1..=N earn nothing.
pub fn points_for(order: u32, total: usize) -> u64 {
    let order = order as u64;
    let total = total as u64;
    if order == 0 || order > total {
        0
    } else {
        total - order + 1
    }
}

/// Total points one run hands out
pub fn points_for_run(participants: usize) -> u64 {
    let n = participants as u64;
    n * (n + 1) / 2
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub runs: u64,
}

/// participant -> {points, runs}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scoreboard {
    entries: BTreeMap<String, ScoreEntry>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&ScoreEntry> {
        self.entries.get(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScoreEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Award one run's points; returns the points handed out
    pub fn apply_ranking(&mut self, ranking: &[RankingEntry]) -> u64 {
        let total = ranking.len();
        let mut awarded = 0;
        for fighter in ranking {
            let username = fighter.username.trim();
            if username.is_empty() {
                continue;
            }
            let points = points_for(fighter.order, total);
            let entry = self.entries.entry(username.to_string()).or_default();
            entry.points += points;
            entry.runs += 1;
            awarded += points;
        }
        awarded
    }

    /// Take one run's points back, flooring at zero and dropping entries
    /// that return to nothing
    pub fn revert_ranking(&mut self, ranking: &[RankingEntry]) {
        let total = ranking.len();
        for fighter in ranking {
            let username = fighter.username.trim();
            let Some(entry) = self.entries.get_mut(username) else {
                continue;
            };
            entry.points = entry.points.saturating_sub(points_for(fighter.order, total));
            entry.runs = entry.runs.saturating_sub(1);
            if entry.points == 0 && entry.runs == 0 {
                self.entries.remove(username);
            }
        }
    }
}

/// One leaderboard line (scoreboard joined with stats)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub username: String,
    pub points: u64,
    pub runs: u64,
    pub wins: u64,
    pub damage: f64,
}

/// Rows sorted by points, wins, runs, damage (all descending), then name
pub fn leaderboard(board: &Scoreboard, stats: &StatsBook) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = board
        .iter()
        .map(|(username, entry)| {
            let (wins, damage) = stats
                .get(username)
                .map(|s| (s.wins, s.total_damage_dealt))
                .unwrap_or((0, 0.0));
            LeaderboardRow {
                username: username.to_string(),
                points: entry.points,
                runs: entry.runs,
                wins,
                damage,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| b.runs.cmp(&a.runs))
            .then_with(|| b.damage.total_cmp(&a.damage))
            .then_with(|| a.username.cmp(&b.username))
    });
    rows
}

/// Scoreboard document operations
#[derive(Debug, Clone)]
pub struct ScoreboardStore {
    path: PathBuf,
}

impl ScoreboardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current scoreboard (empty when missing or unreadable)
    pub fn load(&self) -> Scoreboard {
        load_json(&self.path)
    }

    pub fn save(&self, board: &Scoreboard) -> Result<(), StoreError> {
        save_json(&self.path, board)
    }

    /// Apply a run's ranking in one document write
    pub fn record_run(&self, ranking: &[RankingEntry]) -> Result<Scoreboard, StoreError> {
        let mut board = self.load();
        let awarded = board.apply_ranking(ranking);
        self.save(&board)?;
        info!(
            participants = ranking.len(),
            points = awarded,
            "Scoreboard updated"
        );
        Ok(board)
    }

    /// Subtract a run's ranking in one document write
    pub fn revert_run(&self, ranking: &[RankingEntry]) -> Result<Scoreboard, StoreError> {
        let mut board = self.load();
        board.revert_ranking(ranking);
        self.save(&board)?;
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::HitTally;
    use crate::store::scratch_dir;
    use crate::store::stats::StatsEntry;

    fn ranking(names: &[&str]) -> Vec<RankingEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RankingEntry {
                username: name.to_string(),
                order: i as u32 + 1,
                final_health: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_points_sum_matches_formula() {
        for n in [1usize, 2, 5, 50] {
            let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut board = Scoreboard::new();
            let awarded = board.apply_ranking(&ranking(&refs));
            assert_eq!(awarded, (n * (n + 1) / 2) as u64);
            assert_eq!(awarded, points_for_run(n));
            let sum: u64 = board.iter().map(|(_, e)| e.points).sum();
            assert_eq!(sum, awarded);
        }
    }

    #[test]
    fn test_four_fighter_scenario() {
        let mut board = Scoreboard::new();
        let mut run = ranking(&["D", "B", "A", "C"]);
        run[0].final_health = 62.0;
        board.apply_ranking(&run);

        assert_eq!(board.get("D"), Some(&ScoreEntry { points: 4, runs: 1 }));
        assert_eq!(board.get("B"), Some(&ScoreEntry { points: 3, runs: 1 }));
        assert_eq!(board.get("A"), Some(&ScoreEntry { points: 2, runs: 1 }));
        assert_eq!(board.get("C"), Some(&ScoreEntry { points: 1, runs: 1 }));
    }

    #[test]
    fn test_revert_is_symmetric_and_drops_new_entries() {
        let mut board = Scoreboard::new();
        board.apply_ranking(&ranking(&["A", "B"]));
        let before = board.clone();

        let run = ranking(&["C", "A", "B"]);
        board.apply_ranking(&run);
        board.revert_ranking(&run);

        assert_eq!(board, before);
        assert!(board.get("C").is_none());
    }

    #[test]
    fn test_revert_floors_at_zero() {
        let mut board = Scoreboard::new();
        board.apply_ranking(&ranking(&["A", "B", "C"]));
        // Reverting twice must not go negative or resurrect entries
        board.revert_ranking(&ranking(&["A", "B", "C"]));
        board.revert_ranking(&ranking(&["A", "B", "C"]));
        assert!(board.is_empty());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = scratch_dir();
        let store = ScoreboardStore::new(dir.join("scoreboard.json"));
        assert!(store.load().is_empty());

        store.record_run(&ranking(&["A", "B"])).unwrap();
        store.record_run(&ranking(&["B", "A"])).unwrap();
        let board = store.load();
        assert_eq!(board.get("A"), Some(&ScoreEntry { points: 3, runs: 2 }));
        assert_eq!(board.get("B"), Some(&ScoreEntry { points: 3, runs: 2 }));

        let text = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["A"], serde_json::json!({"points": 3, "runs": 2}));
    }

    #[test]
    fn test_leaderboard_order() {
        let mut board = Scoreboard::new();
        board.apply_ranking(&ranking(&["A", "B", "C"]));
        board.apply_ranking(&ranking(&["B", "A", "C"]));

        let mut stats = StatsBook::new();
        let mut b = StatsEntry::default();
        b.wins = 1;
        b.damage_to.insert("A".to_string(), HitTally { damage: 10.0, hits: 1 });
        b.total_damage_dealt = 10.0;
        stats.insert("B", b);

        let rows = leaderboard(&board, &stats);
        let names: Vec<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        // A and B tie on points (5); B has the win
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(rows[0].damage, 10.0);
        assert_eq!(rows[2].points, 2);
    }
}
