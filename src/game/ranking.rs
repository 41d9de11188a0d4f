//! Match result and ranking system
//!
//! Turns elimination order into a strict finishing order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{DeathMarker, Fighter};

/// One line of a run's final standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub username: String,
    /// 1 = winner, N = first eliminated
    pub order: u32,
    pub final_health: f32,
}

/// Build the finishing order once the battle has terminated.
///
/// Survivors beyond the first (only possible when the step cap hit) are
/// ranked by ascending health and given markers after `end_step`. A lone
/// survivor always ranks first.
pub fn build_ranking(fighters: &[Fighter], end_step: u64) -> Vec<RankingEntry> {
    let mut markers: Vec<Option<DeathMarker>> = fighters.iter().map(|f| f.death).collect();

    let mut survivors: Vec<usize> = (0..fighters.len())
        .filter(|&i| markers[i].is_none())
        .collect();
    if survivors.len() > 1 {
        survivors.sort_by(|&a, &b| fighters[a].health.total_cmp(&fighters[b].health));
        for (offset, &idx) in survivors.iter().enumerate() {
            markers[idx] = Some(DeathMarker {
                step: end_step + 1 + offset as u64,
                seq: 0,
            });
        }
    }

    let latest = markers.iter().flatten().max().copied();
    let mut next = latest.map_or(DeathMarker { step: 0, seq: 0 }, |m| DeathMarker {
        step: m.step + 1,
        seq: 0,
    });
    let mut placed: Vec<(DeathMarker, usize)> = Vec::with_capacity(fighters.len());
    for (idx, marker) in markers.into_iter().enumerate() {
        let marker = marker.unwrap_or_else(|| {
            let assigned = next;
            next.step += 1;
            assigned
        });
        placed.push((marker, idx));
    }

    // Latest death finishes best
    placed.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    placed
        .into_iter()
        .enumerate()
        .map(|(position, (_, idx))| RankingEntry {
            username: fighters[idx].username.clone(),
            order: position as u32 + 1,
            final_health: fighters[idx].health.max(0.0),
        })
        .collect()
}

/// Ranking problems that make a persisted ranking unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("ranking is empty")]
    Empty,

    #[error("entry {0} has a blank username")]
    BlankUsername(usize),

    #[error("username {0:?} appears more than once")]
    DuplicateUsername(String),

    #[error("orders are not exactly 1..={0}")]
    BadOrders(usize),
}

/// Check that a ranking is a permutation: unique names, orders exactly 1..=N
pub fn check_permutation(ranking: &[RankingEntry]) -> Result<(), RankingError> {
    if ranking.is_empty() {
        return Err(RankingError::Empty);
    }

    let mut names = HashSet::with_capacity(ranking.len());
    let mut orders = vec![false; ranking.len()];
    for (idx, entry) in ranking.iter().enumerate() {
        let name = entry.username.trim();
        if name.is_empty() {
            return Err(RankingError::BlankUsername(idx));
        }
        if !names.insert(name) {
            return Err(RankingError::DuplicateUsername(name.to_string()));
        }
        let order = entry.order as usize;
        if order == 0 || order > ranking.len() || orders[order - 1] {
            return Err(RankingError::BadOrders(ranking.len()));
        }
        orders[order - 1] = true;
    }
    Ok(())
}

/// The winner's username, if the ranking has an order-1 entry
pub fn winner(ranking: &[RankingEntry]) -> Option<&str> {
    ranking
        .iter()
        .find(|entry| entry.order == 1)
        .map(|entry| entry.username.as_str())
}
