//! Roster building - participant records into spawned fighters

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::physics::Arena;
use super::{BattleError, Fighter};
use crate::store::cosmetics::CosmeticLookup;

/// Distance kept between a fresh spawn and the walls
const SPAWN_MARGIN: f32 = 80.0;

/// A participant as handed over by the roster provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub username: String,
    /// Avatar reference (path or URL), resolved by the avatar store
    #[serde(default)]
    pub profile_pic: String,
}

impl Participant {
    pub fn new(username: impl Into<String>, profile_pic: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            profile_pic: profile_pic.into(),
        }
    }
}

/// Signed, never-zero speed choices for a sprite of `size`
pub fn spawn_speeds(size: f32) -> Vec<f32> {
    let magnitude = ((0.06 * size) as i32).clamp(3, 12);
    let magnitudes: Vec<i32> = if magnitude >= 6 {
        (6..=magnitude).collect()
    } else {
        vec![magnitude]
    };
    magnitudes
        .iter()
        .rev()
        .map(|&m| -(m as f32))
        .chain(magnitudes.iter().map(|&m| m as f32))
        .collect()
}

/// Uniform spawn coordinate inside `[low + margin, high - margin]` for a
/// sprite of `size`, or the midpoint when the band is too narrow
fn spawn_coordinate<R: Rng + ?Sized>(low: f32, high: f32, size: f32, rng: &mut R) -> f32 {
    let r = size / 2.0;
    let min = low + SPAWN_MARGIN + r;
    let max = high - SPAWN_MARGIN - r;
    if max > min {
        rng.gen_range(min..max)
    } else {
        (low + high) / 2.0
    }
}

/// Participants that make it into a run: blank usernames skipped, repeated
/// (trimmed) usernames keep their first occurrence, then at most
/// `max_fighters` in input order
pub fn retained(participants: &[Participant], max_fighters: usize) -> Vec<&Participant> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|p| {
            let name = p.username.trim();
            !name.is_empty() && seen.insert(name)
        })
        .take(max_fighters)
        .collect()
}

/// Turn participants into fighters placed inside `arena`.
///
/// Keeps at most `max_fighters` in input order; blank and repeated usernames
/// are skipped.
pub fn build_fighters<R: Rng + ?Sized>(
    participants: &[Participant],
    max_fighters: usize,
    arena: &Arena,
    cosmetics: &dyn CosmeticLookup,
    rng: &mut R,
) -> Result<Vec<Fighter>, BattleError> {
    if participants.is_empty() {
        return Err(BattleError::EmptyRoster);
    }

    let speeds = spawn_speeds(arena.size);
    let fighters: Vec<Fighter> = retained(participants, max_fighters)
        .into_iter()
        .map(|participant| {
            let mut fighter = Fighter::new(participant.username.trim(), participant.profile_pic.clone());
            fighter.size = arena.size;
            fighter.x = spawn_coordinate(arena.left, arena.right, arena.size, rng);
            fighter.y = spawn_coordinate(arena.top, arena.bottom, arena.size, rng);
            fighter.vel_x = *speeds.choose(rng).unwrap_or(&6.0);
            fighter.vel_y = *speeds.choose(rng).unwrap_or(&6.0);
            fighter.effect = cosmetics.active(&fighter.username).effect;
            fighter
        })
        .collect();

    if fighters.is_empty() {
        return Err(BattleError::NoFighters(participants.len()));
    }

    debug!(
        fighters = fighters.len(),
        dropped = participants.len() - fighters.len(),
        size = arena.size,
        "Roster built"
    );
    Ok(fighters)
}

/// Number of fighters a roster yields under the cap
pub fn retained_count(participants: &[Participant], max_fighters: usize) -> usize {
    retained(participants, max_fighters).len()
}
