//! Combat system - collision damage, eliminations, damage log

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::BattleConfig;

/// Cumulative damage one fighter dealt another
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitTally {
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub hits: u32,
}

impl HitTally {
    pub fn is_empty(&self) -> bool {
        self.damage == 0.0 && self.hits == 0
    }
}

/// Per-run record of who damaged whom: attacker -> defender -> tally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageLog {
    entries: BTreeMap<String, BTreeMap<String, HitTally>>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one hit; blank names are ignored
    pub fn record(&mut self, attacker: &str, defender: &str, amount: f64) {
        if attacker.is_empty() || defender.is_empty() {
            return;
        }
        let tally = self
            .entries
            .entry(attacker.to_string())
            .or_default()
            .entry(defender.to_string())
            .or_default();
        tally.damage += amount;
        tally.hits += 1;
    }

    pub fn get(&self, attacker: &str, defender: &str) -> Option<&HitTally> {
        self.entries.get(attacker)?.get(defender)
    }

    /// Iterate `(attacker, defender, tally)` in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &HitTally)> {
        self.entries.iter().flat_map(|(attacker, targets)| {
            targets
                .iter()
                .map(move |(defender, tally)| (attacker.as_str(), defender.as_str(), tally))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|targets| targets.is_empty())
    }

    pub fn total_hits(&self) -> u64 {
        self.iter().map(|(_, _, t)| t.hits as u64).sum()
    }

    pub fn total_damage(&self) -> f64 {
        self.iter().map(|(_, _, t)| t.damage).sum()
    }
}

/// Remembers the last step each pair exchanged damage
#[derive(Debug, Default)]
pub struct CollisionMemory {
    last_hit: HashMap<(usize, usize), u64>,
}

impl CollisionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(i: usize, j: usize) -> (usize, usize) {
        if i < j {
            (i, j)
        } else {
            (j, i)
        }
    }

    /// The pair separated; its next contact may damage right away
    pub fn forget(&mut self, i: usize, j: usize) {
        self.last_hit.remove(&Self::key(i, j));
    }

    /// Whether a contact at `step` deals damage; records it if so
    pub fn try_engage(&mut self, i: usize, j: usize, step: u64, cooldown: u64) -> bool {
        let key = Self::key(i, j);
        match self.last_hit.get(&key) {
            Some(&last) if step.saturating_sub(last) < cooldown => false,
            _ => {
                self.last_hit.insert(key, step);
                true
            }
        }
    }
}

/// Combat system for damage rolls and health
pub struct CombatSystem;

impl CombatSystem {
    /// Phase factor: early multiplier with a full field, late multiplier
    /// as the field empties
    pub fn damage_scale(config: &BattleConfig, alive_ratio: f32) -> f32 {
        let ratio = alive_ratio.clamp(0.0, 1.0);
        config.early_damage_scale
            + (1.0 - ratio) * (config.late_damage_scale - config.early_damage_scale)
    }

    /// Roll one side's damage for an exchange (never below 1)
    pub fn roll_damage<R: Rng + ?Sized>(config: &BattleConfig, scale: f32, rng: &mut R) -> u32 {
        let (low, high) = if config.min_damage <= config.max_damage {
            (config.min_damage, config.max_damage)
        } else {
            (config.max_damage, config.min_damage)
        };
        let base = rng.gen_range(low..=high);
        ((base as f32 * scale).round() as u32).max(1)
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }
}

/// Outcome of one damaging collision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub a: String,
    pub b: String,
    /// Damage `a` dealt to `b`
    pub damage_by_a: u32,
    /// Damage `b` dealt to `a`
    pub damage_by_b: u32,
    pub a_eliminated: bool,
    pub b_eliminated: bool,
}
