//! Quick fight - the non-animated variant.
//!
//! Random pairs trade blows until one fighter is left. No arena, no frames.

use rand::seq::index;
use rand::Rng;
use tracing::debug;

use super::combat::{CombatSystem, DamageLog};
use super::ranking::{build_ranking, RankingEntry};
use super::roster::{self, Participant};
use super::{BattleError, DeathMarker, Fighter};

/// Tunables for the quick fight
#[derive(Debug, Clone)]
pub struct QuickConfig {
    pub min_damage: u32,
    pub max_damage: u32,
    /// Roster cap; later participants sit out
    pub max_fighters: usize,
    /// Safety cap on exchanges
    pub max_exchanges: u64,
}

impl Default for QuickConfig {
    fn default() -> Self {
        Self {
            min_damage: 5,
            max_damage: 30,
            max_fighters: 50,
            max_exchanges: 100_000,
        }
    }
}

/// Result of a quick fight
#[derive(Debug, Clone)]
pub struct QuickOutcome {
    pub ranking: Vec<RankingEntry>,
    pub damage_log: DamageLog,
    pub exchanges: u64,
    pub capped: bool,
}

/// A quick fight over an owned fighter list
pub struct QuickFight {
    config: QuickConfig,
    fighters: Vec<Fighter>,
}

impl QuickFight {
    pub fn new(config: QuickConfig, participants: &[Participant]) -> Result<Self, BattleError> {
        if participants.is_empty() {
            return Err(BattleError::EmptyRoster);
        }
        let fighters: Vec<Fighter> = roster::retained(participants, config.max_fighters)
            .into_iter()
            .map(|p| Fighter::new(p.username.trim(), p.profile_pic.clone()))
            .collect();
        if fighters.is_empty() {
            return Err(BattleError::NoFighters(participants.len()));
        }
        Ok(Self { config, fighters })
    }

    pub fn fighter_count(&self) -> usize {
        self.fighters.len()
    }

    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let low = self.config.min_damage.min(self.config.max_damage);
        let high = self.config.min_damage.max(self.config.max_damage);
        rng.gen_range(low..=high).max(1)
    }

    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> QuickOutcome {
        let mut damage_log = DamageLog::new();
        let mut alive: Vec<usize> = (0..self.fighters.len()).collect();
        let mut exchanges = 0u64;
        let mut eliminations = 0u64;

        while alive.len() > 1 && exchanges < self.config.max_exchanges {
            let picked = index::sample(rng, alive.len(), 2);
            let (slot_a, slot_b) = (picked.index(0), picked.index(1));
            let (i, j) = (alive[slot_a], alive[slot_b]);

            let damage_by_a = self.roll(rng);
            let damage_by_b = self.roll(rng);
            let (a_health, a_dead) =
                CombatSystem::apply_damage(self.fighters[i].health, damage_by_b as f32);
            let (b_health, b_dead) =
                CombatSystem::apply_damage(self.fighters[j].health, damage_by_a as f32);
            self.fighters[i].health = a_health;
            self.fighters[j].health = b_health;
            damage_log.record(&self.fighters[j].username, &self.fighters[i].username, damage_by_b as f64);
            damage_log.record(&self.fighters[i].username, &self.fighters[j].username, damage_by_a as f64);

            // The higher slot leaves first and ranks below the other
            let mut dead_slots: Vec<usize> = [(slot_a, a_dead), (slot_b, b_dead)]
                .into_iter()
                .filter(|&(_, dead)| dead)
                .map(|(slot, _)| slot)
                .collect();
            dead_slots.sort_unstable_by(|x, y| y.cmp(x));
            for slot in dead_slots {
                let idx = alive.remove(slot);
                eliminations += 1;
                self.fighters[idx].eliminate(DeathMarker {
                    step: exchanges,
                    seq: eliminations,
                });
            }
            exchanges += 1;
        }

        let capped = alive.len() > 1;
        debug!(exchanges, survivors = alive.len(), "Quick fight ended");

        QuickOutcome {
            ranking: build_ranking(&self.fighters, exchanges),
            damage_log,
            exchanges,
            capped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ranking::check_permutation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn roster(count: usize) -> Vec<Participant> {
        (0..count).map(|i| Participant::new(format!("q{i}"), "")).collect()
    }

    #[test]
    fn test_quick_fight_ranks_everyone() {
        for count in [1, 2, 5, 50] {
            let mut rng = ChaCha8Rng::seed_from_u64(count as u64);
            let outcome = QuickFight::new(QuickConfig::default(), &roster(count))
                .unwrap()
                .run(&mut rng);
            assert_eq!(outcome.ranking.len(), count);
            assert!(check_permutation(&outcome.ranking).is_ok());
            assert!(!outcome.capped);
            assert!(outcome.ranking.iter().all(|e| e.final_health >= 0.0));
        }
    }

    #[test]
    fn test_quick_fight_logs_every_exchange_both_ways() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let outcome = QuickFight::new(QuickConfig::default(), &roster(6))
            .unwrap()
            .run(&mut rng);
        assert_eq!(outcome.damage_log.total_hits(), outcome.exchanges * 2);
    }

    #[test]
    fn test_quick_fight_cap() {
        let config = QuickConfig {
            max_exchanges: 0,
            ..QuickConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let outcome = QuickFight::new(config, &roster(3)).unwrap().run(&mut rng);
        assert!(outcome.capped);
        assert_eq!(outcome.exchanges, 0);
        assert!(check_permutation(&outcome.ranking).is_ok());
    }

    #[test]
    fn test_quick_fight_roster_cap() {
        let config = QuickConfig {
            max_fighters: 3,
            ..QuickConfig::default()
        };
        let mut participants = roster(5);
        participants.insert(0, Participant::new(" ", ""));
        let fight = QuickFight::new(config, &participants).unwrap();
        assert_eq!(fight.fighter_count(), 3);
    }

    #[test]
    fn test_quick_fight_ranks_repeated_username_once() {
        let participants = vec![
            Participant::new("A", ""),
            Participant::new("A", ""),
            Participant::new("B", ""),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let outcome = QuickFight::new(QuickConfig::default(), &participants)
            .unwrap()
            .run(&mut rng);
        assert_eq!(outcome.ranking.len(), 2);
        assert!(check_permutation(&outcome.ranking).is_ok());
        assert!(outcome.damage_log.get("A", "A").is_none());
    }

    #[test]
    fn test_quick_fight_rejects_empty() {
        assert!(matches!(
            QuickFight::new(QuickConfig::default(), &[]),
            Err(BattleError::EmptyRoster)
        ));
    }
}
