//! Game simulation modules

pub mod combat;
pub mod r#match;
pub mod physics;
pub mod quick;
pub mod ranking;
pub mod roster;
pub mod snapshot;

pub use combat::{DamageLog, HitTally};
pub use quick::{QuickConfig, QuickFight, QuickOutcome};
pub use r#match::{BattleConfig, BattleMatch, BattleResult};
pub use ranking::RankingEntry;
pub use roster::Participant;

/// Starting health for every fighter
pub const STARTING_HEALTH: f32 = 100.0;

/// When a fighter was eliminated.
///
/// Ordered by step first, then by the order eliminations were applied within
/// that step, so two fighters never share a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeathMarker {
    pub step: u64,
    pub seq: u64,
}

/// Fighter state for one run (owned by the battle)
#[derive(Debug, Clone)]
pub struct Fighter {
    pub username: String,
    pub avatar: String,

    // Centre position and movement
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,

    // Combat
    pub health: f32,
    pub alive: bool,
    pub death: Option<DeathMarker>,

    /// Rendered diameter; the physics radius is always half of it
    pub size: f32,
    /// Active visual effect, empty when none
    pub effect: String,
}

impl Fighter {
    pub fn new(username: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            avatar: avatar.into(),
            x: 0.0,
            y: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            health: STARTING_HEALTH,
            alive: true,
            death: None,
            size: 0.0,
            effect: String::new(),
        }
    }

    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    pub fn speed(&self) -> f32 {
        self.vel_x.hypot(self.vel_y)
    }

    /// Mark eliminated; a second call keeps the first marker
    pub fn eliminate(&mut self, marker: DeathMarker) {
        if self.alive {
            self.alive = false;
            self.death = Some(marker);
        }
    }
}

/// Errors that abort a battle before anything is persisted
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    #[error("No participants provided for the fight")]
    EmptyRoster,

    #[error("Roster of {0} participants produced no fighters")]
    NoFighters(usize),
}

/// Mutable access to two distinct elements of a slice
pub(crate) fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i != j);
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eliminate_keeps_first_marker() {
        let mut fighter = Fighter::new("ana", "ana.jpg");
        fighter.eliminate(DeathMarker { step: 4, seq: 1 });
        fighter.eliminate(DeathMarker { step: 9, seq: 2 });
        assert!(!fighter.alive);
        assert_eq!(fighter.death, Some(DeathMarker { step: 4, seq: 1 }));
    }

    #[test]
    fn test_death_marker_order() {
        let early = DeathMarker { step: 3, seq: 7 };
        let same_step_later = DeathMarker { step: 3, seq: 8 };
        let later = DeathMarker { step: 4, seq: 0 };
        assert!(early < same_step_later);
        assert!(same_step_later < later);
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut values = vec![1, 2, 3];
        {
            let (a, b) = pair_mut(&mut values, 0, 2);
            std::mem::swap(a, b);
        }
        assert_eq!(values, vec![3, 2, 1]);
        let (a, b) = pair_mut(&mut values, 2, 1);
        assert_eq!((*a, *b), (1, 2));
    }
}
