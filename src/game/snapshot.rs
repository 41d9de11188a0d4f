//! Frame snapshots - abstract frame descriptions handed to the renderer

use serde::{Deserialize, Serialize};

use super::physics::Arena;
use super::Fighter;

/// Something worth drawing beyond positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    /// A damaging collision between two fighters
    Clash {
        a: String,
        b: String,
        damage_by_a: u32,
        damage_by_b: u32,
        x: f32,
        y: f32,
    },
    /// A fighter dropped to zero health
    Eliminated { username: String, step: u64 },
}

/// One fighter as drawn in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub health: f32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub effect: String,
}

/// Everything the renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub index: u64,
    pub alive: usize,
    pub sprite_size: f32,
    pub fighters: Vec<FighterSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<BattleEvent>,
    /// Set on the closing hold frames once a champion is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub champion: Option<String>,
}

/// Collects frames while the battle runs
pub struct SnapshotBuilder {
    frames: Vec<FrameSnapshot>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    fn fighter_snapshots(fighters: &[Fighter], hidden: Option<&str>) -> Vec<FighterSnapshot> {
        fighters
            .iter()
            .filter(|f| f.alive && Some(f.username.as_str()) != hidden)
            .map(|f| FighterSnapshot {
                username: f.username.clone(),
                x: f.x,
                y: f.y,
                size: f.size,
                health: f.health,
                effect: f.effect.clone(),
            })
            .collect()
    }

    /// Record an in-fight frame
    pub fn capture(
        &mut self,
        index: u64,
        arena: &Arena,
        fighters: &[Fighter],
        events: Vec<BattleEvent>,
    ) {
        let snapshots = Self::fighter_snapshots(fighters, None);
        self.frames.push(FrameSnapshot {
            index,
            alive: snapshots.len(),
            sprite_size: arena.size,
            fighters: snapshots,
            events,
            champion: None,
        });
    }

    /// Record the closing sequence: `count` frames showing the champion card.
    /// The champion is taken off the field and shown on its own.
    pub fn capture_hold(
        &mut self,
        first_index: u64,
        count: u32,
        arena: &Arena,
        fighters: &[Fighter],
        champion: Option<&str>,
        mut events: Vec<BattleEvent>,
    ) {
        let snapshots = Self::fighter_snapshots(fighters, champion);
        let alive = fighters.iter().filter(|f| f.alive).count();
        for offset in 0..count.max(1) {
            self.frames.push(FrameSnapshot {
                index: first_index + offset as u64,
                alive,
                sprite_size: arena.size,
                fighters: snapshots.clone(),
                events: std::mem::take(&mut events),
                champion: champion.map(str::to_string),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn finish(self) -> Vec<FrameSnapshot> {
        self.frames
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BattleConfig, DeathMarker};

    #[test]
    fn test_capture_skips_eliminated() {
        let arena = Arena::new(&BattleConfig::default(), 2);
        let mut fighters = vec![Fighter::new("a", ""), Fighter::new("b", "")];
        fighters[1].eliminate(DeathMarker { step: 0, seq: 1 });

        let mut builder = SnapshotBuilder::new();
        builder.capture(0, &arena, &fighters, Vec::new());
        let frames = builder.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].alive, 1);
        assert_eq!(frames[0].fighters[0].username, "a");
    }

    #[test]
    fn test_hold_hides_champion_and_keeps_events_once() {
        let arena = Arena::new(&BattleConfig::default(), 2);
        let mut fighters = vec![Fighter::new("a", ""), Fighter::new("b", "")];
        fighters[1].eliminate(DeathMarker { step: 4, seq: 1 });

        let mut builder = SnapshotBuilder::new();
        let events = vec![BattleEvent::Eliminated {
            username: "b".to_string(),
            step: 4,
        }];
        builder.capture_hold(5, 3, &arena, &fighters, Some("a"), events);
        let frames = builder.finish();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].index, 5);
        assert_eq!(frames[2].index, 7);
        assert!(frames.iter().all(|f| f.fighters.is_empty()));
        assert!(frames.iter().all(|f| f.champion.as_deref() == Some("a")));
        assert_eq!(frames[0].alive, 1);
        assert_eq!(frames[0].events.len(), 1);
        assert!(frames[1].events.is_empty());
    }
}
