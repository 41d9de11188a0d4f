//! Battle state and the authoritative step loop

use rand::Rng;
use tracing::debug;

use crate::store::cosmetics::CosmeticLookup;
use crate::util::time::DEFAULT_FPS;

use super::combat::{CollisionMemory, CombatSystem, DamageLog, Exchange};
use super::physics::{Arena, PhysicsSystem, SEPARATION_SLOP};
use super::ranking::{build_ranking, RankingEntry};
use super::roster::{self, Participant};
use super::snapshot::{BattleEvent, FrameSnapshot, SnapshotBuilder};
use super::{pair_mut, BattleError, DeathMarker, Fighter};

/// Bound on position-only passes after a step's contacts are resolved
const MAX_RELAXATION_PASSES: usize = 128;

/// Simulation tunables for the animated battle
#[derive(Debug, Clone)]
pub struct BattleConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Arena band height as a fraction of the width
    pub arena_vertical_scale: f32,
    pub fps: u32,
    /// Roster cap; extra participants are dropped
    pub max_fighters: usize,
    /// Coefficient of restitution for fighter collisions
    pub restitution: f32,
    /// Steps a pair must wait before the same contact hurts again
    pub collision_cooldown_steps: u64,
    pub min_damage: u32,
    pub max_damage: u32,
    /// Length of the champion sequence
    pub win_hold_seconds: u32,
    pub min_size_factor: f32,
    pub max_size_factor: f32,
    /// Damage multiplier with the full roster alive
    pub early_damage_scale: f32,
    /// Damage multiplier as the last fighters remain
    pub late_damage_scale: f32,
    /// Safety cap on simulated steps
    pub max_steps: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            arena_vertical_scale: 0.82,
            fps: DEFAULT_FPS,
            max_fighters: 50,
            restitution: 0.85,
            collision_cooldown_steps: 6,
            min_damage: 5,
            max_damage: 14,
            win_hold_seconds: 5,
            min_size_factor: 0.78,
            max_size_factor: 1.35,
            early_damage_scale: 0.5,
            late_damage_scale: 1.0,
            max_steps: DEFAULT_FPS as u64 * 60 * 30,
        }
    }
}

impl BattleConfig {
    /// Frames in the closing champion sequence
    pub fn hold_frames(&self) -> u32 {
        self.fps * self.win_hold_seconds
    }
}

/// Battle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    InProgress,
    Ended,
}

/// Everything a finished battle hands to persistence and rendering
#[derive(Debug, Clone)]
pub struct BattleResult {
    pub ranking: Vec<RankingEntry>,
    pub damage_log: DamageLog,
    pub frames: Vec<FrameSnapshot>,
    pub champion: Option<String>,
    /// Simulated steps (hold frames excluded)
    pub steps: u64,
    /// True when the step cap ended the fight with several survivors
    pub capped: bool,
}

/// One run's arena and fighters
pub struct BattleMatch {
    config: BattleConfig,
    arena: Arena,
    fighters: Vec<Fighter>,
    step: u64,
    phase: BattlePhase,
    collision_memory: CollisionMemory,
    damage_log: DamageLog,
    eliminations: u64,
}

impl BattleMatch {
    /// Build the roster and spawn it into a fresh arena
    pub fn new<R: Rng + ?Sized>(
        config: BattleConfig,
        participants: &[Participant],
        cosmetics: &dyn CosmeticLookup,
        rng: &mut R,
    ) -> Result<Self, BattleError> {
        let retained = roster::retained_count(participants, config.max_fighters);
        let arena = Arena::new(&config, retained);
        let fighters =
            roster::build_fighters(participants, config.max_fighters, &arena, cosmetics, rng)?;
        Ok(Self::with_arena(config, arena, fighters))
    }

    /// Start a battle from already placed fighters
    pub fn from_fighters(config: BattleConfig, fighters: Vec<Fighter>) -> Self {
        let arena = Arena::new(&config, fighters.len());
        Self::with_arena(config, arena, fighters)
    }

    fn with_arena(config: BattleConfig, arena: Arena, mut fighters: Vec<Fighter>) -> Self {
        for fighter in fighters.iter_mut() {
            fighter.size = arena.size;
        }
        Self {
            config,
            arena,
            fighters,
            step: 0,
            phase: BattlePhase::InProgress,
            collision_memory: CollisionMemory::new(),
            damage_log: DamageLog::new(),
            eliminations: 0,
        }
    }

    pub fn fighters(&self) -> &[Fighter] {
        &self.fighters
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn damage_log(&self) -> &DamageLog {
        &self.damage_log
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Steps simulated so far
    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn alive_count(&self) -> usize {
        self.fighters.iter().filter(|f| f.alive).count()
    }

    /// Advance one step: resize, move, resolve every colliding pair, then
    /// push apart whatever the pairwise pass left overlapping
    pub fn run_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<BattleEvent> {
        let alive = self.alive_count();
        self.arena.update_size(alive, &mut self.fighters);
        PhysicsSystem::move_fighters(&self.arena, &mut self.fighters, alive, rng);
        let events = self.apply_collisions(alive, rng);
        self.relax_overlaps();
        self.step += 1;
        events
    }

    /// Separating one pair can push a fighter into a third, so repeat
    /// position-only passes over the alive fighters until nothing overlaps
    fn relax_overlaps(&mut self) {
        let alive_indices: Vec<usize> = (0..self.fighters.len())
            .filter(|&i| self.fighters[i].alive)
            .collect();
        let touching = self.arena.size - SEPARATION_SLOP;

        for _ in 0..MAX_RELAXATION_PASSES {
            let mut moved = false;
            for (pos, &i) in alive_indices.iter().enumerate() {
                for &j in &alive_indices[pos + 1..] {
                    if !PhysicsSystem::check_collision(&self.fighters[i], &self.fighters[j], touching) {
                        continue;
                    }
                    let (a, b) = pair_mut(&mut self.fighters, i, j);
                    moved |= PhysicsSystem::separate(a, b, &self.arena);
                }
            }
            if !moved {
                return;
            }
        }
        debug!(step = self.step, "Overlaps left after relaxation");
    }

    fn apply_collisions<R: Rng + ?Sized>(&mut self, alive: usize, rng: &mut R) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        let alive_indices: Vec<usize> = (0..self.fighters.len())
            .filter(|&i| self.fighters[i].alive)
            .collect();
        let scale = CombatSystem::damage_scale(&self.config, self.arena.alive_ratio(alive));

        for (pos, &i) in alive_indices.iter().enumerate() {
            for &j in &alive_indices[pos + 1..] {
                if !self.fighters[i].alive || !self.fighters[j].alive {
                    continue;
                }
                if !PhysicsSystem::check_collision(&self.fighters[i], &self.fighters[j], self.arena.size) {
                    self.collision_memory.forget(i, j);
                    continue;
                }

                let (a, b) = pair_mut(&mut self.fighters, i, j);
                PhysicsSystem::resolve_collision(a, b, &self.arena, self.config.restitution);

                if self.collision_memory.try_engage(
                    i,
                    j,
                    self.step,
                    self.config.collision_cooldown_steps,
                ) {
                    let exchange = self.exchange(i, j, scale, rng);
                    let (a, b) = (&self.fighters[i], &self.fighters[j]);
                    events.push(BattleEvent::Clash {
                        a: exchange.a.clone(),
                        b: exchange.b.clone(),
                        damage_by_a: exchange.damage_by_a,
                        damage_by_b: exchange.damage_by_b,
                        x: (a.x + b.x) / 2.0,
                        y: (a.y + b.y) / 2.0,
                    });
                    for (name, eliminated) in [
                        (&exchange.a, exchange.a_eliminated),
                        (&exchange.b, exchange.b_eliminated),
                    ] {
                        if eliminated {
                            events.push(BattleEvent::Eliminated {
                                username: name.clone(),
                                step: self.step,
                            });
                        }
                    }
                }
            }
        }

        events
    }

    /// Both fighters hit each other; record it and stamp eliminations
    fn exchange<R: Rng + ?Sized>(&mut self, i: usize, j: usize, scale: f32, rng: &mut R) -> Exchange {
        let damage_by_a = CombatSystem::roll_damage(&self.config, scale, rng);
        let damage_by_b = CombatSystem::roll_damage(&self.config, scale, rng);
        let step = self.step;

        let (a, b) = pair_mut(&mut self.fighters, i, j);
        let (a_health, a_dead) = CombatSystem::apply_damage(a.health, damage_by_b as f32);
        let (b_health, b_dead) = CombatSystem::apply_damage(b.health, damage_by_a as f32);
        a.health = a_health;
        b.health = b_health;

        self.damage_log.record(&b.username, &a.username, damage_by_b as f64);
        self.damage_log.record(&a.username, &b.username, damage_by_a as f64);

        let mut exchange = Exchange {
            a: a.username.clone(),
            b: b.username.clone(),
            damage_by_a,
            damage_by_b,
            a_eliminated: false,
            b_eliminated: false,
        };

        for (fighter, dead, flag) in [
            (a, a_dead, &mut exchange.a_eliminated),
            (b, b_dead, &mut exchange.b_eliminated),
        ] {
            if dead && fighter.alive {
                self.eliminations += 1;
                fighter.eliminate(DeathMarker {
                    step,
                    seq: self.eliminations,
                });
                *flag = true;
                debug!(username = %fighter.username, step, "Fighter eliminated");
            }
        }

        exchange
    }

    /// Run to completion: until one fighter is left or the step cap hits
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> BattleResult {
        let mut builder = SnapshotBuilder::new();
        let max_steps = self.config.max_steps.max(1);

        loop {
            let index = self.step;
            let events = self.run_step(rng);
            let alive = self.alive_count();

            if alive <= 1 || self.step >= max_steps {
                self.phase = BattlePhase::Ended;
                self.arena.update_size(alive, &mut self.fighters);

                let ranking = build_ranking(&self.fighters, self.step);
                let champion = ranking.first().map(|entry| entry.username.clone());
                builder.capture_hold(
                    index,
                    self.config.hold_frames(),
                    &self.arena,
                    &self.fighters,
                    champion.as_deref(),
                    events,
                );

                debug!(
                    steps = self.step,
                    survivors = alive,
                    frames = builder.len(),
                    "Battle ended"
                );

                return BattleResult {
                    ranking,
                    damage_log: self.damage_log,
                    frames: builder.finish(),
                    champion,
                    steps: self.step,
                    capped: alive > 1,
                };
            }

            builder.capture(index, &self.arena, &self.fighters, events);
        }
    }
}
