//! Arena geometry, fighter movement and collision resolution

use rand::Rng;

use super::{BattleConfig, Fighter};

/// Smallest and largest base sprite size before the min/max factors apply
const BASE_SIZE_MIN: f32 = 36.0;
const BASE_SIZE_MAX: f32 = 180.0;

/// Sprite size floor after scaling
const SPRITE_SIZE_FLOOR: f32 = 48.0;

/// Speeds below this are treated as stalled
const STALL_SPEED: f32 = 1e-5;

/// Overlap (px) still counted as touching once a step's contacts are resolved
pub const SEPARATION_SLOP: f32 = 1e-3;

/// Arena bounds and the population-driven sprite size
#[derive(Debug, Clone)]
pub struct Arena {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Sprite diameter with the full roster alive
    pub min_size: f32,
    /// Sprite diameter with a single fighter left
    pub max_size: f32,
    pub starting_fighters: usize,
    /// Current sprite diameter
    pub size: f32,
}

impl Arena {
    /// Build the arena for a roster of `starting_fighters`
    pub fn new(config: &BattleConfig, starting_fighters: usize) -> Self {
        let width = config.width as f32;
        let height = config.height as f32;

        // Vertical band centred above the footer strip
        let center_y = (height - 120.0) / 2.0;
        let max_band = (height - 240.0).max(400.0);
        let band = (width * config.arena_vertical_scale).min(max_band).max(320.0);

        let starting_fighters = starting_fighters.max(1);
        let base = base_sprite_size(starting_fighters);
        let min_size = (base * config.min_size_factor).floor().max(SPRITE_SIZE_FLOOR);
        let arena_cap = (width * 0.45).floor();
        let max_size = (base * config.max_size_factor)
            .floor()
            .min(arena_cap)
            .max(min_size);

        let mut arena = Self {
            left: 0.0,
            right: width,
            top: center_y - band / 2.0,
            bottom: center_y + band / 2.0,
            min_size,
            max_size,
            starting_fighters,
            size: min_size,
        };
        arena.size = arena.size_for_alive(starting_fighters);
        arena
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Fraction of the starting roster still alive, in 0..=1
    pub fn alive_ratio(&self, alive: usize) -> f32 {
        (alive as f32 / self.starting_fighters as f32).clamp(0.0, 1.0)
    }

    /// Sprite diameter for the given population (fewer alive, bigger sprites)
    pub fn size_for_alive(&self, alive: usize) -> f32 {
        let span = (self.max_size - self.min_size).max(0.0);
        (self.min_size + (1.0 - self.alive_ratio(alive)) * span).floor()
    }

    /// Recompute the sprite size and apply it to every fighter
    pub fn update_size(&mut self, alive: usize, fighters: &mut [Fighter]) {
        let size = self.size_for_alive(alive);
        if (size - self.size).abs() > f32::EPSILON {
            self.size = size;
        }
        for fighter in fighters.iter_mut() {
            fighter.size = self.size;
        }
    }

    /// Speed band for the current population: (min, max).
    /// The floor rises as the field narrows so the finale stays short.
    pub fn speed_bounds(&self, alive: usize) -> (f32, f32) {
        let base_floor = (0.05 * self.size).max(3.0);
        let boost = match alive {
            0..=2 => 4.5,
            3 => 3.5,
            4..=5 => 2.0,
            _ => 0.0,
        };
        let min_speed = base_floor + boost;
        let max_speed = (min_speed + 3.0).max(min_speed * 1.4);
        (min_speed, max_speed)
    }
}

/// Base sprite size for a roster, shrinking logarithmically with its size
fn base_sprite_size(fighter_count: usize) -> f32 {
    let count = fighter_count.max(1) as f32;
    let frac = ((count.log10() - 1.0) / 4.0).clamp(0.0, 1.0);
    (BASE_SIZE_MAX - frac * (BASE_SIZE_MAX - BASE_SIZE_MIN))
        .floor()
        .clamp(BASE_SIZE_MIN, BASE_SIZE_MAX)
}

/// Physics system for moving fighters and resolving contacts
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Clamp a fighter's speed into `[min_speed, max_speed]`.
    /// A stalled fighter is relaunched in a random direction at `min_speed`.
    pub fn enforce_speed_bounds<R: Rng + ?Sized>(
        fighter: &mut Fighter,
        min_speed: f32,
        max_speed: f32,
        rng: &mut R,
    ) {
        let speed = fighter.speed();
        if speed < STALL_SPEED {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            fighter.vel_x = angle.cos() * min_speed;
            fighter.vel_y = angle.sin() * min_speed;
            return;
        }

        let scale = if speed < min_speed {
            min_speed / speed
        } else if speed > max_speed {
            max_speed / speed
        } else {
            return;
        };
        fighter.vel_x *= scale;
        fighter.vel_y *= scale;
    }

    /// Keep a fighter inside the arena, reflecting velocity off the walls
    pub fn clamp_to_arena(fighter: &mut Fighter, arena: &Arena) {
        let r = fighter.radius();
        if fighter.x - r < arena.left {
            fighter.x = arena.left + r;
            fighter.vel_x = fighter.vel_x.abs();
        }
        if fighter.x + r > arena.right {
            fighter.x = arena.right - r;
            fighter.vel_x = -fighter.vel_x.abs();
        }
        if fighter.y - r < arena.top {
            fighter.y = arena.top + r;
            fighter.vel_y = fighter.vel_y.abs();
        }
        if fighter.y + r > arena.bottom {
            fighter.y = arena.bottom - r;
            fighter.vel_y = -fighter.vel_y.abs();
        }
    }

    /// Advance every alive fighter by one step
    pub fn move_fighters<R: Rng + ?Sized>(
        arena: &Arena,
        fighters: &mut [Fighter],
        alive: usize,
        rng: &mut R,
    ) {
        let (min_speed, max_speed) = arena.speed_bounds(alive);
        for fighter in fighters.iter_mut().filter(|f| f.alive) {
            Self::enforce_speed_bounds(fighter, min_speed, max_speed, rng);
            fighter.x += fighter.vel_x;
            fighter.y += fighter.vel_y;
            Self::clamp_to_arena(fighter, arena);
        }
    }

    /// Two fighters collide when their centres are closer than one diameter
    pub fn check_collision(a: &Fighter, b: &Fighter, diameter: f32) -> bool {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        dx * dx + dy * dy < diameter * diameter
    }

    /// Separate an overlapping pair and exchange momentum.
    ///
    /// Each fighter is pushed out by half the overlap along the normal between
    /// centres. Velocities only change while the pair is approaching.
    pub fn resolve_collision(a: &mut Fighter, b: &mut Fighter, arena: &Arena, restitution: f32) {
        let Some((nx, ny)) = Self::push_apart(a, b, arena.size) else {
            return;
        };

        let closing_speed = (a.vel_x - b.vel_x) * nx + (a.vel_y - b.vel_y) * ny;
        if closing_speed < 0.0 {
            let impulse = -(1.0 + restitution) * closing_speed / 2.0;
            a.vel_x += impulse * nx;
            a.vel_y += impulse * ny;
            b.vel_x -= impulse * nx;
            b.vel_y -= impulse * ny;
        }

        Self::settle_against_walls(a, b, arena);
    }

    /// Position-only separation: no impulse, no damage.
    /// Returns false when the pair did not overlap.
    pub fn separate(a: &mut Fighter, b: &mut Fighter, arena: &Arena) -> bool {
        if Self::push_apart(a, b, arena.size).is_none() {
            return false;
        }
        Self::settle_against_walls(a, b, arena);
        true
    }

    /// Push both fighters out by half the overlap; returns the normal used
    fn push_apart(a: &mut Fighter, b: &mut Fighter, diameter: f32) -> Option<(f32, f32)> {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        let dist = dx.hypot(dy);
        if dist >= diameter {
            return None;
        }

        // Coincident centres: push apart along x
        let (nx, ny) = if dist < 1e-6 { (1.0, 0.0) } else { (dx / dist, dy / dist) };

        let push = (diameter - dist) / 2.0;
        a.x += nx * push;
        a.y += ny * push;
        b.x -= nx * push;
        b.y -= ny * push;
        Some((nx, ny))
    }

    /// Clamp both into the arena; a wall may have pushed one of them back in,
    /// so move the other one out
    fn settle_against_walls(a: &mut Fighter, b: &mut Fighter, arena: &Arena) {
        let diameter = arena.size;
        Self::clamp_to_arena(a, arena);
        Self::clamp_to_arena(b, arena);

        if let Some((nx, ny, gap)) = Self::overlap(a, b, diameter) {
            b.x -= nx * gap;
            b.y -= ny * gap;
            Self::clamp_to_arena(b, arena);
        }
        if let Some((nx, ny, gap)) = Self::overlap(a, b, diameter) {
            a.x += nx * gap;
            a.y += ny * gap;
            Self::clamp_to_arena(a, arena);
        }
    }

    /// Normal from `b` to `a` and the remaining overlap, if any
    fn overlap(a: &Fighter, b: &Fighter, diameter: f32) -> Option<(f32, f32, f32)> {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        let dist = dx.hypot(dy);
        if dist >= diameter || dist < 1e-6 {
            return None;
        }
        Some((dx / dist, dy / dist, diameter - dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fighter_at(name: &str, x: f32, y: f32, vel_x: f32, vel_y: f32, size: f32) -> Fighter {
        let mut fighter = Fighter::new(name, "");
        fighter.x = x;
        fighter.y = y;
        fighter.vel_x = vel_x;
        fighter.vel_y = vel_y;
        fighter.size = size;
        fighter
    }

    #[test]
    fn test_default_arena_geometry() {
        let arena = Arena::new(&BattleConfig::default(), 50);
        assert_eq!(arena.width(), 1080.0);
        assert!((arena.top - 457.2).abs() < 0.01);
        assert!((arena.bottom - 1342.8).abs() < 0.01);
        // 50 fighters: base 154, min 120, max 207
        assert_eq!(arena.min_size, 120.0);
        assert_eq!(arena.max_size, 207.0);
        assert_eq!(arena.size, 120.0);
    }

    #[test]
    fn test_size_grows_as_population_shrinks() {
        let arena = Arena::new(&BattleConfig::default(), 50);
        let full = arena.size_for_alive(50);
        let half = arena.size_for_alive(25);
        let last = arena.size_for_alive(1);
        assert!(full < half && half < last);
        assert!(last <= arena.max_size);
        assert_eq!(arena.size_for_alive(0), arena.max_size);
    }

    #[test]
    fn test_update_size_applies_to_fighters() {
        let mut arena = Arena::new(&BattleConfig::default(), 4);
        let mut fighters = vec![Fighter::new("a", ""), Fighter::new("b", "")];
        arena.update_size(1, &mut fighters);
        assert_eq!(arena.size, arena.size_for_alive(1));
        assert!(fighters.iter().all(|f| f.size == arena.size));
        assert!((fighters[0].radius() - arena.size / 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_speed_floor_rises_near_finale() {
        let arena = Arena::new(&BattleConfig::default(), 50);
        let (crowd_min, crowd_max) = arena.speed_bounds(40);
        let (five_min, _) = arena.speed_bounds(5);
        let (three_min, _) = arena.speed_bounds(3);
        let (duel_min, _) = arena.speed_bounds(2);
        assert!(crowd_min < five_min && five_min < three_min && three_min < duel_min);
        assert!(crowd_max >= crowd_min + 3.0);
    }

    #[test]
    fn test_stalled_fighter_is_relaunched() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut fighter = fighter_at("a", 100.0, 600.0, 0.0, 0.0, 100.0);
        PhysicsSystem::enforce_speed_bounds(&mut fighter, 6.0, 9.0, &mut rng);
        assert!((fighter.speed() - 6.0).abs() < 1e-3);

        fighter.vel_x = 30.0;
        fighter.vel_y = 0.0;
        PhysicsSystem::enforce_speed_bounds(&mut fighter, 6.0, 9.0, &mut rng);
        assert!((fighter.speed() - 9.0).abs() < 1e-3);
    }

    #[test]
    fn test_wall_reflects_velocity() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let mut fighter = fighter_at("a", 5.0, arena.bottom + 40.0, -4.0, 7.0, arena.size);
        PhysicsSystem::clamp_to_arena(&mut fighter, &arena);
        assert_eq!(fighter.x, arena.left + fighter.radius());
        assert_eq!(fighter.y, arena.bottom - fighter.radius());
        assert!(fighter.vel_x > 0.0);
        assert!(fighter.vel_y < 0.0);
    }

    #[test]
    fn test_resolved_pair_no_longer_overlaps() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let (cx, cy) = arena.center();
        let d = arena.size;
        let mut a = fighter_at("a", cx - d * 0.3, cy, 5.0, 0.0, d);
        let mut b = fighter_at("b", cx + d * 0.3, cy + 1.0, -5.0, 0.0, d);
        assert!(PhysicsSystem::check_collision(&a, &b, d));

        PhysicsSystem::resolve_collision(&mut a, &mut b, &arena, 0.85);

        let dist = (a.x - b.x).hypot(a.y - b.y);
        assert!(dist >= d - 1e-3, "still overlapping: {dist} < {d}");
        // Approaching pair bounces apart
        assert!(a.vel_x < 0.0 && b.vel_x > 0.0);
    }

    #[test]
    fn test_separating_pair_keeps_velocity() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let (cx, cy) = arena.center();
        let d = arena.size;
        let mut a = fighter_at("a", cx - 10.0, cy, -3.0, 0.0, d);
        let mut b = fighter_at("b", cx + 10.0, cy, 3.0, 0.0, d);
        PhysicsSystem::resolve_collision(&mut a, &mut b, &arena, 0.85);
        assert_eq!(a.vel_x, -3.0);
        assert_eq!(b.vel_x, 3.0);
    }

    #[test]
    fn test_coincident_centres_are_split() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let (cx, cy) = arena.center();
        let d = arena.size;
        let mut a = fighter_at("a", cx, cy, 0.0, 0.0, d);
        let mut b = fighter_at("b", cx, cy, 0.0, 0.0, d);
        PhysicsSystem::resolve_collision(&mut a, &mut b, &arena, 0.85);
        assert!((a.x - b.x).abs() >= d - 1e-3);
    }

    #[test]
    fn test_separate_moves_positions_only() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let (cx, cy) = arena.center();
        let d = arena.size;
        let mut a = fighter_at("a", cx - 10.0, cy, 5.0, 1.0, d);
        let mut b = fighter_at("b", cx + 10.0, cy, -5.0, 2.0, d);

        assert!(PhysicsSystem::separate(&mut a, &mut b, &arena));
        assert!((a.x - b.x).abs() >= d - 1e-3);
        assert_eq!((a.vel_x, a.vel_y), (5.0, 1.0));
        assert_eq!((b.vel_x, b.vel_y), (-5.0, 2.0));

        assert!(!PhysicsSystem::separate(&mut a, &mut b, &arena));
    }

    #[test]
    fn test_momentum_conserved_without_walls() {
        let arena = Arena::new(&BattleConfig::default(), 10);
        let (cx, cy) = arena.center();
        let d = arena.size;
        let mut a = fighter_at("a", cx - 20.0, cy - 5.0, 4.0, 1.0, d);
        let mut b = fighter_at("b", cx + 20.0, cy + 5.0, -6.0, 2.0, d);
        let before = (a.vel_x + b.vel_x, a.vel_y + b.vel_y);
        PhysicsSystem::resolve_collision(&mut a, &mut b, &arena, 0.85);
        let after = (a.vel_x + b.vel_x, a.vel_y + b.vel_y);
        assert!((before.0 - after.0).abs() < 1e-4);
        assert!((before.1 - after.1).abs() < 1e-4);
    }
}
