/// Enemy AI. One direction decision per enemy per move.
///
/// Three strategies, carried on the enemy profile:
///   1. **Random**   : wander; occasionally turn, otherwise keep going straight.
///   2. **Chase**    : steer along the dominant axis toward the player's cell.
///   3. **Intercept**: same steering, aimed `depth` cells ahead of the player
///      along the player's current facing.
///
/// Every strategy funnels through the same safety filter (`is_move_safe`)
/// and the same shuffled fallback (`random_safe_direction`).
/// The AI only reads the grid; the coordinator applies the result.

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::{Actor, Direction, EnemyProfile};
use super::grid::Grid;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Strategy {
    Random,
    Chase,
    Intercept { depth: u32 },
}

/// What the AI knows about the player this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Quarry {
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
}

impl Quarry {
    pub fn of(actor: &Actor) -> Self {
        Quarry { x: actor.x, y: actor.y, facing: actor.facing }
    }

    /// Player position pushed `depth` cells along its facing.
    /// May land outside the grid; steering toward it is still meaningful.
    pub fn projected(&self, depth: u32) -> (i32, i32) {
        let (dx, dy) = self.facing.offset();
        let n = depth as i32;
        (self.x + dx * n, self.y + dy * n)
    }
}

/// Context for AI queries.
pub struct AiContext<'a> {
    pub grid: &'a Grid,
    pub quarry: Quarry,
    pub dead_end_check: bool,
    pub random_turn_chance: f64,
}

// ── Safety filter ──

/// Can an actor stand on (x, y) without crashing?
fn is_enterable(grid: &Grid, x: i32, y: i32) -> bool {
    !grid.is_boundary(x, y) && !grid.current_tile(x, y).is_hazard()
}

/// Would moving from (x, y) along `dir` be safe?
///
/// Unsafe: boundary, wall, obstacle or trail at the destination. With
/// `dead_end_check`, also unsafe when the destination has no open neighbour.
/// The cell being vacated counts as closed since a trail is laid there.
pub fn is_move_safe(grid: &Grid, x: i32, y: i32, dir: Direction, dead_end_check: bool) -> bool {
    let (nx, ny) = dir.step_from(x, y);
    if !is_enterable(grid, nx, ny) {
        return false;
    }
    if !dead_end_check {
        return true;
    }
    Direction::ALL.iter().any(|d| {
        let (ex, ey) = d.step_from(nx, ny);
        (ex, ey) != (x, y) && is_enterable(grid, ex, ey)
    })
}

/// Shuffle the four directions and return the first safe one.
pub fn random_safe_direction<R: Rng + ?Sized>(
    grid: &Grid,
    x: i32,
    y: i32,
    dead_end_check: bool,
    rng: &mut R,
) -> Option<Direction> {
    let mut dirs = Direction::ALL;
    dirs.shuffle(rng);
    dirs.into_iter().find(|&d| is_move_safe(grid, x, y, d, dead_end_check))
}

// ── Decision ──

/// Pick this tick's facing for `enemy`. Falls back to the current facing
/// when nothing is safe; the coordinator then handles the crash.
pub fn decide_direction<R: Rng + ?Sized>(
    ctx: &AiContext,
    enemy: &Actor,
    profile: &EnemyProfile,
    rng: &mut R,
) -> Direction {
    let target = match profile.strategy {
        Strategy::Random => None,
        Strategy::Chase => Some((ctx.quarry.x, ctx.quarry.y)),
        Strategy::Intercept { depth } => {
            // Aggression: how often the enemy commits to leading the player.
            if rng.gen_bool(profile.aggression.clamp(0.0, 1.0) as f64) {
                Some(ctx.quarry.projected(depth))
            } else {
                Some((ctx.quarry.x, ctx.quarry.y))
            }
        }
    };

    let choice = match target {
        Some((tx, ty)) => steer_toward(ctx, enemy, tx, ty, rng),
        None => wander(ctx, enemy, rng),
    };

    choice.unwrap_or(enemy.facing)
}

fn wander<R: Rng + ?Sized>(ctx: &AiContext, enemy: &Actor, rng: &mut R) -> Option<Direction> {
    let chance = ctx.random_turn_chance.clamp(0.0, 1.0);
    if !rng.gen_bool(chance)
        && is_move_safe(ctx.grid, enemy.x, enemy.y, enemy.facing, ctx.dead_end_check)
    {
        return Some(enemy.facing);
    }
    random_safe_direction(ctx.grid, enemy.x, enemy.y, ctx.dead_end_check, rng)
}

/// Axis of greatest displacement wins; ties go horizontal.
pub fn preferred_direction(x: i32, y: i32, tx: i32, ty: i32) -> Option<Direction> {
    let dx = tx - x;
    let dy = ty - y;
    if dx == 0 && dy == 0 {
        return None;
    }
    if dx.abs() >= dy.abs() {
        Some(if dx < 0 { Direction::Left } else { Direction::Right })
    } else {
        Some(if dy < 0 { Direction::Up } else { Direction::Down })
    }
}

fn steer_toward<R: Rng + ?Sized>(
    ctx: &AiContext,
    enemy: &Actor,
    tx: i32,
    ty: i32,
    rng: &mut R,
) -> Option<Direction> {
    let wanted = preferred_direction(enemy.x, enemy.y, tx, ty).unwrap_or(enemy.facing);
    if is_move_safe(ctx.grid, enemy.x, enemy.y, wanted, ctx.dead_end_check) {
        return Some(wanted);
    }
    random_safe_direction(ctx.grid, enemy.x, enemy.y, ctx.dead_end_check, rng)
}

// ── Difficulty table ──

/// Prediction depth for an enemy of `tier` on `stage`.
///
/// `table[tier - 1]` is the base depth (missing entries reuse the last one).
/// With `stage_scaled`, each stage after the first adds `per_stage`, capped
/// at `max_depth`. Non-decreasing in both tier (for a sorted table) and stage.
pub fn prediction_depth(
    table: &[u32],
    tier: u8,
    stage: u32,
    stage_scaled: bool,
    per_stage: u32,
    max_depth: u32,
) -> u32 {
    let idx = (tier.max(1) as usize - 1).min(table.len().saturating_sub(1));
    let base = table.get(idx).copied().unwrap_or(0);
    let bonus = if stage_scaled { per_stage.saturating_mul(stage.saturating_sub(1)) } else { 0 };
    base.saturating_add(bonus).min(max_depth.max(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::domain::entity::{ActorId, Archetype};
    use crate::domain::rules::Ruleset;
    use crate::domain::tile::Tile;
    use crate::sim::level::enemy_profile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn profile(strategy: Strategy) -> EnemyProfile {
        EnemyProfile { archetype: Archetype::Seeker, tier: 2, strategy, aggression: 1.0 }
    }

    fn enemy_at(x: i32, y: i32, facing: Direction, strategy: Strategy) -> Actor {
        Actor::enemy(ActorId(1), x, y, facing, profile(strategy), 2.0, 1)
    }

    fn ctx(grid: &Grid, quarry: Quarry, dead_end_check: bool) -> AiContext<'_> {
        AiContext { grid, quarry, dead_end_check, random_turn_chance: 0.0 }
    }

    // ── is_move_safe ──

    #[test]
    fn wall_obstacle_and_trail_are_unsafe() {
        let mut g = Grid::bordered(10, 10);
        g.set_base(5, 4, Tile::Wall);
        g.set_base(6, 5, Tile::Obstacle);
        g.mark_trail(5, 6, Tile::EnemyTrail, 1);
        g.mark_trail(4, 5, Tile::PlayerTrail, 1);
        for dead_end in [false, true] {
            assert!(!is_move_safe(&g, 5, 5, Direction::Up, dead_end));
            assert!(!is_move_safe(&g, 5, 5, Direction::Right, dead_end));
            assert!(!is_move_safe(&g, 5, 5, Direction::Down, dead_end));
            assert!(!is_move_safe(&g, 5, 5, Direction::Left, dead_end));
        }
    }

    #[test]
    fn boundary_is_unsafe_even_through_a_gap() {
        let mut g = Grid::bordered(10, 10);
        g.set_base(0, 5, Tile::Empty);
        assert!(!is_move_safe(&g, 1, 5, Direction::Left, false));
    }

    #[test]
    fn open_floor_is_safe() {
        let g = Grid::bordered(10, 10);
        for d in Direction::ALL {
            assert!(is_move_safe(&g, 5, 5, d, true));
        }
    }

    #[test]
    fn dead_end_detected_only_when_enabled() {
        // Pocket at (5,4): walls left, right, above. Entering from (5,5).
        let mut g = Grid::bordered(10, 10);
        g.set_base(4, 4, Tile::Wall);
        g.set_base(6, 4, Tile::Wall);
        g.set_base(5, 3, Tile::Obstacle);
        assert!(is_move_safe(&g, 5, 5, Direction::Up, false));
        assert!(!is_move_safe(&g, 5, 5, Direction::Up, true));
    }

    #[test]
    fn one_exit_is_enough() {
        let mut g = Grid::bordered(10, 10);
        g.set_base(4, 4, Tile::Wall);
        g.set_base(6, 4, Tile::Wall);
        assert!(is_move_safe(&g, 5, 5, Direction::Up, true));
    }

    #[test]
    fn random_safe_none_when_boxed_in() {
        let mut g = Grid::bordered(10, 10);
        for d in Direction::ALL {
            let (x, y) = d.step_from(5, 5);
            g.mark_trail(x, y, Tile::PlayerTrail, 1);
        }
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(random_safe_direction(&g, 5, 5, false, &mut rng), None);
    }

    #[test]
    fn random_safe_finds_the_only_exit() {
        let mut g = Grid::bordered(10, 10);
        g.set_base(5, 4, Tile::Wall);
        g.set_base(5, 6, Tile::Wall);
        g.set_base(4, 5, Tile::Wall);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(random_safe_direction(&g, 5, 5, false, &mut rng), Some(Direction::Right));
        }
    }

    // ── strategies ──

    #[test]
    fn chase_prefers_dominant_axis() {
        let g = Grid::bordered(40, 40);
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Right };
        let e = enemy_at(25, 20, Direction::Up, Strategy::Chase);
        let mut rng = StdRng::seed_from_u64(1);
        let d = decide_direction(&ctx(&g, quarry, true), &e, &profile(Strategy::Chase), &mut rng);
        assert_eq!(d, Direction::Left);
    }

    #[test]
    fn chase_falls_back_when_blocked() {
        let mut g = Grid::bordered(40, 40);
        g.mark_trail(24, 20, Tile::PlayerTrail, 1);
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Right };
        let e = enemy_at(25, 20, Direction::Up, Strategy::Chase);
        let mut rng = StdRng::seed_from_u64(4);
        let d = decide_direction(&ctx(&g, quarry, false), &e, &profile(Strategy::Chase), &mut rng);
        assert_ne!(d, Direction::Left);
        assert!(is_move_safe(&g, 25, 20, d, false));
    }

    #[test]
    fn intercept_aims_ahead_of_player() {
        let g = Grid::bordered(40, 40);
        // Player heading down; the projection flips the dominant axis.
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Down };
        let e = enemy_at(23, 30, Direction::Up, Strategy::Chase);
        let mut rng = StdRng::seed_from_u64(1);

        let chase = decide_direction(&ctx(&g, quarry, false), &e, &profile(Strategy::Chase), &mut rng);
        assert_eq!(chase, Direction::Up);

        let intercept = Strategy::Intercept { depth: 8 };
        let d = decide_direction(&ctx(&g, quarry, false), &e, &profile(intercept), &mut rng);
        assert_eq!(quarry.projected(8), (20, 28));
        assert_eq!(d, Direction::Left);
    }

    #[test]
    fn random_keeps_straight_without_turn_chance() {
        let g = Grid::bordered(40, 40);
        let quarry = Quarry { x: 2, y: 2, facing: Direction::Right };
        let e = enemy_at(10, 10, Direction::Down, Strategy::Random);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let d = decide_direction(&ctx(&g, quarry, true), &e, &profile(Strategy::Random), &mut rng);
            assert_eq!(d, Direction::Down);
        }
    }

    #[test]
    fn random_turns_away_from_wall() {
        let g = Grid::bordered(40, 40);
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Right };
        let e = enemy_at(1, 10, Direction::Left, Strategy::Random);
        let mut rng = StdRng::seed_from_u64(5);
        let d = decide_direction(&ctx(&g, quarry, false), &e, &profile(Strategy::Random), &mut rng);
        assert_ne!(d, Direction::Left);
    }

    #[test]
    fn boxed_in_enemy_keeps_facing() {
        let mut g = Grid::bordered(10, 10);
        for d in Direction::ALL {
            let (x, y) = d.step_from(5, 5);
            g.set_base(x, y, Tile::Obstacle);
        }
        let quarry = Quarry { x: 1, y: 1, facing: Direction::Right };
        let e = enemy_at(5, 5, Direction::Right, Strategy::Chase);
        let mut rng = StdRng::seed_from_u64(2);
        let d = decide_direction(&ctx(&g, quarry, true), &e, &profile(Strategy::Chase), &mut rng);
        assert_eq!(d, Direction::Right);
    }

    #[test]
    fn zero_aggression_intercept_aims_at_player() {
        let g = Grid::bordered(40, 40);
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Down };
        let e = enemy_at(23, 30, Direction::Up, Strategy::Chase);
        let mut cautious = profile(Strategy::Intercept { depth: 8 });
        cautious.aggression = 0.0;
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = decide_direction(&ctx(&g, quarry, false), &e, &cautious, &mut rng);
            assert_eq!(d, Direction::Up);
        }
    }

    #[test]
    fn spawned_seeker_always_chases() {
        let cfg = SimConfig::default().ai;
        let seeker = enemy_profile(Archetype::Seeker, 2, &cfg, &Ruleset::classic());
        assert!(seeker.aggression < 1.0);

        let g = Grid::bordered(40, 40);
        let quarry = Quarry { x: 20, y: 20, facing: Direction::Right };
        let e = enemy_at(25, 20, Direction::Up, Strategy::Chase);
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = decide_direction(&ctx(&g, quarry, true), &e, &seeker, &mut rng);
            assert_eq!(d, Direction::Left, "seed {seed}");
        }
    }

    #[test]
    fn preferred_direction_ties_go_horizontal() {
        assert_eq!(preferred_direction(0, 0, 3, 3), Some(Direction::Right));
        assert_eq!(preferred_direction(0, 0, -3, 3), Some(Direction::Left));
        assert_eq!(preferred_direction(0, 0, 1, -4), Some(Direction::Up));
        assert_eq!(preferred_direction(4, 4, 4, 4), None);
    }

    // ── difficulty ──

    #[test]
    fn prediction_depth_is_monotonic() {
        let table = [0, 0, 2, 4, 6];
        let mut prev = 0;
        for stage in 1..10 {
            let d = prediction_depth(&table, 3, stage, true, 1, 10);
            assert!(d >= prev);
            prev = d;
        }
        assert_eq!(prediction_depth(&table, 3, 1, true, 1, 10), 2);
        assert_eq!(prediction_depth(&table, 3, 4, true, 1, 10), 5);
        assert_eq!(prediction_depth(&table, 5, 9, true, 1, 10), 10);
        assert_eq!(prediction_depth(&table, 5, 9, false, 1, 10), 6);
        for tier in 1..5u8 {
            assert!(prediction_depth(&table, tier, 2, true, 1, 10)
                <= prediction_depth(&table, tier + 1, 2, true, 1, 10));
        }
    }

    #[test]
    fn prediction_depth_handles_short_table() {
        assert_eq!(prediction_depth(&[3], 5, 1, false, 0, 10), 3);
        assert_eq!(prediction_depth(&[], 2, 1, false, 0, 10), 0);
    }
}
