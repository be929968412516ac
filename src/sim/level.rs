/// Stage catalog, enemy spawning and stage lifecycle.
///
/// ## Sources (priority order):
///   1. `[[stage]]` tables from `config.toml`
///   2. Built-in campaign (2 chapters × 3 stages)
///   3. Fallback stage for any id neither of the above knows
///
/// ## Tier table
/// ┌──────────┬──────┬───────┬──────────┬────────────┬───────────┐
/// │ Archetype│ Tier │ Lives │ Interval │ Aggression │ Strategy  │
/// ├──────────┼──────┼───────┼──────────┼────────────┼───────────┤
/// │ Drone    │ 1    │ 1.0   │ 2        │ 0.00       │ Random    │
/// │ Seeker   │ 2    │ 2.0   │ 2        │ 0.60       │ Chase     │
/// │ Hunter   │ 3    │ 2.0   │ 1        │ 0.70       │ Intercept │
/// │ Elite    │ 4    │ 3.0   │ 1        │ 0.85       │ Intercept │
/// │ Warden   │ 5    │ 5.0   │ 1        │ 0.95       │ Intercept │
/// └──────────┴──────┴───────┴──────────┴────────────┴───────────┘
///
/// Aggression only matters to intercepting enemies: it is the chance per
/// decision of leading the player instead of aiming at the player's cell.
///
/// Intercept depth comes from the AI config table, resolved once at spawn.
/// Stage scaling uses the stage's position in the whole campaign, so the
/// first stage of chapter 2 is harder than the last one of chapter 1.

use std::fmt;

use rand::Rng;
use serde::Deserialize;

use crate::config::AiConfig;
use crate::domain::ai::{self, Strategy};
use crate::domain::arena::{ArenaDesign, ArenaLayout};
use crate::domain::entity::{Actor, ActorId, Archetype, Direction, EnemyProfile};
use crate::domain::grid::Grid;
use crate::domain::rules::Ruleset;
use crate::domain::tile::Tile;

use super::world::{Phase, WorldState, PLAYER_ID};

/// Random probes before falling back to a deterministic scan.
const SPAWN_ATTEMPTS: usize = 200;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct StageId {
    pub chapter: u32,
    pub stage: u32,
}

impl StageId {
    pub fn new(chapter: u32, stage: u32) -> Self {
        StageId { chapter, stage }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.chapter, self.stage)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RosterEntry {
    pub archetype: Archetype,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 { 1 }

/// Stage description as configured. Resolved into actors by `start_stage`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StageDef {
    pub chapter: u32,
    pub stage: u32,
    #[serde(default)]
    pub layout: ArenaLayout,
    #[serde(default)]
    pub border_gaps: bool,
    #[serde(default)]
    pub enemies: Vec<RosterEntry>,
    #[serde(default)]
    pub boss: Option<Archetype>,
    #[serde(default)]
    pub player_spawn: Option<(i32, i32)>,
}

impl StageDef {
    pub fn id(&self) -> StageId {
        StageId::new(self.chapter, self.stage)
    }

    pub fn enemy_count(&self) -> u32 {
        self.enemies.iter().map(|e| e.count).sum::<u32>() + u32::from(self.boss.is_some())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chapter == 0 || self.stage == 0 {
            return Err(format!("stage {} has a zero chapter or stage number", self.id()));
        }
        if self.enemy_count() == 0 {
            return Err(format!("stage {} has no enemies", self.id()));
        }
        Ok(())
    }

    /// Minimal stage used when an id is unknown: open arena, a few drones.
    pub fn fallback(id: StageId) -> Self {
        StageDef {
            chapter: id.chapter.max(1),
            stage: id.stage.max(1),
            layout: ArenaLayout::Open,
            border_gaps: false,
            enemies: vec![RosterEntry { archetype: Archetype::Drone, count: id.stage.clamp(1, 4) + 1 }],
            boss: None,
            player_spawn: None,
        }
    }

    fn builtin(
        chapter: u32,
        stage: u32,
        layout: ArenaLayout,
        border_gaps: bool,
        enemies: &[(Archetype, u32)],
        boss: Option<Archetype>,
    ) -> Self {
        StageDef {
            chapter,
            stage,
            layout,
            border_gaps,
            enemies: enemies
                .iter()
                .map(|&(archetype, count)| RosterEntry { archetype, count })
                .collect(),
            boss,
            player_spawn: None,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct StageCatalog {
    /// Sorted by id, unique ids.
    stages: Vec<StageDef>,
}

impl StageCatalog {
    pub fn builtin() -> Self {
        use Archetype::*;
        use ArenaLayout::*;
        let stages = vec![
            StageDef::builtin(1, 1, Open, false, &[(Drone, 2)], None),
            StageDef::builtin(1, 2, Pillars, false, &[(Drone, 2), (Seeker, 1)], None),
            StageDef::builtin(1, 3, SpeedLanes, false, &[(Seeker, 2)], Some(Elite)),
            StageDef::builtin(2, 1, Gauntlet, true, &[(Drone, 1), (Hunter, 2)], None),
            StageDef::builtin(2, 2, Pillars, true, &[(Seeker, 1), (Hunter, 1), (Elite, 1)], None),
            StageDef::builtin(2, 3, SpeedLanes, true, &[(Elite, 2)], Some(Warden)),
        ];
        StageCatalog { stages }
    }

    /// Built-ins overlaid with `defs`. Invalid defs are dropped with a warning;
    /// a valid def replaces any built-in with the same id.
    pub fn from_defs(defs: &[StageDef]) -> Self {
        let mut catalog = StageCatalog::builtin();
        for def in defs {
            if let Err(why) = def.validate() {
                log::warn!("ignoring configured stage: {why}");
                continue;
            }
            match catalog.stages.iter_mut().find(|s| s.id() == def.id()) {
                Some(existing) => *existing = def.clone(),
                None => catalog.stages.push(def.clone()),
            }
        }
        catalog.stages.sort_by_key(StageDef::id);
        catalog
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn get(&self, id: StageId) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.id() == id)
    }

    /// Known stage, or the fallback for an unknown id. Never fails.
    pub fn resolve(&self, id: StageId) -> StageDef {
        match self.get(id) {
            Some(def) => def.clone(),
            None => {
                log::warn!("stage {id} not in catalog; using fallback stage");
                StageDef::fallback(id)
            }
        }
    }

    pub fn first(&self) -> StageId {
        self.stages.first().map_or(StageId::new(1, 1), StageDef::id)
    }

    /// 1-based position of `id` in the campaign. Unknown ids count as
    /// following every catalog stage that sorts before them.
    pub fn ordinal(&self, id: StageId) -> u32 {
        let before = self.stages.iter().filter(|s| s.id() < id).count();
        u32::try_from(before).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    pub fn next_after(&self, id: StageId) -> Option<StageId> {
        self.stages.iter().map(StageDef::id).find(|&s| s > id)
    }
}

// ══════════════════════════════════════════════════════════════
// Archetype stats
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TierStats {
    pub lives: f32,
    pub move_interval: u32,
    pub aggression: f32,
}

/// See the tier table above.
pub fn tier_stats(archetype: Archetype) -> TierStats {
    let (lives, move_interval, aggression) = match archetype {
        Archetype::Drone => (1.0, 2, 0.0),
        Archetype::Seeker => (2.0, 2, 0.6),
        Archetype::Hunter => (2.0, 1, 0.7),
        Archetype::Elite => (3.0, 1, 0.85),
        Archetype::Warden => (5.0, 1, 0.95),
    };
    TierStats { lives, move_interval, aggression }
}

/// Resolve the archetype's strategy once, for the stage at campaign
/// position `ordinal` and this ruleset.
pub fn enemy_profile(archetype: Archetype, ordinal: u32, ai_cfg: &AiConfig, rules: &Ruleset) -> EnemyProfile {
    let tier = archetype.tier();
    let strategy = match archetype {
        Archetype::Drone => Strategy::Random,
        Archetype::Seeker => Strategy::Chase,
        Archetype::Hunter | Archetype::Elite | Archetype::Warden => Strategy::Intercept {
            depth: ai::prediction_depth(
                &ai_cfg.prediction_depth,
                tier,
                ordinal,
                rules.stage_scaled_prediction,
                ai_cfg.stage_depth_bonus,
                ai_cfg.max_prediction_depth,
            ),
        },
    };
    EnemyProfile {
        archetype,
        tier,
        strategy,
        aggression: tier_stats(archetype).aggression,
    }
}

// ══════════════════════════════════════════════════════════════
// Spawning
// ══════════════════════════════════════════════════════════════

fn manhattan(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

fn spawnable(grid: &Grid, x: i32, y: i32) -> bool {
    !grid.is_boundary(x, y) && grid.current_tile(x, y) == Tile::Empty
}

/// Pick a free cell at least `min_dist` from `player` and not in `taken`.
/// Random probes first, then a scan from the far corner, then any free cell.
fn pick_spawn<R: Rng + ?Sized>(
    grid: &Grid,
    player: (i32, i32),
    taken: &[(i32, i32)],
    min_dist: i32,
    rng: &mut R,
) -> Option<(i32, i32)> {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    if w < 3 || h < 3 {
        return None;
    }
    let free = |p: (i32, i32)| p != player && !taken.contains(&p) && spawnable(grid, p.0, p.1);

    for _ in 0..SPAWN_ATTEMPTS {
        let p = (rng.gen_range(1..w - 1), rng.gen_range(1..h - 1));
        if free(p) && manhattan(p, player) >= min_dist {
            return Some(p);
        }
    }

    let scan = || (1..h - 1).rev().flat_map(move |y| (1..w - 1).rev().map(move |x| (x, y)));
    scan()
        .find(|&p| free(p) && manhattan(p, player) >= min_dist)
        .or_else(|| scan().find(|&p| free(p)))
}

/// Resolve a stage's roster into concrete enemies with tier-scaled stats.
/// Enemies face the player. Ids start at `first_id`.
pub fn spawn_enemies_for_stage<R: Rng + ?Sized>(
    def: &StageDef,
    ordinal: u32,
    grid: &Grid,
    player: (i32, i32),
    ai_cfg: &AiConfig,
    rules: &Ruleset,
    first_id: usize,
    rng: &mut R,
) -> Vec<Actor> {
    let roster = def
        .enemies
        .iter()
        .flat_map(|e| std::iter::repeat(e.archetype).take(e.count as usize))
        .chain(def.boss);

    let mut taken: Vec<(i32, i32)> = Vec::new();
    let mut out = Vec::new();
    for archetype in roster {
        let Some((x, y)) = pick_spawn(grid, player, &taken, ai_cfg.min_spawn_distance, rng) else {
            log::warn!("stage {}: no room left to spawn a {}", def.id(), archetype.label());
            break;
        };
        taken.push((x, y));
        let stats = tier_stats(archetype);
        let profile = enemy_profile(archetype, ordinal, ai_cfg, rules);
        let facing = ai::preferred_direction(x, y, player.0, player.1).unwrap_or(Direction::Left);
        let id = ActorId(first_id + out.len());
        out.push(Actor::enemy(id, x, y, facing, profile, stats.lives, stats.move_interval));
    }
    out
}

/// Player spawn: the configured cell if usable, else lower-middle of the arena,
/// else the nearest free cell to it.
fn player_spawn(def: &StageDef, grid: &Grid) -> (i32, i32) {
    if let Some((x, y)) = def.player_spawn {
        if spawnable(grid, x, y) {
            return (x, y);
        }
        log::warn!("stage {}: configured player spawn ({x},{y}) is blocked", def.id());
    }
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let preferred = (w / 2, h * 3 / 4);
    if spawnable(grid, preferred.0, preferred.1) {
        return preferred;
    }
    (1..h - 1)
        .flat_map(|y| (1..w - 1).map(move |x| (x, y)))
        .filter(|&(x, y)| spawnable(grid, x, y))
        .min_by_key(|&p| manhattan(p, preferred))
        .unwrap_or(preferred)
}

// ══════════════════════════════════════════════════════════════
// Stage lifecycle
// ══════════════════════════════════════════════════════════════

/// Build a fresh stage: grid from its design, player reset with full lives,
/// enemies spawned, discs cleared. Score carries over from the session.
pub fn start_stage(world: &mut WorldState, catalog: &StageCatalog, id: StageId) {
    let def = catalog.resolve(id);
    let stage = def.id();

    world.stage = stage;
    world.rules = world.config.rules.apply(Ruleset::for_chapter(stage.chapter));
    world.grid = Grid::from_design(
        world.config.arena_width,
        world.config.arena_height,
        ArenaDesign::new(def.layout, def.border_gaps),
        &mut world.rng,
    );

    let (px, py) = player_spawn(&def, &world.grid);
    world.player = Actor::player(PLAYER_ID, px, py, Direction::Up, world.session.pilot.max_lives);
    world.enemies = spawn_enemies_for_stage(
        &def,
        catalog.ordinal(stage),
        &world.grid,
        (px, py),
        &world.config.ai,
        &world.rules,
        PLAYER_ID.0 + 1,
        &mut world.rng,
    );
    world.discs.clear();
    world.tick = 0;
    world.fire_cooldown = 0;
    world.stage_start_score = world.session.score;
    world.phase = if world.enemies.is_empty() { Phase::StageClear } else { Phase::Playing };

    log::info!(
        "stage {stage} started: {:?} layout, {} enemies, rules {:?}",
        def.layout,
        world.enemies.len(),
        world.rules
    );
}

/// Replay the current stage from scratch, restoring the score it began with.
pub fn reset_stage(world: &mut WorldState, catalog: &StageCatalog) {
    world.session.score = world.stage_start_score;
    let stage = world.stage;
    start_stage(world, catalog, stage);
}
