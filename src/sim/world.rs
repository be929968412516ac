/// WorldState: the complete simulation state of one running stage.
///
/// ## Ownership
///
/// The world is owned by exactly one thread (the runner's). Only
/// `sim::step` and `sim::level` mutate it; AI and disc physics receive
/// `&Grid` and never write. Presentation sees `Frame` snapshots only.
///
/// ## Actor Slots
///
/// The player is held separately from the enemy roster. Contact resolution
/// addresses actors by slot: `0` = player, `k + 1` = `enemies[k]`.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimConfig;
use crate::domain::entity::{Actor, ActorId, Direction, Disc};
use crate::domain::grid::Grid;
use crate::domain::rules::Ruleset;

use super::level::StageId;
use super::present::{ActorView, DiscView, Frame, Hud};
use super::session::Session;

pub const PLAYER_ID: ActorId = ActorId(0);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// No stage loaded yet.
    Idle,
    Playing,
    StageClear,
    GameOver,
}

pub struct WorldState {
    // ── Arena ──
    pub grid: Grid,

    // ── Entities ──
    pub player: Actor,
    pub enemies: Vec<Actor>,
    pub discs: Vec<Disc>,

    // ── Stage ──
    pub stage: StageId,
    pub rules: Ruleset,
    pub phase: Phase,
    pub tick: u64,
    /// Ticks until the player may throw again.
    pub fire_cooldown: u32,
    /// Score when the stage began; restored by a stage reset.
    pub stage_start_score: u32,

    // ── Campaign / tuning ──
    pub session: Session,
    pub config: SimConfig,
    pub rng: StdRng,
}

impl WorldState {
    /// An idle world: walled arena, player in the middle, no enemies.
    pub fn new(config: SimConfig, session: Session, seed: u64) -> Self {
        let grid = Grid::bordered(config.arena_width, config.arena_height);
        let (cx, cy) = ((config.arena_width / 2) as i32, (config.arena_height / 2) as i32);
        let player = Actor::player(PLAYER_ID, cx, cy, Direction::Up, session.pilot.max_lives);
        WorldState {
            grid,
            player,
            enemies: Vec::new(),
            discs: Vec::new(),
            stage: StageId::new(1, 1),
            rules: Ruleset::default(),
            phase: Phase::Idle,
            tick: 0,
            fire_cooldown: 0,
            stage_start_score: 0,
            session,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Interval until the next tick; shorter while the player rides a speed zone.
    pub fn tick_interval(&self) -> Duration {
        let on_speed_zone = self.player.is_alive()
            && self.grid.base_tile(self.player.x, self.player.y).is_speed_zone();
        let ms = if on_speed_zone {
            self.config.speed_zone_tick_ms
        } else {
            self.config.tick_rate_ms
        };
        Duration::from_millis(ms)
    }

    pub fn living_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }

    /// Number of actor slots (player + roster).
    pub fn slot_count(&self) -> usize {
        1 + self.enemies.len()
    }

    pub fn slot(&self, slot: usize) -> Option<&Actor> {
        if slot == 0 { Some(&self.player) } else { self.enemies.get(slot - 1) }
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut Actor> {
        if slot == 0 { Some(&mut self.player) } else { self.enemies.get_mut(slot - 1) }
    }

    /// Snapshot for the presentation layer.
    pub fn frame(&self) -> Frame {
        let actors = std::iter::once(&self.player)
            .chain(self.enemies.iter())
            .filter(|a| a.is_alive())
            .map(|a| ActorView {
                id: a.id,
                x: a.x,
                y: a.y,
                facing: a.facing,
                is_player: a.is_player(),
                archetype: a.profile().map(|p| p.archetype),
                stunned: a.stunned,
                lives: a.lives,
            })
            .collect();
        let discs = self
            .discs
            .iter()
            .filter(|d| d.active)
            .map(|d| DiscView { x: d.x, y: d.y })
            .collect();
        Frame {
            width: self.grid.width(),
            height: self.grid.height(),
            tiles: self.grid.tiles().to_vec(),
            actors,
            discs,
            phase: self.phase,
            hud: Hud {
                stage: self.stage,
                pilot: self.session.pilot.name.clone(),
                lives: self.player.lives.max(0.0),
                max_lives: self.player.max_lives,
                score: self.session.score,
                enemies_left: self.living_enemies(),
                tick: self.tick,
                weapons: self.rules.weapons_enabled,
                fire_ready: self.fire_cooldown == 0,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sim::session::Pilot;

    /// Idle world on a plain bordered 40x40 arena with default tuning.
    pub(crate) fn test_world() -> WorldState {
        let session = Session::new(Pilot { name: "Tester".into(), max_lives: 3.0 });
        WorldState::new(SimConfig::default(), session, 7)
    }

    #[test]
    fn new_world_is_idle_and_centred() {
        let w = test_world();
        assert_eq!(w.phase, Phase::Idle);
        assert_eq!((w.player.x, w.player.y), (20, 20));
        assert_eq!(w.player.lives, 3.0);
        assert_eq!(w.slot_count(), 1);
    }

    #[test]
    fn speed_zone_shortens_interval() {
        let mut w = test_world();
        assert_eq!(w.tick_interval(), Duration::from_millis(w.config.tick_rate_ms));
        w.grid.set_base(20, 20, crate::domain::tile::Tile::SpeedZone);
        assert_eq!(w.tick_interval(), Duration::from_millis(w.config.speed_zone_tick_ms));
    }

    #[test]
    fn frame_skips_dead_and_inactive() {
        let mut w = test_world();
        w.discs.push(Disc::new(PLAYER_ID, 3, 3, Direction::Up, 1));
        w.discs.push(Disc::new(PLAYER_ID, 4, 4, Direction::Up, 1));
        w.discs[1].stop();
        let f = w.frame();
        assert_eq!(f.actors.len(), 1);
        assert!(f.actors[0].is_player);
        assert_eq!(f.discs.len(), 1);
        assert_eq!(f.tiles.len(), 40);
        assert_eq!(f.hud.enemies_left, 0);

        w.player.lives = -0.5;
        let f = w.frame();
        assert!(f.actors.is_empty());
        assert_eq!(f.hud.lives, 0.0);
    }
}
