/// The step function: advances the world by one tick.
///
/// Processing order:
///   0. Input      (steer with optional reversal lockout, then fire)
///   1. Enemies    (AI decision, then move resolution, roster order)
///   2. Player     (move resolution)
///   3. Contacts   (actor-vs-actor, same cell, at least one arrived this tick)
///   4. Discs      (hit test in place, then sub-steps with a hit test after each)
///   5. Trail decay
///   6. Casualties (awards for every enemy that died this tick)
///   7. Win / lose check (a clear also wipes the remaining trails)
///   8. Roster cleanup (dead enemies removed)
///
/// Moves are validate-then-commit: the destination is classified first and
/// the actor's position only changes when the verdict is `Clear`. A rejected
/// move never touches the grid.
///
/// Enemy moves always resolve before the player's, and all actor movement
/// and contacts finish before any disc moves. Tests below pin this down.

use crate::domain::ai::{self, AiContext, Quarry};
use crate::domain::entity::{Actor, ActorId, Direction, Disc};
use crate::domain::grid::Grid;
use crate::domain::physics::{self, DiscStep};
use crate::domain::rules::{self, ContactEffect, MoveVerdict};
use super::event::GameEvent;
use super::world::{Phase, WorldState};

/// Stage-clear bonus per whole life left.
const LIFE_BONUS: u32 = 100;

/// Input captured since the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    pub steer: Option<Direction>,
    pub fire: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: TickInput) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    // moved[slot]: did this actor change cell this tick? slot 0 = player.
    let mut moved = vec![false; world.slot_count()];

    resolve_input(world, input, &mut events);
    resolve_enemy_movement(world, &mut moved, &mut events);
    resolve_player_movement(world, &mut moved, &mut events);
    resolve_contacts(world, &moved, &mut events);
    resolve_discs(world, &mut events);
    let faded = world.grid.decay_step(world.tick, world.config.trail_decay_ticks);
    if faded > 0 {
        log::trace!("tick {}: {faded} trail cells faded", world.tick);
    }
    resolve_casualties(world, &mut events);
    resolve_outcome(world, &mut events);
    world.enemies.retain(|e| e.is_alive());

    events
}

// ══════════════════════════════════════════════════════════════
// Input
// ══════════════════════════════════════════════════════════════

fn resolve_input(world: &mut WorldState, input: TickInput, events: &mut Vec<GameEvent>) {
    world.fire_cooldown = world.fire_cooldown.saturating_sub(1);
    if !world.player.is_alive() { return; }

    if let Some(dir) = input.steer {
        if rules::steer_allowed(world.player.facing, dir, world.config.player_reverse_lockout) {
            world.player.set_direction(dir);
        }
    }

    if input.fire && world.rules.weapons_enabled && world.fire_cooldown == 0 {
        let p = &world.player;
        world.discs.push(Disc::new(p.id, p.x, p.y, p.facing, world.config.disc_bounces));
        world.fire_cooldown = world.config.fire_cooldown_ticks;
        events.push(GameEvent::DiscThrown { x: p.x, y: p.y });
    }
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_enemy_movement(world: &mut WorldState, moved: &mut [bool], events: &mut Vec<GameEvent>) {
    let quarry = Quarry::of(&world.player);
    let tick = world.tick;
    let wall_damage = world.config.wall_damage;

    for i in 0..world.enemies.len() {
        if !world.enemies[i].is_alive() { continue; }

        // The AI only runs when the enemy is actually about to move.
        if world.enemies[i].ready_to_move() {
            if let Some(profile) = world.enemies[i].profile().copied() {
                let ctx = AiContext {
                    grid: &world.grid,
                    quarry,
                    dead_end_check: world.rules.dead_end_check,
                    random_turn_chance: world.config.ai.random_turn_chance,
                };
                let dir = ai::decide_direction(&ctx, &world.enemies[i], &profile, &mut world.rng);
                world.enemies[i].turn(dir);
            }
        }

        moved[i + 1] = resolve_move(&mut world.enemies[i], &mut world.grid, tick, wall_damage, events);
    }
}

fn resolve_player_movement(world: &mut WorldState, moved: &mut [bool], events: &mut Vec<GameEvent>) {
    let tick = world.tick;
    let wall_damage = world.config.wall_damage;
    moved[0] = resolve_move(&mut world.player, &mut world.grid, tick, wall_damage, events);
}

/// Shared move resolution. Returns `true` if the actor changed cell.
///
///   stunned        → recover, no move
///   cooling down   → wait
///   boundary       → lives to 0
///   hazard         → damage, reverse, stun
///   clear          → commit, trail on the vacated cell (speed zones stay bare)
fn resolve_move(
    actor: &mut Actor,
    grid: &mut Grid,
    tick: u64,
    wall_damage: f32,
    events: &mut Vec<GameEvent>,
) -> bool {
    if !actor.is_alive() { return false; }
    if actor.stunned {
        actor.advance();
        return false;
    }
    if actor.move_cooldown > 0 {
        actor.move_cooldown -= 1;
        return false;
    }
    actor.move_cooldown = actor.move_interval.saturating_sub(1);

    let (nx, ny) = actor.next_cell();
    match rules::classify_move(grid, nx, ny) {
        MoveVerdict::Fatal => {
            actor.lives = 0.0;
            events.push(GameEvent::Crashed { id: actor.id });
            false
        }
        MoveVerdict::Bounce(tile) => {
            actor.change_lives(-wall_damage);
            actor.set_opposite_direction();
            actor.stun();
            events.push(GameEvent::Bounced { id: actor.id, tile });
            false
        }
        MoveVerdict::Clear => {
            let (ox, oy) = (actor.x, actor.y);
            actor.advance();
            if rules::vacated_leaves_trail(grid, ox, oy) {
                grid.mark_trail(ox, oy, actor.trail_tile(), tick);
            } else {
                grid.clear_trail(ox, oy);
            }
            true
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Actor-vs-actor contacts
// ══════════════════════════════════════════════════════════════

fn resolve_contacts(world: &mut WorldState, moved: &[bool], events: &mut Vec<GameEvent>) {
    let damage = world.config.collision_damage;
    let ruleset = world.rules;
    let slots = world.slot_count();

    for a in 0..slots {
        for b in (a + 1)..slots {
            if !moved[a] && !moved[b] { continue; }
            let (Some(first), Some(second)) = (world.slot(a), world.slot(b)) else { continue };
            if !first.is_alive() || !second.is_alive() { continue; }
            if (first.x, first.y) != (second.x, second.y) { continue; }

            let (ids, kinds) = ((first.id, second.id), (first.kind, second.kind));
            let (effect_a, effect_b) = rules::contact_outcome(&kinds.0, &kinds.1, &ruleset, damage);
            apply_contact(world.slot_mut(a), effect_a);
            apply_contact(world.slot_mut(b), effect_b);
            events.push(GameEvent::Collision { first: ids.0, second: ids.1 });
        }
    }
}

fn apply_contact(actor: Option<&mut Actor>, effect: ContactEffect) {
    let Some(actor) = actor else { return };
    match effect {
        ContactEffect::Hurt(amount) => {
            actor.change_lives(-amount);
            actor.stun();
        }
        ContactEffect::Destroyed => actor.lives = 0.0,
    }
}

// ══════════════════════════════════════════════════════════════
// Discs
// ══════════════════════════════════════════════════════════════

fn resolve_discs(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let stops_on_trail = world.rules.disc_stops_on_trail;
    let sub_steps = world.config.disc_steps_per_tick;

    for disc in world.discs.iter_mut() {
        // An actor may have driven onto the disc during the movement phase.
        if strike(disc, &mut world.player, &mut world.enemies, events) {
            continue;
        }
        for _ in 0..sub_steps {
            if let DiscStep::Stopped(_) = physics::advance_disc(disc, &world.grid, stops_on_trail) {
                break;
            }
            // Hit test after every sub-step, before the next one.
            if strike(disc, &mut world.player, &mut world.enemies, events) {
                break;
            }
        }
    }
    world.discs.retain(|d| d.active);
}

/// Hit test on the disc's current cell. A hit stops the disc and destroys
/// the target.
fn strike(disc: &mut Disc, player: &mut Actor, enemies: &mut [Actor], events: &mut Vec<GameEvent>) -> bool {
    let actors = std::iter::once(&*player).chain(enemies.iter());
    let Some(target) = physics::find_hit(disc, actors) else { return false };
    disc.stop();
    destroy(player, enemies, target);
    events.push(GameEvent::DiscHit { target });
    true
}

fn destroy(player: &mut Actor, enemies: &mut [Actor], id: ActorId) {
    if player.id == id {
        player.lives = 0.0;
    } else if let Some(e) = enemies.iter_mut().find(|e| e.id == id) {
        e.lives = 0.0;
    }
}

// ══════════════════════════════════════════════════════════════
// Casualties & outcome
// ══════════════════════════════════════════════════════════════

/// Dead enemies are removed at the end of every tick, so any dead enemy
/// still in the roster died during this one.
fn resolve_casualties(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let per_tier = world.config.kill_award_per_tier;
    for e in world.enemies.iter().filter(|e| !e.is_alive()) {
        let Some(profile) = e.profile() else { continue };
        let award = per_tier * u32::from(profile.tier);
        world.session.score += award;
        log::info!("{} {:?} destroyed at ({},{}) +{award}", profile.archetype.label(), e.id, e.x, e.y);
        events.push(GameEvent::EnemyDestroyed { id: e.id, archetype: profile.archetype, award });
    }
}

/// Game over wins over stage clear when both happen on the same tick.
/// Either one moves the phase off `Playing`, so each fires exactly once.
fn resolve_outcome(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.player.is_alive() {
        world.phase = Phase::GameOver;
        let score = world.session.score;
        log::info!("game over on stage {} with score {score}", world.stage);
        events.push(GameEvent::GameOver { score });
        return;
    }

    if world.enemies.iter().all(|e| !e.is_alive()) {
        let stage = world.stage;
        let whole_lives = world.player.lives.floor().max(0.0) as u32;
        let bonus = world.config.stage_bonus * stage.stage + LIFE_BONUS * whole_lives;
        world.session.score += bonus;
        world.session.record_clear(stage);
        world.grid.clear_all_trails();
        world.phase = Phase::StageClear;
        log::info!("stage {stage} cleared at tick {}, bonus {bonus}", world.tick);
        events.push(GameEvent::StageCleared { stage, bonus });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
