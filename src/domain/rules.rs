/// Movement and contact rules, truth-table driven.
///
/// Pure functions over a read-only grid. These decide what a move or a
/// contact *means*; `sim::step` is the only caller that applies the result.
///
/// ## Move Classification (destination cell)
/// ┌──────────────────────────────┬──────────────┬──────────────────────────┐
/// │ Condition (priority order)   │ Verdict      │ Effect                   │
/// ├──────────────────────────────┼──────────────┼──────────────────────────┤
/// │ boundary ring / off the grid │ Fatal        │ lives -> 0               │
/// │ wall / obstacle              │ Bounce       │ damage, reverse, stun    │
/// │ player / enemy trail         │ Bounce       │ damage, reverse, stun    │
/// │ otherwise                    │ Clear        │ commit, trail on vacated │
/// └──────────────────────────────┴──────────────┴──────────────────────────┘
///
/// A border gap is still part of the boundary ring: driving out through
/// one is as fatal as driving into the wall beside it.
///
/// ## Actor-vs-Actor Contact
/// ┌───────────────────┬──────────────────┬──────────────────────────────┐
/// │ Pair              │ Weapons ruleset? │ Outcome                      │
/// ├───────────────────┼──────────────────┼──────────────────────────────┤
/// │ player + enemy    │ yes              │ enemy destroyed, player hurt │
/// │ player + enemy    │ no               │ both hurt                    │
/// │ enemy + enemy     │ either           │ both hurt                    │
/// └───────────────────┴──────────────────┴──────────────────────────────┘
///
/// "Hurt" = collision damage plus a stun.

use super::entity::{ActorKind, Direction};
use super::grid::Grid;
use super::tile::Tile;

// ── Rulesets ──

/// Rule variants. Chapter 1 plays classic, later chapters advanced.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ruleset {
    /// AI safety filter also rejects dead ends.
    pub dead_end_check: bool,
    /// Intercept depth grows with the stage number.
    pub stage_scaled_prediction: bool,
    /// Player may throw discs; player/enemy contact kills the enemy.
    pub weapons_enabled: bool,
    /// Discs stop when they enter a trail cell.
    pub disc_stops_on_trail: bool,
}

impl Ruleset {
    pub fn classic() -> Self {
        Ruleset {
            dead_end_check: false,
            stage_scaled_prediction: false,
            weapons_enabled: false,
            disc_stops_on_trail: false,
        }
    }

    pub fn advanced() -> Self {
        Ruleset {
            dead_end_check: true,
            stage_scaled_prediction: true,
            weapons_enabled: true,
            disc_stops_on_trail: true,
        }
    }

    pub fn for_chapter(chapter: u32) -> Self {
        if chapter >= 2 { Ruleset::advanced() } else { Ruleset::classic() }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Ruleset::classic()
    }
}

// ── Move classification ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveVerdict {
    /// Boundary: the actor is destroyed.
    Fatal,
    /// Interior hazard: partial damage and a bounce. Carries what was hit.
    Bounce(Tile),
    /// Free cell: commit the move.
    Clear,
}

/// Classify a proposed destination. See truth table above.
pub fn classify_move(grid: &Grid, x: i32, y: i32) -> MoveVerdict {
    if grid.is_boundary(x, y) {
        return MoveVerdict::Fatal;
    }
    let tile = grid.current_tile(x, y);
    if tile.is_hazard() {
        return MoveVerdict::Bounce(tile);
    }
    MoveVerdict::Clear
}

/// What the vacated cell becomes after a committed move.
/// Speed zones are never trailed; the base tile stays visible.
pub fn vacated_leaves_trail(grid: &Grid, x: i32, y: i32) -> bool {
    !grid.base_tile(x, y).is_speed_zone()
}

/// Player steering filter. With `lockout`, a request to reverse onto the
/// player's own trail is dropped.
pub fn steer_allowed(current: Direction, requested: Direction, lockout: bool) -> bool {
    !(lockout && requested == current.opposite())
}

// ── Contacts ──

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ContactEffect {
    /// Lose `f32` lives and get stunned.
    Hurt(f32),
    /// Lives go straight to zero.
    Destroyed,
}

/// Effects for the two parties of a same-cell contact, in argument order.
pub fn contact_outcome(
    first: &ActorKind,
    second: &ActorKind,
    rules: &Ruleset,
    damage: f32,
) -> (ContactEffect, ContactEffect) {
    let hurt = ContactEffect::Hurt(damage);
    if !rules.weapons_enabled {
        return (hurt, hurt);
    }
    match (first, second) {
        (ActorKind::Player, ActorKind::Enemy(_)) => (hurt, ContactEffect::Destroyed),
        (ActorKind::Enemy(_), ActorKind::Player) => (ContactEffect::Destroyed, hurt),
        _ => (hurt, hurt),
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai::Strategy;
    use crate::domain::entity::{Archetype, EnemyProfile};

    fn enemy_kind() -> ActorKind {
        ActorKind::Enemy(EnemyProfile {
            archetype: Archetype::Drone,
            tier: 1,
            strategy: Strategy::Random,
            aggression: 0.0,
        })
    }

    // ── classify_move ──

    #[test]
    fn boundary_is_fatal() {
        let g = Grid::from_rows(&[
            "#####",
            "#   #",
            "#####",
        ]);
        assert_eq!(classify_move(&g, 0, 1), MoveVerdict::Fatal);
        assert_eq!(classify_move(&g, 2, 0), MoveVerdict::Fatal);
        assert_eq!(classify_move(&g, -1, 1), MoveVerdict::Fatal);
        assert_eq!(classify_move(&g, 2, 7), MoveVerdict::Fatal);
    }

    #[test]
    fn border_gap_is_still_fatal() {
        let g = Grid::from_rows(&[
            "## ##",
            "#   #",
            "#####",
        ]);
        assert_eq!(classify_move(&g, 2, 0), MoveVerdict::Fatal);
    }

    #[test]
    fn interior_hazards_bounce() {
        let g = Grid::from_rows(&[
            "#######",
            "##ope #",
            "#######",
        ]);
        assert_eq!(classify_move(&g, 0, 1), MoveVerdict::Fatal);
        assert_eq!(classify_move(&g, 1, 1), MoveVerdict::Bounce(Tile::Wall));
        assert_eq!(classify_move(&g, 2, 1), MoveVerdict::Bounce(Tile::Obstacle));
        assert_eq!(classify_move(&g, 3, 1), MoveVerdict::Bounce(Tile::PlayerTrail));
        assert_eq!(classify_move(&g, 4, 1), MoveVerdict::Bounce(Tile::EnemyTrail));
        assert_eq!(classify_move(&g, 5, 1), MoveVerdict::Clear);
    }

    #[test]
    fn interior_wall_bounces() {
        let g = Grid::from_rows(&[
            "#####",
            "# # #",
            "#   #",
            "#####",
        ]);
        assert_eq!(classify_move(&g, 2, 1), MoveVerdict::Bounce(Tile::Wall));
    }

    #[test]
    fn speed_zone_is_clear_and_never_trailed() {
        let g = Grid::from_rows(&[
            "#####",
            "# > #",
            "#####",
        ]);
        assert_eq!(classify_move(&g, 2, 1), MoveVerdict::Clear);
        assert!(!vacated_leaves_trail(&g, 2, 1));
        assert!(vacated_leaves_trail(&g, 1, 1));
    }

    // ── steering ──

    #[test]
    fn lockout_blocks_only_reversal() {
        assert!(!steer_allowed(Direction::Up, Direction::Down, true));
        assert!(steer_allowed(Direction::Up, Direction::Left, true));
        assert!(steer_allowed(Direction::Up, Direction::Up, true));
        assert!(steer_allowed(Direction::Up, Direction::Down, false));
    }

    // ── rulesets ──

    #[test]
    fn chapter_selects_ruleset() {
        assert_eq!(Ruleset::for_chapter(1), Ruleset::classic());
        assert_eq!(Ruleset::for_chapter(2), Ruleset::advanced());
        assert_eq!(Ruleset::for_chapter(7), Ruleset::advanced());
        assert!(!Ruleset::default().weapons_enabled);
    }

    // ── contacts ──

    #[test]
    fn contact_without_weapons_hurts_both() {
        let rules = Ruleset::classic();
        let (a, b) = contact_outcome(&ActorKind::Player, &enemy_kind(), &rules, 1.0);
        assert_eq!(a, ContactEffect::Hurt(1.0));
        assert_eq!(b, ContactEffect::Hurt(1.0));
    }

    #[test]
    fn contact_with_weapons_kills_enemy() {
        let rules = Ruleset::advanced();
        let (a, b) = contact_outcome(&ActorKind::Player, &enemy_kind(), &rules, 1.0);
        assert_eq!(a, ContactEffect::Hurt(1.0));
        assert_eq!(b, ContactEffect::Destroyed);

        let (a, b) = contact_outcome(&enemy_kind(), &ActorKind::Player, &rules, 0.5);
        assert_eq!(a, ContactEffect::Destroyed);
        assert_eq!(b, ContactEffect::Hurt(0.5));
    }

    #[test]
    fn enemy_pair_is_symmetric_under_any_rules() {
        for rules in [Ruleset::classic(), Ruleset::advanced()] {
            let (a, b) = contact_outcome(&enemy_kind(), &enemy_kind(), &rules, 1.0);
            assert_eq!(a, b);
            assert_eq!(a, ContactEffect::Hurt(1.0));
        }
    }
}
