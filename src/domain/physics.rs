/// Disc physics: sub-step advance with bounded bounces, plus hit detection.
///
/// ## Sub-step Rules
///
/// One call to `advance_disc` is one sub-step. Per tick the coordinator runs
/// `disc_steps_per_tick` sub-steps and calls `find_hit` after **each** one,
/// so a disc moving several cells per tick can never tunnel through an actor.
///
///   1. Look at the next cell along the disc's direction.
///   2. Off the grid, wall or obstacle:
///        bounces left → spend one, reverse direction, stay put  (Bounced)
///        none left    → stop                                    (Stopped/Exhausted)
///   3. Otherwise move there.
///   4. Moved onto a trail and the ruleset says trails stop discs → stop.
///
/// A disc with a bounce cap of N therefore survives N wall contacts and
/// stops on the N+1th, and is never committed onto a blocking cell.
///
/// Physics reads the grid only; trails are never cut by discs.

use super::entity::{Actor, ActorId, Disc};
use super::grid::Grid;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DiscStop {
    /// Hit a wall with no bounces left.
    Exhausted,
    /// Entered a trail cell.
    Trail,
    /// Struck an actor.
    Hit(ActorId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DiscStep {
    Moved,
    Bounced,
    Stopped(DiscStop),
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// Run one sub-step. Inactive discs do nothing and report their stop.
pub fn advance_disc(disc: &mut Disc, grid: &Grid, stops_on_trail: bool) -> DiscStep {
    if !disc.active {
        return DiscStep::Stopped(DiscStop::Exhausted);
    }

    let (nx, ny) = disc.next_cell();
    if !grid.in_bounds(nx, ny) || grid.current_tile(nx, ny).is_blocking() {
        if disc.bounces_left == 0 {
            disc.stop();
            return DiscStep::Stopped(DiscStop::Exhausted);
        }
        disc.bounces_left -= 1;
        disc.dir = disc.dir.opposite();
        return DiscStep::Bounced;
    }

    disc.x = nx;
    disc.y = ny;

    if stops_on_trail && grid.current_tile(nx, ny).is_trail() {
        disc.stop();
        return DiscStep::Stopped(DiscStop::Trail);
    }
    DiscStep::Moved
}

// ══════════════════════════════════════════════════════════════
// Hit detection
// ══════════════════════════════════════════════════════════════

/// First living actor, other than the thrower, on the disc's cell.
pub fn find_hit<'a, I>(disc: &Disc, actors: I) -> Option<ActorId>
where
    I: IntoIterator<Item = &'a Actor>,
{
    if !disc.active {
        return None;
    }
    actors
        .into_iter()
        .find(|a| a.id != disc.owner && a.is_alive() && a.x == disc.x && a.y == disc.y)
        .map(|a| a.id)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
