/// Entities: Actor (player or enemy cycle) and Disc (thrown projectile).
/// The actor state machine is minimal: normal or stunned, alive or not.

use serde::Deserialize;

use super::ai::Strategy;
use super::tile::Tile;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed probe order: up, down, left, right.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Cell offset `(dx, dy)`; y grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn step_from(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.offset();
        (x + dx, y + dy)
    }
}

/// Discrete key input → facing. WASD or vi keys.
impl TryFrom<char> for Direction {
    type Error = char;

    fn try_from(input: char) -> Result<Self, Self::Error> {
        match input.to_ascii_lowercase() {
            'w' | 'k' => Ok(Direction::Up),
            's' | 'j' => Ok(Direction::Down),
            'a' | 'h' => Ok(Direction::Left),
            'd' | 'l' => Ok(Direction::Right),
            other => Err(other),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct ActorId(pub usize);

/// Enemy archetypes, weakest first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Drone,
    Seeker,
    Hunter,
    Elite,
    Warden,
}

impl Archetype {
    pub fn tier(self) -> u8 {
        match self {
            Archetype::Drone => 1,
            Archetype::Seeker => 2,
            Archetype::Hunter => 3,
            Archetype::Elite => 4,
            Archetype::Warden => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Archetype::Drone => "Drone",
            Archetype::Seeker => "Seeker",
            Archetype::Hunter => "Hunter",
            Archetype::Elite => "Elite",
            Archetype::Warden => "Warden",
        }
    }

    pub fn is_boss(self) -> bool {
        matches!(self, Archetype::Warden)
    }
}

/// Everything the AI needs about an enemy, fixed at spawn time.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EnemyProfile {
    pub archetype: Archetype,
    pub tier: u8,
    pub strategy: Strategy,
    /// Probability per decision that an intercepting enemy aims at the
    /// projected point rather than at the player's cell.
    pub aggression: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ActorKind {
    Player,
    Enemy(EnemyProfile),
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub lives: f32,
    pub max_lives: f32,
    pub stunned: bool,
    pub move_interval: u32, // ticks per move, 1 = every tick
    pub move_cooldown: u32, // ticks until next move
}

impl Actor {
    pub fn player(id: ActorId, x: i32, y: i32, facing: Direction, lives: f32) -> Self {
        Actor {
            id,
            kind: ActorKind::Player,
            x,
            y,
            facing,
            lives,
            max_lives: lives,
            stunned: false,
            move_interval: 1,
            move_cooldown: 0,
        }
    }

    pub fn enemy(
        id: ActorId,
        x: i32,
        y: i32,
        facing: Direction,
        profile: EnemyProfile,
        lives: f32,
        move_interval: u32,
    ) -> Self {
        Actor {
            id,
            kind: ActorKind::Enemy(profile),
            x,
            y,
            facing,
            lives,
            max_lives: lives,
            stunned: false,
            move_interval: move_interval.max(1),
            move_cooldown: 0,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ActorKind::Player)
    }

    pub fn is_alive(&self) -> bool {
        self.lives > 0.0
    }

    pub fn profile(&self) -> Option<&EnemyProfile> {
        match &self.kind {
            ActorKind::Enemy(p) => Some(p),
            ActorKind::Player => None,
        }
    }

    /// Overlay tag this actor leaves behind.
    pub fn trail_tile(&self) -> Tile {
        if self.is_player() { Tile::PlayerTrail } else { Tile::EnemyTrail }
    }

    /// Will the next move attempt actually try to move? (not stunned, not cooling down)
    pub fn ready_to_move(&self) -> bool {
        self.is_alive() && !self.stunned && self.move_cooldown == 0
    }

    /// Map a discrete input (a key char or a `Direction`) to a facing.
    /// Invalid input is ignored.
    pub fn set_direction<D: TryInto<Direction>>(&mut self, input: D) -> bool {
        match input.try_into() {
            Ok(dir) => {
                self.facing = dir;
                true
            }
            Err(_) => false,
        }
    }

    pub fn turn(&mut self, dir: Direction) {
        self.facing = dir;
    }

    /// Proposed destination for the next move.
    pub fn next_cell(&self) -> (i32, i32) {
        self.facing.step_from(self.x, self.y)
    }

    /// Commit one step along `facing`, unless stunned: a stunned actor
    /// spends this attempt recovering and does not move.
    /// Collision checks happen before this is called.
    pub fn advance(&mut self) -> bool {
        if self.stunned {
            self.stunned = false;
            return false;
        }
        let (nx, ny) = self.next_cell();
        self.x = nx;
        self.y = ny;
        true
    }

    pub fn stun(&mut self) {
        self.stunned = true;
    }

    pub fn set_opposite_direction(&mut self) {
        self.facing = self.facing.opposite();
    }

    /// No clamping; anything <= 0 counts as dead.
    pub fn change_lives(&mut self, delta: f32) {
        self.lives += delta;
    }
}

/// A thrown disc. Moves several cells per tick and bounces off walls
/// a bounded number of times.
#[derive(Clone, Debug)]
pub struct Disc {
    pub owner: ActorId,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub bounces_left: u8,
    pub active: bool,
}

impl Disc {
    pub fn new(owner: ActorId, x: i32, y: i32, dir: Direction, bounces: u8) -> Self {
        Disc { owner, x, y, dir, bounces_left: bounces, active: true }
    }

    pub fn next_cell(&self) -> (i32, i32) {
        self.dir.step_from(self.x, self.y)
    }

    pub fn stop(&mut self) {
        self.active = false;
    }
}
