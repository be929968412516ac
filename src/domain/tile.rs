/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// The first four variants are base tiles painted by the arena design.
/// Trail variants only ever live in the grid overlay.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Wall,        // Border and interior walls
    Obstacle,    // Interior clusters, same collision as Wall
    SpeedZone,   // Shortens the tick interval while the player sits on it
    PlayerTrail,
    EnemyTrail,
}

impl Tile {
    /// Does this tile stop movement outright? (bounce for actors and discs)
    pub fn is_blocking(self) -> bool {
        matches!(self, Tile::Wall | Tile::Obstacle)
    }

    /// Is this an overlay trail tag?
    pub fn is_trail(self) -> bool {
        matches!(self, Tile::PlayerTrail | Tile::EnemyTrail)
    }

    /// Anything an actor bounces off.
    pub fn is_hazard(self) -> bool {
        self.is_blocking() || self.is_trail()
    }

    pub fn is_speed_zone(self) -> bool {
        matches!(self, Tile::SpeedZone)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Empty
    }
}
