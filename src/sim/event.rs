/// Events emitted during a simulation step.
/// The runner turns these into progression awards and presenter notifications.

use crate::domain::entity::{ActorId, Archetype};
use crate::domain::tile::Tile;

use super::level::StageId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// Drove into the boundary ring.
    Crashed { id: ActorId },
    /// Bounced off an interior hazard.
    Bounced { id: ActorId, tile: Tile },
    Collision { first: ActorId, second: ActorId },
    DiscThrown { x: i32, y: i32 },
    DiscHit { target: ActorId },
    EnemyDestroyed { id: ActorId, archetype: Archetype, award: u32 },
    StageCleared { stage: StageId, bonus: u32 },
    GameOver { score: u32 },
}
