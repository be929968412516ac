/// Presentation seam.
///
/// The simulation pushes one-way notifications through `Presenter`; it never
/// reads anything back. `ChannelPresenter` hands them to the UI thread over an
/// `mpsc` channel, so the UI only ever sees owned snapshots.

use std::sync::mpsc::Sender;

use crate::domain::entity::{ActorId, Archetype, Direction};
use crate::domain::tile::Tile;

use super::level::StageId;
use super::world::Phase;

// ── Snapshots ──

#[derive(Clone, Debug, PartialEq)]
pub struct ActorView {
    pub id: ActorId,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub is_player: bool,
    pub archetype: Option<Archetype>,
    pub stunned: bool,
    pub lives: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscView {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hud {
    pub stage: StageId,
    pub pilot: String,
    pub lives: f32,
    pub max_lives: f32,
    pub score: u32,
    pub enemies_left: usize,
    pub tick: u64,
    pub weapons: bool,
    pub fire_ready: bool,
}

/// Everything needed to draw one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Effective tiles, row-major.
    pub tiles: Vec<Vec<Tile>>,
    pub actors: Vec<ActorView>,
    pub discs: Vec<DiscView>,
    pub phase: Phase,
    pub hud: Hud,
}

impl Frame {
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 {
            return Tile::Empty;
        }
        self.tiles
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
            .unwrap_or_default()
    }

    pub fn player(&self) -> Option<&ActorView> {
        self.actors.iter().find(|a| a.is_player)
    }
}

// ── Presenter ──

pub trait Presenter: Send {
    fn notify_redraw(&mut self, frame: Frame);
    fn notify_status(&mut self, message: &str);
    fn notify_game_over(&mut self, score: u32);
    fn notify_stage_clear(&mut self, stage: StageId, bonus: u32);
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimMessage {
    Redraw(Box<Frame>),
    Status(String),
    GameOver { score: u32 },
    StageClear { stage: StageId, bonus: u32 },
}

/// Forwards every notification to a channel. A closed receiver is ignored:
/// the UI going away is not the simulation's problem.
pub struct ChannelPresenter {
    tx: Sender<SimMessage>,
}

impl ChannelPresenter {
    pub fn new(tx: Sender<SimMessage>) -> Self {
        ChannelPresenter { tx }
    }

    fn send(&self, msg: SimMessage) {
        if self.tx.send(msg).is_err() {
            log::trace!("presenter receiver closed; dropping message");
        }
    }
}

impl Presenter for ChannelPresenter {
    fn notify_redraw(&mut self, frame: Frame) {
        self.send(SimMessage::Redraw(Box::new(frame)));
    }

    fn notify_status(&mut self, message: &str) {
        self.send(SimMessage::Status(message.to_string()));
    }

    fn notify_game_over(&mut self, score: u32) {
        self.send(SimMessage::GameOver { score });
    }

    fn notify_stage_clear(&mut self, stage: StageId, bonus: u32) {
        self.send(SimMessage::StageClear { stage, bonus });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::tests::test_world;
    use std::sync::mpsc;

    #[test]
    fn channel_presenter_forwards_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut p = ChannelPresenter::new(tx);
        p.notify_status("hello");
        p.notify_stage_clear(StageId::new(1, 2), 300);
        p.notify_game_over(42);
        let got: Vec<SimMessage> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                SimMessage::Status("hello".into()),
                SimMessage::StageClear { stage: StageId::new(1, 2), bonus: 300 },
                SimMessage::GameOver { score: 42 },
            ]
        );
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut p = ChannelPresenter::new(tx);
        p.notify_redraw(test_world().frame());
        p.notify_status("nobody listening");
    }

    #[test]
    fn frame_tile_lookup_is_total() {
        let f = test_world().frame();
        assert_eq!(f.tile(0, 0), Tile::Wall);
        assert_eq!(f.tile(-1, 5), Tile::Empty);
        assert_eq!(f.tile(5, 400), Tile::Empty);
        assert!(f.player().is_some());
    }
}
