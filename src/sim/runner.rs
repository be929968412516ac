/// Background simulation loop.
///
/// ## Threading model
///
/// One named worker thread owns the `WorldState` outright. Nothing else
/// touches it: the UI talks to the worker through `Command`s on an `mpsc`
/// channel and hears back through a `Presenter`. No locks.
///
///   UI thread ──Command──▶ worker ──SimMessage──▶ UI thread
///
/// The worker blocks in `recv_timeout` until either a command arrives or the
/// next tick is due. Steering and fire commands are buffered and consumed by
/// the next tick, so input always lands on a tick boundary.
///
/// Stopping is one-way: `Stop`, dropping the handle, or the command channel
/// disconnecting all end the loop.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;

use crate::domain::entity::Direction;

use super::event::GameEvent;
use super::level::{self, StageCatalog, StageId};
use super::present::Presenter;
use super::progression::Progression;
use super::step::{self, TickInput};
use super::world::{Phase, WorldState};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("could not spawn simulation thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("simulation thread is no longer running")]
    Disconnected,
    #[error("simulation thread panicked")]
    Panicked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Steer(Direction),
    Fire,
    StartStage(StageId),
    ResetStage,
    Stop,
}

/// Owner-side handle. Dropping it stops and joins the worker.
pub struct SimHandle {
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SimHandle {
    pub fn spawn<P, G>(
        world: WorldState,
        catalog: StageCatalog,
        presenter: P,
        progression: G,
    ) -> Result<Self, SimError>
    where
        P: Presenter + 'static,
        G: Progression + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("lightcycle-sim".into())
            .spawn(move || {
                let mut sim = Worker { world, catalog, presenter, progression, pending: TickInput::default() };
                sim.run(rx);
            })
            .map_err(SimError::Spawn)?;
        log::info!("simulation thread started");
        Ok(SimHandle { tx, worker: Some(worker) })
    }

    pub fn set_player_direction(&self, dir: Direction) -> Result<(), SimError> {
        self.send(Command::Steer(dir))
    }

    /// Cooldown and ruleset gating happen on the worker.
    pub fn fire_weapon(&self) -> Result<(), SimError> {
        self.send(Command::Fire)
    }

    pub fn start_stage(&self, id: StageId) -> Result<(), SimError> {
        self.send(Command::StartStage(id))
    }

    pub fn reset_stage(&self) -> Result<(), SimError> {
        self.send(Command::ResetStage)
    }

    /// Stop the loop and wait for the worker to exit.
    pub fn stop(mut self) -> Result<(), SimError> {
        self.shutdown()
    }

    fn send(&self, cmd: Command) -> Result<(), SimError> {
        self.tx.send(cmd).map_err(|_| SimError::Disconnected)
    }

    fn shutdown(&mut self) -> Result<(), SimError> {
        let Some(worker) = self.worker.take() else { return Ok(()) };
        // The worker may already be gone; joining still reports how it ended.
        let _ = self.tx.send(Command::Stop);
        worker.join().map_err(|_| SimError::Panicked)?;
        log::info!("simulation thread stopped");
        Ok(())
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{e}");
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Worker
// ══════════════════════════════════════════════════════════════

struct Worker<P, G> {
    world: WorldState,
    catalog: StageCatalog,
    presenter: P,
    progression: G,
    pending: TickInput,
}

impl<P: Presenter, G: Progression> Worker<P, G> {
    fn run(&mut self, rx: Receiver<Command>) {
        let mut deadline = Instant::now() + self.world.tick_interval();
        loop {
            let now = Instant::now();
            if now >= deadline {
                self.tick();
                deadline = now + self.world.tick_interval();
                continue;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(cmd) => {
                    if !self.apply(cmd) {
                        break;
                    }
                    if matches!(cmd, Command::StartStage(_) | Command::ResetStage) {
                        deadline = Instant::now() + self.world.tick_interval();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let session = &self.world.session;
        log::info!(
            "session over: score {}, {} stages cleared, best {}",
            session.score,
            session.stages_cleared(),
            session.best_stage().map_or_else(|| "none".to_string(), |s| s.to_string()),
        );
    }

    /// Returns `false` when the loop should end.
    fn apply(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Steer(dir) => self.pending.steer = Some(dir),
            Command::Fire => self.pending.fire = true,
            Command::StartStage(id) => {
                level::start_stage(&mut self.world, &self.catalog, id);
                self.announce_stage();
            }
            Command::ResetStage => {
                level::reset_stage(&mut self.world, &self.catalog);
                self.announce_stage();
            }
            Command::Stop => return false,
        }
        true
    }

    fn announce_stage(&mut self) {
        self.pending = TickInput::default();
        let msg = format!("Stage {} - {} enemies", self.world.stage, self.world.living_enemies());
        self.presenter.notify_status(&msg);
        self.presenter.notify_redraw(self.world.frame());
    }

    fn tick(&mut self) {
        if self.world.phase != Phase::Playing {
            return;
        }
        let input = std::mem::take(&mut self.pending);
        let events = step::step(&mut self.world, input);
        self.dispatch(&events);
        self.presenter.notify_redraw(self.world.frame());
    }

    fn dispatch(&mut self, events: &[GameEvent]) {
        let player_id = self.world.player.id;
        for event in events {
            match *event {
                GameEvent::EnemyDestroyed { id, archetype, award } => {
                    self.progression.award(&self.world.player, award);
                    let tag = if archetype.is_boss() { " (boss)" } else { "" };
                    self.presenter.notify_status(&format!("{}{tag} down +{award}", archetype.label()));
                    log::debug!("award {award} for {id:?}");
                }
                GameEvent::StageCleared { stage, bonus } => {
                    self.progression.award(&self.world.player, bonus);
                    self.presenter.notify_stage_clear(stage, bonus);
                }
                GameEvent::GameOver { score } => self.presenter.notify_game_over(score),
                GameEvent::Bounced { id, tile } if id == player_id => {
                    let msg = format!("{tile:?} impact! {:.1} lives left", self.world.player.lives.max(0.0));
                    self.presenter.notify_status(&msg);
                }
                GameEvent::Collision { first, second } if first == player_id || second == player_id => {
                    self.presenter.notify_status("Collision!");
                }
                GameEvent::Crashed { id } => log::debug!("{id:?} crashed"),
                GameEvent::DiscThrown { x, y } => log::debug!("disc thrown from ({x},{y})"),
                GameEvent::DiscHit { target } => log::debug!("disc hit {target:?}"),
                GameEvent::Bounced { .. } | GameEvent::Collision { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Actor;
    use crate::sim::present::{ChannelPresenter, SimMessage};
    use crate::sim::world::tests::test_world;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    /// Shares its total with the test thread.
    struct SharedTotal(Arc<Mutex<u32>>);

    impl Progression for SharedTotal {
        fn award(&mut self, _recipient: &Actor, amount: u32) {
            if let Ok(mut total) = self.0.lock() {
                *total += amount;
            }
        }
    }

    fn fast_world() -> WorldState {
        let mut w = test_world();
        w.config.tick_rate_ms = 1;
        w.config.speed_zone_tick_ms = 1;
        w
    }

    /// Wait for a redraw whose frame satisfies `pred`.
    fn wait_for_frame(rx: &Receiver<SimMessage>, pred: impl Fn(&crate::sim::present::Frame) -> bool) -> bool {
        let until = Instant::now() + WAIT;
        while Instant::now() < until {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(SimMessage::Redraw(frame)) if pred(&frame) => return true,
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        false
    }

    #[test]
    fn idle_until_stage_started() {
        let (tx, rx) = mpsc::channel();
        let handle = SimHandle::spawn(
            fast_world(),
            StageCatalog::builtin(),
            ChannelPresenter::new(tx),
            SharedTotal(Arc::default()),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());

        handle.start_stage(StageId::new(1, 1)).unwrap();
        assert!(wait_for_frame(&rx, |f| f.hud.tick > 0));
        handle.stop().unwrap();
    }

    #[test]
    fn start_stage_announces_and_ticks() {
        let (tx, rx) = mpsc::channel();
        let handle = SimHandle::spawn(
            fast_world(),
            StageCatalog::builtin(),
            ChannelPresenter::new(tx),
            SharedTotal(Arc::default()),
        )
        .unwrap();
        handle.start_stage(StageId::new(1, 2)).unwrap();

        match rx.recv_timeout(WAIT) {
            Ok(SimMessage::Status(msg)) => assert!(msg.contains("1-2"), "{msg}"),
            other => panic!("expected status first, got {other:?}"),
        }
        assert!(wait_for_frame(&rx, |f| f.hud.stage == StageId::new(1, 2) && f.hud.tick >= 2));
        handle.stop().unwrap();
    }

    #[test]
    fn steering_reaches_the_player() {
        let (tx, rx) = mpsc::channel();
        let handle = SimHandle::spawn(
            fast_world(),
            StageCatalog::builtin(),
            ChannelPresenter::new(tx),
            SharedTotal(Arc::default()),
        )
        .unwrap();
        handle.start_stage(StageId::new(1, 1)).unwrap();
        handle.set_player_direction(Direction::Left).unwrap();
        assert!(wait_for_frame(&rx, |f| f.player().map_or(false, |p| p.facing == Direction::Left)));
        handle.stop().unwrap();
    }

    #[test]
    fn clearing_the_roster_awards_and_announces() {
        let total = Arc::new(Mutex::new(0));
        let (tx, rx) = mpsc::channel();
        let mut worker = Worker {
            world: fast_world(),
            catalog: StageCatalog::builtin(),
            presenter: ChannelPresenter::new(tx),
            progression: SharedTotal(total.clone()),
            pending: TickInput::default(),
        };
        worker.apply(Command::StartStage(StageId::new(1, 1)));
        for e in &mut worker.world.enemies {
            e.lives = 0.0;
        }
        worker.tick();

        assert_eq!(worker.world.phase, Phase::StageClear);
        let msgs: Vec<SimMessage> = rx.try_iter().collect();
        assert!(msgs.iter().any(|m| matches!(m, SimMessage::StageClear { .. })));
        assert!(matches!(msgs.last(), Some(SimMessage::Redraw(_))));
        // Two drone kills plus the clear bonus.
        assert!(*total.lock().unwrap() > 200);

        // A cleared stage no longer ticks.
        let tick = worker.world.tick;
        worker.tick();
        assert_eq!(worker.world.tick, tick);
    }

    #[test]
    fn dropping_handle_stops_worker() {
        let (tx, rx) = mpsc::channel();
        let handle = SimHandle::spawn(
            fast_world(),
            StageCatalog::builtin(),
            ChannelPresenter::new(tx),
            SharedTotal(Arc::default()),
        )
        .unwrap();
        handle.start_stage(StageId::new(1, 1)).unwrap();
        drop(handle);
        // Worker is joined, so its presenter (the only sender) is gone.
        let drained: Vec<SimMessage> = rx.iter().collect();
        assert!(drained.iter().any(|m| matches!(m, SimMessage::Status(_))));
    }

    #[test]
    fn worker_dispatch_awards_and_notifies() {
        let total = Arc::new(Mutex::new(0));
        let (tx, rx) = mpsc::channel();
        let mut worker = Worker {
            world: fast_world(),
            catalog: StageCatalog::builtin(),
            presenter: ChannelPresenter::new(tx),
            progression: SharedTotal(total.clone()),
            pending: TickInput::default(),
        };
        worker.dispatch(&[
            GameEvent::EnemyDestroyed {
                id: crate::domain::entity::ActorId(3),
                archetype: crate::domain::entity::Archetype::Hunter,
                award: 300,
            },
            GameEvent::StageCleared { stage: StageId::new(1, 1), bonus: 550 },
        ]);
        assert_eq!(*total.lock().unwrap(), 850);
        let msgs: Vec<SimMessage> = rx.try_iter().collect();
        assert!(msgs.contains(&SimMessage::Status("Hunter down +300".into())));
        assert!(msgs.contains(&SimMessage::StageClear { stage: StageId::new(1, 1), bonus: 550 }));
    }

    #[test]
    fn commands_buffer_until_tick() {
        let (tx, _rx) = mpsc::channel();
        let mut worker = Worker {
            world: fast_world(),
            catalog: StageCatalog::builtin(),
            presenter: ChannelPresenter::new(tx),
            progression: SharedTotal(Arc::default()),
            pending: TickInput::default(),
        };
        assert!(worker.apply(Command::StartStage(StageId::new(1, 1))));
        let facing = worker.world.player.facing;
        assert!(worker.apply(Command::Steer(Direction::Left)));
        assert!(worker.apply(Command::Fire));
        assert_eq!(worker.world.player.facing, facing);
        assert_eq!(worker.pending, TickInput { steer: Some(Direction::Left), fire: true });

        worker.tick();
        assert_eq!(worker.pending, TickInput::default());
        assert_eq!(worker.world.player.facing, Direction::Left);
        assert!(!worker.apply(Command::Stop));
    }
}
