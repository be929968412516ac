/// Entry point and UI loop.
///
/// The simulation runs on its own thread (`sim::runner`). This thread only
/// reads keys, forwards them as commands, folds `SimMessage`s into the view
/// and renders.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;

use config::GameConfig;
use sim::level::{StageCatalog, StageId};
use sim::present::{ChannelPresenter, SimMessage};
use sim::progression::ProgressLog;
use sim::runner::{SimError, SimHandle};
use sim::session::{Pilot, Session};
use sim::world::WorldState;
use ui::input::{Action, InputState};
use ui::renderer::Renderer;
use ui::view::{Outcome, ViewState};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

#[derive(Parser, Debug)]
#[command(name = "lightcycle")]
#[command(about = "Terminal light-cycle arena against tiered AI opponents")]
struct Args {
    /// Config file (default: first config.toml found in the search path)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Chapter to start in (overrides config)
    #[arg(long)]
    chapter: Option<u32>,
    /// Stage within the chapter (overrides config)
    #[arg(long)]
    stage: Option<u32>,
    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Log destination; the terminal itself is taken by the game
    #[arg(long, default_value = "lightcycle.log")]
    log_file: PathBuf,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Logging disabled ({}): {e}", args.log_file.display());
    }

    let config = GameConfig::load(args.config.as_deref());
    let catalog = StageCatalog::from_defs(&config.stages);
    let start = StageId::new(
        args.chapter.unwrap_or(config.campaign.start.chapter),
        args.stage.unwrap_or(config.campaign.start.stage),
    );
    if catalog.get(start).is_none() {
        log::warn!("stage {start} is not in the catalog (first is {}), using a generated stage", catalog.first());
    }
    let seed = args.seed.unwrap_or_else(clock_seed);
    log::info!("starting at stage {start} with seed {seed}, {} stages in catalog", catalog.len());

    let pilot = Pilot {
        name: config.campaign.pilot_name.clone(),
        max_lives: config.sim.player_lives,
    };
    let world = WorldState::new(config.sim.clone(), Session::new(pilot), seed);

    let (tx, rx) = mpsc::channel();
    let sim = match SimHandle::spawn(world, catalog.clone(), ChannelPresenter::new(tx), ProgressLog::new()) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Simulation failed to start: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new();
    let enhanced_keys = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let mut view = ViewState::new();
    let result = game_loop(&sim, &catalog, start, &rx, &mut view, &mut renderer, enhanced_keys);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = sim.stop() {
        eprintln!("Simulation error: {e}");
    }
    if let Err(e) = result {
        log::error!("game loop: {e}");
        eprintln!("Game error: {e}");
    }

    let score = view.frame.as_ref().map_or(0, |f| f.hud.score);
    println!();
    println!("End of line, {}.", config.campaign.pilot_name);
    println!("Final Score: {score}");
}

fn game_loop(
    sim: &SimHandle,
    catalog: &StageCatalog,
    start: StageId,
    rx: &Receiver<SimMessage>,
    view: &mut ViewState,
    renderer: &mut Renderer,
    enhanced_keys: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced_keys;
    sim.start_stage(start)?;

    loop {
        kb.drain_events();
        for action in kb.actions() {
            match action {
                Action::Quit => return Ok(()),
                Action::Steer(dir) => sim.set_player_direction(dir)?,
                Action::Fire => sim.fire_weapon()?,
                Action::Reset => sim.reset_stage()?,
                Action::Confirm => confirm(sim, catalog, view)?,
            }
        }

        loop {
            match rx.try_recv() {
                Ok(msg) => view.apply(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err("simulation thread exited".into()),
            }
        }
        view.expire_status();

        renderer.render(view)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

/// Enter: next stage after a clear, retry after game over.
fn confirm(sim: &SimHandle, catalog: &StageCatalog, view: &mut ViewState) -> Result<(), SimError> {
    match view.outcome {
        Some(Outcome::StageClear { stage, .. }) => match catalog.next_after(stage) {
            Some(next) => sim.start_stage(next),
            None => {
                view.apply(SimMessage::Status("Campaign complete! R replays the last stage".into()));
                Ok(())
            }
        },
        Some(Outcome::GameOver { .. }) => sim.reset_stage(),
        None => Ok(()),
    }
}

/// Route `log` output to a file: the terminal is in raw alternate-screen mode.
fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
