/// UI-side view model.
///
/// The UI thread never sees `WorldState`. It folds the `SimMessage` stream into
/// a `ViewState` (latest frame, transient status line, outcome banner) and keeps
/// its own `Camera` into the arena.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera`: viewport into the arena (top-left corner + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Arenas smaller than the viewport are centered

use std::time::{Duration, Instant};

use crate::sim::level::StageId;
use crate::sim::present::{Frame, SimMessage};

/// How long a status message stays on screen.
pub const STATUS_TTL: Duration = Duration::from_millis(2500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    StageClear { stage: StageId, bonus: u32 },
    GameOver { score: u32 },
}

pub struct ViewState {
    pub frame: Option<Frame>,
    pub camera: Camera,
    pub outcome: Option<Outcome>,
    status: Option<(String, Instant)>,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState {
            frame: None,
            camera: Camera::new(),
            outcome: None,
            status: None,
        }
    }

    pub fn apply(&mut self, msg: SimMessage) {
        self.apply_at(msg, Instant::now());
    }

    fn apply_at(&mut self, msg: SimMessage, now: Instant) {
        match msg {
            SimMessage::Redraw(frame) => {
                // A fresh stage (tick 0) clears any banner left from the last one.
                if frame.hud.tick == 0 {
                    self.outcome = None;
                }
                self.frame = Some(*frame);
            }
            SimMessage::Status(text) => self.status = Some((text, now)),
            SimMessage::StageClear { stage, bonus } => {
                self.outcome = Some(Outcome::StageClear { stage, bonus });
            }
            SimMessage::GameOver { score } => self.outcome = Some(Outcome::GameOver { score }),
        }
    }

    /// Current status line, if it has not expired.
    pub fn status(&self) -> Option<&str> {
        self.status_at(Instant::now())
    }

    fn status_at(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| now.duration_since(*at) < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }

    /// Drop the status line once it has expired.
    pub fn expire_status(&mut self) {
        if self.status.is_some() && self.status().is_none() {
            self.status = None;
        }
    }

    /// Stage shown in the HUD, if a frame has arrived.
    pub fn stage(&self) -> Option<StageId> {
        self.frame.as_ref().map(|f| f.hud.stage)
    }
}

/// Camera: a viewport into the arena.
///
/// `(x, y)` is the arena coordinate of the top-left visible cell.
/// `(view_w, view_h)` is how many arena cells fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Camera {
    /// Arena X of the top-left visible cell (negative when centering)
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Follow a target with a dead zone: only scroll when the target nears the
    /// edge of the viewport.
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x, self.view_w, world_w);
        self.y = follow_axis(self.y, target_y, self.view_h, world_h);
    }

    /// Snap directly onto a target. Used when a stage starts.
    pub fn center_on(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x, self.view_w, world_w);
        self.y = center_axis(target_y, self.view_h, world_h);
    }

    /// Arena coordinate to viewport coordinate, or None if off screen.
    pub fn world_to_view(&self, wx: i32, wy: i32) -> Option<(usize, usize)> {
        let vx = wx - self.x;
        let vy = wy - self.y;
        if vx < 0 || vy < 0 || vx >= self.view_w as i32 || vy >= self.view_h as i32 {
            return None;
        }
        Some((vx as usize, vy as usize))
    }
}

fn centered(view: usize, world: usize) -> i32 {
    -((view as i32 - world as i32) / 2)
}

fn clamp_origin(origin: i32, view: usize, world: usize) -> i32 {
    origin.max(0).min((world as i32 - view as i32).max(0))
}

fn follow_axis(origin: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return centered(view, world);
    }
    // 20% margin on each side
    let margin = view as i32 / 5;
    let low = origin + margin;
    let high = origin + view as i32 - margin - 1;
    let moved = if target < low {
        target - margin
    } else if target > high {
        target - view as i32 + margin + 1
    } else {
        origin
    };
    clamp_origin(moved, view, world)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return centered(view, world);
    }
    clamp_origin(target - view as i32 / 2, view, world)
}
