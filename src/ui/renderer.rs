/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next screen into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous screen)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each arena cell is two terminal columns wide so the grid looks square.
///
/// Screen layout:
///   row 0          HUD
///   row 2..        arena viewport (through the camera)
///   below arena    status line, then key help

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Archetype, Direction};
use crate::domain::tile::Tile;
use crate::sim::present::{ActorView, Frame};
use crate::sim::world::Phase;

use super::view::{Outcome, ViewState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, so the gap
    /// between rows matches the cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 12, g: 14, b: 24 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 10, g: 30, b: 60 };
const STATUS_BG: Color = Color::Rgb { r: 0, g: 150, b: 170 };
const PLAYER_FG: Color = Color::Rgb { r: 120, g: 240, b: 255 };
const PLAYER_TRAIL: Color = Color::Rgb { r: 0, g: 120, b: 150 };
const ENEMY_TRAIL: Color = Color::Rgb { r: 170, g: 70, b: 0 };
const DISC_FG: Color = Color::Rgb { r: 255, g: 255, b: 255 };

// ── Renderer ──

/// Terminal columns per arena cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
        }
    }

    /// Enter raw alternate-screen mode. Returns whether the terminal will
    /// report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, view: &mut ViewState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase = view.frame.as_ref().map(|f| f.phase);
        if phase != self.last_phase {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = phase;
        }

        self.compose(view);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, view: &mut ViewState) {
        self.front.clear();
        let Some(frame) = view.frame.as_ref() else {
            self.front.put_str(2, 1, "Waiting for the arena to boot...", Color::DarkGrey, Color::Reset);
            return;
        };

        // Viewport from terminal size, capped to the arena.
        let reserved_rows = MAP_ROW + 4; // HUD + gap + status + help
        let cam = &mut view.camera;
        cam.view_w = (self.term_w / CELL_W).min(frame.width);
        cam.view_h = self.term_h.saturating_sub(reserved_rows).max(1).min(frame.height);
        if let Some(p) = frame.player() {
            if frame.hud.tick == 0 {
                cam.center_on(p.x, p.y, frame.width, frame.height);
            } else {
                cam.follow(p.x, p.y, frame.width, frame.height);
            }
        }

        self.compose_hud(frame);
        self.compose_arena(frame, view);
        self.compose_status(view);
        if let Some(outcome) = view.outcome {
            self.compose_outcome(outcome, view);
        }
    }

    fn compose_hud(&mut self, frame: &Frame) {
        let hud = &frame.hud;
        let mut line = format!(
            " Stage {}  {}  ♥ {:.1}/{:.1}  Score:{:<7}  Enemies:{}",
            hud.stage, hud.pilot, hud.lives, hud.max_lives, hud.score, hud.enemies_left,
        );
        if hud.weapons {
            line.push_str(if hud.fire_ready { "  Disc:READY" } else { "  Disc:--" });
        }
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &line, Color::White, HUD_BG);
    }

    fn compose_arena(&mut self, frame: &Frame, view: &ViewState) {
        let cam = &view.camera;
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= self.front.width { break; }
                let (wx, wy) = (cam.x + vx as i32, cam.y + vy as i32);
                let (c0, c1, fg, bg) = if wx < 0 || wy < 0 || wx >= frame.width as i32 || wy >= frame.height as i32 {
                    (' ', ' ', Color::White, Cell::BASE_BG)
                } else {
                    tile_glyph(frame.tile(wx, wy))
                };
                self.front.set(col, row, Cell::new(c0, fg, bg));
                self.front.set(col + 1, row, Cell::new(c1, fg, bg));
            }
        }

        for disc in &frame.discs {
            if let Some((vx, vy)) = cam.world_to_view(disc.x, disc.y) {
                let bg = self.front.get(vx * CELL_W, MAP_ROW + vy).bg;
                self.front.set(vx * CELL_W, MAP_ROW + vy, Cell::new('◆', DISC_FG, bg));
                self.front.set(vx * CELL_W + 1, MAP_ROW + vy, Cell::new(' ', DISC_FG, bg));
            }
        }

        // Player last so it is never hidden.
        let mut actors: Vec<&ActorView> = frame.actors.iter().collect();
        actors.sort_by_key(|a| a.is_player);
        for a in actors {
            if let Some((vx, vy)) = cam.world_to_view(a.x, a.y) {
                let (c0, c1, fg) = actor_glyph(a);
                self.front.set(vx * CELL_W, MAP_ROW + vy, Cell::new(c0, fg, Cell::BASE_BG));
                self.front.set(vx * CELL_W + 1, MAP_ROW + vy, Cell::new(c1, fg, Cell::BASE_BG));
            }
        }
    }

    fn compose_status(&mut self, view: &ViewState) {
        let msg_row = MAP_ROW + view.camera.view_h + 1;
        if let Some(text) = view.status() {
            if msg_row < self.front.height {
                self.front.fill_row(msg_row, STATUS_BG);
                self.front.put_str(0, msg_row, &format!(" ◈ {text} "), Color::Black, STATUS_BG);
            }
        }
        let help_row = msg_row + 1;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Steer  Space:Disc  R:Reset  Enter:Continue  Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_outcome(&mut self, outcome: Outcome, view: &ViewState) {
        let (color, lines) = match outcome {
            Outcome::StageClear { stage, bonus } => (
                Color::Rgb { r: 80, g: 255, b: 200 },
                [
                    format!("STAGE {stage} CLEAR"),
                    format!("Bonus +{bonus}"),
                    "ENTER: Next stage   R: Replay".to_string(),
                ],
            ),
            Outcome::GameOver { score } => (
                Color::Rgb { r: 255, g: 70, b: 40 },
                [
                    "DEREZZED".to_string(),
                    format!("Final Score: {score}"),
                    "ENTER: Retry stage   Q: Quit".to_string(),
                ],
            ),
        };

        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
        let view_cols = view.camera.view_w * CELL_W;
        let box_x = view_cols.saturating_sub(inner + 2) / 2;
        let box_y = MAP_ROW + view.camera.view_h.saturating_sub(lines.len() + 2) / 2;
        let bg = Color::Rgb { r: 20, g: 20, b: 30 };

        let bar = "═".repeat(inner);
        self.front.put_str(box_x, box_y, &format!("╔{bar}╗"), color, bg);
        for (i, line) in lines.iter().enumerate() {
            let padded = format!("{line:^inner$}");
            self.front.put_str(box_x, box_y + 1 + i, &format!("║{padded}║"), color, bg);
        }
        self.front.put_str(box_x, box_y + 1 + lines.len(), &format!("╚{bar}╝"), color, bg);
    }
}

fn tile_glyph(tile: Tile) -> (char, char, Color, Color) {
    match tile {
        Tile::Empty => ('·', ' ', Color::Rgb { r: 30, g: 40, b: 60 }, Color::Reset),
        Tile::Wall => ('█', '█', Color::Rgb { r: 0, g: 90, b: 120 }, Color::Rgb { r: 0, g: 60, b: 80 }),
        Tile::Obstacle => ('▓', '▓', Color::Rgb { r: 120, g: 120, b: 140 }, Color::Rgb { r: 60, g: 60, b: 75 }),
        Tile::SpeedZone => ('»', '»', Color::Rgb { r: 255, g: 220, b: 60 }, Color::Rgb { r: 40, g: 35, b: 0 }),
        Tile::PlayerTrail => (' ', ' ', Color::White, PLAYER_TRAIL),
        Tile::EnemyTrail => (' ', ' ', Color::White, ENEMY_TRAIL),
    }
}

fn arrow(facing: Direction) -> char {
    match facing {
        Direction::Up => '▲',
        Direction::Down => '▼',
        Direction::Left => '◀',
        Direction::Right => '▶',
    }
}

fn actor_glyph(a: &ActorView) -> (char, char, Color) {
    if a.is_player {
        return (arrow(a.facing), ' ', PLAYER_FG);
    }
    let (letter, fg) = match a.archetype {
        Some(Archetype::Drone) => ('d', Color::Rgb { r: 255, g: 160, b: 60 }),
        Some(Archetype::Seeker) => ('s', Color::Rgb { r: 255, g: 120, b: 40 }),
        Some(Archetype::Hunter) => ('H', Color::Rgb { r: 255, g: 80, b: 30 }),
        Some(Archetype::Elite) => ('E', Color::Rgb { r: 255, g: 40, b: 90 }),
        Some(Archetype::Warden) | None => ('W', Color::Rgb { r: 255, g: 0, b: 0 }),
    };
    let fg = if a.stunned { Color::DarkGrey } else { fg };
    (letter, arrow(a.facing), fg)
}
