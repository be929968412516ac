/// Arena design routines.
///
/// Each layout paints base tiles onto a blank canvas. Positions are derived
/// from fractions of the canvas size so the same layout works at any size;
/// features that would not fit on a tiny canvas are skipped.

use rand::Rng;
use serde::Deserialize;

use super::tile::Tile;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaLayout {
    /// Border only.
    Open,
    /// Four 3×3 obstacle clusters at the quarter points.
    Pillars,
    /// Two horizontal speed-zone lanes with obstacle posts at their ends.
    SpeedLanes,
    /// Interior wall segments with gaps, central speed-zone strip.
    Gauntlet,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        ArenaLayout::Open
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ArenaDesign {
    pub layout: ArenaLayout,
    /// Open 1–3 random cells in the border wall.
    pub border_gaps: bool,
}

impl ArenaDesign {
    pub fn new(layout: ArenaLayout, border_gaps: bool) -> Self {
        ArenaDesign { layout, border_gaps }
    }
}

/// Run the full design routine for `design`.
pub fn paint<R: Rng + ?Sized>(canvas: &mut [Vec<Tile>], design: ArenaDesign, rng: &mut R) {
    paint_border(canvas);
    match design.layout {
        ArenaLayout::Open => {}
        ArenaLayout::Pillars => paint_pillars(canvas),
        ArenaLayout::SpeedLanes => paint_speed_lanes(canvas),
        ArenaLayout::Gauntlet => paint_gauntlet(canvas),
    }
    if design.border_gaps {
        open_border_gaps(canvas, rng);
    }
}

/// Wall ring around the outermost cells.
pub fn paint_border(canvas: &mut [Vec<Tile>]) {
    let h = canvas.len();
    if h == 0 {
        return;
    }
    let w = canvas[0].len();
    for x in 0..w {
        canvas[0][x] = Tile::Wall;
        canvas[h - 1][x] = Tile::Wall;
    }
    for row in canvas.iter_mut() {
        row[0] = Tile::Wall;
        row[w - 1] = Tile::Wall;
    }
}

fn dims(canvas: &[Vec<Tile>]) -> (usize, usize) {
    (canvas.first().map_or(0, |r| r.len()), canvas.len())
}

fn fill(canvas: &mut [Vec<Tile>], x0: usize, y0: usize, w: usize, h: usize, tile: Tile) {
    let (cw, ch) = dims(canvas);
    for y in y0..(y0 + h).min(ch.saturating_sub(1)) {
        for x in x0..(x0 + w).min(cw.saturating_sub(1)) {
            if x == 0 || y == 0 {
                continue;
            }
            canvas[y][x] = tile;
        }
    }
}

fn paint_pillars(canvas: &mut [Vec<Tile>]) {
    let (w, h) = dims(canvas);
    if w < 12 || h < 12 {
        return;
    }
    for &(fx, fy) in &[(1, 1), (3, 1), (1, 3), (3, 3)] {
        let cx = w * fx / 4;
        let cy = h * fy / 4;
        fill(canvas, cx - 1, cy - 1, 3, 3, Tile::Obstacle);
    }
}

fn paint_speed_lanes(canvas: &mut [Vec<Tile>]) {
    let (w, h) = dims(canvas);
    if w < 12 || h < 12 {
        return;
    }
    let x0 = 4;
    let x1 = w - 4;
    for &lane in &[h / 4, h - 1 - h / 4] {
        fill(canvas, x0, lane, x1 - x0, 1, Tile::SpeedZone);
        canvas[lane][x0 - 1] = Tile::Obstacle;
        canvas[lane][x1] = Tile::Obstacle;
    }
}

fn paint_gauntlet(canvas: &mut [Vec<Tile>]) {
    let (w, h) = dims(canvas);
    if w < 16 || h < 16 {
        return;
    }
    let span = h / 4;
    for &col in &[w / 3, w - 1 - w / 3] {
        fill(canvas, col, 3, 1, span, Tile::Wall);
        fill(canvas, col, h - 3 - span, 1, span, Tile::Wall);
    }
    let mid = h / 2;
    fill(canvas, w / 3 + 2, mid, w - 2 * (w / 3) - 4, 1, Tile::SpeedZone);
}

/// Punch 1–3 holes in the border wall, never at a corner.
/// Gap cells are still boundary cells, so entering one is fatal.
fn open_border_gaps<R: Rng + ?Sized>(canvas: &mut [Vec<Tile>], rng: &mut R) {
    let (w, h) = dims(canvas);
    if w < 3 || h < 3 {
        return;
    }
    let gaps = rng.gen_range(1..=3);
    for _ in 0..gaps {
        match rng.gen_range(0..4) {
            0 => canvas[0][rng.gen_range(1..w - 1)] = Tile::Empty,
            1 => canvas[h - 1][rng.gen_range(1..w - 1)] = Tile::Empty,
            2 => canvas[rng.gen_range(1..h - 1)][0] = Tile::Empty,
            _ => canvas[rng.gen_range(1..h - 1)][w - 1] = Tile::Empty,
        }
    }
}
