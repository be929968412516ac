/// Grid: the arena floor for one stage.
///
/// ## Tile Architecture
///
/// Two tile layers plus a timer layer:
///   - `base_tiles` : the arena as designed. **Never mutated** after construction.
///   - `tiles`      : the effective terrain (base + trail overlay).
///   - `trail_ticks`: placement tick of the trail at each cell, `0` = no trail.
///
/// Invariant: `tiles[y][x]` is a trail tag iff `trail_ticks[y][x] != 0`,
/// otherwise it equals `base_tiles[y][x]`. All trail mutations go through
/// `mark_trail()` / `clear_trail()` / `decay_step()` / `clear_all_trails()`
/// so the two never drift.
///
/// Coordinates are `(x, y)` = (column, row), signed so AI probes beyond the
/// edge are legal queries. Out-of-bounds reads return `Tile::Empty`.

use rand::Rng;

use super::arena::{self, ArenaDesign};
use super::tile::Tile;

/// Default arena edge length.
pub const ARENA_SIZE: usize = 40;

#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    base_tiles: Vec<Vec<Tile>>,
    tiles: Vec<Vec<Tile>>,
    trail_ticks: Vec<Vec<u64>>,
}

// ── Construction ──

impl Grid {
    /// An all-empty grid. Zero dimensions are a programmer error.
    #[cfg(test)]
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        Grid::from_canvas(vec![vec![Tile::Empty; width]; height])
    }

    /// Plain walled arena, no randomness involved.
    pub fn bordered(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        let mut canvas = vec![vec![Tile::Empty; width]; height];
        arena::paint_border(&mut canvas);
        Grid::from_canvas(canvas)
    }

    /// Fill with empty, run the design routine, then snapshot the result
    /// as the immutable base layer.
    pub fn from_design<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        design: ArenaDesign,
        rng: &mut R,
    ) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        let mut canvas = vec![vec![Tile::Empty; width]; height];
        arena::paint(&mut canvas, design, rng);
        Grid::from_canvas(canvas)
    }

    fn from_canvas(canvas: Vec<Vec<Tile>>) -> Self {
        let height = canvas.len();
        let width = canvas[0].len();
        Grid {
            width,
            height,
            tiles: canvas.clone(),
            base_tiles: canvas,
            trail_ticks: vec![vec![0; width]; height],
        }
    }

    /// Overwrite a base tile. Test fixtures only; the base layer is
    /// otherwise fixed once the design routine has run.
    #[cfg(test)]
    pub fn set_base(&mut self, x: i32, y: i32, tile: Tile) {
        if let Some((ux, uy)) = self.index(x, y) {
            self.base_tiles[uy][ux] = tile;
            if self.trail_ticks[uy][ux] == 0 {
                self.tiles[uy][ux] = tile;
            }
        }
    }

    /// Build a grid from a string diagram. Test fixtures only.
    /// Legend: '#'=Wall  'o'=Obstacle  '>'=SpeedZone
    ///         'p'=PlayerTrail  'e'=EnemyTrail (both placed at tick 1)  else Empty
    #[cfg(test)]
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows[0].len();
        let mut g = Grid::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let (x, y) = (x as i32, y as i32);
                match ch {
                    '#' => g.set_base(x, y, Tile::Wall),
                    'o' => g.set_base(x, y, Tile::Obstacle),
                    '>' => g.set_base(x, y, Tile::SpeedZone),
                    'p' => g.mark_trail(x, y, Tile::PlayerTrail, 1),
                    'e' => g.mark_trail(x, y, Tile::EnemyTrail, 1),
                    _ => {}
                }
            }
        }
        g
    }
}

// ── Queries ──

impl Grid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if x < 0 || y < 0 {
            return None;
        }
        let (ux, uy) = (x as usize, y as usize);
        if ux < self.width && uy < self.height {
            Some((ux, uy))
        } else {
            None
        }
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }

    /// Outer ring of the arena, or anywhere outside it.
    /// Entering one of these cells is fatal for an actor.
    pub fn is_boundary(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            None => true,
            Some((ux, uy)) => {
                ux == 0 || uy == 0 || ux + 1 == self.width || uy + 1 == self.height
            }
        }
    }

    /// Design-time tile at (x, y).
    #[inline]
    pub fn base_tile(&self, x: i32, y: i32) -> Tile {
        match self.index(x, y) {
            Some((ux, uy)) => self.base_tiles[uy][ux],
            None => Tile::Empty,
        }
    }

    /// Effective tile at (x, y): trail tag if one is live, else base.
    #[inline]
    pub fn current_tile(&self, x: i32, y: i32) -> Tile {
        match self.index(x, y) {
            Some((ux, uy)) => self.tiles[uy][ux],
            None => Tile::Empty,
        }
    }

    /// Placement tick of the trail at (x, y), `0` if none.
    #[cfg(test)]
    pub fn trail_tick(&self, x: i32, y: i32) -> u64 {
        match self.index(x, y) {
            Some((ux, uy)) => self.trail_ticks[uy][ux],
            None => 0,
        }
    }

    /// Effective layer, row-major, for presentation snapshots.
    pub fn tiles(&self) -> &[Vec<Tile>] {
        &self.tiles
    }
}

// ── Trail overlay mutation ──

impl Grid {
    /// Lay a trail tag at (x, y). Placement ticks are clamped to >= 1
    /// because 0 is reserved for "no trail".
    pub fn mark_trail(&mut self, x: i32, y: i32, owner: Tile, current_tick: u64) {
        if !owner.is_trail() {
            return;
        }
        if let Some((ux, uy)) = self.index(x, y) {
            self.tiles[uy][ux] = owner;
            self.trail_ticks[uy][ux] = current_tick.max(1);
        }
    }

    /// Remove any trail at (x, y), restoring the exact base tile.
    pub fn clear_trail(&mut self, x: i32, y: i32) {
        if let Some((ux, uy)) = self.index(x, y) {
            self.tiles[uy][ux] = self.base_tiles[uy][ux];
            self.trail_ticks[uy][ux] = 0;
        }
    }

    /// Clear every trail whose age has reached `duration`.
    /// Returns how many cells were cleared. Already-clear cells are untouched.
    pub fn decay_step(&mut self, current_tick: u64, duration: u64) -> usize {
        let mut cleared = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                let placed = self.trail_ticks[y][x];
                if placed == 0 {
                    continue;
                }
                if current_tick.saturating_sub(placed) >= duration {
                    self.tiles[y][x] = self.base_tiles[y][x];
                    self.trail_ticks[y][x] = 0;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Drop every trail at once, restoring the base layer.
    pub fn clear_all_trails(&mut self) {
        self.tiles.clone_from(&self.base_tiles);
        for row in self.trail_ticks.iter_mut() {
            row.fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let g = Grid::bordered(10, 10);
        assert_eq!(g.base_tile(-1, 3), Tile::Empty);
        assert_eq!(g.current_tile(3, 99), Tile::Empty);
        assert_eq!(g.trail_tick(-5, -5), 0);
    }

    #[test]
    fn border_is_wall_and_boundary() {
        let g = Grid::bordered(10, 8);
        assert_eq!(g.base_tile(0, 0), Tile::Wall);
        assert_eq!(g.base_tile(9, 4), Tile::Wall);
        assert_eq!(g.base_tile(4, 7), Tile::Wall);
        assert_eq!(g.base_tile(4, 4), Tile::Empty);
        assert!(g.is_boundary(0, 4));
        assert!(g.is_boundary(4, 7));
        assert!(g.is_boundary(-1, 4));
        assert!(!g.is_boundary(1, 1));
    }

    #[test]
    fn mark_trail_out_of_bounds_is_noop() {
        let mut g = Grid::new(5, 5);
        g.mark_trail(7, 7, Tile::PlayerTrail, 3);
        assert!(g.tiles().iter().flatten().all(|t| *t == Tile::Empty));
    }

    #[test]
    fn mark_trail_rejects_base_tags() {
        let mut g = Grid::new(5, 5);
        g.mark_trail(2, 2, Tile::Wall, 3);
        assert_eq!(g.current_tile(2, 2), Tile::Empty);
        assert_eq!(g.trail_tick(2, 2), 0);
    }

    #[test]
    fn trail_over_speed_zone_restores_speed_zone() {
        let mut g = Grid::new(5, 5);
        g.set_base(2, 2, Tile::SpeedZone);
        g.mark_trail(2, 2, Tile::EnemyTrail, 4);
        assert_eq!(g.current_tile(2, 2), Tile::EnemyTrail);
        assert_eq!(g.base_tile(2, 2), Tile::SpeedZone);

        g.decay_step(10, 5);
        assert_eq!(g.current_tile(2, 2), Tile::SpeedZone);
        assert_eq!(g.trail_tick(2, 2), 0);
    }

    #[test]
    fn decay_is_exact_and_idempotent() {
        let mut g = Grid::new(5, 5);
        g.mark_trail(1, 1, Tile::PlayerTrail, 10);

        assert_eq!(g.decay_step(14, 5), 0);
        assert_eq!(g.current_tile(1, 1), Tile::PlayerTrail);

        assert_eq!(g.decay_step(15, 5), 1);
        assert_eq!(g.current_tile(1, 1), Tile::Empty);

        assert_eq!(g.decay_step(15, 5), 0);
        assert_eq!(g.decay_step(40, 5), 0);
        assert_eq!(g.current_tile(1, 1), Tile::Empty);
    }

    #[test]
    fn tick_zero_placement_still_counts_as_trail() {
        let mut g = Grid::new(3, 3);
        g.mark_trail(1, 1, Tile::PlayerTrail, 0);
        assert_eq!(g.trail_tick(1, 1), 1);
        assert_eq!(g.current_tile(1, 1), Tile::PlayerTrail);
    }

    #[test]
    fn clear_all_trails_restores_base_layer() {
        let mut g = Grid::bordered(6, 6);
        g.set_base(2, 2, Tile::SpeedZone);
        g.mark_trail(2, 2, Tile::PlayerTrail, 3);
        g.mark_trail(3, 3, Tile::EnemyTrail, 4);
        g.clear_all_trails();
        assert_eq!(g.current_tile(2, 2), Tile::SpeedZone);
        assert_eq!(g.current_tile(3, 3), Tile::Empty);
        assert_eq!(g.current_tile(0, 0), Tile::Wall);
        assert_eq!(g.trail_tick(3, 3), 0);
        assert_eq!(g.decay_step(100, 1), 0);
    }

    #[test]
    #[should_panic]
    fn zero_dimension_panics() {
        let _ = Grid::new(0, 4);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Mark { x: i32, y: i32, enemy: bool },
        Decay,
        Advance(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i32..8, 0i32..8, any::<bool>()).prop_map(|(x, y, enemy)| Op::Mark { x, y, enemy }),
            Just(Op::Decay),
            (1u64..4).prop_map(Op::Advance),
        ]
    }

    proptest! {
        /// Whatever sequence of trail placements and decays runs, a cell with
        /// no live timer shows its base tile, and a cell with a live timer is
        /// younger than the decay duration as of the last decay pass.
        #[test]
        fn prop_overlay_matches_timers(
            ops in prop::collection::vec(op_strategy(), 1..200),
            duration in 1u64..10,
        ) {
            let mut g = Grid::new(8, 8);
            g.set_base(3, 3, Tile::SpeedZone);
            g.set_base(5, 2, Tile::SpeedZone);
            let mut tick = 1u64;
            let mut last_decay: Option<u64> = None;

            for op in ops {
                match op {
                    Op::Mark { x, y, enemy } => {
                        let tag = if enemy { Tile::EnemyTrail } else { Tile::PlayerTrail };
                        g.mark_trail(x, y, tag, tick);
                    }
                    Op::Decay => {
                        g.decay_step(tick, duration);
                        last_decay = Some(tick);
                    }
                    Op::Advance(n) => tick += n,
                }

                for y in 0..8 {
                    for x in 0..8 {
                        let placed = g.trail_tick(x, y);
                        if placed == 0 {
                            prop_assert_eq!(g.current_tile(x, y), g.base_tile(x, y));
                        } else {
                            prop_assert!(g.current_tile(x, y).is_trail());
                        }
                    }
                }
            }

            if let Some(at) = last_decay {
                // A second pass at the same tick must clear nothing.
                prop_assert_eq!(g.decay_step(at, duration), 0);
            }
        }

        #[test]
        fn prop_decay_never_early(placed in 1u64..1000, duration in 1u64..50, age in 0u64..50) {
            let mut g = Grid::new(4, 4);
            g.mark_trail(1, 2, Tile::PlayerTrail, placed);
            let now = placed + age;
            let cleared = g.decay_step(now, duration);
            if age >= duration {
                prop_assert_eq!(cleared, 1);
                prop_assert_eq!(g.current_tile(1, 2), Tile::Empty);
            } else {
                prop_assert_eq!(cleared, 0);
                prop_assert_eq!(g.current_tile(1, 2), Tile::PlayerTrail);
            }
        }
    }
}
