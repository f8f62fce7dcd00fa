//! The weighted random walk itself: direction sampling, toroidal movement,
//! and the seeded RNG every run draws from.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::params::SimulationParameters;

// ── Direction sampling ────────────────────────────────────────────────────────

/// One step direction on the grid.
///
/// Up decreases `y`, Down increases it; Left decreases `x`, Right increases
/// it. Together with [`wrap`] this makes the grid toroidal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The (dx, dy) offset of one step in this direction, before wrapping.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Maps a uniform draw in `[0, 100)` to a direction using cumulative
/// thresholds in the fixed order up, down, left, right.
///
/// With a valid parameter set the four percentages sum to exactly 100, so
/// every draw lands in exactly one band and a direction with weight 0 can
/// never be selected.
pub fn sample_direction(params: &SimulationParameters, draw: u8) -> Direction {
    let d = draw as u32;
    let up = params.p_up as u32;
    let down = up + params.p_down as u32;
    let left = down + params.p_left as u32;

    if d < up {
        Direction::Up
    } else if d < down {
        Direction::Down
    } else if d < left {
        Direction::Left
    } else {
        Direction::Right
    }
}

/// Wraps a coordinate onto `[0, size)`, handling the negative remainder that
/// `%` alone produces for coordinates that stepped below zero.
pub fn wrap(coord: i32, size: i32) -> i32 {
    ((coord % size) + size) % size
}

// ── RNG ───────────────────────────────────────────────────────────────────────

/// The run RNG: a small, fast, seedable ChaCha stream.
///
/// A given seed produces the same draw sequence on every platform, which is
/// what makes seeded runs reproducible end to end.
#[derive(Debug, Clone)]
pub struct WalkRng {
    inner: ChaCha8Rng,
}

impl WalkRng {
    /// Seeds the RNG for a run. A requested seed of 0 means "pick one": the
    /// effective seed is derived from the current time instead.
    pub fn for_run(requested_seed: u32) -> Self {
        let seed = if requested_seed == 0 {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            now.as_nanos() as u64
        } else {
            requested_seed as u64
        };
        WalkRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One uniform draw in `[0, 100)`.
    pub fn draw_percent(&mut self) -> u8 {
        self.inner.gen_range(0..100u8)
    }
}

// ── Walk state ────────────────────────────────────────────────────────────────

/// The walker's position and progress within one replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkState {
    /// Current column in `[0, width)`.
    pub x: i32,
    /// Current row in `[0, height)`.
    pub y: i32,
    /// Steps taken so far in this replication.
    pub step: u32,
}

impl WalkState {
    /// Places the walker at the start cell for a fresh replication.
    pub fn begin(params: &SimulationParameters) -> Self {
        let (x, y) = params.start_cell();
        WalkState { x, y, step: 0 }
    }

    /// Takes one step in `dir`, wrapping at the grid edges, and bumps the
    /// step counter.
    pub fn advance(&mut self, dir: Direction, params: &SimulationParameters) {
        let (dx, dy) = dir.delta();
        self.x = wrap(self.x + dx, params.width);
        self.y = wrap(self.y + dy, params.height);
        self.step += 1;
    }

    /// True when the walker sits on the origin cell (0, 0).
    pub fn at_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}
