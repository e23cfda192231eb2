//! Static board evaluation used at search cutoffs.
//!
//! The score is a convex blend of six signals, each already in `[0, 1]`,
//! so the result is in `[0, 1]` as well. Boards with no available moves
//! score exactly 0.

use serde::{Deserialize, Serialize};

use crate::engine::Board;

/// `log2` of the largest tile the max-tile signal distinguishes (131072).
const MAX_TILE_LOG2_CEILING: f64 = 17.0;

/// Positional weights, highest in the top-left corner.
const POSITION_WEIGHTS: [[f64; 4]; 4] = [
    [15.0, 14.0, 13.0, 12.0],
    [11.0, 10.0, 9.0, 8.0],
    [7.0, 6.0, 5.0, 4.0],
    [3.0, 2.0, 1.0, 0.0],
];
const TOP_POSITION_WEIGHT: f64 = 15.0;

/// Blend coefficients for [`evaluate_with`]. Must be non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalWeights {
    pub empty: f64,
    pub monotonic: f64,
    pub corner: f64,
    pub merge: f64,
    pub weighted: f64,
    pub max_tile: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self { empty: 0.20, monotonic: 0.20, corner: 0.20, merge: 0.15, weighted: 0.15, max_tile: 0.10 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WeightsError {
    #[error("weight `{0}` is negative or not finite")]
    Negative(&'static str),
    #[error("weights sum to {0}, expected 1.0")]
    Sum(f64),
}

impl EvalWeights {
    /// Weights of the five-signal formula without the max-tile term.
    pub fn without_max_tile() -> Self {
        Self { empty: 0.25, monotonic: 0.20, corner: 0.20, merge: 0.20, weighted: 0.15, max_tile: 0.0 }
    }

    pub fn validate(&self) -> Result<(), WeightsError> {
        let named = [
            ("empty", self.empty),
            ("monotonic", self.monotonic),
            ("corner", self.corner),
            ("merge", self.merge),
            ("weighted", self.weighted),
            ("max_tile", self.max_tile),
        ];
        if let Some((name, _)) = named.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(WeightsError::Negative(*name));
        }
        let sum: f64 = named.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(WeightsError::Sum(sum));
        }
        Ok(())
    }
}

/// Per-signal breakdown of an evaluation, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Components {
    pub empty: f64,
    pub monotonic: f64,
    pub corner: f64,
    pub merge: f64,
    pub weighted: f64,
    pub max_tile: f64,
}

impl Components {
    pub fn compute(board: &Board) -> Self {
        let grid = board.rows();
        // Single pass for the sums, maxima and merge pairs.
        let mut sum = 0.0;
        let mut max_tile = 0u32;
        let mut empty = 0usize;
        let mut merge_potential = 0.0;
        for r in 0..4 {
            for c in 0..4 {
                let tile = grid[r][c];
                if tile == 0 {
                    empty += 1;
                    continue;
                }
                sum += tile as f64;
                max_tile = max_tile.max(tile);
                if c < 3 && grid[r][c + 1] == tile {
                    merge_potential += tile as f64;
                }
                if r < 3 && grid[r + 1][c] == tile {
                    merge_potential += tile as f64;
                }
            }
        }
        if sum == 0.0 {
            return Components { empty: empty as f64 / 16.0, ..Default::default() };
        }
        let corners = [grid[0][0], grid[0][3], grid[3][0], grid[3][3]];
        let best_corner = corners.into_iter().max().unwrap_or(0);
        Components {
            empty: empty as f64 / 16.0,
            monotonic: (monotonicity(&grid) / (2.0 * sum)).min(1.0),
            corner: best_corner as f64 / max_tile as f64,
            merge: (merge_potential / sum).min(1.0),
            weighted: (position_score(&grid) / (sum * TOP_POSITION_WEIGHT)).min(1.0),
            max_tile: ((max_tile as f64).log2() / MAX_TILE_LOG2_CEILING).min(1.0),
        }
    }

    pub fn blend(&self, w: &EvalWeights) -> f64 {
        let total = w.empty * self.empty
            + w.monotonic * self.monotonic
            + w.corner * self.corner
            + w.merge * self.merge
            + w.weighted * self.weighted
            + w.max_tile * self.max_tile;
        total.clamp(0.0, 1.0)
    }
}

/// Score a board in `[0, 1]` with the default weights. Higher is better.
///
/// ```
/// use emm_2048::engine::Board;
/// use emm_2048::expectimax::heuristic::evaluate;
/// let corner = Board::from_rows([[1024, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
/// let center = Board::from_rows([[0; 4], [0, 1024, 0, 0], [0; 4], [0; 4]]);
/// assert!(evaluate(corner) > evaluate(center));
/// ```
#[inline]
pub fn evaluate(board: Board) -> f64 { evaluate_with(board, &EvalWeights::default()) }

pub fn evaluate_with(board: Board, weights: &EvalWeights) -> f64 {
    if board.is_game_over() {
        return 0.0;
    }
    Components::compute(&board).blend(weights)
}

/// Sum over rows and columns of the larger of the rising and falling totals.
fn monotonicity(grid: &[[u32; 4]; 4]) -> f64 {
    let mut total = 0.0;
    for i in 0..4 {
        let row = grid[i];
        let col = [grid[0][i], grid[1][i], grid[2][i], grid[3][i]];
        total += line_monotonicity(&row) + line_monotonicity(&col);
    }
    total
}

fn line_monotonicity(line: &[u32; 4]) -> f64 {
    let mut rising = 0.0;
    let mut falling = 0.0;
    let mut prev: Option<f64> = None;
    for tile in line.iter().filter(|&&t| t != 0).map(|&t| t as f64) {
        if let Some(p) = prev {
            if tile > p {
                rising += tile - p;
            } else {
                falling += p - tile;
            }
        }
        prev = Some(tile);
    }
    f64::max(rising, falling)
}

/// Dot product with the position weights, anchored at the top-left corner.
fn position_score(grid: &[[u32; 4]; 4]) -> f64 {
    let mut score = 0.0;
    for (row, weights) in grid.iter().zip(POSITION_WEIGHTS.iter()) {
        for (&tile, &w) in row.iter().zip(weights.iter()) {
            score += tile as f64 * w;
        }
    }
    score
}

// Distinct nonzero tile values; busier boards get a deeper search when
// dynamic depth is enabled.
pub(crate) fn count_unique(board: Board) -> u32 {
    let mut seen = 0u64;
    for tile in board.tiles().filter(|&t| t != 0) {
        seen |= 1u64 << tile.trailing_zeros();
    }
    seen.count_ones()
}
