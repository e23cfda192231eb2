//! Expectiminimax search policy (single-threaded and parallel) for 2048.
//!
//! This module provides two searchers with the same public surface:
//! - [`Expectimax`]: single-threaded expectiminimax.
//! - [`ExpectimaxParallel`]: rayon-based parallel expectiminimax.
//!
//! Player plies take the best of the valid moves; chance plies average over
//! empty cells (2 with probability 0.9, 4 with probability 0.1). When a
//! chance ply has more empty cells than [`ExpectimaxConfig::sample_cap`], a
//! uniform sample of that many cells is searched instead, so results carry
//! some sampling noise. Leaves are scored by [`heuristic::evaluate_with`].
//!
//! Quick start
//! ```
//! use emm_2048::engine::Board;
//! use emm_2048::expectimax::{Expectimax, ExpectimaxConfig, ExpectimaxParallel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic board setup
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::EMPTY
//!     .with_random_tile(&mut rng)
//!     .with_random_tile(&mut rng);
//!
//! // Single-threaded expectiminimax
//! let cfg = ExpectimaxConfig { depth: 2, seed: Some(1), ..Default::default() };
//! let mut ex = Expectimax::with_config(cfg.clone());
//! assert!(ex.best_move(b0).is_some());
//!
//! // Parallel expectiminimax
//! let mut ex_par = ExpectimaxParallel::with_config(cfg);
//! assert!(ex_par.best_move(b0).is_some());
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::{Board, Move};
use crate::game::GameState;

pub mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::{evaluate, EvalWeights, WeightsError};
pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Plies searched by [`choose_move`] callers that have no preference.
pub const DEFAULT_DEPTH: u32 = 3;

/// Chance plies with more empty cells than this are sampled.
pub const DEFAULT_SAMPLE_CAP: usize = 7;

/// Returned when no direction changes the board.
pub const FALLBACK_MOVE: Move = Move::Up;

/// Configurable knobs for the searchers.
///
/// - `depth`: plies searched from the root, counting both player and chance plies.
/// - `dynamic_depth`: raise `depth` on boards with many distinct tile values.
/// - `sample_cap`: chance-ply sampling cap; `None` enumerates every empty cell.
/// - `cache_enabled`: enable/disable the transposition table.
/// - `weights`: leaf evaluation weights.
/// - `seed`: seed for the sampling RNG; `None` draws one from the OS.
/// - `par_thresholds`: thresholds used only by the parallel implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectimaxConfig {
    pub depth: u32,
    pub dynamic_depth: bool,
    pub sample_cap: Option<usize>,
    pub cache_enabled: bool,
    pub weights: EvalWeights,
    pub seed: Option<u64>,
    pub par_thresholds: ParThresholds,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            dynamic_depth: false,
            sample_cap: Some(DEFAULT_SAMPLE_CAP),
            cache_enabled: false,
            weights: EvalWeights::default(),
            seed: None,
            par_thresholds: ParThresholds::default(),
        }
    }
}

impl ExpectimaxConfig {
    /// Check that the leaf weights are non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<(), WeightsError> { self.weights.validate() }

    /// Depth to search from `board`.
    fn depth_for(&self, board: Board) -> u32 {
        if self.dynamic_depth {
            self.depth.max(heuristic::count_unique(board).saturating_sub(2))
        } else {
            self.depth
        }
    }
}

/// Thresholds used to balance parallel overheads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParThresholds {
    /// Chance plies at or above this remaining depth may fan out.
    pub par_depth: u32,
    /// Minimum number of searched cells before a chance ply fans out.
    pub par_slots: usize,
}

impl Default for ParThresholds {
    fn default() -> Self { Self { par_depth: 2, par_slots: 4 } }
}

/// Per-branch expected value at the root.
///
/// - `ev` is the expected value for taking `dir` from the current board.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: f64,
    pub legal: bool,
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub peak_nodes: u64,
}

impl SearchStats {
    fn record(&mut self, nodes: u64) {
        self.nodes = nodes;
        self.peak_nodes = self.peak_nodes.max(nodes);
    }
}

#[derive(Clone, Copy)]
enum Node {
    Max,
    Chance,
}

#[derive(Clone, Copy)]
struct TranspositionEntry {
    score: f64,
    move_depth: u32,
}

fn illegal_branches() -> [BranchEval; 4] { Move::ALL.map(|dir| BranchEval { dir, ev: 0.0, legal: false }) }

/// First legal branch with the strictly highest EV, ties going to the
/// earlier direction.
pub(crate) fn pick_best(branches: &[BranchEval; 4]) -> Option<Move> {
    let mut best: Option<(Move, f64)> = None;
    for b in branches.iter().filter(|b| b.legal) {
        if best.map_or(true, |(_, ev)| b.ev > ev) {
            best = Some((b.dir, b.ev));
        }
    }
    best.map(|(dir, _)| dir)
}

/// Pick a move for `state` with a `depth`-ply expectiminimax search.
///
/// Falls back to [`FALLBACK_MOVE`] when nothing is legal. The game itself is
/// never modified.
///
/// ```
/// use emm_2048::engine::{Board, Move};
/// use emm_2048::expectimax::choose_move;
/// use emm_2048::game::GameState;
/// let mut game = GameState::from_seed(3);
/// game.restore(Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]));
/// // Only Down changes this board.
/// assert_eq!(choose_move(&game, 2), Move::Down);
/// ```
pub fn choose_move(state: &GameState, depth: u32) -> Move {
    let mut ex = Expectimax::with_config(ExpectimaxConfig { depth, ..Default::default() });
    ex.best_move(state.board()).unwrap_or(FALLBACK_MOVE)
}

/// One-ply greedy choice: the direction whose shifted board evaluates
/// strictly highest, starting from a 0.0 baseline.
///
/// Falls back to [`FALLBACK_MOVE`] when no move beats the baseline.
pub fn choose_move_shallow(state: &GameState) -> Move {
    choose_move_shallow_with(state.board(), &EvalWeights::default())
}

pub(crate) fn choose_move_shallow_with(board: Board, weights: &EvalWeights) -> Move {
    let mut best_score = 0.0;
    let mut best_move = None;
    for dir in Move::ALL {
        let outcome = board.shift_outcome(dir);
        if outcome.changed {
            let score = heuristic::evaluate_with(outcome.board, weights);
            if score > best_score {
                best_score = score;
                best_move = Some(dir);
            }
        }
    }
    best_move.unwrap_or(FALLBACK_MOVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;

    fn game_with(board: Board) -> GameState {
        let mut game = GameState::with_config(GameConfig { spawn_tiles: false, ..Default::default() }, 1);
        game.restore(board);
        game
    }

    #[test]
    fn pick_best_prefers_first_on_ties() {
        let branches = [
            BranchEval { dir: Move::Up, ev: 0.0, legal: false },
            BranchEval { dir: Move::Down, ev: 0.5, legal: true },
            BranchEval { dir: Move::Left, ev: 0.5, legal: true },
            BranchEval { dir: Move::Right, ev: 0.4, legal: true },
        ];
        assert_eq!(pick_best(&branches), Some(Move::Down));
        assert_eq!(pick_best(&illegal_branches()), None);
    }

    #[test]
    fn choose_move_never_mutates_game() {
        let mut game = GameState::from_seed(99);
        for _ in 0..5 {
            let dir = choose_move(&game, 2);
            game.apply_move(dir);
        }
        let before = game.snapshot();
        let moves = game.moves();
        for depth in 1..=3 {
            let _ = choose_move(&game, depth);
            assert_eq!(game.board(), before);
            assert_eq!(game.moves(), moves);
        }
    }

    #[test]
    fn stuck_board_falls_back_to_up() {
        let game = game_with(Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]));
        assert_eq!(choose_move(&game, 3), Move::Up);
        assert_eq!(choose_move(&game, 0), Move::Up);
        assert_eq!(choose_move_shallow(&game), Move::Up);
    }

    #[test]
    fn only_legal_moves_are_chosen() {
        // Only Down changes this board.
        let game = game_with(Board::from_rows([[2, 4, 8, 16], [4, 8, 16, 32], [0; 4], [0; 4]]));
        assert_eq!(choose_move(&game, 2), Move::Down);
        assert_eq!(choose_move_shallow(&game), Move::Down);
    }

    #[test]
    fn shallow_takes_the_merge_into_the_corner() {
        let game = game_with(Board::from_rows([[0, 0, 0, 0], [0; 4], [0; 4], [2, 2, 0, 0]]));
        let dir = choose_move_shallow(&game);
        // Left merges into the bottom-left corner; Up brings the tiles to
        // the top row where the position weights are highest.
        assert!(dir == Move::Left || dir == Move::Up, "{dir:?}");
    }

    #[test]
    fn depth_zero_is_a_cutoff() {
        let game = game_with(Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]));
        let dir = choose_move(&game, 0);
        assert!(game.board().shift_outcome(dir).changed);
    }

    #[test]
    fn config_rejects_bad_weights() {
        assert!(ExpectimaxConfig::default().validate().is_ok());
        let negative = EvalWeights { corner: -0.1, ..Default::default() };
        let cfg = ExpectimaxConfig { weights: negative, ..Default::default() };
        assert_eq!(cfg.validate(), Err(WeightsError::Negative("corner")));
        let lopsided = EvalWeights { empty: 0.5, ..Default::default() };
        let cfg = ExpectimaxConfig { weights: lopsided, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(WeightsError::Sum(_))));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid evaluation weights")]
    fn searchers_refuse_bad_weights() {
        let weights = EvalWeights { merge: 0.9, ..Default::default() };
        let _ = Expectimax::with_config(ExpectimaxConfig { weights, ..Default::default() });
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid evaluation weights")]
    fn parallel_searcher_refuses_bad_weights() {
        let weights = EvalWeights { empty: f64::NAN, ..Default::default() };
        let _ = ExpectimaxParallel::with_config(ExpectimaxConfig { weights, ..Default::default() });
    }

    #[test]
    fn dynamic_depth_grows_with_distinct_tiles() {
        let cfg = ExpectimaxConfig { dynamic_depth: true, ..Default::default() };
        let busy = Board::from_rows([[2, 4, 8, 16], [32, 64, 128, 0], [0; 4], [0; 4]]);
        assert_eq!(cfg.depth_for(busy), 5);
        assert_eq!(cfg.depth_for(Board::EMPTY), DEFAULT_DEPTH);
        let fixed = ExpectimaxConfig::default();
        assert_eq!(fixed.depth_for(busy), DEFAULT_DEPTH);
    }
}
