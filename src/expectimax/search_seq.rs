use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Board, Move, SPAWN_TWO_PROBABILITY};

use super::heuristic::evaluate_with;
use super::{illegal_branches, pick_best, BranchEval, ExpectimaxConfig, Node, SearchStats, TranspositionEntry};

/// Single-threaded expectiminimax search.
///
/// Owns the RNG used to sample chance plies, so repeated searches with the
/// same seed explore the same cells.
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
    rng: StdRng,
}

impl Expectimax {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self {
        debug_assert!(cfg.validate().is_ok(), "invalid evaluation weights: {:?}", cfg.weights);
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, stats: SearchStats::default(), rng }
    }

    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Compute the best move using expectiminimax.
    ///
    /// Returns `None` when no direction changes the board.
    ///
    /// Example
    /// ```
    /// use emm_2048::engine::Board;
    /// use emm_2048::expectimax::{Expectimax, ExpectimaxConfig};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// let mut ex = Expectimax::with_config(ExpectimaxConfig { depth: 2, ..Default::default() });
    /// assert!(ex.best_move(b).is_some());
    /// ```
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let branches = self.branch_evals(board);
        let best = pick_best(&branches);
        log::debug!("depth {} search picked {:?} after {} nodes", self.cfg.depth_for(board), best, self.stats.nodes);
        best
    }

    /// Compute EV for each direction.
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]` and marks
    /// illegal moves as `legal=false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let depth = self.cfg.depth_for(board);
        let mut search = Search::new(&self.cfg, &mut self.rng);
        let mut out = illegal_branches();
        for (slot, dir) in out.iter_mut().zip(Move::ALL) {
            let outcome = board.shift_outcome(dir);
            if outcome.changed {
                let ev = search.expectimax(outcome.board, Node::Chance, depth.saturating_sub(1));
                log::trace!("{dir}: ev {ev:.6}");
                *slot = BranchEval { dir, ev, legal: true };
            }
        }
        let nodes = search.nodes;
        self.stats.record(nodes);
        out
    }

    /// EV at root (max node): the best branch EV, or the static evaluation
    /// when nothing is legal.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let depth = self.cfg.depth_for(board);
        let mut search = Search::new(&self.cfg, &mut self.rng);
        let value = search.expectimax(board, Node::Max, depth);
        let nodes = search.nodes;
        self.stats.record(nodes);
        value
    }

    /// Statistics collected from the last call to [`best_move`](Self::best_move),
    /// [`branch_evals`](Self::branch_evals) or [`state_value`](Self::state_value).
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for Expectimax { fn default() -> Self { Self::new() } }

/// State for one root search. Boards are passed by value, so sibling
/// branches never see each other's moves.
struct Search<'a> {
    cfg: &'a ExpectimaxConfig,
    rng: &'a mut StdRng,
    map: HashMap<Board, TranspositionEntry>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(cfg: &'a ExpectimaxConfig, rng: &'a mut StdRng) -> Self {
        Self { cfg, rng, map: HashMap::new(), nodes: 0 }
    }

    fn expectimax(&mut self, board: Board, node: Node, move_depth: u32) -> f64 {
        self.nodes += 1;
        if move_depth == 0 || board.is_game_over() {
            return evaluate_with(board, &self.cfg.weights);
        }
        match node {
            Node::Max => self.evaluate_max(board, move_depth),
            Node::Chance => self.evaluate_chance(board, move_depth),
        }
    }

    fn evaluate_max(&mut self, board: Board, move_depth: u32) -> f64 {
        let mut best: Option<f64> = None;
        for dir in Move::ALL {
            let outcome = board.shift_outcome(dir);
            if outcome.changed {
                let score = self.expectimax(outcome.board, Node::Chance, move_depth - 1);
                best = Some(best.map_or(score, |b| b.max(score)));
            }
        }
        best.unwrap_or_else(|| evaluate_with(board, &self.cfg.weights))
    }

    fn evaluate_chance(&mut self, board: Board, move_depth: u32) -> f64 {
        if self.cfg.cache_enabled {
            if let Some(entry) = self.map.get(&board) {
                if entry.move_depth >= move_depth {
                    return entry.score;
                }
            }
        }
        let mut cells = board.empty_cells();
        if cells.is_empty() {
            return evaluate_with(board, &self.cfg.weights);
        }
        if let Some(cap) = self.cfg.sample_cap {
            let cap = cap.max(1);
            if cells.len() > cap {
                cells = cells.choose_multiple(&mut *self.rng, cap).copied().collect();
            }
        }
        let mut score = 0.0;
        for &(row, col) in &cells {
            let s2 = self.expectimax(board.with_tile(row, col, 2), Node::Max, move_depth - 1);
            let s4 = self.expectimax(board.with_tile(row, col, 4), Node::Max, move_depth - 1);
            score += SPAWN_TWO_PROBABILITY * s2 + (1.0 - SPAWN_TWO_PROBABILITY) * s4;
        }
        score /= cells.len() as f64;
        if self.cfg.cache_enabled {
            self.map.insert(board, TranspositionEntry { score, move_depth });
        }
        score
    }
}
