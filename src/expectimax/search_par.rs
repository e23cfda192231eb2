use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState as AHasher;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::{Board, Move, SPAWN_TWO_PROBABILITY};

use super::heuristic::evaluate_with;
use super::{
    illegal_branches, pick_best, BranchEval, ExpectimaxConfig, Node, ParThresholds, SearchStats, TranspositionEntry,
};

/// Parallel expectiminimax using rayon and a shared `DashMap` transposition table.
///
/// Root directions always run in parallel; chance plies fan out when they
/// are deep and wide enough (see [`ParThresholds`]). Every parallel branch
/// gets its own RNG, seeded from the parent before the fork.
pub struct ExpectimaxParallel {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
    rng: StdRng,
}

impl ExpectimaxParallel {
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

    /// Compute the best move using parallel expectiminimax.
    ///
    /// This is a convenience wrapper around `branch_evals` that just picks the best move.
    #[inline]
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let branches = self.branch_evals(board);
        let best = pick_best(&branches);
        log::debug!("parallel search picked {:?} after {} nodes", best, self.stats.nodes);
        best
    }

    /// Get both the best move and all branch evaluations.
    #[inline]
    pub fn best_move_with_branches(&mut self, board: Board) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(board);
        (pick_best(&branches), branches)
    }

    /// Compute EV for each direction in parallel.
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]` and marks
    /// illegal moves as `legal=false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let depth = self.cfg.depth_for(board);
        let seeds: [u64; 4] = self.rng.gen();
        let search = ParSearch::new(&self.cfg);
        let out_vec: Vec<(usize, BranchEval)> = Move::ALL
            .par_iter()
            .zip(seeds)
            .enumerate()
            .map(|(i, (&dir, seed))| {
                let outcome = board.shift_outcome(dir);
                if !outcome.changed {
                    return (i, BranchEval { dir, ev: 0.0, legal: false });
                }
                let mut rng = StdRng::seed_from_u64(seed);
                let ev = search.expectimax(outcome.board, Node::Chance, depth.saturating_sub(1), &mut rng);
                (i, BranchEval { dir, ev, legal: true })
            })
            .collect();
        let mut out = illegal_branches();
        for (i, be) in out_vec {
            out[i] = be;
        }
        self.stats.record(search.nodes.load(Ordering::Relaxed));
        out
    }

    /// EV at root (max node), equivalent to the best branch EV.
    pub fn state_value(&mut self, board: Board) -> f64 {
        if self.cfg.depth_for(board) == 0 || board.is_game_over() {
            self.stats.record(1);
            return evaluate_with(board, &self.cfg.weights);
        }
        let branches = self.branch_evals(board);
        branches
            .iter()
            .filter(|branch| branch.legal)
            .map(|branch| branch.ev)
            .reduce(f64::max)
            .unwrap_or_else(|| evaluate_with(board, &self.cfg.weights))
    }

    /// Statistics collected from the last call to [`best_move`](Self::best_move),
    /// [`branch_evals`](Self::branch_evals) or [`state_value`](Self::state_value).
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for ExpectimaxParallel { fn default() -> Self { Self::new() } }

struct ParSearch<'a> {
    cfg: &'a ExpectimaxConfig,
    map: DashMap<Board, TranspositionEntry, AHasher>,
    nodes: AtomicU64,
}

impl<'a> ParSearch<'a> {
    fn new(cfg: &'a ExpectimaxConfig) -> Self {
        Self { cfg, map: DashMap::with_hasher(AHasher::new()), nodes: AtomicU64::new(0) }
    }

    fn expectimax(&self, board: Board, node: Node, move_depth: u32, rng: &mut StdRng) -> f64 {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        if move_depth == 0 || board.is_game_over() {
            return evaluate_with(board, &self.cfg.weights);
        }
        match node {
            Node::Max => self.evaluate_max(board, move_depth, rng),
            Node::Chance => self.evaluate_chance(board, move_depth, rng),
        }
    }

    fn evaluate_max(&self, board: Board, move_depth: u32, rng: &mut StdRng) -> f64 {
        Move::ALL
            .iter()
            .map(|&dir| board.shift_outcome(dir))
            .filter(|outcome| outcome.changed)
            .map(|outcome| self.expectimax(outcome.board, Node::Chance, move_depth - 1, rng))
            .reduce(f64::max)
            .unwrap_or_else(|| evaluate_with(board, &self.cfg.weights))
    }

    fn evaluate_chance(&self, board: Board, move_depth: u32, rng: &mut StdRng) -> f64 {
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
                cells = cells.choose_multiple(&mut *rng, cap).copied().collect();
            }
        }
        let cell_value = |(row, col): (usize, usize), rng: &mut StdRng| {
            let s2 = self.expectimax(board.with_tile(row, col, 2), Node::Max, move_depth - 1, rng);
            let s4 = self.expectimax(board.with_tile(row, col, 4), Node::Max, move_depth - 1, rng);
            SPAWN_TWO_PROBABILITY * s2 + (1.0 - SPAWN_TWO_PROBABILITY) * s4
        };
        let ParThresholds { par_depth, par_slots } = self.cfg.par_thresholds;
        let sum: f64 = if move_depth >= par_depth && cells.len() >= par_slots {
            let seeds: Vec<u64> = cells.iter().map(|_| rng.gen()).collect();
            cells
                .par_iter()
                .zip(seeds)
                .map(|(&cell, seed)| cell_value(cell, &mut StdRng::seed_from_u64(seed)))
                .sum()
        } else {
            cells.iter().map(|&cell| cell_value(cell, &mut *rng)).sum()
        };
        let score = sum / cells.len() as f64;
        if self.cfg.cache_enabled {
            self.map.insert(board, TranspositionEntry { score, move_depth });
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::heuristic::evaluate;
    use crate::expectimax::Expectimax;

    fn cfg(depth: u32) -> ExpectimaxConfig {
        ExpectimaxConfig { depth, sample_cap: None, seed: Some(4), ..Default::default() }
    }

    #[test]
    fn matches_sequential_with_full_enumeration() {
        let b = Board::from_rows([[2, 4, 8, 16], [4, 8, 16, 2], [0, 2, 0, 4], [0, 0, 2, 0]]);
        let mut seq = Expectimax::with_config(cfg(3));
        let mut par = ExpectimaxParallel::with_config(cfg(3));
        let a = seq.branch_evals(b);
        let p = par.branch_evals(b);
        for (x, y) in a.iter().zip(p.iter()) {
            assert_eq!(x.dir, y.dir);
            assert_eq!(x.legal, y.legal);
            assert!((x.ev - y.ev).abs() < 1e-9, "{x:?} vs {y:?}");
        }
        assert_eq!(seq.last_stats().nodes, par.last_stats().nodes);
    }

    #[test]
    fn depth_zero_state_value_is_static() {
        let b = Board::from_rows([[2, 2, 0, 0], [0, 4, 0, 0], [0; 4], [0; 4]]);
        let cfg = ExpectimaxConfig { depth: 0, seed: Some(1), ..Default::default() };
        let mut seq = Expectimax::with_config(cfg.clone());
        let mut par = ExpectimaxParallel::with_config(cfg);
        let p = par.state_value(b);
        assert_eq!(p, seq.state_value(b));
        assert_eq!(p, evaluate(b));
        assert_eq!(par.last_stats().nodes, 1);
    }

    #[test]
    fn stuck_board_has_no_move() {
        let b = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut par = ExpectimaxParallel::with_config(cfg(3));
        assert_eq!(par.best_move(b), None);
        assert_eq!(par.state_value(b), 0.0);
    }

    #[test]
    fn depth_one_root_scores_shifted_boards() {
        let b = Board::from_rows([[0, 2, 0, 2], [0; 4], [4, 0, 0, 0], [0; 4]]);
        let mut par = ExpectimaxParallel::with_config(cfg(1));
        let (best, branches) = par.best_move_with_branches(b);
        for be in branches.iter().filter(|be| be.legal) {
            assert_eq!(be.ev, evaluate(b.shift(be.dir)));
        }
        assert_eq!(best, pick_best(&branches));
    }

    #[test]
    fn sampled_parallel_search_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(21);
        let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        let mut par = ExpectimaxParallel::with_config(ExpectimaxConfig {
            depth: 3,
            seed: Some(2),
            cache_enabled: true,
            ..Default::default()
        });
        let v = par.state_value(b);
        assert!((0.0..=1.0).contains(&v));
        assert!(par.best_move(b).is_some());
        assert!(par.last_stats().nodes > 0);
    }
}
