//! Move-selection strategies behind one interface, for the binaries and the
//! batch runner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::Move;
use crate::expectimax::{
    self, EvalWeights, Expectimax, ExpectimaxConfig, ExpectimaxParallel, SearchStats, FALLBACK_MOVE,
};
use crate::game::GameState;

/// Named move-selection algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Depth-limited expectiminimax search.
    Expectiminimax,
    /// One-ply greedy evaluation.
    DepthOne,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Expectiminimax => "expectiminimax",
            Algorithm::DepthOne => "depth-one",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown algorithm: {0} (expected `expectiminimax` or `depth-one`)")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expectiminimax" | "expectimax" => Ok(Algorithm::Expectiminimax),
            "depth-one" | "depth_one" | "greedy" => Ok(Algorithm::DepthOne),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

/// A configured move chooser. Searchers keep their RNG and stats across calls.
pub enum Player {
    Search(Box<Expectimax>),
    ParallelSearch(Box<ExpectimaxParallel>),
    Greedy(EvalWeights),
}

impl Player {
    /// Build a player for `algorithm`. `parallel` picks the rayon searcher
    /// and is ignored by the greedy player.
    pub fn new(algorithm: Algorithm, cfg: ExpectimaxConfig, parallel: bool) -> Self {
        debug_assert!(cfg.validate().is_ok(), "invalid evaluation weights: {:?}", cfg.weights);
        match (algorithm, parallel) {
            (Algorithm::Expectiminimax, false) => Player::Search(Box::new(Expectimax::with_config(cfg))),
            (Algorithm::Expectiminimax, true) => Player::ParallelSearch(Box::new(ExpectimaxParallel::with_config(cfg))),
            (Algorithm::DepthOne, _) => Player::Greedy(cfg.weights),
        }
    }

    /// Choose a move for the current game. Never mutates `state`; returns
    /// [`FALLBACK_MOVE`] when nothing is legal.
    pub fn next_move(&mut self, state: &GameState) -> Move {
        let board = state.board();
        match self {
            Player::Search(ex) => ex.best_move(board).unwrap_or(FALLBACK_MOVE),
            Player::ParallelSearch(ex) => ex.best_move(board).unwrap_or(FALLBACK_MOVE),
            Player::Greedy(weights) => expectimax::choose_move_shallow_with(board, weights),
        }
    }

    /// Node counts of the last search, for search-based players.
    pub fn last_stats(&self) -> Option<SearchStats> {
        match self {
            Player::Search(ex) => Some(ex.last_stats()),
            Player::ParallelSearch(ex) => Some(ex.last_stats()),
            Player::Greedy(_) => None,
        }
    }
}
