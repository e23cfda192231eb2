//! Live game state: one board, its RNG and the derived status flags.

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::{Board, Move, Tile};

/// The tile that marks a game as won.
pub const WIN_TILE: Tile = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Reaching this tile sets the won flag. Play continues afterwards.
    pub win_tile: Tile,
    /// Insert a random tile after each valid move. Only tests turn this off.
    pub spawn_tiles: bool,
}

impl Default for GameConfig {
    fn default() -> Self { Self { win_tile: WIN_TILE, spawn_tiles: true } }
}

/// A single game session.
///
/// The board is only mutated by [`apply_move`](Self::apply_move),
/// [`apply_input`](Self::apply_input) and [`restore`](Self::restore).
/// Searchers read it through [`board`](Self::board) or
/// [`snapshot`](Self::snapshot) and never hold on to it.
///
/// ```
/// use emm_2048::game::GameState;
/// use emm_2048::engine::Move;
/// let mut game = GameState::from_seed(42);
/// assert_eq!(game.board().count_empty(), 14);
/// let moved = Move::ALL.into_iter().any(|m| game.apply_move(m));
/// assert!(moved && game.moves() == 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    rng: StdRng,
    cfg: GameConfig,
    moves: u32,
    won: bool,
}

impl GameState {
    /// New game seeded from OS entropy.
    pub fn new() -> Self { Self::with_rng(StdRng::from_entropy(), GameConfig::default()) }

    /// New game with a reproducible tile sequence.
    pub fn from_seed(seed: u64) -> Self { Self::with_rng(StdRng::seed_from_u64(seed), GameConfig::default()) }

    pub fn with_config(cfg: GameConfig, seed: u64) -> Self { Self::with_rng(StdRng::seed_from_u64(seed), cfg) }

    /// Start from an empty board and place the two opening tiles.
    pub fn with_rng(mut rng: StdRng, cfg: GameConfig) -> Self {
        let board = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        let won = board.contains(cfg.win_tile);
        Self { board, rng, cfg, moves: 0, won }
    }

    /// Slide in `dir`. Returns false, leaving everything untouched, if the
    /// board would not change.
    pub fn apply_move(&mut self, dir: Move) -> bool {
        let outcome = self.board.shift_outcome(dir);
        if !outcome.changed {
            return false;
        }
        self.board = if self.cfg.spawn_tiles {
            outcome.board.with_random_tile(&mut self.rng)
        } else {
            outcome.board
        };
        self.moves += 1;
        self.won |= self.board.contains(self.cfg.win_tile);
        true
    }

    /// Parse a textual direction (`w`, `left`, ...) and apply it.
    ///
    /// Unrecognized input is a rejected move: returns false without
    /// touching the state.
    pub fn apply_input(&mut self, input: &str) -> bool {
        match input.parse::<Move>() {
            Ok(dir) => self.apply_move(dir),
            Err(e) => {
                log::debug!("ignoring input: {e}");
                false
            }
        }
    }

    pub fn has_moves_available(&self) -> bool { self.board.has_moves_available() }

    pub fn is_game_over(&self) -> bool { !self.has_moves_available() }

    /// True iff a cell currently holds the win tile.
    pub fn is_won(&self) -> bool { self.board.contains(self.cfg.win_tile) }

    /// True once the win tile has appeared at any point of this game.
    pub fn has_reached_win_tile(&self) -> bool { self.won }

    #[inline]
    pub fn board(&self) -> Board { self.board }

    /// Copy of the current board for simulation.
    #[inline]
    pub fn snapshot(&self) -> Board { self.board }

    /// Replace the whole board. Move count is kept.
    pub fn restore(&mut self, board: Board) {
        self.board = board;
        self.won |= board.contains(self.cfg.win_tile);
    }

    /// Valid moves applied so far.
    pub fn moves(&self) -> u32 { self.moves }

    /// Sum of all tiles.
    pub fn score(&self) -> u64 { self.board.score() }

    pub fn config(&self) -> &GameConfig { &self.cfg }
}

impl Default for GameState {
    fn default() -> Self { Self::new() }
}
