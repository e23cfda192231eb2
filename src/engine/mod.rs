//! Board representation, moves and merge rules.
//!
//! [`Board`] is a plain 4x4 value type. Every direction is implemented by
//! one primitive, [`merge_line`], wrapped in orientation transforms; see
//! [`line`] for the details.
//!
//! The free functions below mirror the `Board` methods and use the
//! thread-local RNG where randomness is involved. Prefer the methods with an
//! explicit RNG when you need determinism.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod line;
pub mod state;

pub use line::merge_line;
pub use state::{random_tile_value, Board, MoveOutcome, SPAWN_TWO_PROBABILITY};

/// A single cell value: 0 for empty, otherwise a power of two.
pub type Tile = u32;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All directions in search order. Ties between equally scored moves go
    /// to the earlier entry.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized direction {0:?} (expected w/a/s/d or up/down/left/right)")]
pub struct ParseMoveError(pub String);

impl FromStr for Move {
    type Err = ParseMoveError;

    /// Accepts `w`/`a`/`s`/`d` and the direction names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "up" => Ok(Move::Up),
            "s" | "down" => Ok(Move::Down),
            "a" | "left" => Ok(Move::Left),
            "d" | "right" => Ok(Move::Right),
            _ => Err(ParseMoveError(s.to_string())),
        }
    }
}

/// Sum of all tiles.
pub fn get_score(board: Board) -> u64 { board.score() }

/// Slide/merge tiles in the given direction. No randomness.
pub fn shift(board: Board, direction: Move) -> Board { board.shift(direction) }

/// Perform a move then insert a random tile if the move changed the board (uses thread RNG).
pub fn make_move(board: Board, direction: Move) -> Board {
    let mut rng = rand::thread_rng();
    board.make_move(direction, &mut rng)
}

/// Insert a random 2 (90%) or 4 (10%) tile using thread-local RNG.
///
/// For reproducible behavior, prefer `Board::with_random_tile(&mut impl Rng)`.
pub fn insert_random_tile(board: Board) -> Board {
    let mut rng = rand::thread_rng();
    board.with_random_tile(&mut rng)
}

/// True if no move in any direction changes the board.
pub fn is_game_over(board: Board) -> bool { board.is_game_over() }

/// Count the number of zero tiles.
pub fn count_empty(board: Board) -> usize { board.count_empty() }

pub fn get_highest_tile_val(board: Board) -> Tile { board.highest_tile() }
