//! emm-2048: a 2048 game engine + expectiminimax policy
//!
//! This crate provides:
//! - A `Board` value type with the move/merge rules (`shift`, `make_move`, `score`, ...)
//! - A `GameState` that owns the board, the tile RNG and the win flag (`game` module)
//! - An expectiminimax AI (`expectimax` module) with single-threaded and parallel variants
//! - Policies and batch statistics used by the `play` and `measure` binaries
//!
//! Quick start:
//! ```
//! use emm_2048::engine::{Board, Move};
//! use emm_2048::expectimax::choose_move;
//! use emm_2048::game::GameState;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic board initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let b0 = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
//! assert_eq!(b0.count_empty(), 14);
//! let b1 = b0.shift(Move::Left);
//! assert_eq!(b1.score(), b0.score());
//!
//! // A seeded game driven by the search
//! let mut game = GameState::from_seed(7);
//! let dir = choose_move(&game, 2);
//! assert!(game.apply_move(dir));
//! assert_eq!(game.moves(), 1);
//! ```
//!
//! Note: For convenience, there are also free functions mirroring the `Board` methods
//! (e.g., `engine::shift`, `engine::make_move`) that use thread-local RNG where relevant.
//! Prefer the methods when you need determinism.
//!
pub mod engine;
pub mod expectimax;
pub mod game;
pub mod policy;
pub mod stats;
