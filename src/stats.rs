//! Playing whole games and summarizing batches of them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::engine::Tile;
use crate::expectimax::ExpectimaxConfig;
use crate::game::GameState;
use crate::policy::{Algorithm, Player};

/// Outcome of one finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub moves: u32,
    /// Sum of the tiles on the final board.
    pub score: u64,
    pub max_tile: Tile,
    /// The win tile appeared at some point, even if play went on.
    pub won: bool,
}

impl GameSummary {
    pub fn of(game: &GameState) -> Self {
        let board = game.board();
        Self { moves: game.moves(), score: board.score(), max_tile: board.highest_tile(), won: game.has_reached_win_tile() }
    }
}

/// Let `player` play `game` until no move is left or `max_moves` valid moves
/// have been made.
///
/// Stops early if the player proposes a move that does not change a board
/// which still has moves, so a broken policy cannot spin forever.
pub fn play_out(game: &mut GameState, player: &mut Player, max_moves: Option<u32>) -> GameSummary {
    while !game.is_game_over() {
        if max_moves.is_some_and(|limit| game.moves() >= limit) {
            break;
        }
        let dir = player.next_move(game);
        if !game.apply_move(dir) {
            log::warn!("policy chose no-op move {dir} on a live board; stopping after {} moves", game.moves());
            break;
        }
    }
    GameSummary::of(game)
}

/// Play one full game with `algorithm`.
///
/// With `seed` set, both the tile sequence and the search sampling are
/// reproducible.
pub fn run_single_game(algorithm: Algorithm, cfg: &ExpectimaxConfig, seed: Option<u64>, parallel: bool) -> GameSummary {
    let mut game = match seed {
        Some(s) => GameState::from_seed(s),
        None => GameState::new(),
    };
    let cfg = ExpectimaxConfig { seed: seed.or(cfg.seed), ..cfg.clone() };
    let mut player = Player::new(algorithm, cfg, parallel);
    play_out(&mut game, &mut player, None)
}

/// How many games ended with a given highest tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileCount {
    pub tile: Tile,
    pub games: usize,
    pub percent: f64,
}

/// Aggregate statistics over many games.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub games: usize,
    pub wins: usize,
    /// Percentage of games that reached the win tile.
    pub win_rate: f64,
    pub avg_moves: f64,
    pub avg_score: f64,
    pub min_score: u64,
    pub max_score: u64,
    pub min_moves: u32,
    pub max_moves: u32,
    pub elapsed_s: f64,
    pub seconds_per_game: f64,
    pub seconds_per_move: f64,
    /// Highest tile first.
    pub max_tile_histogram: Vec<TileCount>,
}

impl BatchReport {
    pub fn from_games(games: &[GameSummary], elapsed: Duration) -> Self {
        let n = games.len();
        let elapsed_s = elapsed.as_secs_f64();
        let per = |total: f64| if n == 0 { 0.0 } else { total / n as f64 };
        let wins = games.iter().filter(|g| g.won).count();
        let total_moves: u64 = games.iter().map(|g| u64::from(g.moves)).sum();
        let total_score: u64 = games.iter().map(|g| g.score).sum();

        let mut counts: BTreeMap<Tile, usize> = BTreeMap::new();
        for g in games {
            *counts.entry(g.max_tile).or_default() += 1;
        }
        let max_tile_histogram = counts
            .into_iter()
            .rev()
            .map(|(tile, count)| TileCount { tile, games: count, percent: per(count as f64) * 100.0 })
            .collect();

        Self {
            games: n,
            wins,
            win_rate: per(wins as f64) * 100.0,
            avg_moves: per(total_moves as f64),
            avg_score: per(total_score as f64),
            min_score: games.iter().map(|g| g.score).min().unwrap_or(0),
            max_score: games.iter().map(|g| g.score).max().unwrap_or(0),
            min_moves: games.iter().map(|g| g.moves).min().unwrap_or(0),
            max_moves: games.iter().map(|g| g.moves).max().unwrap_or(0),
            elapsed_s,
            seconds_per_game: per(elapsed_s),
            seconds_per_move: if total_moves == 0 { 0.0 } else { elapsed_s / total_moves as f64 },
            max_tile_histogram,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "RESULTS SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Games played: {}", self.games)?;
        writeln!(f, "Total time: {:.2} seconds", self.elapsed_s)?;
        writeln!(f, "Time per game: {:.2} seconds", self.seconds_per_game)?;
        writeln!(f, "Game speed: {:.4} seconds per move", self.seconds_per_move)?;
        writeln!(f)?;
        writeln!(f, "Win rate (2048 reached): {:.1}% ({}/{})", self.win_rate, self.wins, self.games)?;
        writeln!(f, "Average moves per game: {:.1}", self.avg_moves)?;
        writeln!(f, "Average score: {:.1}", self.avg_score)?;
        writeln!(f)?;
        writeln!(f, "Min score: {} | Max score: {}", self.min_score, self.max_score)?;
        writeln!(f, "Min moves: {} | Max moves: {}", self.min_moves, self.max_moves)?;
        writeln!(f)?;
        writeln!(f, "Max tile distribution:")?;
        for row in &self.max_tile_histogram {
            let bar = "█".repeat((row.percent / 2.0) as usize);
            writeln!(f, "  {:>6}: {:>3} games ({:>5.1}%) {}", row.tile, row.games, row.percent, bar)?;
        }
        Ok(())
    }
}
