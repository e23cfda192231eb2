use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::line::{self, Grid};
use super::{Move, Tile};

/// Probability that a spawned tile is a 2 (otherwise it is a 4).
pub const SPAWN_TWO_PROBABILITY: f64 = 0.9;

/// A 4x4 2048 board, stored row-major as actual tile values (0 = empty).
///
/// `Board` is `Copy`: every shift returns a new board and never touches the
/// receiver, which is what lets search branches run on independent copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board(Grid);

/// Result of sliding a board without inserting a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    /// False when the move left the board untouched (an invalid move).
    pub changed: bool,
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board([[0; 4]; 4]);

    /// Build a board from its rows, top to bottom.
    ///
    /// Cells must be 0 or powers of two; this is checked in debug builds.
    #[inline]
    pub fn from_rows(rows: [[Tile; 4]; 4]) -> Self {
        debug_assert!(rows.iter().flatten().all(|&t| t == 0 || t.is_power_of_two()));
        Board(rows)
    }

    /// Copy of the rows, top to bottom.
    #[inline]
    pub fn rows(&self) -> [[Tile; 4]; 4] { self.0 }

    /// Tile at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Tile { self.0[row][col] }

    /// Return a copy with `(row, col)` set to `tile`.
    ///
    /// `tile` must be 0 or a power of two; this is checked in debug builds.
    #[inline]
    pub fn with_tile(self, row: usize, col: usize, tile: Tile) -> Self {
        debug_assert!(tile == 0 || tile.is_power_of_two(), "not a tile value: {tile}");
        let mut grid = self.0;
        grid[row][col] = tile;
        Board(grid)
    }

    /// Iterate all 16 tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ { self.0.iter().flatten().copied() }

    /// Coordinates of every empty cell in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(16);
        for (r, row) in self.0.iter().enumerate() {
            for (c, &tile) in row.iter().enumerate() {
                if tile == 0 {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    ///
    /// ```
    /// use emm_2048::engine::{Board, Move};
    /// let b = Board::from_rows([[0, 2, 0, 2], [0; 4], [0; 4], [0; 4]]);
    /// assert_eq!(b.shift(Move::Left).get(0, 0), 4);
    /// ```
    #[inline]
    pub fn shift(self, dir: Move) -> Self { Board(line::shift_grid(self.0, dir)) }

    /// Like [`shift`](Self::shift), also reporting whether anything moved.
    #[inline]
    pub fn shift_outcome(self, dir: Move) -> MoveOutcome {
        let board = self.shift(dir);
        MoveOutcome { board, changed: board != self }
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a uniformly chosen empty cell.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use emm_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return self;
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        self.with_tile(row, col, random_tile_value(rng))
    }

    /// Perform a move then insert a random tile if the move changed the board.
    ///
    /// ```
    /// use emm_2048::engine::{Board, Move};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let b0 = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
    /// assert_eq!(b0.make_move(Move::Left, &mut rng), b0);
    /// assert_eq!(b0.make_move(Move::Right, &mut rng).count_empty(), 14);
    /// ```
    #[inline]
    pub fn make_move<R: Rng + ?Sized>(self, direction: Move, rng: &mut R) -> Self {
        let outcome = self.shift_outcome(direction);
        if outcome.changed { outcome.board.with_random_tile(rng) } else { self }
    }

    /// True if a cell is empty or two orthogonal neighbours hold equal tiles.
    ///
    /// One pass over the grid, looking right and down from every cell.
    pub fn has_moves_available(&self) -> bool {
        let g = &self.0;
        for r in 0..4 {
            for c in 0..4 {
                let tile = g[r][c];
                if tile == 0 {
                    return true;
                }
                if c < 3 && g[r][c + 1] == tile {
                    return true;
                }
                if r < 3 && g[r + 1][c] == tile {
                    return true;
                }
            }
        }
        false
    }

    /// Return true if no legal moves remain.
    #[inline]
    pub fn is_game_over(&self) -> bool { !self.has_moves_available() }

    /// Sum of all tiles.
    #[inline]
    pub fn score(&self) -> u64 { self.tiles().map(u64::from).sum() }

    /// Return the highest tile value (e.g., 2048) present on the board, 0 when empty.
    #[inline]
    pub fn highest_tile(&self) -> Tile { self.tiles().max().unwrap_or(0) }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(&self) -> usize { self.tiles().filter(|&t| t == 0).count() }

    /// True if any cell holds exactly `tile`.
    #[inline]
    pub fn contains(&self, tile: Tile) -> bool { self.tiles().any(|t| t == tile) }

    /// Tile at row-major index `0..16`.
    #[inline]
    pub fn tile_value(&self, idx: usize) -> Tile { self.0[idx / 4][idx % 4] }
}

/// Draw the value of a freshly spawned tile: 2 with probability 0.9, else 4.
#[inline]
pub fn random_tile_value<R: Rng + ?Sized>(rng: &mut R) -> Tile {
    if rng.gen::<f64>() < SPAWN_TWO_PROBABILITY { 2 } else { 4 }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.0.iter().enumerate() {
            if r > 0 {
                writeln!(f, "-------------------------------")?;
            }
            let cells: Vec<String> = row.iter().map(|&t| format_val(t)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl From<[[Tile; 4]; 4]> for Board { fn from(rows: [[Tile; 4]; 4]) -> Self { Board::from_rows(rows) } }
impl From<Board> for [[Tile; 4]; 4] { fn from(b: Board) -> Self { b.rows() } }

fn format_val(tile: Tile) -> String {
    match tile {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn end_to_end_left_without_spawn() {
        let b = Board::from_rows([[2, 0, 2, 0], [4, 4, 0, 0], [0, 8, 0, 8], [2, 4, 8, 16]]);
        let expected = Board::from_rows([[4, 0, 0, 0], [8, 0, 0, 0], [16, 0, 0, 0], [2, 4, 8, 16]]);
        let outcome = b.shift_outcome(Move::Left);
        assert!(outcome.changed);
        assert_eq!(outcome.board, expected);
    }

    #[test]
    fn invalid_move_is_reported_and_spawns_nothing() {
        let b = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        let outcome = b.shift_outcome(Move::Right);
        assert!(!outcome.changed);
        assert_eq!(outcome.board, b);
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(b.make_move(Move::Right, &mut rng), b);
    }

    #[test]
    fn spawn_value_follows_draw() {
        // StepRng yields a constant u64; 0 maps to 0.0 and u64::MAX to just under 1.0.
        let mut low = StepRng::new(0, 0);
        let mut high = StepRng::new(u64::MAX, 0);
        for _ in 0..100 {
            assert_eq!(random_tile_value(&mut low), 2);
            assert_eq!(random_tile_value(&mut high), 4);
        }
    }

    #[test]
    fn spawn_distribution_is_roughly_ninety_ten() {
        let mut rng = StdRng::seed_from_u64(2048);
        let fours = (0..10_000).filter(|_| random_tile_value(&mut rng) == 4).count();
        assert!((700..1300).contains(&fours), "fours = {fours}");
    }

    #[test]
    fn random_tile_lands_on_empty_cell() {
        let b = Board::from_rows([[2, 4, 8, 16], [32, 64, 128, 256], [2, 4, 0, 16], [32, 64, 128, 256]]);
        let mut rng = StdRng::seed_from_u64(9);
        let filled = b.with_random_tile(&mut rng);
        assert_eq!(filled.count_empty(), 0);
        assert!(filled.get(2, 2) == 2 || filled.get(2, 2) == 4);
        // Full boards are left alone.
        assert_eq!(filled.with_random_tile(&mut rng), filled);
    }

    #[test]
    fn random_tile_picks_empty_cells_uniformly() {
        // Four empty cells on the diagonal.
        let b = Board::from_rows([[0, 2, 4, 8], [2, 0, 8, 4], [4, 8, 0, 2], [8, 4, 2, 0]]);
        let mut rng = StdRng::seed_from_u64(31);
        let mut hits = [0u32; 4];
        for _ in 0..8000 {
            let filled = b.with_random_tile(&mut rng);
            assert_eq!(filled.count_empty(), 3);
            let idx = (0..4).find(|&i| filled.get(i, i) != 0).unwrap();
            hits[idx] += 1;
        }
        for h in hits {
            assert!((1700..=2300).contains(&h), "{hits:?}");
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "not a tile value")]
    fn with_tile_rejects_non_powers_of_two() {
        let _ = Board::EMPTY.with_tile(0, 0, 3);
    }

    #[test]
    fn it_fills_board() {
        let mut rng = StdRng::seed_from_u64(77);
        let mut b = Board::EMPTY;
        for _ in 0..16 {
            b = b.with_random_tile(&mut rng);
        }
        assert_eq!(b.count_empty(), 0);
        assert!(b.tiles().all(|t| t == 2 || t == 4));
    }

    #[test]
    fn moves_available() {
        assert!(Board::EMPTY.has_moves_available());
        let stuck = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!stuck.has_moves_available());
        assert!(stuck.is_game_over());
        // Only a vertical pair in the last column.
        let vertical = Board::from_rows([[2, 4, 2, 8], [4, 2, 4, 8], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(vertical.has_moves_available());
        // Only a horizontal pair in the last row.
        let horizontal = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 8, 8]]);
        assert!(horizontal.has_moves_available());
    }

    #[test]
    fn queries() {
        let b = Board::from_rows([[2, 0, 0, 0], [0, 1024, 0, 0], [0, 0, 0, 0], [0, 0, 0, 131072]]);
        assert_eq!(b.count_empty(), 13);
        assert_eq!(b.score(), 2 + 1024 + 131072);
        assert_eq!(b.highest_tile(), 131072);
        assert_eq!(b.tile_value(5), 1024);
        assert_eq!(b.tile_value(15), 131072);
        assert!(b.contains(1024));
        assert!(!b.contains(2048));
        assert_eq!(b.empty_cells().len(), 13);
        assert_eq!(Board::EMPTY.highest_tile(), 0);
    }

    #[test]
    fn display_has_four_rows() {
        let b = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2048]]);
        let text = b.to_string();
        assert_eq!(text.lines().filter(|l| l.contains('|')).count(), 4);
        assert!(text.contains("2048"));
    }
}
