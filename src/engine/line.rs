//! The single slide/merge primitive and the grid transforms that map every
//! direction onto it.
//!
//! Only "slide toward index 0" is implemented. Right, Up and Down are
//! reduced to that case by an orientation transform and undone by its
//! inverse, so there is exactly one place where merge rules live.

use super::{Move, Tile};

/// One row or column, index 0 being the end tiles slide toward.
pub type Line = [Tile; 4];

pub(crate) type Grid = [Line; 4];

/// Slide a line toward index 0, merging equal neighbours once.
///
/// Zeros are squeezed out first, then the line is scanned left to right:
/// a tile equal to its right neighbour doubles and the neighbour becomes
/// empty. The emptied slot cannot take part in a further merge, so three
/// equal tiles only merge the first pair.
///
/// ```
/// use emm_2048::engine::merge_line;
/// assert_eq!(merge_line([2, 2, 2, 0]), [4, 2, 0, 0]);
/// assert_eq!(merge_line([4, 4, 4, 4]), [8, 8, 0, 0]);
/// assert_eq!(merge_line([0, 2, 0, 2]), [4, 0, 0, 0]);
/// ```
pub fn merge_line(line: Line) -> Line {
    let mut out = compact(line);
    for i in 0..3 {
        if out[i] != 0 && out[i] == out[i + 1] {
            out[i] *= 2;
            out[i + 1] = 0;
        }
    }
    compact(out)
}

fn compact(line: Line) -> Line {
    let mut out = [0; 4];
    for (slot, tile) in out.iter_mut().zip(line.into_iter().filter(|&t| t != 0)) {
        *slot = tile;
    }
    out
}

pub(crate) fn transpose(grid: Grid) -> Grid {
    let mut out = [[0; 4]; 4];
    for (r, row) in grid.iter().enumerate() {
        for (c, &tile) in row.iter().enumerate() {
            out[c][r] = tile;
        }
    }
    out
}

pub(crate) fn reverse_rows(mut grid: Grid) -> Grid {
    for row in grid.iter_mut() {
        row.reverse();
    }
    grid
}

/// Rotate/flip `grid` so that moving in `dir` becomes a left slide.
fn orient(grid: Grid, dir: Move) -> Grid {
    match dir {
        Move::Left => grid,
        Move::Right => reverse_rows(grid),
        Move::Up => transpose(grid),
        Move::Down => reverse_rows(transpose(grid)),
    }
}

/// Inverse of [`orient`].
fn unorient(grid: Grid, dir: Move) -> Grid {
    match dir {
        Move::Left => grid,
        Move::Right => reverse_rows(grid),
        Move::Up => transpose(grid),
        Move::Down => transpose(reverse_rows(grid)),
    }
}

pub(crate) fn shift_grid(grid: Grid, dir: Move) -> Grid {
    let oriented = orient(grid, dir);
    unorient(oriented.map(merge_line), dir)
}
