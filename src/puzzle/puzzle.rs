//! Defines the [`Puzzle`] type, one configuration of the 24-puzzle.

use std::{
    fmt::{self, Display, Write as _},
    num::ParseIntError,
    str::FromStr,
};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// The number of grid squares, which is also the number of tiles if the
/// empty square is counted as the zero tile.
pub const TILE_COUNT: usize = 25;

/// The tile number of the empty square.
pub const ZERO_TILE: usize = 0;

/// One configuration of the 24-puzzle.
///
/// 24 numbered tiles are arranged on a 5x5 grid with one square left empty.
/// Squares are numbered 0 to 24 in row-major order and the empty square is
/// treated as a tile with number 0, so a configuration is a permutation of
/// { 0, ..., 24 }. The goal configuration places every tile on the square
/// with its own number:
///
/// ```text
///     []  1  2  3  4
///      5  6  7  8  9
///     10 11 12 13 14
///     15 16 17 18 19
///     20 21 22 23 24
/// ```
///
/// The configuration is stored both ways at once: `tiles[t]` is the square
/// tile `t` occupies and `grid[s]` is the tile on square `s`. The two arrays
/// are inverse permutations of each other at all times.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Puzzle {
    pub(crate) tiles: [u8; TILE_COUNT],
    pub(crate) grid: [u8; TILE_COUNT],
}

/// Error type for [`Puzzle::from_str`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParsePuzzleError {
    /// Returned when an integer parse fails.
    #[error("ParseIntError: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// Returned when a tile number is out of range (0 to 24).
    #[error("TileOutOfRange: tile {0} is out of range")]
    TileOutOfRange(u32),

    /// Returned when the same tile number appears more than once.
    #[error("DuplicateTile: tile {0} appears more than once")]
    DuplicateTile(u32),

    /// Returned when fewer or more than 25 tiles are given.
    #[error("WrongTileCount: expected 25 tiles, found {0}")]
    WrongTileCount(usize),
}

impl Puzzle {
    /// The solved configuration.
    #[must_use]
    pub fn solved() -> Self {
        let mut identity = [0; TILE_COUNT];
        for (i, entry) in identity.iter_mut().enumerate() {
            *entry = i as u8;
        }

        Self {
            tiles: identity,
            grid: identity,
        }
    }

    /// Builds a configuration from the grid contents in square order.
    /// `grid[s]` is the tile on square `s`.
    pub fn from_grid(grid: [u8; TILE_COUNT]) -> Result<Self, ParsePuzzleError> {
        let mut tiles = [0xffu8; TILE_COUNT];

        for (sq, &tile) in grid.iter().enumerate() {
            if tile as usize >= TILE_COUNT {
                return Err(ParsePuzzleError::TileOutOfRange(u32::from(tile)));
            }

            if tiles[tile as usize] != 0xff {
                return Err(ParsePuzzleError::DuplicateTile(u32::from(tile)));
            }

            tiles[tile as usize] = sq as u8;
        }

        Ok(Self { tiles, grid })
    }

    /// Returns the square tile `t` occupies.
    #[inline]
    #[must_use]
    pub fn square_of(&self, t: usize) -> u8 {
        self.tiles[t]
    }

    /// Returns the tile on square `s`.
    #[inline]
    #[must_use]
    pub fn tile_at(&self, s: usize) -> u8 {
        self.grid[s]
    }

    /// Returns the location of the empty square.
    #[inline]
    #[must_use]
    pub fn zero_location(&self) -> usize {
        self.tiles[ZERO_TILE] as usize
    }

    /// Moves the empty square to `dest`, sliding the tile on `dest` into
    /// the previously empty square. `dest` must be adjacent to the current
    /// location of the empty square; this is not checked.
    #[inline]
    pub fn apply_move(&mut self, dest: usize) {
        let dtile = self.grid[dest];
        let zloc = self.zero_location();

        self.grid[dest] = ZERO_TILE as u8;
        self.grid[zloc] = dtile;

        self.tiles[dtile as usize] = zloc as u8;
        self.tiles[ZERO_TILE] = dest as u8;
    }

    /// Returns the permutation parity of the configuration: the parity of
    /// the number of transpositions needed to reach the goal, plus the
    /// Manhattan parity of the empty square. A configuration is solvable
    /// iff this is 0, since every move flips both parts at once.
    #[must_use]
    pub fn parity(&self) -> u32 {
        let mut remaining = crate::tileset::tileset::Tileset::FULL;
        let mut parity = self.zero_location() as u32;

        while !remaining.is_empty() {
            let start = remaining.first();
            let mut i = start;
            let mut len = 0u32;
            loop {
                remaining = remaining.remove(i);
                i = self.grid[i] as usize;
                len += 1;
                if i == start {
                    break;
                }
            }

            parity ^= len ^ 1;
        }

        parity & 1
    }

    /// Returns whether the configuration can be solved at all.
    #[must_use]
    pub fn is_solvable(&self) -> bool {
        self.parity() == 0
    }

    /// Checks the representation invariant: both arrays are permutations of
    /// { 0, ..., 24 } and inverse to each other.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut seen = 0u32;
        for &sq in &self.tiles {
            if sq as usize >= TILE_COUNT || seen & 1 << sq != 0 {
                return false;
            }

            seen |= 1 << sq;
        }

        (0..TILE_COUNT).all(|t| self.grid[self.tiles[t] as usize] as usize == t)
    }

    /// Applies automorphism `a` to the configuration, relabelling both the
    /// squares and the tiles.
    pub fn morph(&mut self, a: usize) {
        let perm = crate::symmetry::automorphism(a);
        let inv = crate::symmetry::automorphism_inverse(a);
        let old_tiles = self.tiles;

        for i in 0..TILE_COUNT {
            self.tiles[i] = perm[old_tiles[inv[i] as usize] as usize];
            self.grid[self.tiles[i] as usize] = i as u8;
        }
    }

    /// Transposes the configuration along the main diagonal.
    pub fn transpose(&mut self) {
        self.morph(crate::symmetry::TRANSPOSE);
    }

    /// Renders the configuration as a 5x5 grid, with the empty square
    /// left blank.
    #[must_use]
    pub fn visualization(&self) -> String {
        let mut out = String::new();

        for (sq, &tile) in self.grid.iter().enumerate() {
            let sep = if sq % 5 == 4 { '\n' } else { ' ' };
            if tile as usize == ZERO_TILE {
                let _ = write!(out, "  {sep}");
            } else {
                let _ = write!(out, "{tile:2}{sep}");
            }
        }

        out
    }
}

impl Default for Puzzle {
    fn default() -> Self {
        Self::solved()
    }
}

impl fmt::Debug for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Puzzle({self})")
    }
}

impl Display for Puzzle {
    /// Formats the configuration as the tiles on squares 0 to 24, comma
    /// separated. The same format is accepted by [`Puzzle::from_str`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (sq, tile) in self.grid.iter().enumerate() {
            if sq != 0 {
                f.write_char(',')?;
            }

            write!(f, "{tile}")?;
        }

        Ok(())
    }
}

impl FromStr for Puzzle {
    type Err = ParsePuzzleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut grid = [0u8; TILE_COUNT];
        let mut count = 0;

        for part in s.split(',') {
            let tile: u32 = part.trim().parse()?;
            if count >= TILE_COUNT {
                return Err(ParsePuzzleError::WrongTileCount(count + 1));
            }

            grid[count] = tile as u8;
            count += 1;
        }

        if count != TILE_COUNT {
            return Err(ParsePuzzleError::WrongTileCount(count));
        }

        Self::from_grid(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLVED_STR: &str = "0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24";

    #[test]
    fn solved_is_valid_and_solvable() {
        let p = Puzzle::solved();
        assert!(p.is_valid());
        assert!(p.is_solvable());
        assert_eq!(p.zero_location(), 0);
        assert_eq!(p.to_string(), SOLVED_STR);
    }

    #[test]
    fn parse_then_stringify() {
        let s = "1,0,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24";
        let p: Puzzle = s.parse().unwrap();
        assert_eq!(p.to_string(), s);
        assert_eq!(p.zero_location(), 1);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("1,2,3".parse::<Puzzle>().is_err());
        assert!(SOLVED_STR.replace("24", "25").parse::<Puzzle>().is_err());
        assert!(SOLVED_STR.replace("24", "23").parse::<Puzzle>().is_err());
        assert!("hello".parse::<Puzzle>().is_err());
    }

    #[test]
    fn moves_update_both_arrays() {
        let mut p = Puzzle::solved();
        p.apply_move(1);
        assert!(p.is_valid());
        assert_eq!(p.zero_location(), 1);
        assert_eq!(p.tile_at(0), 1);

        // Undoing the move restores the original configuration.
        p.apply_move(0);
        assert_eq!(p, Puzzle::solved());
    }

    #[test]
    fn single_transposition_is_unsolvable() {
        assert_eq!(Puzzle::solved().parity(), 0);

        // The solved configuration with tiles 1 and 2 swapped.
        let p: Puzzle = "0,2,1,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24"
            .parse()
            .unwrap();
        assert_eq!(p.parity(), 1);
        assert!(!p.is_solvable());
    }

    #[test]
    fn moves_preserve_solvability() {
        let mut p = Puzzle::solved();
        for dest in [1, 2, 7, 6, 1, 0] {
            p.apply_move(dest);
            assert!(p.is_solvable());
        }
    }

    #[test]
    fn transpose_is_an_involution() {
        let mut p: Puzzle = "1,0,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24"
            .parse()
            .unwrap();
        let orig = p;

        p.transpose();
        assert!(p.is_valid());
        assert_ne!(p, orig);

        p.transpose();
        assert_eq!(p, orig);
    }

    #[test]
    fn visualization_blanks_the_empty_square() {
        let p = Puzzle::solved();
        let v = p.visualization();
        assert!(v.starts_with("    1  2  3  4\n"));
        assert_eq!(v.lines().count(), 5);
    }
}
