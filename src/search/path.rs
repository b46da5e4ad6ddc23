//! Defines the [`Path`] type, a sequence of moves.

use std::{
    fmt::{self, Display, Write as _},
    num::ParseIntError,
    str::FromStr,
};

use thiserror::Error;

use crate::puzzle::puzzle::{Puzzle, TILE_COUNT};

/// The largest path length any search will produce. No 24-puzzle
/// configuration is this far from the goal.
pub const MAX_PATH_LEN: usize = 256;

/// A sequence of moves, each given as the square the empty square moves
/// to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    moves: Vec<u8>,
}

/// Error type for [`Path::from_str`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParsePathError {
    /// Returned when an integer parse fails.
    #[error("ParseIntError: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// Returned when a move names a square that does not exist.
    #[error("SquareOutOfRange: square {0} is out of range")]
    SquareOutOfRange(u32),

    /// Returned when the path is longer than any optimal solution.
    #[error("TooLong: path has {0} moves")]
    TooLong(usize),
}

impl Path {
    /// The empty path.
    #[must_use]
    pub fn new() -> Self {
        Self { moves: Vec::new() }
    }

    /// Creates a path from a move list.
    #[must_use]
    pub fn from_moves(moves: Vec<u8>) -> Self {
        Self { moves }
    }

    /// Returns the number of moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Returns whether the path has no moves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Returns the moves.
    #[must_use]
    pub fn moves(&self) -> &[u8] {
        &self.moves
    }

    /// Applies the path to `p`.
    pub fn walk(&self, p: &mut Puzzle) {
        for &dest in &self.moves {
            p.apply_move(dest as usize);
        }
    }
}

impl Display for Path {
    /// Formats the path as a comma-separated list of destination squares.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &dest) in self.moves.iter().enumerate() {
            if i != 0 {
                f.write_char(',')?;
            }

            write!(f, "{dest}")?;
        }

        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut moves = Vec::new();

        for part in s.split(',') {
            let sq: u32 = part.trim().parse()?;
            if sq >= TILE_COUNT as u32 {
                return Err(ParsePathError::SquareOutOfRange(sq));
            }

            if moves.len() >= MAX_PATH_LEN {
                return Err(ParsePathError::TooLong(moves.len() + 1));
            }

            moves.push(sq as u8);
        }

        Ok(Self { moves })
    }
}
