//! Defines the [`Tileset`] type, a set of tiles or grid squares.

use std::{
    fmt::{self, Display},
    num::ParseIntError,
    ops::{BitAnd, BitOr, Not},
    str::FromStr,
};

use itertools::Itertools as _;
use thiserror::Error;

use crate::puzzle::puzzle::{Puzzle, TILE_COUNT, ZERO_TILE};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// A set of tiles, represented as a bitmask over the tile numbers 0 to 24.
///
/// Since squares are numbered the same way as tiles, a `Tileset` equally
/// well describes a set of grid squares; the flood fill operations below
/// interpret it that way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tileset(u32);

/// The mask of valid bits: `01111 01111 01111 01111 01111` read from the
/// highest row down. Shifting a set left by one within this mask moves every
/// square one column right without carrying into the next row.
const ROW_MASK: u32 = 0x0f7_bdef;

/// Error type for [`Tileset::from_str`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseTilesetError {
    /// Returned when an integer parse fails.
    #[error("ParseIntError: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// Returned when a tile number is out of range (0 to 24).
    #[error("TileOutOfRange: tile {0} is out of range")]
    TileOutOfRange(u32),
}

impl Tileset {
    /// The empty tile set.
    pub const EMPTY: Self = Self(0);

    /// The set of all 25 tiles.
    pub const FULL: Self = Self((1 << TILE_COUNT) - 1);

    /// Creates a tileset from a raw bitmask. Bits outside the valid range
    /// are discarded.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::FULL.0)
    }

    /// Returns the underlying bitmask.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Creates the set containing exactly the given tile.
    #[must_use]
    pub fn single(tile: usize) -> Self {
        debug_assert!(tile < TILE_COUNT);
        Self(1 << tile)
    }

    /// Creates the set of the `n` lowest numbered tiles.
    #[must_use]
    pub fn least(n: usize) -> Self {
        Self((1 << n) - 1)
    }

    /// Returns whether `tile` is in the set.
    #[must_use]
    pub fn contains(self, tile: usize) -> bool {
        self.0 & 1 << tile != 0
    }

    /// Returns the set with `tile` added.
    #[must_use]
    pub fn add(self, tile: usize) -> Self {
        Self(self.0 | 1 << tile)
    }

    /// Returns the set with `tile` removed.
    #[must_use]
    pub fn remove(self, tile: usize) -> Self {
        Self(self.0 & !(1 << tile))
    }

    /// Returns the number of tiles in the set.
    #[must_use]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the lowest numbered tile in the set. Must not be called on an
    /// empty set.
    #[must_use]
    pub fn first(self) -> usize {
        debug_assert!(!self.is_empty());
        self.0.trailing_zeros() as usize
    }

    /// Returns the set without its lowest numbered tile, or the empty set if
    /// the set was already empty.
    #[must_use]
    pub fn remove_first(self) -> Self {
        Self(self.0 & self.0.wrapping_sub(1))
    }

    /// Returns the set of all tiles not in `self`.
    #[must_use]
    pub fn complement(self) -> Self {
        Self(!self.0 & Self::FULL.0)
    }

    /// Returns all tiles in `self` that are not in `other`.
    #[must_use]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns the parity of the set: whether the number of even-numbered
    /// tiles it contains is even or odd. Every move changes the occupied
    /// map of a pattern by one square, which flips this parity.
    #[must_use]
    pub fn parity(self) -> u32 {
        (Self(self.0 & 0x155_5555)).count() & 1
    }

    /// Interpreting `self` as a set of free squares, returns all squares
    /// reachable from `seed` by repeated moves through free squares.
    /// `seed` must be a member of the set.
    #[must_use]
    pub fn flood(self, seed: usize) -> Self {
        let cmap = self.0;
        let mut r = 1 << seed;

        loop {
            let old = r;
            r = cmap & (r | r << 5 | (r & ROW_MASK) << 1 | r >> 5 | r >> 1 & ROW_MASK);
            if r == old {
                return Self(r);
            }
        }
    }

    /// Interpreting `self` as the squares of one equivalence class, returns
    /// the squares of the class that are adjacent to a square outside it.
    /// These are the only squares a move can leave the class from.
    #[must_use]
    pub fn reduce_eqclass(self) -> Self {
        let c = self.complement().0;

        Self(self.0 & (c | c << 5 | (c & ROW_MASK) << 1 | c >> 5 | c >> 1 & ROW_MASK))
    }

    /// Interpreting `self` as the set of occupied squares, partitions the
    /// free squares into connected components. Returns an array assigning
    /// each free square its component index (occupied squares get -1) and
    /// the number of components.
    #[must_use]
    pub fn eqclasses(self) -> ([i8; TILE_COUNT], u32) {
        let mut classes = [-1i8; TILE_COUNT];
        let mut cmap = self.complement();
        let mut n_eqclass = 0;

        while !cmap.is_empty() {
            let eq = cmap.flood(cmap.first());
            cmap = cmap.difference(eq);
            for sq in eq {
                classes[sq] = n_eqclass as i8;
            }

            n_eqclass += 1;
        }

        (classes, n_eqclass)
    }

    /// Sends every tile in the set through automorphism `a`.
    #[must_use]
    pub fn morph(self, a: usize) -> Self {
        let perm = crate::symmetry::automorphism(a);
        self.into_iter()
            .fold(Self::EMPTY, |acc, t| acc.add(perm[t] as usize))
    }

    /// Returns the lexicographically next set with the same number of tiles.
    #[must_use]
    pub fn next_combination(self) -> Self {
        // https://graphics.stanford.edu/~seander/bithacks.html
        let t = self.0 | self.0.wrapping_sub(1);

        Self(t.wrapping_add(1) | ((!t & (!t).wrapping_neg()).wrapping_sub(1) >> (self.first() + 1)))
    }

    /// Returns the set of squares occupied by the non-zero tiles of `self`
    /// in the configuration `p`.
    #[must_use]
    pub fn tile_map(self, p: &Puzzle) -> Self {
        self.remove(ZERO_TILE)
            .into_iter()
            .fold(Self::EMPTY, |acc, t| acc.add(p.square_of(t) as usize))
    }
}

/// Iterator over the tiles of a [`Tileset`] in increasing order.
#[derive(Clone, Copy, Debug)]
pub struct Iter(Tileset);

impl Iterator for Iter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0.is_empty() {
            None
        } else {
            let t = self.0.first();
            self.0 = self.0.remove_first();
            Some(t)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Iter {}

impl IntoIterator for Tileset {
    type Item = usize;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        Iter(self)
    }
}

impl BitOr for Tileset {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Tileset {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Tileset {
    type Output = Self;

    fn not(self) -> Self {
        self.complement()
    }
}

impl Display for Tileset {
    /// Formats the set as an ascending comma-separated tile list, e.g.
    /// `1,2,5,6,7`. This is also the spelling used in PDB file names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_iter().join(","))
    }
}

impl FromStr for Tileset {
    type Err = ParseTilesetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ts = Self::EMPTY;

        for part in s.split(',') {
            let tile: u32 = part.trim().parse()?;
            if tile >= TILE_COUNT as u32 {
                return Err(ParseTilesetError::TileOutOfRange(tile));
            }

            ts = ts.add(tile as usize);
        }

        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_set_operations() {
        let ts = Tileset::EMPTY.add(3).add(7).add(24);
        assert_eq!(ts.count(), 3);
        assert!(ts.contains(7));
        assert!(!ts.contains(6));
        assert_eq!(ts.first(), 3);
        assert_eq!(ts.remove(3).first(), 7);
        assert_eq!(ts.complement().count(), 22);
        assert_eq!(ts.into_iter().collect::<Vec<_>>(), vec![3, 7, 24]);
    }

    #[test]
    fn parse_and_display_round_trip() {
        for s in ["0", "1,2,5,6,7", "0,1,2,3,4,5,6,7,8,9,10,11,12", "24"] {
            let ts: Tileset = s.parse().unwrap();
            assert_eq!(ts.to_string(), s);
        }

        assert!("".parse::<Tileset>().is_err());
        assert!("25".parse::<Tileset>().is_err());
        assert!("1,,2".parse::<Tileset>().is_err());
    }

    #[test]
    fn parity_counts_even_tiles() {
        assert_eq!(Tileset::EMPTY.parity(), 0);
        assert_eq!(Tileset::single(2).parity(), 1);
        assert_eq!(Tileset::single(3).parity(), 0);
        assert_eq!("2,4,6".parse::<Tileset>().unwrap().parity(), 1);
    }

    #[test]
    fn flood_respects_row_boundaries() {
        // Squares 4 and 5 are adjacent numerically but lie on different
        // rows, so a flood from 4 through { 4, 5 } must not reach 5.
        let free = Tileset::EMPTY.add(4).add(5);
        assert_eq!(free.flood(4), Tileset::single(4));

        // A full free board floods everywhere.
        assert_eq!(Tileset::FULL.flood(12), Tileset::FULL);
    }

    #[test]
    fn eqclasses_partition_the_free_squares() {
        // A vertical wall on column 2 splits the board in two.
        let wall: Tileset = "2,7,12,17,22".parse().unwrap();
        let (classes, n) = wall.eqclasses();
        assert_eq!(n, 2);
        assert_eq!(classes[2], -1);
        assert_eq!(classes[0], classes[11]);
        assert_ne!(classes[0], classes[4]);

        let (classes, n) = Tileset::EMPTY.eqclasses();
        assert_eq!(n, 1);
        assert!(classes.iter().all(|&c| c == 0));
    }

    #[test]
    fn next_combination_is_ordered() {
        let mut ts = Tileset::least(3);
        let mut prev = ts.bits();
        for _ in 0..200 {
            ts = ts.next_combination();
            assert_eq!(ts.count(), 3);
            assert!(ts.bits() > prev);
            prev = ts.bits();
        }
    }

    #[test]
    fn reduce_eqclass_keeps_boundary_squares() {
        // The class { 0, 1 } with everything else occupied: both squares
        // border occupied squares.
        let eq: Tileset = "0,1".parse().unwrap();
        assert_eq!(eq.reduce_eqclass(), eq);

        // The full board has no boundary.
        assert_eq!(Tileset::FULL.reduce_eqclass(), Tileset::EMPTY);
    }
}
