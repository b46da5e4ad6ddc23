//! Defines the [`CompactPuzzle`] type, a packed puzzle representation for
//! breadth-first frontier storage.

use bytemuck::{Pod, Zeroable};

use crate::puzzle::{
    moves::{move_count, moves_from},
    puzzle::{Puzzle, TILE_COUNT},
};

/// A puzzle configuration packed into 124 bits.
///
/// The positions of tiles 1 to 24 are stored as 5-bit fields; the empty
/// square's position is recomputed on unpacking as the one square no tile
/// occupies. The four least significant bits of `lo` form a move mask used
/// by frontier deduplication: bit `i` set means move `i` out of this
/// configuration leads back into the previous BFS generation and need not
/// be expanded. `lo` holds tiles 1 to 12 above the mask, `hi` tiles 13
/// to 24.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct CompactPuzzle {
    lo: u64,
    hi: u64,
}

/// The move mask bits in `lo`.
const MOVE_MASK: u64 = 0xf;

impl CompactPuzzle {
    /// Packs `p` with an empty move mask.
    #[must_use]
    pub fn pack(p: &Puzzle) -> Self {
        let mut lo = 0;
        let mut hi = 0;

        for i in 1..=12 {
            lo |= u64::from(p.square_of(i)) << (5 * (i - 1) + 4);
        }

        for i in 13..TILE_COUNT {
            hi |= u64::from(p.square_of(i)) << (5 * (i - 13));
        }

        Self { lo, hi }
    }

    /// Packs `p`, masking out the move that leads to `dest`.
    #[must_use]
    pub fn pack_masked(p: &Puzzle, dest: usize) -> Self {
        let mut cp = Self::pack(p);
        let zloc = p.zero_location();

        for (i, &d) in moves_from(zloc).iter().enumerate().take(move_count(zloc)) {
            if d as usize == dest {
                cp.lo |= 1 << i;
            }
        }

        cp
    }

    /// Unpacks the configuration, recomputing the empty square's location.
    #[must_use]
    pub fn unpack(&self) -> Puzzle {
        let mut grid = [0u8; TILE_COUNT];
        let mut used = 0u32;

        let mut accum = self.lo >> 4;
        for tile in 1..=12u8 {
            let sq = (accum & 31) as usize;
            grid[sq] = tile;
            used |= 1 << sq;
            accum >>= 5;
        }

        accum = self.hi;
        for tile in 13..TILE_COUNT as u8 {
            let sq = (accum & 31) as usize;
            grid[sq] = tile;
            used |= 1 << sq;
            accum >>= 5;
        }

        // The one square no tile claimed holds the zero tile; grid[zloc]
        // is already 0.
        debug_assert_eq!(used.count_ones() as usize, TILE_COUNT - 1);

        Puzzle::from_grid(grid).expect("packed configurations are permutations")
    }

    /// Returns the move mask.
    #[must_use]
    pub fn move_mask(&self) -> u8 {
        (self.lo & MOVE_MASK) as u8
    }

    /// Returns whether `self` and `other` describe the same configuration,
    /// ignoring the move masks.
    #[must_use]
    pub fn same_configuration(&self, other: &Self) -> bool {
        self.hi == other.hi && (self.lo ^ other.lo) & !MOVE_MASK == 0
    }

    /// Merges the move mask of `other` into `self`. The two must describe
    /// the same configuration.
    pub fn merge_mask(&mut self, other: &Self) {
        debug_assert!(self.same_configuration(other));
        self.lo |= other.lo & MOVE_MASK;
    }
}

impl Ord for CompactPuzzle {
    /// Orders by configuration first. Configurations that differ only in
    /// their move masks sort next to each other, which is what frontier
    /// coalescing relies on.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.hi.cmp(&other.hi).then(self.lo.cmp(&other.lo))
    }
}

impl PartialOrd for CompactPuzzle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;
    use crate::random::random_puzzle;

    #[test]
    fn pack_unpack_is_identity() {
        let solved = Puzzle::solved();
        assert_eq!(CompactPuzzle::pack(&solved).unpack(), solved);

        for _ in 0..100 {
            let p = random_puzzle();
            let cp = CompactPuzzle::pack(&p);
            assert_eq!(cp.unpack(), p);
            assert_eq!(cp.move_mask(), 0);
        }
    }

    #[test]
    fn masked_pack_records_the_move() {
        let p = Puzzle::from_str("1,0,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24")
            .unwrap();

        // The zero tile is on square 1; moving back to square 0 is move
        // index 0 of square 1.
        let cp = CompactPuzzle::pack_masked(&p, 0);
        assert_eq!(cp.move_mask(), 1);
        assert_eq!(cp.unpack(), p);
    }

    #[test]
    fn coalescing_order_groups_configurations() {
        let p = Puzzle::solved();
        let a = CompactPuzzle::pack_masked(&p, 1);
        let b = CompactPuzzle::pack_masked(&p, 5);
        assert!(a.same_configuration(&b));

        let mut merged = a;
        merged.merge_mask(&b);
        assert_eq!(merged.move_mask(), a.move_mask() | b.move_mask());
    }

    #[test]
    fn pod_view_matches_layout() {
        let cp = CompactPuzzle::pack(&Puzzle::solved());
        let bytes: &[u8] = bytemuck::bytes_of(&cp);
        assert_eq!(bytes.len(), 16);
        assert_eq!(u64::from_le_bytes(bytes[..8].try_into().unwrap()), cp.lo);
    }
}
