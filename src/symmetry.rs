//! The automorphism group of the 5x5 tray.
//!
//! Rotating the tray by a quarter turn or flipping it along a diagonal
//! permutes the squares without changing which squares are adjacent, so any
//! such relabelling maps legal move sequences to legal move sequences.
//! There are eight of them: four rotations times an optional transposition.
//! A pattern database for a tile set computes the same distances as the
//! database for the morphed tile set queried with morphed configurations,
//! so only one representative per orbit needs to be stored on disk.

use once_cell::sync::Lazy;

use crate::{
    puzzle::puzzle::{TILE_COUNT, ZERO_TILE},
    tileset::tileset::Tileset,
};

/// The number of tray automorphisms.
pub const AUTOMORPHISM_COUNT: usize = 8;

/// The index of the plain transposition along the main diagonal.
pub const TRANSPOSE: usize = 4;

/// For each automorphism, the square permutation and its inverse.
static AUTOMORPHISMS: [[[u8; TILE_COUNT]; 2]; AUTOMORPHISM_COUNT] = [
    [
        [
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24,
        ],
        [
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24,
        ],
    ],
    [
        [
            20, 15, 10, 5, 0, 21, 16, 11, 6, 1, 22, 17, 12, 7, 2, 23, 18, 13, 8, 3, 24, 19, 14, 9,
            4,
        ],
        [
            4, 9, 14, 19, 24, 3, 8, 13, 18, 23, 2, 7, 12, 17, 22, 1, 6, 11, 16, 21, 0, 5, 10, 15,
            20,
        ],
    ],
    [
        [
            24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1,
            0,
        ],
        [
            24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1,
            0,
        ],
    ],
    [
        [
            4, 9, 14, 19, 24, 3, 8, 13, 18, 23, 2, 7, 12, 17, 22, 1, 6, 11, 16, 21, 0, 5, 10, 15,
            20,
        ],
        [
            20, 15, 10, 5, 0, 21, 16, 11, 6, 1, 22, 17, 12, 7, 2, 23, 18, 13, 8, 3, 24, 19, 14, 9,
            4,
        ],
    ],
    [
        [
            0, 5, 10, 15, 20, 1, 6, 11, 16, 21, 2, 7, 12, 17, 22, 3, 8, 13, 18, 23, 4, 9, 14, 19,
            24,
        ],
        [
            0, 5, 10, 15, 20, 1, 6, 11, 16, 21, 2, 7, 12, 17, 22, 3, 8, 13, 18, 23, 4, 9, 14, 19,
            24,
        ],
    ],
    [
        [
            20, 21, 22, 23, 24, 15, 16, 17, 18, 19, 10, 11, 12, 13, 14, 5, 6, 7, 8, 9, 0, 1, 2, 3,
            4,
        ],
        [
            4, 3, 2, 1, 0, 9, 8, 7, 6, 5, 14, 13, 12, 11, 10, 19, 18, 17, 16, 15, 24, 23, 22, 21,
            20,
        ],
    ],
    [
        [
            24, 19, 14, 9, 4, 23, 18, 13, 8, 3, 22, 17, 12, 7, 2, 21, 16, 11, 6, 1, 20, 15, 10, 5,
            0,
        ],
        [
            24, 19, 14, 9, 4, 23, 18, 13, 8, 3, 22, 17, 12, 7, 2, 21, 16, 11, 6, 1, 20, 15, 10, 5,
            0,
        ],
    ],
    [
        [
            4, 3, 2, 1, 0, 9, 8, 7, 6, 5, 14, 13, 12, 11, 10, 19, 18, 17, 16, 15, 24, 23, 22, 21,
            20,
        ],
        [
            20, 21, 22, 23, 24, 15, 16, 17, 18, 19, 10, 11, 12, 13, 14, 5, 6, 7, 8, 9, 0, 1, 2, 3,
            4,
        ],
    ],
];

/// Returns the square permutation of automorphism `a`.
#[inline]
#[must_use]
pub fn automorphism(a: usize) -> &'static [u8; TILE_COUNT] {
    &AUTOMORPHISMS[a][0]
}

/// Returns the inverse square permutation of automorphism `a`.
#[inline]
#[must_use]
pub fn automorphism_inverse(a: usize) -> &'static [u8; TILE_COUNT] {
    &AUTOMORPHISMS[a][1]
}

/// The composition table: `COMPOSE[a][b]` applies `a` first, then `b`.
static COMPOSE: Lazy<[[u8; AUTOMORPHISM_COUNT]; AUTOMORPHISM_COUNT]> = Lazy::new(|| {
    let mut table = [[0u8; AUTOMORPHISM_COUNT]; AUTOMORPHISM_COUNT];

    for (a, row) in table.iter_mut().enumerate() {
        for (b, entry) in row.iter_mut().enumerate() {
            let mut composed = [0u8; TILE_COUNT];
            for i in 0..TILE_COUNT {
                composed[i] = AUTOMORPHISMS[b][0][AUTOMORPHISMS[a][0][i] as usize];
            }

            *entry = AUTOMORPHISMS
                .iter()
                .position(|m| m[0] == composed)
                .expect("automorphisms form a group") as u8;
        }
    }

    table
});

/// Composes two automorphisms: the result of applying `a` first and then
/// `b` as a single automorphism.
#[must_use]
pub fn compose(a: usize, b: usize) -> usize {
    COMPOSE[a][b] as usize
}

/// Returns the automorphism that undoes `a`.
#[must_use]
pub fn inverse(a: usize) -> usize {
    (0..AUTOMORPHISM_COUNT)
        .find(|&b| compose(a, b) == 0)
        .expect("automorphisms form a group")
}

/// Finds the automorphism sending `ts` to the lexicographically least tile
/// set whose pattern database computes the same distances. Zero-aware tile
/// sets additionally require the zero tile's region in the solved
/// configuration to be preserved.
#[must_use]
pub fn canonical_automorphism(ts: Tileset) -> usize {
    let has_zero_tile = ts.contains(ZERO_TILE);
    let ts = ts.remove(ZERO_TILE);
    let mut mints = ts;
    let mut min = 0;

    // The region the zero tile occupies in the solved configuration. For
    // the PDB to compute the same distances, a morph must map this region
    // onto itself.
    let mut r = ts.complement();
    if has_zero_tile {
        r = r.flood(ZERO_TILE);
    }

    for a in 1..AUTOMORPHISM_COUNT {
        let morphts = ts.morph(a);
        if morphts >= mints {
            continue;
        }

        if r.morph(a).contains(ZERO_TILE) {
            mints = morphts;
            min = a;
        }
    }

    min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::puzzle::Puzzle;

    #[test]
    fn tables_are_permutations_and_inverses() {
        for a in 0..AUTOMORPHISM_COUNT {
            let perm = automorphism(a);
            let inv = automorphism_inverse(a);

            let mut seen = [false; TILE_COUNT];
            for &x in perm {
                assert!(!seen[x as usize]);
                seen[x as usize] = true;
            }

            for i in 0..TILE_COUNT {
                assert_eq!(inv[perm[i] as usize] as usize, i);
            }
        }
    }

    #[test]
    fn automorphisms_preserve_adjacency() {
        use crate::puzzle::moves::moves_from;

        for a in 0..AUTOMORPHISM_COUNT {
            let perm = automorphism(a);
            for sq in 0..TILE_COUNT {
                for &dest in moves_from(sq) {
                    if dest == -1 {
                        continue;
                    }

                    let msq = perm[sq] as usize;
                    let mdest = perm[dest as usize] as i8;
                    assert!(moves_from(msq).contains(&mdest));
                }
            }
        }
    }

    #[test]
    fn composition_is_a_group() {
        for a in 0..AUTOMORPHISM_COUNT {
            assert_eq!(compose(a, 0), a);
            assert_eq!(compose(0, a), a);
            assert_eq!(compose(a, inverse(a)), 0);
        }
    }

    #[test]
    fn morph_and_inverse_round_trip() {
        let p: Puzzle = "1,0,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24"
            .parse()
            .unwrap();

        for a in 0..AUTOMORPHISM_COUNT {
            let mut q = p;
            q.morph(a);
            assert!(q.is_valid());
            q.morph(inverse(a));
            assert_eq!(q, p);
        }
    }

    #[test]
    fn tileset_morph_preserves_cardinality() {
        let ts: Tileset = "1,2,5,6,7".parse().unwrap();
        for a in 0..AUTOMORPHISM_COUNT {
            let m = ts.morph(a);
            assert_eq!(m.count(), ts.count());
        }
    }

    #[test]
    fn canonical_automorphism_is_minimal() {
        // The top-left corner pattern is already canonical.
        let corner: Tileset = "0,1,2,5,6".parse().unwrap();
        assert_eq!(canonical_automorphism(corner), 0);

        // The bottom-right mirror of it maps to something no larger.
        let mirrored = corner.morph(2);
        let a = canonical_automorphism(mirrored);
        assert!(mirrored.remove(ZERO_TILE).morph(a) <= mirrored.remove(ZERO_TILE));
    }
}
