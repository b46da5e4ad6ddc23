//! The perfect minimal index mapping partial puzzle configurations to dense
//! integers.
//!
//! To build pattern databases we need a bijection from partial puzzle
//! configurations (the positions of the tiles in some tile set) to integers
//! `0 .. n-1` where `n` is the number of such configurations. The index is
//! computed in three parts:
//!
//! 1. the set of grid squares occupied by the pattern's tiles is ranked
//!    combinatorially (the *map rank*),
//! 2. the order of the pattern's tiles within those squares is encoded as an
//!    inversion vector in a factorial number system (the *permutation
//!    index*),
//! 3. if the zero tile is part of the pattern, the connected component of
//!    empty squares it occupies is recorded (the *equivalence class index*).
//!
//! Keeping the three parts separate is useful on its own (the PDB generator
//! iterates them in different loops); [`IndexAux::index_offset`] combines
//! them into a single array offset.

use std::fmt::{self, Display};

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::{
    puzzle::puzzle::{Puzzle, TILE_COUNT, ZERO_TILE},
    tileset::{rank, tileset::Tileset},
};

/// The maximal number of non-zero tiles in a pattern. Permutation indices
/// of larger patterns would not fit 32 bits.
pub const INDEX_MAX_TILES: usize = 12;

/// The first `INDEX_MAX_TILES` factorials.
const FACTORIALS: [u32; INDEX_MAX_TILES + 1] = {
    let mut f = [1u32; INDEX_MAX_TILES + 1];
    let mut i = 1;
    while i <= INDEX_MAX_TILES {
        f[i] = f[i - 1] * i as u32;
        i += 1;
    }
    f
};

/// The structured index of a partial puzzle configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Index {
    /// The permutation index of the pattern tiles within the map.
    pub pidx: u32,
    /// The combinatorial rank of the occupied-square map.
    pub maprank: u32,
    /// The equivalence class of the zero tile, or -1 if the pattern does
    /// not account for it.
    pub eqidx: i32,
}

impl Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.pidx, self.maprank, self.eqidx)
    }
}

/// Error type for [`IndexAux::new`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Returned when a pattern has more non-zero tiles than the index can
    /// encode.
    #[error("TooManyTiles: pattern has {0} non-zero tiles, at most {INDEX_MAX_TILES} are possible")]
    TooManyTiles(u32),
}

/// Per-map lookup data: the equivalence class of every empty square (-1 for
/// occupied squares), the number of classes, and the cumulative number of
/// classes in all preceding maps.
#[derive(Clone, Debug)]
pub struct IndexTable {
    eqclasses: [i8; TILE_COUNT],
    n_eqclass: u8,
    offset: u32,
}

/// The tables depend only on the number of pattern tiles, not on their
/// identity, so one table per cardinality is shared process-wide.
static INDEX_TABLES: [OnceCell<Box<[IndexTable]>>; INDEX_MAX_TILES + 1] =
    [const { OnceCell::new() }; INDEX_MAX_TILES + 1];

fn index_table(n_tile: usize) -> &'static [IndexTable] {
    INDEX_TABLES[n_tile].get_or_init(|| {
        let n = rank::combination_count(n_tile);
        let mut map = Tileset::least(n_tile);
        let mut offset = 0;

        (0..n)
            .map(|i| {
                let (eqclasses, n_eqclass) = map.eqclasses();
                let entry = IndexTable {
                    eqclasses,
                    n_eqclass: n_eqclass as u8,
                    offset,
                };

                offset += n_eqclass;
                if i + 1 < n {
                    map = map.next_combination();
                }
                entry
            })
            .collect()
    })
}

/// Everything needed to compute and invert indices for one tile set.
#[derive(Clone, Debug)]
pub struct IndexAux {
    ts: Tileset,
    /// The number of non-zero tiles in the pattern.
    n_tile: u32,
    /// The number of distinct map ranks, `C(25, n_tile)`.
    n_maprank: u32,
    /// The number of permutations, `n_tile!`.
    n_perm: u32,
    /// The map parity of the solved configuration.
    solved_parity: u32,
    /// Per-map equivalence class data, present iff the pattern accounts
    /// for the zero tile.
    idxt: Option<&'static [IndexTable]>,
}

impl IndexAux {
    /// Prepares index computation for the tile set `ts`.
    pub fn new(ts: Tileset) -> Result<Self, IndexError> {
        let tsnz = ts.remove(ZERO_TILE);
        let n_tile = tsnz.count();

        if n_tile as usize > INDEX_MAX_TILES {
            return Err(IndexError::TooManyTiles(n_tile));
        }

        // Warm the unrank table shared by all inversions for this size.
        let _ = rank::unrank(n_tile as usize, 0);

        Ok(Self {
            ts,
            n_tile,
            n_maprank: rank::combination_count(n_tile as usize),
            n_perm: FACTORIALS[n_tile as usize],
            solved_parity: tsnz.parity(),
            idxt: ts
                .contains(ZERO_TILE)
                .then(|| index_table(n_tile as usize)),
        })
    }

    /// Returns the tile set this index is for.
    #[must_use]
    pub fn tileset(&self) -> Tileset {
        self.ts
    }

    /// Returns the number of non-zero tiles in the pattern.
    #[must_use]
    pub fn n_tile(&self) -> u32 {
        self.n_tile
    }

    /// Returns the number of distinct map ranks.
    #[must_use]
    pub fn n_maprank(&self) -> u32 {
        self.n_maprank
    }

    /// Returns the number of tile permutations per map.
    #[must_use]
    pub fn n_perm(&self) -> u32 {
        self.n_perm
    }

    /// Returns the map parity of the solved configuration.
    #[must_use]
    pub fn solved_parity(&self) -> u32 {
        self.solved_parity
    }

    /// Returns the number of equivalence classes for the given map rank.
    /// This is 1 if the zero tile is not accounted for.
    #[must_use]
    pub fn eqclass_count(&self, maprank: u32) -> u32 {
        match self.idxt {
            Some(idxt) => u32::from(idxt[maprank as usize].n_eqclass),
            None => 1,
        }
    }

    /// Returns the total number of equivalence classes over all maps.
    #[must_use]
    pub fn eqclass_total(&self) -> u32 {
        match self.idxt {
            Some(idxt) => {
                let last = &idxt[self.n_maprank as usize - 1];
                last.offset + u32::from(last.n_eqclass)
            }
            None => self.n_maprank,
        }
    }

    /// Returns the number of possible index values, which is the size of a
    /// pattern database for this tile set.
    #[must_use]
    pub fn search_space_size(&self) -> usize {
        self.n_perm as usize * self.eqclass_total() as usize
    }

    /// Computes the byte offset of `idx` from the beginning of a pattern
    /// database.
    #[inline]
    #[must_use]
    pub fn index_offset(&self, idx: &Index) -> usize {
        let map_offset = match self.idxt {
            Some(idxt) => idxt[idx.maprank as usize].offset as usize + idx.eqidx as usize,
            None => idx.maprank as usize,
        };

        map_offset * self.n_perm as usize + idx.pidx as usize
    }

    /// Computes the structured index of `p` with respect to this tile set.
    #[must_use]
    pub fn compute_index(&self, p: &Puzzle) -> Index {
        let tsnz = self.ts.remove(ZERO_TILE);
        let map = self.ts.tile_map(p);
        let maprank = rank::rank(map);

        Index {
            maprank,
            pidx: index_permutation(tsnz, map, p),
            eqidx: match self.idxt {
                Some(idxt) => i32::from(idxt[maprank as usize].eqclasses[p.zero_location()]),
                None => -1,
            },
        }
    }

    /// Returns the equivalence class of `idx` as a set of squares. If the
    /// zero tile is not accounted for, this is the set of all empty
    /// squares of the map.
    #[must_use]
    pub fn eqclass_from_index(&self, idx: &Index) -> Tileset {
        match self.idxt {
            Some(idxt) => {
                let eqclasses = &idxt[idx.maprank as usize].eqclasses;
                let mut eq = Tileset::EMPTY;
                for (sq, &class) in eqclasses.iter().enumerate() {
                    if i32::from(class) == idx.eqidx {
                        eq = eq.add(sq);
                    }
                }

                eq
            }
            None => rank::unrank(self.n_tile as usize, idx.maprank).complement(),
        }
    }

    /// Performs the map-dependent half of index inversion: a puzzle with
    /// the complement tiles placed on the complement squares in increasing
    /// order. The result is completed by [`Self::invert_index_rest`] and
    /// may be reused for any index with the same map rank.
    #[must_use]
    pub fn invert_index_map(&self, idx: &Index) -> Puzzle {
        let tsnz = self.ts.remove(ZERO_TILE);
        let map = rank::unrank(tsnz.count() as usize, idx.maprank);

        let mut p = Puzzle {
            tiles: [0; TILE_COUNT],
            grid: [0; TILE_COUNT],
        };

        let mut cmap = map.complement();
        for tile in tsnz.complement() {
            let sq = cmap.first();
            cmap = cmap.remove_first();
            p.tiles[tile] = sq as u8;
            p.grid[sq] = tile as u8;
        }

        p
    }

    /// Performs the other half of the work begun by
    /// [`Self::invert_index_map`]: places the pattern tiles according to the
    /// permutation index and teleports the zero tile to the canonical
    /// square of its equivalence class.
    pub fn invert_index_rest(&self, p: &mut Puzzle, idx: &Index) {
        let tsnz = self.ts.remove(ZERO_TILE);
        let map = rank::unrank(tsnz.count() as usize, idx.maprank);

        unindex_permutation(p, tsnz, map, idx.pidx);

        if self.ts.contains(ZERO_TILE) {
            // The zero tile was placed like any complement tile; swap it to
            // the lowest numbered square of its equivalence class.
            p.apply_move(self.eqclass_from_index(idx).first());
        }
    }

    /// Computes a representative configuration of the equivalence class
    /// `idx`, the inverse of [`Self::compute_index`] up to partial
    /// equality.
    #[must_use]
    pub fn invert_index(&self, idx: &Index) -> Puzzle {
        let mut p = self.invert_index_map(idx);
        self.invert_index_rest(&mut p, idx);

        p
    }

    /// Returns whether `a` and `b` agree on the positions of all tiles of
    /// this tile set, and, if the zero tile is accounted for, on the
    /// equivalence class of their empty squares.
    #[must_use]
    pub fn partially_equal(&self, a: &Puzzle, b: &Puzzle) -> bool {
        let tsnz = self.ts.remove(ZERO_TILE);

        if tsnz.into_iter().any(|t| a.tiles[t] != b.tiles[t]) {
            return false;
        }

        match self.idxt {
            None => true,
            Some(idxt) => {
                let eqclasses = &idxt[rank::rank(self.ts.tile_map(a)) as usize].eqclasses;

                eqclasses[a.zero_location()] == eqclasses[b.zero_location()]
            }
        }
    }
}

/// Computes the permutation index of the tiles in `ts`, which occupy the
/// squares in `map`. Each tile contributes the number of unclaimed map
/// squares below its own square as a digit in a factorial number system.
fn index_permutation(ts: Tileset, map: Tileset, p: &Puzzle) -> u32 {
    if ts.is_empty() {
        return 0;
    }

    let mut n_tiles = ts.count();
    let mut factor = 1u32;
    let mut map = map;

    let first_sq = p.tiles[ts.first()] as usize;
    let mut pidx = (map & Tileset::least(first_sq)).count();
    map = map.remove(first_sq);

    for tile in ts.remove_first() {
        factor *= n_tiles;
        n_tiles -= 1;

        let sq = p.tiles[tile] as usize;
        pidx += factor * (map & Tileset::least(sq)).count();
        map = map.remove(sq);
    }

    pidx
}

/// Places the tiles of `ts` onto the squares of `map` as encoded by `pidx`,
/// the inverse of [`index_permutation`].
fn unindex_permutation(p: &mut Puzzle, ts: Tileset, map: Tileset, pidx: u32) {
    let mut pidx = pidx;
    let mut ts = ts;
    let mut map = map;

    for n_tiles in (1..=ts.count()).rev() {
        let cmp = pidx % n_tiles;
        pidx /= n_tiles;

        let tile = ts.first();
        ts = ts.remove_first();

        let mut sq_set = map;
        for _ in 0..cmp {
            sq_set = sq_set.remove_first();
        }
        let sq = sq_set.first();

        map = map.remove(sq);
        p.tiles[tile] = sq as u8;
        p.grid[sq] = tile as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;
    use crate::random::random_puzzle;

    fn aux(s: &str) -> IndexAux {
        IndexAux::new(Tileset::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn rejects_oversized_patterns() {
        let ts = Tileset::least(14);
        assert!(matches!(
            IndexAux::new(ts),
            Err(IndexError::TooManyTiles(13 | 14))
        ));
    }

    #[test]
    fn sizes_of_known_patterns() {
        // An additive pattern with 4 tiles: C(25, 4) maps, 4! permutations.
        let apdb = aux("1,2,5,6");
        assert_eq!(apdb.n_maprank(), 12650);
        assert_eq!(apdb.n_perm(), 24);
        assert_eq!(apdb.search_space_size(), 12650 * 24);

        // The empty pattern has a single configuration.
        let empty = IndexAux::new(Tileset::EMPTY).unwrap();
        assert_eq!(empty.search_space_size(), 1);
    }

    #[test]
    fn solved_configuration_round_trips() {
        for s in ["1,2,5,6", "0,1,2,5,6", "0", "21,22,23,24"] {
            let aux = aux(s);
            let solved = Puzzle::solved();
            let idx = aux.compute_index(&solved);
            let p = aux.invert_index(&idx);
            assert!(p.is_valid());
            assert!(aux.partially_equal(&p, &solved), "tileset {s}");
            assert_eq!(aux.compute_index(&p), idx);
        }
    }

    #[test]
    fn index_offsets_are_dense_and_complete() {
        // Walk every valid index of a small zero-aware pattern and check
        // the offsets enumerate the search space exactly once.
        let aux = aux("0,1,2");
        let mut seen = vec![false; aux.search_space_size()];

        for maprank in 0..aux.n_maprank() {
            for eqidx in 0..aux.eqclass_count(maprank) {
                for pidx in 0..aux.n_perm() {
                    let idx = Index {
                        pidx,
                        maprank,
                        eqidx: eqidx as i32,
                    };
                    let offset = aux.index_offset(&idx);
                    assert!(!seen[offset]);
                    seen[offset] = true;
                }
            }
        }

        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn invert_then_compute_is_identity() {
        for s in ["1,2,3", "0,1,2", "0,22,23,24"] {
            let aux = aux(s);
            for maprank in 0..aux.n_maprank() {
                for eqidx in 0..aux.eqclass_count(maprank) {
                    for pidx in 0..aux.n_perm() {
                        let idx = Index {
                            pidx,
                            maprank,
                            eqidx: if aux.tileset().contains(ZERO_TILE) {
                                eqidx as i32
                            } else {
                                -1
                            },
                        };

                        let p = aux.invert_index(&idx);
                        assert!(p.is_valid());
                        assert_eq!(aux.compute_index(&p), idx, "tileset {s}");
                    }
                }
            }
        }
    }

    #[test]
    fn compute_then_invert_is_partial_identity() {
        for s in ["1,2,5,6", "0,1,2,5,6,7", "3,17,21"] {
            let aux = aux(s);
            for _ in 0..200 {
                let p = random_puzzle();
                let idx = aux.compute_index(&p);
                let q = aux.invert_index(&idx);
                assert!(q.is_valid());
                assert!(aux.partially_equal(&p, &q), "tileset {s}");
                assert_eq!(aux.compute_index(&q), idx);
            }
        }
    }

    #[test]
    fn partial_equality_ignores_other_tiles() {
        let aux = aux("1,2");
        let a = Puzzle::solved();

        // Swap tiles 23 and 24: not partially equal tiles, parity aside.
        let b: Puzzle = "0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,24,23"
            .parse()
            .unwrap();
        assert!(aux.partially_equal(&a, &b));

        // Moving tile 1 breaks partial equality.
        let mut c = a;
        c.apply_move(1);
        assert!(!aux.partially_equal(&a, &c));
    }

    #[test]
    fn eqclass_respects_zero_region() {
        let aux = aux("0,6,7,8");
        let solved = Puzzle::solved();
        let idx = aux.compute_index(&solved);

        let eq = aux.eqclass_from_index(&idx);
        assert!(eq.contains(0));
        assert!(!eq.contains(6));

        // All squares of the class are empty in the map.
        let map = aux.tileset().tile_map(&solved);
        assert!(eq.into_iter().all(|sq| !map.contains(sq)));
    }
}
