//! Ranking and unranking of tilesets.
//!
//! The rank of a tileset is its position in lexicographic order among all
//! tilesets with the same number of tiles, computed with the combinatorial
//! number system: for a set with members `c0 < c1 < ... < c(k-1)` the rank
//! is the sum of `C(ci, i + 1)`. Ranking is split over three lookup tables
//! indexed by the low 11, middle 7, and high 7 bits of the set so a rank is
//! three table lookups and two additions. Unranking goes through one table
//! per cardinality, built on first use.

use once_cell::sync::{Lazy, OnceCell};

use crate::{puzzle::puzzle::TILE_COUNT, tileset::tileset::Tileset};

const RANK_SPLIT1: usize = 11;
const RANK_SPLIT2: usize = 18;

/// Binomial coefficients `C(n, k)` for `n, k <= 25`.
pub(crate) const BINOMIAL: [[u32; TILE_COUNT + 1]; TILE_COUNT + 1] = {
    let mut c = [[0u32; TILE_COUNT + 1]; TILE_COUNT + 1];
    let mut n = 0;
    while n <= TILE_COUNT {
        c[n][0] = 1;
        let mut k = 1;
        while k <= n {
            c[n][k] = c[n - 1][k - 1] + if k <= n - 1 { c[n - 1][k] } else { 0 };
            k += 1;
        }
        n += 1;
    }
    c
};

/// The number of tilesets with `k` tiles, i.e. `C(25, k)`.
#[must_use]
pub fn combination_count(k: usize) -> u32 {
    BINOMIAL[TILE_COUNT][k]
}

struct RankTables {
    /// Rank contribution of the low 11 bits.
    tails: Box<[u16]>,
    /// Contribution of bits 11..18, per popcount of the tail.
    mids: Box<[[u32; 1 << (RANK_SPLIT2 - RANK_SPLIT1)]]>,
    /// Contribution of bits 18..25, per popcount of the low 18 bits.
    heads: Box<[[u32; 1 << (TILE_COUNT - RANK_SPLIT2)]]>,
}

/// Rank contribution of a bit pattern whose bits sit at `base + i` for each
/// set bit `i`, with `prior` set members below it.
fn partial_rank(bits: u32, base: usize, prior: usize) -> u32 {
    let mut rank = 0;
    let mut i = prior;

    for j in 0..32 {
        if bits & 1 << j != 0 {
            rank += BINOMIAL[base + j][i + 1];
            i += 1;
        }
    }

    rank
}

static RANK_TABLES: Lazy<RankTables> = Lazy::new(|| {
    let tails = (0..1u32 << RANK_SPLIT1)
        .map(|bits| partial_rank(bits, 0, 0) as u16)
        .collect();

    let mids = (0..=RANK_SPLIT1)
        .map(|prior| {
            let mut row = [0u32; 1 << (RANK_SPLIT2 - RANK_SPLIT1)];
            for (bits, entry) in row.iter_mut().enumerate() {
                *entry = partial_rank(bits as u32, RANK_SPLIT1, prior);
            }
            row
        })
        .collect();

    let heads = (0..=RANK_SPLIT2)
        .map(|prior| {
            let mut row = [0u32; 1 << (TILE_COUNT - RANK_SPLIT2)];
            for (bits, entry) in row.iter_mut().enumerate() {
                *entry = partial_rank(bits as u32, RANK_SPLIT2, prior);
            }
            row
        })
        .collect();

    RankTables { tails, mids, heads }
});

/// Computes the rank of `ts` among all tilesets with the same tile count.
#[must_use]
pub fn rank(ts: Tileset) -> u32 {
    let bits = ts.bits();
    let tail = bits & ((1 << RANK_SPLIT1) - 1);
    let mid = bits & ((1 << RANK_SPLIT2) - 1);
    let head = bits >> RANK_SPLIT2;

    let t = &*RANK_TABLES;

    u32::from(t.tails[tail as usize])
        + t.mids[tail.count_ones() as usize][(mid >> RANK_SPLIT1) as usize]
        + t.heads[mid.count_ones() as usize][head as usize]
}

static UNRANK_TABLES: [OnceCell<Box<[Tileset]>>; TILE_COUNT + 1] =
    [const { OnceCell::new() }; TILE_COUNT + 1];

fn unrank_table(k: usize) -> &'static [Tileset] {
    UNRANK_TABLES[k].get_or_init(|| {
        let n = combination_count(k);
        let mut ts = Tileset::least(k);

        (0..n)
            .map(|i| {
                let cur = ts;
                if i + 1 < n {
                    ts = ts.next_combination();
                }
                cur
            })
            .collect()
    })
}

/// Computes the tileset with `k` tiles of rank `rk`, the inverse of
/// [`rank`].
#[must_use]
pub fn unrank(k: usize, rk: u32) -> Tileset {
    unrank_table(k)[rk as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_table() {
        assert_eq!(BINOMIAL[25][0], 1);
        assert_eq!(BINOMIAL[25][1], 25);
        assert_eq!(BINOMIAL[25][12], 5_200_300);
        assert_eq!(BINOMIAL[25][25], 1);
        assert_eq!(BINOMIAL[4][2], 6);
    }

    #[test]
    fn rank_of_least_is_zero() {
        for k in 0..=TILE_COUNT {
            assert_eq!(rank(Tileset::least(k)), 0, "k = {k}");
        }
    }

    #[test]
    fn rank_unrank_bijection() {
        for k in [0, 1, 2, 3, 6, 24, 25] {
            for rk in 0..combination_count(k) {
                assert_eq!(rank(unrank(k, rk)), rk);
            }
        }
    }

    #[test]
    fn unrank_rank_identity() {
        // Every 4-tile set round-trips.
        let mut ts = Tileset::least(4);
        for _ in 0..combination_count(4) {
            assert_eq!(unrank(4, rank(ts)), ts);
            ts = ts.next_combination();
        }
    }

    #[test]
    fn rank_is_lexicographic() {
        let a: Tileset = "0,1,2".parse().unwrap();
        let b: Tileset = "0,1,3".parse().unwrap();
        let c: Tileset = "22,23,24".parse().unwrap();

        assert_eq!(rank(a), 0);
        assert_eq!(rank(b), 1);
        assert_eq!(rank(c), combination_count(3) - 1);
    }
}
