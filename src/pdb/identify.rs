//! Turns a zero-aware pattern database into a zero-unaware one.
//!
//! A ZPDB conditions distances on the zero tile's region. Identifying it
//! takes the minimum over all regions of each map, which produces a valid
//! (if weaker) additive heuristic in the APDB layout at a fraction of the
//! size. The result is in general not consistent: neighbouring entries may
//! differ by more than one.

use crate::{
    index::Index,
    pdb::{parallel::Workers, pattern_db::PatternDb},
    puzzle::puzzle::ZERO_TILE,
};

/// Collapses the equivalence classes of `pdb`, returning a database for
/// the same tile set without the zero tile. A zero-unaware input is
/// returned unchanged.
pub fn identify(pdb: PatternDb, workers: &Workers) -> PatternDb {
    if !pdb.tileset().contains(ZERO_TILE) {
        return pdb;
    }

    let aux = pdb.aux();
    let n_perm = aux.n_perm() as usize;

    let out = PatternDb::allocate(pdb.tileset().remove(ZERO_TILE))
        .expect("identified tile set is no larger than the source");
    let src = pdb.as_bytes();

    workers.for_each_maprank(aux, |maprank| {
        let n_eqclass = aux.eqclass_count(maprank) as usize;
        let base = aux.index_offset(&Index {
            pidx: 0,
            maprank,
            eqidx: 0,
        });
        let table = &src[base..base + n_eqclass * n_perm];

        for pidx in 0..n_perm {
            let mut min = table[pidx];
            for eqidx in 1..n_eqclass {
                min = min.min(table[eqidx * n_perm + pidx]);
            }

            out.update(
                &Index {
                    pidx: pidx as u32,
                    maprank,
                    eqidx: -1,
                },
                min,
            );
        }
    });

    out
}
