//! Differential recoding of pattern databases.
//!
//! For each equivalence class the lowest distance is subtracted from every
//! entry of the class. The minima are returned separately, so the original
//! table can be reconstructed. The recoded entries are small and highly
//! repetitive, which makes downstream entropy coding far more effective.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::{
    index::Index,
    pdb::{
        parallel::Workers,
        pattern_db::{PatternDb, UNREACHED},
    },
    puzzle::puzzle::ZERO_TILE,
};

/// Rewrites every entry of `pdb` as its difference from the minimum of its
/// equivalence class. Returns the minima, one per class, in index order.
pub fn diffcode(pdb: &mut PatternDb, workers: &Workers) -> Vec<u8> {
    let pdb: &PatternDb = pdb;
    let aux = pdb.aux();
    let zero_aware = pdb.tileset().contains(ZERO_TILE);
    let minimums: Vec<AtomicU8> = (0..aux.eqclass_total())
        .map(|_| AtomicU8::new(UNREACHED))
        .collect();

    // Cohorts own disjoint ranges of both the table and the minima.
    workers.for_each_maprank(aux, |maprank| {
        let class_base = if zero_aware {
            aux.index_offset(&Index {
                pidx: 0,
                maprank,
                eqidx: 0,
            }) / aux.n_perm() as usize
        } else {
            maprank as usize
        };

        let mut idx = Index {
            pidx: 0,
            maprank,
            eqidx: -1,
        };

        for eqidx in 0..aux.eqclass_count(maprank) {
            idx.eqidx = if zero_aware { eqidx as i32 } else { -1 };

            let mut min = UNREACHED;
            for pidx in 0..aux.n_perm() {
                idx.pidx = pidx;
                min = min.min(pdb.lookup(&idx));
            }

            minimums[class_base + eqidx as usize].store(min, Ordering::Relaxed);

            for pidx in 0..aux.n_perm() {
                idx.pidx = pidx;
                let entry = pdb.lookup(&idx);
                if entry != UNREACHED {
                    pdb.update(&idx, entry - min);
                }
            }
        }
    });

    minimums.into_iter().map(AtomicU8::into_inner).collect()
}
