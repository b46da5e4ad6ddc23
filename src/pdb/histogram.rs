//! Distance histograms of pattern databases.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    index::Index,
    pdb::{parallel::Workers, pattern_db::PatternDb},
    puzzle::puzzle::ZERO_TILE,
};

/// The number of histogram buckets, one per possible entry value.
pub const HISTOGRAM_LEN: usize = 256;

/// Counts how many entries of `pdb` hold each distance. If `weighted`,
/// every entry is weighted by the number of squares of its zero tile
/// region, which turns the ZPDB histogram into a histogram over full
/// configurations.
#[must_use]
pub fn histogram(pdb: &PatternDb, workers: &Workers, weighted: bool) -> Vec<u64> {
    let buckets: Vec<AtomicU64> = (0..HISTOGRAM_LEN).map(|_| AtomicU64::new(0)).collect();

    workers.for_each_maprank(pdb.aux(), |maprank| {
        let mut local = [0u64; HISTOGRAM_LEN];
        histogram_cohort(pdb, maprank, weighted, &mut local);

        for (bucket, &count) in buckets.iter().zip(&local) {
            if count != 0 {
                bucket.fetch_add(count, Ordering::Relaxed);
            }
        }
    });

    buckets.into_iter().map(AtomicU64::into_inner).collect()
}

/// Returns the largest distance with a non-zero bucket, i.e. the eccentricity
/// of the goal in the quotient graph.
#[must_use]
pub fn histogram_max(histogram: &[u64]) -> usize {
    histogram
        .iter()
        .rposition(|&count| count != 0)
        .unwrap_or(0)
}

fn histogram_cohort(pdb: &PatternDb, maprank: u32, weighted: bool, local: &mut [u64]) {
    let aux = pdb.aux();
    let zero_aware = pdb.tileset().contains(ZERO_TILE);

    let mut idx = Index {
        pidx: 0,
        maprank,
        eqidx: -1,
    };

    for eqidx in 0..aux.eqclass_count(maprank) {
        idx.eqidx = if zero_aware { eqidx as i32 } else { -1 };

        let weight = if weighted {
            u64::from(aux.eqclass_from_index(&idx).count())
        } else {
            1
        };

        for pidx in 0..aux.n_perm() {
            idx.pidx = pidx;
            local[pdb.lookup(&idx) as usize] += weight;
        }
    }
}
