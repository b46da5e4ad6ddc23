//! Verifies the consistency of a generated pattern database.
//!
//! Three invariants together are necessary and sufficient for a table to be
//! a correct breadth-first labelling of the quotient graph:
//!
//! 1. no entry is [`UNREACHED`],
//! 2. entries of neighbouring configurations differ by at most one,
//! 3. every entry other than the goal has a neighbour one closer to it.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::{
    index::Index,
    pdb::{
        parallel::Workers,
        pattern_db::{PatternDb, UNREACHED},
    },
    puzzle::puzzle::ZERO_TILE,
};

/// Error type for [`verify`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// Returned when at least one entry violates an invariant. The
    /// individual violations are logged as they are found.
    #[error("Inconsistent: pattern database failed verification")]
    Inconsistent,
}

/// Checks every entry of `pdb` against the invariants above.
pub fn verify(pdb: &PatternDb, workers: &Workers) -> Result<(), VerifyError> {
    let failed = AtomicBool::new(false);

    workers.for_each_maprank(pdb.aux(), |maprank| {
        if !verify_cohort(pdb, maprank) {
            failed.store(true, Ordering::Relaxed);
        }
    });

    if failed.into_inner() {
        Err(VerifyError::Inconsistent)
    } else {
        Ok(())
    }
}

fn verify_cohort(pdb: &PatternDb, maprank: u32) -> bool {
    let aux = pdb.aux();
    let zero_aware = pdb.tileset().contains(ZERO_TILE);
    let mut ok = true;

    let mut idx = Index {
        pidx: 0,
        maprank,
        eqidx: -1,
    };

    for eqidx in 0..aux.eqclass_count(maprank) {
        idx.eqidx = if zero_aware { eqidx as i32 } else { -1 };

        for pidx in 0..aux.n_perm() {
            idx.pidx = pidx;
            ok &= verify_entry(pdb, &idx);
        }
    }

    ok
}

fn verify_entry(pdb: &PatternDb, idx: &Index) -> bool {
    let aux = pdb.aux();
    let entry = pdb.lookup(idx);

    if entry == UNREACHED {
        log::warn!("entry {idx} is unreached");
        return false;
    }

    let mut p = aux.invert_index(idx);
    let moves = crate::puzzle::moves::generate_moves(aux.eqclass_from_index(idx));
    let mut progress = false;

    for m in &moves {
        p.apply_move(m.zloc as usize);
        p.apply_move(m.dest as usize);

        let didx = aux.compute_index(&p);
        let dentry = pdb.lookup(&didx);

        p.apply_move(m.zloc as usize);

        if i32::from(entry).abs_diff(i32::from(dentry)) > 1 {
            log::warn!("{idx} -> {didx} with entry {entry} -> {dentry} invalid");
            return false;
        }

        progress |= dentry < entry;
    }

    if !progress && entry != 0 {
        log::warn!("no progress possible from {idx}");
        return false;
    }

    true
}
