//! Generates pattern databases by breadth-first search over the quotient
//! graph of an index.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    index::Index,
    pdb::{parallel::Workers, pattern_db::PatternDb},
    puzzle::{
        moves::generate_moves,
        puzzle::{Puzzle, ZERO_TILE},
    },
    tileset::rank,
};

/// Fills `pdb` with the distance of every partial configuration to the
/// goal. The table is cleared first. Returns the number of rounds, which
/// is one higher than the largest distance in the finished table.
pub fn generate(pdb: &mut PatternDb, workers: &Workers) -> u32 {
    pdb.clear();

    let solved = pdb.aux().compute_index(&Puzzle::solved());
    pdb.update(&solved, 0);

    let pdb: &PatternDb = pdb;
    let mut round = 0u32;
    loop {
        round += 1;

        let count = AtomicUsize::new(0);
        workers.for_each_maprank(pdb.aux(), |maprank| {
            let updated = generate_cohort(pdb, maprank, round);
            if updated != 0 {
                count.fetch_add(updated, Ordering::Relaxed);
            }
        });

        let count = count.into_inner();
        log::info!("round {:3}: {:20} new entries", round, count);

        if count == 0 {
            return round;
        }
    }
}

/// Expands one cohort (all entries of one map rank) in round `round`.
/// Safe to run concurrently with other cohorts of the same round.
fn generate_cohort(pdb: &PatternDb, maprank: u32, round: u32) -> usize {
    let aux = pdb.aux();
    let map = rank::unrank(aux.n_tile() as usize, maprank);

    // Every move flips the parity of the configuration's map, so each
    // round only touches sources in one half of the table.
    if map.parity() ^ aux.solved_parity() == round & 1 {
        return 0;
    }

    let source = (round - 1) as u8;
    let zero_aware = pdb.tileset().contains(ZERO_TILE);
    let mut count = 0;
    let mut idx = Index {
        pidx: 0,
        maprank,
        eqidx: -1,
    };

    let mut p = aux.invert_index_map(&idx);

    for eqidx in 0..aux.eqclass_count(maprank) {
        idx.eqidx = if zero_aware { eqidx as i32 } else { -1 };

        let moves = generate_moves(aux.eqclass_from_index(&idx));

        for pidx in 0..aux.n_perm() {
            idx.pidx = pidx;
            if pdb.lookup(&idx) != source {
                continue;
            }

            aux.invert_index_rest(&mut p, &idx);

            for m in &moves {
                // Teleport the zero tile to the edge of the region, slide
                // the neighbouring pattern tile in, and index the result.
                p.apply_move(m.zloc as usize);
                p.apply_move(m.dest as usize);

                let dist = aux.compute_index(&p);
                if pdb.conditional_update(&dist, round as u8) {
                    count += 1;
                }

                // Swapping the zero tile back restores the pattern tile.
                p.apply_move(m.zloc as usize);
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pdb::pattern_db::UNREACHED,
        tileset::tileset::Tileset,
    };

    fn build(ts: &str, jobs: usize) -> (PatternDb, u32) {
        let mut pdb = PatternDb::allocate(ts.parse::<Tileset>().unwrap()).unwrap();
        let rounds = generate(&mut pdb, &Workers::new(jobs));
        (pdb, rounds)
    }

    #[test]
    fn every_entry_is_reached() {
        for ts in ["1,2,3", "0,1,2"] {
            let (pdb, _) = build(ts, 1);
            assert!(pdb.as_bytes().iter().all(|&b| b != UNREACHED), "{ts}");
        }
    }

    #[test]
    fn solved_configuration_has_distance_zero() {
        let (pdb, _) = build("1,2,3", 1);
        assert_eq!(pdb.lookup_puzzle(&Puzzle::solved()), 0);

        let (zpdb, _) = build("0,1,2", 1);
        assert_eq!(zpdb.lookup_puzzle(&Puzzle::solved()), 0);
    }

    #[test]
    fn rounds_exceed_largest_distance_by_one() {
        let (pdb, rounds) = build("1,2,3", 1);
        let max = pdb.as_bytes().iter().copied().max().unwrap();
        assert_eq!(rounds, u32::from(max) + 1);
    }

    #[test]
    fn single_and_multi_threaded_builds_agree() {
        let (a, _) = build("0,1,5", 1);
        let (b, _) = build("0,1,5", 4);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn distances_lower_bound_the_walk_length() {
        // A random walk of n moves cannot take the pattern further than n
        // from the goal.
        let (pdb, _) = build("1,2,5,6", 1);

        let mut p = Puzzle::solved();
        for (step, dest) in [1usize, 6, 5, 0, 1, 2, 7, 6, 11, 10].into_iter().enumerate() {
            p.apply_move(dest);
            assert!(u32::from(pdb.lookup_puzzle(&p)) <= step as u32 + 1);
        }
    }

    #[test]
    fn single_tile_distances_are_exact() {
        // For a one-tile pattern the distance is how far the tile can be
        // pushed from its home square, which is never more than the tray
        // diameter.
        let (pdb, rounds) = build("24", 1);
        assert!(pdb.as_bytes().iter().all(|&b| b != UNREACHED));
        assert!(rounds <= 10);
    }

    #[test]
    fn morphing_preserves_distances() {
        // The table for a morphed tile set answers morphed queries with
        // the same distances.
        for ts in ["1,2,5", "0,1,2,5"] {
            let (pdb, _) = build(ts, 1);

            for a in 1..crate::symmetry::AUTOMORPHISM_COUNT {
                let morphed_ts = pdb.tileset().morph(a);
                let mut morphed = PatternDb::allocate(morphed_ts).unwrap();
                generate(&mut morphed, &Workers::new(1));

                for _ in 0..100 {
                    let p = crate::random::random_puzzle();
                    let mut q = p;
                    q.morph(a);

                    assert_eq!(
                        pdb.lookup_puzzle(&p),
                        morphed.lookup_puzzle(&q),
                        "tileset {ts}, automorphism {a}"
                    );
                }
            }
        }
    }

    #[test]
    fn empty_pattern_has_a_single_zero_entry() {
        let empty = PatternDb::allocate(Tileset::EMPTY).unwrap();
        assert_eq!(empty.len(), 1);

        let mut pdb = PatternDb::allocate(Tileset::EMPTY).unwrap();
        generate(&mut pdb, &Workers::new(1));
        assert_eq!(pdb.as_bytes(), &[0u8][..]);
    }
}
