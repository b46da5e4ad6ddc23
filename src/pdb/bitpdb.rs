//! Defines the [`BitPdb`] type, a pattern database storing one bit per
//! entry.
//!
//! During IDA* we only need to know whether a move brings the pattern
//! closer to the goal or further from it. For a consistent heuristic the
//! distance changes by exactly one per move and its least significant bit
//! is the map parity, which can be computed from the configuration alone.
//! So only the second-least significant bit of each distance needs to be
//! stored, an eightfold saving:
//!
//! ```text
//!     00 -> 01    further        10 -> 11    further
//!     00 -> 11    closer         10 -> 01    closer
//!     01 -> 10    further        11 -> 00    further
//!     01 -> 00    closer         11 -> 10    closer
//! ```
//!
//! The absolute distance of a configuration is recovered by walking
//! closer-moves until the goal pattern is reached. This is slow and only
//! used to seed a search; inside the search only differential lookups
//! happen.
//!
//! This scheme relies on consistency. Identified pattern databases are not
//! consistent; using one as a bitpdb gives undefined results.

use std::io::{Read, Write};

use crate::{
    index::{Index, IndexAux},
    pdb::pattern_db::{PatternDb, PdbError},
    puzzle::{moves::generate_moves, puzzle::Puzzle},
    tileset::tileset::Tileset,
};

/// The zstd level used for `.zst` databases. Higher levels buy little on
/// this data.
const COMPRESSION_LEVEL: i32 = 19;

/// A pattern database holding the second-least significant bit of each
/// distance. Bit `i` of the table lives in byte `i / 8` at position
/// `i % 8`.
pub struct BitPdb {
    aux: IndexAux,
    data: Box<[u8]>,
}

impl BitPdb {
    /// Returns the table size in bytes for `aux`.
    #[must_use]
    pub fn table_size(aux: &IndexAux) -> usize {
        aux.search_space_size().div_ceil(8)
    }

    /// Condenses a full pattern database into a bitpdb. `pdb` must be
    /// freshly generated (consistent), not identified.
    #[must_use]
    pub fn from_pdb(pdb: &PatternDb) -> Self {
        let aux = pdb.aux().clone();
        let mut data = vec![0u8; Self::table_size(&aux)].into_boxed_slice();

        for (i, &entry) in pdb.as_bytes().iter().enumerate() {
            data[i / 8] |= (entry >> 1 & 1) << (i % 8);
        }

        Self { aux, data }
    }

    /// Returns the tile set this database is for.
    #[must_use]
    pub fn tileset(&self) -> Tileset {
        self.aux.tileset()
    }

    /// Returns the index helper for this database's tile set.
    #[must_use]
    pub fn aux(&self) -> &IndexAux {
        &self.aux
    }

    /// Returns the raw table.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Loads a bitpdb for `ts` from `reader`.
    pub fn load<R: Read>(
        ts: Tileset,
        reader: &mut R,
    ) -> Result<Self, PdbError> {
        let aux = IndexAux::new(ts)?;
        let mut data = vec![0u8; Self::table_size(&aux)].into_boxed_slice();
        reader.read_exact(&mut data)?;

        Ok(Self { aux, data })
    }

    /// Writes the table to `writer`.
    pub fn store<W: Write>(&self, writer: &mut W) -> Result<(), PdbError> {
        writer.write_all(&self.data)?;
        writer.flush()?;

        Ok(())
    }

    /// Loads a zstd-compressed bitpdb for `ts` from `reader`.
    pub fn load_compressed<R: Read>(
        ts: Tileset,
        reader: &mut R,
    ) -> Result<Self, PdbError> {
        let aux = IndexAux::new(ts)?;
        let expected = Self::table_size(&aux);

        let data = zstd::decode_all(reader)?;
        if data.len() != expected {
            return Err(PdbError::SizeMismatch {
                expected,
                found: data.len(),
            });
        }

        Ok(Self {
            aux,
            data: data.into_boxed_slice(),
        })
    }

    /// Writes the table to `writer`, zstd compressed.
    pub fn store_compressed<W: Write>(&self, writer: &mut W) -> Result<(), PdbError> {
        let compressed = zstd::encode_all(&self.data[..], COMPRESSION_LEVEL)?;
        writer.write_all(&compressed)?;
        writer.flush()?;

        Ok(())
    }

    /// The map parity of `p` relative to the solved configuration, which
    /// is the least significant bit of its distance.
    fn partial_parity(&self, p: &Puzzle) -> i32 {
        (self.aux.tileset().tile_map(p).parity() ^ self.aux.solved_parity()) as i32
    }

    /// Returns the stored bit for `idx`, shifted to bit 1.
    fn lookup_bit(&self, idx: &Index) -> i32 {
        let offset = self.aux.index_offset(idx);

        i32::from(self.data[offset / 8] >> (offset % 8) & 1) << 1
    }

    fn diff_lookup_idx(&self, p: &Puzzle, old_h: i32, idx: &Index) -> i32 {
        let entry = self.lookup_bit(idx);

        debug_assert_eq!(self.partial_parity(p) ^ old_h & 1, 1);

        // A step closer carries the low bits, so the neighbour one closer
        // has stored bit `bit1(old_h) ^ bit0(old_h) ^ 1`; one further has
        // the complement. Decode which one we are looking at.
        old_h + 1 - ((entry ^ old_h ^ old_h << 1) & 2)
    }

    /// Performs a differential lookup: `old_h` must be the value of a
    /// configuration one move away from `p` (in the quotient graph).
    /// Returns the value of `p`.
    #[must_use]
    pub fn diff_lookup(&self, p: &Puzzle, old_h: i32) -> i32 {
        self.diff_lookup_idx(p, old_h, &self.aux.compute_index(p))
    }

    /// Determines the absolute distance of `p` by walking a shortest path
    /// through the quotient graph to the goal pattern.
    #[must_use]
    pub fn lookup_puzzle(&self, parg: &Puzzle) -> i32 {
        // A multiple of four larger than the diameter of the search
        // space. The differential decode reads the two low bits of the
        // running value, so they are seeded from the configuration's own
        // stored bit and parity.
        const DUMMY_HVAL: i32 = 248;

        let solved = Puzzle::solved();
        let mut p = *parg;
        let mut idx = self.aux.compute_index(&p);
        let initial_h = DUMMY_HVAL | self.lookup_bit(&idx) | self.partial_parity(&p);
        let mut cur_h = initial_h;

        while !self.aux.partially_equal(&p, &solved) {
            let moves = generate_moves(self.aux.eqclass_from_index(&idx));
            debug_assert!(!moves.is_empty());

            let mut descended = false;
            for m in &moves {
                p.apply_move(m.zloc as usize);
                p.apply_move(m.dest as usize);

                idx = self.aux.compute_index(&p);
                let next_h = self.diff_lookup_idx(&p, cur_h, &idx);
                debug_assert_eq!((next_h - cur_h).abs(), 1);

                if next_h < cur_h {
                    cur_h = next_h;
                    descended = true;
                    break;
                }

                p.apply_move(m.zloc as usize);
            }

            debug_assert!(descended, "no progress in bitpdb walk");
            if !descended {
                break;
            }
        }

        initial_h - cur_h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pdb::{generate::generate, parallel::Workers},
        random::random_puzzle,
        tileset::tileset::Tileset,
    };

    fn built(ts: &str) -> (PatternDb, BitPdb) {
        let mut pdb = PatternDb::allocate(ts.parse::<Tileset>().unwrap()).unwrap();
        generate(&mut pdb, &Workers::new(1));
        let bpdb = BitPdb::from_pdb(&pdb);
        (pdb, bpdb)
    }

    #[test]
    fn walk_lookup_agrees_with_the_full_table() {
        let (pdb, bpdb) = built("1,2,3");

        assert_eq!(bpdb.lookup_puzzle(&Puzzle::solved()), 0);

        for _ in 0..100 {
            let p = random_puzzle();
            assert_eq!(bpdb.lookup_puzzle(&p), i32::from(pdb.lookup_puzzle(&p)));
        }
    }

    #[test]
    fn diff_lookup_follows_moves() {
        let (pdb, bpdb) = built("1,2,3");

        for _ in 0..50 {
            let mut p = random_puzzle();
            let mut h = i32::from(pdb.lookup_puzzle(&p));

            // Take a few random moves of the full puzzle; every time the
            // pattern index changes, the differential lookup must track
            // the full table.
            for _ in 0..10 {
                let zloc = p.zero_location();
                let dests = crate::puzzle::moves::moves_from(zloc);
                let dest = dests[0] as usize;

                let before = bpdb.aux().compute_index(&p);
                p.apply_move(dest);
                let after = bpdb.aux().compute_index(&p);

                if before != after {
                    h = bpdb.diff_lookup(&p, h);
                    assert_eq!(h, i32::from(pdb.lookup_puzzle(&p)));
                }
            }
        }
    }

    #[test]
    fn file_round_trips() {
        let ts: Tileset = "1,2,3".parse().unwrap();
        let (_, bpdb) = built("1,2,3");

        let mut plain = Vec::new();
        bpdb.store(&mut plain).unwrap();
        assert_eq!(plain.len(), BitPdb::table_size(bpdb.aux()));
        let reloaded = BitPdb::load(ts, &mut plain.as_slice()).unwrap();
        assert_eq!(reloaded.as_bytes(), bpdb.as_bytes());

        let mut compressed = Vec::new();
        bpdb.store_compressed(&mut compressed).unwrap();
        assert!(compressed.len() < plain.len());
        let reloaded = BitPdb::load_compressed(ts, &mut compressed.as_slice()).unwrap();
        assert_eq!(reloaded.as_bytes(), bpdb.as_bytes());
    }
}
