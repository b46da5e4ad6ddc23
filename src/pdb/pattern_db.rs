//! Defines the [`PatternDb`] type, a table of distances indexed by the
//! perfect index of a tile set.

use std::{
    fs::File,
    io::{Read, Write},
    sync::atomic::{AtomicU8, Ordering},
};

use memmap2::Mmap;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    index::{Index, IndexAux, IndexError},
    puzzle::puzzle::Puzzle,
    tileset::tileset::Tileset,
};

/// The table entry of a configuration not yet reached by the generating
/// search. No reachable configuration is this far from the goal.
pub const UNREACHED: u8 = 0xff;

/// Error type for pattern database operations.
#[derive(Debug, Error)]
pub enum PdbError {
    /// Returned when the tile set cannot be indexed.
    #[error("IndexError: {0}")]
    IndexError(#[from] IndexError),

    /// Returned when reading, writing, or mapping a database file fails.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// Returned when a file does not have the size the tile set calls for.
    #[error("SizeMismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },
}

enum Storage {
    /// A heap table of atomic bytes, written during generation.
    Ram(Box<[AtomicU8]>),
    /// A read-only file mapping shared between processes.
    Mapped(Mmap),
}

/// A pattern database: one byte per point of the index space of a tile
/// set, holding the distance from that partial configuration to the goal,
/// or [`UNREACHED`].
///
/// Entries are individually atomic with relaxed ordering. During
/// generation multiple workers may store to the same entry concurrently;
/// they only ever store the same value, so the races are benign and the
/// finished table is independent of the number of workers. Outside
/// generation the table is read-only.
pub struct PatternDb {
    aux: IndexAux,
    data: Storage,
}

impl PatternDb {
    /// Allocates a database for `ts` with every entry [`UNREACHED`].
    pub fn allocate(ts: Tileset) -> Result<Self, PdbError> {
        let aux = IndexAux::new(ts)?;
        let size = aux.search_space_size();

        let data = (0..size).map(|_| AtomicU8::new(UNREACHED)).collect();

        Ok(Self {
            aux,
            data: Storage::Ram(data),
        })
    }

    /// Returns the index helper for this database's tile set.
    #[must_use]
    pub fn aux(&self) -> &IndexAux {
        &self.aux
    }

    /// Returns the tile set this database is for.
    #[must_use]
    pub fn tileset(&self) -> Tileset {
        self.aux.tileset()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aux.search_space_size()
    }

    /// Returns whether the database has no entries. A database always has
    /// at least the entry of the empty pattern, so this is never true.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the whole table as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            // SAFETY: AtomicU8 has the same size and alignment as u8, and
            // relaxed byte reads through the plain slice cannot tear.
            Storage::Ram(data) => unsafe {
                std::slice::from_raw_parts(data.as_ptr().cast::<u8>(), data.len())
            },
            Storage::Mapped(map) => map,
        }
    }

    /// Resets every entry to [`UNREACHED`]. Only possible for tables in
    /// RAM.
    pub fn clear(&mut self) {
        match &self.data {
            Storage::Ram(data) => {
                for entry in data.iter() {
                    entry.store(UNREACHED, Ordering::Relaxed);
                }
            }
            Storage::Mapped(_) => unreachable!("cannot clear a mapped database"),
        }
    }

    /// Looks up the entry for `idx`.
    #[inline]
    #[must_use]
    pub fn lookup(&self, idx: &Index) -> u8 {
        let offset = self.aux.index_offset(idx);

        match &self.data {
            Storage::Ram(data) => data[offset].load(Ordering::Relaxed),
            Storage::Mapped(map) => map[offset],
        }
    }

    /// Looks up the distance of configuration `p`.
    #[inline]
    #[must_use]
    pub fn lookup_puzzle(&self, p: &Puzzle) -> u8 {
        self.lookup(&self.aux.compute_index(p))
    }

    /// Unconditionally sets the entry for `idx` with a relaxed store.
    pub(crate) fn update(&self, idx: &Index, dist: u8) {
        let offset = self.aux.index_offset(idx);

        match &self.data {
            Storage::Ram(data) => data[offset].store(dist, Ordering::Relaxed),
            Storage::Mapped(_) => unreachable!("cannot update a mapped database"),
        }
    }

    /// Sets the entry for `idx` to `dist` if it is still [`UNREACHED`].
    /// Returns whether a store was performed.
    ///
    /// This is a relaxed load followed by a relaxed store, not a
    /// compare-and-swap: two workers may both see [`UNREACHED`] and both
    /// store. The generator only ever stores the round number, so such
    /// races converge on the same value.
    #[inline]
    pub(crate) fn conditional_update(&self, idx: &Index, dist: u8) -> bool {
        let offset = self.aux.index_offset(idx);

        match &self.data {
            Storage::Ram(data) => {
                let entry = &data[offset];
                if entry.load(Ordering::Relaxed) == UNREACHED {
                    entry.store(dist, Ordering::Relaxed);
                    true
                } else {
                    false
                }
            }
            Storage::Mapped(_) => unreachable!("cannot update a mapped database"),
        }
    }

    /// Loads a database for `ts` from `reader`. The stream must hold
    /// exactly the table bytes in index order.
    pub fn load<R: Read>(ts: Tileset, reader: &mut R) -> Result<Self, PdbError> {
        let mut pdb = Self::allocate(ts)?;

        {
            let Storage::Ram(data) = &mut pdb.data else {
                unreachable!();
            };

            // SAFETY: we have exclusive access to the freshly allocated
            // table and AtomicU8 is layout-compatible with u8.
            let bytes = unsafe {
                std::slice::from_raw_parts_mut(data.as_mut_ptr().cast::<u8>(), data.len())
            };
            reader.read_exact(bytes)?;
        }

        log::debug!(
            "loaded PDB for {} ({} bytes, xxh3 {:016x})",
            pdb.tileset(),
            pdb.len(),
            xxh3_64(pdb.as_bytes())
        );

        Ok(pdb)
    }

    /// Writes the table bytes to `writer`.
    ///
    /// Must not run concurrently with generation.
    pub fn store<W: Write>(&self, writer: &mut W) -> Result<(), PdbError> {
        let bytes = self.as_bytes();
        writer.write_all(bytes)?;
        writer.flush()?;

        log::debug!(
            "stored PDB for {} ({} bytes, xxh3 {:016x})",
            self.tileset(),
            bytes.len(),
            xxh3_64(bytes)
        );

        Ok(())
    }

    /// Maps a database file read-only. The mapping is shared, so several
    /// processes can search over the same physical pages.
    pub fn mmap(ts: Tileset, file: &File) -> Result<Self, PdbError> {
        let aux = IndexAux::new(ts)?;
        let expected = aux.search_space_size();

        // SAFETY: the mapping is read-only and its length is checked
        // below; the caller keeps the file unmodified while the map is
        // alive, as with any mmapped input.
        let map = unsafe { Mmap::map(file)? };

        if map.len() != expected {
            return Err(PdbError::SizeMismatch {
                expected,
                found: map.len(),
            });
        }

        Ok(Self {
            aux,
            data: Storage::Mapped(map),
        })
    }

    /// Returns whether the table lives in RAM (as opposed to a file
    /// mapping).
    #[must_use]
    pub fn in_ram(&self) -> bool {
        matches!(self.data, Storage::Ram(_))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek as _, SeekFrom};

    use super::*;

    #[test]
    fn allocate_fills_with_unreached() {
        let pdb = PatternDb::allocate("1,2".parse().unwrap()).unwrap();
        assert_eq!(pdb.len(), 600 * 2); // C(25,2) maps, 2! permutations
        assert!(pdb.as_bytes().iter().all(|&b| b == UNREACHED));
    }

    #[test]
    fn store_load_round_trip() {
        let ts: Tileset = "1,2,3".parse().unwrap();
        let pdb = PatternDb::allocate(ts).unwrap();
        pdb.update(
            &Index {
                pidx: 3,
                maprank: 17,
                eqidx: -1,
            },
            42,
        );

        let mut buf = Vec::new();
        pdb.store(&mut buf).unwrap();
        assert_eq!(buf.len(), pdb.len());

        let loaded = PatternDb::load(ts, &mut buf.as_slice()).unwrap();
        assert_eq!(loaded.as_bytes(), pdb.as_bytes());
    }

    #[test]
    fn load_rejects_short_input() {
        let ts: Tileset = "1,2,3".parse().unwrap();
        let buf = vec![0u8; 100];
        assert!(matches!(
            PatternDb::load(ts, &mut buf.as_slice()),
            Err(PdbError::IoError(_))
        ));
    }

    #[test]
    fn mmap_agrees_with_ram() {
        let ts: Tileset = "1,2".parse().unwrap();
        let pdb = PatternDb::allocate(ts).unwrap();
        let idx = Index {
            pidx: 1,
            maprank: 5,
            eqidx: -1,
        };
        pdb.update(&idx, 7);

        let mut file = tempfile::tempfile().unwrap();
        pdb.store(&mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mapped = PatternDb::mmap(ts, &file).unwrap();
        assert!(!mapped.in_ram());
        assert_eq!(mapped.lookup(&idx), 7);
        assert_eq!(mapped.as_bytes(), pdb.as_bytes());
    }

    #[test]
    fn mmap_rejects_wrong_size() {
        let ts: Tileset = "1,2".parse().unwrap();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0u8; 17]).unwrap();
        assert!(matches!(
            PatternDb::mmap(ts, &file),
            Err(PdbError::SizeMismatch { .. })
        ));
    }
}
