//! Pattern database catalogues.
//!
//! A catalogue groups pattern databases into heuristics. The databases of
//! one heuristic have pairwise disjoint tile sets, so their values can be
//! added and the sum stays admissible; the catalogue's value for a
//! configuration is the maximum over its heuristics. A catalogue file is
//! line oriented: every non-blank non-comment line names a tile set and
//! blank lines separate heuristics. The same tile set appearing in
//! several heuristics is backed by one loaded database.

use std::{
    fmt::Write as _,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path as FsPath, PathBuf},
};

use thiserror::Error;

use crate::{
    pdb::{
        generate::generate,
        identify::identify,
        parallel::Workers,
        pattern_db::{PatternDb, PdbError},
    },
    puzzle::puzzle::{Puzzle, ZERO_TILE},
    symmetry,
    tileset::tileset::{ParseTilesetError, Tileset},
};

/// The largest number of databases a catalogue can hold: they must fit a
/// 64-bit selection bitmap.
pub const CATALOGUE_PDBS_LEN: usize = 64;

/// The largest number of heuristics a catalogue can hold.
pub const HEURISTICS_LEN: usize = 64;

/// Error type for [`Catalogue::load`].
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// Returned when the catalogue file cannot be read.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// Returned when a line does not parse as a tile set.
    #[error("BadTileset: line {line}: {source}")]
    BadTileset {
        line: usize,
        source: ParseTilesetError,
    },

    /// Returned when more than [`CATALOGUE_PDBS_LEN`] databases are
    /// named.
    #[error("TooManyPdbs: up to {CATALOGUE_PDBS_LEN} pattern databases are possible")]
    TooManyPdbs,

    /// Returned when more than [`HEURISTICS_LEN`] heuristics are formed.
    #[error("TooManyHeuristics: up to {HEURISTICS_LEN} heuristics are possible")]
    TooManyHeuristics,

    /// Returned when loading or generating a database fails.
    #[error("PdbError: {0}")]
    PdbError(#[from] PdbError),
}

/// One distance heuristic provider: a pattern database, possibly queried
/// through a tray automorphism so that a single database file serves its
/// whole symmetry orbit.
struct Heuristic {
    pdb: PatternDb,
    /// The tile set this heuristic answers for (before morphing).
    ts: Tileset,
    /// The automorphism to apply to configurations before lookup.
    morphism: usize,
}

impl Heuristic {
    fn hval(&self, p: &Puzzle) -> u8 {
        if self.morphism == 0 {
            self.pdb.lookup_puzzle(p)
        } else {
            let mut morphed = *p;
            morphed.morph(self.morphism);
            self.pdb.lookup_puzzle(&morphed)
        }
    }
}

/// The cached per-database values of one configuration. On a move only
/// the databases whose tile set contains the moved tile change, so a
/// neighbour's vector can be updated with a handful of lookups.
#[derive(Clone, Copy, Debug)]
pub struct PartialHvals {
    hvals: [u8; CATALOGUE_PDBS_LEN],
}

impl Default for PartialHvals {
    fn default() -> Self {
        Self {
            hvals: [0; CATALOGUE_PDBS_LEN],
        }
    }
}

/// A catalogue of pattern databases composed into an admissible
/// heuristic.
pub struct Catalogue {
    heus: Vec<Heuristic>,
    /// One bitmap per heuristic selecting the databases that sum into it.
    parts: Vec<u64>,
}

impl Catalogue {
    /// Loads a catalogue from `catfile`. Database files are looked up in
    /// `pdbdir` if given; missing databases are generated with `workers`
    /// and written back to `pdbdir`. With `identify`, zero-aware databases
    /// are collapsed to the additive layout at load or build time and the
    /// `.ipdb` suffix is used.
    pub fn load(
        catfile: &FsPath,
        pdbdir: Option<&FsPath>,
        identify_pdbs: bool,
        workers: &Workers,
    ) -> Result<Self, CatalogueError> {
        log::info!("loading PDB catalogue from {}", catfile.display());

        Self::from_reader(File::open(catfile)?, pdbdir, identify_pdbs, workers)
    }

    /// Like [`Self::load`], reading the catalogue text from `reader`.
    pub fn from_reader<R: Read>(
        reader: R,
        pdbdir: Option<&FsPath>,
        identify_pdbs: bool,
        workers: &Workers,
    ) -> Result<Self, CatalogueError> {
        let mut cat = Self {
            heus: Vec::new(),
            parts: Vec::new(),
        };

        let mut group = Tileset::EMPTY;
        let mut group_parts = 0u64;

        for (lineno, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.starts_with('#') {
                continue;
            }

            if line.is_empty() {
                cat.finish_heuristic(&mut group, &mut group_parts)?;
                continue;
            }

            let ts: Tileset = line.parse().map_err(|source| CatalogueError::BadTileset {
                line: lineno + 1,
                source,
            })?;

            let pdbidx = cat.add_pdb(ts, pdbdir, identify_pdbs, workers)?;

            let loaded_ts = cat.heus[pdbidx].ts;
            if !(group & loaded_ts).remove(ZERO_TILE).is_empty() {
                log::warn!("heuristic {} not admissible", cat.parts.len());
            }

            group = group | loaded_ts;
            group_parts |= 1 << pdbidx;
        }

        cat.finish_heuristic(&mut group, &mut group_parts)?;

        log::info!(
            "loaded {} PDBs and {} heuristics",
            cat.heus.len(),
            cat.parts.len()
        );

        Ok(cat)
    }

    fn finish_heuristic(
        &mut self,
        group: &mut Tileset,
        group_parts: &mut u64,
    ) -> Result<(), CatalogueError> {
        if *group_parts == 0 {
            return Ok(());
        }

        if self.parts.len() >= HEURISTICS_LEN {
            return Err(CatalogueError::TooManyHeuristics);
        }

        if group.add(ZERO_TILE) != Tileset::FULL {
            log::warn!("heuristic {} does not account for all tiles", self.parts.len());
        }

        self.parts.push(*group_parts);
        *group = Tileset::EMPTY;
        *group_parts = 0;

        Ok(())
    }

    /// Loads, finds via morphism, or generates the database for `ts` and
    /// returns its position. A tile set already present is reused.
    fn add_pdb(
        &mut self,
        ts: Tileset,
        pdbdir: Option<&FsPath>,
        identify_pdbs: bool,
        workers: &Workers,
    ) -> Result<usize, CatalogueError> {
        // Identification only differs for zero-aware patterns; the
        // identified database answers for the tile set without the zero
        // tile.
        let identify_pdbs = identify_pdbs && ts.contains(ZERO_TILE);
        let ts = if identify_pdbs {
            ts.remove(ZERO_TILE)
        } else {
            ts
        };

        if let Some(pdbidx) = self.heus.iter().position(|heu| heu.ts == ts) {
            return Ok(pdbidx);
        }

        if self.heus.len() >= CATALOGUE_PDBS_LEN {
            return Err(CatalogueError::TooManyPdbs);
        }

        let suffix = if identify_pdbs { "ipdb" } else { "pdb" };

        if let Some(dir) = pdbdir {
            // The exact file, then the canonical representative of the
            // symmetry orbit.
            if let Some(pdb) = try_mmap(&pdb_path(dir, ts, suffix), ts)? {
                self.heus.push(Heuristic {
                    pdb,
                    ts,
                    morphism: 0,
                });
                return Ok(self.heus.len() - 1);
            }

            let morphism = symmetry::canonical_automorphism(ts);
            if morphism != 0 {
                let canonical = ts.morph(morphism);
                if let Some(pdb) = try_mmap(&pdb_path(dir, canonical, suffix), canonical)? {
                    log::info!("using morphed PDB {} for {}", canonical, ts);
                    self.heus.push(Heuristic { pdb, ts, morphism });
                    return Ok(self.heus.len() - 1);
                }
            }
        }

        log::info!("generating PDB for tileset {ts}");
        let build_ts = if identify_pdbs {
            ts.add(ZERO_TILE)
        } else {
            ts
        };

        let mut pdb = PatternDb::allocate(build_ts)?;
        generate(&mut pdb, workers);
        if identify_pdbs {
            pdb = identify(pdb, workers);
        }

        if let Some(dir) = pdbdir {
            let path = pdb_path(dir, ts, suffix);
            log::info!("storing PDB to {}", path.display());

            match File::create(&path) {
                Ok(mut file) => pdb.store(&mut file)?,
                Err(e) => log::warn!("{}: {e}, continuing anyway", path.display()),
            }
        }

        self.heus.push(Heuristic {
            pdb,
            ts,
            morphism: 0,
        });

        Ok(self.heus.len() - 1)
    }

    /// Returns the number of loaded databases.
    #[must_use]
    pub fn n_pdbs(&self) -> usize {
        self.heus.len()
    }

    /// Returns the number of heuristics.
    #[must_use]
    pub fn n_heuristics(&self) -> usize {
        self.parts.len()
    }

    /// Computes the h value encoded in `ph`: the maximum over all
    /// heuristics of the sum of their selected databases' values.
    #[must_use]
    pub fn ph_hval(&self, ph: &PartialHvals) -> u32 {
        let mut max = 0;

        for &parts in &self.parts {
            let mut sum = 0;
            let mut bits = parts;
            while bits != 0 {
                sum += u32::from(ph.hvals[bits.trailing_zeros() as usize]);
                bits &= bits - 1;
            }

            max = max.max(sum);
        }

        max
    }

    /// Fills `ph` with the values of every database for `p` and returns
    /// the resulting h value.
    pub fn full_hvals(&self, ph: &mut PartialHvals, p: &Puzzle) -> u32 {
        for (i, heu) in self.heus.iter().enumerate() {
            ph.hvals[i] = heu.hval(p);
        }

        self.ph_hval(ph)
    }

    /// Updates `ph`, the value vector of a configuration one move away
    /// from `p`, to describe `p`. Only databases whose tile set contains
    /// the moved tile are looked up again.
    pub fn diff_hvals(&self, ph: &mut PartialHvals, p: &Puzzle, moved_tile: usize) -> u32 {
        for (i, heu) in self.heus.iter().enumerate() {
            if heu.ts.contains(moved_tile) {
                ph.hvals[i] = heu.hval(p);
            }
        }

        self.ph_hval(ph)
    }

    /// Computes the h value of `p` from scratch.
    #[must_use]
    pub fn hval(&self, p: &Puzzle) -> u32 {
        let mut ph = PartialHvals::default();
        self.full_hvals(&mut ph, p)
    }
}

/// Builds `dir/<tilelist>.<suffix>`.
fn pdb_path(dir: &FsPath, ts: Tileset, suffix: &str) -> PathBuf {
    let mut name = ts.to_string();
    let _ = write!(name, ".{suffix}");

    dir.join(name)
}

/// Maps a database file read-only, or returns `None` if it does not
/// exist.
fn try_mmap(path: &FsPath, ts: Tileset) -> Result<Option<PatternDb>, CatalogueError> {
    match File::open(path) {
        Ok(file) => {
            log::info!("loading PDB file {}", path.display());
            Ok(Some(PatternDb::mmap(ts, &file)?))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::random::random_puzzle;

    /// Two heuristics over tiny patterns, with one shared database.
    const CAT: &str = "\
# toy catalogue
1,2
3,4

1,2
6,7
";

    fn toy_catalogue() -> Catalogue {
        Catalogue::from_reader(Cursor::new(CAT), None, false, &Workers::new(1)).unwrap()
    }

    #[test]
    fn shared_tilesets_load_once() {
        let cat = toy_catalogue();
        assert_eq!(cat.n_pdbs(), 3);
        assert_eq!(cat.n_heuristics(), 2);
    }

    #[test]
    fn solved_has_value_zero() {
        let cat = toy_catalogue();
        assert_eq!(cat.hval(&Puzzle::solved()), 0);
    }

    #[test]
    fn hval_is_the_max_of_group_sums() {
        let cat = toy_catalogue();

        let mut p = Puzzle::solved();
        // Move tiles 1 and 6 away from home; group one scores tile 1
        // only, group two scores both.
        p.apply_move(1);
        p.apply_move(6);

        let mut ph = PartialHvals::default();
        let h = cat.full_hvals(&mut ph, &p);
        assert!(h >= 2);
        assert_eq!(h, cat.hval(&p));
    }

    #[test]
    fn diff_hvals_tracks_full_hvals() {
        let cat = toy_catalogue();
        let mut p = random_puzzle();

        let mut ph = PartialHvals::default();
        cat.full_hvals(&mut ph, &p);

        for _ in 0..50 {
            let zloc = p.zero_location();
            let dest = crate::puzzle::moves::moves_from(zloc)[0] as usize;
            let tile = p.tile_at(dest) as usize;

            p.apply_move(dest);
            let diffed = cat.diff_hvals(&mut ph, &p, tile);

            let mut fresh = PartialHvals::default();
            assert_eq!(diffed, cat.full_hvals(&mut fresh, &p));
        }
    }

    #[test]
    fn admissibility_on_short_walks() {
        // The heuristic can never exceed the number of moves taken from
        // the solved configuration.
        let cat = toy_catalogue();

        let mut p = Puzzle::solved();
        let walk: crate::search::path::Path = "1,2,7,6,1,0,5,6".parse().unwrap();
        for (steps, &dest) in walk.moves().iter().enumerate() {
            p.apply_move(dest as usize);
            assert!(cat.hval(&p) <= steps as u32 + 1);
        }
    }

    #[test]
    fn generated_pdbs_are_stored_and_remapped() {
        let dir = tempfile::tempdir().unwrap();
        let workers = Workers::new(1);

        let first =
            Catalogue::from_reader(Cursor::new("1,2\n"), Some(dir.path()), false, &workers)
                .unwrap();
        assert!(dir.path().join("1,2.pdb").exists());

        // A second load maps the stored file and answers identically.
        let second =
            Catalogue::from_reader(Cursor::new("1,2\n"), Some(dir.path()), false, &workers)
                .unwrap();

        for _ in 0..50 {
            let p = random_puzzle();
            assert_eq!(first.hval(&p), second.hval(&p));
        }
    }

    #[test]
    fn morphed_pdb_files_are_found() {
        // Store only the canonical orbit representative on disk, then ask
        // for a morphed tile set: the loader must reuse the file through
        // the automorphism.
        let ts: Tileset = "21,22,23".parse().unwrap();
        let a = crate::symmetry::canonical_automorphism(ts);
        if a == 0 {
            return;
        }

        let canonical = ts.morph(a);
        let dir = tempfile::tempdir().unwrap();
        let workers = Workers::new(1);

        // Seed the directory with the canonical database.
        Catalogue::from_reader(
            Cursor::new(format!("{canonical}\n")),
            Some(dir.path()),
            false,
            &workers,
        )
        .unwrap();

        let via_morph =
            Catalogue::from_reader(Cursor::new(format!("{ts}\n")), Some(dir.path()), false, &workers)
                .unwrap();

        // The direct (generated, unmorphed) catalogue gives the ground
        // truth.
        let direct =
            Catalogue::from_reader(Cursor::new(format!("{ts}\n")), None, false, &workers).unwrap();

        assert!(!dir.path().join(format!("{ts}.pdb")).exists());
        for _ in 0..50 {
            let p = random_puzzle();
            assert_eq!(via_morph.hval(&p), direct.hval(&p));
        }
    }

    #[test]
    fn bad_catalogues_are_rejected() {
        let workers = Workers::new(1);
        assert!(matches!(
            Catalogue::from_reader(Cursor::new("1,2\nnonsense\n"), None, false, &workers),
            Err(CatalogueError::BadTileset { line: 2, .. })
        ));
    }
}
