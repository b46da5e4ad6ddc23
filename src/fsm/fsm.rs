//! Defines the [`Fsm`] type, a deterministic machine over move sequences.
//!
//! The machine is a set of transition tables, one per location of the
//! empty square. Each state has one outgoing edge per move direction; an
//! edge either continues to a state in the destination square's table or
//! is the special entry [`Fsm::MATCH`], meaning the move sequence just
//! performed is forbidden and the search must prune. After trie
//! construction, edges that fall out of the trie are patched to the state
//! of the longest proper suffix still in it, so matching never needs to
//! back up.

use std::io::{Read, Seek, SeekFrom, Write};

use arrayvec::ArrayVec;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::puzzle::{
    moves::{move_count, move_index, moves_from},
    puzzle::TILE_COUNT,
};

/// Error type for FSM I/O.
#[derive(Debug, Error)]
pub enum FsmError {
    /// Returned when reading or writing a machine file fails.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// Returned when a machine file is structurally impossible.
    #[error("InvalidFile: {0}")]
    InvalidFile(&'static str),
}

/// The size in bytes of the plain file header: 25 table offsets (u64)
/// followed by 25 table lengths (u32).
const HEADER_LEN: u64 = (8 + 4) * TILE_COUNT as u64;

/// The size in bytes of the extended header, which also holds 25 offsets
/// of moribundness tables. A file whose table offsets all point past this
/// header is taken to contain moribundness tables; the format has no
/// version field.
const EXT_HEADER_LEN: u64 = HEADER_LEN + 8 * TILE_COUNT as u64;

/// A state of the machine: the empty square's location and an offset into
/// that square's transition table. Treated as a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FsmState {
    pub zloc: u32,
    pub state: u32,
}

/// A finite state machine recognizing forbidden move sequences.
#[derive(Clone, Debug)]
pub struct Fsm {
    pub(crate) tables: [Vec<[u32; 4]>; TILE_COUNT],
    pub(crate) moribund: [Vec<u8>; TILE_COUNT],
}

impl Fsm {
    /// The initial state offset in every table.
    pub const BEGIN: u32 = 0;

    /// The largest usable state offset. Entries above this are special.
    pub const MAX_LEN: u32 = 0xffff_fff0;

    /// The table entry of a transition that completes a forbidden
    /// sequence.
    pub const MATCH: u32 = 0xffff_fffe;

    /// The table entry of a transition that has not been assigned yet.
    /// Only seen during construction.
    pub const UNASSIGNED: u32 = 0xffff_ffff;

    /// Returns the start state for an empty square at `zloc`.
    #[inline]
    #[must_use]
    pub fn start_state(zloc: usize) -> FsmState {
        FsmState {
            zloc: zloc as u32,
            state: Self::BEGIN,
        }
    }

    /// Returns whether `st` is the match state.
    #[inline]
    #[must_use]
    pub fn is_match(st: FsmState) -> bool {
        st.state == Self::MATCH
    }

    /// Advances `st` by moving the empty square to `newzloc`.
    #[inline]
    #[must_use]
    pub fn advance(&self, st: FsmState, newzloc: usize) -> FsmState {
        self.advance_idx(st, move_index(st.zloc as usize, newzloc))
    }

    /// Advances `st` by move index `i` as given by
    /// [`moves_from`]`(st.zloc)`. Faster than [`Self::advance`] when the
    /// index is already known.
    #[inline]
    #[must_use]
    pub fn advance_idx(&self, st: FsmState, i: usize) -> FsmState {
        FsmState {
            state: self.tables[st.zloc as usize][st.state as usize][i],
            zloc: moves_from(st.zloc as usize)[i] as u32,
        }
    }

    /// Returns the moribundness number of `st`: the length of the longest
    /// chain of moves from here that avoids a match, saturated at 255.
    /// A match state has moribundness 0. Machines without moribundness
    /// tables report 255 everywhere.
    #[must_use]
    pub fn moribundness(&self, st: FsmState) -> u8 {
        if Self::is_match(st) {
            0
        } else {
            self.moribund[st.zloc as usize][st.state as usize]
        }
    }

    /// Returns the moves allowed from `st`, i.e. those that do not
    /// complete a forbidden sequence.
    #[must_use]
    pub fn allowed_moves(&self, st: FsmState) -> ArrayVec<u8, 4> {
        let zloc = st.zloc as usize;
        let mut moves = ArrayVec::new();

        for i in 0..move_count(zloc) {
            if self.tables[zloc][st.state as usize][i] != Self::MATCH {
                moves.push(moves_from(zloc)[i] as u8);
            }
        }

        moves
    }

    /// Returns the total number of states over all tables.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.tables.iter().map(Vec::len).sum()
    }

    /// Returns whether the machine carries real moribundness tables.
    #[must_use]
    pub fn has_moribund(&self) -> bool {
        self.moribund
            .iter()
            .any(|table| table.iter().any(|&m| m != 0xff))
    }

    /// A machine that never matches: no pruning at all.
    #[must_use]
    pub fn dummy() -> &'static Self {
        static DUMMY: Lazy<Fsm> = Lazy::new(|| {
            let tables = std::array::from_fn(|_| vec![[Fsm::BEGIN; 4]]);
            let moribund = std::array::from_fn(|_| vec![0xff]);

            Fsm { tables, moribund }
        });

        &DUMMY
    }

    /// A machine that matches loops of length two, i.e. forbids moving
    /// the empty square straight back to where it just came from.
    #[must_use]
    pub fn simple() -> &'static Self {
        static SIMPLE: Lazy<Fsm> = Lazy::new(|| {
            // State 0 of square d is the start state; state 1 + j means
            // the empty square arrived at d from its j-th neighbour.
            let tables = std::array::from_fn(|d| {
                let n_states = 1 + move_count(d);
                let mut table = vec![[Fsm::UNASSIGNED; 4]; n_states];

                for (s, row) in table.iter_mut().enumerate() {
                    for (i, entry) in row.iter_mut().enumerate().take(move_count(d)) {
                        let dest = moves_from(d)[i] as usize;
                        *entry = if s > 0 && i == s - 1 {
                            Fsm::MATCH
                        } else {
                            1 + move_index(dest, d) as u32
                        };
                    }
                }

                table
            });

            let moribund = std::array::from_fn(|d| vec![0xff; 1 + move_count(d)]);

            Fsm { tables, moribund }
        });

        &SIMPLE
    }

    /// Loads a machine from `reader`. The presence of moribundness tables
    /// is inferred from the header as described in the module
    /// documentation.
    pub fn load<R: Read + Seek>(reader: &mut R) -> Result<Self, FsmError> {
        reader.seek(SeekFrom::Start(0))?;

        let mut offsets = [0u64; TILE_COUNT];
        let mut lengths = [0u32; TILE_COUNT];
        let mut buf8 = [0u8; 8];
        let mut buf4 = [0u8; 4];

        for offset in &mut offsets {
            reader.read_exact(&mut buf8)?;
            *offset = u64::from_le_bytes(buf8);
        }

        for length in &mut lengths {
            reader.read_exact(&mut buf4)?;
            *length = u32::from_le_bytes(buf4);
        }

        if lengths.iter().any(|&len| len == 0 || len > Self::MAX_LEN) {
            return Err(FsmError::InvalidFile("impossible table length"));
        }

        let moribund_present = offsets.iter().all(|&o| o >= EXT_HEADER_LEN);
        let mut moribund_offsets = [0u64; TILE_COUNT];
        if moribund_present {
            reader.seek(SeekFrom::Start(HEADER_LEN))?;
            for offset in &mut moribund_offsets {
                reader.read_exact(&mut buf8)?;
                *offset = u64::from_le_bytes(buf8);
            }
        }

        let mut tables: [Vec<[u32; 4]>; TILE_COUNT] = std::array::from_fn(|_| Vec::new());
        for (sq, table) in tables.iter_mut().enumerate() {
            reader.seek(SeekFrom::Start(offsets[sq]))?;

            let mut row_buf = [0u8; 16];
            table.reserve_exact(lengths[sq] as usize);
            for _ in 0..lengths[sq] {
                reader.read_exact(&mut row_buf)?;
                let mut row = [0u32; 4];
                for (entry, chunk) in row.iter_mut().zip(row_buf.chunks_exact(4)) {
                    *entry = u32::from_le_bytes(chunk.try_into().unwrap());
                }

                table.push(row);
            }
        }

        let mut moribund: [Vec<u8>; TILE_COUNT] = std::array::from_fn(|_| Vec::new());
        for (sq, table) in moribund.iter_mut().enumerate() {
            if moribund_present {
                reader.seek(SeekFrom::Start(moribund_offsets[sq]))?;
                let mut data = vec![0u8; lengths[sq] as usize];
                reader.read_exact(&mut data)?;
                *table = data;
            } else {
                *table = vec![0xff; lengths[sq] as usize];
            }
        }

        Ok(Self { tables, moribund })
    }

    /// Writes the machine to `writer`. If `with_moribund`, the extended
    /// header and the moribundness tables are written too.
    pub fn write<W: Write>(&self, writer: &mut W, with_moribund: bool) -> Result<(), FsmError> {
        let header_len = if with_moribund {
            EXT_HEADER_LEN
        } else {
            HEADER_LEN
        };

        let mut offsets = [0u64; TILE_COUNT];
        let mut offset = header_len;
        for (sq, entry) in offsets.iter_mut().enumerate() {
            *entry = offset;
            offset += 16 * self.tables[sq].len() as u64;
        }

        let mut moribund_offsets = [0u64; TILE_COUNT];
        if with_moribund {
            for (sq, entry) in moribund_offsets.iter_mut().enumerate() {
                *entry = offset;
                offset += self.moribund[sq].len() as u64;
            }
        }

        for &o in &offsets {
            writer.write_all(&o.to_le_bytes())?;
        }

        for table in &self.tables {
            writer.write_all(&(table.len() as u32).to_le_bytes())?;
        }

        if with_moribund {
            for &o in &moribund_offsets {
                writer.write_all(&o.to_le_bytes())?;
            }
        }

        for table in &self.tables {
            for row in table {
                for &entry in row {
                    writer.write_all(&entry.to_le_bytes())?;
                }
            }
        }

        if with_moribund {
            for table in &self.moribund {
                writer.write_all(table)?;
            }
        }

        writer.flush()?;

        Ok(())
    }
}
