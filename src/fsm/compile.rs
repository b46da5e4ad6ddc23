//! Compiles finite state machines from half-loop lists.
//!
//! A half-loop is a move sequence that returns the empty square to its
//! starting point without making progress; of each pair of equivalent
//! sequences only one needs to be searched, so the other is forbidden.
//! The loops are inserted into one trie per starting square; afterwards
//! every edge that falls out of the trie is patched to point at the state
//! of the longest proper suffix of the path that is still a valid prefix,
//! so a search can feed moves to the machine one at a time and never back
//! up.

use std::io::BufRead;

use thiserror::Error;

use crate::{
    fsm::fsm::{Fsm, FsmState},
    puzzle::{
        moves::{move_count, move_index, moves_from},
        puzzle::TILE_COUNT,
    },
    search::path::{ParsePathError, Path, MAX_PATH_LEN},
};

/// Error type for [`compile`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// Returned when reading the loop file fails.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// Returned when a line of the loop file does not parse as a path.
    #[error("BadPath: line {line}: {source}")]
    BadPath {
        line: usize,
        source: ParsePathError,
    },

    /// Returned when a loop shorter than two moves is given.
    #[error("TooShort: line {0}: loops must have at least two moves")]
    TooShort(usize),

    /// Returned when a loop is a prefix of another loop (or vice versa),
    /// which would make one of them unmatchable.
    #[error("PrefixConflict: line {0}: loop conflicts with an earlier entry")]
    PrefixConflict(usize),

    /// Returned when a state table exceeds the format's limit.
    #[error("TableFull: square {0} has too many states")]
    TableFull(usize),
}

/// Builds a machine from a loop file: one half-loop per line, spelled as a
/// comma-separated square list. Text after the first whitespace on a line
/// is ignored, as are empty lines. The resulting machine matches exactly
/// the listed sequences, with suffix links for missed matches.
pub fn compile<R: BufRead>(reader: R) -> Result<Fsm, CompileError> {
    let mut fsm = Fsm {
        tables: std::array::from_fn(|_| vec![[Fsm::UNASSIGNED; 4]]),
        moribund: std::array::from_fn(|_| Vec::new()),
    };

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = lineno + 1;

        let Some(token) = line.split_whitespace().next() else {
            continue;
        };

        let path: Path = token
            .parse()
            .map_err(|source| CompileError::BadPath { line: lineno, source })?;

        add_loop(&mut fsm, &path, lineno)?;
    }

    for sq in 0..TILE_COUNT {
        fsm.moribund[sq] = vec![0xff; fsm.tables[sq].len()];
    }

    add_back_edges(&mut fsm);

    Ok(fsm)
}

/// Appends a fresh state to the table for `sq` and returns its offset.
fn add_state(fsm: &mut Fsm, sq: usize) -> Result<u32, CompileError> {
    let table = &mut fsm.tables[sq];
    if table.len() as u32 >= Fsm::MAX_LEN {
        return Err(CompileError::TableFull(sq));
    }

    table.push([Fsm::UNASSIGNED; 4]);

    Ok(table.len() as u32 - 1)
}

/// Traces the first `n` moves of `path` through the trie, adding states as
/// needed, and returns the resulting state.
fn trace_path(fsm: &mut Fsm, path: &Path, n: usize, lineno: usize) -> Result<FsmState, CompileError> {
    let moves = path.moves();
    let mut st = Fsm::start_state(moves[0] as usize);

    for &dest in &moves[1..n] {
        let i = move_index(st.zloc as usize, dest as usize);
        let entry = fsm.tables[st.zloc as usize][st.state as usize][i];

        let next = match entry {
            Fsm::UNASSIGNED => {
                let new = add_state(fsm, dest as usize)?;
                fsm.tables[st.zloc as usize][st.state as usize][i] = new;
                new
            }
            Fsm::MATCH => return Err(CompileError::PrefixConflict(lineno)),
            state => state,
        };

        st = FsmState {
            zloc: u32::from(dest),
            state: next,
        };
    }

    Ok(st)
}

/// Inserts one half-loop into the trie, its last move becoming a match
/// edge.
fn add_loop(fsm: &mut Fsm, path: &Path, lineno: usize) -> Result<(), CompileError> {
    let moves = path.moves();
    if moves.len() < 2 {
        return Err(CompileError::TooShort(lineno));
    }

    let st = trace_path(fsm, path, moves.len() - 1, lineno)?;
    let last = moves[moves.len() - 1] as usize;
    let i = move_index(st.zloc as usize, last);
    let entry = &mut fsm.tables[st.zloc as usize][st.state as usize][i];

    if *entry != Fsm::UNASSIGNED {
        return Err(CompileError::PrefixConflict(lineno));
    }

    *entry = Fsm::MATCH;

    Ok(())
}

/// Finds the state of the longest proper suffix of `path` that is a
/// valid prefix in the trie. Falls back to the start state of the last
/// square, so it always succeeds.
fn longest_prefix(fsm: &Fsm, path: &[u8]) -> u32 {
    'suffix: for start in 1..path.len() {
        let mut st = Fsm::start_state(path[start] as usize);

        for &dest in &path[start + 1..] {
            debug_assert!(st.state < Fsm::MAX_LEN);
            st = fsm.advance(st, dest as usize);
            if st.state == Fsm::UNASSIGNED || st.state >= Fsm::MAX_LEN {
                continue 'suffix;
            }
        }

        return st.state;
    }

    unreachable!("the one-square suffix is always a prefix");
}

/// Augments the trie with edges for missed matches. Every transition that
/// would leave the trie is redirected to the longest proper suffix of the
/// path taken so far that is still a valid prefix.
fn add_back_edges(fsm: &mut Fsm) {
    // One bit per table entry; set for edges already handled. Unassigned
    // edges start out marked so the traversal does not follow them.
    let mut handled: [Vec<u8>; TILE_COUNT] = std::array::from_fn(|sq| {
        let mut bits = vec![0u8; fsm.tables[sq].len().div_ceil(2)];
        for (j, row) in fsm.tables[sq].iter().enumerate() {
            for (i, &entry) in row.iter().enumerate() {
                if entry == Fsm::UNASSIGNED {
                    let bit = 4 * j + i;
                    bits[bit / 8] |= 1 << (bit % 8);
                }
            }
        }

        bits
    });

    for sq in 0..TILE_COUNT {
        let mut path = Vec::with_capacity(MAX_PATH_LEN);
        path.push(sq as u8);
        traverse_trie(fsm, &mut handled, Fsm::start_state(sq), &mut path);
    }
}

/// Depth-first traversal of the trie assigning back edges. `path` records
/// the squares visited from the root.
fn traverse_trie(
    fsm: &mut Fsm,
    handled: &mut [Vec<u8>; TILE_COUNT],
    st: FsmState,
    path: &mut Vec<u8>,
) {
    if st.state >= Fsm::MAX_LEN {
        return;
    }

    let zloc = st.zloc as usize;
    for i in 0..move_count(zloc) {
        let dest = moves_from(zloc)[i] as u8;
        path.push(dest);

        let bit = 4 * st.state as usize + i;
        let seen = handled[zloc][bit / 8] & 1 << (bit % 8) != 0;
        let entry = fsm.tables[zloc][st.state as usize][i];

        if !seen {
            handled[zloc][bit / 8] |= 1 << (bit % 8);
            traverse_trie(
                fsm,
                handled,
                FsmState {
                    zloc: u32::from(dest),
                    state: entry,
                },
                path,
            );
        } else if entry == Fsm::UNASSIGNED {
            let target = longest_prefix(fsm, path);
            fsm.tables[zloc][st.state as usize][i] = target;
        }

        path.pop();
    }
}

/// Fills in the moribundness tables of `fsm`: for every state, the length
/// of the longest move chain from it that avoids a match, saturated
/// at 255. States that can walk forever stay at 255. Computed by marking
/// states of moribundness k in pass k, until no pass changes anything.
pub fn add_moribund(fsm: &mut Fsm) {
    for (sq, table) in fsm.moribund.iter_mut().enumerate() {
        *table = vec![0xff; fsm.tables[sq].len()];
    }

    let mut round = 1u32;
    loop {
        let mut count = 0usize;

        for zloc in 0..TILE_COUNT {
            for state in 0..fsm.tables[zloc].len() as u32 {
                let st = FsmState {
                    zloc: zloc as u32,
                    state,
                };

                let m = moribundness_number(fsm, st);
                if m == round {
                    fsm.moribund[zloc][state as usize] = m.min(0xff) as u8;
                    count += 1;
                }
            }
        }

        log::debug!("moribund round {round}: {count} states");

        if count == 0 {
            return;
        }

        round += 1;
    }
}

/// The moribundness a state should have: one higher than the largest
/// moribundness among its successors.
fn moribundness_number(fsm: &Fsm, st: FsmState) -> u32 {
    let mut m = 0;

    for i in 0..move_count(st.zloc as usize) {
        let next = fsm.advance_idx(st, i);
        let m_i = 1 + u32::from(fsm.moribundness(next));
        m = m.max(m_i);
    }

    m.min(0xff)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// All loops of length two starting anywhere: the compiled machine
    /// must behave like [`Fsm::simple`].
    fn two_loops() -> String {
        let mut lines = String::new();
        for sq in 0..TILE_COUNT {
            for &dest in moves_from(sq) {
                if dest != -1 {
                    lines.push_str(&format!("{sq},{dest},{sq}\n"));
                }
            }
        }

        lines
    }

    #[test]
    fn compiled_two_loops_match_the_simple_machine() {
        let compiled = compile(Cursor::new(two_loops())).unwrap();
        let simple = Fsm::simple();

        // Drive both machines through every three-move sequence and
        // compare their verdicts.
        for a in 0..TILE_COUNT {
            for &b in moves_from(a) {
                if b == -1 {
                    continue;
                }

                for &c in moves_from(b as usize) {
                    if c == -1 {
                        continue;
                    }

                    let go = |fsm: &Fsm| {
                        let st = fsm.advance(Fsm::start_state(a), b as usize);
                        Fsm::is_match(fsm.advance(st, c as usize))
                    };

                    assert_eq!(go(&compiled), go(simple), "{a},{b},{c}");
                }
            }
        }
    }

    #[test]
    fn back_edges_keep_matching_after_a_miss() {
        // Forbid the four-move loop around the top-left cell.
        let fsm = compile(Cursor::new("0,1,6,5,0\n")).unwrap();

        let mut st = Fsm::start_state(0);
        for dest in [1usize, 6, 5] {
            st = fsm.advance(st, dest);
            assert!(!Fsm::is_match(st));
        }

        assert!(Fsm::is_match(fsm.advance(st, 0)));

        // A prefix that diverges and re-enters: 5,0,1,6,5,0 must still
        // match on its suffix 0,1,6,5,0.
        let mut st = Fsm::start_state(5);
        for dest in [0usize, 1, 6, 5] {
            st = fsm.advance(st, dest);
            assert!(!Fsm::is_match(st), "at {dest}");
        }

        assert!(Fsm::is_match(fsm.advance(st, 0)));
    }

    #[test]
    fn prefix_conflicts_are_rejected() {
        assert!(matches!(
            compile(Cursor::new("0,1,0\n0,1,0,5,0\n")),
            Err(CompileError::PrefixConflict(2))
        ));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            compile(Cursor::new("0,99,0\n")),
            Err(CompileError::BadPath { line: 1, .. })
        ));
        assert!(matches!(
            compile(Cursor::new("7\n")),
            Err(CompileError::TooShort(1))
        ));
    }

    #[test]
    fn moribundness_reaches_a_fixpoint() {
        let mut fsm = compile(Cursor::new(two_loops())).unwrap();
        add_moribund(&mut fsm);

        // Length-two loops never trap the machine, so every state can
        // walk forever.
        for sq in 0..TILE_COUNT {
            assert_eq!(fsm.moribundness(Fsm::start_state(sq)), 0xff);
        }

        // Match states report zero.
        let st = fsm.advance(Fsm::start_state(0), 1);
        let matched = fsm.advance(st, 0);
        assert_eq!(fsm.moribundness(matched), 0);
    }
}
