//! The move graph of the 5x5 tray: a static adjacency table and the
//! enumeration of moves that leave an equivalence class of empty squares.

use arrayvec::ArrayVec;

use crate::{puzzle::puzzle::TILE_COUNT, tileset::tileset::Tileset};

/// All destinations of the empty square for every possible location, up to
/// four per square. Rows with fewer moves are padded with -1.
pub const MOVE_TABLE: [[i8; 4]; TILE_COUNT] = [
    [1, 5, -1, -1],
    [0, 2, 6, -1],
    [1, 3, 7, -1],
    [2, 4, 8, -1],
    [3, 9, -1, -1],
    //
    [0, 6, 10, -1],
    [1, 5, 7, 11],
    [2, 6, 8, 12],
    [3, 7, 9, 13],
    [4, 8, 14, -1],
    //
    [5, 11, 15, -1],
    [6, 10, 12, 16],
    [7, 11, 13, 17],
    [8, 12, 14, 18],
    [9, 13, 19, -1],
    //
    [10, 16, 20, -1],
    [11, 15, 17, 21],
    [12, 16, 18, 22],
    [13, 17, 19, 23],
    [14, 18, 24, -1],
    //
    [15, 21, -1, -1],
    [16, 20, 22, -1],
    [17, 21, 23, -1],
    [18, 22, 24, -1],
    [19, 23, -1, -1],
];

/// The largest number of moves [`generate_moves`] can produce: four per
/// interior square, three per edge square, two per corner.
pub const MAX_MOVES: usize = 4 * 9 + 3 * 12 + 2 * 4;

/// A single move: the empty square at `zloc` swaps with the tile on the
/// adjacent square `dest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub zloc: u8,
    pub dest: u8,
}

/// Returns the number of moves possible when the empty square is at `z`:
/// 2 from a corner, 3 from an edge, 4 from the interior.
#[inline]
#[must_use]
pub fn move_count(z: usize) -> usize {
    // 0xefffee is every square but the corners, 0x0739c0 every square not
    // on the border.
    2 + usize::from(0x00ef_ffee & 1u32 << z != 0) + usize::from(0x0007_39c0 & 1u32 << z != 0)
}

/// Returns the possible destinations from square `z`. Only the first
/// `move_count(z)` entries are valid; the rest are -1.
#[inline]
#[must_use]
pub fn moves_from(z: usize) -> &'static [i8; 4] {
    &MOVE_TABLE[z]
}

/// Computes the index such that `moves_from(a)[move_index(a, b)] == b`.
/// `b` must actually be adjacent to `a`.
#[inline]
#[must_use]
pub fn move_index(a: usize, b: usize) -> usize {
    let row = &MOVE_TABLE[a];
    for (i, &dest) in row.iter().enumerate() {
        if dest == b as i8 {
            return i;
        }
    }

    unreachable!("square {b} is not adjacent to square {a}");
}

/// Generates all moves that lead from a partial configuration whose empty
/// squares form the equivalence class `eq` to a different equivalence
/// class, i.e. all moves that slide a pattern tile into the class.
#[must_use]
pub fn generate_moves(eq: Tileset) -> ArrayVec<Move, MAX_MOVES> {
    let mut moves = ArrayVec::new();

    for zloc in eq.reduce_eqclass() {
        for &dest in moves_from(zloc) {
            if dest == -1 {
                break;
            }

            if !eq.contains(dest as usize) {
                moves.push(Move {
                    zloc: zloc as u8,
                    dest: dest as u8,
                });
            }
        }
    }

    moves
}
