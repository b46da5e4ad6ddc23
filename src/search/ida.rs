//! The IDA* search loop.
//!
//! Iterative deepening A*: repeated depth-first searches with a growing
//! bound on `g + h`, where `h` comes from a PDB catalogue and move
//! sequences are additionally pruned by a finite state machine. Each
//! search node keeps its four children's h values and partial value
//! vectors, so descending into a child costs one differential catalogue
//! update rather than a full evaluation.

use crate::{
    catalogue::{Catalogue, PartialHvals},
    fsm::fsm::{Fsm, FsmState},
    puzzle::{moves::moves_from, puzzle::Puzzle},
    search::path::{Path, MAX_PATH_LEN},
};

/// The result of an IDA* search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    /// An optimal solution, or `None` if none was found within the
    /// limit.
    pub path: Option<Path>,
    /// The number of nodes expanded over all rounds.
    pub expanded: u64,
}

/// One entry of the search path. The heavy members describe the node's
/// children: their value vectors, h values, and machine states are
/// computed once when the node is entered and consumed as the children
/// are expanded.
#[derive(Clone, Copy)]
struct SearchNode {
    child_ph: [PartialHvals; 4],
    child_h: [u32; 4],
    child_fsm: [FsmState; 4],
    /// Bitmap of children not yet tried.
    to_expand: u32,
    /// Which child of its parent this node is.
    childno: usize,
    zloc: usize,
    fsm_st: FsmState,
}

impl SearchNode {
    fn blank(zloc: usize) -> Self {
        Self {
            child_ph: [PartialHvals::default(); 4],
            child_h: [0; 4],
            child_fsm: [Fsm::start_state(0); 4],
            to_expand: 0,
            childno: 0,
            zloc,
            fsm_st: Fsm::start_state(zloc),
        }
    }
}

/// Fills in the children of `nodes[at]`: every legal move that does not
/// revisit the parent and does not complete a forbidden sequence gets its
/// h value and partial vector computed from the parent's by one
/// differential update.
fn evaluate_expansions(
    nodes: &mut [SearchNode],
    at: usize,
    p: &mut Puzzle,
    cat: &Catalogue,
    fsm: &Fsm,
) {
    let parent_zloc = nodes[at - 1].zloc;
    let base_ph = nodes[at - 1].child_ph[nodes[at].childno];

    let node = &mut nodes[at];
    node.to_expand = 0;

    for (i, &dest) in moves_from(node.zloc).iter().enumerate() {
        if dest == -1 {
            continue;
        }

        let dest = dest as usize;

        // Never undo the previous move; the dummy node at the start of
        // the path makes this test safe at the root.
        if dest == parent_zloc {
            continue;
        }

        let child_fsm = fsm.advance_idx(node.fsm_st, i);
        if Fsm::is_match(child_fsm) {
            continue;
        }

        node.to_expand |= 1 << i;
        node.child_fsm[i] = child_fsm;

        let tile = p.tile_at(dest) as usize;
        p.apply_move(dest);

        let mut ph = base_ph;
        node.child_h[i] = cat.diff_hvals(&mut ph, p, tile);
        node.child_ph[i] = ph;

        p.apply_move(node.zloc);
    }
}

/// One depth-first round bounded by `bound`. On success stores the
/// solution through `on_solution` and, unless `last_full`, returns
/// immediately. Returns whether a solution was found and the smallest
/// `g + h` that exceeded the bound.
#[allow(clippy::too_many_arguments)]
fn search_to_bound(
    cat: &Catalogue,
    fsm: &Fsm,
    parg: &Puzzle,
    nodes: &mut [SearchNode],
    bound: usize,
    last_full: bool,
    expanded: &mut u64,
    on_solution: &mut dyn FnMut(&Path),
) -> (bool, usize) {
    let solved = Puzzle::solved();
    let mut p = *parg;
    let mut newbound = usize::MAX;
    let mut found = false;

    // The dummy node: it carries the root's value vector in child slot 0
    // and shares the root's zero location so no root move is mistaken
    // for an undo.
    let root_zloc = p.zero_location();
    nodes[0] = SearchNode::blank(root_zloc);
    let mut root_ph = PartialHvals::default();
    let root_h = cat.full_hvals(&mut root_ph, &p);
    nodes[0].child_ph[0] = root_ph;
    nodes[0].child_h[0] = root_h;

    nodes[1] = SearchNode::blank(root_zloc);
    evaluate_expansions(nodes, 1, &mut p, cat, fsm);

    // dist is the depth of the current node; the node lives at
    // nodes[dist + 1] because of the dummy.
    let mut dist: i32 = 0;

    loop {
        let at = (dist + 1) as usize;

        if nodes[at].to_expand == 0 {
            // Out of moves here; retreat.
            dist -= 1;
            if dist < 0 {
                break;
            }

            p.apply_move(nodes[(dist + 1) as usize].zloc);
            continue;
        }

        *expanded += 1;

        let child = nodes[at].to_expand.trailing_zeros() as usize;
        nodes[at].to_expand &= !(1 << child);

        let h = nodes[at].child_h[child] as usize;
        let dloc = moves_from(nodes[at].zloc)[child] as usize;
        let depth = (dist + 1) as usize;

        if h + depth > bound {
            if h + depth < newbound {
                newbound = h + depth;
            }

            continue;
        }

        p.apply_move(dloc);
        dist += 1;

        let fsm_st = nodes[at].child_fsm[child];
        nodes[at + 1].childno = child;
        nodes[at + 1].zloc = dloc;
        nodes[at + 1].fsm_st = fsm_st;
        evaluate_expansions(nodes, at + 1, &mut p, cat, fsm);

        if h == 0 && p == solved {
            let moves = nodes[2..=(dist + 1) as usize]
                .iter()
                .map(|node| node.zloc as u8)
                .collect();
            let path = Path::from_moves(moves);

            log::info!("solution found at depth {dist}");
            on_solution(&path);
            found = true;

            if !last_full {
                return (true, bound);
            }
        }
    }

    (found, newbound)
}

/// Searches for an optimal solution of `p` with IDA*, not exceeding a
/// total path length of `limit`. If `last_full`, the round that finds the
/// first solution is completed in full and `on_solution` is called for
/// every optimal solution encountered; otherwise the search stops at the
/// first one.
pub fn search_ida_bounded(
    cat: &Catalogue,
    fsm: &Fsm,
    p: &Puzzle,
    limit: usize,
    last_full: bool,
    mut on_solution: Option<&mut dyn FnMut(&Path)>,
) -> SearchResult {
    // The main loop cannot represent the empty solution.
    if *p == Puzzle::solved() {
        return SearchResult {
            path: Some(Path::new()),
            expanded: 0,
        };
    }

    let limit = limit.min(MAX_PATH_LEN);
    let mut nodes = vec![SearchNode::blank(0); limit + 3];
    let mut expanded = 0u64;
    let mut bound = 0usize;

    loop {
        let mut best: Option<Path> = None;
        let (found, newbound) = search_to_bound(
            cat,
            fsm,
            p,
            &mut nodes,
            bound,
            last_full,
            &mut expanded,
            &mut |path| {
                if let Some(cb) = on_solution.as_deref_mut() {
                    cb(path);
                }

                if best.is_none() || path.len() < best.as_ref().map_or(usize::MAX, Path::len) {
                    best = Some(path.clone());
                }
            },
        );

        if found {
            log::info!("expanded {expanded} nodes in total");
            return SearchResult {
                path: best,
                expanded,
            };
        }

        log::info!("no solution with bound {bound}, increasing bound to {newbound}");
        debug_assert!(newbound != usize::MAX);

        bound = newbound;
        if bound > limit {
            return SearchResult {
                path: None,
                expanded,
            };
        }
    }
}

/// Like [`search_ida_bounded`] with the largest representable limit.
pub fn search_ida(
    cat: &Catalogue,
    fsm: &Fsm,
    p: &Puzzle,
    on_solution: Option<&mut dyn FnMut(&Path)>,
) -> SearchResult {
    search_ida_bounded(cat, fsm, p, MAX_PATH_LEN, false, on_solution)
}
