//! Pattern databases and optimal solving for the 24-puzzle.
//!
//! The 24-puzzle is the 5x5 member of the sliding-tile puzzle family: 24
//! numbered tiles and one empty square. This crate builds additive disjoint
//! pattern databases (PDBs) by breadth-first search over a perfectly indexed
//! quotient graph and uses them as admissible heuristics in an iterative
//! deepening A* search that finds provably optimal solutions.
//!
//! The main entry points are [`pdb::PatternDb`] for building and storing
//! databases, [`catalogue::Catalogue`] for composing them into a heuristic,
//! and [`search::ida`] for solving instances.

pub mod catalogue;
pub mod fsm;
pub mod index;
pub mod pdb;
pub mod puzzle;
pub mod random;
pub mod search;
pub mod symmetry;
pub mod tileset;
