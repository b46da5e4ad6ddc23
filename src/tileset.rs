//! Sets of tiles (or of grid squares) represented as 25-bit masks, and the
//! combinatorial ranking scheme used to index them.

pub mod rank;
pub mod tileset;
