//! Finite state machines over move sequences, used to prune search paths
//! that provably cannot be part of an optimal solution.

pub mod compile;
pub mod fsm;

pub use self::fsm::{Fsm, FsmError, FsmState};
