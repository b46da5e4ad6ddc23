//! Finding optimal solutions: move sequences and the IDA* search loop.

pub mod ida;
pub mod path;

pub use self::{
    ida::{search_ida, search_ida_bounded, SearchResult},
    path::Path,
};
