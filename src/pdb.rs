//! Pattern databases: building, storing, transforming, and querying tables
//! of distances from partial puzzle configurations to the goal.

pub mod bitpdb;
pub mod diffcode;
pub mod generate;
pub mod histogram;
pub mod identify;
pub mod parallel;
pub mod pattern_db;
pub mod verify;

pub use self::{
    parallel::Workers,
    pattern_db::{PatternDb, PdbError, UNREACHED},
};
