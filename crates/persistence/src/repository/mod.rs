//! Repository implementations for database operations

pub mod history;
pub mod results;

pub use history::*;
pub use results::*;
