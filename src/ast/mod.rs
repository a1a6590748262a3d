//! Command tree produced by the grammar parser.

pub mod types;

pub use types::*;
