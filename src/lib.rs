//! mpsh - an interpreter for the MPW Shell command language
//!
//! The front end assembles raw input into logical lines, classifies each
//! line's leading keyword, and reduces the classified tokens into a
//! command tree; the engine walks that tree, expanding variables and
//! dispatching builtins or external commands per leaf. See the `parser`
//! and `interpreter` modules for the two halves, and [`shell::Shell`] for
//! the driver that ties them together.

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod shell;
pub mod signal;

pub use shell::{Shell, ShellOptions};
