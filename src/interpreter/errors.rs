//! Control Signals and Shell Errors
//!
//! Two distinct failure channels run through the execution engine:
//!
//! - [`ControlSignal`] — non-status outcomes (Break, Continue, Exit,
//!   Interrupted) that unwind through any number of execution frames.
//!   They are carried in the error position of `Result` so intermediate
//!   nodes propagate them with `?` instead of checking flags.
//! - [`ShellError`] — user-visible errors from tokenization, redirection,
//!   and command resolution. These are caught at the smallest enclosing
//!   statement, reported, and converted into a status code.

use thiserror::Error;

/// A non-local control transfer. Ordinary completion is a plain `i32`
/// status in the `Ok` position; these unwind the tree instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Terminate the nearest enclosing Loop/For.
    Break,
    /// Skip to the next iteration of the nearest enclosing Loop/For.
    Continue,
    /// Terminate execution of input, carrying the final status.
    Exit(i32),
    /// Ctrl-C was delivered; unwinds to the top-level driver.
    Interrupted,
}

impl ControlSignal {
    /// The status the top level records when this signal reaches it.
    pub fn status(&self) -> i32 {
        match self {
            ControlSignal::Exit(status) => *status,
            ControlSignal::Interrupted => -9,
            // Break/Continue outside a loop are rejected before they can
            // unwind this far
            ControlSignal::Break | ControlSignal::Continue => -3,
        }
    }
}

/// User-visible errors with their MPW diagnostic text. `status()` gives
/// the code written to `{Status}` when the error is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    #[error("### MPW Shell - 's must occur in pairs.")]
    UnterminatedSingle,
    #[error("### MPW Shell - \"s must occur in pairs.")]
    UnterminatedDouble,
    #[error("### MPW Shell - `s must occur in pairs.")]
    UnterminatedBacktick,
    #[error("### MPW Shell - {{s must occur in pairs.")]
    UnterminatedBrace,
    #[error("### MPW Shell - Missing file name.")]
    MissingFileName,
    #[error("### MPW Shell - Unable to open \"{0}\".")]
    OpenFailed(String),
    #[error("### MPW Shell - Command \"{0}\" was not found.")]
    CommandNotFound(String),
    #[error("### MPW Shell - Unable to start \"{0}\".")]
    SpawnFailed(String),
    #[error("### MPW Shell - Unable to create a temporary file.")]
    TempFileFailed,
}

impl ShellError {
    pub fn status(&self) -> i32 {
        match self {
            // resolution errors
            ShellError::OpenFailed(_)
            | ShellError::CommandNotFound(_)
            | ShellError::SpawnFailed(_)
            | ShellError::TempFileFailed => -1,
            // tokenization errors
            _ => -4,
        }
    }
}

/// Failure channel for variable/command substitution: either a reportable
/// shell error or a control signal raised by a substituted command.
#[derive(Debug)]
pub enum ExpandError {
    Shell(ShellError),
    Signal(ControlSignal),
}

impl From<ShellError> for ExpandError {
    fn from(e: ShellError) -> Self {
        ExpandError::Shell(e)
    }
}

impl From<ControlSignal> for ExpandError {
    fn from(s: ControlSignal) -> Self {
        ExpandError::Signal(s)
    }
}
