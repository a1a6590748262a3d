//! Command Tree Types
//!
//! The grammar parser reduces classified line-tokens into this tree; the
//! execution engine walks it. Every node owns its children outright; an
//! If's Else/Else-If arms are an ordered clause vector inside the node.

use std::fmt;

/// Connective between the two sides of a binary command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// `||` — run right only if left failed
    Or,
    /// `&&` — run right only if left succeeded
    And,
    /// `|` — left's stdout becomes right's stdin
    Pipe,
}

impl BinaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Pipe => "|",
        }
    }
}

/// `Begin … End` vs `( … )` — same execution contract, different delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginKind {
    Begin,
    Paren,
}

/// Which keyword opened an If clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    If,
    ElseIf,
    Else,
}

/// Structurally invalid terms: a closer with nothing to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExtraEnd,
    ExtraRParen,
    StrayElse,
}

/// One arm of an If command. `text` is the raw clause line
/// (e.g. `If {x} > 0`), evaluated when the If executes.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub text: String,
    pub body: Vec<Command>,
}

/// A parsed command. Leaf variants store their raw line text; variable
/// expansion and word tokenization happen at execution time, not parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(String),
    Evaluate(String),
    Break(String),
    Continue(String),
    Exit(String),
    Error {
        kind: ErrorKind,
        text: String,
    },
    /// `left || right`, `left && right`, `left | right`. A missing side is
    /// a no-op, never an error.
    Binary {
        kind: BinaryKind,
        left: Option<Box<Command>>,
        right: Option<Box<Command>>,
    },
    /// `Begin … End` or `( … )`. `begin` keeps the opening line, `end` the
    /// closing line (which may carry redirections for the whole block).
    Begin {
        kind: BeginKind,
        begin: String,
        end: String,
        body: Vec<Command>,
    },
    /// `Loop … End` — iterate the body until Break.
    Loop {
        begin: String,
        end: String,
        body: Vec<Command>,
    },
    /// `For name in word… End`.
    For {
        begin: String,
        end: String,
        body: Vec<Command>,
    },
    /// `If … [Else If …]… [Else …] End`. The first clause is always
    /// `ClauseKind::If`.
    If {
        clauses: Vec<Clause>,
        end: String,
    },
}

impl Command {
    /// True for nodes with no compound children. The top-level driver uses
    /// this to suppress the termination diagnostic when the very last
    /// command was itself the terminator.
    pub fn terminal(&self) -> bool {
        match self {
            Command::Simple(_)
            | Command::Evaluate(_)
            | Command::Break(_)
            | Command::Continue(_) => true,
            Command::Binary { left, right, .. } => {
                left.as_deref().map_or(true, Command::terminal)
                    && right.as_deref().map_or(true, Command::terminal)
            }
            _ => false,
        }
    }
}

fn fmt_body(body: &[Command], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for child in body {
        writeln!(f, "{}", child)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    /// Re-serialize the tree in the same shape the echo output uses.
    /// Re-parsing the result yields an equivalent tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Simple(text)
            | Command::Evaluate(text)
            | Command::Break(text)
            | Command::Continue(text)
            | Command::Exit(text)
            | Command::Error { text, .. } => write!(f, "{}", text),
            Command::Binary { kind, left, right } => {
                if let Some(left) = left {
                    write!(f, "{} ", left)?;
                }
                write!(f, "{}", kind.as_str())?;
                if let Some(right) = right {
                    write!(f, " {}", right)?;
                }
                Ok(())
            }
            Command::Begin { begin, end, body, .. }
            | Command::Loop { begin, end, body }
            | Command::For { begin, end, body } => {
                writeln!(f, "{}", begin)?;
                fmt_body(body, f)?;
                write!(f, "{}", end)
            }
            Command::If { clauses, end } => {
                for clause in clauses {
                    writeln!(f, "{}", clause.text)?;
                    fmt_body(&clause.body, f)?;
                }
                write!(f, "{}", end)
            }
        }
    }
}
