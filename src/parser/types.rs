//! Parser Types and Constants
//!
//! Shared token types and special characters used across the front-end
//! pipeline (line assembler → classifier → grammar parser).
//!
//! The MPW control characters are fixed MacRoman code points; the
//! transcoding layer that turns MacRoman bytes into text is outside this
//! crate, so they appear here as the corresponding Unicode characters.

/// `∂` (MacRoman 0xB6). Always defers interpretation of the following
/// character; before a newline it continues the logical line.
pub const ESCAPE: char = '∂';

/// `∑` (MacRoman 0xB7) — redirect stdout and stderr together; the doubled
/// form appends.
pub const REDIRECT_BOTH: char = '∑';

/// `≥` (MacRoman 0xB3) — redirect stderr only in command context (doubled
/// form appends); the `>=` operator in expression context.
pub const REDIRECT_ERR: char = '≥';

/// `≤` (MacRoman 0xB2) — the `<=` operator in expression context.
pub const LESS_EQUAL: char = '≤';

/// `≠` (MacRoman 0xAD) — the `!=` operator in expression context.
pub const NOT_EQUAL: char = '≠';

/// Token kinds produced by the line classifier, one logical line yielding
/// one or more tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Anything that is not a keyword or operator
    Command,
    If,
    ElseIf,
    Else,
    End,
    Begin,
    Loop,
    For,
    Evaluate,
    Break,
    Continue,
    Exit,
    /// `;`
    Semi,
    /// end of a logical line
    Newline,
    /// `(` at command position
    LParen,
    /// `)`, text carries any trailing redirections
    RParen,
    /// `||`
    OrOr,
    /// `&&`
    AndAnd,
    /// `|`
    Pipe,
    /// end of input
    Eof,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::If => "IF",
            Self::ElseIf => "ELSE IF",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Begin => "BEGIN",
            Self::Loop => "LOOP",
            Self::For => "FOR",
            Self::Evaluate => "EVALUATE",
            Self::Break => "BREAK",
            Self::Continue => "CONTINUE",
            Self::Exit => "EXIT",
            Self::Semi => ";",
            Self::Newline => "NEWLINE",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::OrOr => "||",
            Self::AndAnd => "&&",
            Self::Pipe => "|",
            Self::Eof => "EOF",
        }
    }

    /// True for the keyword kinds whose remainder-of-line is an expression
    /// (operators and parentheses stay inside the segment text).
    pub fn takes_expression(&self) -> bool {
        matches!(
            self,
            Self::If | Self::ElseIf | Self::Evaluate | Self::Break | Self::Continue | Self::Exit
        )
    }
}

/// A classified line-token. `text` is the raw (still-escaped) segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LineToken {
    pub kind: LineKind,
    pub text: String,
}

impl LineToken {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}
