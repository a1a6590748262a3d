//! Line Assembler
//!
//! First stage of the pipeline: a character-level state machine that turns
//! raw input into complete logical lines. It understands the quote styles
//! (`'…'`, `"…"`, `` `…` `` and the doubled `` ``…`` `` form, `{…}`
//! variable references, `/…/` and `\…\` filename patterns), line comments,
//! and the escape character. An escape before a newline continues the
//! logical line; everything else survives verbatim — quoting problems are
//! only diagnosed later, by the word tokenizer.

use crate::parser::types::ESCAPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TextEsc,
    Comment,
    CommentEsc,
    /// `{…}` variable reference
    VString,
    VStringEsc,
    /// `"…"`
    DString,
    DStringEsc,
    /// `'…'`
    SString,
    SStringEsc,
    /// `` ` `` seen, next character decides single vs doubled form
    EString,
    /// inside `` `…` ``
    EString1,
    EString1Esc,
    /// inside ``` ``…`` ```
    EString2,
    EString2Esc,
    /// one closing backtick of a doubled form seen
    EString3,
    /// `/…/`
    FString,
    FStringEsc,
    /// `\…\`
    BString,
    BStringEsc,
}

/// Assembles logical lines from raw input. Feed text with [`push`], collect
/// finished lines from the return value, and call [`finish`] at end of
/// input to force out a final unterminated line.
///
/// [`push`]: LineAssembler::push
/// [`finish`]: LineAssembler::finish
#[derive(Debug)]
pub struct LineAssembler {
    state: State,
    scratch: String,
    out: Vec<String>,
    multiline: bool,
    line: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            state: State::Text,
            scratch: String::new(),
            out: Vec::new(),
            multiline: false,
            line: 1,
        }
    }

    /// Process a chunk of input, returning any logical lines it completed.
    pub fn push(&mut self, input: &str) -> Vec<String> {
        for c in input.chars() {
            self.step(c);
        }
        std::mem::take(&mut self.out)
    }

    /// Force out the current line at end of input (an unterminated quote is
    /// closed out here; the tokenizer reports it later).
    pub fn finish(&mut self) -> Vec<String> {
        self.step('\n');
        std::mem::take(&mut self.out)
    }

    pub fn reset(&mut self) {
        self.state = State::Text;
        self.scratch.clear();
        self.out.clear();
        self.multiline = false;
        self.line = 1;
    }

    /// True while an escaped newline has spliced lines together — the
    /// interactive prompt shows a continuation marker.
    pub fn continuation(&self) -> bool {
        self.multiline
    }

    /// Current physical line number, for diagnostics.
    pub fn line(&self) -> usize {
        self.line
    }

    fn flush(&mut self) {
        self.multiline = false;
        if self.scratch.is_empty() {
            return;
        }
        self.out.push(std::mem::take(&mut self.scratch));
    }

    /// Transition out of plain text for one character. Shared with the
    /// stray-backtick recovery in `EString3`.
    fn text_transition(&mut self, c: char) -> State {
        match c {
            '#' => {
                self.scratch.pop();
                State::Comment
            }
            ESCAPE => State::TextEsc,
            '{' => State::VString,
            '"' => State::DString,
            '\'' => State::SString,
            '`' => State::EString,
            '/' => State::FString,
            '\\' => State::BString,
            _ => State::Text,
        }
    }

    fn step(&mut self, c: char) {
        use State::*;

        if c == '\r' || c == '\n' {
            match self.state {
                CommentEsc => {
                    // comment continuation: the logical line goes on,
                    // comment state does not
                    self.multiline = true;
                    self.line += 1;
                    self.state = Text;
                }
                TextEsc | VStringEsc | DStringEsc | SStringEsc | EString1Esc | EString2Esc
                | FStringEsc | BStringEsc => {
                    // escaped newline: drop the escape, keep assembling
                    self.multiline = true;
                    self.scratch.pop();
                    self.line += 1;
                    self.state = match self.state {
                        TextEsc => Text,
                        VStringEsc => VString,
                        DStringEsc => DString,
                        SStringEsc => SString,
                        EString1Esc => EString1,
                        EString2Esc => EString2,
                        FStringEsc => FString,
                        BStringEsc => BString,
                        _ => unreachable!(),
                    };
                }
                _ => {
                    // an open quote does not survive the newline; the
                    // tokenizer reports the imbalance later
                    self.flush();
                    self.line += 1;
                    self.state = Text;
                }
            }
            return;
        }

        if self.state != Comment {
            self.scratch.push(c);
        }

        self.state = match self.state {
            Text => self.text_transition(c),

            Comment => {
                if c == ESCAPE {
                    CommentEsc
                } else {
                    Comment
                }
            }

            // states where the escaped character is taken verbatim
            CommentEsc => Comment,
            TextEsc => Text,
            DStringEsc => DString,
            EString1Esc => EString1,
            EString2Esc => EString2,

            // the escape in these quote styles only matters before a
            // newline; any other character is interpreted normally
            SString | SStringEsc => match c {
                '\'' => Text,
                ESCAPE => SStringEsc,
                _ => SString,
            },
            FString | FStringEsc => match c {
                '/' => Text,
                ESCAPE => FStringEsc,
                _ => FString,
            },
            BString | BStringEsc => match c {
                '\\' => Text,
                ESCAPE => BStringEsc,
                _ => BString,
            },
            VString | VStringEsc => match c {
                // `{` var `}` or `{{` var `}}`; a single `}` terminates
                // either form here
                '}' => Text,
                ESCAPE => VStringEsc,
                _ => VString,
            },

            DString => match c {
                '"' => Text,
                ESCAPE => DStringEsc,
                _ => DString,
            },

            EString => match c {
                '`' => EString2,
                ESCAPE => EString1Esc,
                _ => EString1,
            },
            EString1 => match c {
                '`' => Text,
                ESCAPE => EString1Esc,
                _ => EString1,
            },
            EString2 => match c {
                '`' => EString3,
                ESCAPE => EString2Esc,
                _ => EString2,
            },
            EString3 => {
                if c == '`' {
                    Text
                } else {
                    // `` … ` x — not actually closed; reprocess as text
                    self.text_transition(c)
                }
            }
        };
    }
}
