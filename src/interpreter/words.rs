//! Word Tokenizer
//!
//! Splits one already-expanded command line into shell words. Runs at
//! execution time, per simple command — expansion can re-introduce quotes
//! and operators, so the quote styles are applied again here.
//!
//! Two modes share the scanner:
//! - **command mode** recognizes the six redirection operators and leaves
//!   everything else as words;
//! - **expression mode** (for `Evaluate`, `If`, `Break`/`Continue`/`Exit`
//!   conditions) recognizes the arithmetic/logical operator tokens instead;
//!   `≥` means `>=` here rather than a stderr redirection.
//!
//! [`parse_tokens`] folds a command-mode token stream into `(argv, fds)`,
//! opening redirection targets as it goes.

use std::fs::{File, OpenOptions};

use crate::interpreter::errors::ShellError;
use crate::interpreter::fdset::FdSet;
use crate::parser::types::{ESCAPE, LESS_EQUAL, NOT_EQUAL, REDIRECT_BOTH, REDIRECT_ERR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Text,

    // command mode
    RedirectIn,        // <
    RedirectOut,       // >
    RedirectOutAppend, // >>
    RedirectBoth,      // ∑
    RedirectBothAppend, // ∑∑
    RedirectErr,       // ≥
    RedirectErrAppend, // ≥≥

    // expression mode
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Equivalent,    // ≡
    NotEquivalent, // ≢
    BitAnd,
    BitXor,
    BitOr,
    AndAnd,
    OrOr,
    Not,
    Tilde,
    Assign,
    PlusAssign,
    MinusAssign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub kind: WordKind,
    pub text: String,
}

impl Word {
    pub fn new(kind: WordKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(WordKind::Text, text)
    }
}

/// An operator starting at `chars[i]`, with its consumed length.
fn operator_at(chars: &[char], i: usize, eval: bool) -> Option<(WordKind, &'static str, usize)> {
    let c = chars[i];
    let next = chars.get(i + 1).copied();
    if eval {
        let double = |a, b| (a, b, 2usize);
        Some(match c {
            '(' => (WordKind::LParen, "(", 1),
            ')' => (WordKind::RParen, ")", 1),
            '+' if next == Some('=') => double(WordKind::PlusAssign, "+="),
            '+' => (WordKind::Plus, "+", 1),
            '-' if next == Some('=') => double(WordKind::MinusAssign, "-="),
            '-' => (WordKind::Minus, "-", 1),
            '*' => (WordKind::Star, "*", 1),
            '/' => (WordKind::Slash, "/", 1),
            '%' => (WordKind::Percent, "%", 1),
            '<' if next == Some('<') => double(WordKind::ShiftLeft, "<<"),
            '<' if next == Some('=') => double(WordKind::LessEqual, "<="),
            '<' => (WordKind::Less, "<", 1),
            '>' if next == Some('>') => double(WordKind::ShiftRight, ">>"),
            '>' if next == Some('=') => double(WordKind::GreaterEqual, ">="),
            '>' => (WordKind::Greater, ">", 1),
            '=' if next == Some('=') => double(WordKind::Equal, "=="),
            '=' => (WordKind::Assign, "=", 1),
            '!' if next == Some('=') => double(WordKind::NotEqual, "!="),
            '!' => (WordKind::Not, "!", 1),
            '&' if next == Some('&') => double(WordKind::AndAnd, "&&"),
            '&' => (WordKind::BitAnd, "&", 1),
            '|' if next == Some('|') => double(WordKind::OrOr, "||"),
            '|' => (WordKind::BitOr, "|", 1),
            '^' => (WordKind::BitXor, "^", 1),
            '~' => (WordKind::Tilde, "~", 1),
            LESS_EQUAL => (WordKind::LessEqual, "<=", 1),
            REDIRECT_ERR => (WordKind::GreaterEqual, ">=", 1),
            NOT_EQUAL => (WordKind::NotEqual, "!=", 1),
            '≡' => (WordKind::Equivalent, "≡", 1),
            '≢' => (WordKind::NotEquivalent, "≢", 1),
            _ => return None,
        })
    } else {
        Some(match c {
            '<' => (WordKind::RedirectIn, "<", 1),
            '>' if next == Some('>') => (WordKind::RedirectOutAppend, ">>", 2),
            '>' => (WordKind::RedirectOut, ">", 1),
            REDIRECT_BOTH if next == Some(REDIRECT_BOTH) => {
                (WordKind::RedirectBothAppend, "∑∑", 2)
            }
            REDIRECT_BOTH => (WordKind::RedirectBoth, "∑", 1),
            REDIRECT_ERR if next == Some(REDIRECT_ERR) => (WordKind::RedirectErrAppend, "≥≥", 2),
            REDIRECT_ERR => (WordKind::RedirectErr, "≥", 1),
            _ => return None,
        })
    }
}

/// Split an expanded command line into words and operators.
pub fn tokenize(input: &str, eval: bool) -> Result<Vec<Word>, ShellError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if matches!(chars[i], ' ' | '\t') {
            i += 1;
            continue;
        }
        if let Some((kind, text, len)) = operator_at(&chars, i, eval) {
            tokens.push(Word::new(kind, text));
            i += len;
            continue;
        }
        let (word, next) = read_word(&chars, i, eval)?;
        if let Some(word) = word {
            tokens.push(word);
        }
        i = next;
    }
    Ok(tokens)
}

type ScanResult = (Option<Word>, usize);

/// Accumulate one word, applying the quote styles. Quotes are stripped;
/// a `{…}` run keeps its braces (a brace that survived expansion is
/// literal text). The escape takes the next character verbatim.
fn read_word(chars: &[char], start: usize, eval: bool) -> Result<ScanResult, ShellError> {
    let mut text = String::new();
    let mut quoted = false;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if matches!(c, ' ' | '\t') || operator_at(chars, i, eval).is_some() {
            break;
        }
        match c {
            ESCAPE => {
                i += 1;
                if i < chars.len() {
                    text.push(chars[i]);
                    i += 1;
                }
            }
            '\'' => {
                quoted = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ShellError::UnterminatedSingle),
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(&c) => {
                            text.push(c);
                            i += 1;
                        }
                    }
                }
            }
            '"' => {
                quoted = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ShellError::UnterminatedDouble),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(&ESCAPE) => {
                            i += 1;
                            if let Some(&next) = chars.get(i) {
                                text.push(next);
                                i += 1;
                            } else {
                                return Err(ShellError::UnterminatedDouble);
                            }
                        }
                        Some(&c) => {
                            text.push(c);
                            i += 1;
                        }
                    }
                }
            }
            '`' => {
                quoted = true;
                let double = chars.get(i + 1) == Some(&'`');
                i += if double { 2 } else { 1 };
                loop {
                    match chars.get(i) {
                        None => return Err(ShellError::UnterminatedBacktick),
                        Some('`') if !double => {
                            i += 1;
                            break;
                        }
                        Some('`') if chars.get(i + 1) == Some(&'`') => {
                            i += 2;
                            break;
                        }
                        Some(&c) => {
                            text.push(c);
                            i += 1;
                        }
                    }
                }
            }
            '{' => {
                text.push('{');
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ShellError::UnterminatedBrace),
                        Some(&ESCAPE) => {
                            text.push(ESCAPE);
                            i += 1;
                            if let Some(&next) = chars.get(i) {
                                text.push(next);
                                i += 1;
                            }
                        }
                        Some(&c) => {
                            text.push(c);
                            i += 1;
                            if c == '}' {
                                break;
                            }
                        }
                    }
                }
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    if text.is_empty() && !quoted {
        return Ok((None, i));
    }
    Ok((Some(Word::text(text)), i))
}

/// A tokenized simple command ready to dispatch: its words plus any
/// descriptors its redirections opened.
#[derive(Debug, Default)]
pub struct Process {
    pub argv: Vec<String>,
    pub fds: FdSet,
}

fn open_for(kind: WordKind, name: &str) -> Result<File, ShellError> {
    let result = match kind {
        WordKind::RedirectIn => File::open(name),
        WordKind::RedirectOut | WordKind::RedirectBoth | WordKind::RedirectErr => {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(name)
        }
        _ => OpenOptions::new().write(true).create(true).append(true).open(name),
    };
    result.map_err(|_| ShellError::OpenFailed(name.to_string()))
}

/// Fold a command-mode token stream into argv plus opened redirections.
/// The first token is always taken as a word, whatever it looks like.
pub fn parse_tokens(tokens: Vec<Word>) -> Result<Process, ShellError> {
    let mut process = Process::default();
    let mut iter = tokens.into_iter();

    match iter.next() {
        Some(token) => process.argv.push(token.text),
        None => return Ok(process),
    }

    while let Some(token) = iter.next() {
        use WordKind::*;
        match token.kind {
            RedirectIn | RedirectOut | RedirectOutAppend | RedirectBoth | RedirectBothAppend
            | RedirectErr | RedirectErrAppend => {
                let name = iter.next().ok_or(ShellError::MissingFileName)?.text;
                let file = open_for(token.kind, &name)?;
                match token.kind {
                    RedirectIn => process.fds.set(0, file.into()),
                    RedirectOut | RedirectOutAppend => process.fds.set(1, file.into()),
                    RedirectErr | RedirectErrAppend => process.fds.set(2, file.into()),
                    _ => {
                        // stdout+stderr share one file; stderr gets a dup
                        let second = file
                            .try_clone()
                            .map_err(|_| ShellError::OpenFailed(name.clone()))?;
                        process.fds.set(1, file.into());
                        process.fds.set(2, second.into());
                    }
                }
            }
            _ => process.argv.push(token.text),
        }
    }

    Ok(process)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str, eval: bool) -> Vec<String> {
        tokenize(input, eval)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    fn kinds(input: &str, eval: bool) -> Vec<WordKind> {
        tokenize(input, eval)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(texts("echo hello world", false), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_quoted_words() {
        assert_eq!(texts("\"a b\" 'c d'", false), vec!["a b", "c d"]);
    }

    #[test]
    fn test_adjacent_quotes_join() {
        assert_eq!(texts("'a'\"b\"c", false), vec!["abc"]);
    }

    #[test]
    fn test_empty_quotes_make_a_word() {
        assert_eq!(texts("\"\" '0'", false), vec!["", "0"]);
    }

    #[test]
    fn test_unterminated_single_quote() {
        assert_eq!(tokenize("echo 'oops", false), Err(ShellError::UnterminatedSingle));
    }

    #[test]
    fn test_unterminated_double_quote() {
        assert_eq!(tokenize("echo \"oops", false), Err(ShellError::UnterminatedDouble));
    }

    #[test]
    fn test_unterminated_brace() {
        assert_eq!(tokenize("echo {oops", false), Err(ShellError::UnterminatedBrace));
    }

    #[test]
    fn test_escape_takes_next_verbatim() {
        assert_eq!(texts("a∂ b", false), vec!["a b"]);
        assert_eq!(texts("∂>out", false), vec![">out"]);
    }

    #[test]
    fn test_brace_run_keeps_braces() {
        assert_eq!(texts("{x}", false), vec!["{x}"]);
    }

    #[test]
    fn test_redirection_operators() {
        assert_eq!(
            kinds("cmd < in > out ≥ err ∑∑ both", false),
            vec![
                WordKind::Text,
                WordKind::RedirectIn,
                WordKind::Text,
                WordKind::RedirectOut,
                WordKind::Text,
                WordKind::RedirectErr,
                WordKind::Text,
                WordKind::RedirectBothAppend,
                WordKind::Text,
            ]
        );
    }

    #[test]
    fn test_append_operator() {
        assert_eq!(kinds(">> out", false)[0], WordKind::RedirectOutAppend);
    }

    #[test]
    fn test_expression_operators() {
        assert_eq!(
            kinds("1 + 2 * 3", true),
            vec![
                WordKind::Text,
                WordKind::Plus,
                WordKind::Text,
                WordKind::Star,
                WordKind::Text,
            ]
        );
        assert_eq!(kinds("a == b", true)[1], WordKind::Equal);
        assert_eq!(kinds("a != b", true)[1], WordKind::NotEqual);
        assert_eq!(kinds("a ≠ b", true)[1], WordKind::NotEqual);
        assert_eq!(kinds("a <= b", true)[1], WordKind::LessEqual);
        assert_eq!(kinds("a ≥ b", true)[1], WordKind::GreaterEqual);
        assert_eq!(kinds("a << b", true)[1], WordKind::ShiftLeft);
        assert_eq!(kinds("x += 1", true)[1], WordKind::PlusAssign);
        assert_eq!(kinds("a && b", true)[1], WordKind::AndAnd);
        assert_eq!(kinds("a & b", true)[1], WordKind::BitAnd);
        assert_eq!(kinds("(1)", true), vec![WordKind::LParen, WordKind::Text, WordKind::RParen]);
    }

    #[test]
    fn test_gte_byte_is_mode_dependent() {
        // ≥ redirects stderr in command mode, compares in expression mode
        assert_eq!(kinds("a ≥ b", false)[1], WordKind::RedirectErr);
        assert_eq!(kinds("a ≥ b", true)[1], WordKind::GreaterEqual);
    }

    #[test]
    fn test_quoted_operator_is_text() {
        assert_eq!(kinds("echo '>' out", false), vec![WordKind::Text; 3]);
    }

    #[test]
    fn test_parse_tokens_argv_only() {
        let p = parse_tokens(tokenize("echo a b", false).unwrap()).unwrap();
        assert_eq!(p.argv, vec!["echo", "a", "b"]);
        assert!(p.fds.is_empty());
    }

    #[test]
    fn test_parse_tokens_missing_filename() {
        let result = parse_tokens(tokenize("echo hi >", false).unwrap());
        assert!(matches!(result, Err(ShellError::MissingFileName)));
    }

    #[test]
    fn test_parse_tokens_unopenable() {
        let result = parse_tokens(tokenize("cat < /nonexistent/nope", false).unwrap());
        assert_eq!(
            result.err(),
            Some(ShellError::OpenFailed("/nonexistent/nope".into()))
        );
    }

    #[test]
    fn test_parse_tokens_opens_redirections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let line = format!("echo hi > {}", path.display());
        let p = parse_tokens(tokenize(&line, false).unwrap()).unwrap();
        assert_eq!(p.argv, vec!["echo", "hi"]);
        assert!(!p.fds.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_parse_tokens_both_dups_two_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("both.txt");
        let line = format!("cmd ∑ {}", path.display());
        let p = parse_tokens(tokenize(&line, false).unwrap()).unwrap();
        let mask = p.fds.to_mask();
        assert_ne!(mask.stdout(), 1);
        assert_ne!(mask.stderr(), 2);
        assert_ne!(mask.stdout(), mask.stderr());
    }
}
