//! Line Classifier
//!
//! Second stage: takes one assembled logical line and splits it into
//! line-tokens for the grammar parser. A segment is tagged by its leading
//! keyword (case-insensitive, and only when followed by whitespace or end
//! of line, so `Iffy` is not `If`). Command-like segments are split at
//! top-level `;`, `|`, `||`, `&&`, `(` and `)`; segments whose keyword
//! takes an expression (If, Else If, Evaluate, Break, Continue, Exit) run
//! to `;` or end of line so expression operators and parentheses stay in
//! the segment text. A `)` token absorbs trailing text — that is where a
//! block's redirections live. Every line ends with a NEWLINE token.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::trace;

use crate::parser::types::{LineKind, LineToken, ESCAPE};

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, LineKind> = {
        let mut m = HashMap::new();
        m.insert("if", LineKind::If);
        m.insert("else", LineKind::Else);
        m.insert("end", LineKind::End);
        m.insert("begin", LineKind::Begin);
        m.insert("loop", LineKind::Loop);
        m.insert("for", LineKind::For);
        m.insert("evaluate", LineKind::Evaluate);
        m.insert("break", LineKind::Break);
        m.insert("continue", LineKind::Continue);
        m.insert("exit", LineKind::Exit);
        m
    };
}

/// Tracks quote state while scanning a segment so operators inside quoted
/// runs never split. The line assembler already balanced these per line,
/// so unterminated runs simply consume the rest of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Backtick,
    DoubleBacktick,
    Brace,
}

pub struct Classifier {
    /// open parens carried across lines; decides whether a `)` inside an
    /// expression segment closes a paren block or belongs to the expression
    pcount: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self { pcount: 0 }
    }

    pub fn reset(&mut self) {
        self.pcount = 0;
    }

    /// Split one logical line into classified tokens (ending with NEWLINE).
    pub fn classify_line(&mut self, line: &str) -> Vec<LineToken> {
        let chars: Vec<char> = line.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            // leading whitespace never belongs to a token
            while i < chars.len() && matches!(chars[i], ' ' | '\t') {
                i += 1;
            }
            if i >= chars.len() {
                break;
            }

            match chars[i] {
                ';' => {
                    tokens.push(LineToken::new(LineKind::Semi, ";"));
                    i += 1;
                }
                '|' if chars.get(i + 1) == Some(&'|') => {
                    tokens.push(LineToken::new(LineKind::OrOr, "||"));
                    i += 2;
                }
                '|' => {
                    tokens.push(LineToken::new(LineKind::Pipe, "|"));
                    i += 1;
                }
                '&' if chars.get(i + 1) == Some(&'&') => {
                    tokens.push(LineToken::new(LineKind::AndAnd, "&&"));
                    i += 2;
                }
                '(' => {
                    tokens.push(LineToken::new(LineKind::LParen, "("));
                    self.pcount += 1;
                    i += 1;
                }
                ')' => {
                    // absorb trailing redirections into the token text
                    let start = i;
                    i += 1;
                    i = self.scan_command(&chars, i);
                    let text: String = chars[start..i].iter().collect();
                    tokens.push(LineToken::new(LineKind::RParen, text));
                    self.pcount = self.pcount.saturating_sub(1);
                }
                _ => {
                    let start = i;
                    let kind = self.leading_keyword(&chars, &mut i);
                    i = if kind.takes_expression() {
                        self.scan_expression(&chars, i)
                    } else {
                        self.scan_command(&chars, i)
                    };
                    let text: String = chars[start..i].iter().collect();
                    trace!("classified {:?} segment {:?}", kind, text);
                    tokens.push(LineToken::new(kind, text));
                }
            }
        }

        tokens.push(LineToken::new(LineKind::Newline, "\n"));
        tokens
    }

    /// Match the leading keyword of a segment, advancing past it (and past
    /// the `If` of an `Else If`). Leaves `i` untouched for plain commands.
    fn leading_keyword(&self, chars: &[char], i: &mut usize) -> LineKind {
        let (word, after) = match keyword_at(chars, *i) {
            Some(w) => w,
            None => return LineKind::Command,
        };
        let kind = match KEYWORDS.get(word.as_str()) {
            Some(&k) => k,
            None => return LineKind::Command,
        };
        if kind == LineKind::Else {
            // `Else If` fuses into a single token
            let mut j = after;
            while j < chars.len() && matches!(chars[j], ' ' | '\t') {
                j += 1;
            }
            if let Some((word2, after2)) = keyword_at(chars, j) {
                if word2 == "if" {
                    *i = after2;
                    return LineKind::ElseIf;
                }
            }
        }
        *i = after;
        kind
    }

    /// Scan a command-like segment: stops before any top-level operator.
    fn scan_command(&self, chars: &[char], mut i: usize) -> usize {
        let mut quote = Quote::None;
        while i < chars.len() {
            let c = chars[i];
            if quote == Quote::None {
                match c {
                    ';' | '|' | '(' | ')' => break,
                    '&' if chars.get(i + 1) == Some(&'&') => break,
                    _ => {}
                }
            }
            i = step_quote(chars, i, &mut quote);
        }
        i
    }

    /// Scan an expression segment: runs to `;` or end of line. Parentheses
    /// nest inside the expression; an unmatched `)` only terminates the
    /// segment when a paren block is actually open.
    fn scan_expression(&self, chars: &[char], mut i: usize) -> usize {
        let mut quote = Quote::None;
        let mut depth = 0usize;
        while i < chars.len() {
            let c = chars[i];
            if quote == Quote::None {
                match c {
                    ';' => break,
                    '(' => depth += 1,
                    ')' => {
                        if depth > 0 {
                            depth -= 1;
                        } else if self.pcount > 0 {
                            break;
                        }
                        // else: leave it for the expression evaluator to
                        // report as an extra `)`
                    }
                    _ => {}
                }
            }
            i = step_quote(chars, i, &mut quote);
        }
        i
    }
}

/// Read a run of letters at `i`; returns (lowercased word, index after it)
/// only when the run is delimited by whitespace, end of line, or a
/// segment-ending operator (so `end;` is still `End`, but `Iffy` is never
/// `If`).
fn keyword_at(chars: &[char], i: usize) -> Option<(String, usize)> {
    let mut j = i;
    while j < chars.len() && chars[j].is_ascii_alphabetic() {
        j += 1;
    }
    if j == i {
        return None;
    }
    if j < chars.len() && !matches!(chars[j], ' ' | '\t' | ';' | '|' | '(' | ')' | '&') {
        return None;
    }
    let word: String = chars[i..j].iter().map(|c| c.to_ascii_lowercase()).collect();
    Some((word, j))
}

/// Advance one character, updating quote state. The escape defers the
/// following character in any state.
fn step_quote(chars: &[char], i: usize, quote: &mut Quote) -> usize {
    let c = chars[i];
    if c == ESCAPE {
        return i + 2;
    }
    match *quote {
        Quote::None => match c {
            '\'' => *quote = Quote::Single,
            '"' => *quote = Quote::Double,
            '`' => {
                if chars.get(i + 1) == Some(&'`') {
                    *quote = Quote::DoubleBacktick;
                    return i + 2;
                }
                *quote = Quote::Backtick;
            }
            '{' => *quote = Quote::Brace,
            _ => {}
        },
        Quote::Single => {
            if c == '\'' {
                *quote = Quote::None;
            }
        }
        Quote::Double => {
            if c == '"' {
                *quote = Quote::None;
            }
        }
        Quote::Backtick => {
            if c == '`' {
                *quote = Quote::None;
            }
        }
        Quote::DoubleBacktick => {
            if c == '`' && chars.get(i + 1) == Some(&'`') {
                *quote = Quote::None;
                return i + 2;
            }
        }
        Quote::Brace => {
            if c == '}' {
                *quote = Quote::None;
            }
        }
    }
    i + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<LineKind> {
        Classifier::new()
            .classify_line(line)
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_plain_command() {
        assert_eq!(kinds("echo hello"), vec![LineKind::Command, LineKind::Newline]);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(kinds("If {x} > 0")[0], LineKind::If);
        assert_eq!(kinds("END")[0], LineKind::End);
        assert_eq!(kinds("beGIN")[0], LineKind::Begin);
    }

    #[test]
    fn test_keyword_needs_boundary() {
        assert_eq!(kinds("Iffy bar")[0], LineKind::Command);
        assert_eq!(kinds("forward")[0], LineKind::Command);
    }

    #[test]
    fn test_else_if_fuses() {
        let tokens = Classifier::new().classify_line("Else If {x} == 1");
        assert_eq!(tokens[0].kind, LineKind::ElseIf);
        assert_eq!(tokens[0].text, "Else If {x} == 1");
    }

    #[test]
    fn test_operators_split() {
        assert_eq!(
            kinds("echo a || echo b && echo c | wc"),
            vec![
                LineKind::Command,
                LineKind::OrOr,
                LineKind::Command,
                LineKind::AndAnd,
                LineKind::Command,
                LineKind::Pipe,
                LineKind::Command,
                LineKind::Newline,
            ]
        );
    }

    #[test]
    fn test_semicolons_split() {
        assert_eq!(
            kinds("echo a; echo b"),
            vec![LineKind::Command, LineKind::Semi, LineKind::Command, LineKind::Newline]
        );
    }

    #[test]
    fn test_operators_inside_quotes_stay() {
        assert_eq!(kinds("echo 'a || b'"), vec![LineKind::Command, LineKind::Newline]);
        assert_eq!(kinds("echo \"a ; b\""), vec![LineKind::Command, LineKind::Newline]);
        assert_eq!(kinds("echo {a;b}"), vec![LineKind::Command, LineKind::Newline]);
    }

    #[test]
    fn test_escape_protects_operator() {
        assert_eq!(kinds("echo ∂;"), vec![LineKind::Command, LineKind::Newline]);
    }

    #[test]
    fn test_parens() {
        assert_eq!(
            kinds("(echo a; echo b)"),
            vec![
                LineKind::LParen,
                LineKind::Command,
                LineKind::Semi,
                LineKind::Command,
                LineKind::RParen,
                LineKind::Newline,
            ]
        );
    }

    #[test]
    fn test_rparen_absorbs_redirection() {
        let tokens = Classifier::new().classify_line("(echo a) > out && echo b");
        let rparen = tokens.iter().find(|t| t.kind == LineKind::RParen).unwrap();
        assert_eq!(rparen.text, ") > out ");
        assert_eq!(tokens[3].kind, LineKind::AndAnd);
    }

    #[test]
    fn test_expression_keeps_operators() {
        let tokens = Classifier::new().classify_line("If {a} || {b}");
        assert_eq!(tokens.len(), 2); // IF + NEWLINE
        assert_eq!(tokens[0].text, "If {a} || {b}");
    }

    #[test]
    fn test_expression_keeps_parens() {
        let tokens = Classifier::new().classify_line("Evaluate (1 + 2) * 3");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "Evaluate (1 + 2) * 3");
    }

    #[test]
    fn test_expression_stops_at_semi() {
        let tokens = Classifier::new().classify_line("If 1; echo a; End");
        let kinds: Vec<LineKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::If,
                LineKind::Semi,
                LineKind::Command,
                LineKind::Semi,
                LineKind::End,
                LineKind::Newline,
            ]
        );
    }

    #[test]
    fn test_if_condition_closed_by_open_paren_block() {
        let mut c = Classifier::new();
        let tokens = c.classify_line("(If {x} > 0)");
        let kinds: Vec<LineKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::LParen, LineKind::If, LineKind::RParen, LineKind::Newline]
        );
        assert_eq!(tokens[1].text, "If {x} > 0");
    }

    #[test]
    fn test_end_splits_before_operator() {
        let tokens = Classifier::new().classify_line("End && echo done");
        assert_eq!(tokens[0].kind, LineKind::End);
        assert_eq!(tokens[1].kind, LineKind::AndAnd);
    }

    #[test]
    fn test_single_amp_is_text() {
        let tokens = Classifier::new().classify_line("echo a & b");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "echo a & b");
    }
}
