//! Grammar Parser
//!
//! Third stage: consumes classified line-tokens and reduces them into
//! command trees. The grammar is the MPW block grammar:
//!
//! ```text
//! command_list  := (command sep)*
//! command       := command ('||' | '&&' | '|') opt_nl command | term
//! term          := COMMAND | EVALUATE | BREAK | CONTINUE | EXIT | ERROR
//!               |  if | begin | paren | loop | for
//! begin/loop/for:= KEYWORD sep compound_list END
//! if            := IF sep compound_list (ELSE[_IF] sep compound_list)* END
//! paren         := '(' compound_list [command] ')'
//! ```
//!
//! The binary operators chain left-associatively at equal precedence, so a
//! stack of open block frames plus one pending operator per frame is all
//! the state the automaton needs. A closer token with nothing to close
//! becomes an `Error` term (reported when it executes); any other
//! misplacement is a syntax error that discards the current top-level
//! statement and resets the stack.

use log::debug;

use crate::ast::{BeginKind, BinaryKind, Clause, ClauseKind, Command, ErrorKind};
use crate::parser::types::{LineKind, LineToken};

/// Builds one `command sep` sequence: completed commands plus the command
/// currently being chained together with binary operators.
#[derive(Debug, Default)]
struct Accumulator {
    body: Vec<Command>,
    current: Option<Command>,
    pending: Option<BinaryKind>,
}

impl Accumulator {
    /// Attach a completed term, combining with a pending binary operator.
    /// Fails when two terms abut without a separator or operator.
    fn attach(&mut self, term: Command) -> Result<(), ()> {
        if let Some(kind) = self.pending.take() {
            let left = self.current.take().map(Box::new);
            self.current = Some(Command::Binary {
                kind,
                left,
                right: Some(Box::new(term)),
            });
            Ok(())
        } else if self.current.is_none() {
            self.current = Some(term);
            Ok(())
        } else {
            Err(())
        }
    }

    /// `;` or newline: the chained command is complete.
    fn separate(&mut self) {
        if let Some(cmd) = self.current.take() {
            self.body.push(cmd);
        }
    }

    fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_none()
    }
}

/// One open block.
#[derive(Debug)]
enum Frame {
    Begin {
        kind: BeginKind,
        begin: String,
        acc: Accumulator,
    },
    Loop {
        begin: String,
        acc: Accumulator,
    },
    For {
        begin: String,
        acc: Accumulator,
    },
    If {
        clauses: Vec<Clause>,
        clause_kind: ClauseKind,
        clause_text: String,
        acc: Accumulator,
    },
}

#[derive(Debug, Default)]
pub struct GrammarParser {
    stack: Vec<Frame>,
    top: Accumulator,
    queue: Vec<Command>,
    error: bool,
}

impl GrammarParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed top-level commands, ready to execute. The caller drains
    /// this after every chunk of input.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }

    /// True while a block or binary operator is still open.
    pub fn continuation(&self) -> bool {
        !self.stack.is_empty() || self.top.pending.is_some()
    }

    pub fn had_error(&self) -> bool {
        self.error
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.top = Accumulator::default();
        self.queue.clear();
        self.error = false;
    }

    /// End of input. Anything still open is a syntax error.
    pub fn finish(&mut self) {
        self.push(LineToken::new(LineKind::Eof, ""));
    }

    fn acc(&mut self) -> &mut Accumulator {
        match self.stack.last_mut() {
            Some(Frame::Begin { acc, .. })
            | Some(Frame::Loop { acc, .. })
            | Some(Frame::For { acc, .. })
            | Some(Frame::If { acc, .. }) => acc,
            None => &mut self.top,
        }
    }

    /// Report a syntax error, discard the statement in flight, and keep
    /// parsing from a clean stack.
    fn syntax_error(&mut self, token: &LineToken) {
        let near = if token.kind == LineKind::Eof {
            "EOF"
        } else {
            token.text.as_str()
        };
        eprintln!("### MPW Shell - Parse error near {}", near);
        self.stack.clear();
        self.top.current = None;
        self.top.pending = None;
        self.error = true;
    }

    /// Attach a finished term to the innermost accumulator.
    fn attach(&mut self, term: Command, token: &LineToken) {
        if self.acc().attach(term).is_err() {
            self.syntax_error(token);
        }
    }

    /// `sep` at the top level moves the finished command onto the queue.
    fn separate(&mut self) {
        self.acc().separate();
        if self.stack.is_empty() {
            self.queue.append(&mut self.top.body);
        }
    }

    pub fn push(&mut self, token: LineToken) {
        debug!("grammar: {:?} {:?}", token.kind, token.text);
        match token.kind {
            LineKind::Command => self.attach(Command::Simple(token.text.clone()), &token),
            LineKind::Evaluate => self.attach(Command::Evaluate(token.text.clone()), &token),
            LineKind::Break => self.attach(Command::Break(token.text.clone()), &token),
            LineKind::Continue => self.attach(Command::Continue(token.text.clone()), &token),
            LineKind::Exit => self.attach(Command::Exit(token.text.clone()), &token),

            LineKind::OrOr | LineKind::AndAnd | LineKind::Pipe => {
                let acc = self.acc();
                if acc.current.is_none() || acc.pending.is_some() {
                    self.syntax_error(&token);
                    return;
                }
                acc.pending = Some(match token.kind {
                    LineKind::OrOr => BinaryKind::Or,
                    LineKind::AndAnd => BinaryKind::And,
                    _ => BinaryKind::Pipe,
                });
            }

            LineKind::Newline => {
                // a newline right after a binary operator is absorbed
                if self.acc().pending.is_none() {
                    self.separate();
                }
            }
            LineKind::Semi => {
                if self.acc().pending.is_some() {
                    self.syntax_error(&token);
                    return;
                }
                self.separate();
            }

            LineKind::Begin => self.open_block(token, |text| Frame::Begin {
                kind: BeginKind::Begin,
                begin: text,
                acc: Accumulator::default(),
            }),
            LineKind::LParen => self.open_block(token, |text| Frame::Begin {
                kind: BeginKind::Paren,
                begin: text,
                acc: Accumulator::default(),
            }),
            LineKind::Loop => self.open_block(token, |text| Frame::Loop {
                begin: text,
                acc: Accumulator::default(),
            }),
            LineKind::For => self.open_block(token, |text| Frame::For {
                begin: text,
                acc: Accumulator::default(),
            }),
            LineKind::If => self.open_block(token, |text| Frame::If {
                clauses: Vec::new(),
                clause_kind: ClauseKind::If,
                clause_text: text,
                acc: Accumulator::default(),
            }),

            LineKind::ElseIf | LineKind::Else => self.else_clause(token),
            LineKind::End => self.close_end(token),
            LineKind::RParen => self.close_paren(token),

            LineKind::Eof => {
                if !self.stack.is_empty() || !self.top.is_idle() {
                    self.syntax_error(&token);
                } else {
                    // accept: clear the error flag
                    self.error = false;
                }
            }
        }
    }

    fn open_block(&mut self, token: LineToken, make: impl FnOnce(String) -> Frame) {
        // a block is a term: it may start a statement or follow an operator
        let acc = self.acc();
        if acc.current.is_some() && acc.pending.is_none() {
            self.syntax_error(&token);
            return;
        }
        self.stack.push(make(token.text));
    }

    fn else_clause(&mut self, token: LineToken) {
        if !self.acc().is_idle() {
            self.syntax_error(&token);
            return;
        }
        match self.stack.last_mut() {
            Some(Frame::If {
                clauses,
                clause_kind,
                clause_text,
                acc,
            }) => {
                clauses.push(Clause {
                    kind: *clause_kind,
                    text: std::mem::take(clause_text),
                    body: std::mem::take(&mut acc.body),
                });
                *clause_kind = if token.kind == LineKind::ElseIf {
                    ClauseKind::ElseIf
                } else {
                    ClauseKind::Else
                };
                *clause_text = token.text;
            }
            _ => {
                let term = Command::Error {
                    kind: ErrorKind::StrayElse,
                    text: token.text.clone(),
                };
                self.attach(term, &token);
            }
        }
    }

    fn close_end(&mut self, token: LineToken) {
        if !self.acc().is_idle() {
            self.syntax_error(&token);
            return;
        }
        let node = match self.stack.pop() {
            Some(Frame::Begin {
                kind: BeginKind::Begin,
                begin,
                acc,
            }) => Command::Begin {
                kind: BeginKind::Begin,
                begin,
                end: token.text.clone(),
                body: acc.body,
            },
            Some(Frame::Loop { begin, acc }) => Command::Loop {
                begin,
                end: token.text.clone(),
                body: acc.body,
            },
            Some(Frame::For { begin, acc }) => Command::For {
                begin,
                end: token.text.clone(),
                body: acc.body,
            },
            Some(Frame::If {
                mut clauses,
                clause_kind,
                clause_text,
                acc,
            }) => {
                clauses.push(Clause {
                    kind: clause_kind,
                    text: clause_text,
                    body: acc.body,
                });
                Command::If {
                    clauses,
                    end: token.text.clone(),
                }
            }
            Some(paren @ Frame::Begin { .. }) => {
                // `( … end` — the End cannot close a paren block
                self.stack.push(paren);
                Command::Error {
                    kind: ErrorKind::ExtraEnd,
                    text: token.text.clone(),
                }
            }
            None => Command::Error {
                kind: ErrorKind::ExtraEnd,
                text: token.text.clone(),
            },
        };
        self.attach(node, &token);
    }

    fn close_paren(&mut self, token: LineToken) {
        match self.stack.last() {
            Some(Frame::Begin {
                kind: BeginKind::Paren,
                ..
            }) => {
                if self.acc().pending.is_some() {
                    self.syntax_error(&token);
                    return;
                }
                // the last command inside parens needs no separator
                self.acc().separate();
                if let Some(Frame::Begin { begin, acc, .. }) = self.stack.pop() {
                    let node = Command::Begin {
                        kind: BeginKind::Paren,
                        begin,
                        end: token.text.clone(),
                        body: acc.body,
                    };
                    self.attach(node, &token);
                }
            }
            _ => {
                if !self.acc().is_idle() {
                    self.syntax_error(&token);
                    return;
                }
                let term = Command::Error {
                    kind: ErrorKind::ExtraRParen,
                    text: token.text.clone(),
                };
                self.attach(term, &token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::classifier::Classifier;

    fn parse(input: &str) -> Vec<Command> {
        let mut classifier = Classifier::new();
        let mut grammar = GrammarParser::new();
        for line in input.lines() {
            for token in classifier.classify_line(line) {
                grammar.push(token);
            }
        }
        grammar.finish();
        grammar.take_commands()
    }

    #[test]
    fn test_simple_commands() {
        let cmds = parse("echo a\necho b\n");
        assert_eq!(
            cmds,
            vec![
                Command::Simple("echo a".into()),
                Command::Simple("echo b".into())
            ]
        );
    }

    #[test]
    fn test_left_associative_chain() {
        let cmds = parse("a || b && c\n");
        // ((a || b) && c)
        match &cmds[0] {
            Command::Binary {
                kind: BinaryKind::And,
                left,
                right,
            } => {
                match left.as_deref() {
                    Some(Command::Binary {
                        kind: BinaryKind::Or,
                        ..
                    }) => {}
                    other => panic!("expected Or on the left, got {:?}", other),
                }
                assert_eq!(right.as_deref(), Some(&Command::Simple("c".into())));
            }
            other => panic!("expected And at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_spans_newline() {
        let cmds = parse("echo a ||\necho b\n");
        assert!(matches!(
            &cmds[0],
            Command::Binary {
                kind: BinaryKind::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_begin_block() {
        let cmds = parse("begin\necho a\necho b\nend\n");
        match &cmds[0] {
            Command::Begin {
                kind: BeginKind::Begin,
                body,
                ..
            } => assert_eq!(body.len(), 2),
            other => panic!("expected Begin, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_clauses() {
        let cmds = parse("if {x}\necho a\nelse if {y}\necho b\nelse\necho c\nend\n");
        match &cmds[0] {
            Command::If { clauses, .. } => {
                assert_eq!(clauses.len(), 3);
                assert_eq!(clauses[0].kind, ClauseKind::If);
                assert_eq!(clauses[1].kind, ClauseKind::ElseIf);
                assert_eq!(clauses[2].kind, ClauseKind::Else);
                assert_eq!(clauses[1].body, vec![Command::Simple("echo b".into())]);
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let cmds = parse("loop\nif {x}\nbreak\nend\nend\n");
        match &cmds[0] {
            Command::Loop { body, .. } => {
                assert!(matches!(body[0], Command::If { .. }));
            }
            other => panic!("expected Loop, got {:?}", other),
        }
    }

    #[test]
    fn test_paren_block_one_line() {
        let cmds = parse("(echo a; echo b) || echo c\n");
        match &cmds[0] {
            Command::Binary {
                kind: BinaryKind::Or,
                left,
                ..
            } => match left.as_deref() {
                Some(Command::Begin {
                    kind: BeginKind::Paren,
                    body,
                    ..
                }) => assert_eq!(body.len(), 2),
                other => panic!("expected paren block, got {:?}", other),
            },
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_parens() {
        let cmds = parse("()\n");
        assert!(matches!(
            &cmds[0],
            Command::Begin {
                kind: BeginKind::Paren,
                ..
            }
        ));
    }

    #[test]
    fn test_stray_end_is_error_term() {
        let cmds = parse("end\n");
        assert!(matches!(
            &cmds[0],
            Command::Error {
                kind: ErrorKind::ExtraEnd,
                ..
            }
        ));
    }

    #[test]
    fn test_stray_else_is_error_term() {
        let cmds = parse("else\n");
        assert!(matches!(
            &cmds[0],
            Command::Error {
                kind: ErrorKind::StrayElse,
                ..
            }
        ));
    }

    #[test]
    fn test_block_as_operator_operand() {
        let cmds = parse("echo a && begin\necho b\nend\n");
        match &cmds[0] {
            Command::Binary {
                kind: BinaryKind::And,
                right,
                ..
            } => assert!(matches!(right.as_deref(), Some(Command::Begin { .. }))),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_recovers() {
        // the dangling || statement is discarded; the next one parses
        let cmds = parse("echo a || ; echo broken\necho b\n");
        assert_eq!(*cmds.last().unwrap(), Command::Simple("echo b".into()));
    }

    #[test]
    fn test_unterminated_block_is_error_at_eof() {
        let mut classifier = Classifier::new();
        let mut grammar = GrammarParser::new();
        for token in classifier.classify_line("begin") {
            grammar.push(token);
        }
        grammar.finish();
        assert!(grammar.had_error());
        assert!(grammar.take_commands().is_empty());
    }

    #[test]
    fn test_continuation() {
        let mut classifier = Classifier::new();
        let mut grammar = GrammarParser::new();
        for token in classifier.classify_line("begin") {
            grammar.push(token);
        }
        assert!(grammar.continuation());
        for token in classifier.classify_line("end") {
            grammar.push(token);
        }
        assert!(!grammar.continuation());
    }

    #[test]
    fn test_reparse_display_round_trip() {
        let original = parse("if {x} > 0\necho yes\nelse\necho no\nend\n");
        let reparsed = parse(&format!("{}\n", original[0]));
        assert_eq!(original, reparsed);
    }
}
