//! Execution Engine
//!
//! Walks the command tree. Every node expands its stored text against the
//! current environment, echoes it when `{Echo}` is set, and runs its
//! contract: simple commands tokenize and dispatch, binaries short-circuit,
//! blocks merge their End-line redirections and recurse. Ordinary results
//! are status codes; Break/Continue/Exit/Interrupted unwind as
//! [`ControlSignal`]s through however many frames are in the way.
//!
//! A "pipeline" here is sequential: the left side runs to completion with
//! stdout captured in an anonymous temporary file, which is then rewound
//! and handed to the right side as stdin. Nothing in this interpreter runs
//! concurrently.

use std::io::{Seek, SeekFrom};
use std::os::fd::AsRawFd;

use log::debug;
use regex_lite::Regex;

use crate::ast::{BeginKind, Clause, ClauseKind, Command, ErrorKind};
use crate::interpreter::builtins::{self, evaluate_cmd};
use crate::interpreter::environment::Environment;
use crate::interpreter::errors::{ControlSignal, ExpandError, ShellError};
use crate::interpreter::expansion::expand_vars;
use crate::interpreter::expression::evaluate_expression;
use crate::interpreter::external;
use crate::interpreter::fdset::{FdMask, FdSet};
use crate::interpreter::value::Value;
use crate::interpreter::words::{self, Word, WordKind};
use crate::signal;

/// Execute one command tree node.
pub fn execute(cmd: &Command, env: &mut Environment, fds: &FdMask) -> Result<i32, ControlSignal> {
    match cmd {
        Command::Simple(text) => execute_simple(text, env, fds),
        Command::Evaluate(text) => execute_evaluate(text, env, fds),
        Command::Break(text) => {
            execute_loop_control(text, ControlSignal::Break, "Break", env, fds)
        }
        Command::Continue(text) => {
            execute_loop_control(text, ControlSignal::Continue, "Continue", env, fds)
        }
        Command::Exit(text) => execute_exit(text, env, fds),
        Command::Error { kind, text } => execute_error(*kind, text, env, fds),
        Command::Binary { kind, left, right } => match kind {
            crate::ast::BinaryKind::Pipe => {
                execute_pipe(left.as_deref(), right.as_deref(), env, fds)
            }
            _ => execute_and_or(*kind, left.as_deref(), right.as_deref(), env, fds),
        },
        Command::Begin {
            kind,
            begin,
            end,
            body,
        } => execute_begin(*kind, begin, end, body, env, fds),
        Command::Loop { begin, end, body } => execute_loop(begin, end, body, env, fds),
        Command::For { begin, end, body } => execute_for(begin, end, body, env, fds),
        Command::If { clauses, end } => execute_if(clauses, end, env, fds),
    }
}

/// Run a block body: children strictly in order, last status wins. A
/// failure does not stop the walk — only a control signal (or status
/// propagation inside a child) does.
pub fn execute_body(
    body: &[Command],
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    let mut rv = 0;
    for child in body {
        rv = execute(child, env, fds)?;
    }
    Ok(rv)
}

/// Report a shell error and record its status (which may itself raise the
/// terminating signal when `{Exit}` is set).
fn report_error(env: &mut Environment, error: &ShellError) -> Result<i32, ControlSignal> {
    eprintln!("{}", error);
    env.set_status(error.status(), true)
}

/// Expand a node's text. `Ok(Err(status))` means an expansion error was
/// already reported and the node should finish with that status.
fn expand_text(
    text: &str,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<Result<String, i32>, ControlSignal> {
    match expand_vars(text, env, fds) {
        Ok(s) => Ok(Ok(s)),
        Err(ExpandError::Signal(signal)) => Err(signal),
        Err(ExpandError::Shell(e)) => {
            eprintln!("{}", e);
            let status = env.set_status(e.status(), true)?;
            Ok(Err(status))
        }
    }
}

macro_rules! expand_or_return {
    ($text:expr, $env:expr, $fds:expr) => {
        match expand_text($text, $env, $fds)? {
            Ok(s) => s,
            Err(status) => return Ok(status),
        }
    };
}

// ---------------------------------------------------------------------------
// leaves

fn execute_simple(text: &str, env: &mut Environment, fds: &FdMask) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let line = expand_or_return!(text, env, fds);
    env.echo_line(&line);

    let process = match words::tokenize(&line, false).and_then(words::parse_tokens) {
        Ok(p) => p,
        Err(e) => return report_error(env, &e),
    };
    if process.argv.is_empty() {
        return Ok(0);
    }
    let mut mask = process.fds.to_mask();
    mask.merge(fds);

    let mut argv = process.argv.clone();

    // one round of alias substitution on the command word
    if let Some(expansion) = env.find_alias(&argv[0]).map(str::to_string) {
        match words::tokenize(&expansion, false) {
            Ok(tokens) => {
                let mut spliced: Vec<String> = tokens.into_iter().map(|t| t.text).collect();
                spliced.extend(argv.drain(1..));
                argv = spliced;
            }
            Err(e) => return report_error(env, &e),
        }
        if argv.is_empty() {
            return Ok(0);
        }
    }

    let name = argv[0].to_lowercase();
    if let Some(builtin) = builtins::find(&name) {
        debug!("dispatching builtin {}", name);
        let status = builtin(env, &argv, &mask);
        return env.set_status(status, true);
    }

    if env.test_mode() {
        return env.set_status(0, true);
    }
    if env.startup() {
        eprintln!("### MPW Shell - startup file may not contain external commands.");
        return env.set_status(0, true);
    }

    match external::resolve_command(env, &argv[0]) {
        Some(path) => match external::execute_external(&path, &argv, &mask) {
            Ok(status) => env.set_status(status, true),
            Err(e) => report_error(env, &e),
        },
        None => report_error(env, &ShellError::CommandNotFound(argv[0].clone())),
    }
}

fn execute_evaluate(text: &str, env: &mut Environment, fds: &FdMask) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let line = expand_or_return!(text, env, fds);
    env.echo_line(&line);

    let tokens = match words::tokenize(&line, true) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };
    if tokens.is_empty() {
        return Ok(0);
    }
    match evaluate_cmd::builtin_evaluate(env, tokens, fds) {
        Ok(status) => env.set_status(status, true),
        Err(e) => {
            eprintln!("{}", e);
            env.set_status(-5, true)
        }
    }
}

fn execute_loop_control(
    text: &str,
    signal_kind: ControlSignal,
    name: &str,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let line = expand_or_return!(text, env, fds);
    env.echo_line(&line);

    let mut tokens = match words::tokenize(&line, true) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };

    if env.loop_depth() == 0 {
        eprintln!("### {} - {} must be within Loop ... End.", name, name);
        return env.set_status(-3, true);
    }

    tokens.reverse();
    tokens.pop(); // the keyword itself
    match optional_if_condition(name, tokens, env)? {
        Ok(true) => Err(signal_kind),
        Ok(false) => Ok(env.status()),
        Err(status) => Ok(status),
    }
}

fn execute_exit(text: &str, env: &mut Environment, fds: &FdMask) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let line = expand_or_return!(text, env, fds);
    env.echo_line(&line);

    let mut tokens = match words::tokenize(&line, true) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };
    tokens.reverse();
    tokens.pop(); // "exit"

    // optional status; with none, the current {Status} rides along
    let mut status = env.status();
    match tokens.last().map(|t| t.kind) {
        Some(WordKind::Text) => {
            let mut v = Value::new(tokens[tokens.len() - 1].text.clone());
            if let Some(n) = v.to_number() {
                status = n;
                tokens.pop();
            }
        }
        // a negative status arrives as a minus operator and a number
        Some(WordKind::Minus) if tokens.len() >= 2 => {
            let prev = &tokens[tokens.len() - 2];
            let n = if prev.kind == WordKind::Text {
                Value::new(prev.text.clone()).to_number()
            } else {
                None
            };
            if let Some(n) = n {
                status = n.wrapping_neg();
                tokens.pop();
                tokens.pop();
            }
        }
        _ => {}
    }

    match optional_if_condition("Exit", tokens, env)? {
        Ok(true) => Err(ControlSignal::Exit(status)),
        Ok(false) => Ok(env.status()),
        Err(status) => Ok(status),
    }
}

/// The optional `If expression` tail of Break/Continue/Exit. `tokens` is
/// reversed with the command keyword already removed. `Ok(Err(status))`
/// means a malformed tail was reported.
fn optional_if_condition(
    name: &str,
    mut tokens: Vec<Word>,
    env: &mut Environment,
) -> Result<Result<bool, i32>, ControlSignal> {
    if tokens.is_empty() {
        return Ok(Ok(true));
    }
    let leads_with_if = tokens
        .last()
        .map(|t| t.kind == WordKind::Text && t.text.eq_ignore_ascii_case("if"))
        .unwrap_or(false);
    if !leads_with_if {
        eprintln!("### {} - Missing if keyword.", name);
        eprintln!("# Usage - {} [if expression...]", name);
        let status = env.set_status(-3, true)?;
        return Ok(Err(status));
    }
    tokens.pop();
    match evaluate_expression(name, tokens) {
        Ok(v) => Ok(Ok(v != 0)),
        Err(e) => {
            eprintln!("{}", e);
            let status = env.set_status(-5, true)?;
            Ok(Err(status))
        }
    }
}

fn execute_error(
    kind: ErrorKind,
    text: &str,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    let line = expand_or_return!(text, env, fds);
    env.echo_line(&line);
    let message = match kind {
        ErrorKind::ExtraEnd => "### MPW Shell - Extra END command.",
        ErrorKind::ExtraRParen => "### MPW Shell - Extra ) command.",
        ErrorKind::StrayElse => "### MPW Shell - ELSE must be within IF ... END.",
    };
    eprintln!("{}", message);
    env.set_status(-3, true)
}

// ---------------------------------------------------------------------------
// binaries

fn execute_and_or(
    kind: crate::ast::BinaryKind,
    left: Option<&Command>,
    right: Option<&Command>,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    use crate::ast::BinaryKind::*;

    // the chain itself decides what a failing side means, so children
    // must not trip exit-on-error
    let prev = env.set_and_or(true);
    let result: Result<i32, ControlSignal> = (|| {
        let mut rv = 0;
        for child in [left, right].into_iter().flatten() {
            rv = execute(child, env, fds)?;
            match kind {
                Or if rv == 0 => return Ok(0),
                And if rv != 0 => break,
                _ => {}
            }
        }
        Ok(rv)
    })();
    env.set_and_or(prev);

    let rv = result?;
    env.set_status(rv, true)
}

fn execute_pipe(
    left: Option<&Command>,
    right: Option<&Command>,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    let mut file = match tempfile::tempfile() {
        Ok(f) => f,
        Err(_) => return report_error(env, &ShellError::TempFileFailed),
    };

    let mut rv = 0;
    if let Some(left) = left {
        let mut mask = *fds;
        mask.set(1, file.as_raw_fd());
        rv = execute(left, env, &mask)?;
    }

    if file.seek(SeekFrom::Start(0)).is_err() {
        return report_error(env, &ShellError::TempFileFailed);
    }

    if let Some(right) = right {
        let mut mask = *fds;
        mask.set(0, file.as_raw_fd());
        rv = execute(right, env, &mask)?;
    }
    Ok(rv)
}

// ---------------------------------------------------------------------------
// blocks

/// Tokenize a block's End line for redirections; any other words on it
/// are ignored. The returned set keeps the opened files alive for the
/// duration of the block body.
fn check_ends(
    text: &str,
    env: &mut Environment,
) -> Result<Result<FdSet, i32>, ControlSignal> {
    match words::tokenize(text, false).and_then(words::parse_tokens) {
        Ok(process) => Ok(Ok(process.fds)),
        Err(e) => {
            eprintln!("{}", e);
            let status = env.set_status(e.status(), true)?;
            Ok(Err(status))
        }
    }
}

macro_rules! check_ends_or_return {
    ($text:expr, $env:expr) => {
        match check_ends($text, $env)? {
            Ok(fds) => fds,
            Err(status) => return Ok(status),
        }
    };
}

fn execute_begin(
    kind: BeginKind,
    begin: &str,
    end: &str,
    body: &[Command],
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let begin = expand_or_return!(begin, env, fds);
    let end = expand_or_return!(end, env, fds);
    env.echo_line(&format!("{} ... {}", begin, end));

    // the begin line takes no arguments
    let begin_tokens = match words::tokenize(&begin, true) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };
    if begin_tokens.len() != 1 {
        eprintln!("### Begin - Too many parameters were specified.");
        eprintln!("# Usage - Begin");
        return env.set_status(-3, true);
    }

    let ends = check_ends_or_return!(&end, env);
    let mut mask = ends.to_mask();
    mask.merge(fds);

    let rv = env.indent_and(|env| execute_body(body, env, &mask))?;
    env.echo_line(if kind == BeginKind::Begin { "end" } else { ")" });
    env.set_status(rv, true)
}

fn execute_loop(
    begin: &str,
    end: &str,
    body: &[Command],
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let begin = expand_or_return!(begin, env, fds);
    let end = expand_or_return!(end, env, fds);
    env.echo_line(&format!("{} ... {}", begin, end));

    let begin_tokens = match words::tokenize(&begin, true) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };
    if begin_tokens.len() != 1 {
        eprintln!("### Loop - Too many parameters were specified.");
        eprintln!("# Usage - Loop");
        return env.set_status(-3, true);
    }

    let ends = check_ends_or_return!(&end, env);
    let mut mask = ends.to_mask();
    mask.merge(fds);

    let rv;
    loop {
        signal::poll()?;
        match env.loop_indent_and(|env| execute_body(body, env, &mask)) {
            Ok(_) => continue,
            Err(ControlSignal::Break) => {
                rv = env.status();
                break;
            }
            Err(ControlSignal::Continue) => continue,
            Err(other) => return Err(other),
        }
    }

    env.echo_line("end");
    env.set_status(rv, true)
}

fn execute_for(
    begin: &str,
    end: &str,
    body: &[Command],
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let begin = expand_or_return!(begin, env, fds);
    let end = expand_or_return!(end, env, fds);
    env.echo_line(&format!("{} ... {}", begin, end));

    // command-mode tokens: the word list is data, not operators
    let begin_tokens = match words::tokenize(&begin, false) {
        Ok(t) => t,
        Err(e) => return report_error(env, &e),
    };
    let in_ok = begin_tokens.len() >= 3
        && begin_tokens[2].kind == WordKind::Text
        && begin_tokens[2].text.eq_ignore_ascii_case("in");
    if !in_ok {
        eprintln!("### For - Missing in keyword.");
        eprintln!("# Usage - For name in [word...]");
        return env.set_status(-3, true);
    }
    let name = begin_tokens[1].text.clone();
    if !is_valid_identifier(&name) {
        eprintln!("### For - \"{}\" is not a valid variable name.", name);
        return env.set_status(-3, true);
    }

    let ends = check_ends_or_return!(&end, env);
    let mut mask = ends.to_mask();
    mask.merge(fds);

    let mut rv = 0;
    for word in &begin_tokens[3..] {
        signal::poll()?;
        env.set(&name, &word.text, false);
        match env.loop_indent_and(|env| execute_body(body, env, &mask)) {
            Ok(status) => rv = status,
            Err(ControlSignal::Break) => {
                rv = env.status();
                break;
            }
            Err(ControlSignal::Continue) => {
                rv = env.status();
                continue;
            }
            Err(other) => return Err(other),
        }
    }

    env.echo_line("end");
    env.set_status(rv, true)
}

fn execute_if(
    clauses: &[Clause],
    end: &str,
    env: &mut Environment,
    fds: &FdMask,
) -> Result<i32, ControlSignal> {
    signal::poll()?;
    let end = expand_or_return!(end, env, fds);

    let ends = check_ends_or_return!(&end, env);
    let mut mask = ends.to_mask();
    mask.merge(fds);

    let mut rv = 0;
    let mut taken = false;
    let mut failed = false;
    for clause in clauses {
        let line = expand_or_return!(&clause.text, env, fds);
        if clause.kind == ClauseKind::If {
            env.echo_line(&format!("{} ... {}", line, end));
        } else {
            env.echo_line(&line);
        }

        // after a hit or an evaluation error the remaining clauses are
        // echoed but never evaluated
        if taken || failed {
            continue;
        }
        match evaluate_clause(clause.kind, &line, env)? {
            Ok(true) => {
                taken = true;
                rv = execute_body(&clause.body, env, &mask)?;
            }
            Ok(false) => {}
            Err(()) => failed = true,
        }
    }

    env.echo_line("end");
    env.set_status(rv, true)
}

/// Evaluate one If/Else-If/Else condition line. `Ok(Err(()))` marks an
/// evaluation error (already reported, status already recorded).
fn evaluate_clause(
    kind: ClauseKind,
    line: &str,
    env: &mut Environment,
) -> Result<Result<bool, ()>, ControlSignal> {
    let mut tokens = match words::tokenize(line, true) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            env.set_status(e.status(), true)?;
            return Ok(Err(()));
        }
    };
    tokens.reverse();

    match kind {
        ClauseKind::If | ClauseKind::ElseIf => {
            if kind == ClauseKind::ElseIf {
                tokens.pop(); // "else"
            }
            tokens.pop(); // "if"
            match evaluate_expression("If", tokens) {
                Ok(v) => Ok(Ok(v != 0)),
                Err(e) => {
                    eprintln!("{}", e);
                    env.set_status(-5, true)?;
                    Ok(Err(()))
                }
            }
        }
        ClauseKind::Else => {
            if tokens.len() > 1 {
                eprintln!("### Else - Missing if keyword.");
                eprintln!("# Usage - Else [if expression...]");
                env.set_status(-3, true)?;
                return Ok(Err(()));
            }
            Ok(Ok(true))
        }
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    re.is_match(name)
}
