//! Variable and Command Substitution
//!
//! `expand_vars` rewrites one raw command line before it is tokenized:
//! `{name}` becomes the variable's value, `` `cmd` `` (or the doubled
//! ``` ``cmd`` ``` form, which may contain single backticks) becomes the
//! command's captured output with newlines turned into spaces. Nothing
//! else changes — quotes and escapes pass through for the word tokenizer
//! to interpret. A `'…'` run suppresses expansion entirely; `"…"` does
//! not. Undefined variables expand to the empty string.
//!
//! A substituted command runs in a subshell environment: it sees exported
//! variables and aliases, and its own assignments stay its own.

use std::io::{Read, Seek, SeekFrom};
use std::os::fd::AsRawFd;

use log::trace;

use crate::interpreter::engine;
use crate::interpreter::environment::Environment;
use crate::interpreter::errors::{ExpandError, ShellError};
use crate::interpreter::fdset::FdMask;
use crate::parser::types::ESCAPE;
use crate::parser::Parser;

pub fn expand_vars(text: &str, env: &Environment, fds: &FdMask) -> Result<String, ExpandError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ESCAPE => {
                // the escape and its subject both survive for the tokenizer
                out.push(ESCAPE);
                i += 1;
                if i < chars.len() {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '\'' => {
                out.push('\'');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    out.push(c);
                    i += 1;
                    if c == '\'' {
                        break;
                    }
                }
            }
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    match chars[i] {
                        '"' => {
                            out.push('"');
                            i += 1;
                            break;
                        }
                        ESCAPE => {
                            out.push(ESCAPE);
                            i += 1;
                            if i < chars.len() {
                                out.push(chars[i]);
                                i += 1;
                            }
                        }
                        '{' => i = expand_brace(&chars, i, env, &mut out)?,
                        '`' => i = expand_backquote(&chars, i, env, fds, &mut out)?,
                        c => {
                            out.push(c);
                            i += 1;
                        }
                    }
                }
            }
            '{' => i = expand_brace(&chars, i, env, &mut out)?,
            '`' => i = expand_backquote(&chars, i, env, fds, &mut out)?,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// `{name}` → value. `i` points at the `{`; returns the index after `}`.
fn expand_brace(
    chars: &[char],
    i: usize,
    env: &Environment,
    out: &mut String,
) -> Result<usize, ExpandError> {
    let mut j = i + 1;
    let mut name = String::new();
    loop {
        match chars.get(j) {
            None => return Err(ShellError::UnterminatedBrace.into()),
            Some('}') => break,
            Some(&c) => {
                name.push(c);
                j += 1;
            }
        }
    }
    if let Some(value) = env.get(&name) {
        out.push_str(value);
    }
    trace!("expanded {{{}}}", name);
    Ok(j + 1)
}

/// `` `cmd` `` → captured output. `i` points at the first backtick;
/// returns the index after the closing delimiter.
fn expand_backquote(
    chars: &[char],
    i: usize,
    env: &Environment,
    fds: &FdMask,
    out: &mut String,
) -> Result<usize, ExpandError> {
    let double = chars.get(i + 1) == Some(&'`');
    let mut j = i + if double { 2 } else { 1 };
    let mut command = String::new();
    loop {
        match chars.get(j) {
            None => return Err(ShellError::UnterminatedBacktick.into()),
            Some('`') if !double => {
                j += 1;
                break;
            }
            Some('`') if chars.get(j + 1) == Some(&'`') => {
                j += 2;
                break;
            }
            Some(&c) => {
                command.push(c);
                j += 1;
            }
        }
    }
    out.push_str(&command_output(&command, env, fds)?);
    Ok(j)
}

/// Run a substituted command in a subshell with stdout captured to a
/// temporary file. Newlines in the output become spaces; trailing
/// whitespace is dropped.
fn command_output(command: &str, env: &Environment, fds: &FdMask) -> Result<String, ExpandError> {
    let mut file = tempfile::tempfile().map_err(|_| ShellError::TempFileFailed)?;

    let mut mask = *fds;
    mask.set(1, file.as_raw_fd());

    let mut subshell = env.subshell_environment();
    let mut parser = Parser::new();
    let mut commands = parser.parse(command);
    commands.extend(parser.finish());
    for cmd in &commands {
        engine::execute(cmd, &mut subshell, &mask).map_err(ExpandError::Signal)?;
    }

    file.seek(SeekFrom::Start(0))
        .map_err(|_| ShellError::TempFileFailed)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|_| ShellError::TempFileFailed)?;
    let output = String::from_utf8_lossy(&bytes).replace(['\r', '\n'], " ");
    Ok(output.trim_end().to_string())
}
