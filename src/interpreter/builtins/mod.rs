//! Builtin Commands
//!
//! Builtins run inside the shell process and receive the environment,
//! their (already expanded and tokenized) argument words, and the active
//! descriptor mask. The dispatch table maps lowercased names; the engine
//! consults it before looking for an external command.

pub mod alias_cmd;
pub mod echo_cmd;
pub mod evaluate_cmd;
pub mod misc;
pub mod set_cmd;
pub mod which_cmd;

use std::collections::HashMap;
use std::os::fd::RawFd;

use lazy_static::lazy_static;

use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;

pub type BuiltinFn = fn(&mut Environment, &[String], &FdMask) -> i32;

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, BuiltinFn> = {
        let mut m: HashMap<&'static str, BuiltinFn> = HashMap::new();
        m.insert("alias", alias_cmd::builtin_alias);
        m.insert("directory", misc::builtin_directory);
        m.insert("echo", echo_cmd::builtin_echo);
        m.insert("exists", which_cmd::builtin_exists);
        m.insert("export", set_cmd::builtin_export);
        m.insert("false", misc::builtin_false);
        m.insert("parameters", echo_cmd::builtin_parameters);
        m.insert("quote", echo_cmd::builtin_quote);
        m.insert("set", set_cmd::builtin_set);
        m.insert("shift", misc::builtin_shift);
        m.insert("true", misc::builtin_true);
        m.insert("unalias", alias_cmd::builtin_unalias);
        m.insert("unexport", set_cmd::builtin_unexport);
        m.insert("unset", set_cmd::builtin_unset);
        m.insert("version", misc::builtin_version);
        m.insert("which", which_cmd::builtin_which);
        m
    };
}

/// Look up a builtin by its lowercased name.
pub fn find(name: &str) -> Option<BuiltinFn> {
    BUILTINS.get(name).copied()
}

/// Write through a (possibly redirected) raw descriptor. Output is
/// best-effort; a failed write on a diagnostic is not itself an error.
pub fn fd_write(fd: RawFd, text: &str) {
    let bytes = text.as_bytes();
    let mut written = 0;
    while written < bytes.len() {
        let rv = unsafe {
            libc::write(
                fd,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
            )
        };
        if rv <= 0 {
            break;
        }
        written += rv as usize;
    }
}

/// Collect non-flag arguments, feeding each `-x` flag character to `fx`.
/// Builtins only take single-letter flags, never flag values.
pub fn getopt(argv: &[String], mut fx: impl FnMut(char)) -> Vec<String> {
    let mut out = Vec::new();
    for arg in argv.iter().skip(1) {
        if arg.is_empty() {
            continue;
        }
        if let Some(flags) = arg.strip_prefix('-') {
            for c in flags.chars() {
                fx(c);
            }
        } else {
            out.push(arg.clone());
        }
    }
    out
}

/// Quote a word so the tokenizer reads it back as a single word. Plain
/// words pass through untouched; embedded single quotes are escaped by
/// closing, escaping, and reopening.
pub fn quote(s: &str) -> String {
    const SPECIAL: &str = " \t;|()<>#&*?+{}[]`'\"∂∑≥≤≠";
    if !s.is_empty() && !s.chars().any(|c| SPECIAL.contains(c)) {
        return s.to_string();
    }
    let mut out = String::from("'");
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'∂''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
