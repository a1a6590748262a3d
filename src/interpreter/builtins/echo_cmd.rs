//! Echo/Quote/Parameters — argument display.

use crate::interpreter::builtins::{fd_write, quote};
use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;

/// `Echo [-n] word…` — print the words separated by spaces. `-n` (found
/// anywhere) suppresses the trailing newline and is not printed.
pub fn builtin_echo(_env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let mut out = String::new();
    let mut newline = true;
    let mut space = false;
    for arg in &argv[1..] {
        if arg == "-n" || arg == "-N" {
            newline = false;
            continue;
        }
        if space {
            out.push(' ');
        }
        out.push_str(arg);
        space = true;
    }
    if newline {
        out.push('\n');
    }
    fd_write(fds.stdout(), &out);
    0
}

/// `Quote [-n] word…` — like Echo, but each word is re-quoted so the
/// output reads back as the same words.
pub fn builtin_quote(_env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let mut out = String::new();
    let mut newline = true;
    let mut space = false;
    for arg in &argv[1..] {
        if arg == "-n" || arg == "-N" {
            newline = false;
            continue;
        }
        if space {
            out.push(' ');
        }
        out.push_str(&quote(arg));
        space = true;
    }
    if newline {
        out.push('\n');
    }
    fd_write(fds.stdout(), &out);
    0
}

/// `Parameters word…` — print every word, the command name included, one
/// `{n} word` line each.
pub fn builtin_parameters(_env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let mut out = String::new();
    for (i, arg) in argv.iter().enumerate() {
        out.push_str(&format!("{{{}}} {}\n", i, arg));
    }
    fd_write(fds.stdout(), &out);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};
    use std::os::fd::AsRawFd;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Run a builtin with stdout captured to a temp file.
    fn capture(f: impl FnOnce(&FdMask) -> i32) -> (i32, String) {
        let mut file = tempfile::tempfile().unwrap();
        let mut mask = FdMask::new();
        mask.set(1, file.as_raw_fd());
        let status = f(&mask);
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        (status, out)
    }

    #[test]
    fn test_echo_joins_with_spaces() {
        let mut env = Environment::new();
        let (status, out) = capture(|fds| builtin_echo(&mut env, &args(&["echo", "a", "b"]), fds));
        assert_eq!(status, 0);
        assert_eq!(out, "a b\n");
    }

    #[test]
    fn test_echo_dash_n() {
        let mut env = Environment::new();
        let (_, out) = capture(|fds| builtin_echo(&mut env, &args(&["echo", "-n", "hi"]), fds));
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_echo_empty() {
        let mut env = Environment::new();
        let (_, out) = capture(|fds| builtin_echo(&mut env, &args(&["echo"]), fds));
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_quote_requotes() {
        let mut env = Environment::new();
        let (_, out) = capture(|fds| builtin_quote(&mut env, &args(&["quote", "a b", "c"]), fds));
        assert_eq!(out, "'a b' c\n");
    }

    #[test]
    fn test_parameters_numbers_all_words() {
        let mut env = Environment::new();
        let (_, out) =
            capture(|fds| builtin_parameters(&mut env, &args(&["parameters", "x", "y"]), fds));
        assert_eq!(out, "{0} parameters\n{1} x\n{2} y\n");
    }
}
