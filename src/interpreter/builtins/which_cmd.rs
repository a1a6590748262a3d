//! Which/Exists — command and file lookup.

use std::path::Path;

use crate::interpreter::builtins::{fd_write, getopt, quote};
use crate::interpreter::environment::Environment;
use crate::interpreter::external::resolve_command;
use crate::interpreter::fdset::FdMask;

/// `Which [-a] [-p] [name]` — resolve a command against `{Commands}`.
/// `-a` reports every match, `-p` traces the directories checked; with no
/// name, the search path itself is printed.
pub fn builtin_which(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let stdout = fds.stdout();
    let stderr = fds.stderr();

    let mut all = false;
    let mut progress = false;
    let mut error = false;
    let args = getopt(argv, |c| match c.to_ascii_lowercase() {
        'a' => all = true,
        'p' => progress = true,
        other => {
            fd_write(
                stderr,
                &format!("### Which - \"-{}\" is not an option.\n", other),
            );
            error = true;
        }
    });

    if args.len() > 1 {
        fd_write(stderr, "### Which - Too many parameters were specified.\n");
        error = true;
    }
    if error {
        fd_write(stderr, "# Usage - Which [-a] [-p] [name]\n");
        return 1;
    }

    let dirs = env.get("commands").unwrap_or("").to_string();

    if args.is_empty() {
        let mut listing = String::new();
        for dir in dirs.split(',').filter(|d| !d.is_empty()) {
            listing.push_str(dir);
            listing.push('\n');
        }
        fd_write(stdout, &listing);
        return 0;
    }

    let target = &args[0];

    // a path-like target is checked directly
    if target.contains('/') || target.contains(':') {
        return if Path::new(target).exists() {
            fd_write(stdout, &format!("{}\n", quote(target)));
            0
        } else {
            fd_write(
                stderr,
                &format!("### Which - File \"{}\" not found.\n", target),
            );
            2
        };
    }

    let mut found = false;
    for dir in dirs.split(',').filter(|d| !d.is_empty()) {
        if progress {
            fd_write(stderr, &format!("checking {}\n", dir));
        }
        let candidate = Path::new(dir).join(target);
        if candidate.exists() {
            found = true;
            fd_write(stdout, &format!("{}\n", quote(&candidate.to_string_lossy())));
            if !all {
                break;
            }
        }
    }

    if found {
        return 0;
    }
    fd_write(
        stderr,
        &format!("### Which - Command \"{}\" was not found.\n", target),
    );
    2
}

/// `Exists name…` — print each name that names an existing file.
pub fn builtin_exists(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let _ = env;
    let mut listing = String::new();
    for name in &argv[1..] {
        if Path::new(name).exists() {
            listing.push_str(&format!("{}\n", quote(name)));
        }
    }
    fd_write(fds.stdout(), &listing);
    0
}
