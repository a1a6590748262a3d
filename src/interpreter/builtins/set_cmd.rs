//! Set/Unset/Export/Unexport — variable definition and export control.

use crate::interpreter::builtins::{fd_write, getopt, quote};
use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;

/// `Set` — list everything, show one variable, or define one.
/// `Set -e name value` also exports it.
pub fn builtin_set(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let stdout = fds.stdout();
    let stderr = fds.stderr();

    if argv.len() == 1 {
        let mut listing = String::new();
        for (name, entry) in env.iter() {
            listing.push_str(&format!(
                "Set {}{} {}\n",
                if entry.exported { "-e " } else { "" },
                quote(name),
                quote(&entry.value)
            ));
        }
        fd_write(stdout, &listing);
        return 0;
    }

    if argv.len() == 2 {
        let name = &argv[1];
        return match env.find(name) {
            None => {
                fd_write(
                    stderr,
                    &format!("### Set - No variable definition exists for {}.\n", name),
                );
                2
            }
            Some(entry) => {
                fd_write(
                    stdout,
                    &format!(
                        "Set {}{} {}\n",
                        if entry.exported { "-e " } else { "" },
                        quote(name),
                        quote(&entry.value)
                    ),
                );
                0
            }
        };
    }

    let exported = argv.len() == 4 && argv[1] == "-e";
    if argv.len() > 3 && !exported {
        fd_write(stderr, "### Set - Too many parameters were specified.\n");
        fd_write(stderr, "# Usage - set [name [value]]\n");
        return 1;
    }

    let offset = exported as usize;
    env.set(&argv[1 + offset], &argv[2 + offset], exported);
    0
}

/// `Unset name…` — remove variables; with no names, remove all of them.
pub fn builtin_unset(env: &mut Environment, argv: &[String], _fds: &FdMask) -> i32 {
    for name in &argv[1..] {
        env.unset(name);
    }
    if argv.len() == 1 {
        env.unset_all();
    }
    0
}

fn export_common(
    env: &mut Environment,
    export: bool,
    argv: &[String],
    fds: &FdMask,
) -> i32 {
    let stdout = fds.stdout();
    let stderr = fds.stderr();
    let name = if export { "Export" } else { "Unexport" };

    let mut flag_r = false;
    let mut flag_s = false;
    let mut error = false;
    let args = getopt(argv, |c| match c.to_ascii_lowercase() {
        'r' => flag_r = true,
        's' => flag_s = true,
        other => {
            fd_write(
                stderr,
                &format!("### {} - \"-{}\" is not an option.\n", name, other),
            );
            error = true;
        }
    });

    if error {
        fd_write(stderr, &format!("# Usage - {} [-r | -s | name...]\n", name));
        return 1;
    }

    let conflict = |stderr| {
        fd_write(
            stderr,
            &format!(
                "### {} - Conflicting options or parameters were specified.\n",
                name
            ),
        );
        fd_write(stderr, &format!("# Usage - {} [-r | -s | name...]\n", name));
        1
    };

    if args.is_empty() {
        if flag_r && flag_s {
            return conflict(stderr);
        }
        // -s prints bare names; otherwise each line is a replayable command
        let prefix = if flag_s {
            ""
        } else if export {
            "Export "
        } else {
            "Unexport "
        };
        let mut listing = String::new();
        for (vname, entry) in env.iter() {
            if entry.exported == export {
                listing.push_str(&format!("{}{}\n", prefix, quote(vname)));
            }
        }
        fd_write(stdout, &listing);
        return 0;
    }

    if flag_r || flag_s {
        return conflict(stderr);
    }

    for arg in &args {
        if let Some(entry) = env.find_mut(arg) {
            entry.exported = export;
        }
    }
    0
}

pub fn builtin_export(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    export_common(env, true, argv, fds)
}

pub fn builtin_unexport(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    export_common(env, false, argv, fds)
}
