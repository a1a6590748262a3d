//! Directory, Shift, Version, True, False.

use crate::interpreter::builtins::{fd_write, getopt, quote};
use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;

/// `Directory [-q | directory]` — change or print the default directory.
/// `-q` suppresses quoting of the printed path and conflicts with an
/// explicit directory argument.
pub fn builtin_directory(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let _ = env;
    let stdout = fds.stdout();
    let stderr = fds.stderr();

    let mut unquoted = false;
    let mut error = false;
    let args = getopt(argv, |c| match c.to_ascii_lowercase() {
        'q' => unquoted = true,
        other => {
            fd_write(
                stderr,
                &format!("### Directory - \"-{}\" is not an option.\n", other),
            );
            error = true;
        }
    });

    if error {
        fd_write(stderr, "# Usage - Directory [-q | directory]\n");
        return 1;
    }
    if args.len() > 1 {
        fd_write(stderr, "### Directory - Too many parameters were specified.\n");
        fd_write(stderr, "# Usage - Directory [-q | directory]\n");
        return 1;
    }

    if let Some(dir) = args.first() {
        if unquoted {
            fd_write(
                stderr,
                "### Directory - Conflicting options or parameters were specified.\n",
            );
            return 1;
        }
        if let Err(err) = std::env::set_current_dir(dir) {
            fd_write(stderr, "### Directory - Unable to set current directory.\n");
            fd_write(stderr, &format!("# {}\n", err));
            return 1;
        }
        return 0;
    }

    match std::env::current_dir() {
        Ok(path) => {
            let text = path.to_string_lossy();
            let text = if unquoted {
                text.to_string()
            } else {
                quote(&text)
            };
            fd_write(stdout, &format!("{}\n", text));
            0
        }
        Err(err) => {
            fd_write(stderr, "### Directory - Unable to get current directory.\n");
            fd_write(stderr, &format!("# {}\n", err));
            1
        }
    }
}

/// `Shift [number]` — discard the first `number` positional parameters,
/// renumbering the rest and updating `{#}`.
pub fn builtin_shift(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let stderr = fds.stderr();

    if argv.len() > 2 {
        fd_write(stderr, "### Shift - Too many parameters were specified.\n");
        fd_write(stderr, "# Usage - Shift [number]\n");
        return 1;
    }

    let count = match argv.get(1) {
        None => 1,
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                fd_write(stderr, "### Shift - The parameter must be a number.\n");
                fd_write(stderr, "# Usage - Shift [number]\n");
                return 1;
            }
        },
    };

    let pound = env.pound();
    let count = count.min(pound);
    for i in 1..=pound.saturating_sub(count) {
        let value = env.get(&(i + count).to_string()).unwrap_or("").to_string();
        env.set(&i.to_string(), &value, false);
    }
    for i in (pound - count + 1)..=pound {
        env.unset(&i.to_string());
    }
    env.set_pound(pound - count);
    0
}

/// `Version` — report the shell version.
pub fn builtin_version(_env: &mut Environment, _argv: &[String], fds: &FdMask) -> i32 {
    fd_write(
        fds.stdout(),
        &format!("MPW Shell {} (mpsh)\n", env!("CARGO_PKG_VERSION")),
    );
    0
}

pub fn builtin_true(_env: &mut Environment, _argv: &[String], _fds: &FdMask) -> i32 {
    0
}

pub fn builtin_false(_env: &mut Environment, _argv: &[String], _fds: &FdMask) -> i32 {
    1
}
