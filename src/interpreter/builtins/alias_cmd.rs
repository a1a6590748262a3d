//! Alias/Unalias — command-name substitution.

use crate::interpreter::builtins::{fd_write, quote};
use crate::interpreter::environment::Environment;
use crate::interpreter::fdset::FdMask;

/// `Alias` — list all aliases, show one, or define one. A definition's
/// expansion is the remaining words joined by spaces.
pub fn builtin_alias(env: &mut Environment, argv: &[String], fds: &FdMask) -> i32 {
    let stdout = fds.stdout();
    let stderr = fds.stderr();

    if argv.len() == 1 {
        let mut listing = String::new();
        for (name, value) in env.aliases() {
            listing.push_str(&format!("Alias {} {}\n", quote(name), quote(value)));
        }
        fd_write(stdout, &listing);
        return 0;
    }

    if argv.len() == 2 {
        let name = &argv[1];
        return match env.find_alias(name) {
            Some(value) => {
                fd_write(stdout, &format!("Alias {} {}\n", quote(name), quote(value)));
                0
            }
            None => {
                fd_write(
                    stderr,
                    &format!("### Alias - No alias definition exists for {}.\n", name),
                );
                2
            }
        };
    }

    let value = argv[2..].join(" ");
    env.add_alias(&argv[1], &value);
    0
}

/// `Unalias name…` — remove aliases; with no names, remove all of them.
pub fn builtin_unalias(env: &mut Environment, argv: &[String], _fds: &FdMask) -> i32 {
    if argv.len() == 1 {
        env.remove_all_aliases();
        return 0;
    }
    for name in &argv[1..] {
        env.remove_alias(name);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_define_and_lookup() {
        let mut env = Environment::new();
        let status = builtin_alias(&mut env, &args(&["alias", "dir", "echo", "listing"]), &FdMask::new());
        assert_eq!(status, 0);
        assert_eq!(env.find_alias("dir"), Some("echo listing"));
    }

    #[test]
    fn test_alias_unknown_status() {
        let mut env = Environment::new();
        let status = builtin_alias(&mut env, &args(&["alias", "ghost"]), &FdMask::new());
        assert_eq!(status, 2);
    }

    #[test]
    fn test_unalias_each_and_all() {
        let mut env = Environment::new();
        env.add_alias("a", "1");
        env.add_alias("b", "2");
        builtin_unalias(&mut env, &args(&["unalias", "a"]), &FdMask::new());
        assert_eq!(env.find_alias("a"), None);
        assert_eq!(env.find_alias("b"), Some("2"));
        builtin_unalias(&mut env, &args(&["unalias"]), &FdMask::new());
        assert_eq!(env.find_alias("b"), None);
    }
}
