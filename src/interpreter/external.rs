//! External Commands
//!
//! Path resolution against `{Commands}` (a comma-separated directory
//! list) and the fork/exec/waitpid plumbing. SIGINT/SIGQUIT/SIGCHLD stay
//! blocked from fork through waitpid so the interrupt counter can't race
//! process bookkeeping; a child killed by a signal reports status −9.

use std::ffi::CString;
use std::path::{Path, PathBuf};

use log::debug;
use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execv, fork, ForkResult};

use crate::interpreter::environment::Environment;
use crate::interpreter::errors::ShellError;
use crate::interpreter::fdset::FdMask;

/// Status reported when the child died to a signal (user abort).
const KILLED_STATUS: i32 = -9;

/// Resolve a command name against `{Commands}`, in order. A name that
/// already looks like a path is checked directly instead.
pub fn resolve_command(env: &Environment, name: &str) -> Option<PathBuf> {
    if name.contains('/') || name.contains(':') {
        let path = PathBuf::from(name);
        return path.exists().then_some(path);
    }
    let dirs = env.get("commands").unwrap_or("");
    for dir in dirs.split(',') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(name);
        if candidate.exists() {
            debug!("resolved {} -> {}", name, candidate.display());
            return Some(candidate);
        }
    }
    None
}

/// Run an external command and wait for it. The caller has already
/// resolved `path`; `argv` keeps the name the user typed as argv[0].
pub fn execute_external(path: &Path, argv: &[String], fds: &FdMask) -> Result<i32, ShellError> {
    let mut blocked = SigSet::empty();
    blocked.add(Signal::SIGINT);
    blocked.add(Signal::SIGQUIT);
    blocked.add(Signal::SIGCHLD);
    let mut saved = SigSet::empty();
    let masked = sigprocmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut saved)).is_ok();

    let result = spawn_and_wait(path, argv, fds);

    if masked {
        let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&saved), None);
    }
    result
}

fn spawn_and_wait(path: &Path, argv: &[String], fds: &FdMask) -> Result<i32, ShellError> {
    let spawn_error = || ShellError::SpawnFailed(argv[0].clone());

    let c_path =
        CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| spawn_error())?;
    let c_argv: Vec<CString> = argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<_, _>>()
        .map_err(|_| spawn_error())?;

    match unsafe { fork() } {
        Err(_) => Err(spawn_error()),
        Ok(ForkResult::Child) => {
            let _ = fds.dup_to_standard();
            let _ = execv(&c_path, &c_argv);
            // exec failed; nothing sensible left to do in the child
            eprintln!("### MPW Shell - Unable to execute {}.", path.display());
            std::process::exit(71); // EX_OSERR
        }
        Ok(ForkResult::Parent { child }) => loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(code),
                Ok(WaitStatus::Signaled(..)) => return Ok(KILLED_STATUS),
                Ok(_) => continue,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(_) => return Err(spawn_error()),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_walks_commands_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("tool"), b"").unwrap();
        let mut env = Environment::new();
        env.set(
            "commands",
            &format!("{},{}", first.path().display(), second.path().display()),
            false,
        );
        let resolved = resolve_command(&env, "tool").unwrap();
        assert_eq!(resolved, second.path().join("tool"));
    }

    #[test]
    fn test_resolve_prefers_earlier_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("tool"), b"").unwrap();
        std::fs::write(second.path().join("tool"), b"").unwrap();
        let mut env = Environment::new();
        env.set(
            "commands",
            &format!("{},{}", first.path().display(), second.path().display()),
            false,
        );
        assert_eq!(
            resolve_command(&env, "tool").unwrap(),
            first.path().join("tool")
        );
    }

    #[test]
    fn test_resolve_misses() {
        let env = Environment::new();
        assert!(resolve_command(&env, "no-such-command").is_none());
    }

    #[test]
    fn test_pathlike_name_checked_directly() {
        let env = Environment::new();
        assert_eq!(
            resolve_command(&env, "/bin/sh"),
            Some(PathBuf::from("/bin/sh"))
        );
        assert!(resolve_command(&env, "/bin/definitely-not-here").is_none());
    }

    #[test]
    fn test_execute_external_exit_status() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let status = execute_external(Path::new("/bin/sh"), &argv, &FdMask::new()).unwrap();
        assert_eq!(status, 3);
    }

    #[test]
    fn test_execute_external_signal_death() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "kill -9 $$".to_string()];
        let status = execute_external(Path::new("/bin/sh"), &argv, &FdMask::new()).unwrap();
        assert_eq!(status, KILLED_STATUS);
    }
}
