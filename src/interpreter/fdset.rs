//! File-descriptor triples for redirection.
//!
//! [`FdMask`] is a non-owning view of the three standard descriptor slots;
//! an unset slot means "inherit". [`FdSet`] owns its descriptors and
//! closes them when dropped — redirection parsing fills an `FdSet`, and
//! the block that opened it keeps it alive for the duration of its body.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::unistd;

/// Non-owning descriptor mask. Copy freely; never closes anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FdMask {
    fds: [Option<RawFd>; 3],
}

impl FdMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor for a slot, falling back to the standard one.
    pub fn get(&self, index: usize) -> RawFd {
        self.fds[index].unwrap_or(index as RawFd)
    }

    pub fn stdin(&self) -> RawFd {
        self.get(0)
    }

    pub fn stdout(&self) -> RawFd {
        self.get(1)
    }

    pub fn stderr(&self) -> RawFd {
        self.get(2)
    }

    pub fn set(&mut self, index: usize, fd: RawFd) {
        self.fds[index] = Some(fd);
    }

    /// Fill unset slots from `other` (a child's own redirections win over
    /// the inherited mask).
    pub fn merge(&mut self, other: &FdMask) {
        for (slot, inherited) in self.fds.iter_mut().zip(other.fds.iter()) {
            if slot.is_none() {
                *slot = *inherited;
            }
        }
    }

    /// Dup the set slots onto stdin/stdout/stderr. Called in the child
    /// between fork and exec.
    pub fn dup_to_standard(&self) -> nix::Result<()> {
        for (index, fd) in self.fds.iter().enumerate() {
            if let Some(fd) = *fd {
                if fd != index as RawFd {
                    unistd::dup2(fd, index as RawFd)?;
                }
            }
        }
        Ok(())
    }
}

/// Owning descriptor set. Dropping it closes whatever is still held.
#[derive(Debug, Default)]
pub struct FdSet {
    fds: [Option<OwnedFd>; 3],
}

impl FdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a descriptor, closing any previous occupant of the slot.
    pub fn set(&mut self, index: usize, fd: OwnedFd) {
        self.fds[index] = Some(fd);
    }

    pub fn is_empty(&self) -> bool {
        self.fds.iter().all(Option::is_none)
    }

    /// A non-owning view; only valid while this set is alive.
    pub fn to_mask(&self) -> FdMask {
        let mut mask = FdMask::new();
        for (index, fd) in self.fds.iter().enumerate() {
            if let Some(fd) = fd {
                mask.set(index, fd.as_raw_fd());
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_defaults_to_standard_fds() {
        let mask = FdMask::new();
        assert_eq!(mask.stdin(), 0);
        assert_eq!(mask.stdout(), 1);
        assert_eq!(mask.stderr(), 2);
    }

    #[test]
    fn test_merge_keeps_own_slots() {
        let mut inner = FdMask::new();
        inner.set(1, 7);
        let mut outer = FdMask::new();
        outer.set(1, 5);
        outer.set(2, 6);
        inner.merge(&outer);
        assert_eq!(inner.stdout(), 7);
        assert_eq!(inner.stderr(), 6);
        assert_eq!(inner.stdin(), 0);
    }

    #[test]
    fn test_set_to_mask() {
        use std::fs::File;
        let file = File::open("/dev/null").unwrap();
        let raw = file.as_raw_fd();
        let mut set = FdSet::new();
        set.set(1, file.into());
        let mask = set.to_mask();
        assert_eq!(mask.stdout(), raw);
        assert_eq!(mask.stdin(), 0);
        assert!(!set.is_empty());
    }
}
