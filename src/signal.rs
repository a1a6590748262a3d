//! Interrupt handling.
//!
//! The SIGINT handler does exactly one thing: bump an atomic counter.
//! Suspension points in the engine (before a leaf expands its text,
//! before each loop iteration) poll the counter and raise
//! [`ControlSignal::Interrupted`], which unwinds to the top-level driver;
//! the driver resets the counter once it has settled.

use std::sync::atomic::{AtomicU32, Ordering};

use nix::sys::signal::{self, SigHandler, Signal};

use crate::interpreter::errors::ControlSignal;

static PENDING: AtomicU32 = AtomicU32::new(0);

extern "C" fn handle_sigint(_: libc::c_int) {
    PENDING.fetch_add(1, Ordering::Relaxed);
}

/// Install the SIGINT handler. Call once at startup.
pub fn install() -> nix::Result<()> {
    unsafe { signal::signal(Signal::SIGINT, SigHandler::Handler(handle_sigint)) }.map(|_| ())
}

/// Has an interrupt been delivered since the last [`clear`]?
pub fn pending() -> bool {
    PENDING.load(Ordering::Relaxed) != 0
}

/// Reset the counter. The top-level driver owns this.
pub fn clear() {
    PENDING.store(0, Ordering::Relaxed);
}

/// Suspension point: raise the terminating signal if an interrupt is
/// pending.
pub fn poll() -> Result<(), ControlSignal> {
    if pending() {
        Err(ControlSignal::Interrupted)
    } else {
        Ok(())
    }
}
