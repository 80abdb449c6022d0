//! Termination handling
//!
//! The SIGINT/SIGTERM handler only flips an atomic flag. All restoration
//! work happens on the main context once the flag is observed.

use crate::error::Error;
use log::debug;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// Poll interval while holding a degenerate mode
pub const IDLE_POLL: Duration = Duration::from_millis(100);

static HANDLER_STATE: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Process-wide stop flag. Set once, never reset.
#[derive(Clone, Debug, Default)]
pub struct ControlState {
    stopping: Arc<AtomicBool>,
}

impl ControlState {
    pub fn new() -> Self {
        ControlState::default()
    }

    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Block until a stop is requested, waking every `IDLE_POLL`
    pub fn wait(&self) {
        while !self.is_stopping() {
            thread::sleep(IDLE_POLL);
        }
    }
}

extern "C" fn on_terminate(_: libc::c_int) {
    if let Some(flag) = HANDLER_STATE.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Route SIGINT and SIGTERM to `control`. Only the first installed state
/// is ever signalled.
pub fn install(control: &ControlState) -> Result<(), Error> {
    if HANDLER_STATE.set(Arc::clone(&control.stopping)).is_err() {
        return Err(Error::Signal("termination handler already installed".to_string()));
    }
    let action = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only performs an atomic store.
        unsafe { sigaction(sig, &action) }?;
        debug!("installed {} handler", sig);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_control_state_set_once() {
        let control = ControlState::new();
        assert!(!control.is_stopping());
        let clone = control.clone();
        clone.request_stop();
        assert!(control.is_stopping());
        control.request_stop();
        assert!(control.is_stopping());
    }

    #[test]
    fn test_wait_returns_promptly_after_stop() {
        let control = ControlState::new();
        let remote = control.clone();
        let started = Instant::now();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.request_stop();
        });
        control.wait();
        t.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_sigterm_sets_flag() {
        let control = ControlState::new();
        install(&control).unwrap();
        assert!(install(&ControlState::new()).is_err());

        nix::sys::signal::raise(Signal::SIGTERM).unwrap();
        assert!(control.is_stopping());
    }
}
