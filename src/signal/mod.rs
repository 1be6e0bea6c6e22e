//! Ctrl-C handling
//!
//! The first SIGINT/SIGTERM sets a shared cancellation flag that polling
//! loops check between probes, so the current command can stop, close its
//! browser driver and report. A second signal exits at once with 130.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crate::summary::ExitCode;

/// Shared signal state
#[derive(Debug, Default)]
pub struct SignalState {
    cancel_requested: AtomicBool,
    signal_count: AtomicU8,
}

/// What the handler should do for a given signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: ask running work to stop
    RequestCancel,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal while already exiting
    Ignore,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record a signal and decide what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.cancel_requested.store(true, Ordering::SeqCst);
                SignalAction::RequestCancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Request cancellation without a signal (tests, timeouts).
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }
}

/// Cheap clonable view of the cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<SignalState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancel_requested()
    }

    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }
}

/// Install the process-wide SIGINT/SIGTERM handler.
///
/// Must be called at most once per process.
pub fn install(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let state = token.state();
    ctrlc::set_handler(move || match state.handle_signal() {
        SignalAction::RequestCancel => {
            log::warn!("interrupt received, stopping after the current step (again to abort)");
        }
        SignalAction::ImmediateExit => {
            eprintln!("\nSecond interrupt, exiting immediately.");
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
        SignalAction::Ignore => {}
    })
}
