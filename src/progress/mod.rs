//! progress
//!
//! Progress reporting and cooperative cancellation.
//!
//! # Design
//!
//! The manager's operations are synchronous and potentially long-running
//! (network exchanges, checkouts). The host application observes them
//! through a [`ProgressSink`] it supplies per call: the sink receives
//! human-readable status messages and is polled for a cancellation flag.
//!
//! Cancellation is cooperative and checked at transport granularity. An
//! in-flight exchange with a single remote is not guaranteed to abort
//! mid-packet, but no further transports are attempted once the flag is
//! observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Progress sink supplied by the host application.
///
/// Implementations must be thread-safe (`Send + Sync`); the host may poll
/// the cancellation flag from its UI thread while a worker runs the
/// operation.
pub trait ProgressSink: Send + Sync {
    /// Report a human-readable status message.
    fn report(&self, message: &str);

    /// Whether the host has requested cancellation.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A sink that discards all messages and never cancels.
///
/// Useful for headless callers and tests that don't care about progress.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _message: &str) {}
}

/// A sink that records every reported message and exposes a settable
/// cancellation flag.
///
/// Primarily useful in tests, but hosts can embed it to collect a
/// transcript of an operation.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
    cancelled: AtomicBool,
}

impl RecordingProgress {
    /// Create a new recording sink with no messages and cancellation unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the operation observing this sink.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Snapshot of the messages reported so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
