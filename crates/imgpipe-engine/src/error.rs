//! Per-thread error buffer.
//!
//! Engine calls never return a message. A failing call appends a
//! `"<domain>: <message>\n"` line to the calling thread's buffer and returns
//! [`Fault`]. The caller reads the buffer with [`error_buffer`], resets it with
//! [`error_clear`], and releases the thread's engine state with
//! [`thread_shutdown`], all on the thread that made the failing call.

use std::cell::RefCell;

use thiserror::Error;

/// Marker returned by failing engine calls. The message is in the thread's
/// error buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("engine call failed")]
#[must_use = "the error buffer holds the message; capture it"]
pub struct Fault;

/// Result of an engine call.
pub type Status<T> = Result<T, Fault>;

/// Failure produced inside a kernel, possibly on a worker thread.
///
/// Converted to a buffer entry on the calling thread by the operation wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpError {
    pub domain: &'static str,
    pub message: String,
}

impl OpError {
    pub fn new(domain: &'static str, message: impl Into<String>) -> Self {
        Self { domain, message: message.into() }
    }

    /// Moves this failure into the calling thread's buffer.
    pub fn record(self) -> Fault {
        error(self.domain, &self.message)
    }
}

pub(crate) type OpResult<T> = Result<T, OpError>;

#[derive(Default)]
struct ThreadState {
    errors: String,
}

thread_local! {
    static STATE: RefCell<Option<ThreadState>> = const { RefCell::new(None) };
}

/// Appends an error line to the calling thread's buffer and returns [`Fault`].
pub fn error(domain: &str, message: &str) -> Fault {
    tracing::trace!(domain, message, "engine error");
    STATE.with(|s| {
        let mut s = s.borrow_mut();
        let state = s.get_or_insert_with(ThreadState::default);
        state.errors.push_str(domain);
        state.errors.push_str(": ");
        state.errors.push_str(message);
        state.errors.push('\n');
    });
    Fault
}

/// Current contents of the calling thread's error buffer.
pub fn error_buffer() -> String {
    STATE.with(|s| {
        s.borrow()
            .as_ref()
            .map(|state| state.errors.clone())
            .unwrap_or_default()
    })
}

/// Empties the calling thread's error buffer.
pub fn error_clear() {
    STATE.with(|s| {
        if let Some(state) = s.borrow_mut().as_mut() {
            state.errors.clear();
        }
    });
}

/// Releases all engine state held by the calling thread.
///
/// Safe to call on a thread that never touched the engine.
pub fn thread_shutdown() {
    STATE.with(|s| {
        s.borrow_mut().take();
    });
}

/// Returns true if the calling thread currently holds engine state.
pub fn thread_has_state() -> bool {
    STATE.with(|s| s.borrow().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_accumulates_and_clears() {
        error_clear();
        let _ = error("rot", "bad angle");
        let _ = error("extract_area", "bad extract area");
        assert_eq!(error_buffer(), "rot: bad angle\nextract_area: bad extract area\n");
        error_clear();
        assert_eq!(error_buffer(), "");
        assert!(thread_has_state());
        thread_shutdown();
        assert!(!thread_has_state());
    }

    #[test]
    fn buffer_is_per_thread() {
        let _ = error("black", "bad dimensions");
        let other = std::thread::spawn(error_buffer).join().unwrap();
        assert_eq!(other, "");
        assert!(error_buffer().contains("black: bad dimensions"));
        thread_shutdown();
    }

    #[test]
    fn op_error_records_on_caller() {
        let fault = OpError::new("linear", "vector must have 1 or 3 elements").record();
        assert_eq!(fault, Fault);
        assert!(error_buffer().starts_with("linear: vector"));
        thread_shutdown();
    }
}
