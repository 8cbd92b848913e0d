//! Workspace-wide error type.
//!
//! The scheduling core recognizes exactly three failure kinds (see
//! `spec.md` §7): allocation failure while enqueuing a task, an unknown
//! strategy name at `install` time, and a developer-error assertion. All
//! three are considered fatal by convention — callers are expected to log
//! and abort rather than attempt partial recovery, because a scheduler
//! cannot safely drop a task without leaking its dependents.

use core::fmt;

/// A scheduling-core failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Allocation failed while enqueuing a task (heap node or list node).
    ///
    /// Fatal: the scheduler must never silently drop a task, so the caller
    /// should log and abort the context rather than retry indefinitely.
    Oom,
    /// `install` was asked for a strategy name the registry doesn't know.
    ///
    /// Non-fatal on its own: callers fall back to the `"ll"` strategy and
    /// log a warning, per `spec.md` §7.
    UnknownModule,
    /// A developer-error invariant was violated (double-enqueue, heap
    /// corruption, negative size, ...).
    ///
    /// Debug builds should treat this as an abort-worthy assertion failure;
    /// release builds may instead choose to ignore the check entirely,
    /// depending on the `debug_assertions` cfg at the call site.
    Assertion(&'static str),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oom => write!(f, "out of memory while scheduling a task"),
            Self::UnknownModule => write!(f, "unknown scheduler module"),
            Self::Assertion(msg) => write!(f, "scheduler assertion failed: {msg}"),
        }
    }
}

impl core::error::Error for SchedError {}

/// Convenience alias for fallible scheduler operations.
pub type Result<T> = core::result::Result<T, SchedError>;
