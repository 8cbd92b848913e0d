//! Low-level synchronization primitives used at the scheduler's contention points.
//!
//! The scheduling core only ever needs two primitives: a lock around a
//! single list head (the GD/IP shared list, and each PBQ per-EU list head),
//! and a one-shot startup barrier for `flow_init`. Both are spin-based —
//! the scheduler never expects to block for long, and a spinlock avoids
//! pulling in an OS-specific blocking primitive that wouldn't be available
//! in a `no_std` context.

mod barrier;
mod spinlock;

pub use barrier::Barrier;
pub use spinlock::{SpinLock, SpinLockGuard};
