//! Core types and synchronization primitives for the `dague-sched` scheduling core.
//!
//! This crate contains host-testable abstractions shared by every scheduler
//! strategy: identifiers for virtual processes and execution units, the
//! workspace-wide error type, a spin lock and startup barrier, and a
//! pluggable leveled-logging facade. By living outside `dague-sched`, these
//! types can be tested with `cargo test` and `loom` on the host without
//! pulling in any strategy-specific logic.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod id;
pub mod log;
mod loom;
pub mod sync;
