//! Per-worker task scheduling core for DAG-based dense linear algebra
//! runtimes: a priority max-heap, an intrusive ready-queue list, and four
//! pluggable scheduling strategies behind a common `Schedule` contract.
//!
//! Built on [`dague_core`] for identifiers, the error type, synchronization
//! primitives, and logging; this crate adds the scheduling-specific data
//! structures and strategies on top.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod context;
pub mod heap;
pub mod list;
pub mod module;
pub mod registry;
pub mod slots;
pub mod strategies;
pub mod task;

pub use context::{Context, ExecutionUnit, VirtualProcess};
pub use heap::Heap;
pub use list::{Linked, List};
pub use module::Schedule;
pub use registry::Registry;
pub use task::{cmp_priority, Chain, Link, Task, TaskIdentity, TaskLinks};
