//! The `Schedule` module contract every strategy implements (spec §4.2).

use core::ptr::NonNull;

use dague_core::error::Result;
use dague_core::sync::Barrier;

use crate::context::{Context, ExecutionUnit};
use crate::task::{Chain, Task};

/// A pluggable scheduling strategy.
///
/// Implementations own whatever per-VP or per-EU storage they need; the
/// trait only fixes the lifecycle and submission protocol every strategy
/// must honor. Methods take `&self` because every EU thread calls into the
/// same strategy object concurrently — any state that isn't read-only lives
/// behind a lock or an `UnsafeCell` the implementation is responsible for
/// synchronizing.
pub trait Schedule<T: Task>: Send + Sync {
    /// Called once, process-wide, before any EU starts running. Allocates
    /// whatever fixed-size, topology-shaped storage the strategy needs.
    fn install(&self, ctx: &Context) -> Result<()>;

    /// Called once per EU during startup, after `install`. Strategies that
    /// lazily construct shared state (GD/IP's per-VP list) do so here,
    /// behind `barrier` so every EU observes the same initialized object
    /// before `schedule`/`select` can be called.
    fn flow_init(&self, eu: &ExecutionUnit, barrier: &Barrier);

    /// Submits a chain of ready tasks for scheduling on `eu`'s behalf.
    ///
    /// `distance` is a loose locality hint — 0 for tasks unblocked by `eu`
    /// itself, larger values the further the dependency that unblocked them
    /// was from `eu`. Strategies are free to ignore it (spec §6, "Design
    /// Notes": the contract is "smaller is more local", nothing more).
    ///
    /// # Safety
    ///
    /// Every task reachable from `chain` must be live and was
    /// [`Link::NotQueued`](crate::task::Link::NotQueued) immediately before
    /// this call.
    unsafe fn schedule(&self, eu: &ExecutionUnit, chain: Chain<T>, distance: u32) -> Result<()>;

    /// Selects the next task `eu` should run, if any, along with the
    /// distance it was pulled from (0 = local, >0 = stolen from a peer).
    fn select(&self, eu: &ExecutionUnit) -> (Option<NonNull<T>>, u32);

    /// Called once, process-wide, during shutdown. Strategies drop whatever
    /// storage `install` allocated; any tasks still queued are the caller's
    /// problem (spec §4.2 does not define a drain operation).
    fn remove(&self, ctx: &Context);
}
