//! Runtime strategy selection, and the `UNKNOWN_MODULE` fallback (spec §7).

use alloc::boxed::Box;

use dague_core::dwarn;
use dague_core::error::{Result, SchedError};
use dague_core::sync::Barrier;

use crate::context::{Context, ExecutionUnit};
use crate::module::Schedule;
use crate::strategies::{Ap, GdIp, Ll, Pbq};
use crate::task::{Chain, Task};
use core::ptr::NonNull;

/// A resolved, installed scheduling strategy.
///
/// Holds a `Box<dyn Schedule<T>>` rather than an enum so strategies stay
/// independently testable modules (spec's "Design Notes": an explicit
/// registry struct, not a static-init component framework).
pub struct Registry<T: Task> {
    strategy: Box<dyn Schedule<T>>,
    name: &'static str,
}

impl<T: Task> Registry<T> {
    /// Resolves `name` to a strategy, strictly: unrecognized names are an
    /// error rather than a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::UnknownModule`] if `name` doesn't match one of
    /// `"gd"`, `"ip"`, `"ap"`, `"ll"`/`"lfq"`, `"pbq"`.
    pub fn try_new(name: &str) -> Result<Self> {
        let (resolved, strategy): (&'static str, Box<dyn Schedule<T>>) = match name {
            "gd" => ("gd", Box::new(GdIp::gd())),
            "ip" => ("ip", Box::new(GdIp::ip())),
            "ap" => ("ap", Box::new(Ap::new())),
            "ll" | "lfq" => ("ll", Box::new(Ll::new())),
            "pbq" => ("pbq", Box::new(Pbq::new())),
            _ => return Err(SchedError::UnknownModule),
        };
        Ok(Self { strategy, name: resolved })
    }

    /// Resolves `name` to a strategy, falling back to `"ll"` with a
    /// `Warn`-level log line on an unrecognized name (spec §7,
    /// `UNKNOWN_MODULE`).
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::try_new(name).unwrap_or_else(|_| {
            dwarn!("unknown scheduler module {name:?}, falling back to ll");
            Self { strategy: Box::new(Ll::new()), name: "ll" }
        })
    }

    /// The resolved strategy name (after any fallback).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Forwards to the resolved strategy's [`Schedule::install`].
    pub fn install(&self, ctx: &Context) -> Result<()> {
        self.strategy.install(ctx)
    }

    /// Forwards to the resolved strategy's [`Schedule::flow_init`].
    pub fn flow_init(&self, eu: &ExecutionUnit, barrier: &Barrier) {
        self.strategy.flow_init(eu, barrier);
    }

    /// Forwards to the resolved strategy's [`Schedule::schedule`].
    ///
    /// # Safety
    ///
    /// Same requirements as [`Schedule::schedule`].
    pub unsafe fn schedule(&self, eu: &ExecutionUnit, chain: Chain<T>, distance: u32) -> Result<()> {
        // SAFETY: forwarded to caller.
        unsafe { self.strategy.schedule(eu, chain, distance) }
    }

    /// Forwards to the resolved strategy's [`Schedule::select`].
    pub fn select(&self, eu: &ExecutionUnit) -> (Option<NonNull<T>>, u32) {
        self.strategy.select(eu)
    }

    /// Forwards to the resolved strategy's [`Schedule::remove`].
    pub fn remove(&self, ctx: &Context) {
        self.strategy.remove(ctx);
    }
}

/// Reads the `SCHEDULER_NAME` environment variable and resolves a
/// [`Registry`] from it, falling back to `"ll"` if the variable is unset or
/// unrecognized.
///
/// Only available with the `std` feature: a `no_std` strategy core has no
/// notion of a process environment, so this lives behind an explicit opt-in
/// the way many `no_std` crates expose host-only conveniences.
#[cfg(feature = "std")]
pub fn install_from_env<T: Task>() -> Registry<T> {
    let name = std::env::var("SCHEDULER_NAME").unwrap_or_else(|_| "ll".into());
    Registry::new(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopTask(crate::task::TaskLinks<NoopTask>);
    unsafe impl Task for NoopTask {
        fn priority(&self) -> i32 {
            0
        }
        fn identity(&self) -> crate::task::TaskIdentity<'_> {
            crate::task::TaskIdentity { function_id: 0, handle_id: 0, locals: &[] }
        }
        unsafe fn links(ptr: NonNull<Self>) -> NonNull<crate::task::TaskLinks<Self>> {
            unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).0)) }
        }
    }

    #[test]
    fn unknown_name_errors_strictly() {
        let err = Registry::<NoopTask>::try_new("bogus").unwrap_err();
        assert_eq!(err, SchedError::UnknownModule);
    }

    #[test]
    fn unknown_name_falls_back_to_ll() {
        let registry = Registry::<NoopTask>::new("bogus");
        assert_eq!(registry.name(), "ll");
    }

    #[test]
    fn recognized_names_resolve() {
        for name in ["gd", "ip", "ap", "ll", "lfq", "pbq"] {
            assert!(Registry::<NoopTask>::try_new(name).is_ok());
        }
    }
}
