//! The concrete realization of spec §2's "fixed set of virtual processes;
//! each VP owns a fixed set of execution units; a process-wide context
//! aggregates all VPs".

use alloc::vec::Vec;

use dague_core::id::{EuId, VpId};

/// One worker thread, typically pinned to a core.
pub struct ExecutionUnit {
    id: EuId,
    vp_id: VpId,
    global_index: usize,
    vp_index: usize,
}

impl ExecutionUnit {
    /// This EU's identifier.
    #[must_use]
    pub const fn id(&self) -> EuId {
        self.id
    }

    /// The virtual process this EU belongs to.
    #[must_use]
    pub const fn vp_id(&self) -> VpId {
        self.vp_id
    }

    /// This EU's position in the context's flat EU list; used by strategies
    /// to index their own per-EU storage.
    #[must_use]
    pub const fn global_index(&self) -> usize {
        self.global_index
    }

    /// This EU's owning VP's position in the context's VP list.
    #[must_use]
    pub const fn vp_index(&self) -> usize {
        self.vp_index
    }
}

/// A group of execution units sharing NUMA-locality.
pub struct VirtualProcess {
    id: VpId,
    eu_global_indices: Vec<usize>,
}

impl VirtualProcess {
    /// This VP's identifier.
    #[must_use]
    pub const fn id(&self) -> VpId {
        self.id
    }

    /// Number of EUs belonging to this VP.
    #[must_use]
    pub fn eu_count(&self) -> usize {
        self.eu_global_indices.len()
    }

    /// Maps a VP-local EU index to the context's flat EU index.
    #[must_use]
    pub fn eu_global_index(&self, vp_local: usize) -> usize {
        self.eu_global_indices[vp_local]
    }
}

/// Process-wide aggregation of every virtual process and execution unit.
///
/// `Context::new` takes the per-VP EU counts and builds the VP/EU tree
/// eagerly, since unlike the bootstrapping kernel this spec was distilled
/// from, a userspace runtime knows its full topology before any EU thread
/// starts (see `DESIGN.md`).
pub struct Context {
    vps: Vec<VirtualProcess>,
    eus: Vec<ExecutionUnit>,
}

impl Context {
    /// Builds a context with `vp_eu_counts.len()` virtual processes, the
    /// `i`-th owning `vp_eu_counts[i]` execution units.
    #[must_use]
    pub fn new(vp_eu_counts: &[usize]) -> Self {
        let mut vps = Vec::with_capacity(vp_eu_counts.len());
        let mut eus = Vec::new();
        let mut global = 0usize;

        for (vp_index, &count) in vp_eu_counts.iter().enumerate() {
            let vp_id = VpId::new(vp_index as u32);
            let mut eu_global_indices = Vec::with_capacity(count);
            for _ in 0..count {
                eus.push(ExecutionUnit {
                    id: EuId::new(global as u32),
                    vp_id,
                    global_index: global,
                    vp_index,
                });
                eu_global_indices.push(global);
                global += 1;
            }
            vps.push(VirtualProcess { id: vp_id, eu_global_indices });
        }

        Self { vps, eus }
    }

    /// Number of virtual processes.
    #[must_use]
    pub fn vp_count(&self) -> usize {
        self.vps.len()
    }

    /// Total number of execution units across every VP.
    #[must_use]
    pub fn eu_count(&self) -> usize {
        self.eus.len()
    }

    /// Looks up a VP by its position in the context.
    #[must_use]
    pub fn vp(&self, index: usize) -> &VirtualProcess {
        &self.vps[index]
    }

    /// Looks up an EU by its flat context index.
    #[must_use]
    pub fn eu(&self, global_index: usize) -> &ExecutionUnit {
        &self.eus[global_index]
    }

    /// Every execution unit, in flat context order.
    #[must_use]
    pub fn eus(&self) -> &[ExecutionUnit] {
        &self.eus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_flat_index_across_vps() {
        let ctx = Context::new(&[2, 3]);
        assert_eq!(ctx.vp_count(), 2);
        assert_eq!(ctx.eu_count(), 5);
        assert_eq!(ctx.vp(0).eu_count(), 2);
        assert_eq!(ctx.vp(1).eu_count(), 3);
        assert_eq!(ctx.vp(1).eu_global_index(0), 2);
        assert_eq!(ctx.eu(2).vp_index(), 1);
        assert_eq!(ctx.eu(4).global_index(), 4);
    }
}
