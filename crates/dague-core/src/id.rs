//! Type-safe identifiers for scheduler resources.
//!
//! These newtypes prevent accidental mixing of virtual-process indices,
//! execution-unit indices, and handle identifiers at compile time.

use core::fmt;

/// Identifier of a virtual process (a group of execution units that share
/// NUMA locality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VpId(u32);

impl VpId {
    /// Creates a new `VpId`.
    #[must_use]
    pub const fn new(val: u32) -> Self {
        Self(val)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vp{}", self.0)
    }
}

/// Identifier of an execution unit (a worker thread, typically pinned to one core).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EuId(u32);

impl EuId {
    /// Creates a new `EuId`.
    #[must_use]
    pub const fn new(val: u32) -> Self {
        Self(val)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the value as `usize`, convenient for indexing per-EU arrays.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eu{}", self.0)
    }
}

/// Identifier of a submitted DAG handle, carried only for tracing and fatal
/// diagnostics — the scheduler never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HandleId(pub u32);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vp_id_roundtrip() {
        let id = VpId::new(3);
        assert_eq!(id.as_u32(), 3);
    }

    #[test]
    fn eu_id_roundtrip() {
        let id = EuId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.as_usize(), 7);
    }

    #[test]
    fn eu_id_ordering() {
        assert!(EuId::new(1) < EuId::new(2));
    }

    #[test]
    fn eu_id_display() {
        assert_eq!(format!("{}", EuId::new(4)), "eu4");
    }

    #[test]
    fn handle_id_display() {
        assert_eq!(format!("{}", HandleId(9)), "handle9");
    }
}
