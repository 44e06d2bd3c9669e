//! Stable identifiers for knowledge items.
//!
//! Facts and rules live in arenas owned by the knowledge base and refer to each
//! other through [`FactId`] / [`RuleId`] rather than references, so the cyclic
//! support graph never fights the borrow checker. Both id kinds are drawn from
//! one [`IdAllocator`], which makes ids unique across the whole store.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::{IdError, KbResult};

/// Identifier of a stored fact.
///
/// Uses `NonZeroU64` so that `Option<FactId>` is the same size as `FactId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FactId(NonZeroU64);

/// Identifier of a stored rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RuleId(NonZeroU64);

impl FactId {
    /// Create a `FactId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(FactId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl RuleId {
    /// Create a `RuleId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(RuleId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fact:{}", self.0)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule:{}", self.0)
    }
}

/// Monotonic id allocator starting from 1.
///
/// Ids are never reused: a retracted item's id stays dead, so a stale id can
/// only ever miss, never alias a newer item.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create a new allocator that starts from id 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    #[cfg(test)]
    fn starting_from(start: u64) -> Self {
        Self { next: start.max(1) }
    }

    fn next_raw(&mut self) -> KbResult<NonZeroU64> {
        let raw = NonZeroU64::new(self.next).ok_or(IdError::AllocatorExhausted)?;
        self.next = self.next.checked_add(1).unwrap_or(0);
        Ok(raw)
    }

    /// Allocate the next fact id.
    pub fn next_fact(&mut self) -> KbResult<FactId> {
        self.next_raw().map(FactId)
    }

    /// Allocate the next rule id.
    pub fn next_rule(&mut self) -> KbResult<RuleId> {
        self.next_raw().map(RuleId)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<FactId>>(),
            std::mem::size_of::<FactId>()
        );
        assert_eq!(
            std::mem::size_of::<Option<RuleId>>(),
            std::mem::size_of::<RuleId>()
        );
    }

    #[test]
    fn id_zero_is_none() {
        assert!(FactId::new(0).is_none());
        assert_eq!(RuleId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn allocator_shares_sequence_across_kinds() {
        let mut alloc = IdAllocator::new();
        let a = alloc.next_fact().unwrap();
        let b = alloc.next_rule().unwrap();
        let c = alloc.next_fact().unwrap();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(c.get(), 3);
    }

    #[test]
    fn allocator_exhaustion_is_an_error() {
        let mut alloc = IdAllocator::starting_from(u64::MAX);
        assert_eq!(alloc.next_fact().unwrap().get(), u64::MAX);
        assert!(alloc.next_rule().is_err());
    }

    #[test]
    fn id_display() {
        assert_eq!(FactId::new(7).unwrap().to_string(), "fact:7");
        assert_eq!(RuleId::new(9).unwrap().to_string(), "rule:9");
    }
}
