use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Handle of one cache entry inside the entry pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u64);

/// Chooses a victim when the cache is over budget.
///
/// `evict` must unlink the returned entry from the policy's own bookkeeping;
/// it never returns an entry twice.
pub trait EvictionPolicy: Send + std::fmt::Debug {
    fn on_insert(&mut self, entry: EntryId);
    fn on_access(&mut self, entry: EntryId);
    fn evict(&mut self) -> Option<EntryId>;
}

/// Evicts the least recently accessed entry
#[derive(Debug, Default)]
pub struct LruPolicy {
    order: VecDeque<EntryId>,
}

impl EvictionPolicy for LruPolicy {
    fn on_insert(&mut self, entry: EntryId) {
        self.order.push_back(entry);
    }

    fn on_access(&mut self, entry: EntryId) {
        if let Some(position) = self.order.iter().position(|&e| e == entry) {
            self.order.remove(position);
            self.order.push_back(entry);
        }
    }

    fn evict(&mut self) -> Option<EntryId> {
        self.order.pop_front()
    }
}

/// Evicts in insertion order, ignoring accesses
#[derive(Debug, Default)]
pub struct FifoPolicy {
    order: VecDeque<EntryId>,
}

impl EvictionPolicy for FifoPolicy {
    fn on_insert(&mut self, entry: EntryId) {
        self.order.push_back(entry);
    }

    fn on_access(&mut self, _entry: EntryId) {}

    fn evict(&mut self) -> Option<EntryId> {
        self.order.pop_front()
    }
}

/// Configuration-selectable eviction strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Lru,
    Fifo,
}

impl PolicyKind {
    pub fn create(self) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Lru => Box::<LruPolicy>::default(),
            PolicyKind::Fifo => Box::<FifoPolicy>::default(),
        }
    }
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Lru
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_bumps_accessed_entries() {
        let mut policy = LruPolicy::default();
        policy.on_insert(EntryId(1));
        policy.on_insert(EntryId(2));
        policy.on_insert(EntryId(3));

        policy.on_access(EntryId(1));

        assert_eq!(policy.evict(), Some(EntryId(2)));
        assert_eq!(policy.evict(), Some(EntryId(3)));
        assert_eq!(policy.evict(), Some(EntryId(1)));
        assert_eq!(policy.evict(), None);
    }

    #[test]
    fn fifo_ignores_accesses() {
        let mut policy = FifoPolicy::default();
        policy.on_insert(EntryId(1));
        policy.on_insert(EntryId(2));

        policy.on_access(EntryId(1));

        assert_eq!(policy.evict(), Some(EntryId(1)));
        assert_eq!(policy.evict(), Some(EntryId(2)));
    }
}
