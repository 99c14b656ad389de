//! Dirty tracking
//!
//! Records which nodes changed since the last commit. The core only ever
//! escalates this state; resetting it is the commit step's job (`take`).

use crate::types::NodeKey;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// How much of the tree has unflushed mutations. Ordered from clean to dirty.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum DirtyType {
    #[default]
    NoDirtyNodes,
    SomeDirtyNodes,
    FullyDirty,
}

/// Dirty nodes handed over by a flush
#[derive(Debug, Clone, Default)]
pub struct DirtySet {
    pub dirty_type: DirtyType,
    pub leaves: AHashSet<NodeKey>,
    /// Element key -> whether the element itself changed (as opposed to
    /// being marked because a descendant did)
    pub elements: AHashMap<NodeKey, bool>,
}

impl DirtySet {
    pub fn is_empty(&self) -> bool {
        self.dirty_type == DirtyType::NoDirtyNodes
    }

    /// Every dirty key, sorted
    pub fn keys(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self
            .leaves
            .iter()
            .chain(self.elements.keys())
            .copied()
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    pending: DirtySet,
    epoch: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirty_type(&self) -> DirtyType {
        self.pending.dirty_type
    }

    /// Mutation counter. Bumped by every mark, never reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_leaf_dirty(&self, key: NodeKey) -> bool {
        self.pending.leaves.contains(&key)
    }

    pub fn is_element_dirty(&self, key: NodeKey) -> bool {
        self.pending.elements.contains_key(&key)
    }

    /// Whether `key` itself was marked, not just a descendant of it
    pub fn is_intentionally_dirty(&self, key: NodeKey) -> bool {
        self.is_leaf_dirty(key) || self.pending.elements.get(&key).copied().unwrap_or(false)
    }

    /// Raise the dirty type. Never lowers it.
    pub fn escalate(&mut self, to: DirtyType) {
        if to > self.pending.dirty_type {
            tracing::trace!(from = ?self.pending.dirty_type, ?to, "dirty type escalated");
            self.pending.dirty_type = to;
        }
    }

    pub(crate) fn mark_leaf(&mut self, key: NodeKey) {
        self.pending.leaves.insert(key);
        self.touch();
    }

    pub(crate) fn mark_element(&mut self, key: NodeKey, intentional: bool) {
        let entry = self.pending.elements.entry(key).or_insert(false);
        *entry |= intentional;
        self.touch();
    }

    pub(crate) fn mark_fully_dirty(&mut self) {
        self.escalate(DirtyType::FullyDirty);
        self.epoch += 1;
    }

    /// Hand the pending set to the commit step and start clean.
    /// The epoch survives so cache entries stay comparable.
    pub fn take(&mut self) -> DirtySet {
        std::mem::take(&mut self.pending)
    }

    fn touch(&mut self) {
        self.escalate(DirtyType::SomeDirtyNodes);
        self.epoch += 1;
    }
}
