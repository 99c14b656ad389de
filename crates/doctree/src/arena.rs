//! Arena-based node storage
//!
//! Nodes live in one slot table and refer to each other by key:
//!
//! ```text
//! Arena: Vec<Option<DocNode>>
//!        [root][node1][  --  ][node3]...
//!                      ↑ released by garbage collection, key never reused
//! ```
//!
//! Child lists and parent links are keys, so there is no cyclic ownership
//! and traversal is O(1) in both directions.
//!
//! While a journal is open, the first mutable access to a pre-existing slot
//! saves a copy of the node. Rolling back restores those copies and drops the
//! slots allocated since, so an update costs O(touched nodes) to undo.

use crate::error::{DocumentError, Result};
use crate::node::DocNode;
use crate::types::NodeKey;
use ahash::AHashMap;

/// Pre-images of the nodes touched since `begin_journal`
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    base_len: usize,
    base_live: usize,
    saved: AHashMap<NodeKey, DocNode>,
}

impl Journal {
    /// The node as it was when the journal opened. `None` when it was never
    /// touched or did not exist yet.
    pub(crate) fn previous(&self, key: NodeKey) -> Option<&DocNode> {
        self.saved.get(&key)
    }

    pub(crate) fn touched(&self) -> usize {
        self.saved.len()
    }
}

/// Slot table for document nodes
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Option<DocNode>>,
    live: usize,
    journal: Option<Journal>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            live: 0,
            journal: None,
        }
    }

    /// Key the next inserted node will get
    pub fn next_key(&self) -> NodeKey {
        self.nodes.len() as NodeKey
    }

    /// Allocate a slot and build the node for it
    pub fn insert_with<F>(&mut self, build: F) -> NodeKey
    where
        F: FnOnce(NodeKey) -> DocNode,
    {
        let key = self.next_key();
        self.nodes.push(Some(build(key)));
        self.live += 1;
        key
    }

    pub fn get(&self, key: NodeKey) -> Result<&DocNode> {
        self.nodes
            .get(key as usize)
            .and_then(Option::as_ref)
            .ok_or(DocumentError::NodeNotFound(key))
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Result<&mut DocNode> {
        self.record(key);
        self.nodes
            .get_mut(key as usize)
            .and_then(Option::as_mut)
            .ok_or(DocumentError::NodeNotFound(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.get(key).is_ok()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocNode> {
        self.nodes.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DocNode> {
        if self.journal.is_some() {
            for key in 0..self.next_key() {
                self.record(key);
            }
        }
        self.nodes.iter_mut().flatten()
    }

    /// Start recording pre-images. An open journal is replaced.
    pub(crate) fn begin_journal(&mut self) {
        self.journal = Some(Journal {
            base_len: self.nodes.len(),
            base_live: self.live,
            saved: AHashMap::new(),
        });
    }

    /// Stop recording and hand back what was touched
    pub(crate) fn close_journal(&mut self) -> Option<Journal> {
        self.journal.take()
    }

    /// Restore every slot to its state at `begin_journal`
    pub(crate) fn rollback_journal(&mut self) -> bool {
        let Some(journal) = self.journal.take() else {
            return false;
        };
        self.nodes.truncate(journal.base_len);
        for (key, node) in journal.saved {
            if let Some(slot) = self.nodes.get_mut(key as usize) {
                *slot = Some(node);
            }
        }
        self.live = journal.base_live;
        true
    }

    fn record(&mut self, key: NodeKey) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if key as usize >= journal.base_len || journal.saved.contains_key(&key) {
            return;
        }
        if let Some(Some(node)) = self.nodes.get(key as usize) {
            journal.saved.insert(key, node.clone());
        }
    }

    /// Traverse depth-first in document order, without recursion
    pub fn traverse_df<F>(&self, start: NodeKey, mut visit: F) -> Result<()>
    where
        F: FnMut(&DocNode) -> Result<()>,
    {
        let mut stack = vec![start];

        while let Some(key) = stack.pop() {
            let node = self.get(key)?;
            visit(node)?;

            // Reverse so children come out left-to-right
            for &child in node.children().iter().rev() {
                stack.push(child);
            }
        }

        Ok(())
    }

    /// True when `ancestor` is `key` itself or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> Result<bool> {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return Ok(true);
            }
            current = self.get(k)?.parent;
        }
        Ok(false)
    }

    /// Release every node not reachable from `root`. Returns how many went.
    pub fn retain_reachable(&mut self, root: NodeKey) -> Result<usize> {
        let mut reachable = vec![false; self.nodes.len()];
        self.traverse_df(root, |node| {
            reachable[node.key as usize] = true;
            Ok(())
        })?;

        let mut released = 0;
        for (slot, keep) in self.nodes.iter_mut().zip(reachable) {
            if !keep && slot.take().is_some() {
                released += 1;
            }
        }
        self.live -= released;
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ElementData, NodeBody, TextData};

    fn paragraph(key: NodeKey) -> DocNode {
        DocNode::new(key, "paragraph", NodeBody::Element(ElementData::default()))
    }

    fn text(key: NodeKey, value: &str) -> DocNode {
        DocNode::new(
            key,
            "text",
            NodeBody::Text(TextData {
                text: value.to_string(),
                ..TextData::default()
            }),
        )
    }

    /// paragraph(0) -> [text(1) "a", text(2) "b"], plus a detached text(3)
    fn small_tree() -> NodeArena {
        let mut arena = NodeArena::new();
        let block = arena.insert_with(paragraph);
        let a = arena.insert_with(|k| text(k, "a"));
        let b = arena.insert_with(|k| text(k, "b"));
        arena.insert_with(|k| text(k, "loose"));

        for child in [a, b] {
            arena.get_mut(child).unwrap().parent = Some(block);
            arena
                .get_mut(block)
                .unwrap()
                .element_mut()
                .unwrap()
                .children
                .push(child);
        }
        arena
    }

    #[test]
    fn test_arena_basic() {
        let mut arena = NodeArena::new();
        let key = arena.insert_with(paragraph);
        assert_eq!(key, 0);
        assert_eq!(arena.get(key).unwrap().node_type(), "paragraph");
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(42).unwrap_err(), DocumentError::NodeNotFound(42));
    }

    #[test]
    fn test_traverse_df() {
        let arena = small_tree();
        let mut visited = Vec::new();
        arena
            .traverse_df(0, |node| {
                visited.push(node.key());
                Ok(())
            })
            .unwrap();
        assert_eq!(visited, vec![0, 1, 2]);
    }

    #[test]
    fn test_ancestry() {
        let arena = small_tree();
        assert!(arena.is_ancestor_or_self(0, 2).unwrap());
        assert!(arena.is_ancestor_or_self(2, 2).unwrap());
        assert!(!arena.is_ancestor_or_self(1, 2).unwrap());
    }

    #[test]
    fn test_retain_reachable_keeps_keys_stable() {
        let mut arena = small_tree();
        assert_eq!(arena.retain_reachable(0).unwrap(), 1);
        assert_eq!(arena.len(), 3);
        assert!(!arena.contains(3));

        // Released slots are never handed out again
        assert_eq!(arena.insert_with(paragraph), 4);
    }

    #[test]
    fn test_rollback_restores_touched_and_drops_new() {
        let mut arena = small_tree();
        arena.begin_journal();

        arena.get_mut(1).unwrap().text_data_mut().unwrap().text = "changed".to_string();
        arena.get_mut(1).unwrap().text_data_mut().unwrap().text = "twice".to_string();
        let fresh = arena.insert_with(paragraph);
        assert_eq!(arena.len(), 5);

        assert!(arena.rollback_journal());
        assert_eq!(arena.get(1).unwrap().text(), Some("a"));
        assert!(!arena.contains(fresh));
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.next_key(), fresh);
        assert!(!arena.rollback_journal());
    }

    #[test]
    fn test_journal_saves_first_pre_image_only() {
        let mut arena = small_tree();
        arena.begin_journal();
        arena.get_mut(2).unwrap().text_data_mut().unwrap().text = "x".to_string();
        arena.get_mut(2).unwrap().text_data_mut().unwrap().text = "y".to_string();
        let fresh = arena.insert_with(paragraph);
        arena.get_mut(fresh).unwrap();

        let journal = arena.close_journal().unwrap();
        assert_eq!(journal.touched(), 1);
        assert_eq!(journal.previous(2).unwrap().text(), Some("b"));
        assert!(journal.previous(0).is_none());
        assert!(journal.previous(fresh).is_none());

        // Closed: further writes are not recorded
        arena.get_mut(0).unwrap();
        assert!(arena.close_journal().is_none());
    }
}
