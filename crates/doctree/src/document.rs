//! The document tree
//!
//! Owns the arena and the selection. Every operation takes the editor
//! context explicitly: reads take `&impl ActiveEditor`, mutations take
//! `&mut EditorHandle`.

use crate::arena::NodeArena;
use crate::context::{ActiveEditor, EditorHandle};
use crate::error::Result;
use crate::node::{DecoratorData, DocNode, ElementData, NodeBody, TextData};
use crate::registry::{NodeRegistry, PARAGRAPH_TYPE, ROOT_TYPE, TEXT_TYPE};
use crate::root::RootTextCache;
use crate::selection::Selection;
use crate::types::{
    Capability, Children, NodeKey, Operation, TextContentOptions, DOUBLE_LINE_BREAK, ROOT_KEY,
};
use std::cell::RefCell;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 64;

/// Pending work of the text-content walk
enum TextStep {
    Node(NodeKey),
    Break,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) arena: NodeArena,
    registry: Arc<NodeRegistry>,
    pub(crate) selection: Option<Selection>,
}

impl Document {
    /// Document with the built-in node types and an empty root
    pub fn new() -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), DEFAULT_CAPACITY)
    }

    pub fn with_registry(registry: Arc<NodeRegistry>, capacity: usize) -> Self {
        let mut arena = NodeArena::with_capacity(capacity.max(1));
        let root = arena.insert_with(|key| {
            DocNode::new(
                key,
                ROOT_TYPE,
                NodeBody::Root {
                    element: ElementData::default(),
                    cache: RefCell::new(RootTextCache::default()),
                },
            )
        });
        debug_assert_eq!(root, ROOT_KEY);

        Self {
            arena,
            registry,
            selection: None,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn node(&self, key: NodeKey) -> Result<&DocNode> {
        self.arena.get(key)
    }

    pub fn root(&self) -> Result<&DocNode> {
        self.arena.get(ROOT_KEY)
    }

    pub fn children(&self, key: NodeKey) -> Result<&[NodeKey]> {
        Ok(self.arena.get(key)?.children())
    }

    pub fn parent(&self, key: NodeKey) -> Result<Option<NodeKey>> {
        Ok(self.arena.get(key)?.parent)
    }

    /// Live nodes, detached ones included until the next commit
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Whether `key` hangs off the root
    pub fn is_attached(&self, key: NodeKey) -> Result<bool> {
        self.arena.is_ancestor_or_self(ROOT_KEY, key)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    // Creation

    pub fn create_element(
        &mut self,
        editor: &mut EditorHandle,
        node_type: &str,
    ) -> Result<NodeKey> {
        let spec = self.registry.expect(node_type, Capability::Element)?;
        let body = NodeBody::Element(ElementData {
            children: Children::new(),
            inline: spec.inline,
            can_be_empty: spec.can_be_empty,
        });
        self.create(editor, node_type, body)
    }

    pub fn create_paragraph(&mut self, editor: &mut EditorHandle) -> Result<NodeKey> {
        self.create_element(editor, PARAGRAPH_TYPE)
    }

    pub fn create_text(
        &mut self,
        editor: &mut EditorHandle,
        text: impl Into<String>,
    ) -> Result<NodeKey> {
        self.create_text_of_type(editor, TEXT_TYPE, text)
    }

    pub fn create_text_of_type(
        &mut self,
        editor: &mut EditorHandle,
        node_type: &str,
        text: impl Into<String>,
    ) -> Result<NodeKey> {
        self.registry.expect(node_type, Capability::Text)?;
        let body = NodeBody::Text(TextData {
            text: text.into(),
            ..TextData::default()
        });
        self.create(editor, node_type, body)
    }

    /// `text` is the deterministic text the decorator contributes to text
    /// content; pass an empty string for none
    pub fn create_decorator(
        &mut self,
        editor: &mut EditorHandle,
        node_type: &str,
        text: impl Into<String>,
    ) -> Result<NodeKey> {
        let spec = self.registry.expect(node_type, Capability::Decorator)?;
        let body = NodeBody::Decorator(DecoratorData {
            text: text.into(),
            inline: spec.inline,
        });
        self.create(editor, node_type, body)
    }

    fn create(
        &mut self,
        editor: &mut EditorHandle,
        node_type: &str,
        body: NodeBody,
    ) -> Result<NodeKey> {
        editor.ensure_writable(Operation::Create)?;
        let key = self
            .arena
            .insert_with(|key| DocNode::new(key, node_type, body));
        tracing::trace!(key, node_type, "created node");
        self.mark_dirty(editor, key)?;
        Ok(key)
    }

    // Reads

    /// Text content of `key`. The root answers from its cache when it can.
    pub fn text_content<E>(
        &self,
        editor: &E,
        key: NodeKey,
        options: TextContentOptions,
    ) -> Result<String>
    where
        E: ActiveEditor + ?Sized,
    {
        if key == ROOT_KEY {
            return self.root_text_content(editor, options);
        }
        let mut out = String::new();
        self.write_text_content(key, options, &mut out)?;
        Ok(out)
    }

    /// Uncached concatenation: leaves give their own text, containers join
    /// their children and break after every non-inline element but the last.
    /// Walks with an explicit stack, so nesting depth is bounded by memory.
    pub(crate) fn write_text_content(
        &self,
        key: NodeKey,
        options: TextContentOptions,
        out: &mut String,
    ) -> Result<()> {
        let mut stack = vec![TextStep::Node(key)];

        while let Some(step) = stack.pop() {
            let key = match step {
                TextStep::Node(key) => key,
                TextStep::Break => {
                    out.push_str(DOUBLE_LINE_BREAK);
                    continue;
                }
            };
            let node = self.arena.get(key)?;
            if let Some(text) = node.leaf_text(options) {
                out.push_str(text);
                continue;
            }

            // Pushed in reverse; a break sits under its child's subtree
            let children = node.children();
            let last = children.len().saturating_sub(1);
            for (i, &child) in children.iter().enumerate().rev() {
                let child_node = self.arena.get(child)?;
                if child_node.is_element() && !child_node.is_inline() && i != last {
                    stack.push(TextStep::Break);
                }
                stack.push(TextStep::Node(child));
            }
        }
        Ok(())
    }

    // Dirty marking

    /// Flag `key` and all its ancestors dirty, escalate the dirty state and
    /// drop the root text cache
    pub(crate) fn mark_dirty(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<()> {
        let node = self.arena.get_mut(key)?;
        node.dirty = true;
        let mut parent = node.parent;
        if node.is_element() {
            editor.dirty_mut().mark_element(key, true);
        } else {
            editor.dirty_mut().mark_leaf(key);
        }

        while let Some(ancestor) = parent {
            let node = self.arena.get_mut(ancestor)?;
            node.dirty = true;
            editor.dirty_mut().mark_element(ancestor, false);
            parent = node.parent;
        }

        self.invalidate_root_cache();
        Ok(())
    }

    /// Escalate to fully dirty and flag every node
    pub fn mark_all_dirty(&mut self, editor: &mut EditorHandle) -> Result<()> {
        editor.ensure_writable(Operation::MarkDirty)?;
        editor.dirty_mut().mark_fully_dirty();
        for node in self.arena.iter_mut() {
            node.dirty = true;
        }
        self.invalidate_root_cache();
        Ok(())
    }

    pub(crate) fn clear_dirty_flags(&mut self) {
        for node in self.arena.iter_mut() {
            node.dirty = false;
        }
    }

    /// Drop every node no longer reachable from the root
    pub(crate) fn collect_garbage(&mut self) -> Result<usize> {
        let released = self.arena.retain_reachable(ROOT_KEY)?;
        if self.selection_is_dangling() {
            self.selection = None;
        }
        Ok(released)
    }

    fn selection_is_dangling(&self) -> bool {
        match &self.selection {
            Some(Selection::Range { anchor, focus }) => {
                !self.arena.contains(anchor.key) || !self.arena.contains(focus.key)
            }
            Some(Selection::Node { keys }) => keys.iter().any(|&k| !self.arena.contains(k)),
            None => false,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
