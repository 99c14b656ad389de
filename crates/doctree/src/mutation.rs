//! Structural and content mutations
//!
//! Every operation validates everything it needs before touching the tree,
//! so a failed call never leaves a partial mutation behind. Structural
//! checks run before the read-only check: misuse of the root is reported as
//! an invariant violation in every mode.

use crate::context::EditorHandle;
use crate::document::Document;
use crate::error::{DocumentError, InvariantViolation, Result};
use crate::node::DocNode;
use crate::selection::{Point, PointType, Selection};
use crate::types::{NodeKey, Operation, TextMode, ROOT_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

impl Document {
    /// Append `children` to `parent` in order. Children already attached
    /// elsewhere are moved.
    pub fn append(
        &mut self,
        editor: &mut EditorHandle,
        parent: NodeKey,
        children: &[NodeKey],
    ) -> Result<()> {
        let op = Operation::Append;
        self.ensure_container(parent, op)?;
        if parent == ROOT_KEY {
            self.validate_root_children(children, op)?;
        }
        for &child in children {
            self.ensure_insertable(child, parent, op)?;
        }
        editor.ensure_writable(op)?;

        for &child in children {
            self.detach(editor, child)?;
            self.arena.get_mut(child)?.parent = Some(parent);
            if let Some(element) = self.arena.get_mut(parent)?.element_mut() {
                element.children.push(child);
            }
            self.mark_dirty(editor, child)?;
        }
        self.mark_dirty(editor, parent)?;

        tracing::debug!(parent, count = children.len(), "appended children");
        Ok(())
    }

    /// Insert `node` as the previous sibling of `target`
    pub fn insert_before(
        &mut self,
        editor: &mut EditorHandle,
        target: NodeKey,
        node: NodeKey,
    ) -> Result<NodeKey> {
        self.insert_sibling(editor, target, node, Side::Before)
    }

    /// Insert `node` as the next sibling of `target`
    pub fn insert_after(
        &mut self,
        editor: &mut EditorHandle,
        target: NodeKey,
        node: NodeKey,
    ) -> Result<NodeKey> {
        self.insert_sibling(editor, target, node, Side::After)
    }

    fn insert_sibling(
        &mut self,
        editor: &mut EditorHandle,
        target: NodeKey,
        node: NodeKey,
        side: Side,
    ) -> Result<NodeKey> {
        let op = match side {
            Side::Before => Operation::InsertBefore,
            Side::After => Operation::InsertAfter,
        };
        self.guard_root(target, op)?;
        if node == target {
            return Err(InvariantViolation::SelfReference { op, key: node }.into());
        }
        let parent = self.parent_of(target, op)?;
        if parent == ROOT_KEY {
            self.validate_root_children(&[node], op)?;
        }
        self.ensure_insertable(node, parent, op)?;
        editor.ensure_writable(op)?;

        // Detach first: `node` may be an earlier sibling of `target`
        self.detach(editor, node)?;
        let index = self.index_in_parent(parent, target)?;
        let index = match side {
            Side::Before => index,
            Side::After => index + 1,
        };
        self.arena.get_mut(node)?.parent = Some(parent);
        if let Some(element) = self.arena.get_mut(parent)?.element_mut() {
            element.children.insert(index, node);
        }
        self.mark_dirty(editor, node)?;
        self.mark_dirty(editor, parent)?;

        tracing::debug!(%op, target, node, "inserted sibling");
        Ok(node)
    }

    /// Detach `key` from its parent. Ancestors left childless that cannot
    /// be empty are removed as well, stopping below the root.
    pub fn remove(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<()> {
        let op = Operation::Remove;
        self.guard_root(key, op)?;
        editor.ensure_writable(op)?;

        let mut parent = self.arena.get(key)?.parent;
        self.detach(editor, key)?;
        if self.selection.as_ref().is_some_and(|s| s.references(key)) {
            self.selection = None;
        }

        while let Some(current) = parent {
            let node = self.arena.get(current)?;
            if node.is_root() || node.child_count() > 0 || node.can_be_empty() {
                break;
            }
            parent = node.parent;
            tracing::trace!(key = current, "removing emptied ancestor");
            self.detach(editor, current)?;
        }

        tracing::debug!(key, "removed node");
        Ok(())
    }

    /// Put `with` in the place of `target`; `target` ends up detached
    pub fn replace(
        &mut self,
        editor: &mut EditorHandle,
        target: NodeKey,
        with: NodeKey,
    ) -> Result<NodeKey> {
        let op = Operation::Replace;
        self.guard_root(target, op)?;
        if with == target {
            return Err(InvariantViolation::SelfReference { op, key: with }.into());
        }
        let parent = self.parent_of(target, op)?;
        if parent == ROOT_KEY {
            self.validate_root_children(&[with], op)?;
        }
        self.ensure_insertable(with, parent, op)?;
        editor.ensure_writable(op)?;

        self.detach(editor, with)?;
        let index = self.index_in_parent(parent, target)?;
        if let Some(element) = self.arena.get_mut(parent)?.element_mut() {
            element.children[index] = with;
        }
        self.arena.get_mut(target)?.parent = None;
        self.arena.get_mut(with)?.parent = Some(parent);
        if self.selection.as_ref().is_some_and(|s| s.references(target)) {
            self.selection = None;
        }
        self.mark_dirty(editor, with)?;
        self.mark_dirty(editor, parent)?;

        tracing::debug!(target, with, "replaced node");
        Ok(with)
    }

    /// Place a collapsed selection at the end of `key`
    pub fn select(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<Selection> {
        let op = Operation::Select;
        self.guard_root(key, op)?;
        editor.ensure_writable(op)?;

        let node = self.arena.get(key)?;
        let selection = if let Some(text) = node.text() {
            Selection::collapsed(Point {
                key,
                offset: text.chars().count(),
                kind: PointType::Text,
            })
        } else if node.is_element() {
            Selection::collapsed(Point {
                key,
                offset: node.child_count(),
                kind: PointType::Element,
            })
        } else {
            Selection::Node { keys: vec![key] }
        };

        self.selection = Some(selection.clone());
        Ok(selection)
    }

    /// Detach every child of `key`
    pub fn clear(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<()> {
        let op = Operation::Clear;
        self.ensure_container(key, op)?;
        editor.ensure_writable(op)?;

        let children = self.arena.get(key)?.children().to_vec();
        for child in children {
            self.detach(editor, child)?;
        }
        self.mark_dirty(editor, key)?;
        Ok(())
    }

    /// Copy `key` under a fresh key, without children or parent
    pub fn clone_node(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<NodeKey> {
        let op = Operation::Clone;
        self.guard_root(key, op)?;
        editor.ensure_writable(op)?;

        let next = self.arena.next_key();
        let copy = self
            .arena
            .get(key)?
            .duplicate(next)
            .ok_or(InvariantViolation::RootOperation { op })?;
        let copy_key = self.arena.insert_with(|_| copy);
        self.mark_dirty(editor, copy_key)?;
        Ok(copy_key)
    }

    pub fn set_text(
        &mut self,
        editor: &mut EditorHandle,
        key: NodeKey,
        text: impl Into<String>,
    ) -> Result<()> {
        editor.ensure_writable(Operation::SetText)?;
        self.expect_text_mut(key)?.text = text.into();
        self.mark_dirty(editor, key)
    }

    pub fn set_text_mode(
        &mut self,
        editor: &mut EditorHandle,
        key: NodeKey,
        mode: TextMode,
    ) -> Result<()> {
        editor.ensure_writable(Operation::SetText)?;
        self.expect_text_mut(key)?.mode = mode;
        self.mark_dirty(editor, key)
    }

    pub fn set_directionless(
        &mut self,
        editor: &mut EditorHandle,
        key: NodeKey,
        directionless: bool,
    ) -> Result<()> {
        editor.ensure_writable(Operation::SetText)?;
        self.expect_text_mut(key)?.directionless = directionless;
        self.mark_dirty(editor, key)
    }

    pub fn set_decorator_text(
        &mut self,
        editor: &mut EditorHandle,
        key: NodeKey,
        text: impl Into<String>,
    ) -> Result<()> {
        editor.ensure_writable(Operation::SetText)?;
        let node = self.arena.get_mut(key)?;
        let actual = node.node_type.clone();
        let decorator = node.decorator_mut().ok_or(DocumentError::InvalidNodeType {
            expected: "decorator".to_string(),
            actual,
        })?;
        decorator.text = text.into();
        self.mark_dirty(editor, key)
    }

    /// Switch an element or decorator between inline and block display
    pub fn set_inline(
        &mut self,
        editor: &mut EditorHandle,
        key: NodeKey,
        inline: bool,
    ) -> Result<()> {
        let op = Operation::SetInline;
        self.guard_root(key, op)?;
        editor.ensure_writable(op)?;
        let node = self.arena.get_mut(key)?;
        let capability = node.capability();
        if let Some(element) = node.element_mut() {
            element.inline = inline;
        } else if let Some(decorator) = node.decorator_mut() {
            decorator.inline = inline;
        } else {
            return Err(DocumentError::InvalidNodeType {
                expected: "element or decorator".to_string(),
                actual: capability.to_string(),
            });
        }
        self.mark_dirty(editor, key)
    }

    // Helpers

    fn expect_text_mut(&mut self, key: NodeKey) -> Result<&mut crate::node::TextData> {
        let node = self.arena.get_mut(key)?;
        let actual = node.node_type.clone();
        node.text_data_mut().ok_or(DocumentError::InvalidNodeType {
            expected: "text".to_string(),
            actual,
        })
    }

    fn ensure_container(&self, key: NodeKey, op: Operation) -> Result<&DocNode> {
        let node = self.arena.get(key)?;
        if !node.is_element() {
            return Err(InvariantViolation::NotAContainer {
                op,
                key,
                capability: node.capability(),
            }
            .into());
        }
        Ok(node)
    }

    /// `node` may go under `parent`: it is not the root and not an ancestor
    fn ensure_insertable(&self, node: NodeKey, parent: NodeKey, op: Operation) -> Result<()> {
        self.guard_movable(node, op)?;
        if self.arena.is_ancestor_or_self(node, parent)? {
            return Err(InvariantViolation::CycleDetected {
                op,
                parent,
                child: node,
            }
            .into());
        }
        Ok(())
    }

    fn parent_of(&self, key: NodeKey, op: Operation) -> Result<NodeKey> {
        self.arena
            .get(key)?
            .parent
            .ok_or_else(|| InvariantViolation::Detached { op, key }.into())
    }

    fn index_in_parent(&self, parent: NodeKey, key: NodeKey) -> Result<usize> {
        self.arena
            .get(parent)?
            .children()
            .iter()
            .position(|&child| child == key)
            .ok_or(DocumentError::NodeNotFound(key))
    }

    /// Unlink `key` from its parent, if any, marking the old parent dirty
    fn detach(&mut self, editor: &mut EditorHandle, key: NodeKey) -> Result<()> {
        let Some(parent) = self.arena.get(key)?.parent else {
            return Ok(());
        };
        if let Some(element) = self.arena.get_mut(parent)?.element_mut() {
            element.children.retain(|child| *child != key);
        }
        self.arena.get_mut(key)?.parent = None;
        self.mark_dirty(editor, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NodeRegistry, NodeSpec};
    use crate::types::TextContentOptions;
    use std::sync::Arc;

    struct Fixture {
        doc: Document,
        editor: EditorHandle,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = NodeRegistry::new();
            registry
                .register(NodeSpec::element("list").can_be_empty(false))
                .unwrap();
            registry.register(NodeSpec::element("listitem")).unwrap();
            registry.register(NodeSpec::decorator("image")).unwrap();
            Self {
                doc: Document::with_registry(Arc::new(registry), 16),
                editor: EditorHandle::new(),
            }
        }

        fn paragraph(&mut self, text: &str) -> (NodeKey, NodeKey) {
            let block = self.doc.create_paragraph(&mut self.editor).unwrap();
            let leaf = self.doc.create_text(&mut self.editor, text).unwrap();
            self.doc.append(&mut self.editor, block, &[leaf]).unwrap();
            (block, leaf)
        }

        fn text(&self) -> String {
            self.doc
                .text_content(&self.editor, ROOT_KEY, TextContentOptions::default())
                .unwrap()
        }
    }

    #[test]
    fn test_append_moves_attached_node() {
        let mut f = Fixture::new();
        let (a, leaf) = f.paragraph("x");
        let (b, _) = f.paragraph("y");
        f.doc.append(&mut f.editor, ROOT_KEY, &[a, b]).unwrap();

        f.doc.append(&mut f.editor, b, &[leaf]).unwrap();
        assert!(f.doc.children(a).unwrap().is_empty());
        assert_eq!(f.doc.parent(leaf).unwrap(), Some(b));
        assert_eq!(f.text(), "\n\nyx");
    }

    #[test]
    fn test_append_into_leaf_fails() {
        let mut f = Fixture::new();
        let (_, leaf) = f.paragraph("x");
        let other = f.doc.create_text(&mut f.editor, "y").unwrap();
        let err = f.doc.append(&mut f.editor, leaf, &[other]).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invariant(InvariantViolation::NotAContainer { .. })
        ));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut f = Fixture::new();
        let outer = f.doc.create_paragraph(&mut f.editor).unwrap();
        let (inner, _) = f.paragraph("x");
        f.doc.append(&mut f.editor, outer, &[inner]).unwrap();

        let err = f.doc.append(&mut f.editor, inner, &[outer]).unwrap_err();
        assert_eq!(
            err,
            DocumentError::Invariant(InvariantViolation::CycleDetected {
                op: Operation::Append,
                parent: inner,
                child: outer,
            })
        );
        assert_eq!(f.doc.parent(inner).unwrap(), Some(outer));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("a");
        let (b, _) = f.paragraph("b");
        let (c, _) = f.paragraph("c");
        f.doc.append(&mut f.editor, ROOT_KEY, &[b]).unwrap();

        f.doc.insert_before(&mut f.editor, b, a).unwrap();
        f.doc.insert_after(&mut f.editor, b, c).unwrap();
        assert_eq!(f.doc.children(ROOT_KEY).unwrap(), &[a, b, c]);

        // Moving within the same parent
        f.doc.insert_after(&mut f.editor, c, a).unwrap();
        assert_eq!(f.doc.children(ROOT_KEY).unwrap(), &[b, c, a]);
        assert_eq!(f.text(), "b\n\nc\n\na");
    }

    #[test]
    fn test_text_cannot_become_root_sibling() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("a");
        f.doc.append(&mut f.editor, ROOT_KEY, &[a]).unwrap();
        let loose = f.doc.create_text(&mut f.editor, "loose").unwrap();

        let err = f.doc.insert_after(&mut f.editor, a, loose).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invariant(InvariantViolation::RootChild { .. })
        ));
        assert_eq!(f.doc.children(ROOT_KEY).unwrap(), &[a]);
    }

    #[test]
    fn test_sibling_ops_need_a_parent() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("a");
        let (b, _) = f.paragraph("b");
        assert_eq!(
            f.doc.insert_after(&mut f.editor, a, b).unwrap_err(),
            DocumentError::Invariant(InvariantViolation::Detached {
                op: Operation::InsertAfter,
                key: a,
            })
        );
        assert_eq!(
            f.doc.insert_before(&mut f.editor, a, a).unwrap_err(),
            DocumentError::Invariant(InvariantViolation::SelfReference {
                op: Operation::InsertBefore,
                key: a,
            })
        );
    }

    #[test]
    fn test_remove_prunes_ancestors_that_cannot_be_empty() {
        let mut f = Fixture::new();
        let list = f.doc.create_element(&mut f.editor, "list").unwrap();
        let item = f.doc.create_element(&mut f.editor, "listitem").unwrap();
        let leaf = f.doc.create_text(&mut f.editor, "only").unwrap();
        f.doc.append(&mut f.editor, item, &[leaf]).unwrap();
        f.doc.append(&mut f.editor, list, &[item]).unwrap();
        f.doc.append(&mut f.editor, ROOT_KEY, &[list]).unwrap();

        // listitem may be empty, so it stays
        f.doc.remove(&mut f.editor, leaf).unwrap();
        assert_eq!(f.doc.parent(item).unwrap(), Some(list));

        // list may not, so it follows its last item out
        f.doc.remove(&mut f.editor, item).unwrap();
        assert!(f.doc.children(ROOT_KEY).unwrap().is_empty());
        assert_eq!(f.doc.parent(list).unwrap(), None);
    }

    #[test]
    fn test_replace() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("old");
        let (b, _) = f.paragraph("new");
        f.doc.append(&mut f.editor, ROOT_KEY, &[a]).unwrap();

        assert_eq!(f.doc.replace(&mut f.editor, a, b).unwrap(), b);
        assert_eq!(f.doc.children(ROOT_KEY).unwrap(), &[b]);
        assert_eq!(f.doc.parent(a).unwrap(), None);
        assert_eq!(f.text(), "new");
    }

    #[test]
    fn test_select_variants() {
        let mut f = Fixture::new();
        let (block, leaf) = f.paragraph("héllo");
        let image = f
            .doc
            .create_decorator(&mut f.editor, "image", "")
            .unwrap();

        let text_sel = f.doc.select(&mut f.editor, leaf).unwrap();
        assert_eq!(
            text_sel,
            Selection::collapsed(Point {
                key: leaf,
                offset: 5,
                kind: PointType::Text
            })
        );
        let block_sel = f.doc.select(&mut f.editor, block).unwrap();
        assert!(block_sel.is_collapsed());
        assert_eq!(
            f.doc.select(&mut f.editor, image).unwrap(),
            Selection::Node { keys: vec![image] }
        );
        assert_eq!(f.doc.selection(), Some(&Selection::Node { keys: vec![image] }));
    }

    #[test]
    fn test_clone_node() {
        let mut f = Fixture::new();
        let (block, leaf) = f.paragraph("copy me");
        let copy = f.doc.clone_node(&mut f.editor, leaf).unwrap();
        assert_ne!(copy, leaf);
        assert_eq!(f.doc.node(copy).unwrap().text(), Some("copy me"));
        assert_eq!(f.doc.parent(copy).unwrap(), None);

        let block_copy = f.doc.clone_node(&mut f.editor, block).unwrap();
        assert!(f.doc.children(block_copy).unwrap().is_empty());
    }

    #[test]
    fn test_content_setters_check_type() {
        let mut f = Fixture::new();
        let (block, leaf) = f.paragraph("a");
        f.doc.set_text(&mut f.editor, leaf, "b").unwrap();
        assert_eq!(f.doc.node(leaf).unwrap().text(), Some("b"));
        assert!(matches!(
            f.doc.set_text(&mut f.editor, block, "c"),
            Err(DocumentError::InvalidNodeType { .. })
        ));
        assert!(matches!(
            f.doc.set_decorator_text(&mut f.editor, leaf, "c"),
            Err(DocumentError::InvalidNodeType { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("a");
        let (b, _) = f.paragraph("b");
        f.doc.append(&mut f.editor, ROOT_KEY, &[a, b]).unwrap();
        f.doc.clear(&mut f.editor, ROOT_KEY).unwrap();
        assert!(f.doc.children(ROOT_KEY).unwrap().is_empty());
        assert_eq!(f.text(), "");
    }

    #[test]
    fn test_mutations_refused_in_read_only_mode() {
        let mut f = Fixture::new();
        let (a, _) = f.paragraph("a");
        f.editor.set_read_only(true);
        assert_eq!(
            f.doc.append(&mut f.editor, ROOT_KEY, &[a]),
            Err(DocumentError::ReadOnly(Operation::Append))
        );
        assert_eq!(
            f.doc.create_paragraph(&mut f.editor),
            Err(DocumentError::ReadOnly(Operation::Create))
        );
    }
}
