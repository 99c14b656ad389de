//! Editor - owner of a document and its update scopes
//!
//! This handles:
//! - Exclusive update scopes, rolled back when the closure fails
//! - Structural repair (the root is never left childless)
//! - Commit: garbage collection, dirty flush, listener dispatch
//! - Read scopes in read-only mode

use crate::arena::Journal;
use crate::context::{ActiveEditor, EditorHandle};
use crate::dirty::DirtyType;
use crate::document::Document;
use crate::error::Result;
use crate::registry::{NodeRegistry, NodeSpec, PARAGRAPH_TYPE};
use crate::types::{Capability, NodeKey, TextContentOptions, ROOT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Configuration for an editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub namespace: String,
    /// Custom node types on top of the built-ins
    pub nodes: Vec<NodeSpec>,
    /// Element type inserted when the root would otherwise be empty
    pub default_block: String,
    pub initial_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            namespace: "doctree".to_string(),
            nodes: Vec::new(),
            default_block: PARAGRAPH_TYPE.to_string(),
            initial_capacity: 256,
        }
    }
}

/// What a committed update changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub dirty_type: DirtyType,
    pub dirty_elements: Vec<NodeKey>,
    pub dirty_leaves: Vec<NodeKey>,
    /// Nodes whose presentation must be rebuilt rather than patched
    pub replaced: Vec<NodeKey>,
    /// Detached nodes dropped by the commit
    pub collected: usize,
    /// Pre-existing nodes the update wrote to
    pub touched: usize,
    pub epoch: u64,
}

/// Observer of committed updates
pub trait UpdateListener: Send {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    fn on_update(&mut self, summary: &UpdateSummary, document: &Document, editor: &EditorHandle);
}

pub struct Editor {
    config: EditorConfig,
    document: Document,
    handle: EditorHandle,
    listeners: Vec<Box<dyn UpdateListener>>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let mut registry = NodeRegistry::new();
        for spec in &config.nodes {
            registry.register(spec.clone())?;
        }
        registry.expect(&config.default_block, Capability::Element)?;

        let document = Document::with_registry(Arc::new(registry), config.initial_capacity);
        let mut handle = EditorHandle::new();
        handle.set_read_only(true);

        tracing::info!(namespace = %config.namespace, editor = %handle.id(), "editor created");
        Ok(Self {
            config,
            document,
            handle,
            listeners: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.handle.id()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn handle(&self) -> &EditorHandle {
        &self.handle
    }

    pub fn register_update_listener(&mut self, listener: Box<dyn UpdateListener>) {
        tracing::debug!("Registered update listener: {}", listener.name());
        self.listeners.push(listener);
    }

    /// Run `f` with write access. On error the document and dirty state are
    /// restored to what they were before the call.
    ///
    /// Undo goes through the arena journal, so only the nodes the update
    /// touches are copied.
    pub fn update<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document, &mut EditorHandle) -> Result<T>,
    {
        let previous_selection = self.document.selection.clone();
        let previous_dirty = self.handle.dirty().clone();
        self.document.arena.begin_journal();
        self.handle.set_read_only(false);

        let outcome = match f(&mut self.document, &mut self.handle) {
            Ok(value) => self.repair_root().map(|()| value),
            Err(err) => Err(err),
        };
        self.handle.set_read_only(true);

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    editor = %self.handle.id(),
                    error = %err,
                    "update failed, rolling back"
                );
                self.document.arena.rollback_journal();
                self.document.selection = previous_selection;
                // The entry may hold text of the abandoned tree
                self.document.invalidate_root_cache();
                self.handle.set_dirty(previous_dirty);
                return Err(err);
            }
        };

        let journal = self.document.arena.close_journal().unwrap_or_default();
        let summary = self.commit(&journal)?;
        self.notify(&summary);
        Ok(value)
    }

    /// Run `f` in read-only mode
    pub fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Document, &EditorHandle) -> T,
    {
        f(&self.document, &self.handle)
    }

    /// Whole-document text content
    pub fn text_content(&self) -> Result<String> {
        self.read(|doc, editor| doc.text_content(editor, ROOT_KEY, TextContentOptions::default()))
    }

    /// Flag every node dirty and commit
    pub fn mark_all_dirty(&mut self) -> Result<()> {
        self.update(|doc, editor| doc.mark_all_dirty(editor))
    }

    /// A root that cannot be empty gets a default block
    fn repair_root(&mut self) -> Result<()> {
        let root = self.document.root()?;
        if root.can_be_empty() || root.child_count() > 0 {
            return Ok(());
        }
        let block = self
            .document
            .create_element(&mut self.handle, &self.config.default_block)?;
        self.document.append(&mut self.handle, ROOT_KEY, &[block])?;
        tracing::debug!(block, "inserted default block into empty root");
        Ok(())
    }

    fn commit(&mut self, journal: &Journal) -> Result<UpdateSummary> {
        let collected = self.document.collect_garbage()?;
        let dirty = self.handle.dirty_mut().take();
        self.document.clear_dirty_flags();

        let dirty_elements = live_sorted(&self.document, dirty.elements.keys().copied());
        let dirty_leaves = live_sorted(&self.document, dirty.leaves.iter().copied());

        let replaced = dirty_elements
            .iter()
            .chain(&dirty_leaves)
            .copied()
            .filter(|&key| match (self.document.node(key), journal.previous(key)) {
                (Ok(next), Some(prev)) => next.needs_full_replace(prev),
                _ => false,
            })
            .collect();

        let summary = UpdateSummary {
            dirty_type: dirty.dirty_type,
            dirty_elements,
            dirty_leaves,
            replaced,
            collected,
            touched: journal.touched(),
            epoch: self.handle.epoch(),
        };
        tracing::debug!(
            editor = %self.handle.id(),
            dirty_type = ?summary.dirty_type,
            elements = summary.dirty_elements.len(),
            leaves = summary.dirty_leaves.len(),
            collected,
            touched = summary.touched,
            "update committed"
        );
        Ok(summary)
    }

    fn notify(&mut self, summary: &UpdateSummary) {
        if summary.dirty_type == DirtyType::NoDirtyNodes {
            return;
        }
        for listener in &mut self.listeners {
            tracing::trace!(listener = listener.name(), "dispatching update");
            listener.on_update(summary, &self.document, &self.handle);
        }
    }
}

/// Keys that survived garbage collection, in key order
fn live_sorted(document: &Document, keys: impl Iterator<Item = NodeKey>) -> Vec<NodeKey> {
    let mut keys: Vec<NodeKey> = keys.filter(|&key| document.arena().contains(key)).collect();
    keys.sort_unstable();
    keys
}
