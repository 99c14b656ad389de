//! Presentation mount helpers
//!
//! The core does not render anything. A host surface asks for a [`MountPlan`]
//! describing what should be visible: its editable content, the placeholder
//! when the document is blank, and one host value per decorator node.

use crate::context::{ActiveEditor, EditorHandle};
use crate::document::Document;
use crate::editor::{Editor, UpdateListener, UpdateSummary};
use crate::error::Result;
use crate::node::DocNode;
use crate::registry::PARAGRAPH_TYPE;
use crate::types::{NodeKey, TextContentOptions, ROOT_KEY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether the whole-document text is empty. Always false while composing.
pub fn is_root_text_content_empty<E>(
    doc: &Document,
    editor: &E,
    composing: bool,
    trim: bool,
) -> Result<bool>
where
    E: ActiveEditor + ?Sized,
{
    if composing {
        return Ok(false);
    }
    let text = doc.text_content(editor, ROOT_KEY, TextContentOptions::default())?;
    let text = if trim { text.trim() } else { text.as_str() };
    Ok(text.is_empty())
}

/// The placeholder shows only over a single empty paragraph
pub fn can_show_placeholder<E>(doc: &Document, editor: &E, composing: bool) -> Result<bool>
where
    E: ActiveEditor + ?Sized,
{
    if !is_root_text_content_empty(doc, editor, composing, true)? {
        return Ok(false);
    }

    let children = doc.children(ROOT_KEY)?;
    if children.len() > 1 {
        return Ok(false);
    }
    for &block in children {
        let block = doc.node(block)?;
        if !block.is_element() || block.node_type() != PARAGRAPH_TYPE {
            return Ok(false);
        }
        for &child in block.children() {
            if !doc.node(child)?.is_text() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Decorator keys in document order
pub fn collect_decorators(doc: &Document) -> Result<Vec<NodeKey>> {
    let mut keys = Vec::new();
    doc.arena().traverse_df(ROOT_KEY, |node| {
        if node.is_decorator() {
            keys.push(node.key());
        }
        Ok(())
    })?;
    Ok(keys)
}

/// What a host should display for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan<C> {
    pub content: C,
    pub placeholder: Option<C>,
    pub decorators: Vec<(NodeKey, C)>,
}

/// Rich-text mount over host content type `C`
#[derive(Debug, Clone)]
pub struct RichTextMount<C> {
    pub content_editable: C,
    pub placeholder: C,
    /// Leave the existing document alone on attach
    pub skip_init: bool,
}

impl<C: Clone> RichTextMount<C> {
    pub fn new(content_editable: C, placeholder: C) -> Self {
        Self {
            content_editable,
            placeholder,
            skip_init: false,
        }
    }

    pub fn skip_init(mut self, skip_init: bool) -> Self {
        self.skip_init = skip_init;
        self
    }

    /// Reset the document to a single empty default block
    pub fn attach(&self, editor: &mut Editor) -> Result<()> {
        if self.skip_init {
            tracing::debug!(editor = %editor.id(), "mount attached without init");
            return Ok(());
        }
        let default_block = editor.config().default_block.clone();
        editor.update(|doc, handle| {
            doc.clear(handle, ROOT_KEY)?;
            let block = doc.create_element(handle, &default_block)?;
            doc.append(handle, ROOT_KEY, &[block])
        })?;
        tracing::debug!(editor = %editor.id(), "mount attached");
        Ok(())
    }

    /// Build the current plan. `resolve` maps a decorator node to host
    /// content; decorators it declines are left out.
    pub fn plan<F>(&self, editor: &Editor, composing: bool, mut resolve: F) -> Result<MountPlan<C>>
    where
        F: FnMut(&DocNode) -> Option<C>,
    {
        editor.read(|doc, handle| {
            let placeholder = can_show_placeholder(doc, handle, composing)?
                .then(|| self.placeholder.clone());

            let mut decorators = Vec::new();
            for key in collect_decorators(doc)? {
                if let Some(content) = resolve(doc.node(key)?) {
                    decorators.push((key, content));
                }
            }

            Ok(MountPlan {
                content: self.content_editable.clone(),
                placeholder,
                decorators,
            })
        })
    }
}

/// Tracks placeholder visibility across commits
#[derive(Debug, Clone)]
pub struct PlaceholderWatcher {
    visible: Arc<AtomicBool>,
}

impl PlaceholderWatcher {
    pub fn new(initially_visible: bool) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(initially_visible)),
        }
    }

    /// Shared flag, readable after the watcher is boxed into an editor
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.visible.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

impl UpdateListener for PlaceholderWatcher {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn on_update(&mut self, _summary: &UpdateSummary, document: &Document, editor: &EditorHandle) {
        match can_show_placeholder(document, editor, false) {
            Ok(visible) => self.visible.store(visible, Ordering::Release),
            Err(err) => tracing::warn!(error = %err, "placeholder check failed"),
        }
    }
}
