//! Root node behaviour
//!
//! The root is the element at `ROOT_KEY`. It refuses every operation that
//! would select it or take it out of its slot, accepts only element and
//! decorator children, and caches the whole-document text.
//!
//! Cache lifecycle:
//!
//! ```text
//!            mutation (mark_dirty)
//!   Valid ─────────────────────────► Stale
//!     ▲                                │
//!     └──── canonical recomputation ───┘
//! ```

use crate::context::ActiveEditor;
use crate::dirty::DirtyType;
use crate::document::Document;
use crate::error::{DocumentError, InvariantViolation, Result};
use crate::node::NodeBody;
use crate::types::{NodeKey, Operation, TextContentOptions, ROOT_KEY};
use std::cell::RefCell;

/// Root text computed at `epoch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedText {
    pub text: String,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RootTextCache {
    entry: Option<CachedText>,
    stats: CacheStats,
}

impl RootTextCache {
    pub fn entry(&self) -> Option<&CachedText> {
        self.entry.as_ref()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// `clean` means the editor is read-only or has no dirty nodes
    fn lookup(&mut self, clean: bool, epoch: u64, options: TextContentOptions) -> Option<String> {
        let entry = self.entry.as_ref()?;
        if !(clean || entry.epoch == epoch) || !options.can_reuse_cache() {
            return None;
        }
        self.stats.hits += 1;
        Some(entry.text.clone())
    }

    fn store(&mut self, text: String, epoch: u64) {
        self.entry = Some(CachedText { text, epoch });
    }

    pub(crate) fn invalidate(&mut self) {
        self.entry = None;
    }
}

impl Document {
    fn root_cache(&self) -> Result<&RefCell<RootTextCache>> {
        let root = self.arena.get(ROOT_KEY)?;
        match &root.body {
            NodeBody::Root { cache, .. } => Ok(cache),
            _ => Err(DocumentError::InvalidNodeType {
                expected: "root".to_string(),
                actual: root.node_type.clone(),
            }),
        }
    }

    /// Whole-document text, answered from the cache when no mutation
    /// happened since it was stored and the flags allow reuse
    pub(crate) fn root_text_content<E>(
        &self,
        editor: &E,
        options: TextContentOptions,
    ) -> Result<String>
    where
        E: ActiveEditor + ?Sized,
    {
        let cache = self.root_cache()?;
        let clean = editor.is_read_only() || editor.dirty_type() == DirtyType::NoDirtyNodes;
        let hit = cache.borrow_mut().lookup(clean, editor.epoch(), options);
        if let Some(text) = hit {
            tracing::trace!(epoch = editor.epoch(), "root text cache hit");
            return Ok(text);
        }

        let mut text = String::new();
        self.write_text_content(ROOT_KEY, options, &mut text)?;

        let mut cache = cache.borrow_mut();
        cache.stats.misses += 1;
        if options.is_canonical() {
            cache.store(text.clone(), editor.epoch());
        }
        tracing::trace!(epoch = editor.epoch(), len = text.len(), "root text recomputed");
        Ok(text)
    }

    pub(crate) fn invalidate_root_cache(&self) {
        if let Ok(cache) = self.root_cache() {
            cache.borrow_mut().invalidate();
        }
    }

    /// The cached root text, if currently valid
    pub fn cached_root_text(&self) -> Option<String> {
        let cache = self.root_cache().ok()?;
        let cache = cache.borrow();
        cache.entry().map(|entry| entry.text.clone())
    }

    pub fn root_cache_stats(&self) -> CacheStats {
        self.root_cache()
            .map(|cache| cache.borrow().stats())
            .unwrap_or_default()
    }

    /// Fail `op` when it targets the root
    pub(crate) fn guard_root(&self, key: NodeKey, op: Operation) -> Result<()> {
        if self.arena.get(key)?.is_root() {
            tracing::warn!(%op, "operation refused on root node");
            return Err(InvariantViolation::RootOperation { op }.into());
        }
        Ok(())
    }

    /// Fail `op` when it would move the root under another node
    pub(crate) fn guard_movable(&self, key: NodeKey, op: Operation) -> Result<()> {
        if self.arena.get(key)?.is_root() {
            return Err(InvariantViolation::RootNotMovable { op }.into());
        }
        Ok(())
    }

    /// Every candidate must be element- or decorator-capable. Checked up front
    /// so a bad argument leaves the tree untouched.
    pub(crate) fn validate_root_children(&self, children: &[NodeKey], op: Operation) -> Result<()> {
        for &key in children {
            self.guard_movable(key, op)?;
            let capability = self.arena.get(key)?.capability();
            if !capability.is_block_capable() {
                tracing::warn!(key, %capability, "rejected root child");
                return Err(InvariantViolation::RootChild { key, capability }.into());
            }
        }
        Ok(())
    }
}
