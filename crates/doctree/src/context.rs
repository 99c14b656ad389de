//! Editor context passed into every core operation
//!
//! Reads take anything implementing [`ActiveEditor`]; mutations take the
//! concrete [`EditorHandle`] mutably, which is what keeps them single-writer.

use crate::dirty::{DirtyTracker, DirtyType};
use crate::error::{DocumentError, Result};
use crate::types::Operation;
use uuid::Uuid;

/// What the core needs to know about the editor driving it
pub trait ActiveEditor {
    fn dirty_type(&self) -> DirtyType;

    /// Whether the current scope forbids mutation
    fn is_read_only(&self) -> bool;

    /// Mutation counter, see [`DirtyTracker::epoch`]
    fn epoch(&self) -> u64;
}

/// Concrete editor context: identity, dirty state and mode
#[derive(Debug, Clone)]
pub struct EditorHandle {
    id: Uuid,
    dirty: DirtyTracker,
    read_only: bool,
}

impl EditorHandle {
    /// A writable handle with a clean dirty state
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            dirty: DirtyTracker::new(),
            read_only: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub(crate) fn dirty_mut(&mut self) -> &mut DirtyTracker {
        &mut self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: DirtyTracker) {
        self.dirty = dirty;
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Fail `op` when the handle is in read-only mode
    pub fn ensure_writable(&self, op: Operation) -> Result<()> {
        if self.read_only {
            tracing::warn!(editor = %self.id, %op, "mutation attempted in read-only mode");
            return Err(DocumentError::ReadOnly(op));
        }
        Ok(())
    }
}

impl Default for EditorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveEditor for EditorHandle {
    fn dirty_type(&self) -> DirtyType {
        self.dirty.dirty_type()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn epoch(&self) -> u64 {
        self.dirty.epoch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_blocks_mutation() {
        let mut handle = EditorHandle::new();
        assert!(handle.ensure_writable(Operation::Append).is_ok());

        handle.set_read_only(true);
        assert_eq!(
            handle.ensure_writable(Operation::Append),
            Err(DocumentError::ReadOnly(Operation::Append))
        );
        assert!(handle.is_read_only());
    }

    #[test]
    fn test_handles_have_distinct_ids() {
        assert_ne!(EditorHandle::new().id(), EditorHandle::new().id());
    }
}
