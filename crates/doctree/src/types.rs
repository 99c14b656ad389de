//! Core type definitions shared by every layer
//!
//! Key design principles:
//! 1. Use u32 keys into the arena, never pointers
//! 2. Parent links are keys too, so nothing owns its parent
//! 3. Use SmallVec for child lists (most blocks hold a handful of children)
//! 4. Capabilities are a closed enum checked with `match`, not runtime checks

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Node key (index into the arena)
/// Keys are handed out monotonically and never reused within a document
pub type NodeKey = u32;

/// The root always occupies the first slot
pub const ROOT_KEY: NodeKey = 0;

/// Child list of an element-capable node
pub type Children = SmallVec<[NodeKey; 4]>;

/// Separator emitted after a non-inline element that is not the last child
pub const DOUBLE_LINE_BREAK: &str = "\n\n";

/// What a node is able to do, independent of its user-facing type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Root,
    Element,
    Text,
    Decorator,
}

impl Capability {
    /// Root is an element variant: both may own children
    pub fn is_element(self) -> bool {
        matches!(self, Capability::Root | Capability::Element)
    }

    pub fn is_decorator(self) -> bool {
        self == Capability::Decorator
    }

    pub fn is_text(self) -> bool {
        self == Capability::Text
    }

    /// Capabilities allowed directly under the root
    pub fn is_block_capable(self) -> bool {
        matches!(self, Capability::Element | Capability::Decorator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Root => "root",
            Capability::Element => "element",
            Capability::Text => "text",
            Capability::Decorator => "decorator",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editing behaviour of a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    #[default]
    Normal,
    /// Edited as a single unit
    Token,
    /// Deleted word by word
    Segmented,
    /// Not editable and excluded from text content unless asked for
    Inert,
}

/// Flags for text-content extraction
///
/// `include_directionless` is tri-state on purpose: only an explicit
/// `Some(false)` strips directionless text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextContentOptions {
    pub include_inert: bool,
    pub include_directionless: Option<bool>,
}

impl TextContentOptions {
    pub const fn new(include_inert: bool, include_directionless: Option<bool>) -> Self {
        Self {
            include_inert,
            include_directionless,
        }
    }

    /// Whether a cached root text may answer a call with these flags.
    ///
    /// Only `(include_inert = true, include_directionless = Some(false))`
    /// refuses the cache.
    pub fn can_reuse_cache(&self) -> bool {
        !self.include_inert || self.include_directionless != Some(false)
    }

    /// Flags the root cache is populated with
    pub fn is_canonical(&self) -> bool {
        *self == Self::default()
    }
}

/// Tree operations, named in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Append,
    InsertBefore,
    InsertAfter,
    Remove,
    Replace,
    Select,
    Clone,
    Clear,
    SetText,
    SetInline,
    MarkDirty,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Append => "append",
            Operation::InsertBefore => "insert_before",
            Operation::InsertAfter => "insert_after",
            Operation::Remove => "remove",
            Operation::Replace => "replace",
            Operation::Select => "select",
            Operation::Clone => "clone",
            Operation::Clear => "clear",
            Operation::SetText => "set_text",
            Operation::SetInline => "set_inline",
            Operation::MarkDirty => "mark_dirty",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_element_capable_but_not_block() {
        assert!(Capability::Root.is_element());
        assert!(!Capability::Root.is_block_capable());
        assert!(Capability::Decorator.is_block_capable());
        assert!(!Capability::Text.is_block_capable());
    }

    #[test]
    fn test_cache_reuse_matrix() {
        let reusable = [
            (false, None),
            (false, Some(false)),
            (false, Some(true)),
            (true, None),
            (true, Some(true)),
        ];
        for (inert, directionless) in reusable {
            assert!(
                TextContentOptions::new(inert, directionless).can_reuse_cache(),
                "({inert}, {directionless:?}) should reuse"
            );
        }
        assert!(!TextContentOptions::new(true, Some(false)).can_reuse_cache());
    }

    #[test]
    fn test_canonical_options() {
        assert!(TextContentOptions::default().is_canonical());
        assert!(!TextContentOptions::new(false, Some(true)).is_canonical());
    }
}
