//! Selection produced by `select`

use crate::types::NodeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointType {
    Text,
    Element,
}

/// A caret position: a character offset in a text node, or a child index in
/// an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Range { anchor: Point, focus: Point },
    Node { keys: Vec<NodeKey> },
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Selection::Range {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Range { anchor, focus } => anchor == focus,
            Selection::Node { .. } => false,
        }
    }

    /// Whether the selection points into `key`
    pub fn references(&self, key: NodeKey) -> bool {
        match self {
            Selection::Range { anchor, focus } => anchor.key == key || focus.key == key,
            Selection::Node { keys } => keys.contains(&key),
        }
    }
}
