//! Node storage and the capability contract shared by every variant
//!
//! A node is a key, a parent back-link, a type tag and a body. The body is a
//! closed enum, so "is this an element?" is a `match` rather than a runtime check.

use crate::root::RootTextCache;
use crate::types::{Capability, Children, NodeKey, TextContentOptions, TextMode};
use std::cell::RefCell;

/// Container payload shared by elements and the root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementData {
    pub children: Children,
    pub inline: bool,
    pub can_be_empty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextData {
    pub text: String,
    pub mode: TextMode,
    pub directionless: bool,
}

/// Out-of-band content. `text` is what the node contributes to text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoratorData {
    pub text: String,
    pub inline: bool,
}

#[derive(Debug, Clone)]
pub enum NodeBody {
    Root {
        element: ElementData,
        cache: RefCell<RootTextCache>,
    },
    Element(ElementData),
    Text(TextData),
    Decorator(DecoratorData),
}

/// A node in the document tree
#[derive(Debug, Clone)]
pub struct DocNode {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) node_type: String,
    pub(crate) body: NodeBody,
    pub(crate) dirty: bool,
}

impl DocNode {
    pub(crate) fn new(key: NodeKey, node_type: impl Into<String>, body: NodeBody) -> Self {
        Self {
            key,
            parent: None,
            node_type: node_type.into(),
            body,
            dirty: false,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Stable type tag, e.g. `"root"`, `"paragraph"`, `"text"`
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn capability(&self) -> Capability {
        match self.body {
            NodeBody::Root { .. } => Capability::Root,
            NodeBody::Element(_) => Capability::Element,
            NodeBody::Text(_) => Capability::Text,
            NodeBody::Decorator(_) => Capability::Decorator,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.body, NodeBody::Root { .. })
    }

    pub fn is_element(&self) -> bool {
        self.capability().is_element()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.body, NodeBody::Text(_))
    }

    pub fn is_decorator(&self) -> bool {
        matches!(self.body, NodeBody::Decorator(_))
    }

    /// Children of an element-capable node; leaves have none
    pub fn children(&self) -> &[NodeKey] {
        match self.element() {
            Some(element) => &element.children,
            None => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.body {
            NodeBody::Root { element, .. } | NodeBody::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.body {
            NodeBody::Root { element, .. } | NodeBody::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text_data(&self) -> Option<&TextData> {
        match &self.body {
            NodeBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn text_data_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.body {
            NodeBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn decorator_mut(&mut self) -> Option<&mut DecoratorData> {
        match &mut self.body {
            NodeBody::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    /// Raw text of a text node, regardless of mode
    pub fn text(&self) -> Option<&str> {
        self.text_data().map(|t| t.text.as_str())
    }

    pub fn is_inline(&self) -> bool {
        match &self.body {
            NodeBody::Root { .. } => false,
            NodeBody::Element(element) => element.inline,
            NodeBody::Text(_) => true,
            NodeBody::Decorator(decorator) => decorator.inline,
        }
    }

    /// Whether structural repair may leave this node childless.
    /// The root never may; leaves have nothing to lose.
    pub fn can_be_empty(&self) -> bool {
        match &self.body {
            NodeBody::Root { .. } => false,
            NodeBody::Element(element) => element.can_be_empty,
            NodeBody::Text(_) | NodeBody::Decorator(_) => true,
        }
    }

    /// Text a leaf contributes under `options`. `None` for containers.
    pub fn leaf_text(&self, options: TextContentOptions) -> Option<&str> {
        match &self.body {
            NodeBody::Text(text) => {
                let hidden_inert = !options.include_inert && text.mode == TextMode::Inert;
                let hidden_directionless =
                    options.include_directionless == Some(false) && text.directionless;
                if hidden_inert || hidden_directionless {
                    Some("")
                } else {
                    Some(&text.text)
                }
            }
            NodeBody::Decorator(decorator) => Some(&decorator.text),
            NodeBody::Root { .. } | NodeBody::Element(_) => None,
        }
    }

    /// Whether the presentation layer has to rebuild this node from scratch
    /// when going from `prev` to `self`. Pure: looks at the two nodes only.
    pub fn needs_full_replace(&self, prev: &DocNode) -> bool {
        match (&prev.body, &self.body) {
            (NodeBody::Root { .. }, NodeBody::Root { .. }) => false,
            _ if prev.node_type != self.node_type => true,
            (NodeBody::Element(a), NodeBody::Element(b)) => a.inline != b.inline,
            (NodeBody::Decorator(a), NodeBody::Decorator(b)) => a.inline != b.inline,
            (NodeBody::Text(_), NodeBody::Text(_)) => false,
            _ => true,
        }
    }

    /// Copy under a fresh key: same type and content, detached, no children.
    /// Returns `None` for the root, which is a singleton.
    pub(crate) fn duplicate(&self, key: NodeKey) -> Option<DocNode> {
        let body = match &self.body {
            NodeBody::Root { .. } => return None,
            NodeBody::Element(element) => NodeBody::Element(ElementData {
                children: Children::new(),
                inline: element.inline,
                can_be_empty: element.can_be_empty,
            }),
            NodeBody::Text(text) => NodeBody::Text(text.clone()),
            NodeBody::Decorator(decorator) => NodeBody::Decorator(decorator.clone()),
        };
        Some(DocNode::new(key, self.node_type.clone(), body))
    }
}
