//! Tree dumper - indented debug rendering of a document
//!
//! ```text
//! (root)
//!   (paragraph)
//!     (text) "hello"
//!   (image) [decorator]
//! ```

use crate::document::Document;
use crate::error::Result;
use crate::node::{DocNode, NodeBody};
use crate::types::{NodeKey, TextMode, ROOT_KEY};
use std::fmt::Write;

/// Dumper configuration
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Longer text is cut on a char boundary and suffixed with "..."
    pub max_text_length: usize,
    /// Prefix every line with the node key
    pub show_keys: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_text_length: 200,
            show_keys: false,
        }
    }
}

pub struct TreeDumper {
    config: DumpConfig,
}

impl TreeDumper {
    pub fn new() -> Self {
        Self::with_config(DumpConfig::default())
    }

    pub fn with_config(config: DumpConfig) -> Self {
        Self { config }
    }

    /// Render the whole document
    pub fn dump(&self, doc: &Document) -> Result<String> {
        self.dump_from(doc, ROOT_KEY)
    }

    /// Render the subtree under `key`
    pub fn dump_from(&self, doc: &Document, key: NodeKey) -> Result<String> {
        let mut output = String::with_capacity(256);
        let mut stack = vec![(key, 0usize)];

        while let Some((key, depth)) = stack.pop() {
            let node = doc.node(key)?;
            self.write_line(node, depth, &mut output);

            for &child in node.children().iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(output)
    }

    fn write_line(&self, node: &DocNode, depth: usize, output: &mut String) {
        output.push_str(&"  ".repeat(depth));
        if self.config.show_keys {
            // Writing to a String cannot fail
            let _ = write!(output, "{} ", node.key());
        }
        output.push('(');
        output.push_str(node.node_type());
        output.push(')');

        match node.body() {
            NodeBody::Text(text) => {
                let capped = cap_text_length(&text.text, self.config.max_text_length);
                let _ = write!(output, " {capped:?}");
                if text.mode != TextMode::Normal {
                    let mode = format!("{:?}", text.mode).to_lowercase();
                    let _ = write!(output, " [{mode}]");
                }
                if text.directionless {
                    output.push_str(" [directionless]");
                }
            }
            NodeBody::Decorator(decorator) => {
                output.push_str(" [decorator]");
                if decorator.inline {
                    output.push_str(" [inline]");
                }
            }
            NodeBody::Element(element) if element.inline => output.push_str(" [inline]"),
            NodeBody::Element(_) | NodeBody::Root { .. } => {}
        }
        if node.is_dirty() {
            output.push_str(" *");
        }
        output.push('\n');
    }
}

impl Default for TreeDumper {
    fn default() -> Self {
        Self::new()
    }
}

/// Cap text at `max_len` bytes without splitting a character
pub fn cap_text_length(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EditorHandle;
    use crate::registry::NodeSpec;
    use crate::registry::NodeRegistry;
    use std::sync::Arc;

    fn sample() -> Document {
        let mut registry = NodeRegistry::new();
        registry.register(NodeSpec::decorator("image")).unwrap();
        let mut doc = Document::with_registry(Arc::new(registry), 8);
        let mut editor = EditorHandle::new();

        let block = doc.create_paragraph(&mut editor).unwrap();
        let text = doc.create_text(&mut editor, "hello").unwrap();
        let image = doc.create_decorator(&mut editor, "image", "").unwrap();
        doc.append(&mut editor, block, &[text]).unwrap();
        doc.append(&mut editor, ROOT_KEY, &[block, image]).unwrap();
        doc.clear_dirty_flags();
        doc
    }

    #[test]
    fn test_dump_shape() {
        let output = TreeDumper::new().dump(&sample()).unwrap();
        assert_eq!(
            output,
            "(root)\n  (paragraph)\n    (text) \"hello\"\n  (image) [decorator]\n"
        );
    }

    #[test]
    fn test_dump_with_keys_and_dirty_marker() {
        let mut doc = sample();
        let mut editor = EditorHandle::new();
        doc.set_text_mode(&mut editor, 2, TextMode::Inert).unwrap();

        let dumper = TreeDumper::with_config(DumpConfig {
            show_keys: true,
            ..DumpConfig::default()
        });
        let output = dumper.dump_from(&doc, 1).unwrap();
        assert_eq!(output, "1 (paragraph) *\n  2 (text) \"hello\" [inert] *\n");
    }

    #[test]
    fn test_cap_text_length() {
        assert_eq!(cap_text_length("hello", 10), "hello");
        assert_eq!(cap_text_length("hello world", 5), "hello...");
        // 'é' is two bytes; never cut through it
        assert_eq!(cap_text_length("héllo", 2), "h...");
    }

    #[test]
    fn test_dump_deep_chain() {
        let mut doc = Document::new();
        let mut editor = EditorHandle::new();
        let mut inner = doc.create_text(&mut editor, "leaf").unwrap();
        for _ in 0..4_000 {
            let block = doc.create_paragraph(&mut editor).unwrap();
            doc.append(&mut editor, block, &[inner]).unwrap();
            inner = block;
        }
        doc.append(&mut editor, ROOT_KEY, &[inner]).unwrap();

        let output = TreeDumper::new().dump(&doc).unwrap();
        assert_eq!(output.lines().count(), 4_002);
        let last = output.lines().last().unwrap();
        assert_eq!(last.trim_start(), "(text) \"leaf\" *");
        assert_eq!(last.len() - last.trim_start().len(), 2 * 4_001);
    }
}
