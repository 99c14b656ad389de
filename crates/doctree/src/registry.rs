//! Node type registry
//!
//! Maps user-facing type tags to the capability they are built on, so
//! custom types like `"heading"` or `"image"` get the rules of their variant.

use crate::error::{DocumentError, Result};
use crate::types::Capability;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub const ROOT_TYPE: &str = "root";
pub const PARAGRAPH_TYPE: &str = "paragraph";
pub const TEXT_TYPE: &str = "text";

fn default_true() -> bool {
    true
}

/// Registration entry for one node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub node_type: String,
    pub capability: Capability,
    #[serde(default)]
    pub inline: bool,
    #[serde(default = "default_true")]
    pub can_be_empty: bool,
}

impl NodeSpec {
    fn new(node_type: impl Into<String>, capability: Capability) -> Self {
        Self {
            node_type: node_type.into(),
            capability,
            inline: false,
            can_be_empty: true,
        }
    }

    /// Block-level element
    pub fn element(node_type: impl Into<String>) -> Self {
        Self::new(node_type, Capability::Element)
    }

    pub fn text(node_type: impl Into<String>) -> Self {
        Self::new(node_type, Capability::Text).inline(true)
    }

    pub fn decorator(node_type: impl Into<String>) -> Self {
        Self::new(node_type, Capability::Decorator)
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn can_be_empty(mut self, can_be_empty: bool) -> Self {
        self.can_be_empty = can_be_empty;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    specs: AHashMap<String, NodeSpec>,
}

impl NodeRegistry {
    /// Registry holding the built-in `root`, `paragraph` and `text` types
    pub fn new() -> Self {
        let mut specs = AHashMap::new();
        for spec in [
            NodeSpec::new(ROOT_TYPE, Capability::Root).can_be_empty(false),
            NodeSpec::element(PARAGRAPH_TYPE),
            NodeSpec::text(TEXT_TYPE),
        ] {
            specs.insert(spec.node_type.clone(), spec);
        }
        Self { specs }
    }

    pub fn register(&mut self, spec: NodeSpec) -> Result<()> {
        if spec.capability == Capability::Root {
            return Err(DocumentError::InvalidNodeType {
                expected: "element, text or decorator".to_string(),
                actual: format!("{} ({})", spec.node_type, spec.capability),
            });
        }
        if self.specs.contains_key(&spec.node_type) {
            return Err(DocumentError::DuplicateType(spec.node_type));
        }
        tracing::debug!(
            node_type = %spec.node_type,
            capability = %spec.capability,
            "registered node type"
        );
        self.specs.insert(spec.node_type.clone(), spec);
        Ok(())
    }

    pub fn get(&self, node_type: &str) -> Result<&NodeSpec> {
        self.specs
            .get(node_type)
            .ok_or_else(|| DocumentError::UnregisteredType(node_type.to_string()))
    }

    /// Look up `node_type` and check it is built on `capability`
    pub fn expect(&self, node_type: &str, capability: Capability) -> Result<&NodeSpec> {
        let spec = self.get(node_type)?;
        if spec.capability != capability {
            return Err(DocumentError::InvalidNodeType {
                expected: capability.to_string(),
                actual: format!("{} ({})", node_type, spec.capability),
            });
        }
        Ok(spec)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.specs.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.len(), 3);
        assert!(registry.expect(PARAGRAPH_TYPE, Capability::Element).is_ok());
        assert!(registry.expect(TEXT_TYPE, Capability::Text).is_ok());
        assert!(!registry.get(ROOT_TYPE).unwrap().can_be_empty);
    }

    #[test]
    fn test_register_custom_types() {
        let mut registry = NodeRegistry::new();
        registry
            .register(NodeSpec::element("list").can_be_empty(false))
            .unwrap();
        registry
            .register(NodeSpec::decorator("image").inline(true))
            .unwrap();

        assert!(!registry.get("list").unwrap().can_be_empty);
        assert!(registry.get("image").unwrap().inline);
        assert_eq!(
            registry.register(NodeSpec::element("list")),
            Err(DocumentError::DuplicateType("list".to_string()))
        );
    }

    #[test]
    fn test_second_root_type_rejected() {
        let mut registry = NodeRegistry::new();
        let spec = NodeSpec::new("shadow-root", Capability::Root);
        assert!(matches!(
            registry.register(spec),
            Err(DocumentError::InvalidNodeType { .. })
        ));
    }

    #[test]
    fn test_capability_mismatch() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.expect(TEXT_TYPE, Capability::Element),
            Err(DocumentError::InvalidNodeType { .. })
        ));
        assert_eq!(
            registry.get("heading").unwrap_err(),
            DocumentError::UnregisteredType("heading".to_string())
        );
    }

    #[test]
    fn test_spec_from_config_json() {
        let spec: NodeSpec =
            serde_json::from_str(r#"{"node_type": "mention", "capability": "decorator"}"#).unwrap();
        assert_eq!(spec.capability, Capability::Decorator);
        assert!(!spec.inline);
        assert!(spec.can_be_empty);
    }
}
