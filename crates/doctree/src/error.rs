//! Error types for document operations
//!
//! Flat hierarchy. Invariant violations get their own enum so callers can
//! tell programmer misuse apart from lookups that simply missed.

use crate::types::{Capability, NodeKey, Operation};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Cannot call {0} in read-only mode")]
    ReadOnly(Operation),

    #[error("Node type not registered: {0}")]
    UnregisteredType(String),

    #[error("Node type already registered: {0}")]
    DuplicateType(String),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },
}

impl DocumentError {
    /// True when the error signals a broken tree invariant
    pub fn is_invariant(&self) -> bool {
        matches!(self, DocumentError::Invariant(_))
    }
}

/// Structural misuse of the tree. Never transient, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{op}: cannot be called on root nodes")]
    RootOperation { op: Operation },

    #[error(
        "append: only element or decorator nodes can be appended to the root node \
         (node {key} is {capability})"
    )]
    RootChild { key: NodeKey, capability: Capability },

    #[error("{op}: the root node cannot be moved")]
    RootNotMovable { op: Operation },

    #[error("{op}: node {key} is a {capability} node and cannot hold children")]
    NotAContainer {
        op: Operation,
        key: NodeKey,
        capability: Capability,
    },

    #[error("{op}: node {child} cannot be placed inside its own descendant {parent}")]
    CycleDetected {
        op: Operation,
        parent: NodeKey,
        child: NodeKey,
    },

    #[error("{op}: node {key} cannot be placed relative to itself")]
    SelfReference { op: Operation, key: NodeKey },

    #[error("{op}: node {key} has no parent")]
    Detached { op: Operation, key: NodeKey },
}
