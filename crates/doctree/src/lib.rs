//! Editable-document core for a structured rich-text model
//!
//! A document is a tree of typed nodes held in an arena. The root is a
//! distinguished element: it can never be selected, removed, replaced or
//! moved, it only accepts block-capable children, and it caches the
//! whole-document text between mutations.
//!
//! ## Core Design
//!
//! ```text
//! Editor::update ─► Document (NodeArena + NodeRegistry) ─► commit
//!        │                  │                               │
//!   EditorHandle ◄── mark_dirty (epoch, dirty sets)    UpdateListener
//! ```
//!
//! - **Keys, not pointers**: nodes reference each other by `NodeKey` (u32)
//! - **Closed bodies**: `Root`, `Element`, `Text`, `Decorator`; custom node
//!   types are string tags registered against one of them
//! - **Single writer**: mutations need `&mut Document` and `&mut EditorHandle`

pub mod arena;
pub mod context;
pub mod dirty;
pub mod document;
pub mod dump;
pub mod editor;
pub mod error;
pub mod mount;
mod mutation;
pub mod node;
pub mod registry;
pub mod root;
pub mod selection;
pub mod types;

pub use arena::NodeArena;
pub use context::{ActiveEditor, EditorHandle};
pub use dirty::{DirtySet, DirtyTracker, DirtyType};
pub use document::Document;
pub use dump::{DumpConfig, TreeDumper};
pub use editor::{Editor, EditorConfig, UpdateListener, UpdateSummary};
pub use error::{DocumentError, InvariantViolation, Result};
pub use mount::{MountPlan, PlaceholderWatcher, RichTextMount};
pub use node::{DocNode, NodeBody};
pub use registry::{NodeRegistry, NodeSpec};
pub use root::{CacheStats, CachedText};
pub use selection::{Point, PointType, Selection};
pub use types::*;
