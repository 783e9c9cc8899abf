//! Reflective node and edge substrate for a sea-of-nodes compiler graph.
//!
//! # Core Components
//!
//! - **Kinds** (`kind.rs`): node kind declarations and categories
//! - **Classes** (`class.rs`): per-kind edge schema and field layout
//! - **Registry** (`registry.rs`): concurrent kind to class cache
//! - **Nodes** (`node.rs`, `edge_list.rs`): slot tables and back-edges
//! - **Graph** (`graph.rs`): arena and mutation protocol
//! - **Iteration** (`iter.rs`): edge walks and detached cursors
//! - **GVN** (`gvn.rs`): value numbering over node payloads
//!
//! # Design Principles
//!
//! - **One schema per kind**: generic graph code never matches on kinds
//! - **Exact back-edges**: every edge has one usage or predecessor entry
//! - **Typed handles**: nodes refer to each other through [`NodeId`]

pub mod arena;
pub mod class;
pub mod data;
pub mod edge_list;
pub mod error;
pub mod graph;
pub mod gvn;
pub mod iter;
pub mod kind;
pub mod node;
pub mod nodes;
pub mod registry;

// Re-export commonly used types
pub use arena::{Arena, Id};
pub use class::{CalcOffset, DefaultLayout, EdgeKind, NOT_ITERABLE, NodeClass, Position};
pub use data::{DataObject, DataType, DataValue};
pub use edge_list::EdgeList;
pub use error::{GraphError, GraphResult, SchemaError, SchemaResult};
pub use graph::{Graph, GraphConfig};
pub use gvn::{GvnConfig, GvnStats, ValueNumberTable};
pub use iter::{EdgeCursor, EdgePositions, Edges};
pub use kind::{FieldDecl, FieldTags, FieldType, NodeCategories, NodeKind};
pub use node::{Node, NodeId};
pub use registry::{NodeClassRegistry, global_registry, node_class};
