//! Error types for schema construction and graph mutation.
//!
//! Every error here is a programmer error. The fallible entry points return
//! them so that validation can be exercised directly; the contract-level
//! entry points hand them to [`fatal`], which never returns.

use std::fmt;

use crate::class::Position;
use crate::node::NodeId;

// =============================================================================
// Schema Errors
// =============================================================================

/// Failure while building or rescanning a node class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field is tagged both input and successor.
    AmbiguousEdge { kind: String, field: &'static str },
    /// An edge-tagged field does not hold a node or the matching list.
    InvalidEdgeType { kind: String, field: &'static str },
    /// A data field holds a primitive other than int or bool.
    UnsupportedDataType { kind: String, field: &'static str },
    /// A data-tagged field holds a node or an edge list.
    InvalidDataType { kind: String, field: &'static str },
    /// An untagged field holds a node or an edge list.
    SuspiciousField { kind: String, field: &'static str },
    /// Two fields share a name.
    DuplicateField { kind: String, field: &'static str },
    /// A rescan disagreed with the original scan.
    SchemaDrift { kind: String, detail: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::AmbiguousEdge { kind, field } => {
                write!(f, "{}.{}: field cannot be both input and successor", kind, field)
            }
            SchemaError::InvalidEdgeType { kind, field } => {
                write!(f, "{}.{}: invalid edge type", kind, field)
            }
            SchemaError::UnsupportedDataType { kind, field } => {
                write!(f, "{}.{}: unsupported data type", kind, field)
            }
            SchemaError::InvalidDataType { kind, field } => {
                write!(f, "{}.{}: data field cannot hold edges", kind, field)
            }
            SchemaError::SuspiciousField { kind, field } => {
                write!(f, "{}.{}: suspicious untagged node field", kind, field)
            }
            SchemaError::DuplicateField { kind, field } => {
                write!(f, "{}.{}: duplicate field name", kind, field)
            }
            SchemaError::SchemaDrift { kind, detail } => {
                write!(f, "{}: schema drift on rescan: {}", kind, detail)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

// =============================================================================
// Graph Errors
// =============================================================================

/// Failure in the graph mutation protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The handle does not name a live node.
    DeadNode(NodeId),
    /// The edge value is not assignable to the slot's element type.
    NotAssignable {
        node: NodeId,
        position: Position,
        value: NodeId,
        expected: String,
    },
    /// The position does not exist in the node's class.
    InvalidPosition { node: NodeId, position: Position },
    /// A list read past its current length.
    IndexOutOfBounds {
        node: NodeId,
        position: Position,
        len: usize,
    },
    /// The node was structurally modified during a traversal.
    ConcurrentModification(NodeId),
    /// No field with that name exists.
    UnknownField { kind: String, field: String },
    /// A data write did not match the declared data type.
    DataTypeMismatch { kind: String, field: String },
    /// An operation required two nodes of the same class.
    ClassMismatch { left: NodeId, right: NodeId },
    /// A node with remaining usages cannot be deleted.
    HasUsages { node: NodeId, count: usize },
    /// Back-edges disagree with forward edges.
    InconsistentBackEdges { node: NodeId, detail: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DeadNode(id) => write!(f, "node {} is not live", id),
            GraphError::NotAssignable {
                node,
                position,
                value,
                expected,
            } => write!(
                f,
                "{}.set({}, {}): value is not assignable to {}",
                node, position, value, expected
            ),
            GraphError::InvalidPosition { node, position } => {
                write!(f, "{}: no slot at {}", node, position)
            }
            GraphError::IndexOutOfBounds {
                node,
                position,
                len,
            } => write!(f, "{}: {} out of bounds (len {})", node, position, len),
            GraphError::ConcurrentModification(id) => {
                write!(f, "node {} modified during traversal", id)
            }
            GraphError::UnknownField { kind, field } => {
                write!(f, "{} has no field {}", kind, field)
            }
            GraphError::DataTypeMismatch { kind, field } => {
                write!(f, "{}.{}: data value has the wrong type", kind, field)
            }
            GraphError::ClassMismatch { left, right } => {
                write!(f, "{} and {} have different node classes", left, right)
            }
            GraphError::HasUsages { node, count } => {
                write!(f, "cannot delete {}: {} usages remain", node, count)
            }
            GraphError::InconsistentBackEdges { node, detail } => {
                write!(f, "inconsistent back-edges at {}: {}", node, detail)
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

// =============================================================================
// Fatal Path
// =============================================================================

/// Report an unrecoverable inconsistency and abort the current compilation.
#[cold]
#[track_caller]
pub fn fatal(err: impl fmt::Display) -> ! {
    tracing::error!(error = %err, "fatal graph inconsistency");
    panic!("{}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::AmbiguousEdge {
            kind: "Add".to_string(),
            field: "x",
        };
        assert_eq!(
            err.to_string(),
            "Add.x: field cannot be both input and successor"
        );
    }

    #[test]
    #[should_panic(expected = "node #7 is not live")]
    fn test_fatal_panics_with_message() {
        fatal(GraphError::DeadNode(NodeId::new(7)));
    }
}
