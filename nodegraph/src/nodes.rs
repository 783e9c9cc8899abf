//! Standard node kinds.
//!
//! A small vocabulary covering the shapes the graph has to support: fixed
//! control nodes with direct successors, a merge with a variable number of
//! ends, a phi with an input list, and floating value-numberable arithmetic.

use crate::data::DataValue;
use crate::graph::Graph;
use crate::kind::{FieldDecl, NodeCategories, NodeKind};
use crate::node::NodeId;

/// Comparison condition stored in a [`CompareNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Less than: a < b
    Lt,
    /// Less than or equal: a <= b
    Le,
    /// Equal: a == b
    Eq,
    /// Not equal: a != b
    Ne,
    /// Greater than: a > b
    Gt,
    /// Greater than or equal: a >= b
    Ge,
}

// =============================================================================
// Control Nodes
// =============================================================================

/// Entry of a graph.
pub struct StartNode;

impl NodeKind for StartNode {
    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::successor("next", NodeCategories::FIXED)]
    }

    fn categories() -> NodeCategories {
        NodeCategories::FIXED | NodeCategories::BEGIN
    }
}

/// End of a control path flowing into a merge.
pub struct EndNode;

impl NodeKind for EndNode {
    fn fields() -> Vec<FieldDecl> {
        Vec::new()
    }

    fn categories() -> NodeCategories {
        NodeCategories::FIXED | NodeCategories::END
    }
}

/// Two-way branch.
pub struct IfNode;

impl NodeKind for IfNode {
    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("condition", NodeCategories::VALUE),
            FieldDecl::successor("true_successor", NodeCategories::FIXED),
            FieldDecl::successor("false_successor", NodeCategories::FIXED),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::FIXED | NodeCategories::CONTROL_SPLIT
    }
}

/// Control merge of any number of ends.
pub struct MergeNode;

impl NodeKind for MergeNode {
    const ITERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input_list("ends", 0),
            FieldDecl::successor("next", NodeCategories::FIXED),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::FIXED | NodeCategories::MERGE
    }
}

pub struct ReturnNode;

impl NodeKind for ReturnNode {
    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::input("result", NodeCategories::VALUE)]
    }

    fn categories() -> NodeCategories {
        NodeCategories::FIXED | NodeCategories::END
    }
}

// =============================================================================
// Value Nodes
// =============================================================================

/// Integer constant.
pub struct ConstantNode;

impl NodeKind for ConstantNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::int("value")]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

/// Incoming argument. Parameters never merge, even with equal indices.
pub struct ParameterNode;

impl NodeKind for ParameterNode {
    const ITERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::int("index")]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

pub struct AddNode;

impl NodeKind for AddNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("x", NodeCategories::VALUE),
            FieldDecl::input("y", NodeCategories::VALUE),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

pub struct MulNode;

impl NodeKind for MulNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("x", NodeCategories::VALUE),
            FieldDecl::input("y", NodeCategories::VALUE),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

/// Comparison of two values under a [`Condition`].
pub struct CompareNode;

impl NodeKind for CompareNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("x", NodeCategories::VALUE),
            FieldDecl::input("y", NodeCategories::VALUE),
            FieldDecl::object("condition"),
            FieldDecl::bool("unordered_is_true"),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

/// Value selected by the incoming control path of a merge.
pub struct PhiNode;

impl NodeKind for PhiNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("merge", NodeCategories::MERGE),
            FieldDecl::input_list("values", 0),
        ]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

// =============================================================================
// Builder Helpers
// =============================================================================

impl Graph {
    pub fn start(&mut self) -> NodeId {
        self.add_node::<StartNode>()
    }

    pub fn end(&mut self) -> NodeId {
        self.add_node::<EndNode>()
    }

    /// Create an integer constant.
    pub fn const_int(&mut self, value: i32) -> NodeId {
        let id = self.add_node::<ConstantNode>();
        self.set_data(id, "value", DataValue::Int(value));
        id
    }

    pub fn parameter(&mut self, index: i32) -> NodeId {
        let id = self.add_node::<ParameterNode>();
        self.set_data(id, "index", DataValue::Int(index));
        id
    }

    /// Create an integer add node.
    pub fn int_add(&mut self, x: NodeId, y: NodeId) -> NodeId {
        self.binary::<AddNode>(x, y)
    }

    /// Create an integer multiply node.
    pub fn int_mul(&mut self, x: NodeId, y: NodeId) -> NodeId {
        self.binary::<MulNode>(x, y)
    }

    pub fn compare(&mut self, condition: Condition, x: NodeId, y: NodeId) -> NodeId {
        let id = self.binary::<CompareNode>(x, y);
        self.set_data(id, "condition", DataValue::object(condition));
        id
    }

    fn binary<K: NodeKind>(&mut self, x: NodeId, y: NodeId) -> NodeId {
        let id = self.add_node::<K>();
        self.set_input(id, "x", Some(x));
        self.set_input(id, "y", Some(y));
        id
    }

    /// Branch on `condition`. Successors are attached by the caller.
    pub fn if_node(&mut self, condition: NodeId) -> NodeId {
        let id = self.add_node::<IfNode>();
        self.set_input(id, "condition", Some(condition));
        id
    }

    /// Create a merge of the given ends.
    pub fn merge(&mut self, ends: &[NodeId]) -> NodeId {
        let id = self.add_node::<MergeNode>();
        for &end in ends {
            self.push_input(id, "ends", Some(end));
        }
        id
    }

    /// Create a phi with one value per merge end.
    pub fn phi(&mut self, merge: NodeId, values: &[NodeId]) -> NodeId {
        let id = self.add_node::<PhiNode>();
        self.set_input(id, "merge", Some(merge));
        for &value in values {
            self.push_input(id, "values", Some(value));
        }
        id
    }

    /// Create a return node.
    pub fn return_value(&mut self, value: NodeId) -> NodeId {
        let id = self.add_node::<ReturnNode>();
        self.set_input(id, "result", Some(value));
        id
    }
}
