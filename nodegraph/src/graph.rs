//! The node graph and its mutation protocol.
//!
//! The graph owns every node in an [`Arena`] and is the only place edges
//! change, so it can keep back-edges exact:
//!
//! - writing an input slot moves one usage entry from the old target to the
//!   new one,
//! - writing a successor slot does the same for predecessor entries,
//! - list writes past the end grow the list with nulls first.
//!
//! Nodes are deleted explicitly. A deleted handle stays dead forever.
//!
//! # Design Principles
//!
//! - **Handles, not pointers**: edges and back-edges are [`NodeId`] relations
//! - **Schema-driven**: every operation is generic over the node's class
//! - **Fatal on misuse**: contract violations abort through [`fatal`]

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::arena::Arena;
use crate::class::{EdgeKind, NodeClass, Position};
use crate::data::DataValue;
use crate::edge_list::EdgeList;
use crate::error::{GraphError, GraphResult, fatal};
use crate::iter::{EdgeCursor, Edges};
use crate::kind::NodeKind;
use crate::node::{Node, NodeId};
use crate::registry::node_class;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Initial node capacity.
    pub node_capacity: usize,

    /// Keep per-kind node lists for iterable kinds.
    pub track_iterable_nodes: bool,

    /// Run [`Graph::verify`] after every delete.
    pub verify_on_delete: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_capacity: 256,
            track_iterable_nodes: true,
            verify_on_delete: false,
        }
    }
}

impl GraphConfig {
    /// Configuration that verifies back-edges after structural deletes.
    pub fn checked() -> Self {
        Self {
            verify_on_delete: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// Graph Structure
// =============================================================================

#[derive(Clone)]
pub struct Graph {
    nodes: Arena<Node>,

    /// Nodes of each iterable kind, indexed by iterable id.
    iterable: Vec<Vec<NodeId>>,

    config: GraphConfig,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Graph {
            nodes: Arena::with_capacity(config.node_capacity),
            iterable: Vec::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    /// Live node by handle, or [`GraphError::DeadNode`].
    #[inline]
    pub fn try_node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(id).ok_or(GraphError::DeadNode(id))
    }

    /// Live node by handle. A dead handle is fatal.
    #[inline]
    #[track_caller]
    pub fn node(&self, id: NodeId) -> &Node {
        self.try_node(id).unwrap_or_else(|err| fatal(err))
    }

    #[inline]
    #[track_caller]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(id)
            .unwrap_or_else(|| fatal(GraphError::DeadNode(id)))
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    #[inline]
    pub fn class_of(&self, id: NodeId) -> &NodeClass {
        self.node(id).class()
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.ids()
    }

    // =========================================================================
    // Node Creation
    // =========================================================================

    /// Add a node of kind `K` with null edges and default data.
    pub fn add_node<K: NodeKind>(&mut self) -> NodeId {
        self.add_node_of_class(node_class::<K>())
    }

    /// Add a node of an already resolved class.
    pub fn add_node_of_class(&mut self, class: Arc<NodeClass>) -> NodeId {
        let id = NodeId::new(self.nodes.capacity_used() as u32);
        let iterable_id = class.iterable_id();
        let allocated = self.nodes.alloc(Node::new(id, class));
        debug_assert_eq!(allocated, id);

        if let (true, Some(tag)) = (self.config.track_iterable_nodes, iterable_id) {
            let tag = tag as usize;
            if self.iterable.len() <= tag {
                self.iterable.resize_with(tag + 1, Vec::new);
            }
            self.iterable[tag].push(id);
        }
        id
    }

    // =========================================================================
    // Positional Protocol
    // =========================================================================

    /// Edge at a position. Past the end of a list is an error.
    pub fn try_get(&self, id: NodeId, pos: Position) -> GraphResult<Option<NodeId>> {
        let node = self.try_node(id)?;
        let slot = node
            .class()
            .slot(pos)
            .ok_or(GraphError::InvalidPosition { node: id, position: pos })?;
        if !slot.is_list() {
            return Ok(node.direct_edges(pos.kind)[pos.index as usize]);
        }
        let list = node.list_at(pos);
        list.get(pos.sub_index as usize)
            .ok_or(GraphError::IndexOutOfBounds {
                node: id,
                position: pos,
                len: list.len(),
            })
    }

    #[track_caller]
    pub fn get(&self, id: NodeId, pos: Position) -> Option<NodeId> {
        self.try_get(id, pos).unwrap_or_else(|err| fatal(err))
    }

    /// Write the edge at a position and move the matching back-edge.
    ///
    /// A list position past the current length grows the list with nulls up
    /// to the index, then appends. Growth, and any write that adds or removes
    /// an edge (null to non-null or back), is a structural change.
    pub fn try_set(&mut self, id: NodeId, pos: Position, value: Option<NodeId>) -> GraphResult<()> {
        let node = self.try_node(id)?;
        let slot = node
            .class()
            .slot(pos)
            .ok_or(GraphError::InvalidPosition { node: id, position: pos })?;
        if let Some(target) = value {
            let target_class = self.try_node(target)?.class();
            if !target_class.categories().is_assignable_to(slot.element) {
                return Err(GraphError::NotAssignable {
                    node: id,
                    position: pos,
                    value: target,
                    expected: format!("{:?}", slot.element),
                });
            }
        }

        let is_list = slot.is_list();
        let node = self.node_mut(id);
        let (old, grew) = if !is_list {
            let slot = &mut node.direct_edges_mut(pos.kind)[pos.index as usize];
            (std::mem::replace(slot, value), false)
        } else {
            let sub = pos.sub_index as usize;
            let list = node.list_at_mut(pos);
            if sub < list.len() {
                (list.replace(sub, value), false)
            } else {
                list.set_extending(sub, value);
                (None, true)
            }
        };
        if grew || old.is_some() != value.is_some() {
            node.bump_mod_count();
        }
        self.update_back_edges(id, pos.kind, old, value);
        Ok(())
    }

    #[track_caller]
    pub fn set(&mut self, id: NodeId, pos: Position, value: Option<NodeId>) {
        if let Err(err) = self.try_set(id, pos, value) {
            fatal(err);
        }
    }

    /// Append to the list slot named by `list.index`.
    #[track_caller]
    pub fn push_edge(&mut self, id: NodeId, list: Position, value: Option<NodeId>) {
        let len = self.edge_list(id, list).len();
        self.set(id, list.with_sub_index(len as u32), value);
    }

    /// Remove a list entry, shifting the rest down.
    #[track_caller]
    pub fn remove_edge(&mut self, id: NodeId, pos: Position) -> Option<NodeId> {
        let len = self.edge_list(id, pos).len();
        if pos.sub_index as usize >= len {
            fatal(GraphError::IndexOutOfBounds {
                node: id,
                position: pos,
                len,
            });
        }
        let node = self.node_mut(id);
        let old = node.list_at_mut(pos).remove(pos.sub_index as usize);
        node.bump_mod_count();
        self.update_back_edges(id, pos.kind, old, None);
        old
    }

    /// The list behind a list position.
    #[track_caller]
    pub fn edge_list(&self, id: NodeId, pos: Position) -> &EdgeList {
        let node = self.node(id);
        match node.class().slot(pos) {
            Some(slot) if slot.is_list() => node.list_at(pos),
            _ => fatal(GraphError::InvalidPosition { node: id, position: pos }),
        }
    }

    fn update_back_edges(
        &mut self,
        source: NodeId,
        kind: EdgeKind,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) {
        if let Some(old) = old {
            if let Some(target) = self.nodes.get_mut(old) {
                target.remove_back_edge(kind, source);
            }
        }
        if let Some(new) = new {
            self.node_mut(new).add_back_edge(kind, source);
        }
    }

    // =========================================================================
    // Named Helpers
    // =========================================================================

    #[track_caller]
    fn named_position(&self, id: NodeId, kind: EdgeKind, name: &str) -> Position {
        let class = self.class_of(id);
        match class.position_of(name) {
            Some(pos) if pos.kind == kind => pos,
            _ => fatal(GraphError::UnknownField {
                kind: class.short_name().to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Set a direct input by field name.
    #[track_caller]
    pub fn set_input(&mut self, id: NodeId, name: &str, value: Option<NodeId>) {
        let pos = self.named_position(id, EdgeKind::Input, name);
        self.set(id, pos, value);
    }

    /// Set a direct successor by field name.
    #[track_caller]
    pub fn set_successor(&mut self, id: NodeId, name: &str, value: Option<NodeId>) {
        let pos = self.named_position(id, EdgeKind::Successor, name);
        self.set(id, pos, value);
    }

    #[track_caller]
    pub fn push_input(&mut self, id: NodeId, list: &str, value: Option<NodeId>) {
        let pos = self.named_position(id, EdgeKind::Input, list);
        self.push_edge(id, pos, value);
    }

    #[track_caller]
    pub fn push_successor(&mut self, id: NodeId, list: &str, value: Option<NodeId>) {
        let pos = self.named_position(id, EdgeKind::Successor, list);
        self.push_edge(id, pos, value);
    }

    #[track_caller]
    pub fn input(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id, self.named_position(id, EdgeKind::Input, name))
    }

    #[track_caller]
    pub fn successor(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id, self.named_position(id, EdgeKind::Successor, name))
    }

    /// Write a data slot by field name. The value must match the slot type.
    #[track_caller]
    pub fn set_data(&mut self, id: NodeId, name: &str, value: DataValue) {
        let class = self.class_of(id);
        let Some(index) = class.data_index(name) else {
            fatal(GraphError::UnknownField {
                kind: class.short_name().to_string(),
                field: name.to_string(),
            });
        };
        if class.data_slots()[index].ty != value.data_type() {
            fatal(GraphError::DataTypeMismatch {
                kind: class.short_name().to_string(),
                field: name.to_string(),
            });
        }
        self.node_mut(id).data_mut()[index] = value;
    }

    #[track_caller]
    pub fn data(&self, id: NodeId, name: &str) -> &DataValue {
        let node = self.node(id);
        let class = node.class();
        match class.data_index(name).and_then(|i| node.data_at(i)) {
            Some(value) => value,
            None => fatal(GraphError::UnknownField {
                kind: class.short_name().to_string(),
                field: name.to_string(),
            }),
        }
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    pub fn inputs(&self, id: NodeId) -> Edges<'_> {
        Edges::new(self.node(id), EdgeKind::Input)
    }

    pub fn successors(&self, id: NodeId) -> Edges<'_> {
        Edges::new(self.node(id), EdgeKind::Successor)
    }

    /// Detached input walk that may interleave with graph mutation.
    pub fn input_cursor(&self, id: NodeId) -> EdgeCursor {
        EdgeCursor::new(self, id, EdgeKind::Input)
    }

    pub fn successor_cursor(&self, id: NodeId) -> EdgeCursor {
        EdgeCursor::new(self, id, EdgeKind::Successor)
    }

    #[inline]
    pub fn usages(&self, id: NodeId) -> &[NodeId] {
        self.node(id).usages()
    }

    #[inline]
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).predecessors()
    }

    /// Live nodes of an iterable kind in allocation order.
    ///
    /// Falls back to a full scan for kinds without an iterable id or when
    /// tracking is off. Only nodes of the kind's class in the global registry
    /// are returned. Classes from another registry number their kinds
    /// independently, so their nodes can share a per-kind list and are
    /// filtered out.
    pub fn nodes_of<K: NodeKind>(&self) -> Vec<NodeId> {
        let class = node_class::<K>();
        match class.iterable_id() {
            Some(tag) if self.config.track_iterable_nodes => self
                .iterable
                .get(tag as usize)
                .map(|ids| ids.as_slice())
                .unwrap_or(&[])
                .iter()
                .copied()
                .filter(|&id| std::ptr::eq(self.node(id).class(), &*class))
                .collect(),
            _ => self
                .iter()
                .filter(|(_, n)| std::ptr::eq(n.class(), &*class))
                .map(|(id, _)| id)
                .collect(),
        }
    }

    // =========================================================================
    // Replacement
    // =========================================================================

    /// Redirect the first edge of `kind` equal to `old`, scanning direct
    /// slots first and then lists. Returns whether an edge was found.
    fn replace_first(
        &mut self,
        id: NodeId,
        kind: EdgeKind,
        old: NodeId,
        new: Option<NodeId>,
    ) -> bool {
        let node = self.node(id);
        let found = node
            .direct_edges(kind)
            .iter()
            .position(|e| *e == Some(old))
            .map(|index| Position::direct(kind, index as u32))
            .or_else(|| {
                let direct = node.class().direct_count(kind);
                node.edge_lists(kind)
                    .iter()
                    .enumerate()
                    .find_map(|(i, list)| {
                        list.position(old)
                            .map(|sub| Position::new(kind, (direct + i) as u32, sub as u32))
                    })
            });
        match found {
            Some(pos) => {
                self.set(id, pos, new);
                true
            }
            None => false,
        }
    }

    /// Redirect the first input of `id` equal to `old`.
    #[track_caller]
    pub fn replace_first_input(&mut self, id: NodeId, old: NodeId, new: Option<NodeId>) -> bool {
        self.replace_first(id, EdgeKind::Input, old, new)
    }

    /// Redirect the first successor of `id` equal to `old`.
    #[track_caller]
    pub fn replace_first_successor(
        &mut self,
        id: NodeId,
        old: NodeId,
        new: Option<NodeId>,
    ) -> bool {
        self.replace_first(id, EdgeKind::Successor, old, new)
    }

    /// Point every input edge aimed at `old` to `new` instead.
    ///
    /// The usage multiset holds one entry per edge, so one replacement per
    /// entry covers users that hold `old` in several slots.
    pub fn replace_at_usages(&mut self, old: NodeId, new: Option<NodeId>) {
        self.replace_at(old, new, EdgeKind::Input);
    }

    /// Point every successor edge aimed at `old` to `new` instead.
    pub fn replace_at_predecessors(&mut self, old: NodeId, new: Option<NodeId>) {
        self.replace_at(old, new, EdgeKind::Successor);
    }

    fn replace_at(&mut self, old: NodeId, new: Option<NodeId>, kind: EdgeKind) {
        if new == Some(old) {
            return;
        }
        let sources = self.node(old).back_edges(kind).to_vec();
        tracing::trace!(%old, new = ?new, edges = sources.len(), ?kind, "replace at back-edges");
        for source in sources {
            if !self.replace_first(source, kind, old, new) {
                fatal(GraphError::InconsistentBackEdges {
                    node: source,
                    detail: format!("back-edge to {} without a matching edge", old),
                });
            }
        }
    }

    // =========================================================================
    // Clearing / Copying
    // =========================================================================

    /// Null all inputs and reset input lists to their initial size.
    pub fn clear_inputs(&mut self, id: NodeId) {
        self.clear_edges(id, EdgeKind::Input);
    }

    /// Null all successors and reset successor lists to their initial size.
    pub fn clear_successors(&mut self, id: NodeId) {
        self.clear_edges(id, EdgeKind::Successor);
    }

    fn clear_edges(&mut self, id: NodeId, kind: EdgeKind) {
        let targets: Vec<NodeId> = self.node(id).targets(kind).collect();
        for target in targets {
            if let Some(node) = self.nodes.get_mut(target) {
                node.remove_back_edge(kind, id);
            }
        }
        self.node_mut(id).reset_edges(kind);
    }

    /// Copy the inputs of `from` into `to` slot by slot.
    ///
    /// Lists are copied into fresh containers. Back-edges are not touched;
    /// call [`Graph::register_edges`] once all edges of `to` are in place.
    pub fn copy_inputs(&mut self, from: NodeId, to: NodeId) {
        self.copy_edges(from, to, EdgeKind::Input);
    }

    /// Successor counterpart of [`Graph::copy_inputs`].
    pub fn copy_successors(&mut self, from: NodeId, to: NodeId) {
        self.copy_edges(from, to, EdgeKind::Successor);
    }

    fn copy_edges(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        let source = self.node(from);
        if !Arc::ptr_eq(source.class_arc(), self.node(to).class_arc()) {
            fatal(GraphError::ClassMismatch {
                left: from,
                right: to,
            });
        }
        let direct: Vec<Option<NodeId>> = source.direct_edges(kind).to_vec();
        let lists: Vec<EdgeList> = source.edge_lists(kind).to_vec();
        self.node_mut(to).set_edge_tables(kind, &direct, &lists);
    }

    /// Add the back-edges for every edge `id` currently holds.
    pub fn register_edges(&mut self, id: NodeId) {
        for kind in [EdgeKind::Input, EdgeKind::Successor] {
            let targets: Vec<NodeId> = self.node(id).targets(kind).collect();
            for target in targets {
                self.node_mut(target).add_back_edge(kind, id);
            }
        }
    }

    /// Duplicate a node: same class, same data, same edges.
    pub fn clone_node(&mut self, id: NodeId) -> NodeId {
        let class = Arc::clone(self.node(id).class_arc());
        let data = self.node(id).data_values().to_vec();
        let copy = self.add_node_of_class(class);
        self.node_mut(copy).data_mut().clone_from_slice(&data);
        self.copy_inputs(id, copy);
        self.copy_successors(id, copy);
        self.register_edges(copy);
        tracing::trace!(%id, %copy, "cloned node");
        copy
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove a node that has no usages left.
    ///
    /// Predecessor edges aimed at the node are nulled, its own edges are
    /// cleared, and the handle becomes dead.
    pub fn delete(&mut self, id: NodeId) {
        let usages = self.node(id).usages().len();
        if usages > 0 {
            fatal(GraphError::HasUsages { node: id, count: usages });
        }
        self.replace_at_predecessors(id, None);
        self.clear_inputs(id);
        self.clear_successors(id);

        if let Some(node) = self.nodes.remove(id) {
            if let Some(tag) = node.class().iterable_id() {
                if let Some(ids) = self.iterable.get_mut(tag as usize) {
                    ids.retain(|&n| n != id);
                }
            }
            tracing::trace!(%id, kind = node.class().short_name(), "deleted node");
        }

        if self.config.verify_on_delete {
            if let Err(err) = self.verify() {
                fatal(err);
            }
        }
    }

    // =========================================================================
    // Structural Queries
    // =========================================================================

    /// Hash of kind and data payload, see [`NodeClass::value_number`].
    pub fn value_number(&self, id: NodeId) -> u32 {
        let node = self.node(id);
        node.class().value_number(node)
    }

    /// Payload equality, see [`NodeClass::value_equal`].
    pub fn value_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (self.node(a), self.node(b));
        a.class().value_equal(a, b)
    }

    /// Identity equality of all edges. False for nodes of different classes.
    pub fn edges_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (self.node(a), self.node(b));
        Arc::ptr_eq(a.class_arc(), b.class_arc()) && a.class().edges_equal(a, b)
    }

    pub fn inputs_contain(&self, id: NodeId, other: NodeId) -> bool {
        self.inputs(id).contains(other)
    }

    pub fn successors_contain(&self, id: NodeId, other: NodeId) -> bool {
        self.successors(id).contains(other)
    }

    /// `data.<name>` view of a node's payload.
    pub fn debug_properties(&self, id: NodeId) -> FxHashMap<String, DataValue> {
        let node = self.node(id);
        let mut properties = FxHashMap::default();
        node.class().debug_properties(node, &mut properties);
        properties
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Check that forward edges and back-edges mirror each other exactly.
    pub fn verify(&self) -> GraphResult<()> {
        for kind in [EdgeKind::Input, EdgeKind::Successor] {
            let mut balance: FxHashMap<(NodeId, NodeId), i64> = FxHashMap::default();
            for (id, node) in self.iter() {
                for target in node.targets(kind) {
                    if !self.contains(target) {
                        return Err(GraphError::InconsistentBackEdges {
                            node: id,
                            detail: format!("{:?} edge to dead node {}", kind, target),
                        });
                    }
                    *balance.entry((target, id)).or_default() += 1;
                }
                for &source in node.back_edges(kind) {
                    *balance.entry((id, source)).or_default() -= 1;
                }
            }
            if let Some((&(target, source), &diff)) = balance.iter().find(|(_, d)| **d != 0) {
                return Err(GraphError::InconsistentBackEdges {
                    node: target,
                    detail: format!(
                        "{:?} edges from {} differ from back-edges by {}",
                        kind, source, diff
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph ({} nodes):", self.nodes.len())?;
        for (id, node) in self.iter() {
            writeln!(f, "  {:?}: {:?}", id, node)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{FieldDecl, NodeCategories};
    use crate::registry::NodeClassRegistry;

    struct ValNode;

    impl NodeKind for ValNode {
        const ITERABLE: bool = true;

        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::int("v")]
        }

        fn categories() -> NodeCategories {
            NodeCategories::VALUE
        }
    }

    struct Filler<const N: u32>;

    impl<const N: u32> NodeKind for Filler<N> {
        const ITERABLE: bool = true;

        fn fields() -> Vec<FieldDecl> {
            Vec::new()
        }
    }

    macro_rules! fillers {
        ($($n:literal)*) => {
            [$(NodeClassRegistry::get::<Filler<$n>> as fn(&NodeClassRegistry) -> Arc<NodeClass>),*]
        };
    }

    struct CtlNode;

    impl NodeKind for CtlNode {
        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::successor("next", NodeCategories::FIXED),
                FieldDecl::successor_list("others", 0),
            ]
        }

        fn categories() -> NodeCategories {
            NodeCategories::FIXED
        }
    }

    struct PairNode;

    impl NodeKind for PairNode {
        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::input("left", NodeCategories::VALUE),
                FieldDecl::input("right", NodeCategories::VALUE),
                FieldDecl::input_list("rest", 1),
            ]
        }
    }

    fn val(g: &mut Graph, v: i32) -> NodeId {
        let id = g.add_node::<ValNode>();
        g.set_data(id, "v", DataValue::Int(v));
        id
    }

    #[test]
    fn test_set_get_updates_usages() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let b = val(&mut g, 2);
        let p = g.add_node::<PairNode>();

        g.set_input(p, "left", Some(a));
        assert_eq!(g.input(p, "left"), Some(a));
        assert_eq!(g.usages(a), &[p]);

        g.set_input(p, "left", Some(b));
        assert!(g.usages(a).is_empty());
        assert_eq!(g.usages(b), &[p]);

        g.set_input(p, "left", None);
        assert!(g.usages(b).is_empty());
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_usage_survives_other_edge() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let b = val(&mut g, 2);
        let p = g.add_node::<PairNode>();
        g.set_input(p, "left", Some(a));
        g.set_input(p, "right", Some(a));
        assert_eq!(g.usages(a), &[p, p]);

        g.set_input(p, "left", Some(b));
        assert_eq!(g.usages(a), &[p]);
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_list_set_extends() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let p = g.add_node::<PairNode>();
        let rest = g.class_of(p).position_of("rest").unwrap();

        let before = g.node(p).mod_count();
        g.set(p, rest.with_sub_index(3), Some(a));
        assert_eq!(g.edge_list(p, rest).len(), 4);
        assert_eq!(g.get(p, rest.with_sub_index(3)), Some(a));
        assert_eq!(g.get(p, rest.with_sub_index(2)), None);
        assert_eq!(g.node(p).mod_count(), before + 1);
        assert_eq!(g.usages(a), &[p]);
    }

    #[test]
    fn test_get_past_end() {
        let mut g = Graph::new();
        let p = g.add_node::<PairNode>();
        let rest = g.class_of(p).position_of("rest").unwrap();
        assert!(matches!(
            g.try_get(p, rest.with_sub_index(1)),
            Err(GraphError::IndexOutOfBounds { len: 1, .. })
        ));
    }

    #[test]
    fn test_not_assignable() {
        let mut g = Graph::new();
        let c = g.add_node::<CtlNode>();
        let p = g.add_node::<PairNode>();
        let left = g.class_of(p).position_of("left").unwrap();
        let err = g.try_set(p, left, Some(c)).unwrap_err();
        assert!(matches!(err, GraphError::NotAssignable { .. }));
        assert_eq!(g.get(p, left), None);
        assert!(g.usages(c).is_empty());
    }

    #[test]
    fn test_successors_track_predecessors() {
        let mut g = Graph::new();
        let a = g.add_node::<CtlNode>();
        let b = g.add_node::<CtlNode>();
        let c = g.add_node::<CtlNode>();
        g.set_successor(a, "next", Some(b));
        g.push_successor(a, "others", Some(c));
        g.push_successor(a, "others", Some(b));
        assert_eq!(g.predecessors(b), &[a, a]);
        assert_eq!(g.predecessors(c), &[a]);
        assert_eq!(g.successors(a).collect::<Vec<_>>(), vec![b, c, b]);

        let others = g.class_of(a).position_of("others").unwrap();
        assert_eq!(g.remove_edge(a, others), Some(c));
        assert!(g.predecessors(c).is_empty());
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_clear_inputs_restores_list_size() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let p = g.add_node::<PairNode>();
        g.set_input(p, "left", Some(a));
        g.push_input(p, "rest", Some(a));
        g.push_input(p, "rest", Some(a));

        g.clear_inputs(p);
        assert_eq!(g.inputs(p).count(), 0);
        let rest = g.class_of(p).position_of("rest").unwrap();
        assert_eq!(g.edge_list(p, rest).len(), 1);
        assert!(g.usages(a).is_empty());
        assert!(g.verify().is_ok());
    }

    #[test]
    fn test_copy_inputs_does_not_register() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let p = g.add_node::<PairNode>();
        let q = g.add_node::<PairNode>();
        g.set_input(p, "left", Some(a));

        g.copy_inputs(p, q);
        assert_eq!(g.input(q, "left"), Some(a));
        assert_eq!(g.usages(a), &[p]);
        assert!(g.verify().is_err());

        g.register_edges(q);
        assert!(g.verify().is_ok());
    }

    #[test]
    #[should_panic(expected = "different node classes")]
    fn test_copy_requires_same_class() {
        let mut g = Graph::new();
        let p = g.add_node::<PairNode>();
        let c = g.add_node::<CtlNode>();
        g.copy_inputs(p, c);
    }

    #[test]
    fn test_delete() {
        let mut g = Graph::with_config(GraphConfig::checked());
        let a = val(&mut g, 1);
        let p = g.add_node::<PairNode>();
        g.set_input(p, "left", Some(a));

        g.delete(p);
        assert!(!g.contains(p));
        assert!(g.usages(a).is_empty());
        assert!(matches!(g.try_node(p), Err(GraphError::DeadNode(_))));
    }

    #[test]
    fn test_delete_nulls_predecessor_edges() {
        let mut g = Graph::new();
        let a = g.add_node::<CtlNode>();
        let b = g.add_node::<CtlNode>();
        g.set_successor(a, "next", Some(b));
        g.delete(b);
        assert_eq!(g.successor(a, "next"), None);
        assert!(g.verify().is_ok());
    }

    #[test]
    #[should_panic(expected = "usages remain")]
    fn test_delete_with_usages_is_fatal() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let p = g.add_node::<PairNode>();
        g.set_input(p, "left", Some(a));
        g.delete(a);
    }

    #[test]
    fn test_nodes_of_iterable_kind() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        let _p = g.add_node::<PairNode>();
        let b = val(&mut g, 2);
        assert_eq!(g.nodes_of::<ValNode>(), vec![a, b]);

        g.delete(a);
        assert_eq!(g.nodes_of::<ValNode>(), vec![b]);
        assert_eq!(g.nodes_of::<PairNode>().len(), 1);
    }

    #[test]
    fn test_nodes_of_skips_classes_from_other_registries() {
        let tag = node_class::<ValNode>().iterable_id().unwrap();
        let local = NodeClassRegistry::new();
        let getters = fillers!(0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31);
        let foreign = getters
            .iter()
            .map(|get| get(&local))
            .find(|class| class.iterable_id() == Some(tag))
            .expect("a local class sharing the iterable id");

        let mut g = Graph::new();
        let v = val(&mut g, 1);
        let stray = g.add_node_of_class(foreign);
        assert_eq!(g.nodes_of::<ValNode>(), vec![v]);
        assert!(g.contains(stray));

        let untracked = GraphConfig {
            track_iterable_nodes: false,
            ..Default::default()
        };
        let mut g = Graph::with_config(untracked);
        let v = val(&mut g, 2);
        g.add_node_of_class(local.get::<Filler<0>>());
        assert_eq!(g.nodes_of::<ValNode>(), vec![v]);
    }

    #[test]
    fn test_data_and_debug_properties() {
        let mut g = Graph::new();
        let a = val(&mut g, 42);
        assert_eq!(g.data(a, "v"), &DataValue::Int(42));
        let props = g.debug_properties(a);
        assert_eq!(props.get("data.v"), Some(&DataValue::Int(42)));
    }

    #[test]
    #[should_panic(expected = "wrong type")]
    fn test_data_type_mismatch() {
        let mut g = Graph::new();
        let a = val(&mut g, 1);
        g.set_data(a, "v", DataValue::Bool(true));
    }
}
