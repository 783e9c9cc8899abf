//! Node storage.
//!
//! A node stores its edges in slot tables laid out by its [`NodeClass`]:
//! one table of direct slots and one of edge lists per edge kind, plus a
//! table of data values. Back-edges are multisets with one entry per
//! incoming edge:
//!
//! - **usages**: nodes holding this node as an input,
//! - **predecessors**: nodes holding this node as a successor.
//!
//! The node never owns its usages or predecessors; the graph rewrites them
//! whenever an edge slot anywhere changes.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::arena::Id;
use crate::class::{EdgeKind, NodeClass, Position};
use crate::data::DataValue;
use crate::edge_list::EdgeList;

/// Handle of a node in its graph.
pub type NodeId = Id<Node>;

type BackEdges = SmallVec<[NodeId; 4]>;

#[derive(Clone)]
pub struct Node {
    id: NodeId,
    class: Arc<NodeClass>,

    inputs: SmallVec<[Option<NodeId>; 4]>,
    input_lists: SmallVec<[EdgeList; 1]>,
    successors: SmallVec<[Option<NodeId>; 2]>,
    successor_lists: SmallVec<[EdgeList; 1]>,
    data: SmallVec<[DataValue; 2]>,

    usages: BackEdges,
    predecessors: BackEdges,

    /// Bumped by every structural change: list growth or shrinkage, clears,
    /// bulk copies and writes that null or fill a slot. Replacing one target
    /// with another does not count.
    mod_count: u32,
}

impl Node {
    /// A node with null edges, default data and lists at their initial size.
    pub(crate) fn new(id: NodeId, class: Arc<NodeClass>) -> Self {
        let lists = |kind: EdgeKind| -> SmallVec<[EdgeList; 1]> {
            class.edge_slots(kind)[class.direct_count(kind)..]
                .iter()
                .map(|slot| EdgeList::new(kind, slot.initial_size.unwrap_or(0)))
                .collect()
        };
        let input_lists = lists(EdgeKind::Input);
        let successor_lists = lists(EdgeKind::Successor);
        let mut inputs = SmallVec::new();
        inputs.resize(class.direct_input_count(), None);
        let mut successors = SmallVec::new();
        successors.resize(class.direct_successor_count(), None);
        let data = class
            .data_slots()
            .iter()
            .map(|slot| slot.ty.default_value())
            .collect();

        Node {
            id,
            class,
            inputs,
            input_lists,
            successors,
            successor_lists,
            data,
            usages: SmallVec::new(),
            predecessors: SmallVec::new(),
            mod_count: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn class(&self) -> &NodeClass {
        &self.class
    }

    #[inline]
    pub fn class_arc(&self) -> &Arc<NodeClass> {
        &self.class
    }

    #[inline]
    pub fn mod_count(&self) -> u32 {
        self.mod_count
    }

    // =========================================================================
    // Edge Tables
    // =========================================================================

    #[inline]
    pub fn direct_edges(&self, kind: EdgeKind) -> &[Option<NodeId>] {
        match kind {
            EdgeKind::Input => &self.inputs,
            EdgeKind::Successor => &self.successors,
        }
    }

    #[inline]
    pub fn edge_lists(&self, kind: EdgeKind) -> &[EdgeList] {
        match kind {
            EdgeKind::Input => &self.input_lists,
            EdgeKind::Successor => &self.successor_lists,
        }
    }

    #[inline]
    pub(crate) fn direct_edges_mut(&mut self, kind: EdgeKind) -> &mut [Option<NodeId>] {
        match kind {
            EdgeKind::Input => &mut self.inputs,
            EdgeKind::Successor => &mut self.successors,
        }
    }

    #[inline]
    pub(crate) fn edge_lists_mut(&mut self, kind: EdgeKind) -> &mut [EdgeList] {
        match kind {
            EdgeKind::Input => &mut self.input_lists,
            EdgeKind::Successor => &mut self.successor_lists,
        }
    }

    /// List backing a list position.
    #[inline]
    pub(crate) fn list_at(&self, pos: Position) -> &EdgeList {
        let direct = self.class.direct_count(pos.kind);
        &self.edge_lists(pos.kind)[pos.index as usize - direct]
    }

    #[inline]
    pub(crate) fn list_at_mut(&mut self, pos: Position) -> &mut EdgeList {
        let direct = self.class.direct_count(pos.kind);
        &mut self.edge_lists_mut(pos.kind)[pos.index as usize - direct]
    }

    /// All non-null targets of one kind, direct slots first.
    pub fn targets(&self, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.direct_edges(kind)
            .iter()
            .flatten()
            .copied()
            .chain(self.edge_lists(kind).iter().flat_map(EdgeList::iter))
    }

    /// Replace the whole edge tables of one kind.
    pub(crate) fn set_edge_tables(
        &mut self,
        kind: EdgeKind,
        direct: &[Option<NodeId>],
        lists: &[EdgeList],
    ) {
        self.direct_edges_mut(kind).copy_from_slice(direct);
        self.edge_lists_mut(kind).clone_from_slice(lists);
        self.bump_mod_count();
    }

    /// Null every direct slot and reset every list to its initial size.
    pub(crate) fn reset_edges(&mut self, kind: EdgeKind) {
        self.direct_edges_mut(kind).fill(None);
        for list in self.edge_lists_mut(kind) {
            *list = list.cleared();
        }
        self.bump_mod_count();
    }

    #[inline]
    pub(crate) fn bump_mod_count(&mut self) {
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    // =========================================================================
    // Data
    // =========================================================================

    #[inline]
    pub fn data_values(&self) -> &[DataValue] {
        &self.data
    }

    #[inline]
    pub fn data_at(&self, index: usize) -> Option<&DataValue> {
        self.data.get(index)
    }

    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [DataValue] {
        &mut self.data
    }

    // =========================================================================
    // Back-Edges
    // =========================================================================

    /// Nodes holding this node as an input, once per edge.
    #[inline]
    pub fn usages(&self) -> &[NodeId] {
        &self.usages
    }

    /// Nodes holding this node as a successor, once per edge.
    #[inline]
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    #[inline]
    pub(crate) fn back_edges(&self, kind: EdgeKind) -> &[NodeId] {
        match kind {
            EdgeKind::Input => &self.usages,
            EdgeKind::Successor => &self.predecessors,
        }
    }

    pub(crate) fn add_back_edge(&mut self, kind: EdgeKind, source: NodeId) {
        match kind {
            EdgeKind::Input => self.usages.push(source),
            EdgeKind::Successor => self.predecessors.push(source),
        }
    }

    /// Remove one entry for `source`. Returns whether one was present.
    pub(crate) fn remove_back_edge(&mut self, kind: EdgeKind, source: NodeId) -> bool {
        let set = match kind {
            EdgeKind::Input => &mut self.usages,
            EdgeKind::Successor => &mut self.predecessors,
        };
        match set.iter().position(|&n| n == source) {
            Some(pos) => {
                set.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.class.short_name())?;
        if !self.inputs.is_empty() || !self.input_lists.is_empty() {
            write!(f, " in{:?}", self.inputs.as_slice())?;
            for list in &self.input_lists {
                write!(f, "{:?}", list)?;
            }
        }
        if !self.successors.is_empty() || !self.successor_lists.is_empty() {
            write!(f, " succ{:?}", self.successors.as_slice())?;
            for list in &self.successor_lists {
                write!(f, "{:?}", list)?;
            }
        }
        if !self.data.is_empty() {
            write!(f, " {:?}", self.data.as_slice())?;
        }
        Ok(())
    }
}
