//! Edge iteration.
//!
//! Walks the inputs or successors of one node: direct slots in position
//! order, then each list slot element by element. Null entries are skipped.
//!
//! Two forms share the same walk:
//!
//! - [`Edges`] / [`EdgePositions`] borrow the node, so the borrow checker
//!   already rules out mutation while they are alive.
//! - [`EdgeCursor`] is detached from the graph and is stepped with a graph
//!   reference each time. It snapshots the node's modification count and
//!   treats any structural change in between as fatal. Overwriting an edge at
//!   a position the cursor yielded is not structural and is allowed.

use crate::class::{EdgeKind, Position};
use crate::error::{GraphError, GraphResult, fatal};
use crate::graph::Graph;
use crate::node::{Node, NodeId};

// =============================================================================
// Walk State
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct EdgeWalk {
    kind: EdgeKind,
    direct: usize,
    total: usize,
    index: usize,
    sub_index: usize,
}

impl EdgeWalk {
    fn new(node: &Node, kind: EdgeKind) -> Self {
        let class = node.class();
        let mut walk = EdgeWalk {
            kind,
            direct: class.direct_count(kind),
            total: class.edge_slots(kind).len(),
            index: 0,
            sub_index: 0,
        };
        walk.settle(node);
        walk
    }

    /// Move forward to the first non-null entry at or after the current one.
    fn settle(&mut self, node: &Node) {
        let direct = node.direct_edges(self.kind);
        while self.index < self.direct {
            if direct[self.index].is_some() {
                return;
            }
            self.index += 1;
        }
        let lists = node.edge_lists(self.kind);
        while self.index < self.total {
            let list = &lists[self.index - self.direct];
            while self.sub_index < list.len() {
                if let Some(Some(_)) = list.get(self.sub_index) {
                    return;
                }
                self.sub_index += 1;
            }
            self.sub_index = 0;
            self.index += 1;
        }
    }

    fn current(&self, node: &Node) -> Option<(Position, NodeId)> {
        if self.index < self.direct {
            let target = node.direct_edges(self.kind)[self.index]?;
            Some((Position::direct(self.kind, self.index as u32), target))
        } else if self.index < self.total {
            let list = &node.edge_lists(self.kind)[self.index - self.direct];
            let target = list.get(self.sub_index)??;
            let pos = Position::new(self.kind, self.index as u32, self.sub_index as u32);
            Some((pos, target))
        } else {
            None
        }
    }

    fn advance(&mut self, node: &Node) {
        if self.index < self.direct {
            self.index += 1;
        } else {
            self.sub_index += 1;
        }
        self.settle(node);
    }

    fn step(&mut self, node: &Node) -> Option<(Position, NodeId)> {
        let item = self.current(node)?;
        self.advance(node);
        Some(item)
    }

    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.total
    }
}

// =============================================================================
// Borrowing Iterators
// =============================================================================

/// Non-null edge targets of one kind.
pub struct Edges<'a> {
    node: &'a Node,
    walk: EdgeWalk,
}

impl<'a> Edges<'a> {
    pub fn new(node: &'a Node, kind: EdgeKind) -> Self {
        Edges {
            node,
            walk: EdgeWalk::new(node, kind),
        }
    }

    /// Linear scan of every slot of this kind.
    pub fn contains(&self, other: NodeId) -> bool {
        self.node.class().contains(self.node, self.walk.kind, other)
    }

    /// Same walk, yielding positions alongside targets.
    pub fn with_positions(self) -> EdgePositions<'a> {
        EdgePositions {
            node: self.node,
            walk: self.walk,
        }
    }
}

impl Iterator for Edges<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.step(self.node).map(|(_, target)| target)
    }
}

impl std::iter::FusedIterator for Edges<'_> {}

/// Non-null edges of one kind together with their positions.
pub struct EdgePositions<'a> {
    node: &'a Node,
    walk: EdgeWalk,
}

impl Iterator for EdgePositions<'_> {
    type Item = (Position, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.step(self.node)
    }
}

impl std::iter::FusedIterator for EdgePositions<'_> {}

// =============================================================================
// Detached Cursor
// =============================================================================

/// Edge walk that does not hold a borrow of the graph.
#[derive(Debug, Clone)]
pub struct EdgeCursor {
    node: NodeId,
    mod_count: u32,
    walk: EdgeWalk,
}

impl EdgeCursor {
    pub fn new(graph: &Graph, node: NodeId, kind: EdgeKind) -> Self {
        let n = graph.node(node);
        EdgeCursor {
            node,
            mod_count: n.mod_count(),
            walk: EdgeWalk::new(n, kind),
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn checked<'g>(&self, graph: &'g Graph) -> GraphResult<&'g Node> {
        let node = graph.try_node(self.node)?;
        if node.mod_count() != self.mod_count {
            return Err(GraphError::ConcurrentModification(self.node));
        }
        Ok(node)
    }

    /// Whether another edge remains.
    pub fn has_next(&self, graph: &Graph) -> bool {
        if let Err(err) = self.checked(graph) {
            fatal(err);
        }
        self.walk.has_next()
    }

    /// Next edge and its position, or the modification error.
    pub fn try_next_entry(&mut self, graph: &Graph) -> GraphResult<Option<(Position, NodeId)>> {
        let node = self.checked(graph)?;
        Ok(self.walk.step(node))
    }

    /// Next edge target.
    pub fn next(&mut self, graph: &Graph) -> Option<NodeId> {
        self.try_next_entry(graph)
            .unwrap_or_else(|err| fatal(err))
            .map(|(_, target)| target)
    }

    /// Position of the next edge, usable with [`Graph::set`].
    pub fn next_position(&mut self, graph: &Graph) -> Option<Position> {
        self.try_next_entry(graph)
            .unwrap_or_else(|err| fatal(err))
            .map(|(pos, _)| pos)
    }
}
