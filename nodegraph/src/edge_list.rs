//! Variable-arity edge lists.
//!
//! An [`EdgeList`] belongs to exactly one (node, slot) pair. Entries are
//! ordered, may repeat, and may be null: a null entry is a position that has
//! no edge yet. Mutation is crate-private so that every change goes through
//! the graph, which keeps the targets' back-edges in step.

use smallvec::SmallVec;

use crate::class::EdgeKind;
use crate::node::NodeId;

/// Entries stored inline before spilling to the heap.
const INLINE_EDGES: usize = 4;

#[derive(Clone)]
pub struct EdgeList {
    kind: EdgeKind,
    edges: SmallVec<[Option<NodeId>; INLINE_EDGES]>,
    initial_size: usize,
}

impl EdgeList {
    /// A list of `initial_size` null entries.
    pub fn new(kind: EdgeKind, initial_size: usize) -> Self {
        let mut edges = SmallVec::with_capacity(initial_size);
        edges.resize(initial_size, None);
        EdgeList {
            kind,
            edges,
            initial_size,
        }
    }

    #[inline]
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Size the list was declared with. Clearing restores it.
    #[inline]
    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Entry at `index`; `None` past the end, `Some(None)` for a null entry.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Option<NodeId>> {
        self.edges.get(index).copied()
    }

    /// All entries including nulls.
    #[inline]
    pub fn as_slice(&self) -> &[Option<NodeId>] {
        &self.edges
    }

    /// Non-null entries in order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().flatten().copied()
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.edges.contains(&Some(node))
    }

    /// Index of the first entry equal to `node`.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.edges.iter().position(|e| *e == Some(node))
    }

    /// Overwrite an existing entry, returning the old one.
    pub(crate) fn replace(&mut self, index: usize, value: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.edges[index], value)
    }

    /// Grow with nulls until `index` is the next free entry, then append.
    pub(crate) fn set_extending(&mut self, index: usize, value: Option<NodeId>) {
        debug_assert!(index >= self.edges.len());
        self.edges.resize(index, None);
        self.edges.push(value);
    }

    pub(crate) fn push(&mut self, value: Option<NodeId>) {
        self.edges.push(value);
    }

    /// Remove an entry, shifting later entries down.
    pub(crate) fn remove(&mut self, index: usize) -> Option<NodeId> {
        self.edges.remove(index)
    }

    /// Fresh list with the same kind and initial size.
    pub(crate) fn cleared(&self) -> Self {
        EdgeList::new(self.kind, self.initial_size)
    }
}

impl PartialEq for EdgeList {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.edges == other.edges
    }
}

impl Eq for EdgeList {}

impl std::fmt::Debug for EdgeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, edge) in self.edges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match edge {
                Some(id) => write!(f, "{:?}", id)?,
                None => write!(f, "null")?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: u32) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn test_new_is_null_filled() {
        let list = EdgeList::new(EdgeKind::Input, 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), Some(None));
        assert_eq!(list.get(3), None);
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn test_set_extending_fills_nulls() {
        let mut list = EdgeList::new(EdgeKind::Input, 0);
        list.set_extending(3, Some(id(7)));
        assert_eq!(list.as_slice(), &[None, None, None, Some(id(7))]);
    }

    #[test]
    fn test_duplicates_and_position() {
        let mut list = EdgeList::new(EdgeKind::Successor, 0);
        list.push(Some(id(1)));
        list.push(None);
        list.push(Some(id(1)));
        assert_eq!(list.position(id(1)), Some(0));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![id(1), id(1)]);

        assert_eq!(list.replace(0, Some(id(2))), Some(id(1)));
        assert_eq!(list.position(id(1)), Some(2));
        assert_eq!(list.remove(1), None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_cleared_restores_initial_size() {
        let mut list = EdgeList::new(EdgeKind::Input, 2);
        list.push(Some(id(4)));
        let cleared = list.cleared();
        assert_eq!(cleared.len(), 2);
        assert_eq!(cleared.initial_size(), 2);
        assert!(!cleared.contains(id(4)));
    }

    #[test]
    fn test_equality_is_elementwise() {
        let mut a = EdgeList::new(EdgeKind::Input, 0);
        let mut b = EdgeList::new(EdgeKind::Input, 1);
        a.push(None);
        assert_eq!(a, b);
        a.push(Some(id(3)));
        b.push(Some(id(4)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_format() {
        let mut list = EdgeList::new(EdgeKind::Input, 1);
        list.push(Some(id(9)));
        assert_eq!(format!("{:?}", list), "[null, #9]");
    }
}
