//! Global Value Numbering.
//!
//! Merges congruent nodes: same kind, equal data payload and identical
//! edges. Candidates are bucketed by [`Graph::value_number`]; a bucket hit
//! is confirmed with [`Graph::value_equal`] and [`Graph::edges_equal`].
//!
//! # Algorithm
//!
//! 1. Visit live nodes in allocation order
//! 2. Look the node up in the table, or insert it as a representative
//! 3. On a hit, redirect every usage to the representative and delete the
//!    duplicate
//!
//! Operands are normally allocated before their users, so merging an
//! operand first makes its users congruent by the time they are visited.
//!
//! Only floating nodes are merged. A node with successors or predecessors is
//! part of the control flow and keeps its identity.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::fatal;
use crate::graph::Graph;
use crate::node::NodeId;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the GVN pass.
#[derive(Debug, Clone)]
pub struct GvnConfig {
    /// Verify back-edge consistency after the pass.
    pub verify_after: bool,
    /// Maximum entries compared per bucket. Zero means no limit.
    pub max_bucket_scan: usize,
}

impl Default for GvnConfig {
    fn default() -> Self {
        Self {
            verify_after: false,
            max_bucket_scan: 16,
        }
    }
}

impl GvnConfig {
    /// Exhaustive bucket scans and verification afterwards.
    pub fn thorough() -> Self {
        Self {
            verify_after: true,
            max_bucket_scan: 0,
        }
    }
}

// =============================================================================
// Value Number Table
// =============================================================================

/// Representatives bucketed by value number.
#[derive(Debug, Clone, Default)]
pub struct ValueNumberTable {
    buckets: FxHashMap<u32, SmallVec<[NodeId; 2]>>,
    max_bucket_scan: usize,
    len: usize,
}

impl ValueNumberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table that compares at most `max_bucket_scan` entries per lookup.
    pub fn with_scan_limit(max_bucket_scan: usize) -> Self {
        Self {
            max_bucket_scan,
            ..Self::default()
        }
    }

    fn congruent(graph: &Graph, a: NodeId, b: NodeId) -> bool {
        a != b && graph.value_equal(a, b) && graph.edges_equal(a, b)
    }

    /// A representative congruent to `node`, if any.
    pub fn find(&self, graph: &Graph, node: NodeId) -> Option<NodeId> {
        if !graph.class_of(node).value_numberable() {
            return None;
        }
        let bucket = self.buckets.get(&graph.value_number(node))?;
        let limit = match self.max_bucket_scan {
            0 => bucket.len(),
            n => n,
        };
        bucket
            .iter()
            .take(limit)
            .copied()
            .find(|&candidate| graph.contains(candidate) && Self::congruent(graph, candidate, node))
    }

    /// Record `node` as a representative. Kinds that are not value
    /// numberable are ignored.
    pub fn insert(&mut self, graph: &Graph, node: NodeId) {
        if !graph.class_of(node).value_numberable() {
            return;
        }
        self.buckets
            .entry(graph.value_number(node))
            .or_default()
            .push(node);
        self.len += 1;
    }

    /// The existing representative for `node`, or `None` after recording
    /// `node` itself.
    pub fn find_or_insert(&mut self, graph: &Graph, node: NodeId) -> Option<NodeId> {
        let found = self.find(graph, node);
        if found.is_none() {
            self.insert(graph, node);
        }
        found
    }

    /// Drop `node` from its bucket. Uses the node's current value number.
    pub fn remove(&mut self, graph: &Graph, node: NodeId) -> bool {
        let number = graph.value_number(node);
        let Some(bucket) = self.buckets.get_mut(&number) else {
            return false;
        };
        let Some(index) = bucket.iter().position(|&n| n == node) else {
            return false;
        };
        bucket.remove(index);
        if bucket.is_empty() {
            self.buckets.remove(&number);
        }
        self.len -= 1;
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

// =============================================================================
// GVN Pass
// =============================================================================

/// Statistics from one GVN run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GvnStats {
    /// Live nodes visited.
    pub visited: usize,
    /// Duplicates merged into a representative and deleted.
    pub merged: usize,
}

/// Run GVN with the default configuration.
pub fn run(graph: &mut Graph) -> GvnStats {
    run_with_config(graph, &GvnConfig::default())
}

pub fn run_with_config(graph: &mut Graph, config: &GvnConfig) -> GvnStats {
    let mut table = ValueNumberTable::with_scan_limit(config.max_bucket_scan);
    let mut stats = GvnStats::default();

    let order: Vec<NodeId> = graph.ids().collect();
    for id in order {
        if !graph.contains(id) {
            continue;
        }
        stats.visited += 1;

        if !graph.class_of(id).value_numberable() || is_anchored(graph, id) {
            continue;
        }
        if let Some(representative) = table.find_or_insert(graph, id) {
            graph.replace_at_usages(id, Some(representative));
            graph.delete(id);
            stats.merged += 1;
        }
    }

    if config.verify_after {
        if let Err(err) = graph.verify() {
            fatal(err);
        }
    }

    tracing::debug!(
        visited = stats.visited,
        merged = stats.merged,
        representatives = table.len(),
        "gvn finished"
    );
    stats
}

/// Whether the node takes part in control flow.
fn is_anchored(graph: &Graph, id: NodeId) -> bool {
    !graph.predecessors(id).is_empty() || graph.successors(id).next().is_some()
}
