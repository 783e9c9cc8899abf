//! Process-wide node class cache.
//!
//! Maps each node kind to its [`NodeClass`]. Lookups are concurrent; two
//! compilations racing to build the same kind both build it, the first
//! insert wins and the other copy is dropped. Building is pure, so the only
//! state that must not be duplicated is the iterable id, which is handed out
//! inside the insert and therefore only to the winner.

use std::any::TypeId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::class::{CalcOffset, DefaultLayout, NodeClass};
use crate::error::{SchemaResult, fatal};
use crate::kind::{KindInfo, NodeKind};

pub struct NodeClassRegistry {
    classes: DashMap<TypeId, Arc<NodeClass>, FxBuildHasher>,
    next_iterable_id: AtomicU32,
    /// Layout policy for classes built from now on.
    layout: RwLock<Arc<dyn CalcOffset>>,
}

impl NodeClassRegistry {
    pub fn new() -> Self {
        Self::with_layout(Arc::new(DefaultLayout::default()))
    }

    pub fn with_layout(layout: Arc<dyn CalcOffset>) -> Self {
        Self {
            classes: DashMap::with_hasher(FxBuildHasher),
            next_iterable_id: AtomicU32::new(0),
            layout: RwLock::new(layout),
        }
    }

    /// Class of `K`, building it on first use. A malformed kind is fatal.
    pub fn get<K: NodeKind>(&self) -> Arc<NodeClass> {
        self.try_get::<K>().unwrap_or_else(|err| fatal(err))
    }

    /// Class of `K`, or the schema error from building it.
    pub fn try_get<K: NodeKind>(&self) -> SchemaResult<Arc<NodeClass>> {
        let type_id = TypeId::of::<K>();

        // Fast path: already published.
        if let Some(class) = self.classes.get(&type_id) {
            return Ok(Arc::clone(&class));
        }

        // Slow path: build outside any shard lock.
        let layout = Arc::clone(&self.layout.read());
        let built = NodeClass::build(KindInfo::of::<K>(), &*layout)?;

        let mut won = false;
        let class = self
            .classes
            .entry(type_id)
            .or_insert_with(|| {
                won = true;
                let mut class = built;
                class.assign_iterable_id(|| self.next_iterable_id.fetch_add(1, Ordering::Relaxed));
                Arc::new(class)
            })
            .clone();

        if won {
            tracing::debug!(
                kind = class.short_name(),
                inputs = class.input_count(),
                successors = class.successor_count(),
                data = class.data_count(),
                iterable_id = ?class.iterable_id(),
                "built node class"
            );
        } else {
            tracing::trace!(kind = class.short_name(), "discarded duplicate node class");
        }
        Ok(class)
    }

    /// Number of iterable ids handed out, i.e. the length of a dense
    /// table indexed by iterable id.
    #[inline]
    pub fn cache_size(&self) -> u32 {
        self.next_iterable_id.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Recompute offsets of every cached class and adopt the policy for
    /// classes built later.
    ///
    /// Every class is scanned before any is updated, so on drift no class
    /// and not the registry's policy has changed.
    pub fn rescan_all_field_offsets(&self, layout: Arc<dyn CalcOffset>) -> SchemaResult<()> {
        let classes: Vec<Arc<NodeClass>> = self.classes.iter().map(|e| Arc::clone(e.value())).collect();
        let staged = classes
            .iter()
            .map(|class| class.stage_field_offsets(&*layout))
            .collect::<SchemaResult<Vec<_>>>()?;

        let mut policy = self.layout.write();
        for (class, offsets) in classes.iter().zip(staged) {
            class.commit_field_offsets(offsets);
        }
        *policy = layout;
        drop(policy);
        tracing::debug!(classes = classes.len(), "rescanned all node classes");
        Ok(())
    }
}

impl Default for NodeClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClassRegistry")
            .field("classes", &self.classes.len())
            .field("iterable_ids", &self.cache_size())
            .finish()
    }
}

// =============================================================================
// Global Registry Access
// =============================================================================

static GLOBAL_REGISTRY: OnceLock<NodeClassRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn global_registry() -> &'static NodeClassRegistry {
    GLOBAL_REGISTRY.get_or_init(NodeClassRegistry::new)
}

/// Class of `K` in the process-wide registry.
#[inline]
pub fn node_class<K: NodeKind>() -> Arc<NodeClass> {
    global_registry().get::<K>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::EdgeKind;
    use crate::kind::{FieldDecl, FieldTags, FieldType, NodeCategories};

    struct PlainNode;

    impl NodeKind for PlainNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::input("x", NodeCategories::NODE)]
        }
    }

    struct FirstIterableNode;

    impl NodeKind for FirstIterableNode {
        const ITERABLE: bool = true;

        fn fields() -> Vec<FieldDecl> {
            Vec::new()
        }
    }

    struct SecondIterableNode;

    impl NodeKind for SecondIterableNode {
        const ITERABLE: bool = true;

        fn fields() -> Vec<FieldDecl> {
            Vec::new()
        }
    }

    struct PairNode;

    impl NodeKind for PairNode {
        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::input("left", NodeCategories::NODE),
                FieldDecl::input("right", NodeCategories::NODE),
            ]
        }
    }

    struct LateNode;

    impl NodeKind for LateNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::input("y", NodeCategories::NODE)]
        }
    }

    /// Puts later fields first, which reorders any kind with two edges.
    struct ReversedLayout;

    impl CalcOffset for ReversedLayout {
        fn field_offsets(&self, fields: &[FieldDecl]) -> Vec<u32> {
            (0..fields.len() as u32).rev().map(|i| 32 + i * 8).collect()
        }
    }

    struct BrokenNode;

    impl NodeKind for BrokenNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new("x", FieldType::Float, FieldTags::DATA)]
        }
    }

    #[test]
    fn test_class_is_cached() {
        let registry = NodeClassRegistry::new();
        let a = registry.get::<PlainNode>();
        let b = registry.get::<PlainNode>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_iterable_ids_are_dense() {
        let registry = NodeClassRegistry::new();
        let plain = registry.get::<PlainNode>();
        let first = registry.get::<FirstIterableNode>();
        let second = registry.get::<SecondIterableNode>();
        let again = registry.get::<FirstIterableNode>();

        assert_eq!(plain.iterable_id(), None);
        assert_eq!(first.iterable_id(), Some(0));
        assert_eq!(second.iterable_id(), Some(1));
        assert_eq!(again.iterable_id(), Some(0));
        assert_eq!(registry.cache_size(), 2);
    }

    #[test]
    fn test_broken_kind_is_reported() {
        let registry = NodeClassRegistry::new();
        assert!(registry.try_get::<BrokenNode>().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    #[should_panic(expected = "unsupported data type")]
    fn test_broken_kind_is_fatal() {
        NodeClassRegistry::new().get::<BrokenNode>();
    }

    #[test]
    fn test_concurrent_first_build_has_one_winner() {
        let registry = NodeClassRegistry::new();
        let classes: Vec<Arc<NodeClass>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| registry.get::<FirstIterableNode>()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for class in &classes[1..] {
            assert!(Arc::ptr_eq(&classes[0], class));
        }
        assert_eq!(registry.cache_size(), 1);
    }

    #[test]
    fn test_rescan_all() {
        let registry = NodeClassRegistry::new();
        let class = registry.get::<PlainNode>();
        let before = class.edge_offsets(EdgeKind::Input)[0];
        registry
            .rescan_all_field_offsets(Arc::new(DefaultLayout { header_size: 24 }))
            .unwrap();
        assert_eq!(class.edge_offsets(EdgeKind::Input)[0], before + 8);
    }

    #[test]
    fn test_rescan_all_is_all_or_nothing() {
        let registry = NodeClassRegistry::new();
        let plain = registry.get::<PlainNode>();
        let pair = registry.get::<PairNode>();
        let plain_before = plain.edge_offsets(EdgeKind::Input);
        let pair_before = pair.edge_offsets(EdgeKind::Input);

        let err = registry
            .rescan_all_field_offsets(Arc::new(ReversedLayout))
            .unwrap_err();
        assert!(matches!(err, crate::error::SchemaError::SchemaDrift { .. }));

        assert_eq!(plain.edge_offsets(EdgeKind::Input), plain_before);
        assert_eq!(pair.edge_offsets(EdgeKind::Input), pair_before);
        assert_eq!(
            registry.get::<LateNode>().edge_offsets(EdgeKind::Input),
            vec![DefaultLayout::HEADER_SIZE]
        );
    }
}
