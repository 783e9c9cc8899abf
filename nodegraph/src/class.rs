//! Node classes: the per-kind edge schema.
//!
//! A [`NodeClass`] is built once per node kind by scanning the kind's
//! declared fields. It classifies every tagged field into exactly one of
//!
//! - direct inputs and input lists,
//! - direct successors and successor lists,
//! - data slots,
//!
//! and numbers the edge slots into *positions*: direct slots first, sorted by
//! layout offset, then list slots, also sorted by offset. Nodes store their
//! edges in tables indexed by those positions, so offsets only decide the
//! canonical order; they may be recomputed later without moving any slot.
//!
//! The class also carries everything generic code needs to treat a node
//! structurally: value numbering over data slots, payload equality, edge
//! equality, and the debug view of data.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::data::{DataType, DataValue};
use crate::error::{SchemaError, SchemaResult};
use crate::kind::{FieldDecl, FieldTags, FieldType, KindInfo, NodeCategories};
use crate::node::Node;

/// Sub-index of a position naming a direct (fixed-arity) slot.
pub const NOT_ITERABLE: u32 = u32::MAX;

/// Multiplier applied to the value number after each data slot.
const GVN_MULTIPLIER: u32 = 13;

// =============================================================================
// Edge Kind / Position
// =============================================================================

/// The two families of edges a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Data dependencies. Reverse relation: usages.
    Input,
    /// Control dependencies. Reverse relation: predecessors.
    Successor,
}

/// Locator of one edge slot on a node.
///
/// `index` is the slot position in the class; `sub_index` is
/// [`NOT_ITERABLE`] for direct slots and the element index for list slots.
/// A position is only meaningful for nodes of the class it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub kind: EdgeKind,
    pub index: u32,
    pub sub_index: u32,
}

impl Position {
    #[inline]
    pub const fn new(kind: EdgeKind, index: u32, sub_index: u32) -> Self {
        Position {
            kind,
            index,
            sub_index,
        }
    }

    /// Position of a direct slot.
    #[inline]
    pub const fn direct(kind: EdgeKind, index: u32) -> Self {
        Self::new(kind, index, NOT_ITERABLE)
    }

    #[inline]
    pub const fn is_input(self) -> bool {
        matches!(self.kind, EdgeKind::Input)
    }

    #[inline]
    pub const fn is_direct(self) -> bool {
        self.sub_index == NOT_ITERABLE
    }

    /// Same list slot, another element.
    #[inline]
    pub const fn with_sub_index(self, sub_index: u32) -> Self {
        Self::new(self.kind, self.index, sub_index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EdgeKind::Input => "input",
            EdgeKind::Successor => "successor",
        };
        if self.is_direct() {
            write!(f, "{} {}/-", kind, self.index)
        } else {
            write!(f, "{} {}/{}", kind, self.index, self.sub_index)
        }
    }
}

// =============================================================================
// Offsets
// =============================================================================

/// Computes layout offsets for a kind's declared fields.
///
/// Returns one offset per declared field, in declaration order.
pub trait CalcOffset: Send + Sync {
    fn field_offsets(&self, fields: &[FieldDecl]) -> Vec<u32>;
}

/// Object-style layout: a header, then fields grouped by descending size,
/// declaration order within a size, each aligned to its own size.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLayout {
    pub header_size: u32,
}

impl DefaultLayout {
    pub const HEADER_SIZE: u32 = 16;
}

impl Default for DefaultLayout {
    fn default() -> Self {
        Self {
            header_size: Self::HEADER_SIZE,
        }
    }
}

impl CalcOffset for DefaultLayout {
    fn field_offsets(&self, fields: &[FieldDecl]) -> Vec<u32> {
        let mut order: Vec<usize> = (0..fields.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(fields[i].ty.size()));

        let mut offsets = vec![0; fields.len()];
        let mut cursor = self.header_size;
        for i in order {
            let size = fields[i].ty.size();
            cursor = cursor.div_ceil(size) * size;
            offsets[i] = cursor;
            cursor += size;
        }
        offsets
    }
}

// =============================================================================
// Slots
// =============================================================================

/// One edge slot of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSlot {
    pub name: &'static str,
    /// Categories a target must carry. Lists accept any node.
    pub element: NodeCategories,
    /// Initial size of a list slot; `None` for direct slots.
    pub initial_size: Option<usize>,
}

impl EdgeSlot {
    #[inline]
    pub fn is_list(&self) -> bool {
        self.initial_size.is_some()
    }
}

/// One data slot of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSlot {
    pub name: &'static str,
    pub ty: DataType,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SlotOffsets {
    inputs: Vec<u32>,
    successors: Vec<u32>,
    data: Vec<u32>,
}

// =============================================================================
// Field Scanner
// =============================================================================

struct ScannedEdge {
    offset: u32,
    slot: EdgeSlot,
}

#[derive(Default)]
struct FieldScanner {
    inputs: Vec<ScannedEdge>,
    input_lists: Vec<ScannedEdge>,
    successors: Vec<ScannedEdge>,
    successor_lists: Vec<ScannedEdge>,
    data: Vec<(u32, DataSlot)>,
}

impl FieldScanner {
    fn scan(info: &KindInfo, calc: &dyn CalcOffset) -> SchemaResult<Self> {
        let offsets = calc.field_offsets(&info.fields);
        debug_assert_eq!(offsets.len(), info.fields.len());

        let kind = || info.short_name.clone();
        let mut seen = FxHashSet::default();
        let mut scanner = FieldScanner::default();

        for (field, &offset) in info.fields.iter().zip(&offsets) {
            let name = field.name;
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateField { kind: kind(), field: name });
            }

            let is_input = field.tags.contains(FieldTags::INPUT);
            let is_successor = field.tags.contains(FieldTags::SUCCESSOR);

            if is_input && is_successor {
                return Err(SchemaError::AmbiguousEdge { kind: kind(), field: name });
            }

            if is_input || is_successor {
                let invalid = || SchemaError::InvalidEdgeType { kind: kind(), field: name };
                let (element, initial_size) = match (field.ty, is_input) {
                    (FieldType::Node(required), _) => (required, None),
                    (FieldType::InputList { initial_size }, true) => {
                        (NodeCategories::NODE, Some(initial_size))
                    }
                    (FieldType::SuccessorList { initial_size }, false) => {
                        (NodeCategories::NODE, Some(initial_size))
                    }
                    _ => return Err(invalid()),
                };
                let edge = ScannedEdge {
                    offset,
                    slot: EdgeSlot {
                        name,
                        element,
                        initial_size,
                    },
                };
                match (is_input, edge.slot.is_list()) {
                    (true, false) => scanner.inputs.push(edge),
                    (true, true) => scanner.input_lists.push(edge),
                    (false, false) => scanner.successors.push(edge),
                    (false, true) => scanner.successor_lists.push(edge),
                }
            } else if field.tags.contains(FieldTags::DATA) {
                let ty = match field.ty {
                    FieldType::Int => DataType::Int,
                    FieldType::Bool => DataType::Bool,
                    FieldType::Object => DataType::Object,
                    ty if ty.is_edge_like() => {
                        return Err(SchemaError::InvalidDataType { kind: kind(), field: name });
                    }
                    _ => {
                        return Err(SchemaError::UnsupportedDataType { kind: kind(), field: name });
                    }
                };
                scanner.data.push((offset, DataSlot { name, ty }));
            } else if field.ty.is_edge_like() {
                return Err(SchemaError::SuspiciousField { kind: kind(), field: name });
            }
        }

        for group in [
            &mut scanner.inputs,
            &mut scanner.input_lists,
            &mut scanner.successors,
            &mut scanner.successor_lists,
        ] {
            group.sort_by_key(|e| e.offset);
        }
        Ok(scanner)
    }

    /// Direct slots followed by list slots, as (offsets, slots).
    fn ordered(direct: Vec<ScannedEdge>, lists: Vec<ScannedEdge>) -> (Vec<u32>, Vec<EdgeSlot>) {
        direct
            .into_iter()
            .chain(lists)
            .map(|e| (e.offset, e.slot))
            .unzip()
    }
}

// =============================================================================
// Node Class
// =============================================================================

/// Edge schema and structural operations for one node kind.
pub struct NodeClass {
    type_id: TypeId,
    type_name: &'static str,
    short_name: String,
    categories: NodeCategories,
    declared_fields: Vec<FieldDecl>,

    direct_input_count: usize,
    input_slots: Vec<EdgeSlot>,
    direct_successor_count: usize,
    successor_slots: Vec<EdgeSlot>,
    data_slots: Vec<DataSlot>,

    offsets: RwLock<SlotOffsets>,

    value_numberable: bool,
    start_gvn_number: u32,
    iterable: bool,
    iterable_id: Option<u32>,
}

impl NodeClass {
    /// Scan a kind and build its class. The iterable id is left unassigned;
    /// the registry hands it out when the class is published.
    pub fn build(info: KindInfo, calc: &dyn CalcOffset) -> SchemaResult<Self> {
        let scanner = FieldScanner::scan(&info, calc)?;

        let direct_input_count = scanner.inputs.len();
        let direct_successor_count = scanner.successors.len();
        let (input_offsets, input_slots) =
            FieldScanner::ordered(scanner.inputs, scanner.input_lists);
        let (successor_offsets, successor_slots) =
            FieldScanner::ordered(scanner.successors, scanner.successor_lists);
        let (data_offsets, data_slots) = scanner.data.into_iter().unzip();

        let mut hasher = FxHasher::default();
        info.type_id.hash(&mut hasher);
        let h = hasher.finish();

        Ok(NodeClass {
            type_id: info.type_id,
            type_name: info.type_name,
            short_name: info.short_name,
            categories: info.categories,
            declared_fields: info.fields,
            direct_input_count,
            input_slots,
            direct_successor_count,
            successor_slots,
            data_slots,
            offsets: RwLock::new(SlotOffsets {
                inputs: input_offsets,
                successors: successor_offsets,
                data: data_offsets,
            }),
            value_numberable: info.value_numberable,
            start_gvn_number: (h ^ (h >> 32)) as u32,
            iterable: info.iterable,
            iterable_id: None,
        })
    }

    pub(crate) fn assign_iterable_id(&mut self, next: impl FnOnce() -> u32) {
        if self.iterable && self.iterable_id.is_none() {
            self.iterable_id = Some(next());
        }
    }

    /// Recompute slot offsets with another layout policy.
    ///
    /// The new scan must reproduce the same slots at the same positions;
    /// anything else is schema drift. On drift the offsets are unchanged.
    pub fn rescan_field_offsets(&self, calc: &dyn CalcOffset) -> SchemaResult<()> {
        let staged = self.stage_field_offsets(calc)?;
        self.commit_field_offsets(staged);
        Ok(())
    }

    /// Scan with `calc` and check for drift without touching the live offsets.
    pub(crate) fn stage_field_offsets(&self, calc: &dyn CalcOffset) -> SchemaResult<SlotOffsets> {
        let info = KindInfo {
            type_id: self.type_id,
            type_name: self.type_name,
            fields: self.declared_fields.clone(),
            categories: self.categories,
            value_numberable: self.value_numberable,
            iterable: self.iterable,
            short_name: self.short_name.clone(),
        };
        let scanner = FieldScanner::scan(&info, calc)?;
        let drift = |detail: String| SchemaError::SchemaDrift {
            kind: self.short_name.clone(),
            detail,
        };

        if scanner.inputs.len() != self.direct_input_count {
            return Err(drift(format!(
                "direct input count {} != {}",
                scanner.inputs.len(),
                self.direct_input_count
            )));
        }
        if scanner.successors.len() != self.direct_successor_count {
            return Err(drift(format!(
                "direct successor count {} != {}",
                scanner.successors.len(),
                self.direct_successor_count
            )));
        }
        if scanner.data.len() != self.data_slots.len() {
            return Err(drift(format!(
                "data count {} != {}",
                scanner.data.len(),
                self.data_slots.len()
            )));
        }

        let (input_offsets, input_slots) =
            FieldScanner::ordered(scanner.inputs, scanner.input_lists);
        let (successor_offsets, successor_slots) =
            FieldScanner::ordered(scanner.successors, scanner.successor_lists);
        let (data_offsets, data_slots): (Vec<u32>, Vec<DataSlot>) =
            scanner.data.into_iter().unzip();

        if input_slots != self.input_slots {
            return Err(drift("input slot order changed".to_string()));
        }
        if successor_slots != self.successor_slots {
            return Err(drift("successor slot order changed".to_string()));
        }
        if data_slots != self.data_slots {
            return Err(drift("data slots changed".to_string()));
        }

        Ok(SlotOffsets {
            inputs: input_offsets,
            successors: successor_offsets,
            data: data_offsets,
        })
    }

    pub(crate) fn commit_field_offsets(&self, staged: SlotOffsets) {
        *self.offsets.write() = staged;
        tracing::debug!(kind = %self.short_name, "rescanned field offsets");
    }

    // =========================================================================
    // Schema Queries
    // =========================================================================

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    #[inline]
    pub fn categories(&self) -> NodeCategories {
        self.categories
    }

    #[inline]
    pub fn value_numberable(&self) -> bool {
        self.value_numberable
    }

    #[inline]
    pub fn is_iterable(&self) -> bool {
        self.iterable
    }

    /// Dense id of an iterable kind, once published by a registry.
    #[inline]
    pub fn iterable_id(&self) -> Option<u32> {
        self.iterable_id
    }

    #[inline]
    pub fn direct_input_count(&self) -> usize {
        self.direct_input_count
    }

    #[inline]
    pub fn direct_successor_count(&self) -> usize {
        self.direct_successor_count
    }

    #[inline]
    pub fn input_count(&self) -> usize {
        self.input_slots.len()
    }

    #[inline]
    pub fn successor_count(&self) -> usize {
        self.successor_slots.len()
    }

    #[inline]
    pub fn data_count(&self) -> usize {
        self.data_slots.len()
    }

    pub fn has_outgoing_edges(&self) -> bool {
        !self.input_slots.is_empty() || !self.successor_slots.is_empty()
    }

    #[inline]
    pub fn direct_count(&self, kind: EdgeKind) -> usize {
        match kind {
            EdgeKind::Input => self.direct_input_count,
            EdgeKind::Successor => self.direct_successor_count,
        }
    }

    /// All edge slots of one kind, direct first.
    #[inline]
    pub fn edge_slots(&self, kind: EdgeKind) -> &[EdgeSlot] {
        match kind {
            EdgeKind::Input => &self.input_slots,
            EdgeKind::Successor => &self.successor_slots,
        }
    }

    #[inline]
    pub fn data_slots(&self) -> &[DataSlot] {
        &self.data_slots
    }

    /// Slot named by a position, if the position fits this class.
    pub fn slot(&self, pos: Position) -> Option<&EdgeSlot> {
        let slot = self.edge_slots(pos.kind).get(pos.index as usize)?;
        (slot.is_list() != pos.is_direct()).then_some(slot)
    }

    /// Position of an edge slot by field name. List slots get sub-index 0.
    pub fn position_of(&self, name: &str) -> Option<Position> {
        [EdgeKind::Input, EdgeKind::Successor]
            .into_iter()
            .find_map(|kind| {
                let index = self.edge_slots(kind).iter().position(|s| s.name == name)?;
                let sub = if index < self.direct_count(kind) { NOT_ITERABLE } else { 0 };
                Some(Position::new(kind, index as u32, sub))
            })
    }

    pub fn data_index(&self, name: &str) -> Option<usize> {
        self.data_slots.iter().position(|s| s.name == name)
    }

    /// Current layout offsets of the edge slots of one kind, by position.
    pub fn edge_offsets(&self, kind: EdgeKind) -> Vec<u32> {
        let offsets = self.offsets.read();
        match kind {
            EdgeKind::Input => offsets.inputs.clone(),
            EdgeKind::Successor => offsets.successors.clone(),
        }
    }

    pub fn data_offsets(&self) -> Vec<u32> {
        self.offsets.read().data.clone()
    }

    // =========================================================================
    // Value Numbering
    // =========================================================================

    /// Hash of a node's kind and data payload. Zero for kinds that never merge.
    ///
    /// Edges do not contribute. A number computed before a mutation is not
    /// refreshed by it.
    pub fn value_number(&self, node: &Node) -> u32 {
        if !self.value_numberable {
            return 0;
        }
        node.data_values()
            .iter()
            .fold(self.start_gvn_number, |number, value| {
                number
                    .wrapping_add(value.hash_contribution())
                    .wrapping_mul(GVN_MULTIPLIER)
            })
    }

    /// Payload equality. Falls back to identity when the kinds differ or
    /// the kind is not value numberable.
    pub fn value_equal(&self, a: &Node, b: &Node) -> bool {
        if !self.value_numberable
            || !std::ptr::eq(a.class(), self)
            || !std::ptr::eq(b.class(), self)
        {
            return std::ptr::eq(a, b);
        }
        a.data_values() == b.data_values()
    }

    /// Identity equality of every edge, both kinds.
    pub fn edges_equal(&self, a: &Node, b: &Node) -> bool {
        debug_assert!(std::ptr::eq(a.class(), self) && std::ptr::eq(b.class(), self));
        [EdgeKind::Input, EdgeKind::Successor].into_iter().all(|kind| {
            a.direct_edges(kind) == b.direct_edges(kind) && a.edge_lists(kind) == b.edge_lists(kind)
        })
    }

    /// Whether `other` occurs in any slot of the given kind.
    pub fn contains(&self, node: &Node, kind: EdgeKind, other: crate::node::NodeId) -> bool {
        node.direct_edges(kind).contains(&Some(other))
            || node.edge_lists(kind).iter().any(|list| list.contains(other))
    }

    /// Fill `properties` with `data.<name>` entries.
    pub fn debug_properties(&self, node: &Node, properties: &mut FxHashMap<String, DataValue>) {
        for (slot, value) in self.data_slots.iter().zip(node.data_values()) {
            properties.insert(format!("data.{}", slot.name), value.clone());
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, values: &[u32]) -> fmt::Result {
            write!(f, "[")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, "]")
        }
        let offsets = self.offsets.read();
        write!(f, "NodeClass {} ", self.short_name)?;
        list(f, &offsets.inputs)?;
        write!(f, " ")?;
        list(f, &offsets.successors)?;
        write!(f, " ")?;
        list(f, &offsets.data)
    }
}

impl fmt::Debug for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClass")
            .field("kind", &self.short_name)
            .field("inputs", &self.input_slots.len())
            .field("successors", &self.successor_slots.len())
            .field("data", &self.data_slots.len())
            .field("iterable_id", &self.iterable_id)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::NodeKind;

    struct BranchNode;

    impl NodeKind for BranchNode {
        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::bool("negated"),
                FieldDecl::successor_list("extra", 0),
                FieldDecl::input("condition", NodeCategories::VALUE),
                FieldDecl::successor("true_successor", NodeCategories::FIXED),
                FieldDecl::input_list("state", 1),
                FieldDecl::int("probability"),
                FieldDecl::input("guard", NodeCategories::NODE),
                FieldDecl::successor("false_successor", NodeCategories::FIXED),
                FieldDecl::new("cache", FieldType::Long, FieldTags::empty()),
            ]
        }
    }

    fn build<K: NodeKind>() -> SchemaResult<NodeClass> {
        NodeClass::build(KindInfo::of::<K>(), &DefaultLayout::default())
    }

    #[test]
    fn test_classification_counts() {
        let class = build::<BranchNode>().unwrap();
        assert_eq!(class.direct_input_count(), 2);
        assert_eq!(class.input_count(), 3);
        assert_eq!(class.direct_successor_count(), 2);
        assert_eq!(class.successor_count(), 3);
        assert_eq!(class.data_count(), 2);
        assert!(class.has_outgoing_edges());

        // Every tagged field is classified exactly once; `cache` is untagged.
        let classified = class.input_count() + class.successor_count() + class.data_count();
        assert_eq!(classified, BranchNode::fields().len() - 1);
    }

    #[test]
    fn test_direct_slots_precede_lists() {
        let class = build::<BranchNode>().unwrap();
        let names: Vec<_> = class.edge_slots(EdgeKind::Input).iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["condition", "guard", "state"]);

        let names: Vec<_> = class
            .edge_slots(EdgeKind::Successor)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["true_successor", "false_successor", "extra"]);

        let offsets = class.edge_offsets(EdgeKind::Input);
        assert!(offsets[0] < offsets[1]);
    }

    #[test]
    fn test_data_keeps_declaration_order() {
        let class = build::<BranchNode>().unwrap();
        let names: Vec<_> = class.data_slots().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["negated", "probability"]);
        assert_eq!(class.data_slots()[0].ty, DataType::Bool);
        assert_eq!(class.data_index("probability"), Some(1));
    }

    #[test]
    fn test_position_of() {
        let class = build::<BranchNode>().unwrap();
        assert_eq!(
            class.position_of("guard"),
            Some(Position::direct(EdgeKind::Input, 1))
        );
        assert_eq!(
            class.position_of("state"),
            Some(Position::new(EdgeKind::Input, 2, 0))
        );
        assert_eq!(
            class.position_of("false_successor"),
            Some(Position::direct(EdgeKind::Successor, 1))
        );
        assert_eq!(class.position_of("probability"), None);

        let list_pos = Position::new(EdgeKind::Input, 2, 5);
        assert!(class.slot(list_pos).is_some());
        assert!(class.slot(Position::direct(EdgeKind::Input, 2)).is_none());
        assert!(class.slot(Position::direct(EdgeKind::Input, 9)).is_none());
    }

    #[test]
    fn test_default_layout_groups_by_size() {
        let fields = [
            FieldDecl::bool("flag"),
            FieldDecl::int("count"),
            FieldDecl::input("x", NodeCategories::NODE),
        ];
        let offsets = DefaultLayout::default().field_offsets(&fields);
        assert_eq!(offsets, vec![28, 24, 16]);
    }

    struct AmbiguousNode;

    impl NodeKind for AmbiguousNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new(
                "x",
                FieldType::Node(NodeCategories::NODE),
                FieldTags::INPUT.union(FieldTags::SUCCESSOR),
            )]
        }
    }

    struct IntInputNode;

    impl NodeKind for IntInputNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new("x", FieldType::Int, FieldTags::INPUT)]
        }
    }

    struct WrongListNode;

    impl NodeKind for WrongListNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new(
                "xs",
                FieldType::SuccessorList { initial_size: 0 },
                FieldTags::INPUT,
            )]
        }
    }

    struct FloatDataNode;

    impl NodeKind for FloatDataNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new("value", FieldType::Double, FieldTags::DATA)]
        }
    }

    struct UntaggedEdgeNode;

    impl NodeKind for UntaggedEdgeNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new(
                "hidden",
                FieldType::Node(NodeCategories::NODE),
                FieldTags::empty(),
            )]
        }
    }

    struct DuplicateNode;

    impl NodeKind for DuplicateNode {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::int("a"), FieldDecl::bool("a")]
        }
    }

    #[test]
    fn test_malformed_schemas() {
        assert!(matches!(
            build::<AmbiguousNode>(),
            Err(SchemaError::AmbiguousEdge { field: "x", .. })
        ));
        assert!(matches!(
            build::<IntInputNode>(),
            Err(SchemaError::InvalidEdgeType { field: "x", .. })
        ));
        assert!(matches!(
            build::<WrongListNode>(),
            Err(SchemaError::InvalidEdgeType { field: "xs", .. })
        ));
        assert!(matches!(
            build::<FloatDataNode>(),
            Err(SchemaError::UnsupportedDataType { field: "value", .. })
        ));
        assert!(matches!(
            build::<UntaggedEdgeNode>(),
            Err(SchemaError::SuspiciousField { field: "hidden", .. })
        ));
        assert!(matches!(
            build::<DuplicateNode>(),
            Err(SchemaError::DuplicateField { field: "a", .. })
        ));
    }

    struct ShiftedLayout;

    impl CalcOffset for ShiftedLayout {
        fn field_offsets(&self, fields: &[FieldDecl]) -> Vec<u32> {
            DefaultLayout { header_size: 32 }.field_offsets(fields)
        }
    }

    struct ReversedLayout;

    impl CalcOffset for ReversedLayout {
        fn field_offsets(&self, fields: &[FieldDecl]) -> Vec<u32> {
            (0..fields.len() as u32).rev().map(|i| 16 + i * 8).collect()
        }
    }

    #[test]
    fn test_rescan_updates_offsets_in_place() {
        let class = build::<BranchNode>().unwrap();
        let before = class.edge_offsets(EdgeKind::Input);
        class.rescan_field_offsets(&ShiftedLayout).unwrap();
        let after = class.edge_offsets(EdgeKind::Input);
        assert_eq!(before.len(), after.len());
        assert_eq!(after[0], before[0] + 16);
        assert_eq!(class.input_count(), 3);
    }

    #[test]
    fn test_rescan_detects_reordering() {
        let class = build::<BranchNode>().unwrap();
        let err = class.rescan_field_offsets(&ReversedLayout).unwrap_err();
        assert!(matches!(err, SchemaError::SchemaDrift { .. }));
    }

    #[test]
    fn test_display() {
        let class = build::<BranchNode>().unwrap();
        let text = class.to_string();
        assert!(text.starts_with("NodeClass Branch ["));
        assert_eq!(text.matches('[').count(), 3);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::direct(EdgeKind::Input, 1).to_string(), "input 1/-");
        assert_eq!(
            Position::new(EdgeKind::Successor, 2, 3).to_string(),
            "successor 2/3"
        );
    }
}
