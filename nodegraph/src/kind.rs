//! Node kinds and their field declarations.
//!
//! A node kind is a zero-sized marker type implementing [`NodeKind`]. The
//! kind declares its storage fields in declaration order; the field scanner
//! in [`crate::class`] turns that declaration into a [`NodeClass`].
//!
//! ```ignore
//! pub struct AddNode;
//!
//! impl NodeKind for AddNode {
//!     const VALUE_NUMBERABLE: bool = true;
//!
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::input("x", NodeCategories::VALUE),
//!             FieldDecl::input("y", NodeCategories::VALUE),
//!         ]
//!     }
//!
//!     fn categories() -> NodeCategories {
//!         NodeCategories::VALUE
//!     }
//! }
//! ```
//!
//! [`NodeClass`]: crate::class::NodeClass

use std::any::TypeId;

// =============================================================================
// Node Categories
// =============================================================================

bitflags::bitflags! {
    /// Sub-kinds a node kind belongs to.
    ///
    /// An edge slot declares the categories it requires; a node may be stored
    /// there only if its own categories contain all of them. The empty set is
    /// the base node abstraction and accepts every node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeCategories: u16 {
        /// Produces a value.
        const VALUE = 0b0000_0001;
        /// Anchored in the control flow.
        const FIXED = 0b0000_0010;
        /// Has more than one control successor.
        const CONTROL_SPLIT = 0b0000_0100;
        /// Merges control flow.
        const MERGE = 0b0000_1000;
        /// Ends a control flow path.
        const END = 0b0001_0000;
        /// Begins a control flow path.
        const BEGIN = 0b0010_0000;
        /// Reads or writes memory.
        const MEMORY = 0b0100_0000;
        /// Frame state for deoptimization.
        const STATE = 0b1000_0000;
    }
}

impl NodeCategories {
    /// The base node abstraction.
    pub const NODE: NodeCategories = NodeCategories::empty();

    /// Whether a node of `self` categories can be stored in a slot requiring `required`.
    #[inline]
    pub fn is_assignable_to(self, required: NodeCategories) -> bool {
        self.contains(required)
    }
}

// =============================================================================
// Field Tags
// =============================================================================

bitflags::bitflags! {
    /// Tags on a declared field, the analogue of field annotations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct FieldTags: u8 {
        const INPUT = 0b001;
        const SUCCESSOR = 0b010;
        const DATA = 0b100;
    }
}

// =============================================================================
// Field Type
// =============================================================================

/// Declared storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A single node reference whose target must carry these categories.
    Node(NodeCategories),
    /// A variable-arity input list created with `initial_size` null entries.
    InputList { initial_size: usize },
    /// A variable-arity successor list created with `initial_size` null entries.
    SuccessorList { initial_size: usize },
    Int,
    Bool,
    /// A shared object compared by its own equality.
    Object,
    Long,
    Float,
    Double,
    Char,
    Byte,
    Short,
    /// Bookkeeping state that is not a slot.
    Plain,
}

impl FieldType {
    /// Storage size in bytes, used by the default layout.
    pub fn size(self) -> u32 {
        match self {
            FieldType::Node(_)
            | FieldType::InputList { .. }
            | FieldType::SuccessorList { .. }
            | FieldType::Object
            | FieldType::Plain
            | FieldType::Long
            | FieldType::Double => 8,
            FieldType::Int | FieldType::Float => 4,
            FieldType::Char | FieldType::Short => 2,
            FieldType::Bool | FieldType::Byte => 1,
        }
    }

    /// Whether values of this type are node references or edge lists.
    pub fn is_edge_like(self) -> bool {
        matches!(
            self,
            FieldType::Node(_) | FieldType::InputList { .. } | FieldType::SuccessorList { .. }
        )
    }
}

// =============================================================================
// Field Declaration
// =============================================================================

/// One declared field of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: FieldType,
    pub tags: FieldTags,
}

impl FieldDecl {
    /// A field with explicit type and tags.
    pub const fn new(name: &'static str, ty: FieldType, tags: FieldTags) -> Self {
        FieldDecl { name, ty, tags }
    }

    pub const fn input(name: &'static str, required: NodeCategories) -> Self {
        Self::new(name, FieldType::Node(required), FieldTags::INPUT)
    }

    pub const fn input_list(name: &'static str, initial_size: usize) -> Self {
        Self::new(name, FieldType::InputList { initial_size }, FieldTags::INPUT)
    }

    pub const fn successor(name: &'static str, required: NodeCategories) -> Self {
        Self::new(name, FieldType::Node(required), FieldTags::SUCCESSOR)
    }

    pub const fn successor_list(name: &'static str, initial_size: usize) -> Self {
        Self::new(
            name,
            FieldType::SuccessorList { initial_size },
            FieldTags::SUCCESSOR,
        )
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int, FieldTags::DATA)
    }

    pub const fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool, FieldTags::DATA)
    }

    pub const fn object(name: &'static str) -> Self {
        Self::new(name, FieldType::Object, FieldTags::DATA)
    }
}

// =============================================================================
// Node Kind
// =============================================================================

/// Capability contract every node kind implements.
pub trait NodeKind: 'static {
    /// Kinds whose instances may be merged by value numbering.
    const VALUE_NUMBERABLE: bool = false;

    /// Kinds that get a dense iterable id for graph-wide iteration.
    const ITERABLE: bool = false;

    /// Declared fields in declaration order.
    fn fields() -> Vec<FieldDecl>;

    /// Categories this kind belongs to.
    fn categories() -> NodeCategories {
        NodeCategories::NODE
    }

    /// Overrides the derived display name.
    fn short_name() -> Option<&'static str> {
        None
    }
}

/// Type-erased description of a kind, enough to build its class.
#[derive(Debug, Clone)]
pub struct KindInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub fields: Vec<FieldDecl>,
    pub categories: NodeCategories,
    pub value_numberable: bool,
    pub iterable: bool,
    pub short_name: String,
}

impl KindInfo {
    pub fn of<K: NodeKind>() -> Self {
        let type_name = std::any::type_name::<K>();
        let short_name = K::short_name()
            .map(str::to_string)
            .unwrap_or_else(|| derive_short_name(type_name));
        KindInfo {
            type_id: TypeId::of::<K>(),
            type_name,
            fields: K::fields(),
            categories: K::categories(),
            value_numberable: K::VALUE_NUMBERABLE,
            iterable: K::ITERABLE,
            short_name,
        }
    }
}

/// Last path segment with a trailing `Node` removed, except for the
/// `StartNode` and `EndNode` kinds.
pub fn derive_short_name(type_name: &str) -> String {
    let simple = type_name.rsplit("::").next().unwrap_or(type_name);
    match simple.strip_suffix("Node") {
        Some(stripped) if simple != "StartNode" && simple != "EndNode" && !stripped.is_empty() => {
            stripped.to_string()
        }
        _ => simple.to_string(),
    }
}
