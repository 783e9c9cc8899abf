//! Data payload of nodes.
//!
//! Data slots carry the non-edge state that distinguishes two nodes of the
//! same kind (a constant's value, a comparison's condition code). Only three
//! shapes are supported: 32-bit integers, booleans and shared objects whose
//! equality and hash are their own.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

// =============================================================================
// Data Type
// =============================================================================

/// Type tag of a data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Bool,
    Object,
}

impl DataType {
    /// The value a freshly created node holds in a slot of this type.
    pub fn default_value(self) -> DataValue {
        match self {
            DataType::Int => DataValue::Int(0),
            DataType::Bool => DataValue::Bool(false),
            DataType::Object => DataValue::Object(None),
        }
    }
}

// =============================================================================
// Object Payload
// =============================================================================

/// An object stored in a data slot.
///
/// Implemented for every `Eq + Hash + Debug` type, so kinds can store any
/// such value behind [`DataObject`].
pub trait ObjectData: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn ObjectData) -> bool;
    fn dyn_hash(&self) -> u32;
}

impl<T> ObjectData for T
where
    T: Any + fmt::Debug + Eq + Hash + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn ObjectData) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_hash(&self) -> u32 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        let h = hasher.finish();
        (h ^ (h >> 32)) as u32
    }
}

/// Shared handle to an object payload.
#[derive(Clone)]
pub struct DataObject(Arc<dyn ObjectData>);

impl DataObject {
    pub fn new<T: ObjectData>(value: T) -> Self {
        DataObject(Arc::new(value))
    }

    /// Downcast to the concrete payload type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Hash of the payload itself.
    #[inline]
    pub fn hash_code(&self) -> u32 {
        self.0.dyn_hash()
    }
}

impl PartialEq for DataObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.dyn_eq(&*other.0)
    }
}

impl Eq for DataObject {}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// =============================================================================
// Data Value
// =============================================================================

/// Value held in one data slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Int(i32),
    Bool(bool),
    Object(Option<DataObject>),
}

impl DataValue {
    /// Wrap an object payload.
    pub fn object<T: ObjectData>(value: T) -> Self {
        DataValue::Object(Some(DataObject::new(value)))
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Int(_) => DataType::Int,
            DataValue::Bool(_) => DataType::Bool,
            DataValue::Object(_) => DataType::Object,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            DataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&DataObject> {
        match self {
            DataValue::Object(o) => o.as_ref(),
            _ => None,
        }
    }

    /// Contribution of this value to a node's value number.
    #[inline]
    pub(crate) fn hash_contribution(&self) -> u32 {
        match self {
            DataValue::Int(v) => *v as u32,
            DataValue::Bool(true) => 7,
            DataValue::Bool(false) => 0,
            DataValue::Object(Some(o)) => o.hash_code(),
            DataValue::Object(None) => 0,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Int(v) => write!(f, "{}", v),
            DataValue::Bool(v) => write!(f, "{}", v),
            DataValue::Object(Some(o)) => write!(f, "{:?}", o),
            DataValue::Object(None) => write!(f, "null"),
        }
    }
}
