//! Slot arena for graph nodes.
//!
//! Nodes refer to each other through [`Id`] handles, never through pointers,
//! so the cyclic edge/back-edge structure of the graph has no ownership
//! cycles. The arena differs from a bump arena in one respect: entries can be
//! removed. A removed slot is never reused, which keeps every handle that was
//! ever issued pointing at either its original item or at a vacancy.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// =============================================================================
// Handles
// =============================================================================

/// Handle to a slot of an `Arena<T>`.
///
/// Equality, ordering and hashing look only at the slot number, so a handle
/// is `Copy` and usable as a map key whatever `T` is.
pub struct Id<T> {
    raw: u32,
    _of: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Id {
            raw,
            _of: PhantomData,
        }
    }

    /// Slot number this handle names.
    #[inline]
    pub const fn index(self) -> u32 {
        self.raw
    }

    #[inline]
    const fn slot(self) -> usize {
        self.raw as usize
    }
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.raw);
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Arena of items addressed by [`Id`], with explicit removal.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Arena<T> {
    /// Create a new empty arena.
    #[inline]
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Create a new arena with the given initial capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            slots: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Allocate a new item and return its handle.
    #[inline]
    pub fn alloc(&mut self, item: T) -> Id<T> {
        let index = self.slots.len() as u32;
        self.slots.push(Some(item));
        self.live += 1;
        Id::new(index)
    }

    /// Remove an item. The slot stays vacant forever.
    pub fn remove(&mut self, id: Id<T>) -> Option<T> {
        let taken = self.slots.get_mut(id.slot()).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.slots.get(id.slot()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.slots.get_mut(id.slot()).and_then(Option::as_mut)
    }

    #[inline]
    pub fn contains(&self, id: Id<T>) -> bool {
        self.get(id).is_some()
    }

    /// Number of live items.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of handles ever issued, live or not.
    #[inline]
    pub fn capacity_used(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over live items in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (Id::new(i as u32), item)))
    }

    /// Iterate over live handles in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = Id<T>> + '_ {
        self.iter().map(|(id, _)| id)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
