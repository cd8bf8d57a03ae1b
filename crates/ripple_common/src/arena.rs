//! Append-only storage addressed by typed integer IDs.
//!
//! Signals and nodes reference each other by ID rather than by pointer, which
//! keeps the cyclic signal/observer graph free of shared ownership.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed index into an [`Arena`].
pub trait ArenaId: Copy {
    /// Wraps a raw slot index.
    fn from_raw(index: u32) -> Self;

    /// Unwraps the raw slot index.
    fn as_raw(self) -> u32;
}

/// Append-only vector whose slots are addressed by `I`.
///
/// Nothing is ever removed, so every ID handed out stays valid.
pub struct Arena<I, T> {
    slots: Vec<T>,
    _id: PhantomData<fn() -> I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `item` and returns the ID of its slot.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(item);
        id
    }

    /// Returns the item in slot `id`, or `None` for an ID from another arena.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize)
    }

    /// Mutable counterpart of [`try_get`](Arena::try_get).
    pub fn try_get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.as_raw() as usize)
    }

    /// Returns `true` if `id` names a slot of this arena.
    pub fn contains(&self, id: I) -> bool {
        (id.as_raw() as usize) < self.slots.len()
    }

    /// Number of allocated slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` before the first allocation.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `(id, item)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        (0u32..).zip(&self.slots).map(|(i, t)| (I::from_raw(i), t))
    }

    /// Mutable access to every item in allocation order.
    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.slots.iter_mut()
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T: fmt::Debug> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.slots).finish()
    }
}

impl<I, T: Clone> Clone for Arena<I, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            _id: PhantomData,
        }
    }
}

/// Panics on an ID that was not allocated by this arena.
impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.slots[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.slots[id.as_raw() as usize]
    }
}
