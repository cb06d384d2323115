//! # Owner Slots
//!
//! An owner slot is the variable that remembers where an allocation lives.
//! The zone keeps a weak reference to it and empties it when the block is
//! freed or purged, so a purged lump reads as "not cached" rather than as
//! whatever the zone put there next.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::ptr::ZonePtr;

/// Shared, nullable reference to a zone allocation.
///
/// Cloning shares the slot. The zone only ever holds a [`Weak`] to it, so
/// dropping every clone simply detaches the block from its owner.
#[derive(Clone, Debug, Default)]
pub struct OwnerSlot {
    cell: Rc<Cell<Option<ZonePtr>>>,
}

impl OwnerSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the allocation currently held, if any.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<ZonePtr> {
        self.cell.get()
    }

    /// Returns `true` if the slot holds an allocation.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns `true` if both slots share the same cell.
    #[inline]
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn set(&self, ptr: ZonePtr) {
        self.cell.set(Some(ptr));
    }

    pub(crate) fn downgrade(&self) -> WeakOwner {
        WeakOwner {
            cell: Rc::downgrade(&self.cell),
        }
    }
}

/// The zone's side of an [`OwnerSlot`].
#[derive(Debug)]
pub(crate) struct WeakOwner {
    cell: Weak<Cell<Option<ZonePtr>>>,
}

impl WeakOwner {
    /// Empties the slot if it still refers to `ptr`.
    ///
    /// An owner that has since been pointed at another block keeps that
    /// block.
    pub(crate) fn clear(&self, ptr: ZonePtr) {
        if let Some(cell) = self.cell.upgrade() {
            if cell.get() == Some(ptr) {
                cell.set(None);
            }
        }
    }

    /// Returns `true` if the owning slot has been dropped.
    pub(crate) fn is_detached(&self) -> bool {
        self.cell.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_only_matching_pointer() {
        let slot = OwnerSlot::new();
        let weak = slot.downgrade();

        slot.set(ZonePtr::new(1, 1));
        weak.clear(ZonePtr::new(1, 0));
        assert_eq!(slot.get(), Some(ZonePtr::new(1, 1)));

        weak.clear(ZonePtr::new(1, 1));
        assert!(!slot.is_set());
    }

    #[test]
    fn test_detached_owner() {
        let slot = OwnerSlot::new();
        let weak = slot.downgrade();
        let shared = slot.clone();
        assert!(shared.same_slot(&slot));

        drop(slot);
        assert!(!weak.is_detached());
        drop(shared);
        assert!(weak.is_detached());
        // Clearing a detached owner is a no-op.
        weak.clear(ZonePtr::new(0, 0));
    }
}
