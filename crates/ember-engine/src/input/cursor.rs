use std::fmt;
use std::num::NonZeroU32;

use crate::coords::Vec2;
use crate::graphics::{Extent, PixelFormat};

/// Handle of a cursor slot. Handles are 1-based; the wire value 0 means "no cursor" and
/// maps to `Option::None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CursorId(NonZeroU32);

impl CursorId {
    #[inline]
    pub const fn new(handle: NonZeroU32) -> Self {
        Self(handle)
    }

    /// Converts a raw handle; `0` yields `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    #[inline]
    const fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor#{}", self.0)
    }
}

/// Platform cursor shapes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum SystemCursor {
    #[default]
    Arrow,
    Text,
    Crosshair,
    Hand,
    ResizeHorizontal,
    ResizeVertical,
    ResizeDiagonalNeSw,
    ResizeDiagonalNwSe,
    Move,
    NotAllowed,
    Wait,
}

/// Pixel data of a custom cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorImage {
    pub data: Vec<u8>,
    pub size: Extent,
    pub pixel_format: PixelFormat,
    pub hot_spot: Vec2,
}

/// What an `InitCursor` builds: a platform shape or a custom image.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorSource {
    System(SystemCursor),
    Image(CursorImage),
}

/// Dense table of native cursors addressed by [`CursorId`].
///
/// Growth is exact-fit: inserting handle N into a shorter table extends it to N slots,
/// with the slots in between left empty.
#[derive(Debug)]
pub struct CursorTable<C> {
    slots: Vec<Option<C>>,
}

impl<C> Default for CursorTable<C> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<C> CursorTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cursor` at `id`, replacing (and returning) any previous occupant.
    pub fn insert(&mut self, id: CursorId, cursor: C) -> Option<C> {
        self.reserve_slot(id);
        self.slots[id.slot()].replace(cursor)
    }

    /// Makes sure `id` addresses a slot, leaving it empty if new.
    pub fn reserve_slot(&mut self, id: CursorId) {
        let len = id.get() as usize;
        if len > self.slots.len() {
            self.slots.resize_with(len, || None);
        }
    }

    pub fn get(&self, id: CursorId) -> Option<&C> {
        self.slots.get(id.slot()).and_then(Option::as_ref)
    }

    /// Empties the slot. The table never shrinks.
    pub fn remove(&mut self, id: CursorId) -> Option<C> {
        self.slots.get_mut(id.slot()).and_then(Option::take)
    }

    /// Number of addressable slots (occupied or not).
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> CursorId {
        CursorId::from_raw(raw).unwrap()
    }

    #[test]
    fn zero_is_no_cursor() {
        assert_eq!(CursorId::from_raw(0), None);
        assert_eq!(id(3).get(), 3);
    }

    #[test]
    fn insert_grows_exact_fit_with_gaps() {
        let mut table = CursorTable::new();
        table.insert(id(4), "beam");

        assert_eq!(table.len(), 4);
        assert_eq!(table.occupied(), 1);
        for raw in 1..=3 {
            assert!(table.get(id(raw)).is_none());
        }
        assert_eq!(table.get(id(4)), Some(&"beam"));
    }

    #[test]
    fn insert_below_len_does_not_grow() {
        let mut table = CursorTable::new();
        table.insert(id(5), 5);
        table.insert(id(2), 2);
        assert_eq!(table.len(), 5);
        assert_eq!(table.insert(id(2), 20), Some(2));
    }

    #[test]
    fn remove_keeps_slot_count() {
        let mut table = CursorTable::new();
        table.insert(id(1), 'a');
        assert_eq!(table.remove(id(1)), Some('a'));
        assert_eq!(table.remove(id(1)), None);
        assert_eq!(table.remove(id(9)), None);
        assert_eq!(table.len(), 1);
    }
}
