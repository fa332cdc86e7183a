//! Bit iterators
//!
//! Ascending bit-position sequences over a store, and the paged merge of
//! several of them.

use std::collections::VecDeque;
use std::iter::Peekable;

use crate::bitmap::Bitmap;

/// Ascending sequence of bit positions with seek support
///
/// `next` returning `None` means every position has been consumed.
pub trait BitIterator: Iterator<Item = u64> + Send {
    /// Position the iterator so the next value is the first one `>= offset`
    fn seek(&mut self, offset: u64);

    /// Largest value this iterator could ever yield, `None` if empty
    fn max_value(&self) -> Option<u64>;
}

/// Ascending bits left in a snapshot
type Cursor = Peekable<Box<dyn Iterator<Item = u64> + Send>>;

/// Iterator over an owned snapshot of a store's bitmap
///
/// Owns its data, so a later flush or close of the store cannot
/// invalidate it; it just goes stale.
pub struct SnapshotIterator {
    bitmap: Bitmap,
    /// Yields exactly the bits above `passed`
    cursor: Cursor,
    passed: Option<u64>,
}

impl SnapshotIterator {
    pub fn new(bitmap: Bitmap) -> Self {
        let cursor = Self::cursor_from(&bitmap, 0);
        Self {
            bitmap,
            cursor,
            passed: None,
        }
    }

    fn cursor_from(bitmap: &Bitmap, offset: u64) -> Cursor {
        let bits: Box<dyn Iterator<Item = u64> + Send> =
            Box::new(bitmap.clone().into_iter_from(offset));
        bits.peekable()
    }
}

impl Iterator for SnapshotIterator {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let bit = self.cursor.next()?;
        self.passed = Some(bit);
        Some(bit)
    }
}

impl BitIterator for SnapshotIterator {
    /// Forward seeks advance the cursor; backward seeks rebuild it.
    fn seek(&mut self, offset: u64) {
        match self.passed {
            Some(passed) if offset <= passed => {
                self.cursor = Self::cursor_from(&self.bitmap, offset);
            }
            _ => {
                while self.cursor.next_if(|bit| *bit < offset).is_some() {}
            }
        }
        self.passed = offset.checked_sub(1);
    }

    fn max_value(&self) -> Option<u64> {
        self.bitmap.max()
    }
}

/// Front-drained chain of page iterators
///
/// `push` puts an iterator at the front, and `next` always reads the
/// front, dropping it once exhausted. The result is only ascending if the
/// caller pushes iterators so that, front to back, every iterator's values
/// exceed all values of the ones before it. Nothing here sorts or checks
/// for overlap.
#[derive(Default)]
pub struct PagedIterator {
    items: VecDeque<Box<dyn BitIterator>>,
}

impl PagedIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `item` at the front; it is drained before everything pushed earlier
    pub fn push(&mut self, item: Box<dyn BitIterator>) {
        self.items.push_front(item);
    }

    /// Remove and return the front iterator
    pub fn pop(&mut self) -> Option<Box<dyn BitIterator>> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sub-iterators not yet discarded
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl Iterator for PagedIterator {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while let Some(front) = self.items.front_mut() {
            if let Some(bit) = front.next() {
                return Some(bit);
            }
            self.items.pop_front();
        }
        None
    }
}

impl BitIterator for PagedIterator {
    /// Drops front iterators that end below `offset`, then seeks within the
    /// first one that may contain it.
    fn seek(&mut self, offset: u64) {
        while let Some(front) = self.items.front_mut() {
            match front.max_value() {
                Some(max) if offset <= max => {
                    front.seek(offset);
                    return;
                }
                _ => {
                    self.items.pop_front();
                }
            }
        }
    }

    fn max_value(&self) -> Option<u64> {
        self.items.iter().filter_map(|item| item.max_value()).max()
    }
}
