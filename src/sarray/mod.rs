//! Module implement the sorted-array dictionary engine.
//!
//! Simplest of the engines, a contiguous array of items kept in
//! comparator order, located by binary search. Insert and remove shift
//! the tail, so mutations are O(n) while lookups stay O(log n). Useful
//! as the reference implementation the other engines are tested
//! against, and on its own when the working set is small or mostly
//! read-only.

use std::{cmp::Ordering, fmt, mem, result, slice};

use crate::{dict::Handler, Error, Result};

/// Index type implementing the sorted-array engine.
pub struct Index<T, H>
where
    H: Handler<T>,
{
    items: Vec<T>,
    handler: H,
}

impl<T, H> Index<T, H>
where
    H: Handler<T>,
{
    pub fn new(handler: H) -> Index<T, H> {
        Index { items: Vec::new(), handler }
    }

    /// Insert `item`. If an item with an equal key is present, it is
    /// overwritten in place and returned.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let handler = &self.handler;
        match binary_search(&self.items, &|x| handler.compare(x, &item)) {
            Ok(off) => Some(mem::replace(&mut self.items[off], item)),
            Err(off) => {
                if self.items.len() == self.items.capacity() {
                    // grow to 3n/2 + 1 slots.
                    let additional = self.items.len() / 2 + 1;
                    self.items.reserve_exact(additional);
                }
                self.items.insert(off, item);
                None
            }
        }
    }

    /// Return a borrow of the stored item with key equal to `key`.
    pub fn search(&self, key: &T) -> Option<&T> {
        let handler = &self.handler;
        self.search_with(|x| handler.compare(x, key))
    }

    /// Search by comparator closure, `f` returning `stored.cmp(key)`.
    pub fn search_with<F>(&self, f: F) -> Option<&T>
    where
        F: Fn(&T) -> Ordering,
    {
        match binary_search(&self.items, &f) {
            Ok(off) => Some(&self.items[off]),
            Err(_) => None,
        }
    }

    /// Remove the item with key equal to `key`, return ownership.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let handler = &self.handler;
        match binary_search(&self.items, &|x| handler.compare(x, key)) {
            Ok(off) => Some(self.items.remove(off)),
            Err(_) => None,
        }
    }

    /// Remove by comparator closure, refer [Index::search_with].
    pub fn remove_with<F>(&mut self, f: F) -> Option<T>
    where
        F: Fn(&T) -> Ordering,
    {
        match binary_search(&self.items, &f) {
            Ok(off) => Some(self.items.remove(off)),
            Err(_) => None,
        }
    }

    /// Return number of live items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate items in comparator order.
    pub fn iter(&self) -> slice::Iter<T> {
        self.items.iter()
    }

    /// Confirm the backing array is in strict comparator order.
    pub fn validate(&self) -> Result<()>
    where
        T: fmt::Debug,
    {
        for w in self.items.windows(2) {
            if self.handler.compare(&w[0], &w[1]) != Ordering::Less {
                err_at!(Fatal, msg: "sarray sort order {:?} !< {:?}", w[0], w[1])?;
            }
        }
        Ok(())
    }
}

// Search the sorted range [first, first+size) by halving. On a miss
// the returned Err carries the stable insertion point.
fn binary_search<T, F>(items: &[T], f: &F) -> result::Result<usize, usize>
where
    F: Fn(&T) -> Ordering,
{
    let (mut first, mut size) = (0, items.len());

    while size > 0 {
        let half = size / 2;
        let mid = first + half;
        match f(&items[mid]) {
            Ordering::Less => {
                first = mid + 1;
                size = size - half - 1;
            }
            Ordering::Greater => size = half,
            Ordering::Equal => return Ok(mid),
        }
    }

    Err(first)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
