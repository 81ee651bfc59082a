//! Traits and types shared by the ordered dictionary engines.
//!
//! Every engine module - [crate::bst], [crate::rbt], [crate::btree],
//! [crate::skiplist], [crate::sarray] - expose an `Index` type with the
//! same operations. The [Dict] type in this module is the factory that
//! picks one of them by [Kind] tag, for callers that select the engine
//! at runtime.

use std::{cmp::Ordering, fmt, result, str::FromStr};

use crate::{bst, btree, rbt, sarray, skiplist, Error, Result};

mod depth;

pub use depth::Depth;

/// Default branching rank when [Dict] builds a btree engine.
pub const BTREE_RANK: usize = 64;

/// Default tower height when [Dict] builds a skip-list engine.
pub const SKIPLIST_MAX_LEVEL: usize = 16;

/// Trait supply the total order over items, implemented by callers.
///
/// Items are opaque to the engines. An engine never inspects an item's
/// bytes, every ordering decision goes through `compare`. The engine
/// owns a single handler instance for its lifetime. Item destruction
/// is Rust's Drop, an engine drops every live item on teardown and
/// drops replaced items on insert-over-existing.
pub trait Handler<T> {
    /// Return the ordering between two items. Must be a strict total
    /// order, two items comparing Equal carry the same logical key.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Handler falling back to the item type's natural order.
#[derive(Clone, Copy, Default)]
pub struct NaturalOrd;

impl<T> Handler<T> for NaturalOrd
where
    T: Ord,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Trait to render statistics as a json string.
pub trait ToJson {
    fn to_json(&self) -> String;
}

/// Engine tags accepted by the [Dict] factory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Kind {
    Bst,
    Rbt,
    Btree,
    SkipList,
    SortedArray,
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Kind, Error> {
        match s {
            "bst" => Ok(Kind::Bst),
            "rb" | "rbt" => Ok(Kind::Rbt),
            "bt" | "btree" => Ok(Kind::Btree),
            "sl" | "skiplist" => Ok(Kind::SkipList),
            "sa" | "sarray" => Ok(Kind::SortedArray),
            _ => err_at!(InvalidInput, msg: "invalid dictionary kind {}", s),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            Kind::Bst => write!(f, "bst"),
            Kind::Rbt => write!(f, "rbt"),
            Kind::Btree => write!(f, "btree"),
            Kind::SkipList => write!(f, "skiplist"),
            Kind::SortedArray => write!(f, "sarray"),
        }
    }
}

/// Dictionary factory type, dispatch over the five engines.
///
/// All engines share one contract:
///
/// * `insert` takes ownership, return `Some(old)` when an item with
///   an equal key was replaced in place, `None` when inserted fresh.
/// * `search` return a borrow of the stored item, invalidated by the
///   next mutating call (the borrow checker enforces this).
/// * `remove` detaches the stored item and return ownership.
/// * `iter` yield every item in comparator order exactly once.
///   Mutating while iterating is rejected at compile time.
pub enum Dict<T, H>
where
    H: Handler<T>,
{
    Bst(bst::Index<T, H>),
    Rbt(rbt::Index<T, H>),
    Btree(btree::Index<T, H>),
    SkipList(skiplist::Index<T, H>),
    SortedArray(sarray::Index<T, H>),
}

impl<T, H> Dict<T, H>
where
    H: Handler<T>,
{
    /// Create a dictionary of `kind`, with default parameters for the
    /// parametrized engines, rank [BTREE_RANK] for btree and
    /// [SKIPLIST_MAX_LEVEL] levels for skip-list.
    pub fn new(kind: Kind, handler: H) -> Result<Dict<T, H>> {
        let dict = match kind {
            Kind::Bst => Dict::Bst(bst::Index::new(handler)),
            Kind::Rbt => Dict::Rbt(rbt::Index::new(handler)),
            Kind::Btree => Dict::Btree(btree::Index::new(BTREE_RANK, handler)?),
            Kind::SkipList => {
                Dict::SkipList(skiplist::Index::new(SKIPLIST_MAX_LEVEL, handler)?)
            }
            Kind::SortedArray => Dict::SortedArray(sarray::Index::new(handler)),
        };

        Ok(dict)
    }

    /// Create a btree dictionary with branching `rank`, rank must be
    /// at least 3.
    pub fn new_btree(rank: usize, handler: H) -> Result<Dict<T, H>> {
        Ok(Dict::Btree(btree::Index::new(rank, handler)?))
    }

    /// Create a skip-list dictionary with tower height `max_level`.
    pub fn new_skip_list(max_level: usize, handler: H) -> Result<Dict<T, H>> {
        Ok(Dict::SkipList(skiplist::Index::new(max_level, handler)?))
    }

    /// Return the engine tag for this instance.
    pub fn to_kind(&self) -> Kind {
        match self {
            Dict::Bst(_) => Kind::Bst,
            Dict::Rbt(_) => Kind::Rbt,
            Dict::Btree(_) => Kind::Btree,
            Dict::SkipList(_) => Kind::SkipList,
            Dict::SortedArray(_) => Kind::SortedArray,
        }
    }

    /// Insert `item`, replacing and returning an existing item with an
    /// equal key.
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self {
            Dict::Bst(index) => index.insert(item),
            Dict::Rbt(index) => index.insert(item),
            Dict::Btree(index) => index.insert(item),
            Dict::SkipList(index) => index.insert(item),
            Dict::SortedArray(index) => index.insert(item),
        }
    }

    /// Search for an item with key equal to `key`.
    pub fn search(&self, key: &T) -> Option<&T> {
        match self {
            Dict::Bst(index) => index.search(key),
            Dict::Rbt(index) => index.search(key),
            Dict::Btree(index) => index.search(key),
            Dict::SkipList(index) => index.search(key),
            Dict::SortedArray(index) => index.search(key),
        }
    }

    /// Search by comparator closure, `f` return the ordering of the
    /// probed key relative to its argument, as in `stored.cmp(key)`.
    pub fn search_with<F>(&self, f: F) -> Option<&T>
    where
        F: Fn(&T) -> Ordering,
    {
        match self {
            Dict::Bst(index) => index.search_with(f),
            Dict::Rbt(index) => index.search_with(f),
            Dict::Btree(index) => index.search_with(f),
            Dict::SkipList(index) => index.search_with(f),
            Dict::SortedArray(index) => index.search_with(f),
        }
    }

    /// Remove the item with key equal to `key`, return ownership.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        match self {
            Dict::Bst(index) => index.remove(key),
            Dict::Rbt(index) => index.remove(key),
            Dict::Btree(index) => index.remove(key),
            Dict::SkipList(index) => index.remove(key),
            Dict::SortedArray(index) => index.remove(key),
        }
    }

    /// Remove by comparator closure, refer [Dict::search_with].
    pub fn remove_with<F>(&mut self, f: F) -> Option<T>
    where
        F: Fn(&T) -> Ordering,
    {
        match self {
            Dict::Bst(index) => index.remove_with(f),
            Dict::Rbt(index) => index.remove_with(f),
            Dict::Btree(index) => index.remove_with(f),
            Dict::SkipList(index) => index.remove_with(f),
            Dict::SortedArray(index) => index.remove_with(f),
        }
    }

    /// Return number of live items.
    pub fn len(&self) -> usize {
        match self {
            Dict::Bst(index) => index.len(),
            Dict::Rbt(index) => index.len(),
            Dict::Btree(index) => index.len(),
            Dict::SkipList(index) => index.len(),
            Dict::SortedArray(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate items in comparator order.
    pub fn iter(&self) -> Iter<T> {
        match self {
            Dict::Bst(index) => Iter::Bst(index.iter()),
            Dict::Rbt(index) => Iter::Rbt(index.iter()),
            Dict::Btree(index) => Iter::Btree(index.iter()),
            Dict::SkipList(index) => Iter::SkipList(index.iter()),
            Dict::SortedArray(index) => Iter::SortedArray(index.iter()),
        }
    }

    /// Walk the engine structure and verify its invariants, refer to
    /// each engine's `validate` for the exact checks.
    pub fn validate(&self) -> Result<()>
    where
        T: fmt::Debug,
    {
        match self {
            Dict::Bst(index) => index.validate(),
            Dict::Rbt(index) => index.validate().map(|_stats| ()),
            Dict::Btree(index) => index.validate().map(|_stats| ()),
            Dict::SkipList(index) => index.validate(),
            Dict::SortedArray(index) => index.validate(),
        }
    }
}

/// Iterator type over [Dict], yield items in comparator order.
pub enum Iter<'a, T> {
    Bst(bst::Iter<'a, T>),
    Rbt(rbt::Iter<'a, T>),
    Btree(btree::Iter<'a, T>),
    SkipList(skiplist::Iter<'a, T>),
    SortedArray(std::slice::Iter<'a, T>),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        match self {
            Iter::Bst(iter) => iter.next(),
            Iter::Rbt(iter) => iter.next(),
            Iter::Btree(iter) => iter.next(),
            Iter::SkipList(iter) => iter.next(),
            Iter::SortedArray(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
