//! Module implement the in-memory FIFO/LRU cache.
//!
//! The cache keeps every live entry in two views at once, an ordered
//! dictionary keyed by the item's comparator and a doubly-linked
//! recency list in eviction order. `put` appends at the recency tail,
//! overflow evicts from the head, and under the LRU policy a hit moves
//! the entry back to the tail. Under FIFO a hit leaves recency alone,
//! so the head is always the oldest insert.
//!
//! Expiration is lazy. Nothing scans for expired entries, an expired
//! entry is noticed and erased by the `get` that trips over it.
//!
//! The core is single threaded. [SyncCache] wraps it behind the
//! [crate::util::RwLatch] read-write latch for multi-threaded callers.

use std::{
    cmp::Ordering,
    fmt, result,
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc,
    },
};

use crate::{
    dict::{Dict, Handler, Kind, ToJson},
    util, Error, Result,
};

mod rlist;
mod sync;

use rlist::RList;
pub use sync::SyncCache;

/// Eviction policies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Policy {
    Fifo,
    Lru,
}

impl std::str::FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Policy, Error> {
        match s {
            "FIFO" | "fifo" => Ok(Policy::Fifo),
            "LRU" | "lru" => Ok(Policy::Lru),
            _ => err_at!(InvalidInput, msg: "invalid eviction policy {}", s),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            Policy::Fifo => write!(f, "FIFO"),
            Policy::Lru => write!(f, "LRU"),
        }
    }
}

/// Result type for write operations into a cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Wr {
    /// fresh key, item inserted.
    New,
    /// existing key, old item destroyed and replaced.
    Update,
}

/// Trait supply the cache callbacks, ordering plus the hit hook.
///
/// `on_hit` runs while the cache holds its lock, it is expected to
/// copy what the caller needs out of the item into `out` and return,
/// the `&T` borrow does not outlive the call.
pub trait CacheHandler<T>: Handler<T> {
    type Out;

    fn on_hit(&self, item: &T, out: &mut Self::Out);
}

// Cache entry, lives in the ordered index and the recency list, both
// hold an Arc. `slot` is the entry's current recency-list slot.
#[derive(Debug)]
struct Entry<T> {
    item: T,
    exp_time: i64,
    slot: AtomicUsize,
}

// Order entries by their item through the caller's handler.
struct EntryOrd<H> {
    handler: H,
}

impl<T, H> Handler<Arc<Entry<T>>> for EntryOrd<H>
where
    H: Handler<T>,
{
    #[inline]
    fn compare(&self, a: &Arc<Entry<T>>, b: &Arc<Entry<T>>) -> Ordering {
        self.handler.compare(&a.item, &b.item)
    }
}

/// Index type implementing the in-memory cache, composed from an
/// ordered dictionary (red-black engine) and a recency list.
pub struct Cache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    policy: Policy,
    max_items: usize,
    handler: H,
    index: Dict<Arc<Entry<T>>, EntryOrd<H>>,
    rlist: RList<T>,
    n_hits: usize,
    n_accesses: usize,
}

impl<T, H> Cache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    /// Create a cache evicting by `policy` once `max_items` entries
    /// are live. `max_items` of 0 disables eviction.
    pub fn new(policy: Policy, max_items: usize, handler: H) -> Result<Cache<T, H>> {
        let index = Dict::new(Kind::Rbt, EntryOrd { handler: handler.clone() })?;
        Ok(Cache {
            policy,
            max_items,
            handler,
            index,
            rlist: RList::new(),
            n_hits: 0,
            n_accesses: 0,
        })
    }

    /// Insert `item` with expiration `exp_time`, 0 never expires.
    /// The entry lands at the recency tail either way, and overflow
    /// evicts from the head until the cache fits again.
    pub fn put(&mut self, item: T, exp_time: i64) -> Wr {
        let entry = Arc::new(Entry { item, exp_time, slot: AtomicUsize::new(0) });

        let wr = match self.index.insert(Arc::clone(&entry)) {
            Some(old) => {
                self.rlist.remove(old.slot.load(SeqCst));
                Wr::Update
            }
            None => Wr::New,
        };
        self.rlist.append(entry);

        while self.max_items > 0 && self.index.len() > self.max_items {
            self.evict_head();
        }

        wr
    }

    /// Lookup `key`. On a live hit the handler's `on_hit` copies the
    /// item out into `out` and, under LRU, the entry moves to the
    /// recency tail. An expired entry is erased and reported a miss.
    pub fn get(&mut self, key: &T, out: &mut H::Out) -> Result<bool> {
        self.n_accesses += 1;

        let found = {
            let handler = &self.handler;
            let entry = self.index.search_with(|e| handler.compare(&e.item, key));
            entry.map(Arc::clone)
        };

        let entry = match found {
            Some(entry) => entry,
            None => return Ok(false),
        };

        if entry.exp_time > 0 && entry.exp_time < util::epoch_secs()? {
            self.detach(&entry);
            return Ok(false);
        }

        self.handler.on_hit(&entry.item, out);
        if let Policy::Lru = self.policy {
            self.rlist.update(entry.slot.load(SeqCst));
        }
        self.n_hits += 1;
        Ok(true)
    }

    /// Erase the entry under `key`, destroying the item.
    pub fn erase(&mut self, key: &T) -> bool {
        let found = {
            let handler = &self.handler;
            self.index.remove_with(|e| handler.compare(&e.item, key))
        };

        match found {
            Some(entry) => {
                self.rlist.remove(entry.slot.load(SeqCst));
                true
            }
            None => false,
        }
    }

    /// Detach the entry under `key` without destroying it, return the
    /// item and its stored expiration.
    pub fn remove(&mut self, key: &T) -> Option<(T, i64)> {
        let entry = {
            let handler = &self.handler;
            self.index.remove_with(|e| handler.compare(&e.item, key))?
        };
        self.rlist.remove(entry.slot.load(SeqCst));

        match Arc::try_unwrap(entry) {
            Ok(Entry { item, exp_time, .. }) => Some((item, exp_time)),
            Err(_) => unreachable!(),
        }
    }

    /// Return number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn to_policy(&self) -> Policy {
        self.policy
    }

    /// Snapshot hits, accesses and live size.
    pub fn to_stats(&self) -> Stats {
        Stats {
            hits: self.n_hits,
            accesses: self.n_accesses,
            size: self.index.len(),
        }
    }

    /// Confirm both views agree, every indexed entry sits in the
    /// recency list under its recorded slot and vice versa.
    pub fn validate(&self) -> Result<()>
    where
        T: fmt::Debug,
    {
        self.index.validate()?;
        self.rlist.validate()?;

        if self.index.len() != self.rlist.len() {
            let (i, r) = (self.index.len(), self.rlist.len());
            err_at!(Fatal, msg: "cache views disagree, index {} rlist {}", i, r)?;
        }
        if self.max_items > 0 && self.index.len() > self.max_items {
            let n = self.index.len();
            err_at!(Fatal, msg: "cache over capacity {} > {}", n, self.max_items)?;
        }

        for entry in self.index.iter() {
            let slot = entry.slot.load(SeqCst);
            let listed = match self.rlist.entry_at(slot) {
                Some(listed) => listed,
                None => err_at!(Fatal, msg: "cache entry missing slot {}", slot)?,
            };
            if !Arc::ptr_eq(entry, listed) {
                err_at!(Fatal, msg: "cache slot {} holds a different entry", slot)?;
            }
        }

        Ok(())
    }
}

impl<T, H> Cache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    fn evict_head(&mut self) {
        let victim = match self.rlist.head_entry() {
            Some(victim) => victim,
            None => return,
        };
        self.rlist.remove(victim.slot.load(SeqCst));

        let handler = &self.handler;
        self.index.remove_with(|e| handler.compare(&e.item, &victim.item));
    }

    fn detach(&mut self, entry: &Arc<Entry<T>>) {
        self.rlist.remove(entry.slot.load(SeqCst));

        let handler = &self.handler;
        self.index.remove_with(|e| handler.compare(&e.item, &entry.item));
    }
}

/// Statistic type, for [Cache] and [SyncCache].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub hits: usize,
    pub accesses: usize,
    pub size: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "cache = {{ hits = {}, accesses = {}, size = {} }}",
            self.hits, self.accesses, self.size,
        )
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        format!(
            r#"{{ "cache": {{ "hits": {}, "accesses": {}, "size": {} }} }}"#,
            self.hits, self.accesses, self.size,
        )
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
