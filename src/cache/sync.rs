//! Module implement the thread-safe cache wrapper.

use std::{fmt, sync::Arc};

use crate::{
    cache::{Cache, CacheHandler, Policy, Stats, Wr},
    util::RwLatch,
    Result,
};

/// Thread-safe wrapper over [Cache], clone to share across threads.
///
/// Every mutating call takes the write side of the latch. `get` also
/// takes the write side, unconditionally, recency moves under LRU and
/// lazy expiration can erase under any policy, so a read-side `get`
/// would mutate behind concurrent readers. Only `len`, `to_stats` and
/// `validate` ride the read side.
pub struct SyncCache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    inner: Arc<RwLatch<Cache<T, H>>>,
}

impl<T, H> Clone for SyncCache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    fn clone(&self) -> Self {
        SyncCache { inner: Arc::clone(&self.inner) }
    }
}

impl<T, H> SyncCache<T, H>
where
    H: CacheHandler<T> + Clone,
{
    pub fn new(policy: Policy, max_items: usize, handler: H) -> Result<SyncCache<T, H>> {
        let cache = Cache::new(policy, max_items, handler)?;
        Ok(SyncCache { inner: Arc::new(RwLatch::new(cache)) })
    }

    pub fn put(&self, item: T, exp_time: i64) -> Wr {
        self.inner.write().put(item, exp_time)
    }

    pub fn get(&self, key: &T, out: &mut H::Out) -> Result<bool> {
        self.inner.write().get(key, out)
    }

    pub fn erase(&self, key: &T) -> bool {
        self.inner.write().erase(key)
    }

    pub fn remove(&self, key: &T) -> Option<(T, i64)> {
        self.inner.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn to_policy(&self) -> Policy {
        self.inner.read().to_policy()
    }

    pub fn to_stats(&self) -> Stats {
        self.inner.read().to_stats()
    }

    pub fn validate(&self) -> Result<()>
    where
        T: fmt::Debug,
    {
        self.inner.read().validate()
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;
