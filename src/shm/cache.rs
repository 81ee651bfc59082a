//! Module implement the shared-memory cache.
//!
//! A fixed-size-item cache whose entire state lives in a mapped file,
//! composed from the [alloc::Allocator] slab, the [index::HashIndex]
//! and the [evict] list. A process reopening the file trusts nothing
//! but the header metadata, live records are re-discovered by
//! checksum and re-inserted in ascending `(exp_time, offset)` order so
//! the rebuilt recency order is deterministic across reopens.
//!
//! Single writer by contract. An exclusive file lock is held across
//! init and recovery, steady-state multi-process use needs external
//! locking.

use fs2::FileExt;
use memmap2::MmapMut;

use std::{collections::HashSet, ffi};

use crate::{
    cache::{Policy, Stats, Wr},
    hash::fnv32a,
    shm::{
        alloc::Allocator, evict, index::HashIndex, mmap, read_i64, read_u32, read_word,
        write_i64, write_u32, write_word, Opened, ShmHandler, ENT_CHECKSUM, ENT_EVICT_NEXT,
        ENT_EVICT_PREV, ENT_EXP_TIME, ENT_KEY_NEXT, ENT_PAYLOAD, HDR_BUCKETS,
        HDR_EVICT_HEAD, HDR_EVICT_TAIL, HDR_ITEM_SIZE, HDR_LEN, HDR_MAGIC0, HDR_MAGIC1,
        HDR_MAX_BUCKET, W,
    },
    util, Error, Result,
};

/// Index type implementing the shared-memory cache.
pub struct ShmCache<H>
where
    H: ShmHandler,
{
    handler: H,
    max_bucket: usize,
    item_size: usize,
    policy: Policy,

    map: Option<MmapMut>,
    alloc: Allocator,
    index: HashIndex,

    n_hits: usize,
    n_accesses: usize,
}

impl<H> ShmCache<H>
where
    H: ShmHandler,
{
    /// Configure a cache over `max_bucket` hash buckets of
    /// `item_size`-byte items. Nothing is mapped until [ShmCache::init].
    pub fn new(handler: H, max_bucket: usize, item_size: usize) -> Result<ShmCache<H>> {
        if max_bucket == 0 {
            err_at!(InvalidInput, msg: "zero hash buckets")?;
        }
        if item_size == 0 {
            err_at!(InvalidInput, msg: "zero item size")?;
        }

        Ok(ShmCache {
            handler,
            max_bucket,
            item_size,
            policy: Policy::Fifo,

            map: None,
            alloc: Allocator::new(0, ENT_PAYLOAD + item_size),
            index: HashIndex::new(max_bucket, item_size),

            n_hits: 0,
            n_accesses: 0,
        })
    }

    /// Eviction behavior on hit, default FIFO.
    pub fn set_evict_algo(&mut self, policy: Policy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Map `path` with a record region of `len` bytes, creating the
    /// file when missing. Reuse verifies the stored metadata against
    /// this configuration and replays the recovery pass. On failure
    /// the mapping is released and the file left for inspection.
    pub fn init(&mut self, path: &ffi::OsStr, len: usize) -> Result<Opened> {
        let header_len = self.header_len();
        let (file, mut map, is_new) = mmap::open_or_create(path, header_len + len)?;

        // recovery must not run concurrently with another opener.
        err_at!(IOError, file.lock_exclusive())?;
        let res = self.do_init(&mut map, is_new, len);
        file.unlock().ok();

        match res {
            Ok(opened) => {
                log::debug!("{:?} file {:?}", opened, path);
                self.map = Some(map);
                Ok(opened)
            }
            Err(err) => {
                log::warn!("init {:?} fail, {}", path, err);
                Err(err)
            }
        }
    }

    /// Lookup `key`. A live hit copies the payload out through the
    /// handler's `on_hit` and, under LRU, refreshes recency. An
    /// expired entry is erased and reported a miss.
    pub fn get(&mut self, key: &[u8], out: &mut H::Out) -> Result<bool> {
        if key.len() != self.item_size {
            err_at!(InvalidInput, msg: "key size {} != {}", key.len(), self.item_size)?;
        }
        self.n_accesses += 1;

        let header_len = self.header_len();
        let map = match self.map.as_mut() {
            Some(map) => map,
            None => return err_at!(Fatal, msg: "cache not initialized"),
        };
        let (hdr, region) = map.split_at_mut(header_len);

        let off = match self.index.get(hdr, region, &self.handler, key) {
            Some(off) => off,
            None => return Ok(false),
        };

        let exp_time = read_i64(region, off + ENT_EXP_TIME);
        if exp_time > 0 && exp_time < util::epoch_secs()? {
            let payload = self.index.payload_of(region, off).to_vec();
            self.handler.on_destroy(&payload);
            self.index.remove(hdr, region, &self.handler, &payload);
            evict::remove(hdr, region, off);
            self.alloc.free(region, off);
            return Ok(false);
        }

        self.handler.on_hit(self.index.payload_of(region, off), out);
        if let Policy::Lru = self.policy {
            evict::update(hdr, region, off);
        }
        self.n_hits += 1;
        Ok(true)
    }

    /// Insert or overwrite the entry under `item`'s key. When the
    /// slab is full, one expired entry at the evict head is reclaimed
    /// and the allocation retried, a second failure is OutOfMemory.
    pub fn put(&mut self, item: &[u8], exp_time: i64) -> Result<Wr> {
        if item.len() != self.item_size {
            err_at!(InvalidInput, msg: "item size {} != {}", item.len(), self.item_size)?;
        }

        let header_len = self.header_len();
        let map = match self.map.as_mut() {
            Some(map) => map,
            None => return err_at!(Fatal, msg: "cache not initialized"),
        };
        let (hdr, region) = map.split_at_mut(header_len);

        if let Some(off) = self.index.get(hdr, region, &self.handler, item) {
            let n = off + ENT_PAYLOAD;
            region[n..n + self.item_size].copy_from_slice(item);
            write_u32(region, off + ENT_CHECKSUM, fnv32a(item));
            write_i64(region, off + ENT_EXP_TIME, exp_time);
            evict::update(hdr, region, off);
            return Ok(Wr::Update);
        }

        let off = match self.alloc.alloc(region) {
            Some(off) => Some(off),
            None => {
                // reclaim the evict head iff it sits expired, then retry.
                let head = evict::head(hdr);
                if head != 0 {
                    let head_exp = read_i64(region, head + ENT_EXP_TIME);
                    if head_exp > 0 && head_exp < util::epoch_secs()? {
                        let payload = self.index.payload_of(region, head).to_vec();
                        self.handler.on_destroy(&payload);
                        self.index.remove(hdr, region, &self.handler, &payload);
                        evict::remove(hdr, region, head);
                        self.alloc.free(region, head);
                    }
                }
                self.alloc.alloc(region)
            }
        };

        match off {
            None => err_at!(OutOfMemory, msg: "slab full, no expired head"),
            Some(off) => {
                let n = off + ENT_PAYLOAD;
                region[n..n + self.item_size].copy_from_slice(item);
                write_u32(region, off + ENT_CHECKSUM, fnv32a(item));
                write_i64(region, off + ENT_EXP_TIME, exp_time);
                self.index.put(hdr, region, &self.handler, off);
                evict::append(hdr, region, off);
                Ok(Wr::New)
            }
        }
    }

    /// Erase the entry under `key`, freeing its record.
    pub fn erase(&mut self, key: &[u8]) -> Result<bool> {
        if key.len() != self.item_size {
            err_at!(InvalidInput, msg: "key size {} != {}", key.len(), self.item_size)?;
        }

        let header_len = self.header_len();
        let map = match self.map.as_mut() {
            Some(map) => map,
            None => return err_at!(Fatal, msg: "cache not initialized"),
        };
        let (hdr, region) = map.split_at_mut(header_len);

        match self.index.remove(hdr, region, &self.handler, key) {
            None => Ok(false),
            Some(off) => {
                let payload = self.index.payload_of(region, off).to_vec();
                self.handler.on_destroy(&payload);
                evict::remove(hdr, region, off);
                self.alloc.free(region, off);
                Ok(true)
            }
        }
    }

    /// Snapshot hits, accesses and live size.
    pub fn to_stats(&self) -> Stats {
        Stats {
            hits: self.n_hits,
            accesses: self.n_accesses,
            size: self.index.len(),
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

    /// Walk every hash chain through the handler's dump hook.
    pub fn dump_hash(&self) -> Result<()> {
        let (hdr, region) = self.parts()?;
        for bucket in 0..self.index.max_bucket() {
            let mut off = read_word(hdr, self.index.bucket_off(bucket));
            while off > 0 {
                self.handler.on_dump_hash(bucket, self.index.payload_of(region, off));
                off = read_word(region, off + ENT_KEY_NEXT);
            }
        }
        Ok(())
    }

    /// Walk the evict list through the handler's dump hook.
    pub fn dump_evict(&self) -> Result<()> {
        let (hdr, region) = self.parts()?;
        let mut off = read_word(hdr, HDR_EVICT_HEAD);
        while off > 0 {
            let exp_time = read_i64(region, off + ENT_EXP_TIME);
            self.handler.on_dump_evict(exp_time, self.index.payload_of(region, off));
            off = read_word(region, off + ENT_EVICT_NEXT);
        }
        Ok(())
    }

    /// Cross-check the allocator, the hash chains and the evict list
    /// against each other.
    pub fn self_check(&self) -> Result<()> {
        let (hdr, region) = self.parts()?;

        let (_n_free, n_used) = self.alloc.self_check(region)?;

        // every hash-chained record is USED, no chain loops, and all
        // used records are chained.
        let mut seen: HashSet<usize> = HashSet::new();
        for bucket in 0..self.index.max_bucket() {
            let mut off = read_word(hdr, self.index.bucket_off(bucket));
            while off > 0 {
                if !seen.insert(off) {
                    err_at!(Fatal, msg: "hash chain loops at {}", off)?;
                }
                if !self.alloc.is_used(region, off) {
                    err_at!(Fatal, msg: "hash chain holds free record {}", off)?;
                }
                off = read_word(region, off + ENT_KEY_NEXT);
            }
        }
        if n_used != seen.len() {
            err_at!(Fatal, msg: "hash chains {} used {}", seen.len(), n_used)?;
        }
        if n_used != self.index.len() {
            err_at!(Fatal, msg: "hash count {} used {}", self.index.len(), n_used)?;
        }

        // the evict list covers the same records exactly once, with
        // consistent back links.
        seen.clear();
        let mut prev = 0;
        let mut off = read_word(hdr, HDR_EVICT_HEAD);
        while off > 0 {
            if !seen.insert(off) {
                err_at!(Fatal, msg: "evict list loops at {}", off)?;
            }
            let payload = self.index.payload_of(region, off);
            match self.index.get(hdr, region, &self.handler, payload) {
                Some(found) if found == off => (),
                _ => err_at!(Fatal, msg: "evict entry {} not indexed", off)?,
            }
            if read_word(region, off + ENT_EVICT_PREV) != prev {
                err_at!(Fatal, msg: "evict prev link at {}", off)?;
            }
            prev = off;
            off = read_word(region, off + ENT_EVICT_NEXT);
        }
        if read_word(hdr, HDR_EVICT_TAIL) != prev {
            err_at!(Fatal, msg: "evict tail {}", prev)?;
        }
        if n_used != seen.len() {
            err_at!(Fatal, msg: "evict list {} used {}", seen.len(), n_used)?;
        }

        Ok(())
    }
}

impl<H> ShmCache<H>
where
    H: ShmHandler,
{
    #[inline]
    fn header_len(&self) -> usize {
        HDR_BUCKETS + self.max_bucket * W
    }

    fn parts(&self) -> Result<(&[u8], &[u8])> {
        let map = match self.map.as_ref() {
            Some(map) => map,
            None => return err_at!(Fatal, msg: "cache not initialized"),
        };
        Ok(map.split_at(self.header_len()))
    }

    fn do_init(&mut self, map: &mut MmapMut, is_new: bool, len: usize) -> Result<Opened> {
        let header_len = self.header_len();
        let (hdr, region) = map.split_at_mut(header_len);

        self.alloc = Allocator::new(len, ENT_PAYLOAD + self.item_size);
        self.index = HashIndex::new(self.max_bucket, self.item_size);

        if is_new {
            hdr[HDR_MAGIC0] = b'S';
            hdr[HDR_MAGIC1] = b'P';
            write_word(hdr, HDR_LEN, len);
            write_word(hdr, HDR_MAX_BUCKET, self.max_bucket);
            write_word(hdr, HDR_ITEM_SIZE, self.item_size);
            write_word(hdr, HDR_EVICT_HEAD, 0);
            write_word(hdr, HDR_EVICT_TAIL, 0);
            for bucket in 0..self.max_bucket {
                write_word(hdr, HDR_BUCKETS + bucket * W, 0);
            }
            self.alloc.reset(region);
            return Ok(Opened::Created);
        }

        if hdr[HDR_MAGIC0] != b'S' || hdr[HDR_MAGIC1] != b'P' {
            let (a, b) = (hdr[HDR_MAGIC0], hdr[HDR_MAGIC1]);
            err_at!(InvalidFile, msg: "bad magic {:x} {:x}", a, b)?;
        }
        let (got_len, got_bucket, got_item) = (
            read_word(hdr, HDR_LEN),
            read_word(hdr, HDR_MAX_BUCKET),
            read_word(hdr, HDR_ITEM_SIZE),
        );
        if got_len != len || got_bucket != self.max_bucket || got_item != self.item_size {
            err_at!(
                InvalidFile,
                msg: "metadata len {} {}, max_bucket {} {}, item_size {} {}",
                got_len, len, got_bucket, self.max_bucket, got_item, self.item_size
            )?;
        }

        // stale views, rebuilt below from the records alone.
        write_word(hdr, HDR_EVICT_HEAD, 0);
        write_word(hdr, HDR_EVICT_TAIL, 0);
        for bucket in 0..self.max_bucket {
            write_word(hdr, HDR_BUCKETS + bucket * W, 0);
        }

        // keep a record iff its stored checksum matches its payload,
        // collect survivors ordered by expiration then offset.
        let mut survivors: Vec<(i64, usize)> = Vec::new();
        let item_size = self.item_size;
        self.alloc.check(region, |entry, off| {
            let payload = &entry[ENT_PAYLOAD..ENT_PAYLOAD + item_size];
            let stored = read_u32(entry, ENT_CHECKSUM);
            if fnv32a(payload) == stored {
                survivors.push((read_i64(entry, ENT_EXP_TIME), off));
                true
            } else {
                log::warn!("checksum fail at offset {}, dropping record", off);
                false
            }
        });
        survivors.sort();

        for (_exp_time, off) in survivors.into_iter() {
            self.index.put(hdr, region, &self.handler, off);
            evict::append(hdr, region, off);
        }
        self.index.attach(hdr, region);

        Ok(Opened::Reused)
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
